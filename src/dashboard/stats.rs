//! Dashboard aggregation
//!
//! Pure functions over the cached list. They are recomputed on every
//! change; the list is small enough that incremental maintenance is not
//! worth it.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

use crate::model::Reservation;

/// Order of the bars in the people-per-date chart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChartOrder {
    /// Chronological
    #[default]
    Date,
    /// Order in which each date first appears in the list
    FirstSeen,
}

impl FromStr for ChartOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "date" => Ok(ChartOrder::Date),
            "first-seen" | "first_seen" => Ok(ChartOrder::FirstSeen),
            other => Err(format!(
                "unknown chart order `{}` (expected `date` or `first-seen`)",
                other
            )),
        }
    }
}

/// One bar of the chart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateTotal {
    pub fecha: NaiveDate,
    pub personas: u64,
}

pub fn total_reservations(list: &[Reservation]) -> usize {
    list.len()
}

pub fn total_people(list: &[Reservation]) -> u64 {
    list.iter().map(|r| u64::from(r.personas)).sum()
}

/// Newest reservation; the list is kept newest-first
pub fn most_recent(list: &[Reservation]) -> Option<&Reservation> {
    list.first()
}

/// Sum of party sizes per date
pub fn people_per_date(list: &[Reservation], order: ChartOrder) -> Vec<DateTotal> {
    match order {
        ChartOrder::Date => {
            let mut totals: BTreeMap<NaiveDate, u64> = BTreeMap::new();
            for r in list {
                *totals.entry(r.fecha).or_insert(0) += u64::from(r.personas);
            }
            totals
                .into_iter()
                .map(|(fecha, personas)| DateTotal { fecha, personas })
                .collect()
        }
        ChartOrder::FirstSeen => {
            let mut totals: Vec<DateTotal> = Vec::new();
            let mut position: HashMap<NaiveDate, usize> = HashMap::new();
            for r in list {
                let idx = *position.entry(r.fecha).or_insert_with(|| {
                    totals.push(DateTotal {
                        fecha: r.fecha,
                        personas: 0,
                    });
                    totals.len() - 1
                });
                totals[idx].personas += u64::from(r.personas);
            }
            totals
        }
    }
}

/// Everything the dashboard cards and chart display
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub total_reservations: usize,
    pub total_people: u64,
    pub most_recent: Option<Reservation>,
    pub people_per_date: Vec<DateTotal>,
}

impl DashboardSummary {
    pub fn from_list(list: &[Reservation], order: ChartOrder) -> Self {
        Self {
            total_reservations: total_reservations(list),
            total_people: total_people(list),
            most_recent: most_recent(list).cloned(),
            people_per_date: people_per_date(list, order),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    fn reservation(id: &str, fecha: NaiveDate, personas: u32) -> Reservation {
        Reservation::new(id, format!("Cliente {}", id), "c@example.com", fecha, personas)
    }

    fn sample() -> Vec<Reservation> {
        vec![
            reservation("4", day(12), 2),
            reservation("3", day(3), 5),
            reservation("2", day(12), 1),
            reservation("1", day(7), 4),
        ]
    }

    #[test]
    fn test_totals() {
        let list = sample();
        assert_eq!(total_reservations(&list), 4);
        assert_eq!(total_people(&list), 12);
        assert_eq!(
            total_people(&list),
            list.iter().map(|r| r.personas as u64).sum::<u64>()
        );
    }

    #[test]
    fn test_most_recent_is_head() {
        let list = sample();
        assert_eq!(most_recent(&list).map(|r| r.id.as_str()), Some("4"));
        assert!(most_recent(&[]).is_none());
    }

    #[test]
    fn test_people_per_date_chronological() {
        let totals = people_per_date(&sample(), ChartOrder::Date);
        assert_eq!(
            totals,
            vec![
                DateTotal { fecha: day(3), personas: 5 },
                DateTotal { fecha: day(7), personas: 4 },
                DateTotal { fecha: day(12), personas: 3 },
            ]
        );
    }

    #[test]
    fn test_people_per_date_first_seen() {
        let totals = people_per_date(&sample(), ChartOrder::FirstSeen);
        let dates: Vec<NaiveDate> = totals.iter().map(|t| t.fecha).collect();
        assert_eq!(dates, vec![day(12), day(3), day(7)]);
        assert_eq!(totals[0].personas, 3);
    }

    #[test]
    fn test_empty_summary() {
        let summary = DashboardSummary::from_list(&[], ChartOrder::Date);
        assert_eq!(summary, DashboardSummary::default());
    }

    #[test]
    fn test_chart_order_parse() {
        assert_eq!("date".parse::<ChartOrder>().unwrap(), ChartOrder::Date);
        assert_eq!("First-Seen".parse::<ChartOrder>().unwrap(), ChartOrder::FirstSeen);
        assert!("random".parse::<ChartOrder>().is_err());
    }
}
