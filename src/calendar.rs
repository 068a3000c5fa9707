//! Calendar View
//!
//! Maps reservations to calendar events and lays out one month as a grid
//! of Monday-first weeks.

use chrono::{Datelike, Months, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::model::{Reservation, ReservationId};

const MONTH_NAMES: [&str; 12] = [
    "enero",
    "febrero",
    "marzo",
    "abril",
    "mayo",
    "junio",
    "julio",
    "agosto",
    "septiembre",
    "octubre",
    "noviembre",
    "diciembre",
];

/// Weekday headers, Monday first
pub const WEEKDAY_LABELS: [&str; 7] = ["lu", "ma", "mi", "ju", "vi", "sá", "do"];

/// A reservation as a calendar entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarEvent {
    pub id: ReservationId,
    pub title: String,
    pub date: NaiveDate,
}

impl From<&Reservation> for CalendarEvent {
    fn from(r: &Reservation) -> Self {
        Self {
            id: r.id.clone(),
            title: format!("{} ({})", r.nombre, r.personas),
            date: r.fecha,
        }
    }
}

/// One event per reservation, in list order
pub fn events(list: &[Reservation]) -> Vec<CalendarEvent> {
    list.iter().map(CalendarEvent::from).collect()
}

/// A month laid out in weeks, with the events that fall in it
#[derive(Debug, Clone)]
pub struct MonthView {
    first: NaiveDate,
    weeks: Vec<[Option<NaiveDate>; 7]>,
    by_day: BTreeMap<NaiveDate, Vec<CalendarEvent>>,
}

impl MonthView {
    /// Lay out `month` of `year`; `None` for an invalid month
    pub fn new(year: i32, month: u32, events: &[CalendarEvent]) -> Option<Self> {
        let first = NaiveDate::from_ymd_opt(year, month, 1)?;
        let next = first.checked_add_months(Months::new(1))?;

        let mut weeks = Vec::new();
        let mut week: [Option<NaiveDate>; 7] = [None; 7];
        let mut col = first.weekday().num_days_from_monday() as usize;

        for day in first.iter_days().take_while(|d| *d < next) {
            week[col] = Some(day);
            col += 1;
            if col == 7 {
                weeks.push(week);
                week = [None; 7];
                col = 0;
            }
        }
        if col > 0 {
            weeks.push(week);
        }

        let mut by_day: BTreeMap<NaiveDate, Vec<CalendarEvent>> = BTreeMap::new();
        for event in events.iter().filter(|e| e.date >= first && e.date < next) {
            by_day.entry(event.date).or_default().push(event.clone());
        }

        Some(Self {
            first,
            weeks,
            by_day,
        })
    }

    /// Month containing `date`
    pub fn containing(date: NaiveDate, events: &[CalendarEvent]) -> Option<Self> {
        Self::new(date.year(), date.month(), events)
    }

    pub fn year(&self) -> i32 {
        self.first.year()
    }

    pub fn month(&self) -> u32 {
        self.first.month()
    }

    /// e.g. "junio 2024"
    pub fn title(&self) -> String {
        format!("{} {}", MONTH_NAMES[self.first.month0() as usize], self.first.year())
    }

    pub fn weeks(&self) -> &[[Option<NaiveDate>; 7]] {
        &self.weeks
    }

    pub fn events_on(&self, date: NaiveDate) -> &[CalendarEvent] {
        self.by_day.get(&date).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Days with at least one event, in date order
    pub fn busy_days(&self) -> impl Iterator<Item = (&NaiveDate, &Vec<CalendarEvent>)> {
        self.by_day.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_event_title() {
        let list = vec![Reservation::new("1", "Ana", "ana@example.com", day(2024, 6, 1), 4)];
        let events = events(&list);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].title, "Ana (4)");
        assert_eq!(events[0].date, day(2024, 6, 1));
    }

    #[test]
    fn test_weeks_start_on_monday() {
        // June 2024 starts on a Saturday
        let view = MonthView::new(2024, 6, &[]).unwrap();
        let weeks = view.weeks();

        assert_eq!(weeks.len(), 5);
        assert_eq!(weeks[0][..5], [None; 5]);
        assert_eq!(weeks[0][5], Some(day(2024, 6, 1)));
        assert_eq!(weeks[1][0], Some(day(2024, 6, 3)));
        assert_eq!(weeks[4][6], Some(day(2024, 6, 30)));
        assert_eq!(view.title(), "junio 2024");
    }

    #[test]
    fn test_month_starting_monday_fits_four_weeks() {
        // February 2021 starts on a Monday and has 28 days
        let view = MonthView::new(2021, 2, &[]).unwrap();
        assert_eq!(view.weeks().len(), 4);
        assert!(view.weeks().iter().all(|w| w.iter().all(Option::is_some)));
    }

    #[test]
    fn test_events_grouped_by_day() {
        let list = vec![
            Reservation::new("1", "Ana", "a@example.com", day(2024, 6, 12), 2),
            Reservation::new("2", "Luis", "l@example.com", day(2024, 6, 12), 3),
            Reservation::new("3", "Eva", "e@example.com", day(2024, 7, 1), 1),
        ];
        let view = MonthView::new(2024, 6, &events(&list)).unwrap();

        assert_eq!(view.events_on(day(2024, 6, 12)).len(), 2);
        assert!(view.events_on(day(2024, 7, 1)).is_empty());
        assert_eq!(view.busy_days().count(), 1);

        let july = MonthView::containing(day(2024, 7, 20), &events(&list)).unwrap();
        assert_eq!(july.month(), 7);
        assert_eq!(july.events_on(day(2024, 7, 1)).len(), 1);
    }

    #[test]
    fn test_invalid_month() {
        assert!(MonthView::new(2024, 13, &[]).is_none());
    }
}
