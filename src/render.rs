//! Terminal rendering
//!
//! Plain-text views of the dashboard, the calendar and booking tickets.
//! Every function returns a `String`; printing is left to the caller.

use chrono::Datelike;
use std::fmt::Write;

use crate::booking::Ticket;
use crate::calendar::{MonthView, WEEKDAY_LABELS};
use crate::dashboard::{DashboardSummary, DateTotal};
use crate::model::Reservation;
use crate::notify::Notification;

const BAR: char = '█';

/// Summary cards: totals and the most recent reservation
pub fn summary(summary: &DashboardSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Total reservas:    {}", summary.total_reservations);
    let _ = writeln!(out, "Personas totales:  {}", summary.total_people);
    match &summary.most_recent {
        Some(r) => {
            let _ = writeln!(out, "Última reserva:    {} ({})", r.nombre, r.fecha);
        }
        None => {
            let _ = writeln!(out, "Última reserva:    -");
        }
    }
    out
}

/// Horizontal bar chart of people per date, scaled to `width` columns
pub fn chart(totals: &[DateTotal], width: usize) -> String {
    if totals.is_empty() {
        return "Sin datos\n".to_string();
    }

    let max = totals.iter().map(|t| t.personas).max().unwrap_or(0).max(1);
    let width = width.max(1) as u64;

    let mut out = String::new();
    for total in totals {
        let len = if total.personas == 0 {
            0
        } else {
            ((total.personas * width).div_ceil(max)) as usize
        };
        let _ = writeln!(
            out,
            "{} {} {}",
            total.fecha,
            BAR.to_string().repeat(len),
            total.personas
        );
    }
    out
}

/// Table of reservations
pub fn reservation_table(list: &[Reservation]) -> String {
    if list.is_empty() {
        return "No hay reservas.\n".to_string();
    }

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<26} {:<20} {:<28} {:<10} {:>8}  {}",
        "ID", "Nombre", "Email", "Fecha", "Personas", "Mensaje"
    );
    let _ = writeln!(out, "{}", "-".repeat(110));
    for r in list {
        let _ = writeln!(
            out,
            "{:<26} {:<20} {:<28} {:<10} {:>8}  {}",
            r.id.as_str(),
            truncate(&r.nombre, 20),
            truncate(&r.email, 28),
            r.fecha,
            r.personas,
            r.mensaje.as_deref().unwrap_or("")
        );
    }
    out
}

/// Month grid with busy days starred, followed by the agenda
pub fn month(view: &MonthView) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:^35}", view.title());
    for label in WEEKDAY_LABELS {
        let _ = write!(out, "{:>5}", label);
    }
    out.push('\n');

    for week in view.weeks() {
        for day in week {
            match day {
                Some(date) => {
                    let marker = if view.events_on(*date).is_empty() { ' ' } else { '*' };
                    let _ = write!(out, "{:>4}{}", date.day(), marker);
                }
                None => out.push_str("     "),
            }
        }
        out.push('\n');
    }

    let mut agenda = view.busy_days().peekable();
    if agenda.peek().is_some() {
        out.push('\n');
    }
    for (date, events) in agenda {
        let titles: Vec<&str> = events.iter().map(|e| e.title.as_str()).collect();
        let _ = writeln!(out, "{}  {}", date, titles.join(", "));
    }
    out
}

/// Confirmation shown after a successful booking
pub fn ticket(ticket: &Ticket) -> String {
    let r = &ticket.reservation;
    let mut out = String::new();
    let _ = writeln!(out, "Reserva confirmada  #{}", ticket.short_code());
    let _ = writeln!(out, "  Nombre:   {}", r.nombre);
    let _ = writeln!(out, "  Email:    {}", r.email);
    let _ = writeln!(out, "  Fecha:    {}", r.fecha);
    let _ = writeln!(out, "  Personas: {}", r.personas);
    if let Some(mensaje) = &r.mensaje {
        let _ = writeln!(out, "  Mensaje:  {}", mensaje);
    }
    out
}

pub fn notification(n: &Notification) -> String {
    let bell = if n.chime { "\x07" } else { "" };
    format!("[{}] {}{}", n.level, n.message, bell)
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut t: String = s.chars().take(max.saturating_sub(1)).collect();
        t.push('…');
        t
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::events;
    use crate::dashboard::ChartOrder;
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    fn list() -> Vec<Reservation> {
        vec![
            Reservation::new("1", "Ana", "ana@example.com", day(12), 2).mensaje("Terraza"),
            Reservation::new("2", "Luis", "luis@example.com", day(3), 4),
        ]
    }

    #[test]
    fn test_summary_cards() {
        let text = summary(&DashboardSummary::from_list(&list(), ChartOrder::Date));
        assert!(text.contains("Total reservas:    2"));
        assert!(text.contains("Personas totales:  6"));
        assert!(text.contains("Ana (2024-06-12)"));

        let empty = summary(&DashboardSummary::default());
        assert!(empty.contains("Última reserva:    -"));
    }

    #[test]
    fn test_chart_scales_to_width() {
        let totals = vec![
            DateTotal { fecha: day(3), personas: 4 },
            DateTotal { fecha: day(12), personas: 2 },
        ];
        let text = chart(&totals, 10);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0].matches(BAR).count(), 10);
        assert_eq!(lines[1].matches(BAR).count(), 5);
        assert_eq!(chart(&[], 10), "Sin datos\n");
    }

    #[test]
    fn test_table_lists_every_reservation() {
        let text = reservation_table(&list());
        assert_eq!(text.lines().count(), 4);
        assert!(text.contains("Terraza"));
        assert_eq!(reservation_table(&[]), "No hay reservas.\n");
    }

    #[test]
    fn test_month_marks_busy_days() {
        let view = MonthView::new(2024, 6, &events(&list())).unwrap();
        let text = month(&view);
        assert!(text.contains("junio 2024"));
        assert!(text.contains("  12*"));
        assert!(text.contains("2024-06-03  Luis (4)"));
    }

    #[test]
    fn test_notification_rings_bell_on_chime() {
        let quiet = Notification::info("Nueva reserva de Ana");
        assert_eq!(notification(&quiet), "[info] Nueva reserva de Ana");

        let loud = Notification::info("Ana reservó para 2 persona(s)").with_chime();
        assert_eq!(notification(&loud), "[info] Ana reservó para 2 persona(s)\x07");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("Ana", 5), "Ana");
        assert_eq!(truncate("Anastasia", 5), "Anas…");
    }
}
