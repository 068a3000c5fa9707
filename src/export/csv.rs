use std::io::Write;

use super::{record_cells, Cell, ExportError, COLUMNS};
use crate::model::Reservation;

/// Write the reservations as CSV with a header row
pub fn write_csv<W: Write>(list: &[Reservation], writer: W) -> Result<(), ExportError> {
    let mut wtr = ::csv::Writer::from_writer(writer);
    wtr.write_record(COLUMNS)?;

    for reservation in list {
        let row: Vec<String> = record_cells(reservation).iter().map(Cell::as_text).collect();
        wtr.write_record(&row)?;
    }

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_quotes_fields_with_commas() {
        let fecha = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let list = vec![Reservation::new("7", "Pérez, Ana", "ana@example.com", fecha, 4)
            .mensaje("Mesa junto a la ventana")];

        let mut out = Vec::new();
        write_csv(&list, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert_eq!(
            text,
            "_id,nombre,email,fecha,personas,mensaje\n\
             7,\"Pérez, Ana\",ana@example.com,2024-06-01,4,Mesa junto a la ventana\n"
        );
    }

    #[test]
    fn test_empty_list_is_header_only() {
        let mut out = Vec::new();
        write_csv(&[], &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap().lines().count(), 1);
    }
}
