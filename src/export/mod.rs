//! Spreadsheet export
//!
//! Dumps the dashboard's cached list to a file, one row per reservation
//! with a header row. XLSX is the default; CSV is kept for tools that
//! cannot read OOXML.

mod csv;
mod xlsx;

pub use self::csv::write_csv;
pub use self::xlsx::{column_name, write_xlsx, SHEET_PART};

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

use crate::model::Reservation;

/// Header row, in column order
pub const COLUMNS: [&str; 6] = ["_id", "nombre", "email", "fecha", "personas", "mensaje"];

/// Default file stem of an export
pub const DEFAULT_FILE_STEM: &str = "reservas";

/// Default worksheet name
pub const DEFAULT_SHEET_NAME: &str = "Reservas";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Xlsx,
    Csv,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Csv => "csv",
        }
    }

    pub fn file_name(self) -> String {
        format!("{}.{}", DEFAULT_FILE_STEM, self.extension())
    }

    /// Guess the format from a path's extension
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| ext.parse().ok())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "xlsx" => Ok(ExportFormat::Xlsx),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(format!("unknown export format `{}`", other)),
        }
    }
}

/// Where exports go and how the sheet is named
#[derive(Debug, Clone, PartialEq)]
pub struct ExportOptions {
    pub output_dir: PathBuf,
    pub sheet_name: String,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            sheet_name: DEFAULT_SHEET_NAME.to_string(),
        }
    }
}

impl ExportOptions {
    /// Resolve the destination file for an export
    ///
    /// No target means `<output_dir>/reservas.<ext>`; a directory target
    /// gets the default file name inside it.
    pub fn resolve(&self, target: Option<&Path>, format: ExportFormat) -> PathBuf {
        match target {
            Some(path) if path.is_dir() => path.join(format.file_name()),
            Some(path) => path.to_path_buf(),
            None => self.output_dir.join(format.file_name()),
        }
    }
}

/// A spreadsheet cell value
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Cell {
    Text(String),
    Number(u64),
}

impl Cell {
    fn as_text(&self) -> String {
        match self {
            Cell::Text(s) => s.clone(),
            Cell::Number(n) => n.to_string(),
        }
    }
}

/// One reservation as a row, matching [`COLUMNS`]
pub(crate) fn record_cells(r: &Reservation) -> [Cell; 6] {
    [
        Cell::Text(r.id.to_string()),
        Cell::Text(r.nombre.clone()),
        Cell::Text(r.email.clone()),
        Cell::Text(r.fecha.format("%Y-%m-%d").to_string()),
        Cell::Number(u64::from(r.personas)),
        Cell::Text(r.mensaje.clone().unwrap_or_default()),
    ]
}

/// Write `list` to `path` as an XLSX workbook with a single sheet
pub fn export_spreadsheet(
    list: &[Reservation],
    path: &Path,
    sheet_name: &str,
) -> Result<(), ExportError> {
    export_to(list, path, ExportFormat::Xlsx, sheet_name)
}

/// Write `list` to `path` in the given format, creating parent directories
pub fn export_to(
    list: &[Reservation],
    path: &Path,
    format: ExportFormat,
    sheet_name: &str,
) -> Result<(), ExportError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let file = File::create(path)?;
    match format {
        ExportFormat::Xlsx => {
            write_xlsx(list, sheet_name, file)?;
        }
        ExportFormat::Csv => {
            write_csv(list, BufWriter::new(file))?;
        }
    }

    tracing::info!(
        path = %path.display(),
        rows = list.len(),
        format = format.extension(),
        "Exported reservations"
    );
    Ok(())
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Zip error: {0}")]
    Zip(String),

    #[error("XML error: {0}")]
    Xml(String),

    #[error("CSV error: {0}")]
    Csv(#[from] ::csv::Error),
}

impl From<zip::result::ZipError> for ExportError {
    fn from(e: zip::result::ZipError) -> Self {
        ExportError::Zip(e.to_string())
    }
}

impl From<quick_xml::Error> for ExportError {
    fn from(e: quick_xml::Error) -> Self {
        ExportError::Xml(e.to_string())
    }
}
