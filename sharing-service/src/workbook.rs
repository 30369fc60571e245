//! Cell-level model of the uploaded consumption workbook.
//!
//! The actual spreadsheet decoding is an upstream concern; this module only
//! defines the raw-cell contract the ingestion pipeline consumes, plus the
//! timestamp conventions: epoch-1900 serial numbers and ISO-like strings.

use std::io::Read;

use time::format_description::well_known::Rfc3339;
use time::format_description::FormatItem;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime};

/// Raw value of one spreadsheet cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Number(f64),
    Text(String),
}

impl CellValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Sheet {
    pub rows: Vec<Vec<CellValue>>,
}

impl Sheet {
    pub fn row(&self, index: usize) -> Option<&[CellValue]> {
        self.rows.get(index).map(Vec::as_slice)
    }
}

/// A parsed workbook: named sheets of raw cell rows.
#[derive(Debug, Clone, Default)]
pub struct Workbook {
    sheets: Vec<(String, Sheet)>,
}

impl Workbook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_sheet(&mut self, name: impl Into<String>, sheet: Sheet) {
        self.sheets.push((name.into(), sheet));
    }

    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, s)| s)
    }
}

#[derive(thiserror::Error, Debug)]
#[error("unparseable timestamp cell: {0}")]
pub struct TimestampParseError(pub String);

/// Days between the spreadsheet serial epoch (1900 system) and 1970-01-01.
const SERIAL_UNIX_OFFSET: f64 = 25569.0;
const SECONDS_PER_DAY: f64 = 86_400.0;

const DATETIME_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");

const DATE_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Interpret a timestamp cell.
///
/// Numeric cells follow the 1900-system serial convention: whole days since
/// 1899-12-30, the fractional part being the time of day. String cells are
/// accepted as RFC 3339 or `YYYY-MM-DD[ T]HH:MM[:SS]` (assumed UTC) or a
/// bare date (midnight UTC).
pub fn parse_timestamp(cell: &CellValue) -> Result<OffsetDateTime, TimestampParseError> {
    match cell {
        CellValue::Number(serial) if serial.is_finite() => {
            let secs = ((serial - SERIAL_UNIX_OFFSET) * SECONDS_PER_DAY).round() as i64;
            OffsetDateTime::from_unix_timestamp(secs)
                .map_err(|_| TimestampParseError(serial.to_string()))
        }
        CellValue::Number(serial) => Err(TimestampParseError(serial.to_string())),
        CellValue::Text(s) => {
            let s = s.trim();
            if let Ok(ts) = OffsetDateTime::parse(s, &Rfc3339) {
                return Ok(ts);
            }
            // Normalize `YYYY-MM-DD HH:MM[:SS]` to a single T-separated,
            // seconds-bearing shape before parsing.
            let mut normalized = s.replacen(' ', "T", 1);
            if normalized.len() == 16 {
                normalized.push_str(":00");
            }
            if let Ok(dt) = PrimitiveDateTime::parse(&normalized, DATETIME_FORMAT) {
                return Ok(dt.assume_utc());
            }
            if let Ok(d) = Date::parse(s, DATE_FORMAT) {
                return Ok(d.midnight().assume_utc());
            }
            Err(TimestampParseError(s.to_string()))
        }
        CellValue::Empty => Err(TimestampParseError("<empty>".to_string())),
    }
}

/// Build a [`Sheet`] from a CSV export of one workbook sheet, keeping the
/// header/metadata rows in place. Numeric-looking fields become
/// [`CellValue::Number`], the rest text.
pub fn sheet_from_csv<R: Read>(reader: R) -> Result<Sheet, csv::Error> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let row = record
            .iter()
            .map(|field| {
                let trimmed = field.trim();
                if trimmed.is_empty() {
                    CellValue::Empty
                } else if let Ok(n) = trimmed.parse::<f64>() {
                    CellValue::Number(n)
                } else {
                    CellValue::Text(trimmed.to_string())
                }
            })
            .collect();
        rows.push(row);
    }

    Ok(Sheet { rows })
}
