use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::{collections::HashMap, fs::File, io::Read, path::Path};

use crate::types::Value;

pub const AIRPORT_KEY: &str = "airport_id";
pub const DATE_KEY: &str = "merge_key_date";

const NA_MARKERS: [&str; 7] = ["NA", "N/A", "NaN", "nan", "null", "NULL", "None"];

/// Daily weather measurements keyed by (airport, calendar date).
/// Read-only once loaded.
#[derive(Debug, Clone)]
pub struct WeatherTable {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
    index: HashMap<(String, NaiveDate), usize>,
    duplicate_keys: usize,
}

impl WeatherTable {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("failed to open weather table {}", path.display()))?;
        Self::from_reader(file)
            .with_context(|| format!("failed to read weather table {}", path.display()))
    }

    pub fn from_reader<R: Read>(rdr: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new().has_headers(true).from_reader(rdr);
        let headers = rdr.headers().context("missing header row")?.clone();

        let position = |key: &str| {
            headers
                .iter()
                .position(|h| header_name(h) == key)
                .with_context(|| format!("weather table has no {key:?} column"))
        };
        let airport_at = position(AIRPORT_KEY)?;
        let date_at = position(DATE_KEY)?;

        let measured: Vec<usize> = (0..headers.len())
            .filter(|&i| i != airport_at && i != date_at)
            .collect();
        let columns = measured.iter().map(|&i| header_name(&headers[i]).to_string()).collect();

        let mut rows = Vec::new();
        let mut index = HashMap::new();
        let mut duplicate_keys = 0;
        for (line, record) in rdr.records().enumerate() {
            let record = record.with_context(|| format!("bad record at data row {}", line + 1))?;
            let raw_date = &record[date_at];
            let Some(date) = parse_date(raw_date) else {
                bail!("unparsable {DATE_KEY} {raw_date:?} at data row {}", line + 1);
            };
            let key = (record[airport_at].trim().to_string(), date);
            if index.contains_key(&key) {
                duplicate_keys += 1;
            } else {
                index.insert(key, rows.len());
            }
            rows.push(measured.iter().map(|&i| parse_cell(&record[i])).collect());
        }

        Ok(Self {
            columns,
            rows,
            index,
            duplicate_keys,
        })
    }

    /// Measurement column names in file order, join keys excluded.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows whose (airport, date) key already appeared earlier in the file.
    pub fn duplicate_keys(&self) -> usize {
        self.duplicate_keys
    }

    /// Exact-date match; with duplicate keys the earliest row wins.
    pub fn lookup(&self, airport: &str, date: NaiveDate) -> Option<&[Value]> {
        self.index
            .get(&(airport.to_string(), date))
            .map(|&i| self.rows[i].as_slice())
    }
}

// Excel exports prefix the first header with a byte-order mark.
fn header_name(raw: &str) -> &str {
    raw.trim_start_matches('\u{feff}').trim()
}

/// Accepts plain dates and timestamps; the time of day is dropped.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive())
}

pub fn parse_cell(raw: &str) -> Value {
    let s = raw.trim();
    if s.is_empty() || NA_MARKERS.contains(&s) {
        return Value::Missing;
    }
    match s.parse::<f64>() {
        Ok(v) => Value::from(v),
        Err(_) => Value::Text(s.to_string()),
    }
}
