//! Builds the single model input row for a flight.
//!
//! The row is the scalar form inputs, the origin weather (`origin_*`) and the
//! destination weather (`dest_*`) laid side by side, zero-filled, then
//! reindexed to the manifest so that column names and order match training
//! exactly. Categorical columns are resolved to their training-time codes.

use chrono::NaiveDate;
use std::collections::HashMap;

use crate::error::AssembleError;
use crate::manifest::{canonical_number, category_key, CategoryEncoding, FeatureManifest};
use crate::types::{FlightInput, Value};
use crate::weather::WeatherTable;

pub const ORIGIN_PREFIX: &str = "origin_";
pub const DEST_PREFIX: &str = "dest_";
pub const PLACEHOLDER: &str = "Unknown";

/// Features the form does not collect; they are filled with `PLACEHOLDER`.
pub const PLACEHOLDER_COLUMNS: [&str; 6] = [
    "Dep_CityName",
    "DepTime_label",
    "Arr_CityName",
    "Distance_type",
    "Manufacturer",
    "Model",
];
// Spelled as in the training manifest.
pub const AIRCRAFT_AGE_COLUMN: &str = "Aicraft_age";

#[derive(Debug, Clone, PartialEq)]
pub enum Feature {
    Numeric(f64),
    /// `code` is `None` for a category the model never saw.
    Categorical { label: String, code: Option<u32> },
}

impl Feature {
    pub fn as_model_input(&self) -> f64 {
        match self {
            Feature::Numeric(v) => *v,
            Feature::Categorical { code, .. } => code.map_or(f64::NAN, f64::from),
        }
    }

    pub fn display(&self) -> String {
        match self {
            Feature::Numeric(v) => canonical_number(*v),
            Feature::Categorical { label, .. } => label.clone(),
        }
    }
}

/// One row whose columns equal the manifest, name for name and in order.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledFeatureRow {
    columns: Vec<String>,
    values: Vec<Feature>,
}

impl AssembledFeatureRow {
    pub fn new(columns: Vec<String>, values: Vec<Feature>) -> Self {
        debug_assert_eq!(columns.len(), values.len());
        Self { columns, values }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Feature] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn get(&self, column: &str) -> Option<&Feature> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| &self.values[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Feature)> {
        self.columns.iter().map(String::as_str).zip(self.values.iter())
    }

    pub fn to_model_input(&self) -> Vec<f64> {
        self.values.iter().map(Feature::as_model_input).collect()
    }
}

/// Joins a flight against the shared weather table and manifest.
/// Holds only borrows; one is built per request.
#[derive(Debug, Clone, Copy)]
pub struct FeatureAssembler<'a> {
    weather: &'a WeatherTable,
    manifest: &'a FeatureManifest,
    encoding: &'a CategoryEncoding,
}

impl<'a> FeatureAssembler<'a> {
    pub fn new(
        weather: &'a WeatherTable,
        manifest: &'a FeatureManifest,
        encoding: &'a CategoryEncoding,
    ) -> Self {
        Self {
            weather,
            manifest,
            encoding,
        }
    }

    pub fn assemble(&self, input: &FlightInput) -> Result<AssembledFeatureRow, AssembleError> {
        let mut cells = scalar_cells(input);
        cells.extend(self.weather_cells(ORIGIN_PREFIX, &input.origin, input.flight_date));
        cells.extend(self.weather_cells(DEST_PREFIX, &input.destination, input.flight_date));

        for (_, v) in cells.iter_mut() {
            if *v == Value::Missing {
                *v = Value::Num(0.0);
            }
        }

        let mut by_name: HashMap<&str, &Value> = HashMap::with_capacity(cells.len());
        for (name, v) in &cells {
            if by_name.insert(name.as_str(), v).is_some() {
                return Err(AssembleError::DuplicateColumn(name.clone()));
            }
        }

        let zero = Value::Num(0.0);
        let mut values = Vec::with_capacity(self.manifest.len());
        for column in self.manifest.columns() {
            let v = by_name.get(column.as_str()).copied().unwrap_or(&zero);
            values.push(self.coerce(column, v)?);
        }
        Ok(AssembledFeatureRow::new(self.manifest.columns().to_vec(), values))
    }

    /// Weather for one side of the flight. No exact match yields the same
    /// columns, all missing.
    fn weather_cells(&self, prefix: &str, airport: &str, date: NaiveDate) -> Vec<(String, Value)> {
        let row = self.weather.lookup(airport, date);
        self.weather
            .columns()
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let v = row.map_or(Value::Missing, |r| r[i].clone());
                (format!("{prefix}{c}"), v)
            })
            .collect()
    }

    fn coerce(&self, column: &str, v: &Value) -> Result<Feature, AssembleError> {
        if self.manifest.is_categorical(column) {
            return Ok(Feature::Categorical {
                label: category_key(v).unwrap_or_default(),
                code: self.encoding.encode(column, v),
            });
        }
        match v {
            Value::Num(x) => Ok(Feature::Numeric(*x)),
            Value::Text(s) => Err(AssembleError::NonNumeric {
                column: column.to_string(),
                value: s.clone(),
            }),
            Value::Missing => Ok(Feature::Numeric(0.0)),
        }
    }
}

fn scalar_cells(input: &FlightInput) -> Vec<(String, Value)> {
    let mut cells = vec![
        ("Airline".to_string(), Value::from(input.airline.as_str())),
        ("Dep_Airport".to_string(), Value::from(input.origin.as_str())),
        ("Arr_Airport".to_string(), Value::from(input.destination.as_str())),
        ("Dep_Delay".to_string(), Value::Num(f64::from(input.dep_delay_min))),
        ("Flight_Duration".to_string(), Value::Num(f64::from(input.duration_min))),
        ("Day_Of_Week".to_string(), Value::Num(f64::from(input.day_of_week()))),
    ];
    cells.extend(
        PLACEHOLDER_COLUMNS
            .iter()
            .map(|c| (c.to_string(), Value::from(PLACEHOLDER))),
    );
    cells.push((AIRCRAFT_AGE_COLUMN.to_string(), Value::Num(0.0)));
    cells
}
