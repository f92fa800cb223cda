use chrono::{Datelike, NaiveDate};

/// One raw cell before the row is reindexed: what the weather CSV or the
/// scalar inputs produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Num(f64),
    Text(String),
    Missing,
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        if v.is_nan() {
            Value::Missing
        } else {
            Value::Num(v)
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

/// The six fields collected from the form, already range-checked.
#[derive(Debug, Clone, PartialEq)]
pub struct FlightInput {
    pub flight_date: NaiveDate,
    pub airline: String,
    pub origin: String,
    pub destination: String,
    pub dep_delay_min: i32,
    pub duration_min: i32,
}

impl FlightInput {
    /// Monday = 1 .. Sunday = 7
    pub fn day_of_week(&self) -> u32 {
        self.flight_date.weekday().number_from_monday()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PredictionResult {
    pub delayed: bool,
    /// Probability of the positive ("delayed") class.
    pub probability: f64,
}

impl PredictionResult {
    pub fn label(&self) -> &'static str {
        if self.delayed {
            "delayed"
        } else {
            "on-time"
        }
    }

    pub fn percent(&self) -> String {
        format!("{:.2}%", self.probability * 100.0)
    }
}
