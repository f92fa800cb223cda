use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::{fmt::Write, ops::RangeInclusive};
use v_htmlescape::escape;

use crate::error::InputError;
use crate::features::AssembledFeatureRow;
use crate::types::{FlightInput, PredictionResult};

pub const AIRLINES: [&str; 6] = [
    "Endeavor Air",
    "Frontier Airlines Inc.",
    "JetBlue Airways",
    "Republic Airways",
    "Southwest Airlines Co.",
    "Delta Air Lines Inc.",
];
pub const DEP_AIRPORTS: [&str; 6] = ["ATL", "LGA", "DFW", "ORD", "DEN", "LAX"];
pub const ARR_AIRPORTS: [&str; 6] = ["CVG", "BGM", "MSP", "FAY", "ORD", "ATL"];

pub const DEFAULT_DATE: &str = "2023-01-15";
pub const DEP_DELAY_RANGE: RangeInclusive<i32> = -60..=300;
pub const DURATION_RANGE: RangeInclusive<i32> = 30..=600;

/// Raw form submission. The option lists above are what the page offers;
/// any airline or airport string is accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightForm {
    pub flight_date: String,
    pub airline: String,
    pub dep_airport: String,
    pub arr_airport: String,
    pub dep_delay: i32,
    pub duration: i32,
}

impl Default for FlightForm {
    fn default() -> Self {
        Self {
            flight_date: DEFAULT_DATE.to_string(),
            airline: AIRLINES[0].to_string(),
            dep_airport: DEP_AIRPORTS[0].to_string(),
            arr_airport: ARR_AIRPORTS[0].to_string(),
            dep_delay: 0,
            duration: 120,
        }
    }
}

impl FlightForm {
    pub fn validate(&self) -> Result<FlightInput, InputError> {
        let flight_date = NaiveDate::parse_from_str(self.flight_date.trim(), "%Y-%m-%d")
            .map_err(|_| InputError::BadDate(self.flight_date.clone()))?;
        if !DEP_DELAY_RANGE.contains(&self.dep_delay) {
            return Err(InputError::DepDelayOutOfRange(self.dep_delay));
        }
        if !DURATION_RANGE.contains(&self.duration) {
            return Err(InputError::DurationOutOfRange(self.duration));
        }
        Ok(FlightInput {
            flight_date,
            airline: non_empty(&self.airline, "airline")?,
            origin: non_empty(&self.dep_airport, "departure airport")?,
            destination: non_empty(&self.arr_airport, "arrival airport")?,
            dep_delay_min: self.dep_delay,
            duration_min: self.duration,
        })
    }
}

fn non_empty(v: &str, field: &'static str) -> Result<String, InputError> {
    let v = v.trim();
    if v.is_empty() {
        Err(InputError::Empty(field))
    } else {
        Ok(v.to_string())
    }
}

/// What to show under the form after a submission.
#[derive(Debug)]
pub enum Outcome<'a> {
    Prediction {
        result: &'a PredictionResult,
        row: &'a AssembledFeatureRow,
    },
    Failure {
        message: String,
        hint: Option<&'static str>,
    },
}

pub fn render_page(form: &FlightForm, outcome: Option<&Outcome<'_>>) -> String {
    let mut html = String::with_capacity(4096);
    html.push_str(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>Flight Delay Predictor</title>\n<style>\n\
         body{font-family:sans-serif;max-width:960px;margin:2rem auto}\n\
         .grid{display:grid;grid-template-columns:1fr 1fr;gap:1rem}\n\
         label{display:block;margin-bottom:.75rem}\n\
         .delayed{background:#fde2e1;padding:1rem}\n.ontime{background:#e0f5e4;padding:1rem}\n\
         .error{background:#fde2e1;padding:1rem}\n\
         table{border-collapse:collapse}td,th{border:1px solid #ccc;padding:.2rem .5rem}\n\
         </style>\n</head>\n<body>\n",
    );
    html.push_str("<h1>Flight Delay Predictor</h1>\n");
    html.push_str(
        "<p>Predicts whether a flight will arrive more than 15 minutes late.</p>\n\
         <h2>Flight details</h2>\n<form method=\"post\" action=\"/predict\">\n<div class=\"grid\">\n<div>\n",
    );
    let _ = write!(
        html,
        "<label>Flight date <input type=\"date\" name=\"flight_date\" value=\"{}\" required></label>\n",
        escape(&form.flight_date)
    );
    push_select(&mut html, "Airline", "airline", &AIRLINES, &form.airline);
    let _ = write!(
        html,
        "<label>Departure delay (min) <input type=\"number\" name=\"dep_delay\" min=\"{}\" max=\"{}\" value=\"{}\" required></label>\n",
        DEP_DELAY_RANGE.start(),
        DEP_DELAY_RANGE.end(),
        form.dep_delay
    );
    html.push_str("</div>\n<div>\n");
    push_select(&mut html, "Departure airport", "dep_airport", &DEP_AIRPORTS, &form.dep_airport);
    push_select(&mut html, "Arrival airport", "arr_airport", &ARR_AIRPORTS, &form.arr_airport);
    let _ = write!(
        html,
        "<label>Flight duration (min) <input type=\"number\" name=\"duration\" min=\"{}\" max=\"{}\" value=\"{}\" required></label>\n",
        DURATION_RANGE.start(),
        DURATION_RANGE.end(),
        form.duration
    );
    html.push_str("</div>\n</div>\n<button type=\"submit\">Predict delay</button>\n</form>\n");

    match outcome {
        Some(Outcome::Prediction { result, row }) => push_prediction(&mut html, result, row),
        Some(Outcome::Failure { message, hint }) => {
            let _ = write!(html, "<div class=\"error\"><p>Prediction failed: {}</p>", escape(message));
            if let Some(hint) = hint {
                let _ = write!(html, "<p>{}</p>", escape(hint));
            }
            html.push_str("</div>\n");
        }
        None => {}
    }
    html.push_str("</body>\n</html>\n");
    html
}

fn push_select(html: &mut String, label: &str, name: &str, options: &[&str], selected: &str) {
    let _ = write!(html, "<label>{label} <select name=\"{name}\">");
    // Keep a submitted value that is not one of the offered options.
    if !options.contains(&selected) {
        let _ = write!(html, "<option selected>{}</option>", escape(selected));
    }
    for opt in options {
        let sel = if *opt == selected { " selected" } else { "" };
        let _ = write!(html, "<option{sel}>{}</option>", escape(opt));
    }
    html.push_str("</select></label>\n");
}

fn push_prediction(html: &mut String, result: &PredictionResult, row: &AssembledFeatureRow) {
    html.push_str("<h2>Prediction</h2>\n");
    if result.delayed {
        let _ = write!(
            html,
            "<div class=\"delayed\"><strong>Flight predicted DELAYED</strong> (probability {})</div>\n",
            result.percent()
        );
    } else {
        let _ = write!(
            html,
            "<div class=\"ontime\"><strong>Flight predicted ON TIME</strong> (delay probability {})</div>\n",
            result.percent()
        );
    }
    html.push_str(
        "<details>\n<summary>Show the feature row used for this prediction</summary>\n\
         <table>\n<tr><th>column</th><th>value</th><th>model input</th></tr>\n",
    );
    for (column, feature) in row.iter() {
        let input = feature.as_model_input();
        let input = if input.is_nan() { "missing".to_string() } else { input.to_string() };
        let _ = write!(
            html,
            "<tr><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            escape(column),
            escape(&feature.display()),
            input
        );
    }
    html.push_str("</table>\n</details>\n");
}
