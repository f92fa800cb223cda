use axum::http::StatusCode;
use thiserror::Error;

/// Shown with assembly and prediction failures.
pub const WEATHER_HINT: &str =
    "Weather data may be unavailable for the selected airport/date combination.";

#[derive(Debug, Error, PartialEq)]
pub enum InputError {
    #[error("departure delay {0} is outside [-60, 300] minutes")]
    DepDelayOutOfRange(i32),
    #[error("flight duration {0} is outside [30, 600] minutes")]
    DurationOutOfRange(i32),
    #[error("invalid flight date {0:?}, expected YYYY-MM-DD")]
    BadDate(String),
    #[error("{0} must not be empty")]
    Empty(&'static str),
    #[error("malformed submission: {0}")]
    Malformed(String),
}

#[derive(Debug, Error, PartialEq)]
pub enum AssembleError {
    #[error("duplicate column {0:?} in assembled row")]
    DuplicateColumn(String),
    #[error("non-numeric value {value:?} in column {column:?}")]
    NonNumeric { column: String, value: String },
}

#[derive(Debug, Error, PartialEq)]
pub enum PredictError {
    #[error("feature length mismatch: got {got}, expected {expected}")]
    WidthMismatch { got: usize, expected: usize },
}

/// Everything that can fail inside one prediction request.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Assemble(#[from] AssembleError),
    #[error(transparent)]
    Predict(#[from] PredictError),
}

impl RequestError {
    pub fn status(&self) -> StatusCode {
        match self {
            RequestError::Input(_) => StatusCode::BAD_REQUEST,
            RequestError::Assemble(_) | RequestError::Predict(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
        }
    }

    /// Input errors are self-explanatory; the rest get the weather hint.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            RequestError::Input(_) => None,
            _ => Some(WEATHER_HINT),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_errors_are_bad_requests_without_hint() {
        let e = RequestError::from(InputError::DepDelayOutOfRange(301));
        assert_eq!(e.status(), StatusCode::BAD_REQUEST);
        assert!(e.hint().is_none());
        assert_eq!(e.to_string(), "departure delay 301 is outside [-60, 300] minutes");
    }

    #[test]
    fn malformed_submission_is_bad_request() {
        let e = RequestError::from(InputError::Malformed("dep_delay: invalid digit".into()));
        assert_eq!(e.status(), StatusCode::BAD_REQUEST);
        assert!(e.hint().is_none());
        assert!(e.to_string().starts_with("malformed submission"));
    }

    #[test]
    fn assembly_errors_carry_weather_hint() {
        let e = RequestError::from(AssembleError::NonNumeric {
            column: "origin_wind".into(),
            value: "calm".into(),
        });
        assert_eq!(e.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(e.hint(), Some(WEATHER_HINT));
    }
}
