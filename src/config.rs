use anyhow::{Context, Result};
use std::path::PathBuf;

/// Startup settings, read once from the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub model_path: PathBuf,
    pub weather_path: PathBuf,
    pub columns_path: PathBuf,
    pub categorical_path: PathBuf,
    pub port: u16,
    /// `LOG_PRED=1`: log a summary of every assembled row.
    pub log_pred: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let path = |key: &str, default: &str| {
            PathBuf::from(lookup(key).unwrap_or_else(|| default.to_string()))
        };
        let port = match lookup("PORT") {
            Some(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("PORT must be a port number, got {raw:?}"))?,
            None => 8080,
        };
        Ok(Self {
            model_path: path("MODEL_PATH", "flight_delay_model.txt"),
            weather_path: path("WEATHER_PATH", "weather_daily_processed.csv"),
            columns_path: path("COLUMNS_PATH", "model_columns.json"),
            categorical_path: path("CATEGORICAL_PATH", "categorical_features.json"),
            port,
            log_pred: lookup("LOG_PRED").as_deref() == Some("1"),
        })
    }
}
