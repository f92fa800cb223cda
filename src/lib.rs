//! Flight delay prediction service.
//!
//! Joins a flight submitted through a web form against a daily weather
//! table, assembles the exact feature row a trained LightGBM classifier
//! expects and reports the delay prediction.

pub mod assets;
pub mod config;
pub mod error;
pub mod features;
pub mod form;
pub mod manifest;
pub mod model;
pub mod predictor;
pub mod server;
pub mod types;
pub mod weather;
