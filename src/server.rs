use axum::{
    extract::{
        rejection::{FormRejection, JsonRejection},
        State,
    },
    http::StatusCode,
    response::Html,
    routing::{get, post},
    Form, Json, Router,
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

use crate::assets::Assets;
use crate::error::{InputError, RequestError};
use crate::features::{AssembledFeatureRow, Feature};
use crate::form::{render_page, FlightForm, Outcome};
use crate::predictor;
use crate::types::PredictionResult;

#[derive(Clone)]
pub struct AppState {
    assets: Arc<Assets>,
    log_pred: bool,
}

impl AppState {
    pub fn new(assets: Arc<Assets>, log_pred: bool) -> Self {
        Self { assets, log_pred }
    }

    /// Validate, assemble and predict for one submission.
    pub fn run(
        &self,
        form: &FlightForm,
    ) -> Result<(PredictionResult, AssembledFeatureRow), RequestError> {
        let input = form.validate()?;
        let row = self.assets.assembler().assemble(&input)?;
        if self.log_pred {
            log_row(&row);
        }
        let result = predictor::predict(&self.assets.model, &row)?;
        tracing::debug!(
            "predicted origin={} dest={} date={} delayed={} p={:.4}",
            input.origin,
            input.destination,
            input.flight_date,
            result.delayed,
            result.probability
        );
        Ok((result, row))
    }
}

// Debug signal so we can confirm we're not sending all-zeros
fn log_row(row: &AssembledFeatureRow) {
    let vec = row.to_model_input();
    let finite: Vec<f64> = vec.iter().copied().filter(|x| x.is_finite()).collect();
    let nz = finite.iter().filter(|x| **x != 0.0).count();
    let mean = if finite.is_empty() { 0.0 } else { finite.iter().sum::<f64>() / finite.len() as f64 };
    let sample: Vec<String> = row
        .iter()
        .take(6)
        .map(|(name, f)| format!("{}={}", name, f.display()))
        .collect();
    tracing::info!(
        "assembled in_dim={} nonzero={} missing={} mean={:.3} sample=[{}]",
        vec.len(),
        nz,
        vec.len() - finite.len(),
        mean,
        sample.join(", ")
    );
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/predict", post(predict_form))
        .route("/api/predict", post(predict_json))
        .with_state(state)
}

async fn index() -> Html<String> {
    Html(render_page(&FlightForm::default(), None))
}

async fn predict_form(
    State(state): State<AppState>,
    form: Result<Form<FlightForm>, FormRejection>,
) -> (StatusCode, Html<String>) {
    let form = match form {
        Ok(Form(form)) => form,
        // Nothing usable was submitted; show the defaults with the error.
        Err(rejection) => {
            let e = RequestError::from(InputError::Malformed(rejection.body_text()));
            return failure_page(&FlightForm::default(), e);
        }
    };
    match state.run(&form) {
        Ok((result, row)) => {
            let outcome = Outcome::Prediction { result: &result, row: &row };
            (StatusCode::OK, Html(render_page(&form, Some(&outcome))))
        }
        Err(e) => failure_page(&form, e),
    }
}

fn failure_page(form: &FlightForm, e: RequestError) -> (StatusCode, Html<String>) {
    tracing::warn!("prediction failed: {}", e);
    let outcome = Outcome::Failure { message: e.to_string(), hint: e.hint() };
    (e.status(), Html(render_page(form, Some(&outcome))))
}

fn error_body(e: RequestError) -> (StatusCode, Json<serde_json::Value>) {
    tracing::warn!("prediction failed: {}", e);
    (e.status(), Json(json!({ "error": e.to_string(), "hint": e.hint() })))
}

#[derive(Serialize)]
struct FeatureOut<'a> {
    column: &'a str,
    value: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<u32>,
}

#[derive(Serialize)]
struct PredictionOut<'a> {
    delayed: bool,
    label: &'static str,
    probability: f64,
    features: Vec<FeatureOut<'a>>,
}

async fn predict_json(
    State(state): State<AppState>,
    form: Result<Json<FlightForm>, JsonRejection>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    let Json(form) = form.map_err(|rejection| {
        error_body(InputError::Malformed(rejection.body_text()).into())
    })?;
    let (result, row) = state.run(&form).map_err(error_body)?;

    let features = row
        .iter()
        .map(|(column, f)| match f {
            Feature::Numeric(v) => FeatureOut { column, value: json!(v), code: None },
            Feature::Categorical { label, code } => FeatureOut { column, value: json!(label), code: *code },
        })
        .collect();
    let out = PredictionOut {
        delayed: result.delayed,
        label: result.label(),
        probability: result.probability,
        features,
    };
    Ok(Json(json!(out)))
}
