//! HTTP scoring service.
//!
//! Artifacts are loaded once into an immutable [`AppState`] shared by every
//! handler; no request mutates it, so unlimited concurrent readers are safe.
//! Scoring itself is a pure function of the bundle and the request fields,
//! which keeps the handlers thin and the decision logic testable without a
//! socket.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::artifacts::ArtifactBundle;
use crate::features::{FieldMap, FieldValue, build_feature_vector};

/// Classification threshold on the class-1 (default) probability.
pub const THRESHOLD: f64 = 0.5;

/// Immutable per-process context, constructed once at startup.
#[derive(Clone)]
pub struct AppState {
    pub bundle: Arc<ArtifactBundle>,
    pub field_map: Arc<FieldMap>,
}

impl AppState {
    pub fn new(bundle: ArtifactBundle, field_map: FieldMap) -> Self {
        Self {
            bundle: Arc::new(bundle),
            field_map: Arc::new(field_map),
        }
    }
}

/// Response body for `POST /predict`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Decision {
    pub status: String,
    pub prediction: String,
    pub probability_bad: f64,
    pub probability_good: f64,
    pub threshold_used: f64,
    pub model_version: String,
}

/// Score one request: map external fields to a feature vector, scale it, and
/// apply the decision rule. Deterministic for identical inputs.
pub fn score(
    bundle: &ArtifactBundle,
    field_map: &FieldMap,
    fields: &HashMap<String, FieldValue>,
) -> Decision {
    let vector = build_feature_vector(
        fields,
        field_map,
        &bundle.feature_names,
        &bundle.impute_values,
    );
    // Width is guaranteed by bundle validation at load time.
    let scaled = bundle
        .scaler
        .transform_row(&vector)
        .unwrap_or_else(|_| vec![0.0; bundle.scaler.len()]);
    let probability_bad = bundle.model.predict_bad_probability(&scaled);
    let is_bad = probability_bad >= THRESHOLD;
    Decision {
        status: if is_bad { "High Risk" } else { "Likely Eligible" }.to_string(),
        prediction: if is_bad { "Bad Credit" } else { "Good Credit" }.to_string(),
        probability_bad: round4(probability_bad),
        probability_good: round4(1.0 - probability_bad),
        threshold_used: THRESHOLD,
        model_version: env!("CARGO_PKG_VERSION").to_string(),
    }
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Build the application router. CORS is open to all origins; this is a
/// demo-only relaxation, tighten before any real deployment.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/predict", post(predict))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn predict(
    State(state): State<AppState>,
    Json(fields): Json<HashMap<String, FieldValue>>,
) -> Json<Decision> {
    Json(score(&state.bundle, &state.field_map, &fields))
}

async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "Credit Risk Scoring API. POST JSON to /predict"
    }))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "ok": true }))
}
