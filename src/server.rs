use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::error::PredictError;
use crate::fixtures;
use crate::pipeline::Predictor;
use crate::types::{ErrorBody, PredictionResponse};

// ---------- Server state ----------

#[derive(Clone)]
pub struct AppState {
    pub predictor: Arc<Predictor>,
}

impl AppState {
    pub fn new(predictor: Predictor) -> Self {
        Self {
            predictor: Arc::new(predictor),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/predict", post(predict))
        .route("/api/predict-moves", post(predict_moves))
        .route("/api/identify-opening", post(identify_opening))
        .route("/api/analyze-position", post(analyze_position))
        .route("/health", get(health))
        .with_state(state)
}

// ---------- Errors ----------

/// Client faults become 400, server faults 500; body is `{"error": ...}`.
#[derive(Debug)]
pub struct ApiError(pub PredictError);

impl From<PredictError> for ApiError {
    fn from(e: PredictError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = if self.0.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        if status.is_server_error() {
            tracing::error!("predict failed: {}", self.0);
        } else {
            tracing::debug!("rejected request: {}", self.0);
        }
        let body = ErrorBody {
            error: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

// ---------- Handlers ----------

pub async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<PredictionResponse>, ApiError> {
    let Json(body) = payload.map_err(|e| PredictError::InvalidFormat {
        field: "body",
        detail: e.body_text(),
    })?;

    // Inference is CPU-bound; keep it off the async workers
    let predictor = state.predictor.clone();
    let prediction = tokio::task::spawn_blocking(move || predictor.predict_value(body))
        .await
        .map_err(|e| PredictError::PredictionFailure(format!("inference task failed: {e}")))??;

    Ok(Json(PredictionResponse { prediction }))
}

pub async fn predict_moves() -> Json<Value> {
    Json(fixtures::move_suggestions())
}

pub async fn identify_opening() -> Json<Value> {
    Json(fixtures::opening_identification())
}

pub async fn analyze_position() -> Json<Value> {
    Json(fixtures::position_analysis())
}

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "model_loaded": state.predictor.is_ready(),
    }))
}
