use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};
use serde::Serialize;
use serde_json::{json, Value};

use crate::{
    error::{AppError, AppResult},
    middleware::request_id::RequestId,
    models::Analysis,
};

use super::AppState;

// Request/Response types

/// Validated body of an analyze request
#[derive(Debug, PartialEq)]
pub struct AnalyzeRequest {
    /// Barcode as sent by the client, trimmed
    pub barcode: String,
    pub top_n: Option<usize>,
}

impl AnalyzeRequest {
    /// Interprets a raw JSON body.
    ///
    /// The barcode may arrive as a string or a number; scanners and
    /// spreadsheets both send numeric codes. An explicit `null` is read as
    /// an empty barcode, which then matches nothing.
    pub fn from_json(body: &Value) -> AppResult<Self> {
        let barcode = match body.get("barcode") {
            None => return Err(AppError::InvalidInput("barcode is required".to_string())),
            Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.trim().to_string(),
            Some(Value::Number(n)) => n.to_string(),
            Some(_) => {
                return Err(AppError::InvalidInput(
                    "barcode must be a string or number".to_string(),
                ))
            }
        };

        let top_n = match body.get("top_n") {
            None | Some(Value::Null) => None,
            Some(value) => {
                let n = value.as_u64().ok_or_else(|| {
                    AppError::InvalidInput("top_n must be a non-negative integer".to_string())
                })?;
                Some(usize::try_from(n).unwrap_or(usize::MAX))
            }
        };

        Ok(Self { barcode, top_n })
    }
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub status: &'static str,
    pub input_barcode: String,
    #[serde(flatten)]
    pub analysis: Analysis,
}

// Handlers

/// Health check endpoint
pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Looks up a barcode and returns better-scoring similar products
pub async fn analyze(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    payload: Result<Json<Value>, JsonRejection>,
) -> AppResult<Json<AnalyzeResponse>> {
    let Json(body) = payload.map_err(|rejection| {
        tracing::debug!(request_id = %request_id, error = %rejection, "Rejected request body");
        AppError::InvalidInput("barcode is required".to_string())
    })?;
    let request = AnalyzeRequest::from_json(&body)?;
    let top_n = request.top_n.unwrap_or(state.default_top_n);

    tracing::info!(
        request_id = %request_id,
        barcode = %request.barcode,
        top_n,
        "Processing analyze request"
    );

    let analysis = state
        .recommender
        .recommend(&request.barcode, top_n)
        .ok_or_else(|| {
            tracing::info!(request_id = %request_id, barcode = %request.barcode, "Product not found");
            AppError::NotFound {
                barcode: request.barcode.clone(),
            }
        })?;

    tracing::info!(
        request_id = %request_id,
        recommendations = analysis.recommendations.len(),
        "Analyze completed"
    );

    Ok(Json(AnalyzeResponse {
        status: "success",
        input_barcode: request.barcode,
        analysis,
    }))
}
