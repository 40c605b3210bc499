use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Catalog load error: {0}")]
    CatalogLoad(String),

    #[error("Vectorizer load error: {0}")]
    VectorizerLoad(String),

    #[error("Product not found: {barcode}")]
    NotFound { barcode: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::NotFound { barcode } => (
                StatusCode::NOT_FOUND,
                json!({
                    "status": "error",
                    "message": "Product not found",
                    "barcode": barcode,
                }),
            ),
            AppError::InvalidInput(msg) => (
                StatusCode::BAD_REQUEST,
                json!({ "status": "error", "message": msg }),
            ),
            AppError::CatalogLoad(_) | AppError::VectorizerLoad(_) | AppError::Internal(_) => {
                tracing::error!(error = %self, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "status": "error", "message": self.to_string() }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_maps_to_404() {
        let response = AppError::NotFound {
            barcode: "123".to_string(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_invalid_input_maps_to_400() {
        let response = AppError::InvalidInput("barcode is required".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_load_errors_map_to_500() {
        let response = AppError::CatalogLoad("missing".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
