use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use crate::MarketError;

impl MarketError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            MarketError::Validation(_) | MarketError::Conflict(_) => StatusCode::BAD_REQUEST,
            MarketError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            MarketError::NotFound(_) => StatusCode::NOT_FOUND,
            MarketError::InvalidState(_) => StatusCode::CONFLICT,
            MarketError::Storage(_) | MarketError::Config(_) | MarketError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for MarketError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            MarketError::Storage(e) => {
                error!(error = %e, "storage failure");
                "Database operation failed".to_string()
            }
            MarketError::Config(_) | MarketError::Internal(_) => {
                error!(error = %self, "internal failure");
                "An internal error occurred".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(MarketError::Validation("x".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(MarketError::Unauthorized("x".into()).status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(MarketError::Conflict("x".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(MarketError::InvalidState("x".into()).status_code(), StatusCode::CONFLICT);
        assert_eq!(MarketError::Storage(sqlx::Error::RowNotFound).into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
