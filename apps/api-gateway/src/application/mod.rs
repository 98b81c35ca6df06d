use axum::{
    Json,
    response::{IntoResponse, Response},
};
use http::StatusCode;
use serde_json::json;
use tenancy_core::TenancyError;
use tracing::{error, warn};

// Declare sub-modules within the application layer
pub mod health;
pub mod middleware;
pub mod tenant;

// Top-level error type for the application layer
#[derive(thiserror::Error, Debug)]
pub enum ApplicationError {
    #[error("{0}")]
    Tenancy(#[from] TenancyError),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Configuration Error: {0}")]
    Configuration(String),

    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal Application Error: {0}")]
    Internal(String),
}

impl ApplicationError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApplicationError::Tenancy(TenancyError::Validation { .. })
            | ApplicationError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApplicationError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApplicationError::Tenancy(_)
            | ApplicationError::Configuration(_)
            | ApplicationError::Database(_)
            | ApplicationError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApplicationError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = ?self, "Request failed");
        } else {
            warn!(error = %self, "Request rejected");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let validation = ApplicationError::from(TenancyError::Validation { field: "tenantId" });
        assert_eq!(validation.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(validation.to_string(), "tenantId cannot be null or empty");

        assert_eq!(
            ApplicationError::Forbidden("nope".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApplicationError::from(TenancyError::Configuration("bad".into())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
