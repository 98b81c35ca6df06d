use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tenancy_core::ConfigurationValidator;
use tracing::warn;

use crate::AppState;

const SERVICE_NAME: &str = "api-gateway";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthStatus {
    Up,
    Down,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheck {
    pub name: String,
    pub status: HealthStatus,
    pub data: BTreeMap<String, String>,
}

impl HealthCheck {
    fn new(name: &str, status: HealthStatus) -> Self {
        Self {
            name: name.to_string(),
            status,
            data: BTreeMap::new(),
        }
    }

    fn with_data(mut self, key: &str, value: impl ToString) -> Self {
        self.data.insert(key.to_string(), value.to_string());
        self
    }
}

/// Aggregate of several checks; DOWN if any check is DOWN.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub checks: Vec<HealthCheck>,
}

impl HealthResponse {
    fn from_checks(checks: Vec<HealthCheck>) -> Self {
        let status = if checks.iter().all(|c| c.status == HealthStatus::Up) {
            HealthStatus::Up
        } else {
            HealthStatus::Down
        };
        Self { status, checks }
    }
}

impl IntoResponse for HealthResponse {
    fn into_response(self) -> Response {
        let code = match self.status {
            HealthStatus::Up => StatusCode::OK,
            HealthStatus::Down => StatusCode::SERVICE_UNAVAILABLE,
        };
        (code, Json(self)).into_response()
    }
}

// --- Individual checks ---

fn liveness_check() -> HealthCheck {
    HealthCheck::new("service-liveness", HealthStatus::Up)
        .with_data("service", SERVICE_NAME)
        .with_data("version", env!("CARGO_PKG_VERSION"))
        .with_data("timestamp", Utc::now().to_rfc3339())
}

fn startup_check(app_state: &AppState) -> HealthCheck {
    match &app_state.startup {
        Some(report) => HealthCheck::new("service-startup", HealthStatus::Up)
            .with_data("service", SERVICE_NAME)
            .with_data("validated_at", report.validated_at.to_rfc3339())
            .with_data("checked_tenant_ids", report.checked.len()),
        None => HealthCheck::new("service-startup", HealthStatus::Down)
            .with_data("service", SERVICE_NAME)
            .with_data("status", "multi-tenancy configuration was not validated"),
    }
}

fn multitenancy_check(app_state: &AppState) -> HealthCheck {
    let mapper = app_state.mapper.as_ref();
    let default_schema = mapper.default_schema();
    let validator = ConfigurationValidator::new(mapper.clone());

    match validator.validate_schema_name(default_schema.as_str()) {
        Ok(()) => HealthCheck::new("multitenancy", HealthStatus::Up)
            .with_data("default_schema", &default_schema)
            .with_data("tenant_schema_prefix", mapper.tenant_schema_prefix()),
        Err(e) => {
            warn!(error = %e, "Multi-tenancy readiness check failed");
            HealthCheck::new("multitenancy", HealthStatus::Down).with_data("error", e)
        }
    }
}

async fn database_check(app_state: &AppState) -> HealthCheck {
    let Some(pool) = &app_state.pg_pool else {
        return HealthCheck::new("database-connectivity", HealthStatus::Up)
            .with_data("component", "postgresql")
            .with_data("connection", "disabled");
    };

    match sqlx::query("SELECT 1").execute(pool).await {
        Ok(_) => HealthCheck::new("database-connectivity", HealthStatus::Up)
            .with_data("component", "postgresql")
            .with_data("connection", "active"),
        Err(e) => {
            warn!(error = %e, "Database health check failed");
            HealthCheck::new("database-connectivity", HealthStatus::Down)
                .with_data("component", "postgresql")
                .with_data("connection", "error")
                .with_data("error", e)
        }
    }
}

// --- Handlers ---

pub async fn handle_liveness() -> HealthResponse {
    HealthResponse::from_checks(vec![liveness_check()])
}

pub async fn handle_startup(State(app_state): State<AppState>) -> HealthResponse {
    HealthResponse::from_checks(vec![startup_check(&app_state)])
}

pub async fn handle_readiness(State(app_state): State<AppState>) -> HealthResponse {
    HealthResponse::from_checks(vec![
        multitenancy_check(&app_state),
        database_check(&app_state).await,
    ])
}

pub async fn handle_health(State(app_state): State<AppState>) -> HealthResponse {
    HealthResponse::from_checks(vec![
        liveness_check(),
        startup_check(&app_state),
        multitenancy_check(&app_state),
        database_check(&app_state).await,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate_status() {
        let up = HealthResponse::from_checks(vec![HealthCheck::new("a", HealthStatus::Up)]);
        assert_eq!(up.status, HealthStatus::Up);

        let down = HealthResponse::from_checks(vec![
            HealthCheck::new("a", HealthStatus::Up),
            HealthCheck::new("b", HealthStatus::Down),
        ]);
        assert_eq!(down.status, HealthStatus::Down);
    }

    #[test]
    fn test_status_serializes_uppercase() {
        let json = serde_json::to_string(&HealthStatus::Up).unwrap();
        assert_eq!(json, "\"UP\"");
    }
}
