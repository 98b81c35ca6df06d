use std::{env, net::SocketAddr};

use crate::application::ApplicationError;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

/// Process-level settings for the gateway binary.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub bind_addr: SocketAddr,
    pub database_url: Option<String>,
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self, ApplicationError> {
        Self::from_values(env::var("BIND_ADDR").ok(), env::var("DATABASE_URL").ok())
    }

    pub fn from_values(
        bind_addr: Option<String>,
        database_url: Option<String>,
    ) -> Result<Self, ApplicationError> {
        let raw_addr = bind_addr.unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = raw_addr.trim().parse().map_err(|e| {
            ApplicationError::Configuration(format!("Invalid BIND_ADDR '{}': {}", raw_addr, e))
        })?;

        Ok(Self {
            bind_addr,
            database_url: database_url.filter(|url| !url.trim().is_empty()),
        })
    }
}
