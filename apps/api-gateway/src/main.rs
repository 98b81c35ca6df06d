// Import necessary items from the crate's library (lib.rs)
use api_gateway::{AppState, config::GatewayConfig, create_app};
use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;
use std::{error::Error, process::ExitCode};
use tenancy_core::{ConfigurationValidator, TenancyConfig};
use tokio::net::TcpListener;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

// main.rs only contains the binary entry point and setup specific to running the application.
// Router, state and handlers live in lib.rs.

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize tracing (logging)
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env()) // Allow RUST_LOG
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    info!("Starting API Gateway v{}...", env!("CARGO_PKG_VERSION"));
    // Load environment (.env) if present
    dotenv().ok();

    match run().await {
        Ok(()) => {
            info!("API Gateway stopped");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("API Gateway failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), Box<dyn Error + Send + Sync>> {
    // --- Naming contract: must hold before any traffic is accepted ---
    let tenancy_config = TenancyConfig::from_env()?;
    let validator = ConfigurationValidator::from_config(&tenancy_config)?;
    let report = validator.validate_startup()?;

    let gateway_config = GatewayConfig::from_env()?;

    // Optional Postgres pool; tenant routes bind search_path on it per request
    let pg_pool = match &gateway_config.database_url {
        Some(url) => match PgPoolOptions::new().max_connections(5).connect(url).await {
            Ok(pool) => {
                info!("Connected to Postgres");
                Some(pool)
            }
            Err(e) => {
                warn!("Failed to connect to Postgres (search_path binding disabled): {}", e);
                None
            }
        },
        None => {
            warn!("DATABASE_URL not set (search_path binding disabled)");
            None
        }
    };

    // --- Dependency Injection Setup ---
    let app_state = AppState::new(validator.mapper().clone(), Some(report), pg_pool);
    let app = create_app(app_state);

    let listener = TcpListener::bind(gateway_config.bind_addr).await?;
    info!("API Gateway listening on {}", gateway_config.bind_addr);
    info!("Health endpoint available at: /q/health");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to install shutdown signal handler: {}", e);
        // Without a handler there is nothing to wait for; keep serving
        std::future::pending::<()>().await;
    }
    info!("API Gateway shutdown initiated");
}
