//! Standalone REST API server binary.
//!
//! ## Purpose
//! Runs the REST API server on its own.
//!
//! ## Intended use
//! This binary is useful for development and debugging when you only want the REST server (with
//! OpenAPI/Swagger UI). The workspace's main `denials-run` binary serves the same router and also
//! reads a `.env` file.

use api_rest::{router, service_from_env_values, AppState};
use denials_core::config::{DEFAULT_REST_ADDR, ENV_REST_ADDR};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the denials REST API server
///
/// # Environment Variables
/// - `DENIALS_REST_ADDR`: Server address (default: "0.0.0.0:3000")
/// - `DENIALS_STORE_FILE`: JSON store snapshot to serve (optional)
/// - `DENIALS_PATTERN_FILE`: YAML pattern catalogue (optional)
/// - `DENIALS_*` threshold overrides
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - the configuration or data files are invalid,
/// - the server address cannot be bound, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("api_rest=info".parse()?)
                .add_directive("denials_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = std::env::var(ENV_REST_ADDR).unwrap_or_else(|_| DEFAULT_REST_ADDR.into());

    tracing::info!("-- Starting denials REST API on {}", addr);

    let service = service_from_env_values(|k| std::env::var(k).ok())?;
    let app = router(AppState::new(service));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
