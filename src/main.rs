use api_rest::{router, service_from_env_values, AppState};
use denials_core::config::{DEFAULT_REST_ADDR, ENV_REST_ADDR};
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the denials application
///
/// Loads configuration from the environment (and `.env`), builds the denial service and serves
/// the REST API with Swagger UI at `/swagger-ui`.
///
/// # Environment Variables
/// - `DENIALS_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `DENIALS_STORE_FILE`: JSON store snapshot (optional; empty store otherwise)
/// - `DENIALS_PATTERN_FILE`: YAML denial pattern catalogue (optional; standard catalogue otherwise)
/// - `DENIALS_MAX_BATCH_SIZE` and the `DENIALS_*` threshold overrides
///
/// # Returns
/// * `Ok(())` - If the server starts and runs successfully
/// * `Err(anyhow::Error)` - If configuration, startup or the server fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("denials_run=info".parse()?)
                .add_directive("denials_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr: SocketAddr = std::env::var(ENV_REST_ADDR)
        .unwrap_or_else(|_| DEFAULT_REST_ADDR.into())
        .parse()?;

    let service = service_from_env_values(|k| std::env::var(k).ok())?;

    tracing::info!("++ Starting denials REST on {}", rest_addr);

    let listener = tokio::net::TcpListener::bind(rest_addr).await?;
    axum::serve(listener, router(AppState::new(service))).await?;

    Ok(())
}
