//! NeuroCast main entry point.
//!
//! Loads `.env`, initialises tracing, and runs the REST API server. The
//! handlers and application state live in the `api-rest` crate; this binary
//! only wires the process edge together.

use api_rest::{app, state_from_env};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the NeuroCast application.
///
/// # Environment Variables
/// - `NCAST_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `NCAST_ENVIRONMENT`, `NCAST_SIGNING_KEY_FILE`, `NCAST_LEDGER_FILE`:
///   see `api_rest::state_from_env`
///
/// # Errors
/// Returns an error if the tracing configuration, application state, or HTTP
/// server fails.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Optional .env for local development; absence is fine.
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("ncast_run=info".parse()?)
                .add_directive("api_rest=info".parse()?)
                .add_directive("ncast_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = std::env::var("NCAST_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

    tracing::info!("-- Starting NeuroCast on {}", addr);

    let state = state_from_env()?;

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app(state)).await?;

    Ok(())
}
