//! Standalone REST API server binary.
//!
//! ## Purpose
//! Runs the NeuroCast REST API on its own.
//!
//! ## Intended use
//! Useful for development and debugging when only the REST surface (with
//! OpenAPI/Swagger UI) is needed. The workspace's main `ncast-run` binary is
//! the normal entry point.

use api_rest::{app, state_from_env};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Starts the REST API server.
///
/// # Environment Variables
/// - `NCAST_REST_ADDR`: server address (default: "0.0.0.0:3000")
/// - plus the variables documented on [`state_from_env`]
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - the application state cannot be built,
/// - the server address cannot be bound, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("api_rest=info".parse()?)
                .add_directive("ncast_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = std::env::var("NCAST_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

    tracing::info!("-- Starting NeuroCast REST API on {}", addr);

    let state = state_from_env()?;

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app(state)).await?;

    Ok(())
}
