//! Gateway server: loads settings, mounts the gateway routes and serves them.
//!
//! Run from repo root: `cargo run -p gateway-server`

use data_gateway::{app, load_settings_from_env, AppState, PgCommandRunner};
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("data_gateway=info,gateway_server=info,tower_http=info")
            }),
        )
        .init();

    let settings = load_settings_from_env().await?;
    let state = AppState::new(&settings, Arc::new(PgCommandRunner::new()));
    tracing::info!(
        contexts = state.tenants.len(),
        data_sources = %state.resolver.root().display(),
        cache_descriptors = settings.cache_descriptors,
        "settings loaded"
    );

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let listener = TcpListener::bind(&bind_addr).await?;
    tracing::info!("Data gateway listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app(state)).await?;
    Ok(())
}
