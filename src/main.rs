//! cardforge - character card generation service
//!
//! Serves the reference-processing HTTP API and, when configured, the
//! static frontend. Pipeline workers run in the background; external
//! service configuration is re-read per pipeline run.

use anyhow::Result;
use tower_http::services::ServeDir;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cardforge::config::Config;
use cardforge::{build_router, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    info!("Starting cardforge (character card generation service)");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    // Startup snapshot only; pipeline runs re-read the file themselves
    let config = Config::load();
    std::fs::create_dir_all(&config.data_dir)?;
    info!("Upload directory: {}", config.data_dir.display());

    let state = AppState::new();
    let mut app = build_router(state);

    if let Some(frontend_dir) = &config.frontend_dir {
        info!("Serving frontend from {}", frontend_dir.display());
        app = app.fallback_service(ServeDir::new(frontend_dir));
    }

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    info!("Listening on http://{}", config.listen_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
