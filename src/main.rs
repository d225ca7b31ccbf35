// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Tap Arena API Server
//!
//! Serves the tap-to-earn Telegram Mini App: launch, taps, tasks,
//! boosters and the leaderboard.

use std::sync::Arc;
use std::time::Duration;
use tap_arena::{config::Config, db::Storage, AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging()?;

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(
        port = config.port,
        backend = ?config.storage_backend,
        "Starting Tap Arena API"
    );

    // Connect the progress store
    let store = Storage::connect(&config).await?;

    // Build shared state
    let state = Arc::new(AppState::new(config.clone(), store));

    // Refill energy for live games in the background
    let tick = Duration::from_secs(config.energy_tick_secs);
    state.registry.clone().spawn_energy_ticker(tick);
    tracing::info!(period_secs = config.energy_tick_secs, "Energy ticker started");

    // Build router
    let app = tap_arena::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("tap_arena=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
