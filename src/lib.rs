// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Tap Arena: backend for a tap-to-earn Telegram Mini App
//!
//! This crate resolves the launching Telegram user, keeps one game
//! controller per identity and persists progress to Firestore.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::Storage;
use services::GameRegistry;
use std::sync::Arc;
use std::time::Duration;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub registry: Arc<GameRegistry<Storage>>,
}

impl AppState {
    /// Build the state around an already-connected store.
    pub fn new(config: Config, store: Storage) -> Self {
        let registry = Arc::new(
            GameRegistry::new(store, config.launch_token_key.clone())
                .with_idle_timeout(Duration::from_secs(config.controller_idle_secs)),
        );
        Self { config, registry }
    }
}
