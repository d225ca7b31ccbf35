// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Secrets (signing keys, bot token) are injected as environment variables
//! by the deployment and read once at startup.

use std::env;
use std::str::FromStr;

/// Which progress store backs the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// Cloud Firestore (or the emulator when `FIRESTORE_EMULATOR_HOST` is set)
    Firestore,
    /// Process-local store, for local development
    Memory,
}

impl FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "firestore" => Ok(Self::Firestore),
            "memory" => Ok(Self::Memory),
            _ => Err(ConfigError::Invalid("STORAGE_BACKEND")),
        }
    }
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Mini App URL, allowed as a CORS origin
    pub frontend_url: String,
    /// GCP project ID
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
    /// Progress store backend
    pub storage_backend: StorageBackend,
    /// Seconds between energy regeneration sweeps
    pub energy_tick_secs: u64,
    /// Seconds a game controller may sit unused before it is dropped
    pub controller_idle_secs: u64,

    // --- Secrets ---
    /// JWT signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
    /// Key the bot signs launch tokens with
    pub launch_token_key: Vec<u8>,
    /// Telegram bot token, used to verify Mini App init data
    pub telegram_bot_token: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let jwt_signing_key = env::var("JWT_SIGNING_KEY")
            .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
            .into_bytes();

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            storage_backend: env::var("STORAGE_BACKEND")
                .map(|v| v.parse())
                .unwrap_or(Ok(StorageBackend::Firestore))?,
            energy_tick_secs: env::var("ENERGY_TICK_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|secs| *secs > 0)
                .unwrap_or(60),
            controller_idle_secs: env::var("CONTROLLER_IDLE_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|secs| *secs > 0)
                .unwrap_or(30 * 60),

            launch_token_key: env::var("LAUNCH_TOKEN_KEY")
                .map(|v| v.trim().as_bytes().to_vec())
                .unwrap_or_else(|_| jwt_signing_key.clone()),
            jwt_signing_key,
            telegram_bot_token: env::var("TELEGRAM_BOT_TOKEN")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("TELEGRAM_BOT_TOKEN"))?,
        })
    }

    /// Config for tests: in-memory storage and fixed keys.
    pub fn test_default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            gcp_project_id: "test-project".to_string(),
            port: 8080,
            storage_backend: StorageBackend::Memory,
            energy_tick_secs: 60,
            controller_idle_secs: 30 * 60,
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            launch_token_key: b"test_launch_key_32_bytes_minimum".to_vec(),
            telegram_bot_token: "123456:TEST-BOT-TOKEN".to_string(),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}
