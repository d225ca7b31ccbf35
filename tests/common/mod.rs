// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use std::sync::Arc;
use tap_arena::config::Config;
use tap_arena::db::{FirestoreDb, MemoryStore, Storage};
use tap_arena::models::TelegramUser;
use tap_arena::routes::create_router;
use tap_arena::services::{AuthSession, GameController, ProgressClient};
use tap_arena::AppState;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Telegram user with a display name.
#[allow(dead_code)]
pub fn test_user(id: u64) -> TelegramUser {
    TelegramUser {
        id,
        first_name: "Tess".to_string(),
        username: Some("tess".to_string()),
        is_premium: false,
    }
}

/// Unique ID for test isolation against a shared emulator.
#[allow(dead_code)]
pub fn unique_user_id() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos() as u64
}

/// Controller over an in-memory store with an anonymous session.
#[allow(dead_code)]
pub fn test_controller(store: &MemoryStore, user: TelegramUser) -> GameController<MemoryStore> {
    let config = Config::test_default();
    let session = Arc::new(AuthSession::new(None, config.launch_token_key));
    let client = ProgressClient::new(store.clone(), session);
    GameController::new(user, client, chrono::Utc::now())
}

/// Create a test app over an in-memory store.
/// Returns the router, the shared state and a handle on the store.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>, MemoryStore) {
    create_test_app_with_config(Config::test_default())
}

#[allow(dead_code)]
pub fn create_test_app_with_config(config: Config) -> (axum::Router, Arc<AppState>, MemoryStore) {
    let store = MemoryStore::new();
    let state = Arc::new(AppState::new(config, Storage::Memory(store.clone())));
    (create_router(state.clone()), state, store)
}
