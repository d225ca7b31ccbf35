// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer (Firestore, plus an in-memory store for development).

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryStore;

use crate::config::{Config, StorageBackend};
use crate::error::AppError;
use crate::models::{ProgressWrite, UserProgress};
use std::future::Future;

/// Collection names as constants.
pub mod collections {
    /// Progress documents (keyed by Telegram user ID)
    pub const USERS: &str = "users";
}

/// Document store holding one progress document per identity.
///
/// Implementations report transport failures as [`AppError::Database`];
/// the progress client maps them onto load/save errors.
pub trait ProgressStore: Clone + Send + Sync + 'static {
    /// Short backend name, reported back to callers of a save.
    fn backend_name(&self) -> &'static str;

    /// Point lookup by user ID.
    fn get_progress(
        &self,
        user_id: u64,
    ) -> impl Future<Output = Result<Option<UserProgress>, AppError>> + Send;

    /// Merge-upsert: fields absent from `write` keep their stored values.
    fn merge_progress(
        &self,
        write: &ProgressWrite,
    ) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Top documents by points descending, user ID ascending.
    fn top_players(
        &self,
        limit: u32,
    ) -> impl Future<Output = Result<Vec<UserProgress>, AppError>> + Send;

    /// Atomically add `task_id` to the completed set and credit `reward`.
    ///
    /// Returns the updated document, or `None` if the task was already
    /// completed (nothing is written in that case).
    fn complete_task(
        &self,
        user_id: u64,
        task_id: &str,
        reward: u64,
    ) -> impl Future<Output = Result<Option<UserProgress>, AppError>> + Send;

    /// Number of players with strictly more than `points`.
    fn count_players_above(
        &self,
        points: u64,
    ) -> impl Future<Output = Result<u64, AppError>> + Send;

    /// Total number of progress documents.
    fn count_players(&self) -> impl Future<Output = Result<u64, AppError>> + Send;
}

/// Store selected at startup.
#[derive(Clone)]
pub enum Storage {
    Firestore(FirestoreDb),
    Memory(MemoryStore),
}

impl Storage {
    /// Connect the backend named in the configuration.
    pub async fn connect(config: &Config) -> Result<Self, AppError> {
        match config.storage_backend {
            StorageBackend::Firestore => Ok(Self::Firestore(
                FirestoreDb::new(&config.gcp_project_id).await?,
            )),
            StorageBackend::Memory => {
                tracing::warn!("Using in-memory progress store; data is lost on restart");
                Ok(Self::Memory(MemoryStore::new()))
            }
        }
    }
}

impl ProgressStore for Storage {
    fn backend_name(&self) -> &'static str {
        match self {
            Storage::Firestore(db) => db.backend_name(),
            Storage::Memory(store) => store.backend_name(),
        }
    }

    async fn get_progress(&self, user_id: u64) -> Result<Option<UserProgress>, AppError> {
        match self {
            Storage::Firestore(db) => db.get_progress(user_id).await,
            Storage::Memory(store) => store.get_progress(user_id).await,
        }
    }

    async fn merge_progress(&self, write: &ProgressWrite) -> Result<(), AppError> {
        match self {
            Storage::Firestore(db) => db.merge_progress(write).await,
            Storage::Memory(store) => store.merge_progress(write).await,
        }
    }

    async fn top_players(&self, limit: u32) -> Result<Vec<UserProgress>, AppError> {
        match self {
            Storage::Firestore(db) => db.top_players(limit).await,
            Storage::Memory(store) => store.top_players(limit).await,
        }
    }

    async fn complete_task(
        &self,
        user_id: u64,
        task_id: &str,
        reward: u64,
    ) -> Result<Option<UserProgress>, AppError> {
        match self {
            Storage::Firestore(db) => db.complete_task(user_id, task_id, reward).await,
            Storage::Memory(store) => store.complete_task(user_id, task_id, reward).await,
        }
    }

    async fn count_players_above(&self, points: u64) -> Result<u64, AppError> {
        match self {
            Storage::Firestore(db) => db.count_players_above(points).await,
            Storage::Memory(store) => store.count_players_above(points).await,
        }
    }

    async fn count_players(&self) -> Result<u64, AppError> {
        match self {
            Storage::Firestore(db) => db.count_players().await,
            Storage::Memory(store) => store.count_players().await,
        }
    }
}
