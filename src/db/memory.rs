// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Process-local progress store.
//!
//! Used for local development and as the test double for the Firestore
//! backend. Failure and latency injection let tests exercise the load/save
//! error paths and saves that are still in flight.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::db::ProgressStore;
use crate::error::AppError;
use crate::models::progress::leaderboard_order;
use crate::models::{ProgressWrite, UserProgress};

#[derive(Clone, Default)]
pub struct MemoryStore {
    docs: Arc<Mutex<HashMap<u64, UserProgress>>>,
    fail_reads: Arc<AtomicBool>,
    fail_writes: Arc<AtomicBool>,
    write_delay_ms: Arc<AtomicU64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent read fail (until reset).
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent write fail (until reset).
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Delay every subsequent merge write by `delay`.
    pub fn set_write_delay(&self, delay: Duration) {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.write_delay_ms.store(millis, Ordering::SeqCst);
    }

    /// Insert a document verbatim, bypassing merge semantics.
    pub async fn insert(&self, progress: UserProgress) {
        self.docs.lock().await.insert(progress.user_id, progress);
    }

    fn check_read(&self) -> Result<(), AppError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(AppError::Database("injected read failure".to_string()));
        }
        Ok(())
    }

    fn check_write(&self) -> Result<(), AppError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::Database("injected write failure".to_string()));
        }
        Ok(())
    }
}

impl ProgressStore for MemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn get_progress(&self, user_id: u64) -> Result<Option<UserProgress>, AppError> {
        self.check_read()?;
        Ok(self.docs.lock().await.get(&user_id).cloned())
    }

    async fn merge_progress(&self, write: &ProgressWrite) -> Result<(), AppError> {
        let delay = self.write_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        self.check_write()?;
        let mut docs = self.docs.lock().await;
        docs.entry(write.user_id)
            .or_insert_with(|| {
                let mut doc = UserProgress::new_user(write.user_id, write.updated_at);
                doc.is_new_user = false;
                doc
            })
            .apply_write(write);
        Ok(())
    }

    async fn top_players(&self, limit: u32) -> Result<Vec<UserProgress>, AppError> {
        self.check_read()?;
        let docs = self.docs.lock().await;
        let mut players: Vec<UserProgress> = docs.values().cloned().collect();
        players.sort_by(leaderboard_order);
        players.truncate(limit as usize);
        Ok(players)
    }

    async fn complete_task(
        &self,
        user_id: u64,
        task_id: &str,
        reward: u64,
    ) -> Result<Option<UserProgress>, AppError> {
        self.check_write()?;
        // Check and update under one lock acquisition.
        let mut docs = self.docs.lock().await;
        let now = chrono::Utc::now();
        let doc = docs.entry(user_id).or_insert_with(|| {
            let mut doc = UserProgress::new_user(user_id, now);
            doc.created_at = Some(now);
            doc.is_new_user = false;
            doc
        });

        if !doc.apply_task_completion(task_id, reward) {
            return Ok(None);
        }
        doc.updated_at = Some(now);
        doc.last_played = Some(now);
        Ok(Some(doc.clone()))
    }

    async fn count_players_above(&self, points: u64) -> Result<u64, AppError> {
        self.check_read()?;
        let docs = self.docs.lock().await;
        Ok(docs.values().filter(|doc| doc.points > points).count() as u64)
    }

    async fn count_players(&self) -> Result<u64, AppError> {
        self.check_read()?;
        Ok(self.docs.lock().await.len() as u64)
    }
}
