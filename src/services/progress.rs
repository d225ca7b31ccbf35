// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Progress store client: the game-facing façade over a [`ProgressStore`].
//!
//! Every operation waits for the auth session, then maps store failures
//! onto the load/save error taxonomy. Leaderboard reads never fail; they
//! degrade to an empty list.

use serde::Serialize;
use std::sync::Arc;

use crate::db::ProgressStore;
use crate::error::AppError;
use crate::models::{
    LeaderboardEntry, ProgressPatch, ProgressWrite, TaskCompletion, TelegramUser, UserProgress,
};
use crate::services::session::AuthSession;

/// Result of a successful save.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SaveOutcome {
    pub success: bool,
    /// Backend that took the write
    pub method: &'static str,
}

#[derive(Clone)]
pub struct ProgressClient<S> {
    store: S,
    session: Arc<AuthSession>,
}

impl<S: ProgressStore> ProgressClient<S> {
    pub fn new(store: S, session: Arc<AuthSession>) -> Self {
        Self { store, session }
    }

    pub fn session(&self) -> &AuthSession {
        &self.session
    }

    /// Fetch an identity's progress.
    ///
    /// A missing document yields a fresh record flagged `is_new_user`;
    /// nothing is written until the first save.
    pub async fn get_user_progress(&self, user_id: u64) -> Result<UserProgress, AppError> {
        self.session
            .ensure_ready()
            .await
            .map_err(|e| AppError::Load(e.to_string()))?;

        match self.store.get_progress(user_id).await {
            Ok(Some(mut progress)) => {
                progress.normalize();
                tracing::debug!(user_id, points = progress.points, "Loaded progress");
                Ok(progress)
            }
            Ok(None) => {
                tracing::info!(user_id, "User not found, will create on first save");
                Ok(UserProgress::new_user(user_id, chrono::Utc::now()))
            }
            Err(e) => {
                tracing::warn!(user_id, error = %e, "Progress load failed");
                Err(AppError::Load(e.to_string()))
            }
        }
    }

    /// Merge `patch` into the stored document, creating it if needed.
    ///
    /// `updatedAt`/`lastPlayed` are always stamped; `createdAt` only when the
    /// patch asks for it. Display names are refreshed from `identity`.
    pub async fn save_user_progress(
        &self,
        user_id: u64,
        patch: &ProgressPatch,
        identity: &TelegramUser,
    ) -> Result<SaveOutcome, AppError> {
        self.session
            .ensure_ready()
            .await
            .map_err(|e| AppError::Save(e.to_string()))?;

        let write = ProgressWrite::new(user_id, patch, identity, chrono::Utc::now());
        self.store.merge_progress(&write).await.map_err(|e| {
            tracing::warn!(user_id, error = %e, "Progress save failed");
            AppError::Save(e.to_string())
        })?;

        tracing::debug!(user_id, create = patch.create, "Saved progress");
        Ok(SaveOutcome {
            success: true,
            method: self.store.backend_name(),
        })
    }

    /// Top players by points. Empty on any failure.
    pub async fn get_leaderboard(&self, limit: u32) -> Vec<LeaderboardEntry> {
        if let Err(e) = self.session.ensure_ready().await {
            tracing::warn!(error = %e, "Leaderboard unavailable without session");
            return Vec::new();
        }

        match self.store.top_players(limit).await {
            Ok(players) => players
                .iter()
                .take(limit as usize)
                .map(LeaderboardEntry::from)
                .collect(),
            Err(e) => {
                tracing::warn!(error = %e, "Leaderboard query failed, returning empty");
                Vec::new()
            }
        }
    }

    /// Complete a task once, crediting `reward` atomically.
    pub async fn complete_task(
        &self,
        user_id: u64,
        task_id: &str,
        reward: u64,
    ) -> Result<TaskCompletion, AppError> {
        self.session
            .ensure_ready()
            .await
            .map_err(|e| AppError::Save(e.to_string()))?;

        match self.store.complete_task(user_id, task_id, reward).await {
            Ok(Some(progress)) => {
                tracing::info!(user_id, task_id, reward, "Task completed");
                Ok(TaskCompletion::from(&progress))
            }
            Ok(None) => Err(AppError::AlreadyCompleted(task_id.to_string())),
            Err(e) => {
                tracing::warn!(user_id, task_id, error = %e, "Task completion failed");
                Err(AppError::Save(e.to_string()))
            }
        }
    }

    /// 1-based position by points (ties share a position).
    pub async fn get_user_rank(&self, user_id: u64) -> Result<u64, AppError> {
        let progress = self.get_user_progress(user_id).await?;
        let ahead = self
            .store
            .count_players_above(progress.points)
            .await
            .map_err(|e| AppError::Load(e.to_string()))?;
        Ok(ahead + 1)
    }

    pub async fn get_total_players(&self) -> Result<u64, AppError> {
        self.session
            .ensure_ready()
            .await
            .map_err(|e| AppError::Load(e.to_string()))?;

        self.store
            .count_players()
            .await
            .map_err(|e| AppError::Load(e.to_string()))
    }
}
