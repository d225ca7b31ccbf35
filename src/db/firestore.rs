// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides the progress-store operations over the `users` collection:
//! - point lookup and merge-upsert of progress documents
//! - leaderboard query (points descending)
//! - transactional task completion
//! - player counts through aggregation queries

use crate::db::{collections, ProgressStore};
use crate::error::AppError;
use crate::models::progress::leaderboard_order;
use crate::models::{ProgressWrite, UserProgress};
use serde::Deserialize;

/// Result row of a count aggregation.
#[derive(Debug, Deserialize)]
struct PlayerCount {
    count: u64,
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }
}

impl ProgressStore for FirestoreDb {
    fn backend_name(&self) -> &'static str {
        "firestore"
    }

    async fn get_progress(&self, user_id: u64) -> Result<Option<UserProgress>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(&user_id.to_string())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn merge_progress(&self, write: &ProgressWrite) -> Result<(), AppError> {
        if write.created_at.is_some() {
            return self.create_progress(write).await;
        }

        // The update mask limits the write to the fields present in `write`;
        // without it Firestore would replace the whole document.
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .fields(write.field_paths())
            .in_col(collections::USERS)
            .document_id(write.user_id.to_string())
            .object(write)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn top_players(&self, limit: u32) -> Result<Vec<UserProgress>, AppError> {
        // Needs a composite index on (points DESC, userId ASC).
        let mut players: Vec<UserProgress> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .order_by([
                ("points", firestore::FirestoreQueryDirection::Descending),
                ("userId", firestore::FirestoreQueryDirection::Ascending),
            ])
            .limit(limit)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        players.sort_by(leaderboard_order);
        Ok(players)
    }

    /// Complete a task inside a Firestore transaction.
    ///
    /// The document is read within the transaction, so a concurrent
    /// completion of the same task makes the commit conflict and the closure
    /// is re-run against fresh data, where the duplicate is detected.
    async fn complete_task(
        &self,
        user_id: u64,
        task_id: &str,
        reward: u64,
    ) -> Result<Option<UserProgress>, AppError> {
        let task_id = task_id.to_string();

        let outcome = self
            .get_client()?
            .run_transaction(move |db, transaction| {
                let task_id = task_id.clone();
                Box::pin(async move {
                    let current: Option<UserProgress> = db
                        .fluent()
                        .select()
                        .by_id_in(collections::USERS)
                        .obj()
                        .one(&user_id.to_string())
                        .await?;

                    let now = chrono::Utc::now();
                    let mut progress = match current {
                        Some(mut progress) => {
                            progress.normalize();
                            progress
                        }
                        None => {
                            let mut progress = UserProgress::new_user(user_id, now);
                            progress.created_at = Some(now);
                            progress
                        }
                    };

                    if !progress.apply_task_completion(&task_id, reward) {
                        return Ok(None);
                    }
                    progress.updated_at = Some(now);
                    progress.last_played = Some(now);

                    db.fluent()
                        .update()
                        .in_col(collections::USERS)
                        .document_id(user_id.to_string())
                        .object(&progress)
                        .add_to_transaction(transaction)?;

                    Ok(Some(progress))
                })
            })
            .await
            .map_err(|e| AppError::Database(format!("Task completion transaction failed: {}", e)))?;

        match &outcome {
            Some(progress) => tracing::info!(
                user_id,
                points = progress.points,
                "Task completed atomically"
            ),
            None => tracing::debug!(user_id, "Task already completed (idempotent skip)"),
        }

        Ok(outcome)
    }

    async fn count_players_above(&self, points: u64) -> Result<u64, AppError> {
        let counts: Vec<PlayerCount> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .filter(move |q| q.for_all([q.field("points").greater_than(points)]))
            .aggregate(|a| a.fields([a.field("count").count()]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(counts.first().map_or(0, |row| row.count))
    }

    async fn count_players(&self) -> Result<u64, AppError> {
        let counts: Vec<PlayerCount> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .aggregate(|a| a.fields([a.field("count").count()]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(counts.first().map_or(0, |row| row.count))
    }
}

impl FirestoreDb {
    /// Creating write: `createdAt` is only set if the stored document has none.
    ///
    /// Runs in a transaction so two instances racing on a new user cannot
    /// both stamp it.
    async fn create_progress(&self, write: &ProgressWrite) -> Result<(), AppError> {
        let write = write.clone();

        self.get_client()?
            .run_transaction(move |db, transaction| {
                let write = write.clone();
                Box::pin(async move {
                    let existing: Option<UserProgress> = db
                        .fluent()
                        .select()
                        .by_id_in(collections::USERS)
                        .obj()
                        .one(&write.user_id.to_string())
                        .await?;

                    let mut paths = write.field_paths();
                    if existing.is_some_and(|doc| doc.created_at.is_some()) {
                        tracing::debug!(user_id = write.user_id, "Keeping stored createdAt");
                        paths.retain(|path| path != "createdAt");
                    }

                    db.fluent()
                        .update()
                        .fields(paths)
                        .in_col(collections::USERS)
                        .document_id(write.user_id.to_string())
                        .object(&write)
                        .add_to_transaction(transaction)?;

                    Ok(())
                })
            })
            .await
            .map_err(|e| AppError::Database(format!("Creating progress failed: {}", e)))
    }
}
