// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Per-identity game progress, as stored in the `users` collection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::models::rank::{level_for, rank_for};
use crate::models::TelegramUser;

/// Energy capacity of a fresh account.
pub const DEFAULT_MAX_ENERGY: u32 = 1000;
/// Points-per-tap multiplier of a fresh account.
pub const DEFAULT_COINS_PER_TAP: u32 = 1;

fn default_level() -> u32 {
    1
}

fn default_energy() -> u32 {
    DEFAULT_MAX_ENERGY
}

fn default_coins_per_tap() -> u32 {
    DEFAULT_COINS_PER_TAP
}

/// Progress document stored in Firestore (`users/{userId}`).
///
/// Field names are camelCase to stay compatible with documents written by
/// earlier Mini App builds. Missing fields fall back to fresh-account values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProgress {
    /// Telegram user ID (also used as document ID)
    pub user_id: u64,
    #[serde(default)]
    pub points: u64,
    /// Always `floor(points / 100) + 1`; see [`UserProgress::set_points`].
    #[serde(default = "default_level")]
    pub level: u32,
    /// Number of taps
    #[serde(default)]
    pub games_played: u64,
    #[serde(default = "default_energy")]
    pub energy: u32,
    #[serde(default = "default_energy")]
    pub max_energy: u32,
    /// Last full energy refill
    #[serde(default = "Utc::now")]
    pub last_energy_refresh: DateTime<Utc>,
    #[serde(default)]
    pub completed_tasks: Vec<String>,
    #[serde(default)]
    pub purchased_boosters: Vec<String>,
    #[serde(default = "default_coins_per_tap")]
    pub coins_per_tap: u32,
    /// End of the auto-tap window bought with the auto-tapper booster
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_tap_until: Option<DateTime<Utc>>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_played: Option<DateTime<Utc>>,

    /// Set on read-miss; the document is written on first save.
    #[serde(skip)]
    pub is_new_user: bool,
}

impl UserProgress {
    /// In-memory record for an identity with no stored document.
    pub fn new_user(user_id: u64, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            points: 0,
            level: 1,
            games_played: 0,
            energy: DEFAULT_MAX_ENERGY,
            max_energy: DEFAULT_MAX_ENERGY,
            last_energy_refresh: now,
            completed_tasks: Vec::new(),
            purchased_boosters: Vec::new(),
            coins_per_tap: DEFAULT_COINS_PER_TAP,
            auto_tap_until: None,
            first_name: None,
            username: None,
            created_at: None,
            updated_at: None,
            last_played: None,
            is_new_user: true,
        }
    }

    /// Set the point total and recompute the level.
    pub fn set_points(&mut self, points: u64) {
        self.points = points;
        self.level = level_for(points);
    }

    /// Re-establish derived fields after reading a stored document.
    ///
    /// Older documents may carry a stale level or energy above capacity.
    pub fn normalize(&mut self) {
        self.level = level_for(self.points);
        if self.max_energy == 0 {
            self.max_energy = DEFAULT_MAX_ENERGY;
        }
        self.energy = self.energy.min(self.max_energy);
        if self.coins_per_tap == 0 {
            self.coins_per_tap = DEFAULT_COINS_PER_TAP;
        }
        dedup_in_order(&mut self.completed_tasks);
        dedup_in_order(&mut self.purchased_boosters);
    }

    pub fn has_completed(&self, task_id: &str) -> bool {
        self.completed_tasks.iter().any(|t| t == task_id)
    }

    pub fn owns_booster(&self, booster_id: &str) -> bool {
        self.purchased_boosters.iter().any(|b| b == booster_id)
    }

    /// Record a completed task and credit its reward.
    ///
    /// Returns `false` without crediting if the task was already completed.
    pub fn apply_task_completion(&mut self, task_id: &str, reward: u64) -> bool {
        if self.has_completed(task_id) {
            return false;
        }
        self.completed_tasks.push(task_id.to_string());
        self.set_points(self.points.saturating_add(reward));
        true
    }

    /// Merge a write into this document, honouring write-once `createdAt`.
    pub fn apply_write(&mut self, write: &ProgressWrite) {
        if let Some(points) = write.points {
            self.set_points(points);
        }
        if let Some(games_played) = write.games_played {
            self.games_played = games_played;
        }
        if let Some(max_energy) = write.max_energy {
            self.max_energy = max_energy;
        }
        if let Some(energy) = write.energy {
            self.energy = energy;
        }
        if let Some(refresh) = write.last_energy_refresh {
            self.last_energy_refresh = refresh;
        }
        if let Some(boosters) = &write.purchased_boosters {
            self.purchased_boosters = boosters.clone();
        }
        if let Some(coins_per_tap) = write.coins_per_tap {
            self.coins_per_tap = coins_per_tap;
        }
        if let Some(until) = write.auto_tap_until {
            self.auto_tap_until = Some(until);
        }
        if let Some(first_name) = &write.first_name {
            self.first_name = Some(first_name.clone());
        }
        if let Some(username) = &write.username {
            self.username = Some(username.clone());
        }
        if self.created_at.is_none() {
            self.created_at = write.created_at;
        }
        self.updated_at = Some(write.updated_at);
        self.last_played = Some(write.last_played);
        self.is_new_user = false;
    }
}

fn dedup_in_order(ids: &mut Vec<String>) {
    let mut seen = std::collections::HashSet::new();
    ids.retain(|id| seen.insert(id.clone()));
}

/// Partial update of a progress document.
///
/// Only fields that are `Some` are written; everything else keeps its stored
/// value. There is deliberately no `level` field: it is derived from
/// `points` when the write is built. Completed tasks are only ever written
/// through the atomic task-completion path.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgressPatch {
    pub points: Option<u64>,
    pub games_played: Option<u64>,
    pub energy: Option<u32>,
    pub max_energy: Option<u32>,
    pub last_energy_refresh: Option<DateTime<Utc>>,
    pub purchased_boosters: Option<Vec<String>>,
    pub coins_per_tap: Option<u32>,
    pub auto_tap_until: Option<DateTime<Utc>>,
    /// Stamp `createdAt` (first write for a new identity)
    pub create: bool,
}

impl ProgressPatch {
    /// Patch writing every field of a fresh account.
    pub fn initial(progress: &UserProgress) -> Self {
        Self {
            points: Some(progress.points),
            games_played: Some(progress.games_played),
            energy: Some(progress.energy),
            max_energy: Some(progress.max_energy),
            last_energy_refresh: Some(progress.last_energy_refresh),
            purchased_boosters: Some(progress.purchased_boosters.clone()),
            coins_per_tap: Some(progress.coins_per_tap),
            auto_tap_until: progress.auto_tap_until,
            create: true,
        }
    }
}

/// The fields actually sent to the store for one save.
///
/// Built from a [`ProgressPatch`] plus the caller identity and the save
/// timestamp. `None` fields are omitted from both the serialized document
/// and the Firestore update mask.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressWrite {
    pub user_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub games_played: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub energy: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_energy: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_energy_refresh: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purchased_boosters: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coins_per_tap: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_tap_until: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
    pub last_played: DateTime<Utc>,
}

impl ProgressWrite {
    pub fn new(
        user_id: u64,
        patch: &ProgressPatch,
        identity: &TelegramUser,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            points: patch.points,
            level: patch.points.map(level_for),
            games_played: patch.games_played,
            energy: patch.energy,
            max_energy: patch.max_energy,
            last_energy_refresh: patch.last_energy_refresh,
            purchased_boosters: patch.purchased_boosters.clone(),
            coins_per_tap: patch.coins_per_tap,
            auto_tap_until: patch.auto_tap_until,
            first_name: identity.display_first_name().map(str::to_string),
            username: identity.display_username().map(str::to_string),
            created_at: patch.create.then_some(now),
            updated_at: now,
            last_played: now,
        }
    }

    /// Document field paths this write touches (Firestore update mask).
    pub fn field_paths(&self) -> Vec<String> {
        let optional = [
            ("points", self.points.is_some()),
            ("level", self.level.is_some()),
            ("gamesPlayed", self.games_played.is_some()),
            ("energy", self.energy.is_some()),
            ("maxEnergy", self.max_energy.is_some()),
            ("lastEnergyRefresh", self.last_energy_refresh.is_some()),
            ("purchasedBoosters", self.purchased_boosters.is_some()),
            ("coinsPerTap", self.coins_per_tap.is_some()),
            ("autoTapUntil", self.auto_tap_until.is_some()),
            ("firstName", self.first_name.is_some()),
            ("username", self.username.is_some()),
            ("createdAt", self.created_at.is_some()),
        ];

        ["userId", "updatedAt", "lastPlayed"]
            .into_iter()
            .chain(
                optional
                    .into_iter()
                    .filter(|(_, present)| *present)
                    .map(|(path, _)| path),
            )
            .map(str::to_string)
            .collect()
    }
}

/// Leaderboard row (read-only projection of a progress document).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LeaderboardEntry {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub user_id: u64,
    pub first_name: String,
    pub username: Option<String>,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub points: u64,
    pub level: u32,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub games_played: u64,
    #[cfg_attr(feature = "binding-generation", ts(type = "string | null"))]
    pub last_played: Option<DateTime<Utc>>,
    pub rank: String,
}

impl From<&UserProgress> for LeaderboardEntry {
    fn from(progress: &UserProgress) -> Self {
        Self {
            user_id: progress.user_id,
            first_name: progress
                .first_name
                .clone()
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| "Anonymous".to_string()),
            username: progress.username.clone(),
            points: progress.points,
            level: level_for(progress.points),
            games_played: progress.games_played,
            last_played: progress.last_played,
            rank: rank_for(progress.points).name.to_string(),
        }
    }
}

/// Leaderboard order: points descending, then user ID ascending.
pub fn leaderboard_order(a: &UserProgress, b: &UserProgress) -> std::cmp::Ordering {
    b.points
        .cmp(&a.points)
        .then_with(|| a.user_id.cmp(&b.user_id))
}

/// Authoritative result of a task completion.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct TaskCompletion {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub new_points: u64,
    pub new_level: u32,
    pub completed_tasks: Vec<String>,
}

impl From<&UserProgress> for TaskCompletion {
    fn from(progress: &UserProgress) -> Self {
        Self {
            new_points: progress.points,
            new_level: progress.level,
            completed_tasks: progress.completed_tasks.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_760_000_000, 0).unwrap()
    }

    #[test]
    fn test_deserialize_sparse_document() {
        // Documents written by early builds only carried these fields.
        let doc = serde_json::json!({
            "userId": 42,
            "points": 250,
            "level": 1,
            "gamesPlayed": 250,
        });

        let mut progress: UserProgress = serde_json::from_value(doc).unwrap();
        progress.normalize();

        assert_eq!(progress.level, 3);
        assert_eq!(progress.energy, DEFAULT_MAX_ENERGY);
        assert_eq!(progress.coins_per_tap, 1);
        assert!(progress.completed_tasks.is_empty());
        assert!(progress.created_at.is_none());
        assert!(!progress.is_new_user);
    }

    #[test]
    fn test_normalize_clamps_energy_and_dedups() {
        let mut progress = UserProgress::new_user(1, now());
        progress.energy = 5000;
        progress.completed_tasks = vec!["a".into(), "b".into(), "a".into()];

        progress.normalize();

        assert_eq!(progress.energy, progress.max_energy);
        assert_eq!(progress.completed_tasks, vec!["a", "b"]);
    }

    #[test]
    fn test_apply_task_completion_credits_once() {
        let mut progress = UserProgress::new_user(1, now());
        assert!(progress.apply_task_completion("join_channel", 150));
        assert!(!progress.apply_task_completion("join_channel", 150));

        assert_eq!(progress.points, 150);
        assert_eq!(progress.level, 2);
        assert_eq!(progress.completed_tasks, vec!["join_channel"]);
    }

    #[test]
    fn test_write_mask_and_serialization_agree() {
        let identity = TelegramUser {
            id: 7,
            first_name: "Ada".to_string(),
            username: None,
            is_premium: false,
        };
        let patch = ProgressPatch {
            points: Some(120),
            energy: Some(990),
            ..Default::default()
        };

        let write = ProgressWrite::new(7, &patch, &identity, now());
        let value = serde_json::to_value(&write).unwrap();
        let object = value.as_object().unwrap();

        let mut serialized: Vec<&str> = object.keys().map(String::as_str).collect();
        serialized.sort_unstable();
        let mut mask = write.field_paths();
        mask.sort_unstable();

        assert_eq!(serialized, mask);
        assert_eq!(object["level"], 2);
        assert!(!object.contains_key("createdAt"));
        assert!(!object.contains_key("username"));

        // The Firestore update builder reads the written object back.
        let read_back: ProgressWrite = serde_json::from_value(value).unwrap();
        assert_eq!(read_back, write);
    }

    #[test]
    fn test_apply_write_keeps_created_at() {
        let identity = TelegramUser::bare(9);
        let initial = ProgressPatch::initial(&UserProgress::new_user(9, now()));
        let first = ProgressWrite::new(9, &initial, &identity, now());
        let later = now() + chrono::Duration::hours(1);
        let again = ProgressWrite::new(
            9,
            &ProgressPatch {
                create: true,
                ..Default::default()
            },
            &identity,
            later,
        );

        let mut doc = UserProgress::new_user(9, now());
        doc.apply_write(&first);
        doc.apply_write(&again);

        assert_eq!(doc.created_at, Some(now()));
        assert_eq!(doc.updated_at, Some(later));
        assert!(!doc.is_new_user);
    }

    #[test]
    fn test_leaderboard_entry_defaults_name() {
        let progress = UserProgress::new_user(3, now());
        let entry = LeaderboardEntry::from(&progress);
        assert_eq!(entry.first_name, "Anonymous");
        assert_eq!(entry.rank, "Beginner");
    }
}
