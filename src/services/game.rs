// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Game state controller for one identity.
//!
//! The controller mirrors the identity's progress document in memory,
//! applies user actions optimistically and persists them through the
//! progress client, rolling the local state back when a save fails.
//!
//! All state sits behind one async mutex that is held for the whole action,
//! including its save. At most one save per identity is in flight, and a
//! rollback always restores exactly the state the failed action started from.
//! The energy ticker goes through the same lock.
//!
//! Every view handed out is also published on a watch channel, so a reader
//! arriving while an action holds the lock gets the last view with
//! `is_saving` set instead of waiting for the save.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{watch, Mutex};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::db::ProgressStore;
use crate::error::AppError;
use crate::models::catalog::{find_booster, find_task};
use crate::models::rank::{rank_for, POINTS_PER_LEVEL};
use crate::models::{
    BoosterDef, BoosterEffect, HostMessage, LeaderboardEntry, ProgressPatch, TaskCompletion,
    TaskDef, TelegramUser, UserProgress,
};
use crate::services::progress::ProgressClient;
use crate::time_utils::{format_hours_minutes, format_utc_rfc3339};

/// Time after which spent energy is refilled in full.
const ENERGY_REFILL_WINDOW_SECS: i64 = 2 * 60 * 60;

/// Leaderboard size kept by the controller.
pub const LEADERBOARD_LIMIT: u32 = 100;

/// Host messages are sent on level-up or whenever points hit a multiple of this.
const HOST_UPDATE_EVERY_POINTS: u64 = 10;

pub fn energy_refill_window() -> Duration {
    Duration::seconds(ENERGY_REFILL_WINDOW_SECS)
}

struct GameState {
    /// Caller identity; names are written with every save
    identity: TelegramUser,
    progress: UserProgress,
    loaded: bool,
    save_error: Option<String>,
    online: bool,
    leaderboard: Vec<LeaderboardEntry>,
    user_position: Option<usize>,
    session_started: DateTime<Utc>,
}

/// Client-facing view of the controller state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct GameSnapshot {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub user_id: u64,
    pub first_name: String,
    pub username: Option<String>,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub points: u64,
    pub level: u32,
    pub rank: String,
    pub multiplier: u32,
    pub coins_per_tap: u32,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub games_played: u64,
    pub energy: u32,
    pub max_energy: u32,
    pub energy_countdown: String,
    pub completed_tasks: Vec<String>,
    pub purchased_boosters: Vec<String>,
    pub auto_tap_until: Option<String>,
    pub is_loading: bool,
    pub is_saving: bool,
    pub save_error: Option<String>,
    pub online: bool,
    pub user_position: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TapOutcome {
    pub points_gained: u64,
    /// Payload for the host's `sendData`, when one is due
    pub host_message: Option<HostMessage>,
    pub state: GameSnapshot,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PurchaseOutcome {
    pub booster: BoosterDef,
    pub state: GameSnapshot,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskOutcome {
    pub task: TaskDef,
    pub completion: TaskCompletion,
    pub state: GameSnapshot,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardView {
    pub entries: Vec<LeaderboardEntry>,
    /// 1-based position of the caller, if within the fetched rows
    pub user_position: Option<usize>,
}

pub struct GameController<S> {
    user_id: u64,
    client: ProgressClient<S>,
    state: Mutex<GameState>,
    saving: AtomicBool,
    published: watch::Sender<GameSnapshot>,
}

impl<S: ProgressStore> GameController<S> {
    /// Create an unloaded controller; state is fetched on first use.
    pub fn new(user: TelegramUser, client: ProgressClient<S>, now: DateTime<Utc>) -> Self {
        let state = GameState {
            progress: UserProgress::new_user(user.id, now),
            identity: user,
            loaded: false,
            save_error: None,
            online: true,
            leaderboard: Vec::new(),
            user_position: None,
            session_started: now,
        };
        let (published, _) = watch::channel(view(&state, false, now));

        Self {
            user_id: state.identity.id,
            client,
            state: Mutex::new(state),
            saving: AtomicBool::new(false),
            published,
        }
    }

    pub fn user_id(&self) -> u64 {
        self.user_id
    }

    /// Current caller identity.
    pub async fn identity(&self) -> TelegramUser {
        self.state.lock().await.identity.clone()
    }

    /// Take over the identity and launch token of a fresh launch.
    ///
    /// A controller restored from a session cookie starts with a bare
    /// identity and an anonymous session; the launch supplies the names
    /// written by later saves and the token the session signs in with.
    pub async fn adopt_launch(&self, user: TelegramUser, launch_token: Option<String>) {
        if user.id != self.user_id {
            tracing::warn!(
                user_id = self.user_id,
                launch_user_id = user.id,
                "Ignoring launch for a different identity"
            );
            return;
        }

        self.state.lock().await.identity = user;
        if let Some(token) = launch_token {
            self.client.session().supply_launch_token(token).await;
        }
    }

    pub fn client(&self) -> &ProgressClient<S> {
        &self.client
    }

    pub fn is_saving(&self) -> bool {
        self.saving.load(Ordering::SeqCst)
    }

    /// Load progress if not done yet and return the current view.
    ///
    /// Load failures leave default values and a banner in `save_error`;
    /// they are retried by the next action.
    pub async fn ensure_loaded(&self, now: DateTime<Utc>) -> GameSnapshot {
        let mut state = self.state.lock().await;
        if !state.loaded {
            // Failure is recorded in the state banner.
            let _ = self.load_locked(&mut state, now).await;
        }
        self.snapshot_locked(&state, now)
    }

    /// Current view without waiting for an in-flight action.
    pub fn snapshot(&self, now: DateTime<Utc>) -> GameSnapshot {
        match self.state.try_lock() {
            Ok(state) => self.snapshot_locked(&state, now),
            Err(_) => {
                let mut snapshot = self.published.borrow().clone();
                snapshot.is_saving = self.is_saving();
                snapshot
            }
        }
    }

    /// Record host connectivity; actions are refused while offline.
    pub async fn set_online(&self, online: bool) {
        self.state.lock().await.online = online;
    }

    /// One tap: spend a unit of energy for `multiplier × coinsPerTap` points.
    pub async fn tap(&self, now: DateTime<Utc>) -> Result<TapOutcome, AppError> {
        let mut state = self.state.lock().await;
        self.ready_locked(&mut state, now).await?;

        if let Err(e) = self.regenerate_locked(&mut state, now).await {
            tracing::warn!(user_id = self.user_id, error = %e, "Energy refill before tap failed");
        }

        if state.progress.energy == 0 {
            return Err(reject(&mut state, AppError::NoEnergy));
        }

        let prev_points = state.progress.points;
        let prev_level = state.progress.level;
        let prev_games = state.progress.games_played;
        let prev_energy = state.progress.energy;
        let prev_refresh = state.progress.last_energy_refresh;

        let points_gained = u64::from(rank_for(prev_points).multiplier)
            * u64::from(state.progress.coins_per_tap);

        let progress = &mut state.progress;
        progress.set_points(prev_points.saturating_add(points_gained));
        progress.games_played += 1;
        progress.energy -= 1;
        // The refill window starts when a full tank is first dipped into.
        let refresh = (prev_energy == progress.max_energy).then_some(now);
        if let Some(refresh) = refresh {
            progress.last_energy_refresh = refresh;
        }
        state.save_error = None;

        let patch = ProgressPatch {
            points: Some(state.progress.points),
            games_played: Some(state.progress.games_played),
            energy: Some(state.progress.energy),
            last_energy_refresh: refresh,
            create: state.progress.is_new_user,
            ..Default::default()
        };

        if let Err(e) = self.persist(&state, &patch).await {
            let progress = &mut state.progress;
            progress.points = prev_points;
            progress.level = prev_level;
            progress.games_played = prev_games;
            progress.energy = prev_energy;
            progress.last_energy_refresh = prev_refresh;
            return Err(reject(&mut state, e));
        }
        state.progress.is_new_user = false;

        let points = state.progress.points;
        if points % POINTS_PER_LEVEL == 0 {
            self.refresh_leaderboard_locked(&mut state, LEADERBOARD_LIMIT)
                .await;
        }

        let host_message = (state.progress.level > prev_level
            || points % HOST_UPDATE_EVERY_POINTS == 0)
            .then(|| HostMessage::progress_update(&state.progress));

        Ok(TapOutcome {
            points_gained,
            host_message,
            state: self.snapshot_locked(&state, now),
        })
    }

    /// Refill energy if the refill window has elapsed since the last refill.
    ///
    /// Returns whether a refill happened. Unloaded controllers are skipped.
    pub async fn regenerate_energy(&self, now: DateTime<Utc>) -> Result<bool, AppError> {
        let mut state = self.state.lock().await;
        if !state.loaded {
            return Ok(false);
        }
        self.regenerate_locked(&mut state, now).await
    }

    /// Buy a booster from the catalog.
    pub async fn purchase_booster(
        &self,
        booster_id: &str,
        now: DateTime<Utc>,
    ) -> Result<PurchaseOutcome, AppError> {
        let mut state = self.state.lock().await;

        let Some(booster) = find_booster(booster_id) else {
            return Err(reject(
                &mut state,
                AppError::NotFound(format!("Unknown booster: {}", booster_id)),
            ));
        };
        self.ready_locked(&mut state, now).await?;

        if state.progress.owns_booster(booster.id) {
            return Err(reject(
                &mut state,
                AppError::AlreadyOwned(booster.id.to_string()),
            ));
        }
        if state.progress.points < booster.cost {
            let err = AppError::InsufficientPoints {
                needed: booster.cost,
                available: state.progress.points,
            };
            return Err(reject(&mut state, err));
        }

        let before = state.progress.clone();
        let progress = &mut state.progress;
        progress.set_points(before.points - booster.cost);
        progress.purchased_boosters.push(booster.id.to_string());

        let mut patch = ProgressPatch {
            points: Some(progress.points),
            purchased_boosters: Some(progress.purchased_boosters.clone()),
            create: progress.is_new_user,
            ..Default::default()
        };
        match booster.effect {
            BoosterEffect::MaxEnergy { amount } => {
                progress.max_energy = progress.max_energy.saturating_add(amount);
                progress.energy = progress.max_energy;
                patch.max_energy = Some(progress.max_energy);
                patch.energy = Some(progress.energy);
            }
            BoosterEffect::CoinsPerTap { coins } => {
                progress.coins_per_tap = progress.coins_per_tap.max(coins);
                patch.coins_per_tap = Some(progress.coins_per_tap);
            }
            BoosterEffect::AutoTap { minutes } => {
                let until = now + Duration::minutes(minutes);
                progress.auto_tap_until = Some(until);
                patch.auto_tap_until = Some(until);
            }
        }

        if let Err(e) = self.persist(&state, &patch).await {
            state.progress = before;
            return Err(reject(&mut state, e));
        }
        state.progress.is_new_user = false;
        state.save_error = None;

        tracing::info!(
            user_id = self.user_id,
            booster = booster.id,
            cost = booster.cost,
            "Booster purchased"
        );

        Ok(PurchaseOutcome {
            booster: *booster,
            state: self.snapshot_locked(&state, now),
        })
    }

    /// Complete a catalog task. Points and level come back from the store.
    pub async fn complete_task(
        &self,
        task_id: &str,
        now: DateTime<Utc>,
    ) -> Result<TaskOutcome, AppError> {
        let mut state = self.state.lock().await;

        let Some(task) = find_task(task_id) else {
            return Err(reject(
                &mut state,
                AppError::NotFound(format!("Unknown task: {}", task_id)),
            ));
        };
        self.ready_locked(&mut state, now).await?;

        match self
            .client
            .complete_task(self.user_id, task.id, task.reward)
            .await
        {
            Ok(completion) => {
                let progress = &mut state.progress;
                progress.set_points(completion.new_points);
                progress.completed_tasks = completion.completed_tasks.clone();
                progress.is_new_user = false;
                state.save_error = None;

                Ok(TaskOutcome {
                    task: *task,
                    completion,
                    state: self.snapshot_locked(&state, now),
                })
            }
            Err(AppError::AlreadyCompleted(id)) => {
                if !state.progress.has_completed(&id) {
                    state.progress.completed_tasks.push(id.clone());
                }
                state.save_error = Some("Task already completed".to_string());
                Err(AppError::AlreadyCompleted(id))
            }
            Err(e) => Err(reject(&mut state, e)),
        }
    }

    /// Refetch the leaderboard and the caller's position in it.
    pub async fn leaderboard(&self, limit: u32) -> LeaderboardView {
        let mut state = self.state.lock().await;
        self.refresh_leaderboard_locked(&mut state, limit).await;
        LeaderboardView {
            entries: state.leaderboard.clone(),
            user_position: state.user_position,
        }
    }

    /// Close the play session, returning the `game_completed` host message
    /// if anything was earned.
    pub async fn end_session(&self, now: DateTime<Utc>) -> Option<HostMessage> {
        let mut state = self.state.lock().await;
        let started = std::mem::replace(&mut state.session_started, now);
        (state.progress.points > 0).then(|| {
            HostMessage::game_completed(&state.progress, (now - started).num_milliseconds())
        })
    }

    async fn ready_locked(
        &self,
        state: &mut GameState,
        now: DateTime<Utc>,
    ) -> Result<(), AppError> {
        if !state.online {
            return Err(reject(state, AppError::Offline));
        }
        if !state.loaded {
            self.load_locked(state, now).await?;
        }
        Ok(())
    }

    async fn load_locked(&self, state: &mut GameState, now: DateTime<Utc>) -> Result<(), AppError> {
        let progress = match self.client.get_user_progress(self.user_id).await {
            Ok(progress) => progress,
            Err(e) => {
                state.progress = UserProgress::new_user(self.user_id, now);
                return Err(reject(state, e));
            }
        };

        state.progress = progress;
        state.loaded = true;
        state.save_error = None;
        self.refresh_leaderboard_locked(state, LEADERBOARD_LIMIT).await;

        if state.progress.is_new_user {
            tracing::info!(user_id = self.user_id, "Creating initial progress document");
            let patch = ProgressPatch::initial(&state.progress);
            match self.persist(state, &patch).await {
                Ok(_) => {
                    state.progress.is_new_user = false;
                    self.refresh_leaderboard_locked(state, LEADERBOARD_LIMIT)
                        .await;
                }
                // Creation is retried with the next save.
                Err(e) => state.save_error = Some(e.to_string()),
            }
        }
        Ok(())
    }

    async fn regenerate_locked(
        &self,
        state: &mut GameState,
        now: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let progress = &state.progress;
        if progress.energy >= progress.max_energy
            || now - progress.last_energy_refresh < energy_refill_window()
        {
            return Ok(false);
        }

        let prev_energy = progress.energy;
        let prev_refresh = progress.last_energy_refresh;

        let progress = &mut state.progress;
        progress.energy = progress.max_energy;
        progress.last_energy_refresh = now;

        let patch = ProgressPatch {
            energy: Some(progress.energy),
            last_energy_refresh: Some(now),
            create: progress.is_new_user,
            ..Default::default()
        };

        if let Err(e) = self.persist(state, &patch).await {
            state.progress.energy = prev_energy;
            state.progress.last_energy_refresh = prev_refresh;
            return Err(reject(state, e));
        }
        state.progress.is_new_user = false;

        tracing::info!(
            user_id = self.user_id,
            energy = state.progress.energy,
            "Energy refilled"
        );
        Ok(true)
    }

    async fn refresh_leaderboard_locked(&self, state: &mut GameState, limit: u32) {
        state.leaderboard = self.client.get_leaderboard(limit).await;
        state.user_position = state
            .leaderboard
            .iter()
            .position(|entry| entry.user_id == self.user_id)
            .map(|index| index + 1);
    }

    async fn persist(&self, state: &GameState, patch: &ProgressPatch) -> Result<(), AppError> {
        self.saving.store(true, Ordering::SeqCst);
        let result = self
            .client
            .save_user_progress(self.user_id, patch, &state.identity)
            .await;
        self.saving.store(false, Ordering::SeqCst);
        result.map(|_| ())
    }

    /// Build the view of `state` and publish it for lock-free readers.
    fn snapshot_locked(&self, state: &GameState, now: DateTime<Utc>) -> GameSnapshot {
        let snapshot = view(state, self.is_saving(), now);
        self.published.send_replace(snapshot.clone());
        snapshot
    }
}

fn view(state: &GameState, is_saving: bool, now: DateTime<Utc>) -> GameSnapshot {
    let progress = &state.progress;
    let rank = rank_for(progress.points);

    GameSnapshot {
        user_id: state.identity.id,
        first_name: state
            .identity
            .display_first_name()
            .map(str::to_string)
            .or_else(|| progress.first_name.clone())
            .unwrap_or_default(),
        username: state
            .identity
            .display_username()
            .map(str::to_string)
            .or_else(|| progress.username.clone()),
        points: progress.points,
        level: progress.level,
        rank: rank.name.to_string(),
        multiplier: rank.multiplier,
        coins_per_tap: progress.coins_per_tap,
        games_played: progress.games_played,
        energy: progress.energy,
        max_energy: progress.max_energy,
        energy_countdown: energy_countdown(progress, now),
        completed_tasks: progress.completed_tasks.clone(),
        purchased_boosters: progress.purchased_boosters.clone(),
        auto_tap_until: progress.auto_tap_until.map(format_utc_rfc3339),
        is_loading: !state.loaded,
        is_saving,
        save_error: state.save_error.clone(),
        online: state.online,
        user_position: state.user_position,
    }
}

/// Record `err` as the user-visible banner and hand it back.
fn reject(state: &mut GameState, err: AppError) -> AppError {
    state.save_error = Some(err.to_string());
    err
}

/// Human-readable time until the next full refill.
pub fn energy_countdown(progress: &UserProgress, now: DateTime<Utc>) -> String {
    if progress.energy >= progress.max_energy {
        return "Full Energy!".to_string();
    }
    let remaining = energy_refill_window() - (now - progress.last_energy_refresh);
    format!("{} to full energy", format_hours_minutes(remaining))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_energy_countdown() {
        let start = DateTime::from_timestamp(1_760_000_000, 0).unwrap();
        let mut progress = UserProgress::new_user(1, start);
        assert_eq!(energy_countdown(&progress, start), "Full Energy!");

        progress.energy = 10;
        assert_eq!(
            energy_countdown(&progress, start + Duration::minutes(15)),
            "1h 45m to full energy"
        );
        assert_eq!(
            energy_countdown(&progress, start + Duration::minutes(110)),
            "10m to full energy"
        );
        assert_eq!(
            energy_countdown(&progress, start + Duration::hours(3)),
            "0m to full energy"
        );
    }
}
