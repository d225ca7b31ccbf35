// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Live game controllers, one per identity.
//!
//! All requests for an identity share its controller, so its state lock
//! serializes their writes. The energy ticker sweeps every live controller
//! on a fixed period and drops controllers idle for longer than the idle
//! timeout; a later request rebuilds them from the stored document.

use chrono::Utc;
use dashmap::DashMap;
use futures_util::future::join_all;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

use crate::db::ProgressStore;
use crate::models::TelegramUser;
use crate::services::game::GameController;
use crate::services::progress::ProgressClient;
use crate::services::session::AuthSession;

/// Idle time after which a controller is dropped, unless configured.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

struct LiveGame<S> {
    controller: Arc<GameController<S>>,
    last_access: Instant,
}

pub struct GameRegistry<S> {
    store: S,
    launch_token_key: Vec<u8>,
    idle_timeout: Duration,
    controllers: DashMap<u64, LiveGame<S>>,
}

impl<S: ProgressStore> GameRegistry<S> {
    pub fn new(store: S, launch_token_key: Vec<u8>) -> Self {
        Self {
            store,
            launch_token_key,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            controllers: DashMap::new(),
        }
    }

    pub fn with_idle_timeout(self, idle_timeout: Duration) -> Self {
        Self {
            idle_timeout,
            ..self
        }
    }

    /// Controller for a launched Mini App, created and loaded on first launch.
    ///
    /// A new controller gets its own auth session, which signs in with
    /// `launch_token` when one is supplied. An existing controller takes
    /// over the launch identity and token.
    pub async fn launch(
        &self,
        user: TelegramUser,
        launch_token: Option<String>,
    ) -> Arc<GameController<S>> {
        let (controller, created) = match self.touch(user.id) {
            Some(controller) => (controller, false),
            None => self.insert_or_get(user.id, || {
                self.new_controller(user.clone(), launch_token.clone())
            }),
        };

        if !created {
            controller.adopt_launch(user, launch_token).await;
        }
        controller.ensure_loaded(Utc::now()).await;
        controller
    }

    /// Controller for an already-authenticated user.
    ///
    /// After a restart or an idle eviction the controller is rebuilt from
    /// the stored document with an anonymous session.
    pub async fn controller(&self, user_id: u64) -> Arc<GameController<S>> {
        let controller = match self.touch(user_id) {
            Some(controller) => controller,
            None => {
                self.insert_or_get(user_id, || {
                    tracing::debug!(user_id, "Restoring controller for returning session");
                    self.new_controller(TelegramUser::bare(user_id), None)
                })
                .0
            }
        };

        controller.ensure_loaded(Utc::now()).await;
        controller
    }

    /// Name of the progress store behind every controller.
    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }

    pub fn get(&self, user_id: u64) -> Option<Arc<GameController<S>>> {
        self.controllers
            .get(&user_id)
            .map(|entry| entry.controller.clone())
    }

    pub fn len(&self) -> usize {
        self.controllers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
    }

    /// Run energy regeneration for every live controller.
    ///
    /// Returns the number of controllers that were refilled.
    pub async fn regenerate_all(&self) -> usize {
        // Collect first; DashMap guards must not be held across awaits.
        let controllers: Vec<_> = self
            .controllers
            .iter()
            .map(|entry| entry.controller.clone())
            .collect();

        let now = Utc::now();
        let results = join_all(
            controllers
                .iter()
                .map(|controller| controller.regenerate_energy(now)),
        )
        .await;

        results
            .into_iter()
            .zip(&controllers)
            .filter(|(result, controller)| match result {
                Ok(refilled) => *refilled,
                Err(e) => {
                    tracing::warn!(user_id = controller.user_id(), error = %e, "Energy refill failed");
                    false
                }
            })
            .count()
    }

    /// Drop controllers not used within the idle timeout.
    ///
    /// Their state is already persisted. Returns the number dropped.
    pub fn evict_idle(&self) -> usize {
        let before = self.controllers.len();
        self.controllers
            .retain(|_, game| game.last_access.elapsed() < self.idle_timeout);
        let evicted = before.saturating_sub(self.controllers.len());
        if evicted > 0 {
            tracing::debug!(evicted, live = self.controllers.len(), "Evicted idle controllers");
        }
        evicted
    }

    /// Spawn the periodic energy regeneration and eviction sweep.
    pub fn spawn_energy_ticker(self: Arc<Self>, period: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                self.evict_idle();
                let refilled = self.regenerate_all().await;
                if refilled > 0 {
                    tracing::info!(refilled, live = self.len(), "Energy sweep complete");
                }
            }
        })
    }

    /// Existing controller for `user_id`, marked as used now.
    fn touch(&self, user_id: u64) -> Option<Arc<GameController<S>>> {
        self.controllers.get_mut(&user_id).map(|mut entry| {
            entry.last_access = Instant::now();
            entry.controller.clone()
        })
    }

    /// Register a controller built by `build` unless another request did
    /// first. Also returns whether `build` ran.
    fn insert_or_get(
        &self,
        user_id: u64,
        build: impl FnOnce() -> GameController<S>,
    ) -> (Arc<GameController<S>>, bool) {
        let mut created = false;
        let mut entry = self.controllers.entry(user_id).or_insert_with(|| {
            created = true;
            LiveGame {
                controller: Arc::new(build()),
                last_access: Instant::now(),
            }
        });
        entry.last_access = Instant::now();
        (entry.controller.clone(), created)
    }

    fn new_controller(
        &self,
        user: TelegramUser,
        launch_token: Option<String>,
    ) -> GameController<S> {
        let session = Arc::new(AuthSession::new(
            launch_token,
            self.launch_token_key.clone(),
        ));
        let client = ProgressClient::new(self.store.clone(), session);
        GameController::new(user, client, Utc::now())
    }
}
