// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Game API routes for authenticated users.

use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::models::catalog::{BOOSTERS, TASKS};
use crate::models::rank::RANKS;
use crate::models::{BoosterDef, HostMessage, Rank, TaskDef};
use crate::services::game::{
    GameSnapshot, LeaderboardView, PurchaseOutcome, TapOutcome, TaskOutcome, LEADERBOARD_LIMIT,
};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// API routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/state", get(get_state))
        .route("/api/tap", post(tap))
        .route("/api/tasks/{task_id}/complete", post(complete_task))
        .route("/api/boosters/{booster_id}/purchase", post(purchase_booster))
        .route("/api/leaderboard", get(get_leaderboard))
        .route("/api/rank", get(get_rank))
        .route("/api/catalog", get(get_catalog))
        .route("/api/session/end", post(end_session))
        .route("/api/connectivity", post(set_connectivity))
}

// ─── State & Actions ─────────────────────────────────────────

/// Current game state, loading it if needed.
async fn get_state(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Json<GameSnapshot> {
    let controller = state.registry.controller(user.user_id).await;
    Json(controller.snapshot(chrono::Utc::now()))
}

async fn tap(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<TapOutcome>> {
    let controller = state.registry.controller(user.user_id).await;
    Ok(Json(controller.tap(chrono::Utc::now()).await?))
}

async fn complete_task(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(task_id): Path<String>,
) -> Result<Json<TaskOutcome>> {
    tracing::debug!(user_id = user.user_id, task_id = %task_id, "Completing task");

    let controller = state.registry.controller(user.user_id).await;
    Ok(Json(
        controller
            .complete_task(&task_id, chrono::Utc::now())
            .await?,
    ))
}

async fn purchase_booster(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(booster_id): Path<String>,
) -> Result<Json<PurchaseOutcome>> {
    tracing::debug!(user_id = user.user_id, booster_id = %booster_id, "Purchasing booster");

    let controller = state.registry.controller(user.user_id).await;
    Ok(Json(
        controller
            .purchase_booster(&booster_id, chrono::Utc::now())
            .await?,
    ))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct EndSessionResponse {
    /// `game_completed` payload for `sendData`, if anything was earned
    pub host_message: Option<HostMessage>,
}

async fn end_session(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Json<EndSessionResponse> {
    let controller = state.registry.controller(user.user_id).await;
    Json(EndSessionResponse {
        host_message: controller.end_session(chrono::Utc::now()).await,
    })
}

/// Host connectivity change reported by the Mini App.
#[derive(Deserialize)]
struct ConnectivityRequest {
    online: bool,
}

async fn set_connectivity(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<ConnectivityRequest>,
) -> Json<GameSnapshot> {
    tracing::debug!(user_id = user.user_id, online = request.online, "Connectivity changed");

    let controller = state.registry.controller(user.user_id).await;
    controller.set_online(request.online).await;
    Json(controller.snapshot(chrono::Utc::now()))
}

// ─── Leaderboard ─────────────────────────────────────────────

#[derive(Deserialize)]
struct LeaderboardQuery {
    #[serde(default = "default_limit")]
    limit: u32,
}

fn default_limit() -> u32 {
    LEADERBOARD_LIMIT
}

/// Top players. Empty (never an error) when the store is unavailable.
async fn get_leaderboard(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<LeaderboardQuery>,
) -> Json<LeaderboardView> {
    let limit = params.limit.clamp(1, LEADERBOARD_LIMIT);
    let controller = state.registry.controller(user.user_id).await;
    Json(controller.leaderboard(limit).await)
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RankResponse {
    /// 1-based position by points
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub position: u64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub total_players: u64,
}

async fn get_rank(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<RankResponse>> {
    let controller = state.registry.controller(user.user_id).await;
    let client = controller.client();

    let position = client.get_user_rank(user.user_id).await?;
    let total_players = client.get_total_players().await?;

    Ok(Json(RankResponse {
        position,
        total_players,
    }))
}

// ─── Catalog ─────────────────────────────────────────────────

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CatalogResponse {
    pub tasks: &'static [TaskDef],
    pub boosters: &'static [BoosterDef],
    pub ranks: &'static [Rank],
}

async fn get_catalog() -> Json<CatalogResponse> {
    Json(CatalogResponse {
        tasks: TASKS,
        boosters: BOOSTERS,
        ranks: &RANKS,
    })
}
