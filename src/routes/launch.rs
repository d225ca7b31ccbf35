// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Mini App launch: resolve the caller, start their game, issue a session.

use axum::{extract::State, routing::post, Json, Router};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::{AppError, Result};
use crate::middleware::auth::{create_jwt, SESSION_COOKIE};
use crate::models::TelegramUser;
use crate::services::{resolve_identity, GameSnapshot, LaunchContext};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/launch", post(launch))
}

/// Launch parameters reported by the Mini App.
#[derive(Debug, Default, Deserialize)]
pub struct LaunchRequest {
    /// `Telegram.WebApp.initData`, verbatim
    #[serde(default)]
    pub init_data: Option<String>,
    /// `token` query parameter appended to the Mini App URL by the bot
    #[serde(default)]
    pub token: Option<String>,
    /// Whether the Telegram WebApp object exists in the page
    #[serde(default)]
    pub in_host: bool,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LaunchResponse {
    pub session_token: String,
    pub user: TelegramUser,
    pub state: GameSnapshot,
}

async fn launch(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(request): Json<LaunchRequest>,
) -> Result<(CookieJar, Json<LaunchResponse>)> {
    let now = chrono::Utc::now();
    let ctx = LaunchContext {
        init_data: request.init_data,
        in_host: request.in_host,
    };
    let user = resolve_identity(&ctx, &state.config.telegram_bot_token, now);

    tracing::info!(user_id = user.id, has_token = request.token.is_some(), "Mini App launch");

    let controller = state.registry.launch(user.clone(), request.token).await;
    let snapshot = controller.snapshot(now);

    let session_token = create_jwt(user.id, &state.config.jwt_signing_key)
        .map_err(AppError::Internal)?;

    let cookie = Cookie::build((SESSION_COOKIE, session_token.clone()))
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::None)
        .build();

    Ok((
        jar.add(cookie),
        Json(LaunchResponse {
            session_token,
            user,
            state: snapshot,
        }),
    ))
}
