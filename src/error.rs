// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
///
/// The `Display` text of the game-facing variants doubles as the banner
/// message stored in the controller's `save_error`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Failed to load progress: {0}")]
    Load(String),

    #[error("Save failed: {0}")]
    Save(String),

    #[error("Task already completed: {0}")]
    AlreadyCompleted(String),

    #[error("Booster already purchased: {0}")]
    AlreadyOwned(String),

    #[error("Not enough points: need {needed}, have {available}")]
    InsufficientPoints { needed: u64, available: u64 },

    #[error("No energy left! Wait for it to recharge.")]
    NoEnergy,

    #[error("You are offline. Progress cannot be saved.")]
    Offline,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", None),
            AppError::InvalidToken => (StatusCode::UNAUTHORIZED, "invalid_token", None),
            AppError::Auth(_) => (StatusCode::UNAUTHORIZED, "auth_failed", None),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::Load(_) => (StatusCode::BAD_GATEWAY, "load_failed", Some(self.to_string())),
            AppError::Save(_) => (StatusCode::BAD_GATEWAY, "save_failed", Some(self.to_string())),
            AppError::AlreadyCompleted(task_id) => (
                StatusCode::CONFLICT,
                "already_completed",
                Some(task_id.clone()),
            ),
            AppError::AlreadyOwned(booster_id) => (
                StatusCode::CONFLICT,
                "already_owned",
                Some(booster_id.clone()),
            ),
            AppError::InsufficientPoints { .. } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "insufficient_points",
                Some(self.to_string()),
            ),
            AppError::NoEnergy => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "no_energy",
                Some(self.to_string()),
            ),
            AppError::Offline => (
                StatusCode::SERVICE_UNAVAILABLE,
                "offline",
                Some(self.to_string()),
            ),
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
