// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::http::StatusCode;
use axum::response::IntoResponse;
use tap_arena::error::AppError;

async fn error_body(err: AppError) -> (StatusCode, serde_json::Value) {
    let response = err.into_response();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[test]
fn test_banner_messages() {
    assert_eq!(
        AppError::NoEnergy.to_string(),
        "No energy left! Wait for it to recharge."
    );
    assert_eq!(
        AppError::Offline.to_string(),
        "You are offline. Progress cannot be saved."
    );
    assert_eq!(
        AppError::Save("quota exceeded".to_string()).to_string(),
        "Save failed: quota exceeded"
    );
    assert_eq!(
        AppError::Load("unavailable".to_string()).to_string(),
        "Failed to load progress: unavailable"
    );
}

#[tokio::test]
async fn test_status_codes() {
    let cases = [
        (AppError::Unauthorized, StatusCode::UNAUTHORIZED, "unauthorized"),
        (
            AppError::NotFound("task".to_string()),
            StatusCode::NOT_FOUND,
            "not_found",
        ),
        (
            AppError::Load("x".to_string()),
            StatusCode::BAD_GATEWAY,
            "load_failed",
        ),
        (
            AppError::Save("x".to_string()),
            StatusCode::BAD_GATEWAY,
            "save_failed",
        ),
        (
            AppError::AlreadyCompleted("join_channel".to_string()),
            StatusCode::CONFLICT,
            "already_completed",
        ),
        (
            AppError::AlreadyOwned("multitap".to_string()),
            StatusCode::CONFLICT,
            "already_owned",
        ),
        (
            AppError::InsufficientPoints {
                needed: 5000,
                available: 10,
            },
            StatusCode::UNPROCESSABLE_ENTITY,
            "insufficient_points",
        ),
        (
            AppError::NoEnergy,
            StatusCode::UNPROCESSABLE_ENTITY,
            "no_energy",
        ),
        (
            AppError::Offline,
            StatusCode::SERVICE_UNAVAILABLE,
            "offline",
        ),
    ];

    for (err, status, code) in cases {
        let (actual_status, body) = error_body(err).await;
        assert_eq!(actual_status, status, "status for {code}");
        assert_eq!(body["error"], code);
    }
}

#[tokio::test]
async fn test_database_details_are_hidden() {
    let (status, body) =
        error_body(AppError::Database("connection refused at 10.0.0.7".to_string())).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "database_error");
    assert!(body.get("details").is_none());
}
