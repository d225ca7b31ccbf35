// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore integration tests.
//!
//! These tests require the Firestore emulator to be running.
//! Run with FIRESTORE_EMULATOR_HOST pointing at a local emulator.
//!
//! The emulator provides a clean state for each test run.

use chrono::{Duration, Utc};
use tap_arena::db::{FirestoreDb, ProgressStore};
use tap_arena::error::AppError;
use tap_arena::models::{ProgressPatch, ProgressWrite, UserProgress};

mod common;
use common::{test_db, test_user, unique_user_id};

fn initial_write(user_id: u64) -> ProgressWrite {
    let patch = ProgressPatch::initial(&UserProgress::new_user(user_id, Utc::now()));
    ProgressWrite::new(user_id, &patch, &test_user(user_id), Utc::now())
}

// ═══════════════════════════════════════════════════════════════════════════
// PROGRESS DOCUMENTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_progress_round_trip() {
    require_emulator!();

    let db = test_db().await;
    let user_id = unique_user_id();

    let before = db.get_progress(user_id).await.unwrap();
    assert!(before.is_none(), "Document should not exist before creation");

    db.merge_progress(&initial_write(user_id)).await.unwrap();

    let doc = db.get_progress(user_id).await.unwrap().unwrap();
    assert_eq!(doc.user_id, user_id);
    assert_eq!(doc.points, 0);
    assert_eq!(doc.level, 1);
    assert_eq!(doc.energy, 1000);
    assert_eq!(doc.first_name.as_deref(), Some("Tess"));
    assert!(doc.created_at.is_some());
    assert!(!doc.is_new_user);
}

#[tokio::test]
async fn test_merge_preserves_other_fields() {
    require_emulator!();

    let db = test_db().await;
    let user_id = unique_user_id();
    db.merge_progress(&initial_write(user_id)).await.unwrap();
    let created = db.get_progress(user_id).await.unwrap().unwrap().created_at;

    let patch = ProgressPatch {
        points: Some(340),
        games_played: Some(340),
        ..Default::default()
    };
    let write = ProgressWrite::new(user_id, &patch, &test_user(user_id), Utc::now());
    db.merge_progress(&write).await.unwrap();

    let doc = db.get_progress(user_id).await.unwrap().unwrap();
    assert_eq!(doc.points, 340);
    assert_eq!(doc.level, 4);
    assert_eq!(doc.games_played, 340);
    assert_eq!(doc.energy, 1000, "Energy should survive a partial write");
    assert_eq!(doc.created_at, created, "createdAt is written once");
}

#[tokio::test]
async fn test_repeated_creating_write_keeps_created_at() {
    require_emulator!();

    let db = test_db().await;
    let user_id = unique_user_id();
    db.merge_progress(&initial_write(user_id)).await.unwrap();
    let created = db.get_progress(user_id).await.unwrap().unwrap().created_at;
    assert!(created.is_some());

    // A retried first save still carries createdAt.
    let later = Utc::now() + Duration::hours(1);
    let patch = ProgressPatch {
        points: Some(1),
        create: true,
        ..Default::default()
    };
    let write = ProgressWrite::new(user_id, &patch, &test_user(user_id), later);
    assert!(write.created_at.is_some());
    db.merge_progress(&write).await.unwrap();

    let doc = db.get_progress(user_id).await.unwrap().unwrap();
    assert_eq!(doc.created_at, created, "createdAt is written once");
    assert_eq!(doc.updated_at, Some(later));
    assert_eq!(doc.points, 1);
}

// ═══════════════════════════════════════════════════════════════════════════
// TASKS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_complete_task_transaction() {
    require_emulator!();

    let db = test_db().await;
    let user_id = unique_user_id();
    db.merge_progress(&initial_write(user_id)).await.unwrap();

    let first = db
        .complete_task(user_id, "follow_twitter", 500)
        .await
        .unwrap()
        .expect("first completion should credit");
    assert_eq!(first.points, 500);
    assert_eq!(first.completed_tasks, ["follow_twitter"]);

    let second = db.complete_task(user_id, "follow_twitter", 500).await.unwrap();
    assert!(second.is_none(), "Second completion must be a no-op");

    let doc = db.get_progress(user_id).await.unwrap().unwrap();
    assert_eq!(doc.points, 500);
    assert_eq!(doc.level, 6);
}

// ═══════════════════════════════════════════════════════════════════════════
// LEADERBOARD
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_top_players_ordering() {
    require_emulator!();

    let db = test_db().await;
    let base = unique_user_id();

    // Scores well above anything other tests write.
    for (offset, points) in [(0, 9_000_050), (1, 9_000_200), (2, 9_000_010), (3, 9_000_200)] {
        let patch = ProgressPatch {
            points: Some(points),
            create: true,
            ..Default::default()
        };
        let write = ProgressWrite::new(base + offset, &patch, &test_user(base + offset), Utc::now());
        db.merge_progress(&write).await.unwrap();
    }

    let top = db.top_players(2).await.unwrap();
    assert_eq!(top.len(), 2);
    assert!(top.iter().all(|doc| doc.points == 9_000_200));
    assert!(top[0].user_id < top[1].user_id);

    let ahead = db.count_players_above(9_000_050).await.unwrap();
    assert!(ahead >= 2);
}

#[tokio::test]
async fn test_player_counts() {
    require_emulator!();

    let db = test_db().await;
    let base = unique_user_id();
    // Between the leaderboard test's scores, so its top two are unaffected.
    for (offset, points) in [(0, 9_000_100), (1, 9_000_101), (2, 9_000_102)] {
        let patch = ProgressPatch {
            points: Some(points),
            create: true,
            ..Default::default()
        };
        let write = ProgressWrite::new(base + offset, &patch, &test_user(base + offset), Utc::now());
        db.merge_progress(&write).await.unwrap();
    }

    let above_lowest = db.count_players_above(9_000_100).await.unwrap();
    let above_highest = db.count_players_above(9_000_102).await.unwrap();
    assert!(above_lowest >= above_highest + 2);
    assert!(db.count_players().await.unwrap() >= 3);
}

// ═══════════════════════════════════════════════════════════════════════════
// OFFLINE MODE
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_offline_mock_reports_database_errors() {
    let db = FirestoreDb::new_mock();

    assert!(matches!(
        db.get_progress(1).await,
        Err(AppError::Database(_))
    ));
    assert!(matches!(
        db.merge_progress(&initial_write(1)).await,
        Err(AppError::Database(_))
    ));
    assert!(matches!(db.top_players(10).await, Err(AppError::Database(_))));
    assert!(matches!(db.count_players().await, Err(AppError::Database(_))));
}
