// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod catalog;
pub mod host;
pub mod progress;
pub mod rank;
pub mod user;

pub use catalog::{BoosterDef, BoosterEffect, TaskDef};
pub use host::HostMessage;
pub use progress::{LeaderboardEntry, ProgressPatch, ProgressWrite, TaskCompletion, UserProgress};
pub use rank::Rank;
pub use user::TelegramUser;
