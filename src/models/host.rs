// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Outbound messages for the host platform's `sendData` channel.

use serde::Serialize;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::models::UserProgress;

/// Payload the Mini App forwards to the bot via `sendData`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case", rename_all_fields = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum HostMessage {
    ProgressUpdate {
        #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
        points: u64,
        level: u32,
        #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
        games_played: u64,
        energy: u32,
    },
    GameCompleted {
        #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
        points: u64,
        level: u32,
        #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
        games_played: u64,
        energy: u32,
        /// Milliseconds since the session started
        #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
        session_duration: i64,
    },
}

impl HostMessage {
    pub fn progress_update(progress: &UserProgress) -> Self {
        Self::ProgressUpdate {
            points: progress.points,
            level: progress.level,
            games_played: progress.games_played,
            energy: progress.energy,
        }
    }

    pub fn game_completed(progress: &UserProgress, session_duration_ms: i64) -> Self {
        Self::GameCompleted {
            points: progress.points,
            level: progress.level,
            games_played: progress.games_played,
            energy: progress.energy,
            session_duration: session_duration_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_format() {
        let mut progress = UserProgress::new_user(1, chrono::Utc::now());
        progress.set_points(110);
        progress.games_played = 110;
        progress.energy = 890;

        let json = serde_json::to_value(HostMessage::progress_update(&progress)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "action": "progress_update",
                "points": 110,
                "level": 2,
                "gamesPlayed": 110,
                "energy": 890,
            })
        );

        let json = serde_json::to_value(HostMessage::game_completed(&progress, 5000)).unwrap();
        assert_eq!(json["action"], "game_completed");
        assert_eq!(json["sessionDuration"], 5000);
    }
}
