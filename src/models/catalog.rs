// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Task and booster catalogs.

use serde::Serialize;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// A one-time task granting a fixed point reward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct TaskDef {
    pub id: &'static str,
    pub title: &'static str,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub reward: u64,
}

/// What a booster does once bought.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum BoosterEffect {
    /// Raise energy capacity by `amount` and refill
    MaxEnergy { amount: u32 },
    /// Raise points-per-tap to `coins`
    CoinsPerTap { coins: u32 },
    /// Open an auto-tap window of `minutes`
    AutoTap { minutes: i64 },
}

/// A one-time purchasable upgrade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct BoosterDef {
    pub id: &'static str,
    pub title: &'static str,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub cost: u64,
    pub effect: BoosterEffect,
}

pub const TASKS: &[TaskDef] = &[
    TaskDef {
        id: "join_channel",
        title: "Join our Telegram channel",
        reward: 1000,
    },
    TaskDef {
        id: "follow_twitter",
        title: "Follow us on X",
        reward: 500,
    },
    TaskDef {
        id: "invite_friend",
        title: "Invite a friend",
        reward: 2500,
    },
    TaskDef {
        id: "daily_check_in",
        title: "Check in today",
        reward: 100,
    },
];

pub const BOOSTERS: &[BoosterDef] = &[
    BoosterDef {
        id: "energy_tank",
        title: "Energy Tank",
        cost: 2000,
        effect: BoosterEffect::MaxEnergy { amount: 500 },
    },
    BoosterDef {
        id: "multitap",
        title: "Multitap",
        cost: 5000,
        effect: BoosterEffect::CoinsPerTap { coins: 2 },
    },
    BoosterDef {
        id: "mega_tap",
        title: "Mega Tap",
        cost: 25_000,
        effect: BoosterEffect::CoinsPerTap { coins: 3 },
    },
    BoosterDef {
        id: "auto_tapper",
        title: "Auto Tapper",
        cost: 10_000,
        effect: BoosterEffect::AutoTap { minutes: 180 },
    },
];

pub fn find_task(task_id: &str) -> Option<&'static TaskDef> {
    TASKS.iter().find(|task| task.id == task_id)
}

pub fn find_booster(booster_id: &str) -> Option<&'static BoosterDef> {
    BOOSTERS.iter().find(|booster| booster.id == booster_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_catalog_ids_unique() {
        let tasks: HashSet<_> = TASKS.iter().map(|t| t.id).collect();
        assert_eq!(tasks.len(), TASKS.len());

        let boosters: HashSet<_> = BOOSTERS.iter().map(|b| b.id).collect();
        assert_eq!(boosters.len(), BOOSTERS.len());
    }

    #[test]
    fn test_lookup() {
        assert_eq!(find_task("invite_friend").map(|t| t.reward), Some(2500));
        assert!(find_task("nope").is_none());
        assert_eq!(
            find_booster("multitap").map(|b| b.effect),
            Some(BoosterEffect::CoinsPerTap { coins: 2 })
        );
    }

    #[test]
    fn test_effect_serializes_tagged() {
        let json = serde_json::to_value(BoosterEffect::MaxEnergy { amount: 500 }).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "max_energy", "amount": 500}));
    }
}
