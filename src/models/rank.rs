// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Ranks and levels derived from a point total.

use serde::Serialize;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Points needed per level.
pub const POINTS_PER_LEVEL: u64 = 100;

/// A named tier controlling the points-per-tap multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Rank {
    pub name: &'static str,
    pub multiplier: u32,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub min_points: u64,
}

/// Rank table, highest threshold first.
pub const RANKS: [Rank; 6] = [
    Rank {
        name: "Legendary",
        multiplier: 6,
        min_points: 150_000,
    },
    Rank {
        name: "Ultra Elite",
        multiplier: 5,
        min_points: 100_000,
    },
    Rank {
        name: "Royal Champion",
        multiplier: 4,
        min_points: 50_000,
    },
    Rank {
        name: "Pro",
        multiplier: 3,
        min_points: 20_000,
    },
    Rank {
        name: "Classic",
        multiplier: 2,
        min_points: 10_000,
    },
    Rank {
        name: "Beginner",
        multiplier: 1,
        min_points: 0,
    },
];

/// Look up the rank for a point total.
pub fn rank_for(points: u64) -> &'static Rank {
    RANKS
        .iter()
        .find(|rank| points >= rank.min_points)
        .unwrap_or(&RANKS[RANKS.len() - 1])
}

/// Level for a point total: `floor(points / 100) + 1`.
pub fn level_for(points: u64) -> u32 {
    u32::try_from(points / POINTS_PER_LEVEL)
        .unwrap_or(u32::MAX - 1)
        .saturating_add(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_boundaries() {
        let cases = [
            (0, "Beginner", 1),
            (9_999, "Beginner", 1),
            (10_000, "Classic", 2),
            (19_999, "Classic", 2),
            (20_000, "Pro", 3),
            (49_999, "Pro", 3),
            (50_000, "Royal Champion", 4),
            (99_999, "Royal Champion", 4),
            (100_000, "Ultra Elite", 5),
            (149_999, "Ultra Elite", 5),
            (150_000, "Legendary", 6),
            (u64::MAX, "Legendary", 6),
        ];

        for (points, name, multiplier) in cases {
            let rank = rank_for(points);
            assert_eq!(rank.name, name, "points={}", points);
            assert_eq!(rank.multiplier, multiplier, "points={}", points);
        }
    }

    #[test]
    fn test_level_for() {
        assert_eq!(level_for(0), 1);
        assert_eq!(level_for(99), 1);
        assert_eq!(level_for(100), 2);
        assert_eq!(level_for(199), 2);
        assert_eq!(level_for(12_345), 124);
    }

    #[test]
    fn test_rank_table_is_descending() {
        for pair in RANKS.windows(2) {
            assert!(pair[0].min_points > pair[1].min_points);
            assert!(pair[0].multiplier > pair[1].multiplier);
        }
    }
}
