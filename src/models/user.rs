// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Caller identity as supplied by the host platform.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Telegram user taken from Mini App init data.
///
/// Field names follow the host platform's JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct TelegramUser {
    /// Telegram user ID (also used as document ID)
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub id: u64,
    /// First name
    #[serde(default)]
    pub first_name: String,
    /// Username, without the leading `@`
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub is_premium: bool,
}

impl TelegramUser {
    /// Identity known only by its ID (e.g. restored from a session token).
    pub fn bare(id: u64) -> Self {
        Self {
            id,
            first_name: String::new(),
            username: None,
            is_premium: false,
        }
    }

    /// First name, if the host supplied a non-empty one.
    pub fn display_first_name(&self) -> Option<&str> {
        Some(self.first_name.as_str()).filter(|name| !name.is_empty())
    }

    /// Username, if the host supplied a non-empty one.
    pub fn display_username(&self) -> Option<&str> {
        self.username.as_deref().filter(|name| !name.is_empty())
    }
}
