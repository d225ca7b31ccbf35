// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Caller identity resolution from the Mini App launch context.
//!
//! Resolution order:
//! 1. a `user` from init data whose `hash` verifies against the bot token
//! 2. a session-scoped synthetic user when running inside Telegram without
//!    verifiable user data
//! 3. a fixed demo user everywhere else
//!
//! Resolution never fails.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::models::TelegramUser;

type HmacSha256 = Hmac<Sha256>;

/// ID of the identity used outside the host platform.
pub const DEMO_USER_ID: u64 = 123_456_789;

/// Key Telegram uses to derive the init-data secret from the bot token.
const WEB_APP_DATA_KEY: &[u8] = b"WebAppData";

/// What the Mini App knows about where it was launched.
#[derive(Debug, Clone, Default)]
pub struct LaunchContext {
    /// Raw `Telegram.WebApp.initData` query string
    pub init_data: Option<String>,
    /// The Telegram WebApp object was present
    pub in_host: bool,
}

/// Resolve the caller identity for a launch.
pub fn resolve_identity(ctx: &LaunchContext, bot_token: &str, now: DateTime<Utc>) -> TelegramUser {
    let init_data = ctx.init_data.as_deref().filter(|data| !data.is_empty());

    if let Some(data) = init_data {
        match verify_init_data(data, bot_token) {
            Ok(Some(user)) => {
                tracing::debug!(user_id = user.id, "Resolved Telegram user from init data");
                return user;
            }
            Ok(None) => {
                tracing::warn!("Init data verified but carries no user");
            }
            Err(err) => {
                tracing::warn!(error = %err, "Rejected init data");
            }
        }
    }

    if ctx.in_host || init_data.is_some() {
        let user = TelegramUser {
            id: now.timestamp_millis().unsigned_abs(),
            first_name: "Test User".to_string(),
            username: Some("testuser".to_string()),
            is_premium: false,
        };
        tracing::warn!(user_id = user.id, "Telegram context without user data, using session user");
        return user;
    }

    tracing::warn!("Not running inside Telegram, using demo user");
    TelegramUser {
        id: DEMO_USER_ID,
        first_name: "Demo".to_string(),
        username: Some("testuser".to_string()),
        is_premium: false,
    }
}

/// Init data verification errors.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum InitDataError {
    #[error("init data has no hash")]
    MissingHash,

    #[error("init data hash mismatch")]
    BadSignature,

    #[error("malformed init data: {0}")]
    Malformed(String),
}

/// Verify Telegram Mini App init data and extract its user.
///
/// The signature is `hex(HMAC_SHA256(secret, data_check_string))` where
/// `secret = HMAC_SHA256("WebAppData", bot_token)` and the data-check
/// string is every `key=value` pair except `hash`, sorted by key and
/// joined with `\n`.
pub fn verify_init_data(
    init_data: &str,
    bot_token: &str,
) -> Result<Option<TelegramUser>, InitDataError> {
    let mut fields = parse_query(init_data)?;

    let hash_pos = fields
        .iter()
        .position(|(key, _)| key == "hash")
        .ok_or(InitDataError::MissingHash)?;
    let (_, hash_hex) = fields.remove(hash_pos);
    let expected = hex::decode(hash_hex).map_err(|_| InitDataError::BadSignature)?;

    let pairs: Vec<(&str, &str)> = fields
        .iter()
        .map(|(key, value)| (key.as_str(), value.as_str()))
        .collect();
    let actual = sign_fields(&pairs, bot_token)?;

    if !bool::from(actual.as_slice().ct_eq(expected.as_slice())) {
        return Err(InitDataError::BadSignature);
    }

    fields
        .iter()
        .find(|(key, _)| key == "user")
        .map(|(_, json)| {
            serde_json::from_str::<TelegramUser>(json)
                .map_err(|e| InitDataError::Malformed(format!("user: {}", e)))
        })
        .transpose()
}

/// Build a signed init data string the way the host platform does.
pub fn sign_init_data(fields: &[(&str, &str)], bot_token: &str) -> Result<String, InitDataError> {
    let hash = hex::encode(sign_fields(fields, bot_token)?);
    Ok(fields
        .iter()
        .map(|(key, value)| format!("{}={}", key, urlencoding::encode(value)))
        .chain(std::iter::once(format!("hash={}", hash)))
        .collect::<Vec<_>>()
        .join("&"))
}

fn sign_fields(fields: &[(&str, &str)], bot_token: &str) -> Result<Vec<u8>, InitDataError> {
    let mut sorted = fields.to_vec();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    let data_check_string = sorted
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("\n");

    let mut secret = HmacSha256::new_from_slice(WEB_APP_DATA_KEY)
        .map_err(|e| InitDataError::Malformed(e.to_string()))?;
    secret.update(bot_token.as_bytes());
    let secret_key = secret.finalize().into_bytes();

    let mut mac = HmacSha256::new_from_slice(&secret_key)
        .map_err(|e| InitDataError::Malformed(e.to_string()))?;
    mac.update(data_check_string.as_bytes());
    Ok(mac.finalize().into_bytes().to_vec())
}

fn parse_query(raw: &str) -> Result<Vec<(String, String)>, InitDataError> {
    raw.split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            Ok((decode_component(key)?, decode_component(value)?))
        })
        .collect()
}

fn decode_component(raw: &str) -> Result<String, InitDataError> {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|decoded| decoded.into_owned())
        .map_err(|e| InitDataError::Malformed(e.to_string()))
}
