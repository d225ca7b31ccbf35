// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Authentication session for a progress client.
//!
//! Store operations await [`AuthSession::ensure_ready`]. The first call runs
//! the handshake: a bot-issued launch token is verified if one was supplied,
//! and a rejected or absent token falls back to an anonymous session.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use ring::rand::{SecureRandom, SystemRandom};
use tokio::sync::{Mutex, RwLock};

use crate::error::AppError;
use crate::middleware::auth::verify_jwt;

/// How the session principal signed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignInMethod {
    Token,
    Anonymous,
}

/// Authenticated principal of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub uid: String,
    pub method: SignInMethod,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Authenticating,
    Ready(Principal),
    /// Handshake failed; the next `ensure_ready` retries.
    Failed(String),
}

pub struct AuthSession {
    launch_token: RwLock<Option<String>>,
    launch_token_key: Vec<u8>,
    state: RwLock<SessionState>,
    /// Serializes handshakes so concurrent callers wait for one result.
    handshake: Mutex<()>,
    rng: SystemRandom,
}

impl AuthSession {
    pub fn new(launch_token: Option<String>, launch_token_key: Vec<u8>) -> Self {
        Self {
            launch_token: RwLock::new(launch_token.filter(|token| !token.is_empty())),
            launch_token_key,
            state: RwLock::new(SessionState::Unauthenticated),
            handshake: Mutex::new(()),
            rng: SystemRandom::new(),
        }
    }

    pub async fn state(&self) -> SessionState {
        self.state.read().await.clone()
    }

    /// Wait until the session is authenticated, running the handshake if needed.
    pub async fn ensure_ready(&self) -> Result<Principal, AppError> {
        if let SessionState::Ready(principal) = &*self.state.read().await {
            return Ok(principal.clone());
        }

        let _guard = self.handshake.lock().await;

        // Another caller may have completed the handshake while we waited.
        if let SessionState::Ready(principal) = &*self.state.read().await {
            return Ok(principal.clone());
        }

        *self.state.write().await = SessionState::Authenticating;

        let launch_token = self.launch_token.read().await.clone();
        match self.sign_in(launch_token.as_deref()) {
            Ok(principal) => {
                tracing::debug!(uid = %principal.uid, method = ?principal.method, "Session ready");
                *self.state.write().await = SessionState::Ready(principal.clone());
                Ok(principal)
            }
            Err(err) => {
                tracing::error!(error = %err, "Session handshake failed");
                *self.state.write().await = SessionState::Failed(err.to_string());
                Err(err)
            }
        }
    }

    /// Use a launch token that arrived after the session was created.
    ///
    /// A session not yet signed in with a token is reset, so the next
    /// `ensure_ready` runs the handshake again with `token`.
    pub async fn supply_launch_token(&self, token: String) {
        if token.is_empty() {
            return;
        }

        let _guard = self.handshake.lock().await;
        let mut state = self.state.write().await;
        if matches!(&*state, SessionState::Ready(p) if p.method == SignInMethod::Token) {
            return;
        }

        *self.launch_token.write().await = Some(token);
        *state = SessionState::Unauthenticated;
    }

    fn sign_in(&self, launch_token: Option<&str>) -> Result<Principal, AppError> {
        if let Some(token) = launch_token {
            match verify_jwt(token, &self.launch_token_key) {
                Ok(claims) => {
                    return Ok(Principal {
                        uid: claims.sub,
                        method: SignInMethod::Token,
                    });
                }
                Err(e) => {
                    // Not surfaced to the user; anonymous sign-in takes over.
                    let err = AppError::Auth(format!("launch token rejected: {}", e));
                    tracing::warn!(error = %err, "Falling back to anonymous session");
                }
            }
        }

        self.sign_in_anonymously()
    }

    fn sign_in_anonymously(&self) -> Result<Principal, AppError> {
        let mut bytes = [0u8; 16];
        self.rng
            .fill(&mut bytes)
            .map_err(|_| AppError::Auth("random source unavailable".to_string()))?;

        Ok(Principal {
            uid: format!("anon-{}", URL_SAFE_NO_PAD.encode(bytes)),
            method: SignInMethod::Anonymous,
        })
    }
}
