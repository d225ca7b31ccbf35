// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod game;
pub mod identity;
pub mod progress;
pub mod registry;
pub mod session;

pub use game::{GameController, GameSnapshot};
pub use identity::{resolve_identity, LaunchContext};
pub use progress::{ProgressClient, SaveOutcome};
pub use registry::GameRegistry;
pub use session::{AuthSession, Principal, SessionState, SignInMethod};
