//! Voter session state machine.
//!
//! ```text
//! any           --AuthStart------------> Loading
//! any           --AuthSuccess(user)----> Authenticated(user)
//! any           --AuthFailure(msg)-----> Failed(msg)
//! any           --Logout---------------> Idle
//! Loading       --RegistrationComplete-> Idle
//! Failed        --ClearError-----------> Idle
//! Authenticated --UpdateUser(patch)----> Authenticated(user + patch)
//! Authenticated --ReplaceUser(user)----> Authenticated(user)   (same id only)
//! ```
//!
//! Terminal actions are honored from any state so that when two logins race, the one
//! that resolves last wins. Actions that do not apply to the current state leave it unchanged.

use serde::{Deserialize, Serialize};

use crate::session::user::{UserPatch, UserProfile};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum SessionState {
    /// Guest: not loading, no error.
    #[default]
    Idle,
    Loading,
    Authenticated(UserProfile),
    Failed(String),
}

impl SessionState {
    pub fn user(&self) -> Option<&UserProfile> {
        match self {
            SessionState::Authenticated(user) => Some(user),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated(_))
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, SessionState::Loading)
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            SessionState::Failed(message) => Some(message),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionAction {
    AuthStart,
    AuthSuccess(UserProfile),
    AuthFailure(String),
    Logout,
    ClearError,
    UpdateUser(UserPatch),
    /// Server-confirmed profile; replaces every field, including cleared ones.
    ReplaceUser(UserProfile),
    /// Registration accepted; stop loading without authenticating.
    RegistrationComplete,
}

/// Pure transition function.
pub fn reduce(state: SessionState, action: SessionAction) -> SessionState {
    match (state, action) {
        (_, SessionAction::AuthStart) => SessionState::Loading,
        (_, SessionAction::AuthSuccess(user)) => SessionState::Authenticated(user),
        (_, SessionAction::AuthFailure(message)) => SessionState::Failed(message),
        (_, SessionAction::Logout) => SessionState::Idle,
        (SessionState::Failed(_), SessionAction::ClearError) => SessionState::Idle,
        (SessionState::Loading, SessionAction::RegistrationComplete) => SessionState::Idle,
        (SessionState::Authenticated(mut user), SessionAction::UpdateUser(patch)) => {
            user.apply(&patch);
            SessionState::Authenticated(user)
        }
        (SessionState::Authenticated(current), SessionAction::ReplaceUser(confirmed)) => {
            if current.id == confirmed.id {
                SessionState::Authenticated(confirmed)
            } else {
                SessionState::Authenticated(current)
            }
        }
        (state, _) => state,
    }
}
