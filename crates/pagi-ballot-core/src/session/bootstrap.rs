//! SessionBootstrapper: restore the voter session on startup.
//!
//! A stored token is only a hint. It is verified remotely; any failure silently
//! removes it and leaves the voter a guest. Bootstrap never dispatches AuthFailure:
//! an expired session is not an error the voter should see.

use std::sync::Arc;

use crate::session::state::SessionAction;
use crate::session::store::SessionStore;
use crate::session::user::UserProfile;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapOutcome {
    /// Nothing persisted; stayed guest.
    NoToken,
    /// Token verified; session restored.
    Restored(UserProfile),
    /// Token rejected or unverifiable; removed, stayed guest.
    Discarded,
}

pub struct SessionBootstrapper {
    session: Arc<SessionStore>,
}

impl SessionBootstrapper {
    pub fn new(session: Arc<SessionStore>) -> Self {
        Self { session }
    }

    /// Run once on mount.
    pub async fn run(&self) -> BootstrapOutcome {
        let token = match self.session.token() {
            Some(token) => token,
            None => {
                tracing::debug!("[BOOTSTRAP] No persisted token; starting as guest");
                return BootstrapOutcome::NoToken;
            }
        };

        match self.session.api().verify(&token).await {
            Ok(user) => {
                tracing::info!("[BOOTSTRAP] Session restored for {}", user.id);
                self.session.dispatch(SessionAction::AuthSuccess(user.clone()));
                BootstrapOutcome::Restored(user)
            }
            Err(e) => {
                tracing::debug!("[BOOTSTRAP] Persisted token rejected ({}); clearing", e);
                self.session.clear_token();
                BootstrapOutcome::Discarded
            }
        }
    }
}
