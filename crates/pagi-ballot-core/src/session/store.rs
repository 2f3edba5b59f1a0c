//! SessionStore: the voter session reducer plus its side effects (network, token, toasts).

use std::sync::Arc;
use tokio::sync::watch;

use crate::capabilities::{Notification, Notifier};
use crate::error::{AuthApiError, SessionError, SessionResult};
use crate::session::api::{AuthApi, LoginRequest};
use crate::session::state::{reduce, SessionAction, SessionState};
use crate::session::user::{RegistrationRequest, UserPatch, UserProfile};
use crate::storage::{KeyValueStore, AUTH_TOKEN_KEY};

const LOGIN_FAILED: &str = "Login failed";
const REGISTRATION_FAILED: &str = "Registration failed";
const PROFILE_UPDATE_FAILED: &str = "Profile update failed";
const NETWORK_FAILED: &str = "Network error. Please check your connection and try again.";

/// Map an API failure to the message the voter sees.
fn user_facing(err: AuthApiError, fallback: &str) -> SessionError {
    match err {
        AuthApiError::Transport(e) => {
            tracing::warn!("[SESSION] Transport failure: {}", e);
            SessionError::Network(NETWORK_FAILED.to_string())
        }
        AuthApiError::Rejected { status, message } => {
            tracing::info!("[SESSION] Rejected with {}: {:?}", status, message);
            SessionError::Rejected(message.unwrap_or_else(|| fallback.to_string()))
        }
        AuthApiError::Decode(e) => {
            tracing::warn!("[SESSION] Undecodable auth response: {}", e);
            SessionError::Rejected(fallback.to_string())
        }
    }
}

pub struct SessionStore {
    state: watch::Sender<SessionState>,
    api: Arc<dyn AuthApi>,
    storage: Arc<dyn KeyValueStore>,
    notifier: Arc<dyn Notifier>,
}

impl SessionStore {
    /// New store in the guest state.
    pub fn new(
        api: Arc<dyn AuthApi>,
        storage: Arc<dyn KeyValueStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::default());
        Self {
            state,
            api,
            storage,
            notifier,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Receiver that observes every transition (the UI binds to this).
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Apply one action through the reducer. Returns the new state.
    pub fn dispatch(&self, action: SessionAction) -> SessionState {
        tracing::debug!("[SESSION] dispatch {:?}", action);
        self.state.send_modify(|current| {
            let previous = std::mem::take(current);
            *current = reduce(previous, action);
        });
        self.state()
    }

    /// Persisted token, if any. Storage errors read as "no token".
    pub fn token(&self) -> Option<String> {
        match self.storage.get(AUTH_TOKEN_KEY) {
            Ok(token) => token.filter(|t| !t.is_empty()),
            Err(e) => {
                tracing::error!("[SESSION] Failed to read auth token: {}", e);
                None
            }
        }
    }

    pub(crate) fn api(&self) -> &Arc<dyn AuthApi> {
        &self.api
    }

    pub(crate) fn clear_token(&self) {
        if let Err(e) = self.storage.remove(AUTH_TOKEN_KEY) {
            tracing::error!("[SESSION] Failed to clear auth token: {}", e);
        }
    }

    /// EPIC id + OTP login. Always dispatches AuthStart, then exactly one of
    /// AuthSuccess / AuthFailure. A token is persisted only on success; a failure
    /// removes any token left by an earlier login, so a stored token always belongs
    /// to an authenticated voter.
    pub async fn login(&self, identifier: &str, otp: &str) -> SessionResult<UserProfile> {
        self.dispatch(SessionAction::AuthStart);

        let request = LoginRequest {
            epic_id: identifier.trim().to_string(),
            otp: otp.trim().to_string(),
        };

        let outcome = match self.api.login(&request).await {
            Ok(response) => self
                .storage
                .set(AUTH_TOKEN_KEY, &response.token)
                .map(|_| response.user)
                .map_err(SessionError::from),
            Err(e) => Err(user_facing(e, LOGIN_FAILED)),
        };

        match outcome {
            Ok(user) => {
                tracing::info!("[SESSION] Voter {} authenticated", user.id);
                self.dispatch(SessionAction::AuthSuccess(user.clone()));
                self.notifier.notify(Notification::success("Login successful!"));
                Ok(user)
            }
            Err(err) => {
                self.clear_token();
                self.dispatch(SessionAction::AuthFailure(err.to_string()));
                self.notifier.notify(Notification::error(err.to_string()));
                Err(err)
            }
        }
    }

    /// Submit a registration. Success does not authenticate: the voter must verify first,
    /// so the store settles back to guest.
    pub async fn register(&self, data: &RegistrationRequest) -> SessionResult<()> {
        self.dispatch(SessionAction::AuthStart);

        match self.api.register(data).await {
            Ok(()) => {
                tracing::info!("[SESSION] Registration accepted for {}", data.voter_epic_id);
                self.dispatch(SessionAction::RegistrationComplete);
                self.notifier.notify(Notification::success(
                    "Registration successful! Please verify your account to log in.",
                ));
                Ok(())
            }
            Err(e) => {
                let err = user_facing(e, REGISTRATION_FAILED);
                self.dispatch(SessionAction::AuthFailure(err.to_string()));
                self.notifier.notify(Notification::error(err.to_string()));
                Err(err)
            }
        }
    }

    /// Push a profile change. The state takes the profile the server returned, not the
    /// fields submitted. Failures leave the state untouched.
    pub async fn update_profile(&self, patch: &UserPatch) -> SessionResult<UserProfile> {
        let token = self.token().ok_or(SessionError::NotAuthenticated)?;

        match self.api.update_profile(&token, patch).await {
            Ok(confirmed) => {
                self.dispatch(SessionAction::ReplaceUser(confirmed.clone()));
                self.notifier.notify(Notification::success("Profile updated successfully"));
                Ok(confirmed)
            }
            Err(e) => {
                let err = user_facing(e, PROFILE_UPDATE_FAILED);
                self.notifier.notify(Notification::error(err.to_string()));
                Err(err)
            }
        }
    }

    /// Local logout; never touches the network.
    pub fn logout(&self) {
        self.clear_token();
        self.dispatch(SessionAction::Logout);
        tracing::info!("[SESSION] Logged out");
        self.notifier.notify(Notification::success("Logged out successfully"));
    }
}
