//! Admin session: a separate identity with a role and a fixed permission set.
//!
//! Login is checked against the configured credential triple (identifier, secret,
//! challenge code) with no network round-trip. Persisted under `admin-user` and
//! `admin-token`; never shares state or keys with the voter session.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;

use crate::config::AdminConfig;
use crate::error::{SessionError, SessionResult};
use crate::storage::{KeyValueStore, ADMIN_TOKEN_KEY, ADMIN_USER_KEY};

const INVALID_ADMIN_CREDENTIALS: &str = "Invalid admin credentials";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUser {
    pub id: String,
    pub identifier: String,
    pub role: String,
    pub permissions: Vec<String>,
}

impl AdminUser {
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum AdminSessionState {
    #[default]
    Idle,
    Loading,
    Authenticated(AdminUser),
    Failed(String),
}

impl AdminSessionState {
    pub fn admin(&self) -> Option<&AdminUser> {
        match self {
            AdminSessionState::Authenticated(admin) => Some(admin),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, AdminSessionState::Authenticated(_))
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            AdminSessionState::Failed(message) => Some(message),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdminAction {
    AuthStart,
    AuthSuccess(AdminUser),
    AuthFailure(String),
    Logout,
    ClearError,
}

pub fn reduce_admin(state: AdminSessionState, action: AdminAction) -> AdminSessionState {
    match (state, action) {
        (_, AdminAction::AuthStart) => AdminSessionState::Loading,
        (_, AdminAction::AuthSuccess(admin)) => AdminSessionState::Authenticated(admin),
        (_, AdminAction::AuthFailure(message)) => AdminSessionState::Failed(message),
        (_, AdminAction::Logout) => AdminSessionState::Idle,
        (AdminSessionState::Failed(_), AdminAction::ClearError) => AdminSessionState::Idle,
        (state, AdminAction::ClearError) => state,
    }
}

pub struct AdminSessionStore {
    state: watch::Sender<AdminSessionState>,
    storage: Arc<dyn KeyValueStore>,
    credentials: AdminConfig,
}

impl AdminSessionStore {
    pub fn new(storage: Arc<dyn KeyValueStore>, credentials: AdminConfig) -> Self {
        let (state, _) = watch::channel(AdminSessionState::default());
        Self {
            state,
            storage,
            credentials,
        }
    }

    pub fn state(&self) -> AdminSessionState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AdminSessionState> {
        self.state.subscribe()
    }

    pub fn dispatch(&self, action: AdminAction) -> AdminSessionState {
        tracing::debug!("[ADMIN] dispatch {:?}", action);
        self.state.send_modify(|current| {
            let previous = std::mem::take(current);
            *current = reduce_admin(previous, action);
        });
        self.state()
    }

    fn credentials_match(&self, identifier: &str, secret: &str, challenge_code: &str) -> bool {
        identifier.trim().eq_ignore_ascii_case(self.credentials.identifier.trim())
            && secret == self.credentials.secret
            && challenge_code.trim() == self.credentials.challenge_code
    }

    /// Validate the credential triple. On success the admin record and a fresh token are persisted.
    pub fn login(&self, identifier: &str, secret: &str, challenge_code: &str) -> SessionResult<AdminUser> {
        self.dispatch(AdminAction::AuthStart);

        if !self.credentials_match(identifier, secret, challenge_code) {
            tracing::warn!("[ADMIN] Rejected admin login for {}", identifier.trim());
            self.dispatch(AdminAction::AuthFailure(INVALID_ADMIN_CREDENTIALS.to_string()));
            return Err(SessionError::Rejected(INVALID_ADMIN_CREDENTIALS.to_string()));
        }

        let admin = AdminUser {
            id: "admin-1".to_string(),
            identifier: self.credentials.identifier.clone(),
            role: self.credentials.role.clone(),
            permissions: self.credentials.permissions.clone(),
        };

        if let Err(e) = self.persist(&admin) {
            let err = SessionError::from(e);
            self.dispatch(AdminAction::AuthFailure(err.to_string()));
            return Err(err);
        }

        tracing::info!("[ADMIN] Admin {} authenticated as {}", admin.identifier, admin.role);
        self.dispatch(AdminAction::AuthSuccess(admin.clone()));
        Ok(admin)
    }

    fn persist(&self, admin: &AdminUser) -> crate::error::StoreResult<()> {
        let token = format!("admin-{}", uuid::Uuid::new_v4());
        self.storage.set(ADMIN_USER_KEY, &serde_json::to_string(admin)?)?;
        self.storage.set(ADMIN_TOKEN_KEY, &token)?;
        Ok(())
    }

    /// Restore from `admin-user` + `admin-token`. Partial or unreadable records are
    /// cleared and the state stays idle.
    pub fn restore(&self) -> Option<AdminUser> {
        let user = self.storage.get(ADMIN_USER_KEY).ok().flatten();
        let token = self.storage.get(ADMIN_TOKEN_KEY).ok().flatten();

        let restored = match (user, token) {
            (Some(user), Some(token)) if !token.is_empty() => {
                serde_json::from_str::<AdminUser>(&user).ok()
            }
            (None, None) => return None,
            _ => None,
        };

        match restored {
            Some(admin) => {
                tracing::info!("[ADMIN] Admin session restored for {}", admin.identifier);
                self.dispatch(AdminAction::AuthSuccess(admin.clone()));
                Some(admin)
            }
            None => {
                tracing::debug!("[ADMIN] Discarding incomplete admin session");
                self.clear();
                None
            }
        }
    }

    fn clear(&self) {
        for key in [ADMIN_USER_KEY, ADMIN_TOKEN_KEY] {
            if let Err(e) = self.storage.remove(key) {
                tracing::error!("[ADMIN] Failed to clear {}: {}", key, e);
            }
        }
    }

    pub fn logout(&self) {
        self.clear();
        self.dispatch(AdminAction::Logout);
        tracing::info!("[ADMIN] Admin logged out");
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.state()
            .admin()
            .map(|a| a.has_permission(permission))
            .unwrap_or(false)
    }
}
