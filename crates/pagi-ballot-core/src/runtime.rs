//! BallotRuntime: composes configuration, storage, the auth client, both sessions and
//! the integrity monitor for one host.
//!
//! The host supplies only the page surfaces (location, events, console, overlay);
//! everything else comes from `BallotConfig`.

use std::sync::Arc;

use crate::capabilities::{
    Console, EventSource, PageContext, SystemClock, TracingNotifier, WarningSurface,
};
use crate::config::BallotConfig;
use crate::error::RuntimeError;
use crate::sentinel::{IntegrityMonitor, MonitorHandle, MonitorHost};
use crate::session::{
    AdminSessionStore, AdminUser, BootstrapOutcome, HttpAuthApi, SessionBootstrapper,
    SessionStore,
};
use crate::storage::SledStore;
use crate::violation::ViolationLog;

/// Page surfaces provided by the embedding host.
#[derive(Clone)]
pub struct PageSurfaces {
    pub page: Arc<dyn PageContext>,
    pub events: Arc<dyn EventSource>,
    pub console: Arc<dyn Console>,
    pub overlay: Arc<dyn WarningSurface>,
}

/// What `BallotRuntime::restore` found in storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoredSessions {
    pub voter: BootstrapOutcome,
    pub admin: Option<AdminUser>,
}

pub struct BallotRuntime {
    config: BallotConfig,
    storage: Arc<SledStore>,
    session: Arc<SessionStore>,
    admin: AdminSessionStore,
}

impl BallotRuntime {
    /// `BallotConfig::load()` followed by `from_config`.
    pub fn load() -> Result<Self, RuntimeError> {
        Self::from_config(BallotConfig::load()?)
    }

    pub fn from_config(config: BallotConfig) -> Result<Self, RuntimeError> {
        let storage = Arc::new(SledStore::open(Some(&config.storage.path))?);
        let api = Arc::new(HttpAuthApi::new(&config.auth)?);
        let session = Arc::new(SessionStore::new(
            api,
            storage.clone(),
            Arc::new(TracingNotifier),
        ));
        let admin = AdminSessionStore::new(storage.clone(), config.admin.clone());

        tracing::info!(
            "[RUNTIME] Ballot runtime ready (storage {}, auth {})",
            config.storage.path,
            config.auth.api_base_url
        );

        Ok(Self {
            config,
            storage,
            session,
            admin,
        })
    }

    pub fn config(&self) -> &BallotConfig {
        &self.config
    }

    pub fn storage(&self) -> &Arc<SledStore> {
        &self.storage
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    pub fn admin(&self) -> &AdminSessionStore {
        &self.admin
    }

    /// Persisted violation reports, for the violation page.
    pub fn violation_log(&self) -> ViolationLog {
        ViolationLog::new(self.storage.clone(), self.config.monitor.violation_log_capacity)
    }

    /// Startup: restore the admin session offline, then verify the voter token remotely.
    pub async fn restore(&self) -> RestoredSessions {
        let admin = self.admin.restore();
        let voter = SessionBootstrapper::new(Arc::clone(&self.session)).run().await;
        RestoredSessions { voter, admin }
    }

    /// Arm the integrity monitor over the host's page. `None` in open contexts.
    ///
    /// Must be called from within a tokio runtime.
    pub fn arm_monitor(&self, surfaces: PageSurfaces) -> Option<MonitorHandle> {
        let host = MonitorHost {
            page: surfaces.page,
            events: surfaces.events,
            console: surfaces.console,
            overlay: surfaces.overlay,
            store: self.storage.clone(),
            clock: Arc::new(SystemClock),
        };
        IntegrityMonitor::arm(host, &self.config.monitor, &self.config.environment)
    }

    /// Flush storage; call before the host exits.
    pub fn shutdown(&self) -> Result<(), RuntimeError> {
        self.storage.flush()?;
        tracing::info!("[RUNTIME] Ballot runtime flushed");
        Ok(())
    }
}
