//! EscalationPolicy: sends the voter to the violation page when a violation happens
//! on a sensitive route.
//!
//! The navigation is scheduled once and cannot be cancelled; leaving the sensitive
//! route before the delay elapses does not stop it.

use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;

use crate::capabilities::PageContext;
use crate::config::MonitorConfig;
use crate::violation::Violation;

pub struct EscalationPolicy {
    page: Arc<dyn PageContext>,
    route_markers: Vec<String>,
    violation_route: String,
    delay: Duration,
    runtime: Handle,
}

impl EscalationPolicy {
    /// `runtime` runs the delayed navigation, so `escalate` may be called from any thread.
    pub fn new(page: Arc<dyn PageContext>, config: &MonitorConfig, runtime: Handle) -> Self {
        Self {
            page,
            route_markers: config.escalation_route_markers.clone(),
            violation_route: config.violation_route.clone(),
            delay: config.escalation_delay(),
            runtime,
        }
    }

    /// True when `path` contains one of the sensitive route markers.
    pub fn is_sensitive(&self, path: &str) -> bool {
        self.route_markers.iter().any(|m| path.contains(m.as_str()))
    }

    /// Schedule the navigation if the current route is sensitive. Returns whether it was scheduled.
    pub fn escalate(&self, violation: &Violation) -> bool {
        let path = self.page.current_path();
        if !self.is_sensitive(&path) {
            tracing::debug!(
                "[SENTINEL] {:?} on {}: route not sensitive, no escalation",
                violation.kind,
                path
            );
            return false;
        }

        tracing::warn!(
            "[SENTINEL] {:?} on sensitive route {}; navigating to {} in {:?}",
            violation.kind,
            path,
            self.violation_route,
            self.delay
        );

        let page = Arc::clone(&self.page);
        let target = self.violation_route.clone();
        let delay = self.delay;
        self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            page.navigate(&target);
        });
        true
    }
}
