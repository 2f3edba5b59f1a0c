//! IntegrityMonitor: wires the sentinel chain together for one page lifetime.

use std::sync::Arc;
use tokio::runtime::Handle;

use crate::capabilities::{Clock, Console, EventSource, PageContext, Subscription, WarningSurface};
use crate::config::{EnvironmentConfig, MonitorConfig};
use crate::environment;
use crate::sentinel::console::{suppress_console, ConsoleSuppression};
use crate::sentinel::escalation::EscalationPolicy;
use crate::sentinel::input_guard::InputGuard;
use crate::sentinel::polling::{DetectorHandle, PollingDetector};
use crate::sentinel::sink::ViolationSink;
use crate::storage::KeyValueStore;
use crate::violation::ViolationLog;

/// Everything the monitor needs from the host.
#[derive(Clone)]
pub struct MonitorHost {
    pub page: Arc<dyn PageContext>,
    pub events: Arc<dyn EventSource>,
    pub console: Arc<dyn Console>,
    pub overlay: Arc<dyn WarningSurface>,
    pub store: Arc<dyn KeyValueStore>,
    pub clock: Arc<dyn Clock>,
}

/// Armed monitor. Dropping it (page unload, provider unmount) removes the input
/// listener and cancels every owned timer. Escalations and auto-dismiss timers
/// already scheduled still run.
pub struct MonitorHandle {
    sink: Arc<ViolationSink>,
    _subscription: Subscription,
    _detectors: DetectorHandle,
    _console: ConsoleSuppression,
}

impl MonitorHandle {
    pub fn sink(&self) -> &Arc<ViolationSink> {
        &self.sink
    }

    /// Explicit teardown; same as dropping.
    pub fn disarm(self) {
        tracing::info!("[SENTINEL] Integrity monitor disarmed");
    }
}

pub struct IntegrityMonitor;

impl IntegrityMonitor {
    /// Arm every monitor if the context is protected; `None` in open contexts.
    ///
    /// Must be called from within a tokio runtime; outside one nothing is armed. Once
    /// armed, host events may be delivered from any thread.
    pub fn arm(
        host: MonitorHost,
        monitor: &MonitorConfig,
        environment: &EnvironmentConfig,
    ) -> Option<MonitorHandle> {
        if !environment::is_protected(environment, host.page.as_ref()) {
            tracing::info!("[SENTINEL] Open context; integrity monitor not armed");
            return None;
        }

        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                tracing::error!("[SENTINEL] Cannot arm integrity monitor without a runtime: {}", e);
                return None;
            }
        };

        let log = ViolationLog::new(Arc::clone(&host.store), monitor.violation_log_capacity);
        let escalation = EscalationPolicy::new(Arc::clone(&host.page), monitor, runtime.clone());
        let sink = Arc::new(ViolationSink::new(
            log,
            Arc::clone(&host.overlay),
            escalation,
            monitor,
            runtime,
        ));

        let guard = Arc::new(InputGuard::new(
            Arc::clone(&sink),
            Arc::clone(&host.page),
            Arc::clone(&host.clock),
            monitor.guard_route_markers.clone(),
        ));
        let subscription = guard.attach(host.events.as_ref());

        let detectors = Arc::new(PollingDetector::new(
            Arc::clone(&sink),
            Arc::clone(&host.page),
            Arc::clone(&host.console),
            Arc::clone(&host.clock),
            monitor.clone(),
        ))
        .start();

        let console = suppress_console(Arc::clone(&host.console), monitor);

        tracing::info!(
            "[SENTINEL] Integrity monitor armed on {}",
            host.page.current_url()
        );

        Some(MonitorHandle {
            sink,
            _subscription: subscription,
            _detectors: detectors,
            _console: console,
        })
    }
}
