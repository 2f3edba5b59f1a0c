//! ViolationSink: logs, warns, and forwards every violation.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::runtime::Handle;

use crate::capabilities::WarningSurface;
use crate::config::MonitorConfig;
use crate::sentinel::escalation::EscalationPolicy;
use crate::violation::{Violation, ViolationLog};

const WARNING_MESSAGE: &str =
    "Security violation detected. This action has been logged and may be reported.";

fn lock_active(active: &Mutex<Option<u64>>) -> MutexGuard<'_, Option<u64>> {
    active.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub struct ViolationSink {
    log: ViolationLog,
    overlay: Arc<dyn WarningSurface>,
    escalation: EscalationPolicy,
    warning_duration: Duration,
    /// Id of the warning currently mounted on the overlay. At most one.
    /// Never held across a call into the overlay.
    active_warning: Arc<Mutex<Option<u64>>>,
    next_warning_id: AtomicU64,
    runtime: Handle,
}

impl ViolationSink {
    /// `runtime` runs the auto-dismiss timers, so `record` may be called from any thread.
    pub fn new(
        log: ViolationLog,
        overlay: Arc<dyn WarningSurface>,
        escalation: EscalationPolicy,
        config: &MonitorConfig,
        runtime: Handle,
    ) -> Self {
        Self {
            log,
            overlay,
            escalation,
            warning_duration: config.warning_duration(),
            active_warning: Arc::new(Mutex::new(None)),
            next_warning_id: AtomicU64::new(1),
            runtime,
        }
    }

    pub fn log(&self) -> &ViolationLog {
        &self.log
    }

    /// Log, warn, escalate. Never fails: a storage error is traced and the warning and
    /// escalation still happen.
    pub fn record(&self, violation: Violation) {
        tracing::warn!(
            "[SENTINEL] Violation: {:?} at {} ({})",
            violation.kind,
            violation.current_url,
            violation.timestamp.to_rfc3339()
        );

        if let Err(e) = self.log.append(violation.clone()) {
            tracing::error!("[SENTINEL] Failed to persist violation: {}", e);
        }

        self.show_warning(&violation);
        self.escalation.escalate(&violation);
    }

    /// Replace any visible warning with a new one and arm its auto-dismiss timer.
    fn show_warning(&self, violation: &Violation) {
        let id = self.next_warning_id.fetch_add(1, Ordering::SeqCst);
        let previous = lock_active(&self.active_warning).replace(id);

        if let Some(previous) = previous {
            self.overlay.dismiss(previous);
        }
        self.overlay
            .show(id, violation.kind.headline(), WARNING_MESSAGE);

        // Fire-and-forget; only dismisses if this warning is still the visible one.
        let active = Arc::clone(&self.active_warning);
        let overlay = Arc::clone(&self.overlay);
        let duration = self.warning_duration;
        self.runtime.spawn(async move {
            tokio::time::sleep(duration).await;
            let expired = {
                let mut current = lock_active(&active);
                if *current == Some(id) {
                    current.take()
                } else {
                    None
                }
            };
            if let Some(id) = expired {
                overlay.dismiss(id);
            }
        });
    }

    /// User clicked the warning's dismiss control.
    pub fn dismiss_warning(&self) {
        let taken = lock_active(&self.active_warning).take();
        if let Some(id) = taken {
            self.overlay.dismiss(id);
        }
    }

    /// Id of the visible warning, if any.
    pub fn visible_warning(&self) -> Option<u64> {
        *lock_active(&self.active_warning)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::PageContext;
    use crate::headless::{HeadlessOverlay, HeadlessPage};
    use crate::storage::MemoryStore;
    use crate::violation::ViolationKind;

    fn sink_on(path: &str) -> (ViolationSink, Arc<HeadlessPage>, Arc<HeadlessOverlay>) {
        let config = MonitorConfig::default();
        let page = Arc::new(HeadlessPage::new("vote.example.org", path));
        let overlay = Arc::new(HeadlessOverlay::new());
        let sink = ViolationSink::new(
            ViolationLog::new(Arc::new(MemoryStore::new()), config.violation_log_capacity),
            overlay.clone(),
            EscalationPolicy::new(page.clone(), &config, Handle::current()),
            &config,
            Handle::current(),
        );
        (sink, page, overlay)
    }

    fn violation(page: &HeadlessPage, kind: ViolationKind) -> Violation {
        Violation::new(kind, chrono::Utc::now(), page.current_url(), page.user_agent())
    }

    #[tokio::test(start_paused = true)]
    async fn warning_auto_dismisses_after_five_seconds() {
        let (sink, page, overlay) = sink_on("/");
        sink.record(violation(&page, ViolationKind::ContextMenu));
        assert_eq!(overlay.visible().len(), 1);

        tokio::time::sleep(Duration::from_millis(4_900)).await;
        assert_eq!(overlay.visible().len(), 1);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(overlay.visible().is_empty());
        assert_eq!(sink.visible_warning(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn new_warning_replaces_visible_one() {
        let (sink, page, overlay) = sink_on("/");
        sink.record(violation(&page, ViolationKind::ContextMenu));
        tokio::time::sleep(Duration::from_secs(3)).await;
        sink.record(violation(&page, ViolationKind::ForbiddenShortcut));

        let visible = overlay.visible();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].title, ViolationKind::ForbiddenShortcut.headline());

        // First warning's timer fires at t=5s and must not dismiss the replacement.
        tokio::time::sleep(Duration::from_millis(2_500)).await;
        assert_eq!(overlay.visible().len(), 1);

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(overlay.visible().is_empty());
        assert_eq!(overlay.shown_total(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn explicit_dismiss_clears_overlay() {
        let (sink, page, overlay) = sink_on("/");
        sink.record(violation(&page, ViolationKind::ContextMenu));
        sink.dismiss_warning();
        assert!(overlay.visible().is_empty());
        assert_eq!(sink.log().entries().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn sensitive_route_navigates_after_delay() {
        let (sink, page, _overlay) = sink_on("/vote/ballot");
        sink.record(violation(&page, ViolationKind::ForbiddenShortcut));

        tokio::time::sleep(Duration::from_millis(1_900)).await;
        assert!(page.navigations().is_empty());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(page.navigations(), vec!["/security-violation".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn navigation_still_fires_after_leaving_sensitive_route() {
        let (sink, page, _overlay) = sink_on("/admin/dashboard");
        sink.record(violation(&page, ViolationKind::ToolsOpenHeuristic));
        page.set_path("/about");

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(page.navigations(), vec!["/security-violation".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn ordinary_route_never_navigates() {
        let (sink, page, _overlay) = sink_on("/news");
        sink.record(violation(&page, ViolationKind::ContextMenu));

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(page.navigations().is_empty());
        assert_eq!(sink.log().entries().unwrap().len(), 1);
    }

    /// Overlay whose show handler immediately dismisses through the sink.
    struct SelfDismissingOverlay {
        inner: HeadlessOverlay,
        sink: std::sync::OnceLock<std::sync::Weak<ViolationSink>>,
    }

    impl WarningSurface for SelfDismissingOverlay {
        fn show(&self, warning_id: u64, title: &str, message: &str) {
            self.inner.show(warning_id, title, message);
            if let Some(sink) = self.sink.get().and_then(std::sync::Weak::upgrade) {
                sink.dismiss_warning();
            }
        }

        fn dismiss(&self, warning_id: u64) {
            self.inner.dismiss(warning_id);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn overlay_may_dismiss_from_inside_show() {
        let config = MonitorConfig::default();
        let page = Arc::new(HeadlessPage::new("vote.example.org", "/"));
        let overlay = Arc::new(SelfDismissingOverlay {
            inner: HeadlessOverlay::new(),
            sink: std::sync::OnceLock::new(),
        });
        let sink = Arc::new(ViolationSink::new(
            ViolationLog::new(Arc::new(MemoryStore::new()), config.violation_log_capacity),
            overlay.clone(),
            EscalationPolicy::new(page.clone(), &config, Handle::current()),
            &config,
            Handle::current(),
        ));
        let _ = overlay.sink.set(Arc::downgrade(&sink));

        sink.record(violation(&page, ViolationKind::ContextMenu));

        assert!(overlay.inner.visible().is_empty());
        assert_eq!(overlay.inner.shown_total(), 1);
        assert_eq!(sink.visible_warning(), None);

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert!(overlay.inner.visible().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn record_from_a_host_thread_still_times_out_and_escalates() {
        let (sink, page, overlay) = sink_on("/vote");
        let sink = Arc::new(sink);

        let recorder = Arc::clone(&sink);
        let thread_page = Arc::clone(&page);
        std::thread::spawn(move || {
            recorder.record(violation(&thread_page, ViolationKind::ContextMenu));
        })
        .join()
        .unwrap();

        assert_eq!(overlay.visible().len(), 1);
        assert_eq!(sink.log().entries().unwrap().len(), 1);

        tokio::time::sleep(Duration::from_millis(5_100)).await;
        assert!(overlay.visible().is_empty());
        assert_eq!(page.navigations(), vec!["/security-violation".to_string()]);
    }
}
