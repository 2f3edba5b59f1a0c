//! PollingDetector: two independent, edge-triggered "tools open" heuristics.
//!
//! - Size: outer-vs-inner window difference beyond a threshold on either axis.
//! - Timing: the console-clear primitive takes longer than a threshold.
//!
//! Both are best-effort. The only contract is one violation per false→true edge;
//! a heuristic that stays flagged does not fire again until it has cleared.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::capabilities::{Clock, Console, PageContext, WindowMetrics};
use crate::config::MonitorConfig;
use crate::sentinel::sink::ViolationSink;
use crate::violation::{Violation, ViolationKind};

/// Per-detector "currently flagged" state.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DetectionLatch {
    flagged: bool,
}

impl DetectionLatch {
    /// Feed one observation. Returns true only on a rising edge.
    pub fn observe(&mut self, condition: bool) -> bool {
        let rising = condition && !self.flagged;
        self.flagged = condition;
        rising
    }

    pub fn is_flagged(&self) -> bool {
        self.flagged
    }
}

#[derive(Debug, Clone)]
pub struct SizeHeuristic {
    threshold_px: u32,
    latch: DetectionLatch,
}

impl SizeHeuristic {
    pub fn new(threshold_px: u32) -> Self {
        Self {
            threshold_px,
            latch: DetectionLatch::default(),
        }
    }

    pub fn tools_open(&self, metrics: &WindowMetrics) -> bool {
        let (width_gap, height_gap) = metrics.chrome();
        width_gap > self.threshold_px || height_gap > self.threshold_px
    }

    /// One poll. True when a violation should be raised.
    pub fn poll(&mut self, metrics: &WindowMetrics) -> bool {
        let open = self.tools_open(metrics);
        self.latch.observe(open)
    }

    pub fn is_flagged(&self) -> bool {
        self.latch.is_flagged()
    }
}

#[derive(Debug, Clone)]
pub struct TimingHeuristic {
    threshold: Duration,
    latch: DetectionLatch,
}

impl TimingHeuristic {
    pub fn new(threshold: Duration) -> Self {
        Self {
            threshold,
            latch: DetectionLatch::default(),
        }
    }

    /// Wall-clock cost of one console clear.
    pub fn measure(console: &dyn Console, clock: &dyn Clock) -> Duration {
        let start = clock.now();
        console.clear();
        clock.now().saturating_duration_since(start)
    }

    /// One poll with a measured clear duration. True when a violation should be raised.
    pub fn poll(&mut self, elapsed: Duration) -> bool {
        self.latch.observe(elapsed > self.threshold)
    }

    pub fn is_flagged(&self) -> bool {
        self.latch.is_flagged()
    }
}

/// Shared collaborators for both polling loops.
pub struct PollingDetector {
    sink: Arc<ViolationSink>,
    page: Arc<dyn PageContext>,
    console: Arc<dyn Console>,
    clock: Arc<dyn Clock>,
    config: MonitorConfig,
}

/// Running detectors. Dropping the handle cancels both loops.
#[derive(Debug)]
pub struct DetectorHandle {
    tasks: Vec<JoinHandle<()>>,
}

impl Drop for DetectorHandle {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

impl PollingDetector {
    pub fn new(
        sink: Arc<ViolationSink>,
        page: Arc<dyn PageContext>,
        console: Arc<dyn Console>,
        clock: Arc<dyn Clock>,
        config: MonitorConfig,
    ) -> Self {
        Self {
            sink,
            page,
            console,
            clock,
            config,
        }
    }

    fn raise(&self) {
        self.sink.record(Violation::observe(
            ViolationKind::ToolsOpenHeuristic,
            self.clock.as_ref(),
            self.page.as_ref(),
        ));
    }

    /// Spawn both loops. Must be called from within a tokio runtime.
    pub fn start(self: Arc<Self>) -> DetectorHandle {
        let size = tokio::spawn(Arc::clone(&self).run_size_loop());
        let timing = tokio::spawn(Arc::clone(&self).run_timing_loop());
        tracing::info!(
            "[SENTINEL] PollingDetector started (size every {:?}, timing every {:?})",
            self.config.size_poll_interval(),
            self.config.timing_poll_interval()
        );
        DetectorHandle {
            tasks: vec![size, timing],
        }
    }

    async fn run_size_loop(self: Arc<Self>) {
        let period = self.config.size_poll_interval();
        if period.is_zero() {
            tracing::warn!("[SENTINEL] Size poll period is zero; detector disabled");
            return;
        }
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut heuristic = SizeHeuristic::new(self.config.size_threshold_px);
        loop {
            ticker.tick().await;
            let metrics = self.page.window_metrics();
            if heuristic.poll(&metrics) {
                tracing::warn!("[SENTINEL] Size heuristic tripped: {:?}", metrics);
                self.raise();
            } else {
                tracing::debug!(
                    "[SENTINEL] Size poll: chrome={:?} flagged={}",
                    metrics.chrome(),
                    heuristic.is_flagged()
                );
            }
        }
    }

    async fn run_timing_loop(self: Arc<Self>) {
        let period = self.config.timing_poll_interval();
        if period.is_zero() {
            tracing::warn!("[SENTINEL] Timing poll period is zero; detector disabled");
            return;
        }
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut heuristic = TimingHeuristic::new(self.config.timing_threshold());
        loop {
            ticker.tick().await;
            let elapsed = TimingHeuristic::measure(self.console.as_ref(), self.clock.as_ref());
            if heuristic.poll(elapsed) {
                tracing::warn!("[SENTINEL] Timing heuristic tripped: clear took {:?}", elapsed);
                self.raise();
            } else {
                tracing::debug!(
                    "[SENTINEL] Timing poll: clear took {:?} flagged={}",
                    elapsed,
                    heuristic.is_flagged()
                );
            }
        }
    }
}
