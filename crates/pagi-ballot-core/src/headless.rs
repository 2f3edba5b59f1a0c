//! Headless host: in-process implementations of the page capabilities.
//!
//! Used where there is no real browser behind the sentinel (integration harnesses,
//! the crate's own tests). Every implementation records what happened to it so
//! callers can inspect navigation, console output, overlays, and toasts.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use crate::capabilities::{
    Clock, Console, ConsoleLevel, ConsoleSink, EventDisposition, EventListener, EventSource,
    ManualClock, Notification, Notifier, PageContext, PageEvent, Subscription, WarningSurface,
    WindowMetrics,
};

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// -----------------------------------------------------------------------------
// Page
// -----------------------------------------------------------------------------

#[derive(Debug)]
struct PageState {
    origin: String,
    hostname: String,
    port: String,
    path: String,
    user_agent: String,
    metrics: WindowMetrics,
    navigations: Vec<String>,
}

/// Page whose location and viewport are set by the caller.
#[derive(Debug)]
pub struct HeadlessPage {
    state: Mutex<PageState>,
}

impl HeadlessPage {
    /// `https://{hostname}` on the default port, at `path`.
    pub fn new(hostname: &str, path: &str) -> Self {
        Self {
            state: Mutex::new(PageState {
                origin: format!("https://{}", hostname),
                hostname: hostname.to_string(),
                port: String::new(),
                path: path.to_string(),
                user_agent: "Mozilla/5.0 (PAGI Headless)".to_string(),
                metrics: WindowMetrics {
                    outer_width: 1280,
                    outer_height: 800,
                    inner_width: 1280,
                    inner_height: 720,
                },
                navigations: Vec::new(),
            }),
        }
    }

    pub fn with_port(self, port: &str) -> Self {
        {
            let mut s = lock(&self.state);
            s.port = port.to_string();
            s.origin = format!("http://{}:{}", s.hostname, port);
        }
        self
    }

    pub fn set_path(&self, path: &str) {
        lock(&self.state).path = path.to_string();
    }

    pub fn set_metrics(&self, metrics: WindowMetrics) {
        lock(&self.state).metrics = metrics;
    }

    /// Dock a panel of `width` px on the right side of the frame.
    pub fn dock_side_panel(&self, width: u32) {
        let mut s = lock(&self.state);
        s.metrics.inner_width = s.metrics.outer_width.saturating_sub(width);
    }

    /// Undo any docked panel.
    pub fn undock(&self) {
        let mut s = lock(&self.state);
        s.metrics.inner_width = s.metrics.outer_width;
        s.metrics.inner_height = s.metrics.outer_height.saturating_sub(80);
    }

    pub fn navigations(&self) -> Vec<String> {
        lock(&self.state).navigations.clone()
    }
}

impl PageContext for HeadlessPage {
    fn current_url(&self) -> String {
        let s = lock(&self.state);
        format!("{}{}", s.origin, s.path)
    }

    fn current_path(&self) -> String {
        lock(&self.state).path.clone()
    }

    fn hostname(&self) -> String {
        lock(&self.state).hostname.clone()
    }

    fn port(&self) -> String {
        lock(&self.state).port.clone()
    }

    fn user_agent(&self) -> String {
        lock(&self.state).user_agent.clone()
    }

    fn window_metrics(&self) -> WindowMetrics {
        lock(&self.state).metrics
    }

    fn navigate(&self, url: &str) {
        let mut s = lock(&self.state);
        s.navigations.push(url.to_string());
        s.path = url.to_string();
    }
}

// -----------------------------------------------------------------------------
// Console
// -----------------------------------------------------------------------------

/// Channel that appends `(level, message)` to a shared transcript.
struct TranscriptSink {
    level: ConsoleLevel,
    transcript: Arc<Mutex<Vec<(ConsoleLevel, String)>>>,
}

impl ConsoleSink for TranscriptSink {
    fn write(&self, message: &str) {
        lock(&self.transcript).push((self.level, message.to_string()));
    }
}

/// Console that records output and clear calls. `clear()` optionally advances a
/// `ManualClock`, simulating the slowdown an attached inspector causes.
pub struct HeadlessConsole {
    channels: RwLock<HashMap<ConsoleLevel, Arc<dyn ConsoleSink>>>,
    transcript: Arc<Mutex<Vec<(ConsoleLevel, String)>>>,
    clears: AtomicU64,
    clock: Option<Arc<ManualClock>>,
    clear_cost: Mutex<Duration>,
}

impl HeadlessConsole {
    pub fn new() -> Self {
        let transcript = Arc::new(Mutex::new(Vec::new()));
        let channels = ConsoleLevel::ALL
            .iter()
            .map(|&level| {
                let sink: Arc<dyn ConsoleSink> = Arc::new(TranscriptSink {
                    level,
                    transcript: Arc::clone(&transcript),
                });
                (level, sink)
            })
            .collect();
        Self {
            channels: RwLock::new(channels),
            transcript,
            clears: AtomicU64::new(0),
            clock: None,
            clear_cost: Mutex::new(Duration::ZERO),
        }
    }

    /// Each `clear()` advances `clock` by the current clear cost.
    pub fn with_clock(mut self, clock: Arc<ManualClock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn set_clear_cost(&self, cost: Duration) {
        *lock(&self.clear_cost) = cost;
    }

    pub fn transcript(&self) -> Vec<(ConsoleLevel, String)> {
        lock(&self.transcript).clone()
    }

    pub fn clear_count(&self) -> u64 {
        self.clears.load(Ordering::SeqCst)
    }

    /// Write through whatever is currently installed for `level`.
    pub fn write(&self, level: ConsoleLevel, message: &str) {
        self.channel(level).write(message);
    }
}

impl Default for HeadlessConsole {
    fn default() -> Self {
        Self::new()
    }
}

impl Console for HeadlessConsole {
    fn clear(&self) {
        self.clears.fetch_add(1, Ordering::SeqCst);
        if let Some(clock) = &self.clock {
            clock.advance(*lock(&self.clear_cost));
        }
    }

    fn channel(&self, level: ConsoleLevel) -> Arc<dyn ConsoleSink> {
        let channels = self.channels.read().unwrap_or_else(|p| p.into_inner());
        match channels.get(&level) {
            Some(sink) => Arc::clone(sink),
            None => Arc::new(crate::capabilities::NullSink),
        }
    }

    fn replace_channel(&self, level: ConsoleLevel, sink: Arc<dyn ConsoleSink>) {
        let mut channels = self.channels.write().unwrap_or_else(|p| p.into_inner());
        channels.insert(level, sink);
    }
}

// -----------------------------------------------------------------------------
// Warning overlay
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShownWarning {
    pub id: u64,
    pub title: String,
    pub message: String,
}

/// Overlay that tracks which warnings are currently mounted.
#[derive(Debug, Default)]
pub struct HeadlessOverlay {
    visible: Mutex<Vec<ShownWarning>>,
    shown_total: AtomicU64,
}

impl HeadlessOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn visible(&self) -> Vec<ShownWarning> {
        lock(&self.visible).clone()
    }

    pub fn shown_total(&self) -> u64 {
        self.shown_total.load(Ordering::SeqCst)
    }
}

impl WarningSurface for HeadlessOverlay {
    fn show(&self, warning_id: u64, title: &str, message: &str) {
        self.shown_total.fetch_add(1, Ordering::SeqCst);
        lock(&self.visible).push(ShownWarning {
            id: warning_id,
            title: title.to_string(),
            message: message.to_string(),
        });
    }

    fn dismiss(&self, warning_id: u64) {
        lock(&self.visible).retain(|w| w.id != warning_id);
    }
}

// -----------------------------------------------------------------------------
// Events
// -----------------------------------------------------------------------------

/// Event source driven by `dispatch`.
#[derive(Default)]
pub struct HeadlessEvents {
    listeners: Arc<Mutex<Vec<(u64, EventListener)>>>,
    next_id: AtomicU64,
}

impl HeadlessEvents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver an event to every listener; `PreventDefault` wins if any listener asks for it.
    pub fn dispatch(&self, event: &PageEvent) -> EventDisposition {
        let listeners: Vec<EventListener> = lock(&self.listeners)
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        let mut disposition = EventDisposition::Continue;
        for listener in listeners {
            if listener(event) == EventDisposition::PreventDefault {
                disposition = EventDisposition::PreventDefault;
            }
        }
        disposition
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.listeners).len()
    }
}

impl EventSource for HeadlessEvents {
    fn subscribe(&self, listener: EventListener) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        lock(&self.listeners).push((id, listener));
        let listeners = Arc::clone(&self.listeners);
        Subscription::new(move || {
            lock(&listeners).retain(|(lid, _)| *lid != id);
        })
    }
}

// -----------------------------------------------------------------------------
// Notifications
// -----------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct RecordingNotifier {
    seen: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        lock(&self.seen).clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        lock(&self.seen).push(notification);
    }
}

/// Clock handle usable wherever `Arc<dyn Clock>` is expected.
pub fn manual_clock() -> (Arc<ManualClock>, Arc<dyn Clock>) {
    let clock = Arc::new(ManualClock::new());
    let dyn_clock: Arc<dyn Clock> = clock.clone();
    (clock, dyn_clock)
}
