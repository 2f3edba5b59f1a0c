//! Host capabilities injected into every sentinel and session component.
//!
//! The page host (a browser bridge, a headless test harness, a kiosk shell) implements
//! these traits; nothing in the crate touches global runtime state directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

// -----------------------------------------------------------------------------
// Clock
// -----------------------------------------------------------------------------

/// Monotonic and wall-clock time source.
pub trait Clock: Send + Sync {
    /// Monotonic instant for measuring durations.
    fn now(&self) -> Instant;
    /// Wall-clock timestamp stamped onto violations.
    fn timestamp(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn timestamp(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Hand-advanced clock for deterministic timing checks.
#[derive(Debug)]
pub struct ManualClock {
    base: Instant,
    epoch: DateTime<Utc>,
    offset: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            epoch: Utc::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        if let Ok(mut offset) = self.offset.lock() {
            *offset += by;
        }
    }

    fn offset(&self) -> Duration {
        self.offset.lock().map(|o| *o).unwrap_or_default()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + self.offset()
    }

    fn timestamp(&self) -> DateTime<Utc> {
        let offset = chrono::Duration::from_std(self.offset()).unwrap_or_else(|_| chrono::Duration::zero());
        self.epoch + offset
    }
}

// -----------------------------------------------------------------------------
// Page context
// -----------------------------------------------------------------------------

/// Outer (browser frame) and inner (viewport) window dimensions in logical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WindowMetrics {
    pub outer_width: u32,
    pub outer_height: u32,
    pub inner_width: u32,
    pub inner_height: u32,
}

impl WindowMetrics {
    /// Frame chrome on each axis. Saturates at zero when inner exceeds outer (zoomed pages).
    pub fn chrome(&self) -> (u32, u32) {
        (
            self.outer_width.saturating_sub(self.inner_width),
            self.outer_height.saturating_sub(self.inner_height),
        )
    }
}

/// The live page: location, agent, viewport, and full-page navigation.
pub trait PageContext: Send + Sync {
    /// Full URL of the current page.
    fn current_url(&self) -> String;
    /// Path component of the current route (e.g. `/vote/ballot`).
    fn current_path(&self) -> String;
    fn hostname(&self) -> String;
    /// Port the page is served from; empty for the scheme default.
    fn port(&self) -> String;
    fn user_agent(&self) -> String;
    fn window_metrics(&self) -> WindowMetrics;
    /// Full-page navigation (not in-app routing).
    fn navigate(&self, url: &str);
}

// -----------------------------------------------------------------------------
// Console
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleLevel {
    Log,
    Info,
    Warn,
    Error,
    Debug,
}

impl ConsoleLevel {
    pub const ALL: [ConsoleLevel; 5] = [
        ConsoleLevel::Log,
        ConsoleLevel::Info,
        ConsoleLevel::Warn,
        ConsoleLevel::Error,
        ConsoleLevel::Debug,
    ];
}

/// One logging channel (`console.log`, `console.warn`, ...).
pub trait ConsoleSink: Send + Sync {
    fn write(&self, message: &str);
}

/// Channel that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ConsoleSink for NullSink {
    fn write(&self, _message: &str) {}
}

/// The page console. Channels are swappable so suppression can replace them.
pub trait Console: Send + Sync {
    /// The console-clear primitive; its duration feeds the timing heuristic.
    fn clear(&self);
    fn channel(&self, level: ConsoleLevel) -> Arc<dyn ConsoleSink>;
    fn replace_channel(&self, level: ConsoleLevel, sink: Arc<dyn ConsoleSink>);
}

// -----------------------------------------------------------------------------
// Warning surface and notifications
// -----------------------------------------------------------------------------

/// Modal-style warning overlay.
pub trait WarningSurface: Send + Sync {
    fn show(&self, warning_id: u64, title: &str, message: &str);
    fn dismiss(&self, warning_id: u64);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Error,
            message: message.into(),
        }
    }
}

/// Toast channel for session outcomes.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Notifier that only traces.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) {
        match notification.kind {
            NotificationKind::Success => tracing::info!("[NOTIFY] {}", notification.message),
            NotificationKind::Error => tracing::warn!("[NOTIFY] {}", notification.message),
        }
    }
}

// -----------------------------------------------------------------------------
// Event source
// -----------------------------------------------------------------------------

/// A chorded key press as reported by the page.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct KeyChord {
    /// Key name as the page reports it (`"F12"`, `"i"`, `"U"`).
    pub key: String,
    #[serde(default)]
    pub ctrl: bool,
    #[serde(default)]
    pub shift: bool,
    #[serde(default)]
    pub alt: bool,
    /// Cmd on macOS.
    #[serde(default)]
    pub meta: bool,
}

impl KeyChord {
    pub fn key(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Default::default()
        }
    }

    pub fn ctrl(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ctrl: true,
            ..Default::default()
        }
    }

    pub fn ctrl_shift(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ctrl: true,
            shift: true,
            ..Default::default()
        }
    }

    pub fn meta(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            meta: true,
            ..Default::default()
        }
    }

    /// Ctrl on most platforms, Cmd on macOS.
    pub fn command(&self) -> bool {
        self.ctrl || self.meta
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PageEvent {
    ContextMenu,
    KeyDown(KeyChord),
}

/// What the listener wants the host to do with the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventDisposition {
    /// Let the browser's default handling run.
    Continue,
    /// Call `preventDefault()` and stop.
    PreventDefault,
}

pub type EventListener = Arc<dyn Fn(&PageEvent) -> EventDisposition + Send + Sync>;

/// Registered listener; deregisters when dropped.
pub struct Subscription {
    on_drop: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(on_drop: impl FnOnce() + Send + 'static) -> Self {
        Self {
            on_drop: Some(Box::new(on_drop)),
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(f) = self.on_drop.take() {
            f();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

/// DOM-style pointer/keyboard event source.
pub trait EventSource: Send + Sync {
    fn subscribe(&self, listener: EventListener) -> Subscription;
}
