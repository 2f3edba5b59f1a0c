//! Sentinel: page integrity monitoring.
//!
//! - **InputGuard**: blocks context menus and inspection shortcuts
//! - **PollingDetector**: size and timing "tools open" heuristics, edge-triggered
//! - **ViolationSink**: bounded violation log, transient warning, console suppression
//! - **EscalationPolicy**: delayed navigation to the violation page on sensitive routes
//!
//! Nothing here is armed unless the environment classifier says the context is protected.
//! This is a deterrent, not a security boundary.

pub mod console;
pub mod escalation;
pub mod input_guard;
pub mod monitor;
pub mod polling;
pub mod sink;

pub use console::{suppress_console, ConsoleSuppression, CONSOLE_BANNER};
pub use escalation::EscalationPolicy;
pub use input_guard::{classify_chord, ForbiddenShortcut, InputGuard};
pub use monitor::{IntegrityMonitor, MonitorHandle, MonitorHost};
pub use polling::{DetectionLatch, DetectorHandle, PollingDetector, SizeHeuristic, TimingHeuristic};
pub use sink::ViolationSink;
