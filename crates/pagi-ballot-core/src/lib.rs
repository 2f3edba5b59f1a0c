//! PAGI Ballot core library.
//! Page integrity sentinel and voter/admin session state machines for the ballot front end.

pub mod capabilities;
pub mod config;
pub mod environment;
pub mod error;
pub mod headless;
pub mod runtime;
pub mod sentinel;
pub mod session;
pub mod storage;
pub mod violation;

pub use capabilities::{
    Clock, Console, ConsoleLevel, ConsoleSink, EventDisposition, EventSource, KeyChord,
    ManualClock, Notification, NotificationKind, Notifier, PageContext, PageEvent, Subscription,
    SystemClock, TracingNotifier, WarningSurface, WindowMetrics,
};
pub use config::{BallotConfig, EnvironmentConfig, MonitorConfig, SECURITY_VIOLATION_ROUTE};
pub use environment::{is_protected, EnvironmentSignals};
pub use error::{AuthApiError, ConfigError, RuntimeError, SessionError, StoreError};
pub use runtime::{BallotRuntime, PageSurfaces, RestoredSessions};
pub use sentinel::{IntegrityMonitor, MonitorHandle, MonitorHost, ViolationSink};
pub use session::{
    AdminSessionStore, BootstrapOutcome, HttpAuthApi, SessionBootstrapper, SessionState,
    SessionStore, UserProfile,
};
pub use storage::{KeyValueStore, MemoryStore, SledStore};
pub use violation::{Violation, ViolationKind, ViolationLog};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
