//! Console suppression: silence the page console and keep it clear.
//!
//! The original warn channel is captured before any channel is replaced; the banner
//! goes out through that captured reference; otherwise it would be swallowed by the
//! suppression it announces.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::capabilities::{Console, ConsoleLevel, NullSink};
use crate::config::MonitorConfig;

pub const CONSOLE_BANNER: &str =
    "STOP! This browser feature is intended for developers. Inspecting or modifying this page \
     during voting is logged as a security violation.";

/// Running suppression. Dropping it stops the banner timer and the clear loop; the
/// no-op channels stay installed.
#[derive(Debug)]
pub struct ConsoleSuppression {
    tasks: Vec<JoinHandle<()>>,
}

impl ConsoleSuppression {
    pub fn is_running(&self) -> bool {
        self.tasks.iter().any(|t| !t.is_finished())
    }
}

impl Drop for ConsoleSuppression {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

/// Install no-op channels, schedule the banner, and start the clear loop.
///
/// Must be called from within a tokio runtime.
pub fn suppress_console(console: Arc<dyn Console>, config: &MonitorConfig) -> ConsoleSuppression {
    let original_warn = console.channel(ConsoleLevel::Warn);

    for level in ConsoleLevel::ALL {
        console.replace_channel(level, Arc::new(NullSink));
    }
    tracing::info!("[SENTINEL] Console channels suppressed");

    let banner_delay = config.banner_delay();
    let banner = tokio::spawn(async move {
        tokio::time::sleep(banner_delay).await;
        original_warn.write(CONSOLE_BANNER);
    });

    let clear_every = config.console_clear_interval();
    let clearer = tokio::spawn(clear_loop(console, clear_every));

    ConsoleSuppression {
        tasks: vec![banner, clearer],
    }
}

async fn clear_loop(console: Arc<dyn Console>, every: Duration) {
    if every.is_zero() {
        tracing::warn!("[SENTINEL] Console clear interval is zero; clearing disabled");
        return;
    }
    let mut interval = tokio::time::interval(every);
    // First tick completes immediately; the first clear happens one period in.
    interval.tick().await;
    loop {
        interval.tick().await;
        console.clear();
    }
}
