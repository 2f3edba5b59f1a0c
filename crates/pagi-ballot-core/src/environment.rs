//! Environment classifier: decides whether monitoring should be armed.
//!
//! Every signal has to agree the context is production-like. A single dissenting
//! signal (dev build, staging deploy, loopback host, non-default port) keeps the
//! monitors disarmed.

use crate::capabilities::PageContext;
use crate::config::EnvironmentConfig;

const LOOPBACK_HOSTS: &[&str] = &["localhost", "127.0.0.1", "::1", "[::1]", "0.0.0.0"];
const DEFAULT_PORTS: &[&str] = &["", "80", "443"];

/// Inputs the classifier reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentSignals {
    pub build_mode: String,
    pub deployment_env: String,
    pub hostname: String,
    pub port: String,
}

impl EnvironmentSignals {
    /// Read the live page signals alongside the configured build flags.
    pub fn observe(config: &EnvironmentConfig, page: &dyn PageContext) -> Self {
        Self {
            build_mode: config.build_mode.clone(),
            deployment_env: config.deployment_env.clone(),
            hostname: page.hostname(),
            port: page.port(),
        }
    }

    pub fn is_production_build(&self) -> bool {
        self.build_mode.trim().eq_ignore_ascii_case("production")
    }

    pub fn is_production_deployment(&self) -> bool {
        self.deployment_env.trim().eq_ignore_ascii_case("production")
    }

    pub fn is_loopback_host(&self) -> bool {
        let host = self.hostname.trim().to_ascii_lowercase();
        LOOPBACK_HOSTS.contains(&host.as_str())
    }

    pub fn is_default_port(&self) -> bool {
        DEFAULT_PORTS.contains(&self.port.trim())
    }

    /// Protected only when every signal agrees.
    pub fn is_protected(&self) -> bool {
        self.is_production_build()
            && self.is_production_deployment()
            && !self.is_loopback_host()
            && self.is_default_port()
    }
}

/// Evaluate the classifier against the live page. Not cached: each caller re-reads
/// the signals because they only exist once the page has a window.
pub fn is_protected(config: &EnvironmentConfig, page: &dyn PageContext) -> bool {
    let signals = EnvironmentSignals::observe(config, page);
    let protected = signals.is_protected();
    tracing::debug!(
        "[SENTINEL] Environment: build={}, deploy={}, host={}, port={:?} -> protected={}",
        signals.build_mode,
        signals.deployment_env,
        signals.hostname,
        signals.port,
        protected
    );
    protected
}

#[cfg(test)]
mod tests {
    use super::*;

    fn production(host: &str, port: &str) -> EnvironmentSignals {
        EnvironmentSignals {
            build_mode: "production".to_string(),
            deployment_env: "production".to_string(),
            hostname: host.to_string(),
            port: port.to_string(),
        }
    }

    #[test]
    fn production_host_on_default_port_is_protected() {
        assert!(production("vote.example.org", "").is_protected());
        assert!(production("vote.example.org", "443").is_protected());
    }

    #[test]
    fn localhost_is_never_protected() {
        assert!(!production("localhost", "").is_protected());
        assert!(!production("LOCALHOST", "443").is_protected());
        assert!(!production("127.0.0.1", "").is_protected());
    }

    #[test]
    fn non_default_port_dissents() {
        assert!(!production("vote.example.org", "5173").is_protected());
    }

    #[test]
    fn build_flags_dissent() {
        let mut dev_build = production("vote.example.org", "");
        dev_build.build_mode = "development".to_string();
        assert!(!dev_build.is_protected());

        let mut staging = production("vote.example.org", "");
        staging.deployment_env = "staging".to_string();
        assert!(!staging.is_protected());
    }
}
