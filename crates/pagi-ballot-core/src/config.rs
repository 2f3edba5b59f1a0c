//! PAGI Ballot configuration.
//!
//! Precedence: built-in defaults < TOML file (`PAGI_BALLOT_CONFIG`, default
//! `config/ballot.toml`) < environment (`PAGI_BALLOT__MONITOR__SIZE_THRESHOLD_PX=200`).
//!
//! | Section | Field | Default |
//! |---------|-------|---------|
//! | monitor | size_threshold_px | 160 |
//! | monitor | timing_threshold_ms | 1 |
//! | monitor | size_poll_ms / timing_poll_ms | 500 / 1000 |
//! | monitor | warning_duration_ms | 5000 |
//! | monitor | escalation_delay_ms | 2000 |
//! | monitor | violation_log_capacity | 10 |
//! | auth | api_base_url | http://127.0.0.1:8000 |
//! | storage | path | ./data/ballot_store |

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;

const DEFAULT_CONFIG_PATH: &str = "config/ballot";

/// Route the escalation policy navigates to.
pub const SECURITY_VIOLATION_ROUTE: &str = "/security-violation";

fn default_size_threshold_px() -> u32 {
    160
}
fn default_timing_threshold_ms() -> f64 {
    1.0
}
fn default_size_poll_ms() -> u64 {
    500
}
fn default_timing_poll_ms() -> u64 {
    1000
}
fn default_warning_duration_ms() -> u64 {
    5000
}
fn default_escalation_delay_ms() -> u64 {
    2000
}
fn default_banner_delay_ms() -> u64 {
    1000
}
fn default_console_clear_interval_ms() -> u64 {
    1000
}
fn default_violation_log_capacity() -> usize {
    10
}
fn default_guard_markers() -> Vec<String> {
    vec!["/vote".to_string()]
}
fn default_escalation_markers() -> Vec<String> {
    vec!["/vote".to_string(), "/admin".to_string()]
}
fn default_violation_route() -> String {
    SECURITY_VIOLATION_ROUTE.to_string()
}
fn default_build_mode() -> String {
    "production".to_string()
}
fn default_deployment_env() -> String {
    "production".to_string()
}
fn default_api_base_url() -> String {
    "http://127.0.0.1:8000".to_string()
}
fn default_request_timeout_ms() -> u64 {
    10_000
}
fn default_admin_identifier() -> String {
    "admin@pagi.vote".to_string()
}
fn default_admin_secret() -> String {
    "ballot-admin".to_string()
}
fn default_admin_challenge() -> String {
    "123456".to_string()
}
fn default_admin_role() -> String {
    "super_admin".to_string()
}
fn default_admin_permissions() -> Vec<String> {
    [
        "manage_elections",
        "manage_candidates",
        "manage_voters",
        "view_results",
        "view_audit_logs",
    ]
    .iter()
    .map(|p| p.to_string())
    .collect()
}
fn default_storage_path() -> String {
    "./data/ballot_store".to_string()
}

/// Detector thresholds, periods, and escalation routing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Outer-vs-inner window difference (logical px) above which tools count as open.
    #[serde(default = "default_size_threshold_px")]
    pub size_threshold_px: u32,
    /// Console-clear duration (ms) above which tools count as open.
    #[serde(default = "default_timing_threshold_ms")]
    pub timing_threshold_ms: f64,
    #[serde(default = "default_size_poll_ms")]
    pub size_poll_ms: u64,
    #[serde(default = "default_timing_poll_ms")]
    pub timing_poll_ms: u64,
    #[serde(default = "default_warning_duration_ms")]
    pub warning_duration_ms: u64,
    #[serde(default = "default_escalation_delay_ms")]
    pub escalation_delay_ms: u64,
    /// Delay before the console banner is written through the original channel.
    #[serde(default = "default_banner_delay_ms")]
    pub banner_delay_ms: u64,
    #[serde(default = "default_console_clear_interval_ms")]
    pub console_clear_interval_ms: u64,
    #[serde(default = "default_violation_log_capacity")]
    pub violation_log_capacity: usize,
    /// Route markers on which select-all is treated as a forbidden shortcut.
    #[serde(default = "default_guard_markers")]
    pub guard_route_markers: Vec<String>,
    /// Route markers on which a violation escalates to the violation page.
    #[serde(default = "default_escalation_markers")]
    pub escalation_route_markers: Vec<String>,
    #[serde(default = "default_violation_route")]
    pub violation_route: String,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            size_threshold_px: default_size_threshold_px(),
            timing_threshold_ms: default_timing_threshold_ms(),
            size_poll_ms: default_size_poll_ms(),
            timing_poll_ms: default_timing_poll_ms(),
            warning_duration_ms: default_warning_duration_ms(),
            escalation_delay_ms: default_escalation_delay_ms(),
            banner_delay_ms: default_banner_delay_ms(),
            console_clear_interval_ms: default_console_clear_interval_ms(),
            violation_log_capacity: default_violation_log_capacity(),
            guard_route_markers: default_guard_markers(),
            escalation_route_markers: default_escalation_markers(),
            violation_route: default_violation_route(),
        }
    }
}

impl MonitorConfig {
    pub fn size_poll_interval(&self) -> Duration {
        Duration::from_millis(self.size_poll_ms)
    }

    pub fn timing_poll_interval(&self) -> Duration {
        Duration::from_millis(self.timing_poll_ms)
    }

    pub fn timing_threshold(&self) -> Duration {
        // Values too large for a Duration never trip the heuristic.
        Duration::try_from_secs_f64(self.timing_threshold_ms.max(0.0) / 1000.0)
            .unwrap_or(Duration::MAX)
    }

    pub fn warning_duration(&self) -> Duration {
        Duration::from_millis(self.warning_duration_ms)
    }

    pub fn escalation_delay(&self) -> Duration {
        Duration::from_millis(self.escalation_delay_ms)
    }

    pub fn banner_delay(&self) -> Duration {
        Duration::from_millis(self.banner_delay_ms)
    }

    pub fn console_clear_interval(&self) -> Duration {
        Duration::from_millis(self.console_clear_interval_ms)
    }
}

/// Build-time and deployment flags fed to the environment classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    /// "production" or "development".
    #[serde(default = "default_build_mode")]
    pub build_mode: String,
    /// Deployment environment name; only "production" counts as production-like.
    #[serde(default = "default_deployment_env")]
    pub deployment_env: String,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            build_mode: default_build_mode(),
            deployment_env: default_deployment_env(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Base URL the `/api/auth/*` paths are joined onto.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl AuthConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Fixed credential triple and grant for the administrative login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    #[serde(default = "default_admin_identifier")]
    pub identifier: String,
    #[serde(default = "default_admin_secret")]
    pub secret: String,
    /// One-time challenge code the admin must also supply.
    #[serde(default = "default_admin_challenge")]
    pub challenge_code: String,
    #[serde(default = "default_admin_role")]
    pub role: String,
    #[serde(default = "default_admin_permissions")]
    pub permissions: Vec<String>,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            identifier: default_admin_identifier(),
            secret: default_admin_secret(),
            challenge_code: default_admin_challenge(),
            role: default_admin_role(),
            permissions: default_admin_permissions(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Sled directory standing in for origin-scoped browser storage.
    #[serde(default = "default_storage_path")]
    pub path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BallotConfig {
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub environment: EnvironmentConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub admin: AdminConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

impl BallotConfig {
    /// Load config from file and environment. Env `PAGI_BALLOT_CONFIG` path > `config/ballot.toml` > defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var("PAGI_BALLOT_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(Path::new(&config_path))
    }

    /// Load from an explicit file (skipped when missing), then environment overrides.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let builder = config::Config::builder();
        let builder = if path.exists() || path.with_extension("toml").exists() {
            builder.add_source(config::File::from(path).required(false))
        } else {
            builder
        };

        let built = builder
            .add_source(config::Environment::with_prefix("PAGI_BALLOT").separator("__"))
            .build()?;

        let cfg: BallotConfig = built.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.monitor.violation_log_capacity == 0 {
            return Err(ConfigError::Invalid(
                "monitor.violation_log_capacity must be at least 1".to_string(),
            ));
        }
        if self.monitor.size_poll_ms == 0 || self.monitor.timing_poll_ms == 0 {
            return Err(ConfigError::Invalid(
                "monitor poll periods must be non-zero".to_string(),
            ));
        }
        if self.monitor.console_clear_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "monitor.console_clear_interval_ms must be non-zero".to_string(),
            ));
        }
        let threshold = self.monitor.timing_threshold_ms;
        if !threshold.is_finite() || threshold < 0.0 || threshold / 1000.0 > u64::MAX as f64 {
            return Err(ConfigError::Invalid(format!(
                "monitor.timing_threshold_ms must be a finite, non-negative duration, got {}",
                threshold
            )));
        }
        if !self.monitor.violation_route.starts_with('/') {
            return Err(ConfigError::Invalid(format!(
                "monitor.violation_route must be an absolute path, got {}",
                self.monitor.violation_route
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_constants() {
        let cfg = BallotConfig::default();
        assert_eq!(cfg.monitor.size_threshold_px, 160);
        assert_eq!(cfg.monitor.timing_threshold(), Duration::from_millis(1));
        assert_eq!(cfg.monitor.size_poll_interval(), Duration::from_millis(500));
        assert_eq!(cfg.monitor.timing_poll_interval(), Duration::from_millis(1000));
        assert_eq!(cfg.monitor.warning_duration(), Duration::from_secs(5));
        assert_eq!(cfg.monitor.escalation_delay(), Duration::from_secs(2));
        assert_eq!(cfg.monitor.violation_log_capacity, 10);
        assert_eq!(cfg.monitor.violation_route, SECURITY_VIOLATION_ROUTE);
    }

    #[test]
    fn toml_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ballot.toml");
        std::fs::write(
            &path,
            "[monitor]\nsize_threshold_px = 200\n\n[auth]\napi_base_url = \"http://votes.example\"\n",
        )
        .unwrap();

        let cfg = BallotConfig::load_from(&path).unwrap();
        assert_eq!(cfg.monitor.size_threshold_px, 200);
        assert_eq!(cfg.monitor.timing_poll_ms, 1000);
        assert_eq!(cfg.auth.api_base_url, "http://votes.example");
        assert_eq!(cfg.admin.role, "super_admin");
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ballot.toml");
        std::fs::write(&path, "[monitor]\nviolation_log_capacity = 0\n").unwrap();

        let err = BallotConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn zero_console_clear_interval_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ballot.toml");
        std::fs::write(&path, "[monitor]\nconsole_clear_interval_ms = 0\n").unwrap();

        let err = BallotConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(ref m) if m.contains("console_clear_interval_ms")));
    }

    #[test]
    fn unusable_timing_threshold_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ballot.toml");
        for value in ["inf", "nan", "-1.0"] {
            std::fs::write(&path, format!("[monitor]\ntiming_threshold_ms = {}\n", value)).unwrap();
            let err = BallotConfig::load_from(&path).unwrap_err();
            assert!(
                matches!(err, ConfigError::Invalid(ref m) if m.contains("timing_threshold_ms")),
                "{}",
                value
            );
        }

        std::fs::write(&path, "[monitor]\ntiming_threshold_ms = 2.5\n").unwrap();
        let cfg = BallotConfig::load_from(&path).unwrap();
        let threshold = cfg.monitor.timing_threshold();
        assert!(threshold > Duration::from_millis(2) && threshold < Duration::from_millis(3));
        assert_eq!(
            MonitorConfig {
                timing_threshold_ms: f64::INFINITY,
                ..Default::default()
            }
            .timing_threshold(),
            Duration::MAX
        );
    }
}
