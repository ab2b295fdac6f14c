//! # Operator Configuration
//!
//! Process-wide settings parsed from command-line flags, each with an
//! environment variable fallback. The parsed value is validated once at
//! startup and then shared read-only by both reconcilers.

use crate::constants::{
    DEFAULT_API_URL, DEFAULT_BACKOFF_MAX_SECS, DEFAULT_BACKOFF_MIN_SECS, DEFAULT_METRICS_PORT,
    DEFAULT_REQUEUE_DELAY_SECS, DEFAULT_RESYNC_INTERVAL_SECS,
};
use clap::Parser;
use std::time::Duration;
use zeroize::Zeroizing;

/// Configuration errors reported before any controller starts
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("PagerDuty API key is required (--api-key or PAGERDUTY_API_KEY)")]
    MissingApiKey,
    #[error("PagerDuty ruleset ID is required (--ruleset or PAGERDUTY_RULESET_ID)")]
    MissingRuleset,
    #[error("backoff minimum ({min}s) must be positive and not exceed the maximum ({max}s)")]
    InvalidBackoff { min: u64, max: u64 },
}

/// Operator configuration
#[derive(Clone, Parser)]
#[command(name = "pagerduty-operator", version, about)]
pub struct OperatorConfig {
    /// PagerDuty REST API token
    #[arg(long = "api-key", env = "PAGERDUTY_API_KEY", default_value = "", hide_env_values = true)]
    pub api_key: Zeroizing<String>,

    /// Shared ruleset that receives one routing rule per PagerdutyService
    #[arg(long = "ruleset", env = "PAGERDUTY_RULESET_ID", default_value = "")]
    pub ruleset_id: String,

    /// Prefix prepended to every generated remote service name
    #[arg(long, env = "PAGERDUTY_SERVICE_PREFIX", default_value = "")]
    pub service_prefix: String,

    /// Length of the random alphanumeric suffix on service names (0 disables)
    #[arg(long, env = "PAGERDUTY_SERVICE_SUFFIX_LENGTH", default_value_t = 0)]
    pub service_suffix_length: usize,

    /// PagerDuty REST base URL
    #[arg(long, env = "PAGERDUTY_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Port for /metrics, /healthz and /readyz
    #[arg(long, env = "METRICS_PORT", default_value_t = DEFAULT_METRICS_PORT)]
    pub metrics_port: u16,

    /// Fixed requeue delay when required configuration is unresolvable
    #[arg(long, env = "REQUEUE_DELAY_SECS", default_value_t = DEFAULT_REQUEUE_DELAY_SECS)]
    pub requeue_delay_secs: u64,

    /// Periodic resync after a successful reconcile (0 waits for the next change)
    #[arg(long, env = "RESYNC_INTERVAL_SECS", default_value_t = DEFAULT_RESYNC_INTERVAL_SECS)]
    pub resync_interval_secs: u64,

    #[arg(long, env = "BACKOFF_MIN_SECS", default_value_t = DEFAULT_BACKOFF_MIN_SECS)]
    pub backoff_min_secs: u64,

    #[arg(long, env = "BACKOFF_MAX_SECS", default_value_t = DEFAULT_BACKOFF_MAX_SECS)]
    pub backoff_max_secs: u64,

    /// Restrict the watch to a single namespace
    #[arg(long, env = "WATCH_NAMESPACE")]
    pub watch_namespace: Option<String>,

    /// Run only the PagerdutyService controller
    #[arg(long, env = "DISABLE_RULESET_CONTROLLER", default_value_t = false)]
    pub disable_ruleset_controller: bool,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            api_key: Zeroizing::new(String::new()),
            ruleset_id: String::new(),
            service_prefix: String::new(),
            service_suffix_length: 0,
            api_url: DEFAULT_API_URL.to_string(),
            metrics_port: DEFAULT_METRICS_PORT,
            requeue_delay_secs: DEFAULT_REQUEUE_DELAY_SECS,
            resync_interval_secs: DEFAULT_RESYNC_INTERVAL_SECS,
            backoff_min_secs: DEFAULT_BACKOFF_MIN_SECS,
            backoff_max_secs: DEFAULT_BACKOFF_MAX_SECS,
            watch_namespace: None,
            disable_ruleset_controller: false,
        }
    }
}

impl std::fmt::Debug for OperatorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperatorConfig")
            .field("api_key", &"***")
            .field("ruleset_id", &self.ruleset_id)
            .field("service_prefix", &self.service_prefix)
            .field("service_suffix_length", &self.service_suffix_length)
            .field("api_url", &self.api_url)
            .field("metrics_port", &self.metrics_port)
            .field("requeue_delay_secs", &self.requeue_delay_secs)
            .field("resync_interval_secs", &self.resync_interval_secs)
            .field("backoff_min_secs", &self.backoff_min_secs)
            .field("backoff_max_secs", &self.backoff_max_secs)
            .field("watch_namespace", &self.watch_namespace)
            .field("disable_ruleset_controller", &self.disable_ruleset_controller)
            .finish()
    }
}

impl OperatorConfig {
    /// Fail fast on settings the operator cannot run without
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        if self.ruleset_id.trim().is_empty() {
            return Err(ConfigError::MissingRuleset);
        }
        if self.backoff_min_secs == 0 || self.backoff_min_secs > self.backoff_max_secs {
            return Err(ConfigError::InvalidBackoff {
                min: self.backoff_min_secs,
                max: self.backoff_max_secs,
            });
        }
        Ok(())
    }

    pub fn requeue_delay(&self) -> Duration {
        Duration::from_secs(self.requeue_delay_secs)
    }

    /// `None` means "wait for the next change" instead of a timed resync
    pub fn resync_interval(&self) -> Option<Duration> {
        (self.resync_interval_secs > 0).then(|| Duration::from_secs(self.resync_interval_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> OperatorConfig {
        OperatorConfig {
            api_key: Zeroizing::new("token".to_string()),
            ruleset_id: "WJGIH".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_validate_accepts_required_settings() {
        assert_eq!(valid().validate(), Ok(()));
    }

    #[test]
    fn test_validate_rejects_missing_api_key() {
        let config = OperatorConfig {
            api_key: Zeroizing::new("  ".to_string()),
            ..valid()
        };
        assert_eq!(config.validate(), Err(ConfigError::MissingApiKey));
    }

    #[test]
    fn test_validate_rejects_missing_ruleset() {
        let config = OperatorConfig {
            ruleset_id: String::new(),
            ..valid()
        };
        assert_eq!(config.validate(), Err(ConfigError::MissingRuleset));
    }

    #[test]
    fn test_validate_rejects_inverted_backoff() {
        let config = OperatorConfig {
            backoff_min_secs: 60,
            backoff_max_secs: 10,
            ..valid()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidBackoff { min: 60, max: 10 })
        );
    }

    #[test]
    fn test_parse_flags() {
        let config = OperatorConfig::try_parse_from([
            "pagerduty-operator",
            "--api-key",
            "secret-token",
            "--ruleset",
            "WJGIH",
            "--service-prefix",
            "whatever",
            "--service-suffix-length",
            "4",
            "--resync-interval-secs",
            "0",
        ])
        .unwrap();

        assert_eq!(config.api_key.as_str(), "secret-token");
        assert_eq!(config.ruleset_id, "WJGIH");
        assert_eq!(config.service_prefix, "whatever");
        assert_eq!(config.service_suffix_length, 4);
        assert_eq!(config.resync_interval(), None);
        assert_eq!(config.requeue_delay(), Duration::from_secs(30));
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let rendered = format!("{:?}", valid());
        assert!(!rendered.contains("token\""));
        assert!(rendered.contains("***"));
    }
}
