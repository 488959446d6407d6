//! Configuration management
//!
//! Two layers of configuration exist:
//! - [`RunConfig`] is re-read at the start of every run. It carries the
//!   enable flag and the raw connection parameters exactly as found, so a
//!   missing value is only reported once the gate has been checked.
//! - [`BridgeSettings`] holds the tuning knobs read once at startup.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_BATCH_SIZE, DEFAULT_MAX_CONCURRENCY, DEFAULT_OPERATION_TIMEOUT,
    DEFAULT_POISON_RECEIVE_THRESHOLD, DEFAULT_RUN_INTERVAL, DEFAULT_RUN_TIMEOUT,
    DEFAULT_VISIBILITY_TIMEOUT, MAX_RECEIVE_BATCH,
};
use crate::errors::{BridgeError, Result};

/// Configuration read at the start of each run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunConfig {
    /// Run gate switch
    pub enabled: bool,
    pub connection: ConnectionConfig,
}

/// Connection parameters as read, before validation.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub source_access_key_id: Option<String>,
    pub source_secret_access_key: Option<String>,
    pub source_region: Option<String>,
    pub source_queue_url: Option<String>,
    pub source_endpoint_url: Option<String>,
    pub sink_connection_string: Option<String>,
    pub sink_queue_name: Option<String>,
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("source_access_key_id", &self.source_access_key_id)
            .field("source_secret_access_key", &redacted(&self.source_secret_access_key))
            .field("source_region", &self.source_region)
            .field("source_queue_url", &self.source_queue_url)
            .field("source_endpoint_url", &self.source_endpoint_url)
            .field("sink_connection_string", &redacted(&self.sink_connection_string))
            .field("sink_queue_name", &self.sink_queue_name)
            .finish()
    }
}

impl ConnectionConfig {
    /// Check that every required parameter is present and well formed.
    ///
    /// All missing parameters are reported together so operators can fix the
    /// environment in one pass.
    ///
    /// # Errors
    /// Returns [`BridgeError::Configuration`] when a required value is missing
    /// or blank, when only half of the static source credentials is set, or
    /// when the sink queue name is not a valid queue name.
    pub fn validate(&self) -> Result<ConnectionSettings> {
        let region = present(&self.source_region);
        let queue_url = present(&self.source_queue_url);
        let connection_string = present(&self.sink_connection_string);
        let queue_name = present(&self.sink_queue_name);

        let mut missing = Vec::new();
        if region.is_none() {
            missing.push("source.region");
        }
        if queue_url.is_none() {
            missing.push("source.queue_url");
        }
        if connection_string.is_none() {
            missing.push("sink.connection_string");
        }
        if queue_name.is_none() {
            missing.push("sink.queue_name");
        }

        let credentials = match (
            present(&self.source_access_key_id),
            present(&self.source_secret_access_key),
        ) {
            (Some(access_key_id), Some(secret_access_key)) => {
                Some(StaticCredentials { access_key_id, secret_access_key })
            }
            (None, None) => None,
            (Some(_), None) => {
                missing.push("source.secret_access_key");
                None
            }
            (None, Some(_)) => {
                missing.push("source.access_key_id");
                None
            }
        };

        // `missing` is empty exactly when every required value is present
        let (true, Some(region), Some(queue_url), Some(connection_string), Some(queue_name)) =
            (missing.is_empty(), region, queue_url, connection_string, queue_name)
        else {
            return Err(BridgeError::Configuration(format!(
                "missing required settings: {}",
                missing.join(", ")
            )));
        };

        validate_queue_name(&queue_name)?;

        Ok(ConnectionSettings {
            source: SourceSettings {
                queue_url,
                region,
                endpoint_url: present(&self.source_endpoint_url),
                credentials,
            },
            sink: SinkSettings { connection_string, queue_name },
        })
    }
}

/// Validated connection parameters for both queues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    pub source: SourceSettings,
    pub sink: SinkSettings,
}

/// Where and how to reach the source queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSettings {
    pub queue_url: String,
    pub region: String,
    /// Endpoint override for local emulators
    pub endpoint_url: Option<String>,
    /// Static credentials; `None` falls back to the default provider chain
    pub credentials: Option<StaticCredentials>,
}

/// Static key/secret pair for the source queue.
#[derive(Clone, PartialEq, Eq)]
pub struct StaticCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .finish()
    }
}

/// Where and how to reach the sink queue.
#[derive(Clone, PartialEq, Eq)]
pub struct SinkSettings {
    pub connection_string: String,
    pub queue_name: String,
}

impl fmt::Debug for SinkSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SinkSettings")
            .field("connection_string", &"<redacted>")
            .field("queue_name", &self.queue_name)
            .finish()
    }
}

/// How the worker drives runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Run on a fixed internal interval until stopped
    #[default]
    Interval,
    /// Run exactly once and exit; an external timer owns the schedule
    Once,
}

/// Startup tuning for the bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeSettings {
    pub batch_size: usize,
    pub visibility_timeout_seconds: u64,
    pub run_interval_seconds: u64,
    pub run_timeout_seconds: u64,
    pub operation_timeout_seconds: u64,
    pub max_concurrency: usize,
    pub poison_receive_threshold: u32,
    pub pid_dir: Option<String>,
    pub run_mode: RunMode,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            visibility_timeout_seconds: DEFAULT_VISIBILITY_TIMEOUT.as_secs(),
            run_interval_seconds: DEFAULT_RUN_INTERVAL.as_secs(),
            run_timeout_seconds: DEFAULT_RUN_TIMEOUT.as_secs(),
            operation_timeout_seconds: DEFAULT_OPERATION_TIMEOUT.as_secs(),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            poison_receive_threshold: DEFAULT_POISON_RECEIVE_THRESHOLD,
            pid_dir: None,
            run_mode: RunMode::Interval,
        }
    }
}

impl BridgeSettings {
    pub fn visibility_timeout(&self) -> Duration {
        Duration::from_secs(self.visibility_timeout_seconds)
    }

    pub fn run_interval(&self) -> Duration {
        Duration::from_secs(self.run_interval_seconds)
    }

    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.run_timeout_seconds)
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_seconds)
    }

    /// Reject values the transfer loop cannot honour.
    ///
    /// # Errors
    /// Returns [`BridgeError::Configuration`] for an out-of-range batch size,
    /// zero durations or a zero concurrency limit.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 || self.batch_size > MAX_RECEIVE_BATCH {
            return Err(BridgeError::Configuration(format!(
                "batch_size must be between 1 and {MAX_RECEIVE_BATCH}, got {}",
                self.batch_size
            )));
        }
        for (name, value) in [
            ("visibility_timeout_seconds", self.visibility_timeout_seconds),
            ("run_interval_seconds", self.run_interval_seconds),
            ("run_timeout_seconds", self.run_timeout_seconds),
            ("operation_timeout_seconds", self.operation_timeout_seconds),
        ] {
            if value == 0 {
                return Err(BridgeError::Configuration(format!("{name} must be greater than 0")));
            }
        }
        if self.max_concurrency == 0 {
            return Err(BridgeError::Configuration(
                "max_concurrency must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether the visibility timeout outlasts a worst-case run plus one
    /// interval, so two runs never lease the same message.
    pub fn has_safe_visibility_margin(&self) -> bool {
        self.visibility_timeout_seconds
            > self.run_timeout_seconds.saturating_add(self.run_interval_seconds)
    }
}

fn present(value: &Option<String>) -> Option<String> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

fn redacted(value: &Option<String>) -> Option<&'static str> {
    value.as_ref().map(|_| "<redacted>")
}

/// Queue names: 3-63 chars of lowercase letters, digits and single hyphens,
/// starting and ending with a letter or digit.
fn validate_queue_name(name: &str) -> Result<()> {
    let valid_chars =
        name.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    let valid_edges = name.chars().next().is_some_and(|c| c.is_ascii_alphanumeric())
        && name.chars().last().is_some_and(|c| c.is_ascii_alphanumeric());

    if (3..=63).contains(&name.len()) && valid_chars && valid_edges && !name.contains("--") {
        Ok(())
    } else {
        Err(BridgeError::Configuration(format!("invalid sink queue name: {name:?}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete() -> ConnectionConfig {
        ConnectionConfig {
            source_access_key_id: Some("AKIDEXAMPLE".into()),
            source_secret_access_key: Some("secret".into()),
            source_region: Some("us-east-1".into()),
            source_queue_url: Some("https://sqs.us-east-1.amazonaws.com/123/orders".into()),
            source_endpoint_url: None,
            sink_connection_string: Some("UseDevelopmentStorage=true".into()),
            sink_queue_name: Some("orders".into()),
        }
    }

    #[test]
    fn validate_accepts_complete_config() {
        let settings = complete().validate().unwrap();
        assert_eq!(settings.source.region, "us-east-1");
        assert_eq!(settings.sink.queue_name, "orders");
        assert!(settings.source.credentials.is_some());
    }

    #[test]
    fn validate_reports_every_missing_setting() {
        let mut config = complete();
        config.sink_connection_string = None;
        config.sink_queue_name = Some("   ".into());

        let err = config.validate().unwrap_err();
        let BridgeError::Configuration(message) = err else {
            panic!("expected configuration error");
        };
        assert!(message.contains("sink.connection_string"));
        assert!(message.contains("sink.queue_name"));
    }

    #[test]
    fn half_credential_pair_is_the_only_missing_setting_reported() {
        let mut config = complete();
        config.source_secret_access_key = None;

        let err = config.validate().unwrap_err();

        assert_eq!(
            err,
            BridgeError::Configuration(
                "missing required settings: source.secret_access_key".into()
            )
        );
    }

    #[test]
    fn validate_allows_default_credential_chain() {
        let mut config = complete();
        config.source_access_key_id = None;
        config.source_secret_access_key = None;

        let settings = config.validate().unwrap();
        assert!(settings.source.credentials.is_none());
    }

    #[test]
    fn validate_rejects_half_credentials() {
        let mut config = complete();
        config.source_secret_access_key = None;

        assert!(matches!(config.validate(), Err(BridgeError::Configuration(_))));
    }

    #[test]
    fn validate_rejects_bad_queue_names() {
        for name in ["ab", "Orders", "-orders", "orders-", "ord--ers", "ord_ers"] {
            let mut config = complete();
            config.sink_queue_name = Some(name.into());
            assert!(config.validate().is_err(), "{name} should be rejected");
        }
    }

    #[test]
    fn debug_redacts_secrets() {
        let debug = format!("{:?}", complete());
        assert!(!debug.contains("secret\""));
        assert!(!debug.contains("UseDevelopmentStorage"));

        let settings = complete().validate().unwrap();
        let debug = format!("{settings:?}");
        assert!(!debug.contains("UseDevelopmentStorage"));
    }

    #[test]
    fn default_settings_keep_safe_margin() {
        let settings = BridgeSettings::default();
        assert!(settings.validate().is_ok());
        assert!(settings.has_safe_visibility_margin());
        assert_eq!(settings.visibility_timeout(), Duration::from_secs(180));
    }

    #[test]
    fn settings_validation_rejects_oversized_batch() {
        let settings = BridgeSettings { batch_size: 11, ..Default::default() };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn settings_detect_unsafe_margin() {
        let settings = BridgeSettings {
            visibility_timeout_seconds: 60,
            run_interval_seconds: 60,
            ..Default::default()
        };
        assert!(!settings.has_safe_visibility_margin());
    }

    #[test]
    fn settings_deserialize_partial_toml() {
        let settings: BridgeSettings = toml::from_str("batch_size = 5\nrun_mode = \"once\"").unwrap();
        assert_eq!(settings.batch_size, 5);
        assert_eq!(settings.run_mode, RunMode::Once);
        assert_eq!(settings.run_interval_seconds, 60);
    }
}
