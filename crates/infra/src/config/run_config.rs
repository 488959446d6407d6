//! Per-run configuration read from the process environment.
//!
//! Read fresh at the start of every run so toggling `QUEUEBRIDGE_ENABLED` or
//! rotating a credential takes effect on the next tick without a restart.
//! Reading never fails; missing values are reported by validation inside
//! the run, after the gate check.

use queuebridge_core::RunConfigSource;
use queuebridge_domain::{ConnectionConfig, RunConfig};

use super::loader::{env_bool, env_string};

pub const ENABLED_VAR: &str = "QUEUEBRIDGE_ENABLED";
pub const SOURCE_ACCESS_KEY_ID_VAR: &str = "QUEUEBRIDGE_SOURCE_ACCESS_KEY_ID";
pub const SOURCE_SECRET_ACCESS_KEY_VAR: &str = "QUEUEBRIDGE_SOURCE_SECRET_ACCESS_KEY";
pub const SOURCE_REGION_VAR: &str = "QUEUEBRIDGE_SOURCE_REGION";
pub const SOURCE_QUEUE_URL_VAR: &str = "QUEUEBRIDGE_SOURCE_QUEUE_URL";
pub const SOURCE_ENDPOINT_URL_VAR: &str = "QUEUEBRIDGE_SOURCE_ENDPOINT_URL";
pub const SINK_CONNECTION_STRING_VAR: &str = "QUEUEBRIDGE_SINK_CONNECTION_STRING";
pub const SINK_QUEUE_NAME_VAR: &str = "QUEUEBRIDGE_SINK_QUEUE_NAME";

/// Snapshot the run configuration from environment variables.
pub fn load_run_config() -> RunConfig {
    RunConfig {
        enabled: env_bool(ENABLED_VAR, false),
        connection: ConnectionConfig {
            source_access_key_id: env_string(SOURCE_ACCESS_KEY_ID_VAR),
            source_secret_access_key: env_string(SOURCE_SECRET_ACCESS_KEY_VAR),
            source_region: env_string(SOURCE_REGION_VAR),
            source_queue_url: env_string(SOURCE_QUEUE_URL_VAR),
            source_endpoint_url: env_string(SOURCE_ENDPOINT_URL_VAR),
            sink_connection_string: env_string(SINK_CONNECTION_STRING_VAR),
            sink_queue_name: env_string(SINK_QUEUE_NAME_VAR),
        },
    }
}

/// [`RunConfigSource`] backed by the process environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvRunConfigSource;

impl RunConfigSource for EnvRunConfigSource {
    fn load(&self) -> RunConfig {
        load_run_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::loader::tests::ENV_LOCK;

    const ALL_VARS: [&str; 8] = [
        ENABLED_VAR,
        SOURCE_ACCESS_KEY_ID_VAR,
        SOURCE_SECRET_ACCESS_KEY_VAR,
        SOURCE_REGION_VAR,
        SOURCE_QUEUE_URL_VAR,
        SOURCE_ENDPOINT_URL_VAR,
        SINK_CONNECTION_STRING_VAR,
        SINK_QUEUE_NAME_VAR,
    ];

    fn clear() {
        for key in ALL_VARS {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn gate_defaults_to_disabled() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear();

        let config = EnvRunConfigSource.load();

        assert!(!config.enabled);
        assert!(config.connection.sink_connection_string.is_none());
    }

    #[test]
    fn reads_every_variable() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear();

        std::env::set_var(ENABLED_VAR, "yes");
        std::env::set_var(SOURCE_REGION_VAR, "eu-west-1");
        std::env::set_var(SOURCE_QUEUE_URL_VAR, "https://sqs.eu-west-1.amazonaws.com/1/orders");
        std::env::set_var(SINK_CONNECTION_STRING_VAR, "UseDevelopmentStorage=true");
        std::env::set_var(SINK_QUEUE_NAME_VAR, "orders");
        std::env::set_var(SOURCE_ENDPOINT_URL_VAR, "   ");

        let config = load_run_config();

        assert!(config.enabled);
        assert_eq!(config.connection.source_region.as_deref(), Some("eu-west-1"));
        assert_eq!(config.connection.sink_queue_name.as_deref(), Some("orders"));
        assert!(config.connection.source_endpoint_url.is_none(), "blank means unset");
        assert!(config.connection.validate().is_ok());

        clear();
    }

    #[test]
    fn each_load_sees_current_environment() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear();

        std::env::set_var(ENABLED_VAR, "true");
        assert!(EnvRunConfigSource.load().enabled);

        std::env::set_var(ENABLED_VAR, "false");
        assert!(!EnvRunConfigSource.load().enabled);

        clear();
    }
}
