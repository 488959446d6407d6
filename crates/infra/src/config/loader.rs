//! Startup settings loader
//!
//! Loads [`BridgeSettings`] once when the worker starts.
//!
//! ## Loading Strategy
//! 1. Start from a config file if one is found, otherwise from defaults
//! 2. Apply any `QUEUEBRIDGE_*` environment overrides on top
//! 3. Validate the result
//!
//! ## Environment Variables
//! - `QUEUEBRIDGE_CONFIG`: Explicit config file path
//! - `QUEUEBRIDGE_BATCH_SIZE`: Messages per receive (1-10)
//! - `QUEUEBRIDGE_VISIBILITY_TIMEOUT_SECONDS`: Lease taken on received messages
//! - `QUEUEBRIDGE_RUN_INTERVAL_SECONDS`: Time between scheduled runs
//! - `QUEUEBRIDGE_RUN_TIMEOUT_SECONDS`: Deadline for one whole run
//! - `QUEUEBRIDGE_OPERATION_TIMEOUT_SECONDS`: Deadline for each queue call
//! - `QUEUEBRIDGE_MAX_CONCURRENCY`: Messages relayed in parallel
//! - `QUEUEBRIDGE_POISON_RECEIVE_THRESHOLD`: Receive count that flags a poison candidate
//! - `QUEUEBRIDGE_PID_DIR`: Directory for the PID file
//! - `QUEUEBRIDGE_RUN_MODE`: `interval` or `once`
//!
//! ## File Locations
//! The loader searches the following paths (in order):
//! 1. `./queuebridge.toml` or `./queuebridge.json` (current working directory)
//! 2. `./config.toml` or `./config.json` (current working directory)
//! 3. The same names next to the executable

use std::path::{Path, PathBuf};
use std::str::FromStr;

use queuebridge_domain::{BridgeError, BridgeSettings, Result, RunMode};

const CONFIG_PATH_VAR: &str = "QUEUEBRIDGE_CONFIG";
const CONFIG_FILE_NAMES: [&str; 4] =
    ["queuebridge.toml", "queuebridge.json", "config.toml", "config.json"];

/// Load startup settings: file (if any), then environment overrides.
///
/// # Errors
/// Returns [`BridgeError::Configuration`] if:
/// - `QUEUEBRIDGE_CONFIG` names a file that does not exist
/// - The file format is invalid
/// - An environment override cannot be parsed
/// - The merged settings fail validation
pub fn load_settings() -> Result<BridgeSettings> {
    let explicit = std::env::var(CONFIG_PATH_VAR).ok().map(PathBuf::from);
    let base = match explicit.or_else(search_config_paths) {
        Some(path) => load_from_file(&path)?,
        None => {
            tracing::debug!("No config file found, starting from defaults");
            BridgeSettings::default()
        }
    };

    let settings = apply_env_overrides(base)?;
    settings.validate()?;
    Ok(settings)
}

/// Load settings from a file.
///
/// Supports both JSON and TOML (detected by file extension). Missing fields
/// take their default values.
///
/// # Errors
/// Returns [`BridgeError::Configuration`] if the file is missing, unreadable
/// or malformed.
pub fn load_from_file(path: &Path) -> Result<BridgeSettings> {
    if !path.exists() {
        return Err(BridgeError::Configuration(format!(
            "Config file not found: {}",
            path.display()
        )));
    }

    tracing::info!(path = %path.display(), "Loading settings from file");

    let contents = std::fs::read_to_string(path)
        .map_err(|e| BridgeError::Configuration(format!("Failed to read config file: {e}")))?;

    parse_settings(&contents, path)
}

fn parse_settings(contents: &str, path: &Path) -> Result<BridgeSettings> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| BridgeError::Configuration(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| BridgeError::Configuration(format!("Invalid JSON format: {e}"))),
        _ => Err(BridgeError::Configuration(format!("Unsupported config format: {extension}"))),
    }
}

/// Overlay `QUEUEBRIDGE_*` tunables onto `settings`.
///
/// # Errors
/// Returns [`BridgeError::Configuration`] naming the first variable that
/// does not parse.
pub fn apply_env_overrides(mut settings: BridgeSettings) -> Result<BridgeSettings> {
    if let Some(value) = env_parse("QUEUEBRIDGE_BATCH_SIZE")? {
        settings.batch_size = value;
    }
    if let Some(value) = env_parse("QUEUEBRIDGE_VISIBILITY_TIMEOUT_SECONDS")? {
        settings.visibility_timeout_seconds = value;
    }
    if let Some(value) = env_parse("QUEUEBRIDGE_RUN_INTERVAL_SECONDS")? {
        settings.run_interval_seconds = value;
    }
    if let Some(value) = env_parse("QUEUEBRIDGE_RUN_TIMEOUT_SECONDS")? {
        settings.run_timeout_seconds = value;
    }
    if let Some(value) = env_parse("QUEUEBRIDGE_OPERATION_TIMEOUT_SECONDS")? {
        settings.operation_timeout_seconds = value;
    }
    if let Some(value) = env_parse("QUEUEBRIDGE_MAX_CONCURRENCY")? {
        settings.max_concurrency = value;
    }
    if let Some(value) = env_parse("QUEUEBRIDGE_POISON_RECEIVE_THRESHOLD")? {
        settings.poison_receive_threshold = value;
    }
    if let Some(dir) = env_string("QUEUEBRIDGE_PID_DIR") {
        settings.pid_dir = Some(dir);
    }
    if let Some(mode) = env_string("QUEUEBRIDGE_RUN_MODE") {
        settings.run_mode = parse_run_mode(&mode)?;
    }
    Ok(settings)
}

fn parse_run_mode(raw: &str) -> Result<RunMode> {
    match raw.to_ascii_lowercase().as_str() {
        "interval" => Ok(RunMode::Interval),
        "once" => Ok(RunMode::Once),
        other => Err(BridgeError::Configuration(format!(
            "Invalid QUEUEBRIDGE_RUN_MODE: {other} (expected interval or once)"
        ))),
    }
}

/// Probe standard locations for a settings file.
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn search_config_paths() -> Option<PathBuf> {
    let mut dirs = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        dirs.push(cwd);
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            dirs.push(exe_dir.to_path_buf());
        }
    }

    dirs.iter()
        .flat_map(|dir| CONFIG_FILE_NAMES.iter().map(move |name| dir.join(name)))
        .find(|path| path.exists())
}

/// Read an optional environment variable, treating blank values as unset.
pub(crate) fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
pub(crate) fn env_bool(key: &str, default: bool) -> bool {
    env_string(key)
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}

fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    env_string(key)
        .map(|raw| {
            raw.parse::<T>()
                .map_err(|e| BridgeError::Configuration(format!("Invalid {key}: {e}")))
        })
        .transpose()
}
