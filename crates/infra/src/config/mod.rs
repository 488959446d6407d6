//! Configuration loading
//!
//! Startup settings come from a file and/or environment variables once; the
//! per-run configuration is re-read from the environment on every tick.

pub mod loader;
pub mod run_config;

// Re-export commonly used items
pub use loader::{apply_env_overrides, load_from_file, load_settings, search_config_paths};
pub use run_config::{load_run_config, EnvRunConfigSource};
