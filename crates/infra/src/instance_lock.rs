//! Single-instance lock using PID files
//!
//! Two workers draining the same source would race for the same leases, so
//! the worker refuses to start while another live process holds the lock.

use std::fs;
use std::path::{Path, PathBuf};

use queuebridge_domain::constants::PID_FILE_NAME;
use queuebridge_domain::{BridgeError, Result};

/// Single-instance lock manager
#[derive(Debug)]
pub struct InstanceLock {
    pid_file: PathBuf,
}

impl InstanceLock {
    /// Acquire the lock in `lock_dir`.
    ///
    /// A PID file left behind by a dead process is replaced.
    ///
    /// # Errors
    /// Returns [`BridgeError::Configuration`] if another live instance holds
    /// the lock, or [`BridgeError::Internal`] if the PID file cannot be
    /// written.
    pub fn acquire<P: AsRef<Path>>(lock_dir: P) -> Result<Self> {
        let pid_file = lock_dir.as_ref().join(PID_FILE_NAME);

        if pid_file.exists() {
            if let Some(pid) = read_pid(&pid_file) {
                if Self::is_process_running(pid) {
                    tracing::warn!(existing_pid = pid, "instance_lock.process_active");
                    return Err(BridgeError::Configuration(format!(
                        "Another instance is already running (PID: {pid})"
                    )));
                }
                tracing::warn!(stale_pid = pid, "instance_lock.stale_pid_file_detected");
            }
            if let Err(err) = fs::remove_file(&pid_file) {
                tracing::warn!(error = %err, path = %pid_file.display(), "instance_lock.remove_stale_pid_failed");
            }
        }

        let current_pid = std::process::id();
        fs::write(&pid_file, current_pid.to_string())
            .map_err(|e| BridgeError::Internal(format!("Failed to create PID file: {e}")))?;

        tracing::info!(pid = current_pid, path = %pid_file.display(), "instance_lock.acquired");

        Ok(Self { pid_file })
    }

    pub fn path(&self) -> &Path {
        &self.pid_file
    }

    #[cfg(target_os = "linux")]
    fn is_process_running(pid: u32) -> bool {
        Path::new("/proc").join(pid.to_string()).exists()
    }

    #[cfg(all(unix, not(target_os = "linux")))]
    fn is_process_running(pid: u32) -> bool {
        use std::process::Command;

        // `kill -0` checks for existence without delivering a signal
        Command::new("kill")
            .arg("-0")
            .arg(pid.to_string())
            .output()
            .map(|output| output.status.success())
            .unwrap_or(false)
    }

    #[cfg(not(unix))]
    fn is_process_running(pid: u32) -> bool {
        tracing::warn!(pid = pid, "instance_lock.process_check_unsupported");
        false
    }
}

fn read_pid(path: &Path) -> Option<u32> {
    fs::read_to_string(path).ok()?.trim().parse().ok()
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.pid_file) {
            tracing::warn!(error = %e, path = %self.pid_file.display(), "instance_lock.remove_pid_failed");
        } else {
            tracing::info!(path = %self.pid_file.display(), "instance_lock.released");
        }
    }
}
