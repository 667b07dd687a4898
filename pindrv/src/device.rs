//! Device entry registration.
//!
//! The externally visible, writable file through which commands reach the
//! controller. Registration yields a token whose lifetime is strictly
//! nested inside the pin set's: created after acquisition succeeds,
//! destroyed before release.

use pindrv_common::error::RegistrationError;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Proof of a live device entry. Held by the lifecycle controller while
/// the entry exists.
#[derive(Debug)]
pub struct DeviceToken {
    path: PathBuf,
}

impl DeviceToken {
    /// Create a token for an entry at `path`.
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Filesystem path of the device entry.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Creates and removes the externally visible device entry.
pub trait DeviceRegistrar: Send {
    /// Create the device entry under `name`.
    ///
    /// # Errors
    /// Returns `RegistrationError` if the entry cannot be created; the
    /// caller rolls back pin acquisition.
    fn register(&mut self, name: &str) -> Result<DeviceToken, RegistrationError>;

    /// Remove the device entry. Best effort: failures are logged, never
    /// surfaced (teardown always succeeds from the host's perspective).
    fn deregister(&mut self, token: DeviceToken);
}

/// Registrar exposing the device as a named FIFO under a configured
/// directory. User processes write commands with plain `echo N > path`.
pub struct FifoRegistrar {
    dir: PathBuf,
}

impl FifoRegistrar {
    /// Create a registrar rooted at `dir`.
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }
}

impl DeviceRegistrar for FifoRegistrar {
    fn register(&mut self, name: &str) -> Result<DeviceToken, RegistrationError> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| RegistrationError::Io(format!("create {:?}: {}", self.dir, e)))?;

        let path = self.dir.join(name);
        if path.exists() {
            return Err(RegistrationError::AlreadyExists {
                path: path.display().to_string(),
            });
        }

        // World-writable so unprivileged processes can send commands.
        let mode = nix::sys::stat::Mode::from_bits_truncate(0o622);
        nix::unistd::mkfifo(&path, mode)
            .map_err(|e| RegistrationError::Io(format!("mkfifo {:?}: {}", path, e)))?;

        info!("Device entry created at {:?}", path);
        Ok(DeviceToken::new(path))
    }

    fn deregister(&mut self, token: DeviceToken) {
        match fs::remove_file(token.path()) {
            Ok(()) => info!("Device entry removed at {:?}", token.path()),
            Err(e) => warn!("Failed to remove device entry {:?}: {}", token.path(), e),
        }
    }
}
