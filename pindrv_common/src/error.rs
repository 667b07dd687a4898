//! Error types for driver operations.
//!
//! Nothing in this taxonomy is retried automatically: acquisition and
//! registration failures are rolled back by the lifecycle controller,
//! write failures are surfaced to the caller who may retry.

use thiserror::Error;

/// A named output line could not be obtained during probe.
///
/// Always triggers full rollback of any partially acquired pin set.
#[derive(Debug, Clone, Error)]
pub enum AcquireError {
    /// The line is missing, already owned, or the hardware reported a fault.
    #[error("Failed to acquire output line '{line}': {cause}")]
    LineUnavailable {
        /// Name the line was requested under (e.g. "led0", "en")
        line: String,
        /// Backend-reported cause
        cause: String,
    },
}

/// The device entry could not be created after pins were acquired.
#[derive(Debug, Clone, Error)]
pub enum RegistrationError {
    /// An entry with this name already exists.
    #[error("Device entry already exists: {path}")]
    AlreadyExists {
        /// Path of the conflicting entry
        path: String,
    },

    /// Entry creation failed at the filesystem level.
    #[error("Failed to create device entry: {0}")]
    Io(String),
}

/// Selector could not be encoded into a one-hot bitmask.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    /// Selector outside `[0, pin_count)`.
    #[error("Selector {selector} out of range for {pin_count} output lines")]
    OutOfRange {
        /// Requested selector
        selector: u8,
        /// Number of output lines in the set
        pin_count: usize,
    },
}

/// A bitmask write failed on the underlying hardware.
///
/// Acquisition state of the pin set is unaffected; the caller may retry.
#[derive(Debug, Clone, Error)]
#[error("Hardware write failed on line '{line}': {cause}")]
pub struct HardwareWriteError {
    /// Name of the line that failed
    pub line: String,
    /// Backend-reported cause
    pub cause: String,
}

/// Errors surfaced to the write caller. None of these change driver state.
#[derive(Debug, Clone, Error)]
pub enum WriteError {
    /// Partial/offset writes are not supported; offset must be exactly 0.
    #[error("Nonzero write offset {0} is not supported")]
    UnsupportedOffset(u64),

    /// Payload is not a decimal unsigned integer in `[0, 255]`.
    #[error("Write payload is not a decimal byte")]
    InvalidInput,

    /// Parsed selector outside the pin set.
    #[error(transparent)]
    SelectorOutOfRange(#[from] EncodeError),

    /// Underlying bitmask write failed.
    #[error(transparent)]
    Hardware(#[from] HardwareWriteError),

    /// The device variant defines no write protocol (LCD).
    #[error("No write protocol is defined for this device variant")]
    UnsupportedVariant,

    /// The controller is not in the Registered state.
    #[error("Device is not registered")]
    NotRegistered,
}

/// Top-level driver error, surfaced to the host by probe and the binary.
#[derive(Debug, Clone, Error)]
pub enum DriverError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pin acquisition failed
    #[error(transparent)]
    Acquire(#[from] AcquireError),

    /// Device entry registration failed
    #[error(transparent)]
    Registration(#[from] RegistrationError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_error_names_the_line() {
        let err = AcquireError::LineUnavailable {
            line: "en".to_string(),
            cause: "busy".to_string(),
        };
        assert!(err.to_string().contains("'en'"));
        assert!(err.to_string().contains("busy"));
    }

    #[test]
    fn encode_error_carries_bounds() {
        let err = EncodeError::OutOfRange {
            selector: 5,
            pin_count: 3,
        };
        assert!(err.to_string().contains('5'));
        assert!(err.to_string().contains('3'));
    }

    #[test]
    fn write_error_wraps_encode_error() {
        let err: WriteError = EncodeError::OutOfRange {
            selector: 9,
            pin_count: 4,
        }
        .into();
        assert!(matches!(err, WriteError::SelectorOutOfRange(_)));
    }
}
