//! GPIO backend traits.
//!
//! The driver core never talks to hardware directly; it goes through
//! `GpioBank` to acquire lines and `OutputLine` to drive them. Production
//! uses the Linux GPIO character device, tests and `--simulate` use an
//! in-memory bank.

use crate::error::{AcquireError, HardwareWriteError};

/// Description of one output line to acquire: a stable name plus the
/// hardware line offset on the chip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinDescriptor {
    /// Name the line is acquired and reported under (e.g. "led0", "rs")
    pub name: String,
    /// Line offset on the GPIO chip
    pub offset: u32,
}

impl PinDescriptor {
    /// Create a descriptor.
    pub fn new(name: impl Into<String>, offset: u32) -> Self {
        Self {
            name: name.into(),
            offset,
        }
    }
}

/// One exclusively owned digital output line.
///
/// The handle keeps the line reserved for as long as it lives; dropping
/// it releases the line back to the system.
pub trait OutputLine: Send {
    /// Name the line was acquired under.
    fn name(&self) -> &str;

    /// Drive the line to the given logical level.
    ///
    /// A failed write leaves ownership of the line intact.
    fn set_value(&mut self, value: bool) -> Result<(), HardwareWriteError>;
}

/// A bank of acquirable GPIO output lines.
///
/// Backends implement this trait; the lifecycle controller consumes it.
/// Each requested line starts driven logical-low.
pub trait GpioBank: Send {
    /// Backend identifier for logs (e.g. "cdev", "simulation").
    fn backend_name(&self) -> &'static str;

    /// Request exclusive ownership of one output line, initially low.
    ///
    /// # Errors
    /// Returns `AcquireError::LineUnavailable` if the line is missing,
    /// already owned, or the hardware reports a fault.
    fn request_output(
        &mut self,
        descriptor: &PinDescriptor,
    ) -> Result<Box<dyn OutputLine>, AcquireError>;
}
