//! Linux GPIO character device backend.
//!
//! Thin wrapper over the `gpio-cdev` crate: each requested line becomes an
//! exclusive `LineHandle` configured as output, initially low. Dropping
//! the handle releases the line back to the kernel.

use gpio_cdev::{Chip, LineHandle, LineRequestFlags};
use pindrv_common::error::{AcquireError, DriverError, HardwareWriteError};
use pindrv_common::gpio::{GpioBank, OutputLine, PinDescriptor};
use std::path::Path;
use tracing::info;

/// Consumer label shown in `gpioinfo` for lines held by this driver.
const CONSUMER: &str = "pindrv";

/// GPIO bank backed by a `/dev/gpiochipN` character device.
pub struct CdevBank {
    chip: Chip,
}

impl CdevBank {
    /// Open the GPIO chip at `path`.
    ///
    /// # Errors
    /// Returns `DriverError::Config` if the chip cannot be opened.
    pub fn open(path: &Path) -> Result<Self, DriverError> {
        let chip = Chip::new(path).map_err(|e| {
            DriverError::Config(format!("Failed to open GPIO chip {:?}: {}", path, e))
        })?;
        info!("Opened GPIO chip {:?}", path);
        Ok(Self { chip })
    }
}

impl GpioBank for CdevBank {
    fn backend_name(&self) -> &'static str {
        "cdev"
    }

    fn request_output(
        &mut self,
        descriptor: &PinDescriptor,
    ) -> Result<Box<dyn OutputLine>, AcquireError> {
        let line = self
            .chip
            .get_line(descriptor.offset)
            .map_err(|e| AcquireError::LineUnavailable {
                line: descriptor.name.clone(),
                cause: e.to_string(),
            })?;

        let handle = line
            .request(LineRequestFlags::OUTPUT, 0, CONSUMER)
            .map_err(|e| AcquireError::LineUnavailable {
                line: descriptor.name.clone(),
                cause: e.to_string(),
            })?;

        Ok(Box::new(CdevLine {
            name: descriptor.name.clone(),
            handle,
        }))
    }
}

struct CdevLine {
    name: String,
    handle: LineHandle,
}

impl OutputLine for CdevLine {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_value(&mut self, value: bool) -> Result<(), HardwareWriteError> {
        self.handle
            .set_value(value as u8)
            .map_err(|e| HardwareWriteError {
                line: self.name.clone(),
                cause: e.to_string(),
            })
    }
}
