//! # pindrv Common Library
//!
//! Shared types for the pindrv workspace.
//!
//! # Module Structure
//!
//! - [`config`] - Device configuration loading and validation
//! - [`error`] - Error taxonomy for acquisition, registration and writes
//! - [`gpio`] - GPIO backend traits (`GpioBank`, `OutputLine`)

#![deny(missing_docs)]

pub mod config;
pub mod error;
pub mod gpio;

pub use crate::config::{DeviceConfig, DeviceVariant};
pub use crate::error::{
    AcquireError, DriverError, EncodeError, HardwareWriteError, RegistrationError, WriteError,
};
pub use crate::gpio::{GpioBank, OutputLine, PinDescriptor};
