//! # pindrv Library
//!
//! Pin-bank output driver: a fixed set of exclusively owned GPIO output
//! lines exposed to user processes as a writable device entry. Write
//! commands select exactly one active line (one-hot).
//!
//! # Module Structure
//!
//! - [`pins`] - Pin set: all-or-nothing acquisition, ordered release
//! - [`encoder`] - One-hot output encoding
//! - [`controller`] - Device lifecycle state machine
//! - [`device`] - Device entry registration
//! - [`backend`] - GPIO backends (Linux cdev, simulation)
//!
//! # Architecture
//!
//! ```text
//! probe ──► PinSet::acquire ──► DeviceRegistrar::register
//!                │                        │
//!                ▼                        ▼
//!        GpioBank (trait)          device entry (FIFO)
//!
//! write bytes ──► decimal parse ──► encoder ──► PinSet::set_bitmask
//!
//! remove ──► deregister entry ──► PinSet::release (reverse order)
//! ```

#![deny(missing_docs)]

pub mod backend;
pub mod controller;
pub mod device;
pub mod encoder;
pub mod pins;

pub use crate::controller::{ControllerState, DeviceController};
pub use crate::pins::PinSet;
