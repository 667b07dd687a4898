//! GPIO backend implementations.
//!
//! Backends implement the `GpioBank` trait from `pindrv_common::gpio`:
//!
//! - [`cdev`] - Linux GPIO character device (production)
//! - [`simulation`] - In-memory bank for development and testing

pub mod cdev;
pub mod simulation;
