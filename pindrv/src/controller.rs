//! Device lifecycle controller.
//!
//! Owns the probe/remove state machine and the write-command dispatch
//! path. One controller instance per probed device; no process-global
//! state, so multiple instances coexist and tests need no fixtures.
//!
//! ```text
//! Uninitialized ──probe──► PinsAcquired ──register──► Registered
//!       │                       │                         │
//!       └──acquire failed──► Failed ◄──register failed────┤
//!                                                         │
//!            Terminated ◄──────────remove─────────────────┘
//! ```
//!
//! The key partial-failure rule: later-stage failure undoes all
//! earlier-stage side effects, strictly in reverse order of acquisition.

use crate::device::{DeviceRegistrar, DeviceToken};
use crate::encoder;
use crate::pins::PinSet;
use pindrv_common::config::{DeviceConfig, DeviceVariant};
use pindrv_common::error::{DriverError, WriteError};
use pindrv_common::gpio::{GpioBank, PinDescriptor};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info, warn};

/// Longest accepted write payload: "255" plus trailing newline, padded.
const MAX_WRITE_LEN: usize = 8;

/// Lifecycle state of one device instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    /// Nothing acquired yet.
    Uninitialized,
    /// All output lines acquired, device entry not yet registered.
    PinsAcquired,
    /// Fully operational: pins acquired and entry registered.
    Registered,
    /// Probe failed; anything acquired has been rolled back.
    Failed,
    /// Removed. Terminal.
    Terminated,
}

/// Orchestrates pin acquisition, device-entry registration, write-command
/// dispatch, and teardown ordering.
pub struct DeviceController {
    variant: DeviceVariant,
    device_name: String,
    descriptors: Vec<PinDescriptor>,
    registrar: Box<dyn DeviceRegistrar>,
    state: ControllerState,
    /// Guards the clear-then-set sequence: without serialization, two
    /// writers' clear/set pairs could interleave and leave more than one
    /// line active.
    pins: Mutex<Option<PinSet>>,
    token: Option<DeviceToken>,
}

impl DeviceController {
    /// Create an uninitialized controller for the configured device.
    pub fn new(config: &DeviceConfig, registrar: Box<dyn DeviceRegistrar>) -> Self {
        Self {
            variant: config.variant,
            device_name: config.device_name.clone(),
            descriptors: config.pin_descriptors(),
            registrar,
            state: ControllerState::Uninitialized,
            pins: Mutex::new(None),
            token: None,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// Number of output lines this device drives.
    pub fn pin_count(&self) -> usize {
        self.descriptors.len()
    }

    /// Path of the registered device entry, if any.
    pub fn entry_path(&self) -> Option<&Path> {
        self.token.as_ref().map(|t| t.path())
    }

    /// Acquire the pin set, then register the device entry.
    ///
    /// On acquisition failure there is nothing to undo. On registration
    /// failure the already-acquired pins are released in reverse order.
    /// Either failure leaves the controller in `Failed`.
    ///
    /// # Errors
    /// Returns the acquisition or registration error; never retried here.
    pub fn probe(&mut self, bank: &mut dyn GpioBank) -> Result<(), DriverError> {
        info!(
            "Probing device '{}' ({} lines, {} backend)",
            self.device_name,
            self.descriptors.len(),
            bank.backend_name()
        );

        let pin_set = match PinSet::acquire(bank, &self.descriptors) {
            Ok(set) => set,
            Err(e) => {
                self.state = ControllerState::Failed;
                return Err(e.into());
            }
        };
        self.state = ControllerState::PinsAcquired;
        *self.pins.lock().expect("pin set lock poisoned") = Some(pin_set);

        match self.registrar.register(&self.device_name) {
            Ok(token) => {
                self.token = Some(token);
                self.state = ControllerState::Registered;
                info!("Device '{}' registered", self.device_name);
                Ok(())
            }
            Err(e) => {
                warn!("Registration failed, releasing acquired lines: {}", e);
                let mut guard = self.pins.lock().expect("pin set lock poisoned");
                if let Some(pins) = guard.as_mut() {
                    pins.release();
                }
                *guard = None;
                self.state = ControllerState::Failed;
                Err(e.into())
            }
        }
    }

    /// Handle one write request against the device entry.
    ///
    /// Accepts a decimal selector in `[0, pin_count)` at offset 0 and
    /// drives exactly that line high: clear-then-set under a single lock
    /// hold, so no two lines are ever active simultaneously, even
    /// transiently. Returns the number of bytes consumed (the full
    /// payload).
    ///
    /// # Errors
    /// `WriteError` variants map to invalid-argument for the caller; no
    /// controller state changes on any of them.
    pub fn handle_write(&self, buf: &[u8], offset: u64) -> Result<usize, WriteError> {
        if self.state != ControllerState::Registered {
            return Err(WriteError::NotRegistered);
        }
        if offset != 0 {
            return Err(WriteError::UnsupportedOffset(offset));
        }
        if self.variant == DeviceVariant::Lcd {
            // No line-sequencing protocol is defined for the LCD pins.
            return Err(WriteError::UnsupportedVariant);
        }

        let selector = parse_selector(buf)?;
        let pin_count = self.descriptors.len();
        let mask = encoder::encode(selector, pin_count)?;

        let mut guard = self.pins.lock().expect("pin set lock poisoned");
        let pins = guard.as_mut().ok_or(WriteError::NotRegistered)?;
        pins.set_bitmask(encoder::all_off(pin_count))?;
        pins.set_bitmask(mask)?;

        debug!("Selector {} -> bitmask {:#b}", selector, mask);
        Ok(buf.len())
    }

    /// Tear the device down: deregister the entry if present, then release
    /// the pins if acquired, in that order (reverse of probe).
    ///
    /// Idempotent and valid from every state, including a controller that
    /// never reached `Registered`. Best effort: always succeeds from the
    /// host's perspective.
    pub fn remove(&mut self) {
        if self.state == ControllerState::Terminated {
            debug!("Device '{}' already removed", self.device_name);
            return;
        }

        if let Some(token) = self.token.take() {
            self.registrar.deregister(token);
        }

        let mut guard = self.pins.lock().expect("pin set lock poisoned");
        if let Some(pins) = guard.as_mut() {
            pins.release();
        }
        *guard = None;

        self.state = ControllerState::Terminated;
        info!("Device '{}' removed", self.device_name);
    }

    /// Observability hook: a user process opened the device entry.
    pub fn open(&self) {
        info!("Device '{}' opened", self.device_name);
    }

    /// Observability hook: the device entry was closed.
    pub fn close(&self) {
        info!("Device '{}' closed", self.device_name);
    }
}

/// Parse a decimal byte from a raw write payload.
///
/// A single trailing newline is tolerated (`echo N > dev` appends one).
fn parse_selector(buf: &[u8]) -> Result<u8, WriteError> {
    if buf.is_empty() || buf.len() > MAX_WRITE_LEN {
        return Err(WriteError::InvalidInput);
    }
    let text = std::str::from_utf8(buf).map_err(|_| WriteError::InvalidInput)?;
    let text = text.strip_suffix('\n').unwrap_or(text);
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(WriteError::InvalidInput);
    }
    text.parse::<u8>().map_err(|_| WriteError::InvalidInput)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::simulation::SimulationBank;
    use pindrv_common::error::RegistrationError;
    use std::path::PathBuf;

    /// Registrar that records calls and can be told to fail.
    struct TestRegistrar {
        fail: bool,
        registered: u32,
        deregistered: u32,
    }

    impl TestRegistrar {
        fn new() -> Self {
            Self {
                fail: false,
                registered: 0,
                deregistered: 0,
            }
        }
    }

    impl DeviceRegistrar for TestRegistrar {
        fn register(&mut self, name: &str) -> Result<DeviceToken, RegistrationError> {
            if self.fail {
                return Err(RegistrationError::Io("injected failure".into()));
            }
            self.registered += 1;
            Ok(DeviceToken::new(PathBuf::from(format!("/run/test/{name}"))))
        }

        fn deregister(&mut self, _token: DeviceToken) {
            self.deregistered += 1;
        }
    }

    fn led_config(lines: usize) -> DeviceConfig {
        let toml = format!(
            r#"
                variant = "led"
                device_name = "rpi_led"

                [led]
                lines = {:?}
            "#,
            (0..lines as u32).collect::<Vec<_>>()
        );
        toml::from_str(&toml).expect("test config should parse")
    }

    #[test]
    fn initial_state_is_uninitialized() {
        let controller =
            DeviceController::new(&led_config(3), Box::new(TestRegistrar::new()));
        assert_eq!(controller.state(), ControllerState::Uninitialized);
        assert_eq!(controller.pin_count(), 3);
        assert!(controller.entry_path().is_none());
    }

    #[test]
    fn probe_reaches_registered() {
        let mut controller =
            DeviceController::new(&led_config(3), Box::new(TestRegistrar::new()));
        let mut bank = SimulationBank::new();

        controller.probe(&mut bank).expect("probe should succeed");
        assert_eq!(controller.state(), ControllerState::Registered);
        assert!(controller.entry_path().is_some());
    }

    #[test]
    fn acquire_failure_leads_to_failed() {
        let mut controller =
            DeviceController::new(&led_config(3), Box::new(TestRegistrar::new()));
        let mut bank = SimulationBank::new();
        bank.fail_acquire_of("led1");

        let result = controller.probe(&mut bank);
        assert!(matches!(result, Err(DriverError::Acquire(_))));
        assert_eq!(controller.state(), ControllerState::Failed);
    }

    #[test]
    fn registration_failure_leads_to_failed() {
        let mut registrar = TestRegistrar::new();
        registrar.fail = true;
        let mut controller = DeviceController::new(&led_config(3), Box::new(registrar));
        let mut bank = SimulationBank::new();

        let result = controller.probe(&mut bank);
        assert!(matches!(result, Err(DriverError::Registration(_))));
        assert_eq!(controller.state(), ControllerState::Failed);
    }

    #[test]
    fn write_before_probe_rejected() {
        let controller =
            DeviceController::new(&led_config(3), Box::new(TestRegistrar::new()));
        assert!(matches!(
            controller.handle_write(b"1", 0),
            Err(WriteError::NotRegistered)
        ));
    }

    #[test]
    fn remove_is_idempotent() {
        let mut controller =
            DeviceController::new(&led_config(3), Box::new(TestRegistrar::new()));
        let mut bank = SimulationBank::new();

        controller.probe(&mut bank).unwrap();
        controller.remove();
        assert_eq!(controller.state(), ControllerState::Terminated);
        controller.remove();
        assert_eq!(controller.state(), ControllerState::Terminated);
    }

    #[test]
    fn remove_on_uninitialized_is_a_noop() {
        let mut controller =
            DeviceController::new(&led_config(3), Box::new(TestRegistrar::new()));
        controller.remove();
        assert_eq!(controller.state(), ControllerState::Terminated);
    }

    #[test]
    fn lcd_variant_rejects_writes() {
        let config: DeviceConfig = toml::from_str(
            r#"
                variant = "lcd"
                device_name = "rpi_lcd"

                [lcd]
                rs = 5
                rw = 6
                en = 13
                data = [16, 19, 20, 21]
            "#,
        )
        .unwrap();
        let mut controller = DeviceController::new(&config, Box::new(TestRegistrar::new()));
        let mut bank = SimulationBank::new();

        controller.probe(&mut bank).expect("LCD probe should succeed");
        assert!(matches!(
            controller.handle_write(b"1", 0),
            Err(WriteError::UnsupportedVariant)
        ));
    }

    // ─── parse_selector ─────────────────────────────────────────────

    #[test]
    fn parse_accepts_plain_digits() {
        assert_eq!(parse_selector(b"0").unwrap(), 0);
        assert_eq!(parse_selector(b"7").unwrap(), 7);
        assert_eq!(parse_selector(b"255").unwrap(), 255);
    }

    #[test]
    fn parse_tolerates_trailing_newline() {
        assert_eq!(parse_selector(b"1\n").unwrap(), 1);
    }

    #[test]
    fn parse_rejects_malformed_payloads() {
        for payload in [
            &b""[..],
            b"\n",
            b"abc",
            b"256",
            b"-1",
            b"+1",
            b"1.5",
            b"1 ",
            b" 1",
            b"1\n\n",
            b"0004294967296",
        ] {
            assert!(
                parse_selector(payload).is_err(),
                "{payload:?} should be rejected"
            );
        }
    }
}
