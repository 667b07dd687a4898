//! Simulation GPIO backend.
//!
//! Keeps no hardware state: every acquire, release and line write is
//! appended to a shared, ordered event trace that tests (and `--simulate`
//! runs) can inspect. Failures are injectable per line name (acquisition)
//! or globally (writes).

use pindrv_common::error::{AcquireError, HardwareWriteError};
use pindrv_common::gpio::{GpioBank, OutputLine, PinDescriptor};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::trace;

/// One observable backend event, in occurrence order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimEvent {
    /// A line was acquired.
    Acquired {
        /// Line name
        name: String,
    },
    /// A line was released.
    Released {
        /// Line name
        name: String,
    },
    /// A line was driven to a level.
    LineSet {
        /// Line name
        name: String,
        /// Logical level written
        value: bool,
    },
}

/// Shared, ordered trace of backend events.
#[derive(Clone, Default)]
pub struct SimTrace {
    events: Arc<Mutex<Vec<SimEvent>>>,
}

impl SimTrace {
    /// Snapshot of all events so far, in order.
    pub fn events(&self) -> Vec<SimEvent> {
        self.events.lock().expect("sim trace lock poisoned").clone()
    }

    /// Final logical level of every line that was ever written.
    pub fn final_levels(&self) -> HashMap<String, bool> {
        let mut levels = HashMap::new();
        for event in self.events() {
            if let SimEvent::LineSet { name, value } = event {
                levels.insert(name, value);
            }
        }
        levels
    }

    /// Number of `LineSet` events recorded so far.
    pub fn line_set_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, SimEvent::LineSet { .. }))
            .count()
    }

    fn push(&self, event: SimEvent) {
        trace!("sim event: {:?}", event);
        self.events
            .lock()
            .expect("sim trace lock poisoned")
            .push(event);
    }
}

/// In-memory GPIO bank.
pub struct SimulationBank {
    trace: SimTrace,
    fail_acquire: HashSet<String>,
    fail_writes: Arc<AtomicBool>,
}

impl SimulationBank {
    /// Create an empty bank with a fresh trace.
    pub fn new() -> Self {
        Self {
            trace: SimTrace::default(),
            fail_acquire: HashSet::new(),
            fail_writes: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Handle to the shared event trace.
    pub fn trace(&self) -> SimTrace {
        self.trace.clone()
    }

    /// Make acquisition of the named line fail.
    pub fn fail_acquire_of(&mut self, name: &str) {
        self.fail_acquire.insert(name.to_string());
    }

    /// Make every line write fail (or succeed again) from now on,
    /// including on lines already handed out.
    pub fn fail_writes(&mut self, enabled: bool) {
        self.fail_writes.store(enabled, Ordering::SeqCst);
    }
}

impl Default for SimulationBank {
    fn default() -> Self {
        Self::new()
    }
}

impl GpioBank for SimulationBank {
    fn backend_name(&self) -> &'static str {
        "simulation"
    }

    fn request_output(
        &mut self,
        descriptor: &PinDescriptor,
    ) -> Result<Box<dyn OutputLine>, AcquireError> {
        if self.fail_acquire.contains(&descriptor.name) {
            return Err(AcquireError::LineUnavailable {
                line: descriptor.name.clone(),
                cause: "injected acquisition failure".to_string(),
            });
        }

        self.trace.push(SimEvent::Acquired {
            name: descriptor.name.clone(),
        });

        Ok(Box::new(SimLine {
            name: descriptor.name.clone(),
            trace: self.trace.clone(),
            fail_writes: Arc::clone(&self.fail_writes),
        }))
    }
}

/// One simulated line. Dropping it records the release.
struct SimLine {
    name: String,
    trace: SimTrace,
    fail_writes: Arc<AtomicBool>,
}

impl OutputLine for SimLine {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_value(&mut self, value: bool) -> Result<(), HardwareWriteError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(HardwareWriteError {
                line: self.name.clone(),
                cause: "injected write failure".to_string(),
            });
        }
        self.trace.push(SimEvent::LineSet {
            name: self.name.clone(),
            value,
        });
        Ok(())
    }
}

impl Drop for SimLine {
    fn drop(&mut self) {
        self.trace.push(SimEvent::Released {
            name: self.name.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_recorded_in_order() {
        let mut bank = SimulationBank::new();
        let trace = bank.trace();

        let mut line = bank
            .request_output(&PinDescriptor::new("led0", 17))
            .expect("should acquire");
        line.set_value(true).expect("should write");
        drop(line);

        assert_eq!(
            trace.events(),
            vec![
                SimEvent::Acquired {
                    name: "led0".into()
                },
                SimEvent::LineSet {
                    name: "led0".into(),
                    value: true
                },
                SimEvent::Released {
                    name: "led0".into()
                },
            ]
        );
    }

    #[test]
    fn injected_acquisition_failure() {
        let mut bank = SimulationBank::new();
        bank.fail_acquire_of("en");

        let result = bank.request_output(&PinDescriptor::new("en", 13));
        assert!(matches!(
            result,
            Err(AcquireError::LineUnavailable { .. })
        ));
        assert!(bank.trace().events().is_empty(), "no event for a failed acquire");
    }

    #[test]
    fn injected_write_failure_is_reversible() {
        let mut bank = SimulationBank::new();
        let mut line = bank
            .request_output(&PinDescriptor::new("led0", 17))
            .unwrap();

        bank.fail_writes(true);
        assert!(line.set_value(true).is_err());

        bank.fail_writes(false);
        assert!(line.set_value(true).is_ok());
    }
}
