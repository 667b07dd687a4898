//! Pin set: an ordered collection of exclusively owned output lines.
//!
//! The central correctness invariant lives here: acquisition is
//! all-or-nothing. A partially acquired set is never returned to the
//! caller; on any mid-sequence failure everything acquired so far is
//! released in reverse declared order before the error propagates.

use pindrv_common::error::{AcquireError, HardwareWriteError};
use pindrv_common::gpio::{GpioBank, OutputLine, PinDescriptor};
use tracing::{debug, warn};

/// One slot in the set. `None` means the line is unacquired or released.
struct PinSlot {
    name: String,
    handle: Option<Box<dyn OutputLine>>,
}

/// Fixed-size ordered sequence of output-line handles.
///
/// Either every slot holds an acquired handle, or the set is considered
/// non-functional. Membership never changes after acquisition; write
/// commands change only the electrical state of the lines.
pub struct PinSet {
    slots: Vec<PinSlot>,
}

impl std::fmt::Debug for PinSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PinSet")
            .field(
                "slots",
                &self.slots.iter().map(|s| s.name.as_str()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl PinSet {
    /// Acquire every line described by `descriptors`, in declared order,
    /// each initially driven low.
    ///
    /// All-or-nothing: if any line fails, the lines acquired so far are
    /// released in reverse order and the error is returned.
    ///
    /// # Errors
    /// Returns the `AcquireError` of the first line that failed.
    pub fn acquire(
        bank: &mut dyn GpioBank,
        descriptors: &[PinDescriptor],
    ) -> Result<Self, AcquireError> {
        let mut set = Self {
            slots: Vec::with_capacity(descriptors.len()),
        };

        for descriptor in descriptors {
            match bank.request_output(descriptor) {
                Ok(handle) => {
                    debug!("Acquired output line '{}'", descriptor.name);
                    set.slots.push(PinSlot {
                        name: descriptor.name.clone(),
                        handle: Some(handle),
                    });
                }
                Err(e) => {
                    warn!(
                        "Acquisition stopped at line '{}', rolling back {} acquired line(s)",
                        descriptor.name,
                        set.acquired_count()
                    );
                    set.release();
                    return Err(e);
                }
            }
        }

        debug!(
            "Acquired all {} output lines via {} backend",
            set.slots.len(),
            bank.backend_name()
        );
        Ok(set)
    }

    /// Release every acquired line, in reverse declared order.
    ///
    /// Idempotent: already-released slots are skipped, so this is safe on
    /// a partially built set during error unwinding and safe to call twice.
    pub fn release(&mut self) {
        for slot in self.slots.iter_mut().rev() {
            if let Some(handle) = slot.handle.take() {
                debug!("Releasing output line '{}'", slot.name);
                drop(handle);
            }
        }
    }

    /// Write one bit per line, in declared order.
    ///
    /// Bit `i` of `mask` drives line `i`. A write failure surfaces
    /// `HardwareWriteError` naming the line; acquisition state is
    /// unaffected (the caller may retry).
    pub fn set_bitmask(&mut self, mask: u64) -> Result<(), HardwareWriteError> {
        for (bit, slot) in self.slots.iter_mut().enumerate() {
            if let Some(handle) = slot.handle.as_mut() {
                handle.set_value(mask & (1 << bit) != 0)?;
            }
        }
        Ok(())
    }

    /// Number of slots (acquired or not).
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// True if the set has no slots.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of slots currently holding an acquired handle.
    pub fn acquired_count(&self) -> usize {
        self.slots.iter().filter(|s| s.handle.is_some()).count()
    }
}
