//! Synchronization primitives for chip-wide exclusive access.
//!
//! Default raw mutex behind the register map lock and the L2 lock.

use core::cell::Cell;
use critical_section::Mutex;
use lock_api::{GuardSend, RawMutex};

/// Raw mutex built on a per-instance flag guarded by `critical-section`
///
/// The critical section covers only the test-and-set of the flag, never
/// the code the mutex protects, so a holder may sleep with interrupts
/// enabled and two instances never contend with each other. The
/// critical-section implementation is supplied by the host environment
/// (HAL crate, RTOS port or the `std` implementation on a workstation).
///
/// Waiters spin. Hosts with a scheduler can plug a sleeping
/// [`RawMutex`] into [`RegisterMap`](crate::RegisterMap) and
/// [`Switch`](crate::Switch) instead.
pub struct CriticalSectionRawMutex {
    locked: Mutex<Cell<bool>>,
}

impl CriticalSectionRawMutex {
    /// Create an unlocked mutex (const, suitable for static initialization).
    pub const fn new() -> Self {
        Self {
            locked: Mutex::new(Cell::new(false)),
        }
    }
}

impl Default for CriticalSectionRawMutex {
    fn default() -> Self {
        Self::new()
    }
}

// SAFETY: the flag is only set by a `try_lock` that observed it clear, and
// the critical section makes that test-and-set atomic, so at most one
// holder exists at a time.
#[allow(unsafe_code)]
unsafe impl RawMutex for CriticalSectionRawMutex {
    #[allow(clippy::declare_interior_mutable_const)]
    const INIT: Self = Self::new();

    type GuardMarker = GuardSend;

    fn lock(&self) {
        while !self.try_lock() {
            core::hint::spin_loop();
        }
    }

    fn try_lock(&self) -> bool {
        critical_section::with(|cs| {
            let flag = self.locked.borrow(cs);
            if flag.get() {
                false
            } else {
                flag.set(true);
                true
            }
        })
    }

    unsafe fn unlock(&self) {
        critical_section::with(|cs| self.locked.borrow(cs).set(false));
    }

    fn is_locked(&self) -> bool {
        critical_section::with(|cs| self.locked.borrow(cs).get())
    }
}

impl core::fmt::Debug for CriticalSectionRawMutex {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CriticalSectionRawMutex")
            .field("locked", &self.is_locked())
            .finish()
    }
}
