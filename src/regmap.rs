//! Register Map
//!
//! The single choke point for chip access. A [`RegisterMap`] owns exactly
//! one [`Transport`] and the blocking delay, both behind one lock. The lock
//! belongs to the map: two maps never wait for each other.
//!
//! Single register operations on the map take the lock for one
//! transaction. [`RegisterMap::locked`] hands out the unlocked
//! [`RegisterBus`] for the duration of a closure so that multi-register
//! sequences (table queries, flushes) cannot be interleaved with any other
//! register traffic.
//!
//! # Example
//!
//! ```ignore
//! let map = RegisterMap::new(transport, delay);
//!
//! map.update_bits(0x06D5, 0x0001, 0x0001)?;
//!
//! map.locked(|bus| {
//!     bus.write(0x0501, index)?;
//!     bus.write(0x0500, command)?;
//!     bus.poll_until(0x0502, |s| s & 0x2000 == 0, 10, 100)
//! })?;
//! ```

use embedded_hal::delay::DelayNs;

use crate::error::{IoError, Result};
use crate::hal::Transport;
use crate::sync::{CriticalSectionRawMutex, RawMutex};

// =============================================================================
// Register Bus (lock held)
// =============================================================================

/// Register access with the map lock already held
///
/// Only reachable through [`RegisterMap::locked`]; every method here is
/// the lock-free variant of the corresponding map operation.
#[derive(Debug)]
pub struct RegisterBus<T, D> {
    transport: T,
    delay: D,
}

impl<T: Transport, D: DelayNs> RegisterBus<T, D> {
    /// Read a register
    #[inline]
    pub fn read(&mut self, addr: u16) -> Result<u16> {
        self.transport.read_reg(addr)
    }

    /// Write a register
    #[inline]
    pub fn write(&mut self, addr: u16, value: u16) -> Result<()> {
        self.transport.write_reg(addr, value)
    }

    /// Write a register without waiting for the final acknowledgement
    #[inline]
    pub fn write_noack(&mut self, addr: u16, value: u16) -> Result<()> {
        self.transport.write_reg_noack(addr, value)
    }

    /// Read-modify-write the bits selected by `mask`
    ///
    /// The write is skipped when the register already holds the result.
    pub fn update_bits(&mut self, addr: u16, mask: u16, value: u16) -> Result<()> {
        let orig = self.read(addr)?;
        let new = (orig & !mask) | (value & mask);
        if new != orig {
            self.write(addr, new)?;
        }
        Ok(())
    }

    /// Read `addr` until `done` holds, sleeping `interval_us` between reads
    ///
    /// Returns the first value that satisfied `done`. Elapsed time is the
    /// sum of the issued delays; once it reaches `timeout_us` a final read
    /// that still fails the predicate yields [`IoError::Timeout`].
    pub fn poll_until<F>(
        &mut self,
        addr: u16,
        mut done: F,
        interval_us: u32,
        timeout_us: u32,
    ) -> Result<u16>
    where
        F: FnMut(u16) -> bool,
    {
        let step = interval_us.max(1);
        let mut elapsed = 0u32;
        loop {
            let value = self.read(addr)?;
            if done(value) {
                return Ok(value);
            }
            if elapsed >= timeout_us {
                #[cfg(feature = "defmt")]
                defmt::warn!("poll timeout on reg {=u16:#x}: {=u16:#x}", addr, value);

                return Err(IoError::Timeout.into());
            }
            self.delay.delay_us(interval_us);
            elapsed = elapsed.saturating_add(step);
        }
    }

    /// Sleep for `us` microseconds
    #[inline]
    pub fn delay_us(&mut self, us: u32) {
        self.delay.delay_us(us);
    }

    /// Sleep for `ms` milliseconds
    #[inline]
    pub fn delay_ms(&mut self, ms: u32) {
        self.delay.delay_ms(ms);
    }

    /// Borrow the transport
    pub fn transport(&self) -> &T {
        &self.transport
    }
}

// =============================================================================
// Register Map
// =============================================================================

/// Lock-protected register access to one chip
///
/// `M` is the raw mutex behind the map lock. `RegisterMap` is `Sync` when
/// the transport and delay are `Send` and `M` is `Sync`, so a single
/// instance can be shared between threads or tasks by reference. The
/// lock is blocking and may be held across the short sleeps of a table
/// poll; never use a map from interrupt context.
pub struct RegisterMap<T, D, M = CriticalSectionRawMutex> {
    bus: lock_api::Mutex<M, RegisterBus<T, D>>,
}

impl<T: Transport, D: DelayNs, M: RawMutex> RegisterMap<T, D, M> {
    /// Create a map owning `transport` and `delay`
    pub fn new(transport: T, delay: D) -> Self {
        Self {
            bus: lock_api::Mutex::new(RegisterBus { transport, delay }),
        }
    }

    /// Run `f` with the lock held for its whole duration
    ///
    /// `f` must not call back into this map; use the [`RegisterBus`] it
    /// receives instead. The lock is not reentrant, so a nested call
    /// deadlocks.
    pub fn locked<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&mut RegisterBus<T, D>) -> R,
    {
        let mut bus = self.bus.lock();
        f(&mut bus)
    }

    /// Whether some caller currently holds the lock
    pub fn is_locked(&self) -> bool {
        self.bus.is_locked()
    }

    /// Read a register
    pub fn read(&self, addr: u16) -> Result<u16> {
        self.locked(|bus| bus.read(addr))
    }

    /// Write a register
    pub fn write(&self, addr: u16, value: u16) -> Result<()> {
        self.locked(|bus| bus.write(addr, value))
    }

    /// Write a register without waiting for the final acknowledgement
    pub fn write_noack(&self, addr: u16, value: u16) -> Result<()> {
        self.locked(|bus| bus.write_noack(addr, value))
    }

    /// Read-modify-write under a single lock acquisition
    pub fn update_bits(&self, addr: u16, mask: u16, value: u16) -> Result<()> {
        self.locked(|bus| bus.update_bits(addr, mask, value))
    }

    /// Poll a register until `done` holds, see [`RegisterBus::poll_until`]
    pub fn poll_until<F>(&self, addr: u16, done: F, interval_us: u32, timeout_us: u32) -> Result<u16>
    where
        F: FnMut(u16) -> bool,
    {
        self.locked(|bus| bus.poll_until(addr, done, interval_us, timeout_us))
    }

    /// Consume the map and return the transport and delay
    pub fn release(self) -> (T, D) {
        let bus = self.bus.into_inner();
        (bus.transport, bus.delay)
    }
}

impl<T, D, M: RawMutex> core::fmt::Debug for RegisterMap<T, D, M> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RegisterMap")
            .field("locked", &self.bus.is_locked())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
#[allow(clippy::std_instead_of_core, clippy::std_instead_of_alloc)]
mod tests {
    extern crate std;

    use std::sync::Arc;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;
    use std::vec::Vec;

    use super::*;
    use crate::error::Error;
    use crate::test_utils::{MockDelay, MockSwitch};

    const SCRATCH: u16 = 0x0100;

    fn new_map() -> (RegisterMap<MockSwitch, MockDelay>, MockSwitch, MockDelay) {
        let chip = MockSwitch::new();
        let delay = MockDelay::new();
        (RegisterMap::new(chip.clone(), delay.clone()), chip, delay)
    }

    #[test]
    fn read_write_round_trip() {
        let (map, chip, _) = new_map();

        map.write(SCRATCH, 0xA5A5).unwrap();

        assert_eq!(map.read(SCRATCH).unwrap(), 0xA5A5);
        assert_eq!(chip.get_register(SCRATCH), 0xA5A5);
    }

    #[test]
    fn update_bits_changes_only_masked_bits() {
        let (map, chip, _) = new_map();
        chip.set_register(SCRATCH, 0xF0F0);

        map.update_bits(SCRATCH, 0x00FF, 0x0033).unwrap();

        assert_eq!(chip.get_register(SCRATCH), 0xF033);
    }

    #[test]
    fn update_bits_skips_redundant_write() {
        let (map, chip, _) = new_map();
        chip.set_register(SCRATCH, 0x0001);
        chip.clear_log();

        map.update_bits(SCRATCH, 0x0001, 0x0001).unwrap();

        assert!(chip.writes().is_empty());
    }

    #[test]
    fn poll_until_returns_matching_value() {
        let (map, chip, delay) = new_map();
        chip.set_register(SCRATCH, 0x0004);

        let value = map.poll_until(SCRATCH, |v| v & 0x0004 != 0, 10, 100).unwrap();

        assert_eq!(value, 0x0004);
        assert_eq!(delay.total_ns(), 0);
    }

    #[test]
    fn poll_until_times_out_after_bounded_reads() {
        let (map, chip, delay) = new_map();
        chip.set_register(SCRATCH, 0x0001);
        chip.clear_log();

        let result = map.poll_until(SCRATCH, |v| v == 0, 10, 100);

        assert_eq!(result, Err(Error::Io(IoError::Timeout)));
        assert_eq!(chip.reads().len(), 11);
        assert_eq!(delay.total_ns(), 100_000);
    }

    #[test]
    fn poll_until_with_zero_interval_is_bounded() {
        let (map, chip, _) = new_map();
        chip.set_register(SCRATCH, 0x0001);
        chip.clear_log();

        assert!(map.poll_until(SCRATCH, |v| v == 0, 0, 5).is_err());
        assert_eq!(chip.reads().len(), 6);
    }

    #[test]
    fn transport_errors_pass_through() {
        let (map, chip, _) = new_map();
        chip.fail_io(true);

        assert_eq!(map.read(SCRATCH), Err(Error::Io(IoError::Bus)));
        assert_eq!(map.update_bits(SCRATCH, 1, 1), Err(Error::Io(IoError::Bus)));
    }

    #[test]
    fn locked_section_runs_sequence_atomically() {
        let (map, _, _) = new_map();
        let map = Arc::new(map);

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let map = Arc::clone(&map);
                thread::spawn(move || {
                    for _ in 0..250 {
                        map.locked(|bus| {
                            let v = bus.read(SCRATCH)?;
                            bus.write(SCRATCH, v + 1)
                        })
                        .unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(map.read(SCRATCH).unwrap(), 1000);
    }

    #[test]
    fn separate_maps_do_not_share_a_lock() {
        let (first, _, _) = new_map();
        let (second, _, _) = new_map();
        let (tx, rx) = mpsc::channel();

        thread::scope(|s| {
            first.locked(|_| {
                let tx = tx.clone();
                let second = &second;
                s.spawn(move || tx.send(second.write(SCRATCH, 0x0042)).unwrap());

                let result = rx.recv_timeout(Duration::from_secs(2));
                assert_eq!(result, Ok(Ok(())));
            });
        });

        assert_eq!(second.read(SCRATCH).unwrap(), 0x0042);
    }

    #[test]
    fn same_map_waits_for_lock_holder() {
        let (map, _, _) = new_map();
        let (tx, rx) = mpsc::channel();

        thread::scope(|s| {
            map.locked(|bus| {
                let map = &map;
                s.spawn(move || tx.send(map.read(SCRATCH)).unwrap());

                assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
                bus.write(SCRATCH, 0x0007).unwrap();
            });

            assert_eq!(rx.recv_timeout(Duration::from_secs(2)), Ok(Ok(0x0007)));
        });
    }

    #[test]
    fn held_lock_leaves_critical_sections_free() {
        let (map, _, _) = new_map();

        map.locked(|_| {
            let entered = thread::spawn(|| critical_section::with(|_| true))
                .join()
                .unwrap();
            assert!(entered);
        });
        assert!(!map.is_locked());
    }

    #[test]
    fn host_supplied_raw_mutex() {
        let chip = MockSwitch::new();
        let map: RegisterMap<_, _, spin::mutex::SpinMutex<()>> =
            RegisterMap::new(chip.clone(), MockDelay::new());

        map.update_bits(SCRATCH, 0x00FF, 0x0012).unwrap();
        let inside = map.locked(|bus| bus.read(SCRATCH)).unwrap();

        assert_eq!(inside, 0x0012);
        assert_eq!(chip.get_register(SCRATCH), 0x0012);
    }

    #[test]
    fn write_noack_reaches_transport() {
        let (map, chip, _) = new_map();

        map.write_noack(SCRATCH, 0x0002).unwrap();

        assert_eq!(chip.noack_writes(), [(SCRATCH, 0x0002)]);
    }

    #[test]
    fn release_returns_parts() {
        let (map, chip, _) = new_map();
        map.write(SCRATCH, 7).unwrap();

        let (transport, _delay) = map.release();

        assert_eq!(transport.get_register(SCRATCH), 7);
        assert_eq!(chip.get_register(SCRATCH), 7);
    }
}
