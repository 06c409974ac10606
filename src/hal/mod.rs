//! Hardware Abstraction Layer
//!
//! Register transports for the switch control plane. Both transports
//! implement [`Transport`], the single read/write contract everything
//! above them is written against.
//!
//! # Modules
//!
//! - [`smi`]: bit-banged two-wire SMI protocol on two GPIO lines
//! - [`mdio`]: indirect register access through five MDIO registers
//!
//! # Delay Integration
//!
//! All types that require delays use `embedded_hal::delay::DelayNs` directly.
//! Pass any delay implementation from your HAL.

pub mod mdio;
pub mod smi;

use crate::error::Result;

// Re-export commonly used types
pub use mdio::{IndirectMdio, MdioBus};
pub use smi::{SmiBus, SmiLine};

// =============================================================================
// Transport Trait
// =============================================================================

/// Register-level access to the switch chip
///
/// Implementations perform one complete register transaction per call and
/// hold no lock of their own; the register map serializes callers.
pub trait Transport {
    /// Read a 16-bit register
    fn read_reg(&mut self, addr: u16) -> Result<u16>;

    /// Write a 16-bit register
    fn write_reg(&mut self, addr: u16, value: u16) -> Result<()>;

    /// Write a register without waiting for the final acknowledgement
    ///
    /// Used only for the chip reset register: the chip restarts before it
    /// can acknowledge. Transports without an acknowledge phase perform a
    /// plain write.
    fn write_reg_noack(&mut self, addr: u16, value: u16) -> Result<()> {
        self.write_reg(addr, value)
    }
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn read_reg(&mut self, addr: u16) -> Result<u16> {
        (**self).read_reg(addr)
    }

    fn write_reg(&mut self, addr: u16, value: u16) -> Result<()> {
        (**self).write_reg(addr, value)
    }

    fn write_reg_noack(&mut self, addr: u16, value: u16) -> Result<()> {
        (**self).write_reg_noack(addr, value)
    }
}
