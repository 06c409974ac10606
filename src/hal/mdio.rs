//! Indirect MDIO register access
//!
//! Some boards wire the switch to a regular clause 22 MDIO bus instead
//! of dedicated GPIO lines. The chip then exposes its 16-bit register
//! space through a handful of MDIO registers: every access selects
//! address mode, latches the target address, moves the data and issues
//! the read or write command, each step preceded by a start marker.

use super::Transport;
use crate::error::Result;

// =============================================================================
// Indirect Access Registers
// =============================================================================

/// MDIO registers and opcodes of the indirect access window
pub mod indirect_reg {
    /// Control register 0, selects address mode
    pub const CTRL0: u8 = 31;
    /// Start marker register
    pub const START: u8 = 29;
    /// Control register 1, issues the read or write
    pub const CTRL1: u8 = 21;
    /// Target register address
    pub const ADDRESS: u8 = 23;
    /// Data to write
    pub const DATA_WRITE: u8 = 24;
    /// Data read back
    pub const DATA_READ: u8 = 25;

    /// Start marker value
    pub const START_OP: u16 = 0xFFFF;
    /// Address mode opcode
    pub const ADDR_OP: u16 = 0x000E;
    /// Read opcode
    pub const READ_OP: u16 = 0x0001;
    /// Write opcode
    pub const WRITE_OP: u16 = 0x0003;
}

/// Default PHY address of the switch on the parent bus
pub const DEFAULT_PHY_ADDR: u8 = 0;

// =============================================================================
// MDIO Bus Trait
// =============================================================================

/// Trait for MDIO bus operations
///
/// Implemented by the parent bus driver. The bus handles its own
/// framing and timeouts; errors are passed through unchanged.
pub trait MdioBus {
    /// Read a PHY register
    fn read(&mut self, phy_addr: u8, reg_addr: u8) -> Result<u16>;

    /// Write a PHY register
    fn write(&mut self, phy_addr: u8, reg_addr: u8, value: u16) -> Result<()>;
}

impl<M: MdioBus + ?Sized> MdioBus for &mut M {
    fn read(&mut self, phy_addr: u8, reg_addr: u8) -> Result<u16> {
        (**self).read(phy_addr, reg_addr)
    }

    fn write(&mut self, phy_addr: u8, reg_addr: u8, value: u16) -> Result<()> {
        (**self).write(phy_addr, reg_addr, value)
    }
}

// =============================================================================
// Indirect Transport
// =============================================================================

/// Register transport over a parent MDIO bus
#[derive(Debug)]
pub struct IndirectMdio<M> {
    bus: M,
    phy_addr: u8,
}

impl<M: MdioBus> IndirectMdio<M> {
    /// Create a transport for the switch at `phy_addr` on `bus`
    pub fn new(bus: M, phy_addr: u8) -> Self {
        Self { bus, phy_addr }
    }

    /// PHY address the switch answers on
    pub fn phy_addr(&self) -> u8 {
        self.phy_addr
    }

    /// Borrow the parent bus
    pub fn bus(&self) -> &M {
        &self.bus
    }

    /// Release the parent bus
    pub fn release(self) -> M {
        self.bus
    }

    fn command(&mut self, reg: u8, value: u16) -> Result<()> {
        self.bus.write(self.phy_addr, indirect_reg::START, indirect_reg::START_OP)?;
        self.bus.write(self.phy_addr, reg, value)
    }

    fn select_address(&mut self, addr: u16) -> Result<()> {
        self.command(indirect_reg::CTRL0, indirect_reg::ADDR_OP)?;
        self.command(indirect_reg::ADDRESS, addr)
    }
}

impl<M: MdioBus> Transport for IndirectMdio<M> {
    fn read_reg(&mut self, addr: u16) -> Result<u16> {
        self.select_address(addr)?;
        self.command(indirect_reg::CTRL1, indirect_reg::READ_OP)?;
        self.bus
            .write(self.phy_addr, indirect_reg::START, indirect_reg::START_OP)?;
        self.bus.read(self.phy_addr, indirect_reg::DATA_READ)
    }

    fn write_reg(&mut self, addr: u16, value: u16) -> Result<()> {
        self.select_address(addr)?;
        self.command(indirect_reg::DATA_WRITE, value)?;
        self.command(indirect_reg::CTRL1, indirect_reg::WRITE_OP)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
