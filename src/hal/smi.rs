//! SMI (Simple Management Interface) bit-bang transport
//!
//! Realtek's two-wire management protocol, driven directly on a clock
//! line (MDC) and a bidirectional data line (MDIO). It reuses the MDIO
//! signal levels but is not clause 22: every register access is a framed
//! sequence of bytes, each acknowledged by the chip pulling MDIO low.
//!
//! # Frame layout
//!
//! ```text
//! read:  START CMD_R ack ADDR_LO ack ADDR_HI ack DATA_LO ack0 DATA_HI ack1 STOP
//! write: START CMD_W ack ADDR_LO ack ADDR_HI ack DATA_LO ack DATA_HI ack  STOP
//! ```
//!
//! Edge counts and polarities of START and STOP are part of the hardware
//! contract and are reproduced exactly.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};

use super::Transport;
use crate::constants::SMI_ACK_RETRY_COUNT;
use crate::driver::config::SmiConfig;
use crate::error::{IoError, IoResult, Result};

// =============================================================================
// SMI Line Trait
// =============================================================================

/// A GPIO line that can switch direction at runtime
///
/// embedded-hal models direction statically; SMI needs to release MDIO
/// for the acknowledge and data phases and to release both lines when
/// the bus is idle.
pub trait SmiLine: OutputPin + InputPin {
    /// Configure the line as an output driving `high`
    fn set_output(&mut self, high: bool) -> core::result::Result<(), Self::Error>;

    /// Release the line (configure as input)
    fn set_input(&mut self) -> core::result::Result<(), Self::Error>;
}

// =============================================================================
// SMI Bus
// =============================================================================

/// Bit-banged SMI transport
///
/// Owns both lines and the delay used for clock settling. A single
/// instance must be the only user of the lines; the register map
/// guarantees that no two register transactions overlap.
#[derive(Debug)]
pub struct SmiBus<C, I, D> {
    /// Clock line
    mdc: C,
    /// Data line
    mdio: I,
    /// Clock settle delay provider
    delay: D,
    /// Per-variant timing and commands
    config: SmiConfig,
}

impl<C, I, D> SmiBus<C, I, D>
where
    C: SmiLine,
    I: SmiLine,
    D: DelayNs,
{
    /// Create a new SMI transport on the given lines
    pub fn new(mdc: C, mdio: I, delay: D, config: SmiConfig) -> Self {
        Self {
            mdc,
            mdio,
            delay,
            config,
        }
    }

    /// Get the active configuration
    pub fn config(&self) -> &SmiConfig {
        &self.config
    }

    /// Release the lines and the delay provider
    pub fn release(self) -> (C, I, D) {
        (self.mdc, self.mdio, self.delay)
    }

    // =========================================================================
    // Line Primitives
    // =========================================================================

    #[inline]
    fn clk_delay(&mut self) {
        self.delay.delay_ns(self.config.clk_delay_ns);
    }

    fn set_mdc(&mut self, high: bool) -> IoResult<()> {
        let result = if high {
            self.mdc.set_high()
        } else {
            self.mdc.set_low()
        };
        result.map_err(|_| IoError::Pin)
    }

    fn set_mdio(&mut self, high: bool) -> IoResult<()> {
        let result = if high {
            self.mdio.set_high()
        } else {
            self.mdio.set_low()
        };
        result.map_err(|_| IoError::Pin)
    }

    // =========================================================================
    // Framing
    // =========================================================================

    fn start(&mut self) -> IoResult<()> {
        self.mdc.set_output(false).map_err(|_| IoError::Pin)?;
        self.mdio.set_output(true).map_err(|_| IoError::Pin)?;
        self.clk_delay();

        // CLK 1
        self.set_mdc(true)?;
        self.clk_delay();
        self.set_mdc(false)?;
        self.clk_delay();

        // CLK 2, data falls while the clock is high
        self.set_mdc(true)?;
        self.clk_delay();
        self.set_mdio(false)?;
        self.clk_delay();
        self.set_mdc(false)?;
        self.clk_delay();
        self.set_mdio(true)
    }

    fn stop(&mut self) -> IoResult<()> {
        self.clk_delay();
        self.set_mdio(false)?;
        self.set_mdc(true)?;
        self.clk_delay();
        self.set_mdio(true)?;
        self.clk_delay();
        self.set_mdc(true)?;
        self.clk_delay();
        self.set_mdc(false)?;
        self.clk_delay();
        self.set_mdc(true)?;

        // Extra clock
        self.clk_delay();
        self.set_mdc(false)?;
        self.clk_delay();
        self.set_mdc(true)?;

        self.mdio.set_input().map_err(|_| IoError::Pin)?;
        self.mdc.set_input().map_err(|_| IoError::Pin)
    }

    // =========================================================================
    // Bit and Byte Transfer
    // =========================================================================

    /// Shift out the low `len` bits of `data`, MSB first
    fn write_bits(&mut self, data: u32, len: u32) -> IoResult<()> {
        for bit in (0..len).rev() {
            self.clk_delay();
            self.set_mdio(data & (1 << bit) != 0)?;
            self.clk_delay();
            self.set_mdc(true)?;
            self.clk_delay();
            self.set_mdc(false)?;
        }
        Ok(())
    }

    /// Shift in `len` bits, MSB first, sampling while the clock is high
    fn read_bits(&mut self, len: u32) -> IoResult<u32> {
        self.mdio.set_input().map_err(|_| IoError::Pin)?;

        let mut data = 0u32;
        for bit in (0..len).rev() {
            self.clk_delay();
            self.set_mdc(true)?;
            self.clk_delay();
            let high = self.mdio.is_high().map_err(|_| IoError::Pin)?;
            self.set_mdc(false)?;
            if high {
                data |= 1 << bit;
            }
        }

        self.mdio.set_output(false).map_err(|_| IoError::Pin)?;
        Ok(data)
    }

    /// Poll the acknowledge bit at most [`SMI_ACK_RETRY_COUNT`] times
    fn wait_for_ack(&mut self) -> IoResult<()> {
        for _ in 0..SMI_ACK_RETRY_COUNT {
            if self.read_bits(1)? == 0 {
                return Ok(());
            }
        }

        #[cfg(feature = "defmt")]
        defmt::warn!("SMI ACK timeout after {} polls", SMI_ACK_RETRY_COUNT);

        Err(IoError::AckTimeout)
    }

    fn write_byte(&mut self, data: u8) -> IoResult<()> {
        self.write_bits(u32::from(data), 8)?;
        self.wait_for_ack()
    }

    fn write_byte_noack(&mut self, data: u8) -> IoResult<()> {
        self.write_bits(u32::from(data), 8)
    }

    /// Read a data byte and answer with the given acknowledge bit
    fn read_byte(&mut self, ack: u32) -> IoResult<u8> {
        let data = self.read_bits(8)?;
        self.write_bits(ack, 1)?;
        Ok((data & 0xFF) as u8)
    }

    // =========================================================================
    // Register Transactions
    // =========================================================================

    fn send_address(&mut self, cmd: u8, addr: u16) -> IoResult<()> {
        self.write_byte(cmd)?;
        self.write_byte((addr & 0xFF) as u8)?;
        self.write_byte((addr >> 8) as u8)
    }

    fn read_sequence(&mut self, addr: u16) -> IoResult<u16> {
        self.send_address(self.config.cmd_read, addr)?;
        let lo = self.read_byte(0)?;
        let hi = self.read_byte(1)?;
        Ok(u16::from(lo) | (u16::from(hi) << 8))
    }

    fn write_sequence(&mut self, addr: u16, value: u16, ack: bool) -> IoResult<()> {
        self.send_address(self.config.cmd_write, addr)?;
        self.write_byte((value & 0xFF) as u8)?;
        if ack {
            self.write_byte((value >> 8) as u8)
        } else {
            self.write_byte_noack((value >> 8) as u8)
        }
    }

    /// Run `op` between START and STOP; STOP is issued even if `op` fails
    fn framed<R>(&mut self, op: impl FnOnce(&mut Self) -> IoResult<R>) -> IoResult<R> {
        let result = self.start().and_then(|()| op(self));
        let stopped = self.stop();
        let value = result?;
        stopped?;
        Ok(value)
    }
}

impl<C, I, D> Transport for SmiBus<C, I, D>
where
    C: SmiLine,
    I: SmiLine,
    D: DelayNs,
{
    fn read_reg(&mut self, addr: u16) -> Result<u16> {
        Ok(self.framed(|bus| bus.read_sequence(addr))?)
    }

    fn write_reg(&mut self, addr: u16, value: u16) -> Result<()> {
        Ok(self.framed(|bus| bus.write_sequence(addr, value, true))?)
    }

    fn write_reg_noack(&mut self, addr: u16, value: u16) -> Result<()> {
        Ok(self.framed(|bus| bus.write_sequence(addr, value, false))?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
