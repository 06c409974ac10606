//! Configuration types for the rtl8365mb switch core

use crate::constants::{
    RESET_POLL_MS, RESET_SETTLE_MS, RESET_TIMEOUT_MS, SMI_CLK_DELAY_NS, SMI_CMD_READ,
    SMI_CMD_WRITE,
};

// =============================================================================
// SMI Transport Configuration
// =============================================================================

/// Per-variant constants of the bit-banged SMI protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SmiConfig {
    /// Settle delay after every clock or data edge (nanoseconds)
    pub clk_delay_ns: u32,
    /// Command byte that opens a register read
    pub cmd_read: u8,
    /// Command byte that opens a register write
    pub cmd_write: u8,
}

impl Default for SmiConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl SmiConfig {
    /// Timing and commands of the RTL8365MB family
    pub const RTL8365MB: Self = Self {
        clk_delay_ns: SMI_CLK_DELAY_NS,
        cmd_read: SMI_CMD_READ,
        cmd_write: SMI_CMD_WRITE,
    };

    /// Create a configuration with the RTL8365MB defaults
    #[must_use]
    pub const fn new() -> Self {
        Self::RTL8365MB
    }

    /// Set the clock settle delay
    #[must_use]
    pub const fn with_clk_delay_ns(mut self, delay_ns: u32) -> Self {
        self.clk_delay_ns = delay_ns;
        self
    }

    /// Set the read command byte
    #[must_use]
    pub const fn with_cmd_read(mut self, cmd: u8) -> Self {
        self.cmd_read = cmd;
        self
    }

    /// Set the write command byte
    #[must_use]
    pub const fn with_cmd_write(mut self, cmd: u8) -> Self {
        self.cmd_write = cmd;
        self
    }
}

// =============================================================================
// Switch Configuration
// =============================================================================

/// Switch handle configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SwitchConfig {
    /// Issue a hardware reset before identifying the chip
    pub reset_on_probe: bool,
    /// Quiet time after the reset bit is written (milliseconds)
    pub reset_settle_ms: u32,
    /// Time allowed for the reset bit to self-clear (milliseconds)
    pub reset_timeout_ms: u32,
    /// Poll interval while waiting for the reset bit (milliseconds)
    pub reset_poll_ms: u32,
}

impl Default for SwitchConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl SwitchConfig {
    /// Create a new configuration with defaults
    #[must_use]
    pub const fn new() -> Self {
        Self {
            reset_on_probe: false,
            reset_settle_ms: RESET_SETTLE_MS,
            reset_timeout_ms: RESET_TIMEOUT_MS,
            reset_poll_ms: RESET_POLL_MS,
        }
    }

    // =========================================================================
    // Builder Methods
    // =========================================================================

    /// Enable or disable the hardware reset during probe
    #[must_use]
    pub const fn with_reset_on_probe(mut self, enabled: bool) -> Self {
        self.reset_on_probe = enabled;
        self
    }

    /// Set the post-reset settle time
    #[must_use]
    pub const fn with_reset_settle_ms(mut self, settle_ms: u32) -> Self {
        self.reset_settle_ms = settle_ms;
        self
    }

    /// Set the reset completion timeout
    #[must_use]
    pub const fn with_reset_timeout_ms(mut self, timeout_ms: u32) -> Self {
        self.reset_timeout_ms = timeout_ms;
        self
    }

    /// Set the reset poll interval
    ///
    /// A zero interval is treated as 1 ms so the reset wait stays bounded.
    #[must_use]
    pub const fn with_reset_poll_ms(mut self, poll_ms: u32) -> Self {
        self.reset_poll_ms = if poll_ms == 0 { 1 } else { poll_ms };
        self
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
