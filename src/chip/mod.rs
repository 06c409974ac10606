//! Chip identification and hardware reset
//!
//! The family members share one register layout and are told apart by
//! an ID/version pair that is only readable while a magic value sits in
//! an otherwise unrelated register. Supported variants are kept in an
//! explicit [`ChipRegistry`] owned by the caller.
//!
//! # Example
//!
//! ```ignore
//! let registry = ChipRegistry::with_known_chips();
//! let info = chip::detect(&map, &registry)?;
//! ```

use embedded_hal::delay::DelayNs;

use crate::driver::config::SwitchConfig;
use crate::error::{ConfigError, ConfigResult, IoError, Result};
use crate::hal::Transport;
use crate::regmap::RegisterMap;
use crate::sync::RawMutex;

// =============================================================================
// Register Definitions
// =============================================================================

/// Identification and reset registers
pub mod regs {
    /// Unlocks the ID registers while it holds [`MAGIC_VALUE`]
    pub const MAGIC: u16 = 0x13C2;
    /// Unlock value
    pub const MAGIC_VALUE: u16 = 0x0249;

    /// Chip identifier
    pub const CHIP_ID: u16 = 0x1300;
    /// Chip silicon revision
    pub const CHIP_VER: u16 = 0x1301;

    /// Chip reset control
    pub const RESET: u16 = 0x1322;
    /// Software reset trigger
    pub const RESET_SW: u16 = 0x0002;
    /// Hardware reset trigger, self-clearing
    pub const RESET_HW: u16 = 0x0001;
}

/// Registry capacity
pub const MAX_CHIPS: usize = 8;

// =============================================================================
// Chip Info
// =============================================================================

/// Static description of one family member
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChipInfo {
    /// Human readable name
    pub name: &'static str,
    /// Value of the chip ID register
    pub chip_id: u16,
    /// Value of the chip version register
    pub chip_ver: u16,
}

impl ChipInfo {
    /// RTL8365MB-VC
    pub const RTL8365MB_VC: Self = Self::new("RTL8365MB-VC", 0x6367, 0x0040);
    /// RTL8367S
    pub const RTL8367S: Self = Self::new("RTL8367S", 0x6367, 0x00A0);
    /// RTL8367RB-VB
    pub const RTL8367RB_VB: Self = Self::new("RTL8367RB-VB", 0x6367, 0x0020);

    /// Describe a chip
    pub const fn new(name: &'static str, chip_id: u16, chip_ver: u16) -> Self {
        Self {
            name,
            chip_id,
            chip_ver,
        }
    }

    /// Whether this description matches an ID/version pair
    pub const fn matches(&self, chip_id: u16, chip_ver: u16) -> bool {
        self.chip_id == chip_id && self.chip_ver == chip_ver
    }
}

// =============================================================================
// Chip Registry
// =============================================================================

/// Fixed-capacity set of supported chips
#[derive(Debug, Clone)]
pub struct ChipRegistry {
    chips: [Option<ChipInfo>; MAX_CHIPS],
    len: usize,
}

impl Default for ChipRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ChipRegistry {
    /// Empty registry
    pub const fn new() -> Self {
        Self {
            chips: [None; MAX_CHIPS],
            len: 0,
        }
    }

    /// Registry holding every family member this crate knows about
    pub fn with_known_chips() -> Self {
        let mut registry = Self::new();
        for info in [ChipInfo::RTL8365MB_VC, ChipInfo::RTL8367S, ChipInfo::RTL8367RB_VB] {
            registry.chips[registry.len] = Some(info);
            registry.len += 1;
        }
        registry
    }

    /// Add a chip
    ///
    /// Fails with [`ConfigError::DuplicateChip`] if the ID/version pair is
    /// already registered and [`ConfigError::RegistryFull`] when there is
    /// no room left.
    pub fn register(&mut self, info: ChipInfo) -> ConfigResult<()> {
        if self.lookup(info.chip_id, info.chip_ver).is_some() {
            return Err(ConfigError::DuplicateChip);
        }
        let slot = self.chips.get_mut(self.len).ok_or(ConfigError::RegistryFull)?;
        *slot = Some(info);
        self.len += 1;
        Ok(())
    }

    /// Find the chip with the given ID/version pair
    pub fn lookup(&self, chip_id: u16, chip_ver: u16) -> Option<&ChipInfo> {
        self.iter().find(|info| info.matches(chip_id, chip_ver))
    }

    /// Registered chips in registration order
    pub fn iter(&self) -> impl Iterator<Item = &ChipInfo> {
        self.chips[..self.len].iter().flatten()
    }

    /// Number of registered chips
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether no chip is registered
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

// =============================================================================
// Detection
// =============================================================================

/// Read the chip ID and version
///
/// The magic register is cleared again before returning. The whole
/// sequence runs under one acquisition of the register map lock.
pub fn read_chip_id<T, D, M>(map: &RegisterMap<T, D, M>) -> Result<(u16, u16)>
where
    T: Transport,
    D: DelayNs,
    M: RawMutex,
{
    map.locked(|bus| {
        bus.write(regs::MAGIC, regs::MAGIC_VALUE)?;
        let id = bus.read(regs::CHIP_ID)?;
        let ver = bus.read(regs::CHIP_VER)?;
        bus.write(regs::MAGIC, 0)?;
        Ok((id, ver))
    })
}

/// Identify the chip behind `map`
pub fn detect<T, D, M>(map: &RegisterMap<T, D, M>, registry: &ChipRegistry) -> Result<ChipInfo>
where
    T: Transport,
    D: DelayNs,
    M: RawMutex,
{
    let (id, ver) = read_chip_id(map)?;

    match registry.lookup(id, ver) {
        Some(info) => {
            #[cfg(feature = "defmt")]
            defmt::info!("chip: found {=str} switch", info.name);

            Ok(*info)
        }
        None => {
            #[cfg(feature = "defmt")]
            defmt::error!("chip: unrecognized switch (id={=u16:#x}, ver={=u16:#x})", id, ver);

            Err(ConfigError::UnknownChip.into())
        }
    }
}

// =============================================================================
// Reset
// =============================================================================

/// Hardware reset
///
/// The chip restarts as soon as the reset bit lands, so the write is not
/// acknowledged. The settle time and the pauses between polls of the
/// self-clearing reset bit are slept on `delay` with the register map
/// unlocked; only the write and each poll read take the lock.
pub fn reset<T, D, M, S>(map: &RegisterMap<T, D, M>, delay: &mut S, config: &SwitchConfig) -> Result<()>
where
    T: Transport,
    D: DelayNs,
    M: RawMutex,
    S: DelayNs,
{
    map.write_noack(regs::RESET, regs::RESET_HW)?;
    delay.delay_ms(config.reset_settle_ms);

    let step = config.reset_poll_ms.max(1);
    let mut elapsed = 0u32;
    loop {
        let value = map.read(regs::RESET)?;
        if value & regs::RESET_HW == 0 {
            break;
        }
        if elapsed >= config.reset_timeout_ms {
            #[cfg(feature = "defmt")]
            defmt::error!("chip: reset bit stuck ({=u16:#x})", value);

            return Err(IoError::Timeout.into());
        }
        delay.delay_ms(step);
        elapsed = elapsed.saturating_add(step);
    }

    #[cfg(feature = "defmt")]
    defmt::info!("chip: reset complete");

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
