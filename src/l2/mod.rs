//! Forwarding database
//!
//! Typed access to the L2 table: lookups by key or by address, the
//! "next entry" searches, add/delete, table walks and the per-port flush
//! of learned entries.
//!
//! Operations here take the register map lock once per table query. The
//! read-then-write sequences of [`add_uc`], [`add_mc`], [`del_uc`] and
//! [`del_mc`] are not atomic on their own; callers that can race on the
//! same key serialize them with the switch's L2 lock (see
//! [`crate::driver::Switch`]).
//!
//! # Table walks
//!
//! The "next" lookups return the first matching entry strictly after the
//! given address and return the given address unchanged once the table is
//! exhausted. [`walk_uc`] and [`walk_mc`] stop on that non-advancing reply
//! or on the first address at or past [`LEARN_LIMIT_MAX`].

pub mod entry;

use embedded_hal::delay::DelayNs;

pub use entry::{is_multicast, L2Words, MacAddr, McEntry, McKey, UcEntry, UcKey, ENTRY_SIZE};

use crate::constants::{LEARN_LIMIT_MAX, MAX_NUM_PORTS, TABLE_POLL_INTERVAL_US, TABLE_POLL_TIMEOUT_US, VID_MAX};
use crate::error::{CodecError, ConfigError, Error, Result, TableError};
use crate::field;
use crate::hal::Transport;
use crate::regmap::RegisterMap;
use crate::sync::RawMutex;
use crate::table::{self, L2Method, TableOp, TableQuery};

// =============================================================================
// Flush Registers
// =============================================================================

/// Dynamic entry flush registers
pub mod flush_reg {
    /// Flush command for ports 0..7
    pub const PORT: u16 = 0x0A36;
    /// Per-port start bits
    pub const PORT_MASK: u16 = 0x00FF;
    /// Per-port busy bits
    pub const PORT_BUSY: u16 = 0xFF00;

    /// Flush command for ports 8..10
    pub const PORT_EXT: u16 = 0x0A35;
    /// Per-port start bits
    pub const PORT_EXT_MASK: u16 = 0x0007;
    /// Per-port busy bits
    pub const PORT_EXT_BUSY: u16 = 0x0038;

    /// VLAN/FID selector
    pub const CTRL1: u16 = 0x0A37;
    /// VLAN ID used by the port+VID mode
    pub const CTRL1_VID: u16 = 0x0FFF;

    /// Flush mode and entry type
    pub const CTRL2: u16 = 0x0A38;
    /// Flush mode
    pub const CTRL2_MODE: u16 = 0x0003;
    /// Flush every dynamic entry of the port
    pub const MODE_PORT: u16 = 0;
    /// Flush dynamic entries of the port in one VLAN
    pub const MODE_PORT_VID: u16 = 1;
    /// Entry type selector
    pub const CTRL2_TYPE: u16 = 0x0004;
    /// Dynamic entries only
    pub const TYPE_DYNAMIC: u16 = 0;
}

// =============================================================================
// Entry Kinds
// =============================================================================

/// Decoded L2 entry of either kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum L2Entry {
    /// Unicast entry
    Unicast(UcEntry),
    /// Multicast entry
    Multicast(McEntry),
}

impl L2Entry {
    fn decode(words: &L2Words) -> Self {
        if entry::words_are_multicast(words) {
            L2Entry::Multicast(McEntry::decode(words))
        } else {
            L2Entry::Unicast(UcEntry::decode(words))
        }
    }

    /// MAC address of the entry
    pub fn mac(&self) -> MacAddr {
        match self {
            L2Entry::Unicast(uc) => uc.key.mac,
            L2Entry::Multicast(mc) => mc.key.mac,
        }
    }
}

// =============================================================================
// Lookups
// =============================================================================

fn lookup<T, D, M>(map: &RegisterMap<T, D, M>, method: L2Method, addr: u16) -> Result<(u16, L2Words)>
where
    T: Transport,
    D: DelayNs,
    M: RawMutex,
{
    let mut query = TableQuery::l2_read(method, addr);
    let mut words = [0u16; ENTRY_SIZE];
    table::query(map, &mut query, &mut words)?;
    Ok((query.addr(), words))
}

/// Look up a unicast entry by key
pub fn get_uc<T, D, M>(map: &RegisterMap<T, D, M>, key: &UcKey) -> Result<UcEntry>
where
    T: Transport,
    D: DelayNs,
    M: RawMutex,
{
    let mut words = UcEntry::from_key(*key).encode()?;
    let mut query = TableQuery::l2_read(L2Method::Mac, 0);
    table::query(map, &mut query, &mut words)?;
    Ok(UcEntry::decode(&words))
}

/// Look up a multicast entry by key
pub fn get_mc<T, D, M>(map: &RegisterMap<T, D, M>, key: &McKey) -> Result<McEntry>
where
    T: Transport,
    D: DelayNs,
    M: RawMutex,
{
    let mut words = McEntry::from_key(*key).encode()?;
    let mut query = TableQuery::l2_read(L2Method::Mac, 0);
    table::query(map, &mut query, &mut words)?;
    Ok(McEntry::decode(&words))
}

/// Read the unicast entry at `addr`
///
/// Returns [`TableError::KindMismatch`] if the slot holds a multicast entry.
pub fn get_uc_by_addr<T, D, M>(map: &RegisterMap<T, D, M>, addr: u16) -> Result<UcEntry>
where
    T: Transport,
    D: DelayNs,
    M: RawMutex,
{
    let (_, words) = lookup(map, L2Method::Addr, addr)?;
    match L2Entry::decode(&words) {
        L2Entry::Unicast(uc) => Ok(uc),
        L2Entry::Multicast(_) => {
            #[cfg(feature = "defmt")]
            defmt::warn!("l2: slot {=u16} holds a multicast entry", addr);

            Err(TableError::KindMismatch.into())
        }
    }
}

/// Read the multicast entry at `addr`
///
/// Returns [`TableError::KindMismatch`] if the slot holds a unicast entry.
pub fn get_mc_by_addr<T, D, M>(map: &RegisterMap<T, D, M>, addr: u16) -> Result<McEntry>
where
    T: Transport,
    D: DelayNs,
    M: RawMutex,
{
    let (_, words) = lookup(map, L2Method::Addr, addr)?;
    match L2Entry::decode(&words) {
        L2Entry::Multicast(mc) => Ok(mc),
        L2Entry::Unicast(_) => {
            #[cfg(feature = "defmt")]
            defmt::warn!("l2: slot {=u16} holds a unicast entry", addr);

            Err(TableError::KindMismatch.into())
        }
    }
}

/// Next occupied entry after `addr`, with its address
pub fn get_next<T, D, M>(map: &RegisterMap<T, D, M>, addr: u16) -> Result<(u16, L2Entry)>
where
    T: Transport,
    D: DelayNs,
    M: RawMutex,
{
    let (next, words) = lookup(map, L2Method::Next, addr)?;
    Ok((next, L2Entry::decode(&words)))
}

/// Next unicast entry after `addr`, with its address
pub fn get_next_uc<T, D, M>(map: &RegisterMap<T, D, M>, addr: u16) -> Result<(u16, UcEntry)>
where
    T: Transport,
    D: DelayNs,
    M: RawMutex,
{
    let (next, words) = lookup(map, L2Method::NextUc, addr)?;
    Ok((next, UcEntry::decode(&words)))
}

/// Next unicast entry after `addr` learned on `port`, with its address
pub fn get_next_uc_on_port<T, D, M>(
    map: &RegisterMap<T, D, M>,
    addr: u16,
    port: u8,
) -> Result<(u16, UcEntry)>
where
    T: Transport,
    D: DelayNs,
    M: RawMutex,
{
    let mut query = TableQuery::l2_next_uc_on_port(addr, port)?;
    let mut words = [0u16; ENTRY_SIZE];
    table::query(map, &mut query, &mut words)?;
    Ok((query.addr(), UcEntry::decode(&words)))
}

/// Next multicast entry after `addr`, with its address
pub fn get_next_mc<T, D, M>(map: &RegisterMap<T, D, M>, addr: u16) -> Result<(u16, McEntry)>
where
    T: Transport,
    D: DelayNs,
    M: RawMutex,
{
    let (next, words) = lookup(map, L2Method::NextMc, addr)?;
    Ok((next, McEntry::decode(&words)))
}

// =============================================================================
// Add / Delete
// =============================================================================

/// Write `words` by key, confirming a newly created entry landed
///
/// The chip reports no hash bucket overflow on the write itself, so a
/// new entry is read back; a miss on that read means the bucket was full.
fn add_words<T, D, M>(map: &RegisterMap<T, D, M>, words: &L2Words) -> Result<u16>
where
    T: Transport,
    D: DelayNs,
    M: RawMutex,
{
    let mut query = TableQuery::l2_read(L2Method::Mac, 0);
    let mut scratch = *words;
    let new_entry = match table::query(map, &mut query, &mut scratch) {
        Ok(()) => false,
        Err(Error::Table(TableError::NotFound)) => true,
        Err(e) => return Err(e),
    };

    let mut query = TableQuery::l2_write();
    let mut data = *words;
    table::query(map, &mut query, &mut data)?;

    if new_entry {
        query.set_op(TableOp::Read);
        let mut data = *words;
        match table::query(map, &mut query, &mut data) {
            Ok(()) => {}
            Err(Error::Table(TableError::NotFound)) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("l2: no room for new entry");

                return Err(TableError::NoSpace.into());
            }
            Err(e) => return Err(e),
        }

        #[cfg(feature = "defmt")]
        defmt::debug!("l2: added entry at {=u16}", query.addr());
    }

    Ok(query.addr())
}

/// Add or update a unicast entry
pub fn add_uc<T, D, M>(map: &RegisterMap<T, D, M>, uc: &UcEntry) -> Result<()>
where
    T: Transport,
    D: DelayNs,
    M: RawMutex,
{
    let words = uc.encode()?;
    add_words(map, &words).map(|_| ())
}

/// Add or update a multicast entry
pub fn add_mc<T, D, M>(map: &RegisterMap<T, D, M>, mc: &McEntry) -> Result<()>
where
    T: Transport,
    D: DelayNs,
    M: RawMutex,
{
    let words = mc.encode()?;
    add_words(map, &words).map(|_| ())
}

fn del_words<T, D, M>(map: &RegisterMap<T, D, M>, key_words: &L2Words) -> Result<()>
where
    T: Transport,
    D: DelayNs,
    M: RawMutex,
{
    let mut query = TableQuery::l2_read(L2Method::Mac, 0);
    let mut scratch = *key_words;
    table::query(map, &mut query, &mut scratch)?;

    // A key with every value field cleared invalidates the slot
    let mut query = TableQuery::l2_write();
    let mut data = *key_words;
    table::query(map, &mut query, &mut data)
}

/// Delete a unicast entry
///
/// Returns [`TableError::NotFound`] when no entry has this key.
pub fn del_uc<T, D, M>(map: &RegisterMap<T, D, M>, key: &UcKey) -> Result<()>
where
    T: Transport,
    D: DelayNs,
    M: RawMutex,
{
    let words = UcEntry::from_key(*key).encode()?;
    del_words(map, &words)
}

/// Delete a multicast entry
///
/// Returns [`TableError::NotFound`] when no entry has this key.
pub fn del_mc<T, D, M>(map: &RegisterMap<T, D, M>, key: &McKey) -> Result<()>
where
    T: Transport,
    D: DelayNs,
    M: RawMutex,
{
    let words = McEntry::from_key(*key).encode()?;
    del_words(map, &words)
}

// =============================================================================
// Walks
// =============================================================================

fn walk<T, D, M, E, N, F>(map: &RegisterMap<T, D, M>, first: E, mut next: N, mut f: F) -> Result<()>
where
    T: Transport,
    D: DelayNs,
    M: RawMutex,
    E: FnOnce(&RegisterMap<T, D, M>) -> Result<Option<L2Entry>>,
    N: FnMut(&RegisterMap<T, D, M>, u16) -> Result<(u16, L2Entry)>,
    F: FnMut(u16, L2Entry),
{
    let mut visited = 0u16;

    // The "next" searches start strictly after their seed, so slot 0 is
    // probed on its own
    if let Some(entry) = first(map)? {
        f(0, entry);
        visited += 1;
    }

    let mut cursor = 0u16;
    while visited < LEARN_LIMIT_MAX {
        let (addr, entry) = match next(map, cursor) {
            Ok(found) => found,
            Err(Error::Table(TableError::NotFound)) => break,
            Err(e) => return Err(e),
        };
        // Wrapped around, or ran past the learnable address range
        if addr <= cursor || addr >= LEARN_LIMIT_MAX {
            break;
        }

        f(addr, entry);
        visited += 1;
        cursor = addr;
    }

    #[cfg(feature = "defmt")]
    defmt::debug!("l2: walk visited {=u16} entries", visited);

    Ok(())
}

fn probe_slot_zero<T, D, M, G, E>(map: &RegisterMap<T, D, M>, get: G) -> Result<Option<E>>
where
    G: FnOnce(&RegisterMap<T, D, M>) -> Result<E>,
{
    match get(map) {
        Ok(entry) => Ok(Some(entry)),
        Err(Error::Table(TableError::NotFound | TableError::KindMismatch)) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Visit every unicast entry in address order
pub fn walk_uc<T, D, M, F>(map: &RegisterMap<T, D, M>, mut f: F) -> Result<()>
where
    T: Transport,
    D: DelayNs,
    M: RawMutex,
    F: FnMut(u16, &UcEntry),
{
    walk(
        map,
        |map| Ok(probe_slot_zero(map, |map| get_uc_by_addr(map, 0))?.map(L2Entry::Unicast)),
        |map, cursor| get_next_uc(map, cursor).map(|(a, uc)| (a, L2Entry::Unicast(uc))),
        |addr, entry| {
            if let L2Entry::Unicast(uc) = entry {
                f(addr, &uc);
            }
        },
    )
}

/// Visit every multicast entry in address order
pub fn walk_mc<T, D, M, F>(map: &RegisterMap<T, D, M>, mut f: F) -> Result<()>
where
    T: Transport,
    D: DelayNs,
    M: RawMutex,
    F: FnMut(u16, &McEntry),
{
    walk(
        map,
        |map| Ok(probe_slot_zero(map, |map| get_mc_by_addr(map, 0))?.map(L2Entry::Multicast)),
        |map, cursor| get_next_mc(map, cursor).map(|(a, mc)| (a, L2Entry::Multicast(mc))),
        |addr, entry| {
            if let L2Entry::Multicast(mc) = entry {
                f(addr, &mc);
            }
        },
    )
}

// =============================================================================
// Flush
// =============================================================================

/// Flush the dynamic entries learned on `port`
///
/// With a non-zero `vid` only entries of that VLAN are flushed. The whole
/// sequence runs under one register map lock acquisition.
pub fn flush<T, D, M>(map: &RegisterMap<T, D, M>, port: u8, vid: u16) -> Result<()>
where
    T: Transport,
    D: DelayNs,
    M: RawMutex,
{
    if port >= MAX_NUM_PORTS {
        return Err(ConfigError::InvalidPort.into());
    }
    if vid > VID_MAX {
        return Err(CodecError::Vid.into());
    }

    let mode = if vid != 0 {
        flush_reg::MODE_PORT_VID
    } else {
        flush_reg::MODE_PORT
    };
    let bit = 1u16 << port;

    map.locked(|bus| {
        bus.write(
            flush_reg::CTRL2,
            field::prep(flush_reg::CTRL2_MODE, mode)
                | field::prep(flush_reg::CTRL2_TYPE, flush_reg::TYPE_DYNAMIC),
        )?;
        bus.write(flush_reg::CTRL1, field::prep(flush_reg::CTRL1_VID, vid))?;

        if port < 8 {
            let start = field::prep(flush_reg::PORT_MASK, bit & 0xFF);
            let busy = field::prep(flush_reg::PORT_BUSY, bit & 0xFF);
            bus.write(flush_reg::PORT, start)?;
            bus.poll_until(
                flush_reg::PORT,
                |v| v & busy == 0,
                TABLE_POLL_INTERVAL_US,
                TABLE_POLL_TIMEOUT_US,
            )?;
        } else {
            let start = field::prep(flush_reg::PORT_EXT_MASK, bit >> 8);
            let busy = field::prep(flush_reg::PORT_EXT_BUSY, bit >> 8);
            bus.write(flush_reg::PORT_EXT, start)?;
            bus.poll_until(
                flush_reg::PORT_EXT,
                |v| v & busy == 0,
                TABLE_POLL_INTERVAL_US,
                TABLE_POLL_TIMEOUT_US,
            )?;
        }

        #[cfg(feature = "defmt")]
        defmt::debug!("l2: flushed port {} vid {=u16}", port, vid);

        Ok(())
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
