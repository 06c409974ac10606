//! Table Query Engine
//!
//! The chip keeps its ACL rules, ACL actions, VLAN4k entries and the
//! forwarding database in internal tables reached through one shared
//! access window: a bank of write registers, a bank of read registers, an
//! address register, a command register and a status register.
//!
//! Every query runs as one locked register sequence:
//!
//! 1. load the write window (entry data, or the search key for an L2
//!    lookup by MAC)
//! 2. load the address register (skipped for L2 lookup by MAC)
//! 3. write the command register and poll until the busy flag clears
//! 4. for the L2 table, check the hit flag and recover the entry address
//! 5. for reads, unload the read window
//!
//! The engine never interprets entry words; that is the job of the
//! codecs in [`crate::l2`], [`crate::acl`] and [`crate::vlan`].

use embedded_hal::delay::DelayNs;

use crate::constants::{TABLE_POLL_INTERVAL_US, TABLE_POLL_TIMEOUT_US};
use crate::error::{Result, TableError, TableResult};
use crate::hal::Transport;
use crate::regmap::{RegisterBus, RegisterMap};
use crate::sync::RawMutex;

// =============================================================================
// Register Definitions
// =============================================================================

/// Table access window registers
pub mod regs {
    /// First register of the read window
    pub const READ_BASE: u16 = 0x0520;
    /// First register of the write window
    pub const WRITE_BASE: u16 = 0x0510;
    /// Widest entry the window can carry (words)
    pub const ENTRY_MAX_SIZE: usize = 10;

    /// Command register
    pub const CTRL: u16 = 0x0500;
    /// Source port filter (L2 next-unicast-on-port lookups)
    pub const CTRL_PORT_MASK: u16 = 0x0F00;
    /// Source port filter shift
    pub const CTRL_PORT_SHIFT: u16 = 8;
    /// Target table
    pub const CTRL_TARGET_MASK: u16 = 0x0007;
    /// Operation (0 = read, 1 = write)
    pub const CTRL_CMD_TYPE_MASK: u16 = 0x0008;
    /// Operation shift
    pub const CTRL_CMD_TYPE_SHIFT: u16 = 3;
    /// L2 lookup method
    pub const CTRL_METHOD_MASK: u16 = 0x0070;
    /// L2 lookup method shift
    pub const CTRL_METHOD_SHIFT: u16 = 4;

    /// Entry address register
    pub const ADDR: u16 = 0x0501;
    /// Entry address width
    pub const ADDR_MASK: u16 = 0x1FFF;

    /// Status register
    pub const STATUS: u16 = 0x0502;
    /// Address bit 11 of the resolved L2 entry
    pub const STATUS_ADDRESS_EXT: u16 = 0x4000;
    /// Command in progress
    pub const STATUS_BUSY: u16 = 0x2000;
    /// L2 lookup hit
    pub const STATUS_HIT: u16 = 0x1000;
    /// Address bit 12 of the resolved L2 entry
    pub const STATUS_TYPE: u16 = 0x0800;
    /// Address bits 0..10 of the resolved L2 entry
    pub const STATUS_ADDRESS_MASK: u16 = 0x07FF;
}

/// Largest source port the command register can filter on
pub const MAX_FILTER_PORT: u8 = (regs::CTRL_PORT_MASK >> regs::CTRL_PORT_SHIFT) as u8;

// =============================================================================
// Query Types
// =============================================================================

/// On-chip tables reachable through the access window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u16)]
pub enum Table {
    /// ACL rules (care and data rows)
    AclRule = 1,
    /// ACL actions
    AclAction = 2,
    /// VLAN4k table, indexed by VLAN ID
    Cvlan = 3,
    /// Forwarding database (2K hash table plus CAM)
    L2 = 4,
}

/// Table operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u16)]
pub enum TableOp {
    /// Read an entry into the read window
    Read = 0,
    /// Write the write window into an entry
    Write = 1,
}

/// Lookup method for L2 table reads
///
/// The `Next*` methods return the first matching entry strictly after the
/// given address, or the given address unchanged when no such entry
/// exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u16)]
pub enum L2Method {
    /// Search by key (MAC address, VLAN/FID, EFID)
    Mac = 0,
    /// Read the entry at an address
    Addr = 1,
    /// Next occupied entry of either kind
    Next = 2,
    /// Next unicast entry
    NextUc = 3,
    /// Next multicast entry
    NextMc = 4,
    /// Next unicast entry learned on a given source port
    NextUcPort = 7,
}

/// A single table request
///
/// For the L2 table the address is an in/out value: a successful query
/// replaces it with the address the chip resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TableQuery {
    table: Table,
    op: TableOp,
    addr: u16,
    method: L2Method,
    port: u8,
}

impl TableQuery {
    /// Read the entry at `addr` of an indexed table (L2: by address)
    pub const fn read(table: Table, addr: u16) -> Self {
        Self {
            table,
            op: TableOp::Read,
            addr,
            method: L2Method::Addr,
            port: 0,
        }
    }

    /// Write the entry at `addr` of an indexed table
    pub const fn write(table: Table, addr: u16) -> Self {
        Self {
            table,
            op: TableOp::Write,
            addr,
            method: L2Method::Addr,
            port: 0,
        }
    }

    /// L2 lookup with the given method starting from `addr`
    ///
    /// Use [`l2_next_uc_on_port`](Self::l2_next_uc_on_port) for the port
    /// filtered method; here the filter port is 0.
    pub const fn l2_read(method: L2Method, addr: u16) -> Self {
        Self {
            table: Table::L2,
            op: TableOp::Read,
            addr,
            method,
            port: 0,
        }
    }

    /// L2 lookup of the next unicast entry learned on `port`
    pub fn l2_next_uc_on_port(addr: u16, port: u8) -> TableResult<Self> {
        if port > MAX_FILTER_PORT {
            #[cfg(feature = "defmt")]
            defmt::warn!("L2 port filter {} does not fit the command register", port);

            return Err(TableError::PortFilterUnsupported);
        }

        Ok(Self {
            port,
            ..Self::l2_read(L2Method::NextUcPort, addr)
        })
    }

    /// L2 write by key; the chip picks the slot
    pub const fn l2_write() -> Self {
        Self {
            table: Table::L2,
            op: TableOp::Write,
            addr: 0,
            method: L2Method::Mac,
            port: 0,
        }
    }

    /// Switch the operation, keeping table and addressing
    pub fn set_op(&mut self, op: TableOp) {
        self.op = op;
    }

    /// Target table
    pub const fn table(&self) -> Table {
        self.table
    }

    /// Operation
    pub const fn op(&self) -> TableOp {
        self.op
    }

    /// Entry address (resolved address after a successful L2 query)
    pub const fn addr(&self) -> u16 {
        self.addr
    }

    /// L2 lookup method
    pub const fn method(&self) -> L2Method {
        self.method
    }

    /// Source port filter
    pub const fn port(&self) -> u8 {
        self.port
    }

    const fn is_l2_search_by_key(&self) -> bool {
        matches!(self.table, Table::L2) && matches!(self.method, L2Method::Mac)
    }

    /// Command register value for this query
    const fn command(&self) -> u16 {
        let mut cmd = (self.table as u16) & regs::CTRL_TARGET_MASK;
        cmd |= ((self.op as u16) << regs::CTRL_CMD_TYPE_SHIFT) & regs::CTRL_CMD_TYPE_MASK;

        if matches!(self.table, Table::L2) && matches!(self.op, TableOp::Read) {
            cmd |= ((self.method as u16) << regs::CTRL_METHOD_SHIFT) & regs::CTRL_METHOD_MASK;
            if matches!(self.method, L2Method::NextUcPort) {
                cmd |= ((self.port as u16) << regs::CTRL_PORT_SHIFT) & regs::CTRL_PORT_MASK;
            }
        }

        cmd
    }
}

/// Reassemble an L2 entry address from the status register
const fn l2_addr_from_status(status: u16) -> u16 {
    (status & regs::STATUS_ADDRESS_MASK)
        | (((status & regs::STATUS_ADDRESS_EXT) >> 14) << 11)
        | (((status & regs::STATUS_TYPE) >> 11) << 12)
}

// =============================================================================
// Query Execution
// =============================================================================

/// Execute `query` with the register map lock already held
///
/// On reads `entry` is filled from the read window; on writes it is
/// loaded into the write window. For an L2 lookup by key, `entry` carries
/// the key on input and the found entry on output.
pub fn query_locked<T, D>(
    bus: &mut RegisterBus<T, D>,
    query: &mut TableQuery,
    entry: &mut [u16],
) -> Result<()>
where
    T: Transport,
    D: DelayNs,
{
    if entry.len() > regs::ENTRY_MAX_SIZE {
        return Err(TableError::TooLarge.into());
    }

    let search_by_key = query.is_l2_search_by_key();

    // The write window doubles as the search key bank for L2 lookups by key
    let load_window =
        query.op == TableOp::Write || (query.op == TableOp::Read && search_by_key);
    if load_window {
        for (reg, word) in (regs::WRITE_BASE..).zip(entry.iter()) {
            bus.write(reg, *word)?;
        }
    }

    if !search_by_key {
        bus.write(regs::ADDR, query.addr & regs::ADDR_MASK)?;
    }

    let cmd = query.command();
    bus.write(regs::CTRL, cmd)?;
    bus.poll_until(
        regs::STATUS,
        |status| status & regs::STATUS_BUSY == 0,
        TABLE_POLL_INTERVAL_US,
        TABLE_POLL_TIMEOUT_US,
    )?;

    if query.table == Table::L2 {
        let status = bus.read(regs::STATUS)?;
        if status & regs::STATUS_HIT == 0 {
            #[cfg(feature = "defmt")]
            defmt::debug!("table: L2 miss (cmd {=u16:#x})", cmd);

            return Err(TableError::NotFound.into());
        }
        query.addr = l2_addr_from_status(status);
    }

    if query.op == TableOp::Read {
        for (i, (reg, word)) in (regs::READ_BASE..).zip(entry.iter_mut()).enumerate() {
            let mut value = bus.read(reg)?;
            // The last window register is wider than any entry field
            if i == regs::ENTRY_MAX_SIZE - 1 {
                value &= 0x000F;
            }
            *word = value;
        }
    }

    #[cfg(feature = "defmt")]
    defmt::debug!(
        "table: cmd {=u16:#x} addr {=u16} ({} words)",
        cmd,
        query.addr,
        entry.len()
    );

    Ok(())
}

/// Execute `query` under one acquisition of the register map lock
pub fn query<T, D, M>(map: &RegisterMap<T, D, M>, query: &mut TableQuery, entry: &mut [u16]) -> Result<()>
where
    T: Transport,
    D: DelayNs,
    M: RawMutex,
{
    if entry.len() > regs::ENTRY_MAX_SIZE {
        return Err(TableError::TooLarge.into());
    }

    map.locked(|bus| query_locked(bus, query, entry))
}

// =============================================================================
// Unit Tests
// =============================================================================
