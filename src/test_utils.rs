//! Testing utilities and mock implementations
//!
//! This module provides mock implementations for testing the switch core
//! on the host without hardware access.
//!
//! Only available when running `cargo test`.

// Note: The #[cfg(test)] attribute is applied in lib.rs where this module is declared
#![allow(missing_docs)]
#![allow(clippy::std_instead_of_core, clippy::std_instead_of_alloc)]

extern crate std;

use core::cell::RefCell;
use core::sync::atomic::{AtomicU64, Ordering};
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use std::sync::{Arc, Mutex, MutexGuard};
use std::vec::Vec;

use embedded_hal::digital::{ErrorKind, ErrorType, InputPin, OutputPin};

use crate::acl;
use crate::chip;
use crate::constants::LEARN_LIMIT_MAX;
use crate::error::{IoError, Result};
use crate::hal::Transport;
use crate::hal::mdio::MdioBus;
use crate::hal::smi::SmiLine;
use crate::l2::flush_reg;
use crate::table::regs as table_regs;

// =============================================================================
// Mock MDIO Bus
// =============================================================================

/// Mock MDIO bus for testing the indirect transport without hardware
///
/// This allows setting up register values, verifying writes and reads,
/// and injecting a bus failure after a given number of operations.
///
/// # Example
///
/// ```ignore
/// let mdio = MockMdioBus::new();
/// mdio.set_register(0, 0x1F, 0x6367);
///
/// let mut transport = IndirectMdio::new(mdio, 0);
/// assert_eq!(transport.read_reg(0x1300).unwrap(), 0x6367);
/// ```
#[derive(Debug, Default)]
pub struct MockMdioBus {
    /// Register values: (phy_addr, reg_addr) -> value
    registers: RefCell<HashMap<(u8, u8), u16>>,
    /// Record of writes: (phy_addr, reg_addr, value)
    write_log: RefCell<Vec<(u8, u8, u16)>>,
    /// Record of reads: (phy_addr, reg_addr)
    read_log: RefCell<Vec<(u8, u8)>>,
    /// Operations left before the bus starts failing
    ops_left: RefCell<Option<usize>>,
}

impl MockMdioBus {
    /// Create a new mock MDIO bus
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a register value
    pub fn set_register(&self, phy_addr: u8, reg_addr: u8, value: u16) {
        self.registers
            .borrow_mut()
            .insert((phy_addr, reg_addr), value);
    }

    /// Get the current value of a register (for test verification)
    pub fn get_register(&self, phy_addr: u8, reg_addr: u8) -> Option<u16> {
        self.registers.borrow().get(&(phy_addr, reg_addr)).copied()
    }

    /// Get all writes that have been made
    pub fn get_writes(&self) -> Vec<(u8, u8, u16)> {
        self.write_log.borrow().clone()
    }

    /// Get all reads that have been made
    pub fn get_reads(&self) -> Vec<(u8, u8)> {
        self.read_log.borrow().clone()
    }

    /// Let `ops` reads or writes succeed, then fail every later one
    pub fn fail_after(&self, ops: usize) {
        *self.ops_left.borrow_mut() = Some(ops);
    }

    fn take_op(&self) -> Result<()> {
        let mut ops_left = self.ops_left.borrow_mut();
        match ops_left.as_mut() {
            Some(0) => Err(IoError::Bus.into()),
            Some(n) => {
                *n -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }
}

impl MdioBus for MockMdioBus {
    fn read(&mut self, phy_addr: u8, reg_addr: u8) -> Result<u16> {
        self.take_op()?;
        self.read_log.borrow_mut().push((phy_addr, reg_addr));

        // Return from register map (default 0 if not set)
        Ok(self.get_register(phy_addr, reg_addr).unwrap_or(0))
    }

    fn write(&mut self, phy_addr: u8, reg_addr: u8, value: u16) -> Result<()> {
        self.take_op()?;
        self.write_log
            .borrow_mut()
            .push((phy_addr, reg_addr, value));
        self.set_register(phy_addr, reg_addr, value);
        Ok(())
    }
}

// =============================================================================
// Mock Delay
// =============================================================================

/// Mock delay for testing without actual timing
///
/// Records delays for verification without actually waiting. Clones share
/// the counter, so a test can keep one while the code under test owns
/// another.
#[derive(Debug, Clone, Default)]
pub struct MockDelay {
    /// Total nanoseconds delayed
    total_ns: Arc<AtomicU64>,
    /// Also block the calling thread for the requested time
    sleep: bool,
}

impl MockDelay {
    /// Create a new mock delay
    pub fn new() -> Self {
        Self::default()
    }

    /// Mock delay that really sleeps, for tests that race other threads
    pub fn sleeping() -> Self {
        Self {
            sleep: true,
            ..Self::default()
        }
    }

    fn add(&self, ns: u64) {
        self.total_ns.fetch_add(ns, Ordering::SeqCst);
        if self.sleep {
            std::thread::sleep(std::time::Duration::from_nanos(ns));
        }
    }

    /// Get total nanoseconds that were "delayed"
    pub fn total_ns(&self) -> u64 {
        self.total_ns.load(Ordering::SeqCst)
    }

    /// Get total milliseconds that were "delayed"
    pub fn total_ms(&self) -> u64 {
        self.total_ns() / 1_000_000
    }

    /// Reset the delay counter
    pub fn reset(&self) {
        self.total_ns.store(0, Ordering::SeqCst);
    }
}

impl embedded_hal::delay::DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.add(u64::from(ns));
    }

    fn delay_us(&mut self, us: u32) {
        self.add(u64::from(us) * 1_000);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.add(u64::from(ms) * 1_000_000);
    }
}

// =============================================================================
// Mock SMI Lines
// =============================================================================

/// Shared state of the two mock SMI lines
///
/// Records the MDIO level at every MDC rising edge (`None` while MDIO is
/// released) and answers MDIO samples from a script, falling back to the
/// idle level once the script runs dry.
#[derive(Debug, Default)]
pub struct SmiWire {
    mdc_output: bool,
    mdc_level: bool,
    mdio_output: bool,
    mdio_level: bool,
    idle_level: bool,
    script: VecDeque<bool>,
    edges: Vec<Option<bool>>,
    samples: usize,
    fail: bool,
}

impl SmiWire {
    /// Level MDIO reads as once the script is exhausted
    pub fn set_idle_level(&mut self, high: bool) {
        self.idle_level = high;
    }

    /// Queue one acknowledge (MDIO low)
    pub fn script_ack(&mut self) {
        self.script.push_back(false);
    }

    /// Queue eight data bits, MSB first
    pub fn script_byte(&mut self, byte: u8) {
        for bit in (0..8).rev() {
            self.script.push_back(byte & (1 << bit) != 0);
        }
    }

    /// Queue a single bit
    pub fn script_bit(&mut self, high: bool) {
        self.script.push_back(high);
    }

    /// MDIO levels at each MDC rising edge
    pub fn edges(&self) -> &[Option<bool>] {
        &self.edges
    }

    /// Number of MDIO samples taken while MDIO was released
    pub fn samples(&self) -> usize {
        self.samples
    }

    /// Whether MDC is configured as an input
    pub fn mdc_released(&self) -> bool {
        !self.mdc_output
    }

    /// Whether MDIO is configured as an input
    pub fn mdio_released(&self) -> bool {
        !self.mdio_output
    }

    /// Make every line operation fail
    pub fn fail_pins(&mut self, fail: bool) {
        self.fail = fail;
    }

    fn drive_mdc(&mut self, high: bool) {
        if high && !self.mdc_level {
            let level = if self.mdio_output {
                Some(self.mdio_level)
            } else {
                None
            };
            self.edges.push(level);
        }
        self.mdc_level = high;
    }

    fn sample_mdio(&mut self) -> bool {
        if self.mdio_output {
            return self.mdio_level;
        }
        self.samples += 1;
        self.script.pop_front().unwrap_or(self.idle_level)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SmiRole {
    Mdc,
    Mdio,
}

/// One end of the mock SMI wire
#[derive(Debug)]
pub struct MockSmiLine {
    wire: Rc<RefCell<SmiWire>>,
    role: SmiRole,
}

/// Create the MDC and MDIO lines plus a handle to their shared state
pub fn mock_smi_lines() -> (MockSmiLine, MockSmiLine, Rc<RefCell<SmiWire>>) {
    let wire = Rc::new(RefCell::new(SmiWire::default()));
    let mdc = MockSmiLine {
        wire: Rc::clone(&wire),
        role: SmiRole::Mdc,
    };
    let mdio = MockSmiLine {
        wire: Rc::clone(&wire),
        role: SmiRole::Mdio,
    };
    (mdc, mdio, wire)
}

impl MockSmiLine {
    fn apply(&mut self, output: Option<bool>, level: Option<bool>) -> core::result::Result<(), ErrorKind> {
        let mut wire = self.wire.borrow_mut();
        if wire.fail {
            return Err(ErrorKind::Other);
        }
        match self.role {
            SmiRole::Mdc => {
                if let Some(output) = output {
                    wire.mdc_output = output;
                }
                if let Some(high) = level {
                    wire.drive_mdc(high);
                }
            }
            SmiRole::Mdio => {
                if let Some(output) = output {
                    wire.mdio_output = output;
                }
                if let Some(high) = level {
                    wire.mdio_level = high;
                }
            }
        }
        Ok(())
    }
}

impl ErrorType for MockSmiLine {
    type Error = ErrorKind;
}

impl OutputPin for MockSmiLine {
    fn set_low(&mut self) -> core::result::Result<(), Self::Error> {
        self.apply(None, Some(false))
    }

    fn set_high(&mut self) -> core::result::Result<(), Self::Error> {
        self.apply(None, Some(true))
    }
}

impl InputPin for MockSmiLine {
    fn is_high(&mut self) -> core::result::Result<bool, Self::Error> {
        let mut wire = self.wire.borrow_mut();
        if wire.fail {
            return Err(ErrorKind::Other);
        }
        Ok(match self.role {
            SmiRole::Mdc => wire.mdc_level,
            SmiRole::Mdio => wire.sample_mdio(),
        })
    }

    fn is_low(&mut self) -> core::result::Result<bool, Self::Error> {
        self.is_high().map(|high| !high)
    }
}

impl SmiLine for MockSmiLine {
    fn set_output(&mut self, high: bool) -> core::result::Result<(), Self::Error> {
        self.apply(Some(true), Some(high))
    }

    fn set_input(&mut self) -> core::result::Result<(), Self::Error> {
        self.apply(Some(false), None)
    }
}

// =============================================================================
// Mock Switch
// =============================================================================

const L2_SLOTS: usize = LEARN_LIMIT_MAX as usize;
const WINDOW: usize = table_regs::ENTRY_MAX_SIZE;
const L2_WORDS: usize = 6;

const TARGET_ACL_RULE: u16 = 1;
const TARGET_ACL_ACTION: u16 = 2;
const TARGET_L2: u16 = 4;

const METHOD_MAC: u16 = 0;
const METHOD_ADDR: u16 = 1;
const METHOD_NEXT: u16 = 2;
const METHOD_NEXT_UC: u16 = 3;
const METHOD_NEXT_MC: u16 = 4;
const METHOD_NEXT_UC_PORT: u16 = 7;

type L2Raw = [u16; L2_WORDS];

#[derive(Debug)]
struct SwitchState {
    registers: HashMap<u16, u16>,
    writes: Vec<(u16, u16)>,
    reads: Vec<u16>,
    noack_writes: Vec<(u16, u16)>,
    fail_io: bool,
    stuck_busy: bool,
    busy_polls: u32,
    busy_left: u32,
    tables: HashMap<(u16, u16), [u16; WINDOW]>,
    l2: Vec<Option<L2Raw>>,
    l2_full: bool,
    chip_id: (u16, u16),
    reset_polls: u32,
    reset_left: u32,
}

impl Default for SwitchState {
    fn default() -> Self {
        Self {
            registers: HashMap::new(),
            writes: Vec::new(),
            reads: Vec::new(),
            noack_writes: Vec::new(),
            fail_io: false,
            stuck_busy: false,
            busy_polls: 1,
            busy_left: 0,
            tables: HashMap::new(),
            l2: std::vec![None; L2_SLOTS],
            l2_full: false,
            chip_id: (0, 0),
            reset_polls: 0,
            reset_left: 0,
        }
    }
}

fn l2_is_multicast(words: &L2Raw) -> bool {
    (words[2] >> 8) & 0x01 != 0
}

fn l2_key(words: &L2Raw) -> (bool, [u16; 5]) {
    let mc = l2_is_multicast(words);
    let efid_fid = if mc { 0 } else { words[4] & 0x007F };
    (mc, [words[0], words[1], words[2], words[3] & 0x2FFF, efid_fid])
}

fn l2_is_valid(words: &L2Raw) -> bool {
    if l2_is_multicast(words) {
        words[4] & 0x00FF != 0 || words[3] & 0xC000 != 0 || words[5] & 0x0080 != 0
    } else {
        words[4] & 0x3800 != 0 || words[5] & 0x0020 != 0
    }
}

fn l2_port(words: &L2Raw) -> u16 {
    ((words[4] & 0x0700) >> 8) | ((words[3] & 0x8000) >> 12)
}

fn l2_hash(words: &L2Raw) -> usize {
    let (_, key) = l2_key(words);
    let mut h: u32 = 0x811C_9DC5;
    for word in key {
        h ^= u32::from(word);
        h = h.wrapping_mul(0x0100_0193);
    }
    (h as usize) % L2_SLOTS
}

fn status_for(addr: usize) -> u16 {
    let addr = addr as u16;
    table_regs::STATUS_HIT
        | (addr & table_regs::STATUS_ADDRESS_MASK)
        | (((addr >> 11) & 1) << 14)
        | (((addr >> 12) & 1) << 11)
}

impl SwitchState {
    fn reg(&self, addr: u16) -> u16 {
        self.registers.get(&addr).copied().unwrap_or(0)
    }

    fn window(&self, base: u16) -> [u16; WINDOW] {
        let mut words = [0u16; WINDOW];
        for (i, word) in words.iter_mut().enumerate() {
            *word = self.reg(base + i as u16);
        }
        words
    }

    fn key_window(&self) -> L2Raw {
        let mut words = [0u16; L2_WORDS];
        words.copy_from_slice(&self.window(table_regs::WRITE_BASE)[..L2_WORDS]);
        words
    }

    fn load_read_window(&mut self, words: &[u16]) {
        for i in 0..WINDOW {
            let value = words.get(i).copied().unwrap_or(0);
            self.registers.insert(table_regs::READ_BASE + i as u16, value);
        }
    }

    fn l2_find(&self, key_words: &L2Raw) -> Option<usize> {
        let key = l2_key(key_words);
        self.l2
            .iter()
            .position(|slot| slot.as_ref().is_some_and(|w| l2_key(w) == key))
    }

    fn l2_next(&self, after: usize, method: u16, port: u16) -> Option<usize> {
        (after + 1..self.l2.len()).find(|&i| {
            self.l2[i].as_ref().is_some_and(|w| match method {
                METHOD_NEXT => true,
                METHOD_NEXT_UC => !l2_is_multicast(w),
                METHOD_NEXT_MC => l2_is_multicast(w),
                METHOD_NEXT_UC_PORT => !l2_is_multicast(w) && l2_port(w) == port,
                _ => false,
            })
        })
    }

    /// Outcome of an L2 command: slot address on a hit
    fn l2_command(&mut self, write: bool, method: u16, port: u16) -> Option<usize> {
        if write {
            let words = self.key_window();
            let hash = l2_hash(&words);
            if let Some(slot) = self.l2_find(&words) {
                self.l2[slot] = if l2_is_valid(&words) { Some(words) } else { None };
                return Some(slot);
            }
            if l2_is_valid(&words) && !self.l2_full {
                let free = (0..L2_SLOTS)
                    .map(|i| (hash + i) % L2_SLOTS)
                    .find(|&i| self.l2[i].is_none());
                if let Some(slot) = free {
                    self.l2[slot] = Some(words);
                    return Some(slot);
                }
            }
            return Some(hash);
        }

        let addr = (self.reg(table_regs::ADDR) & table_regs::ADDR_MASK) as usize;
        let slot = match method {
            METHOD_MAC => self.l2_find(&self.key_window()),
            METHOD_ADDR => self.l2.get(addr).is_some_and(Option::is_some).then_some(addr),
            _ => Some(self.l2_next(addr, method, port).unwrap_or(addr)),
        };
        if let Some(slot) = slot {
            let words = self.l2.get(slot).copied().flatten().unwrap_or([0; L2_WORDS]);
            self.load_read_window(&words);
        }
        slot
    }

    fn table_command(&mut self, cmd: u16) {
        let target = cmd & table_regs::CTRL_TARGET_MASK;
        let write = cmd & table_regs::CTRL_CMD_TYPE_MASK != 0;
        let method = (cmd & table_regs::CTRL_METHOD_MASK) >> table_regs::CTRL_METHOD_SHIFT;
        let port = (cmd & table_regs::CTRL_PORT_MASK) >> table_regs::CTRL_PORT_SHIFT;
        let addr = self.reg(table_regs::ADDR) & table_regs::ADDR_MASK;

        self.busy_left = self.busy_polls;

        if target == TARGET_L2 {
            let status = match self.l2_command(write, method, port) {
                Some(slot) => status_for(slot),
                None => 0,
            };
            self.registers.insert(table_regs::STATUS, status);
            return;
        }

        if write {
            let words = self.window(table_regs::WRITE_BASE);
            self.tables.insert((target, addr), words);
        } else {
            let words = self.tables.get(&(target, addr)).copied().unwrap_or([0; WINDOW]);
            self.load_read_window(&words);
        }
        self.registers.insert(table_regs::STATUS, 0);
    }

    fn flush(&mut self, ports: u16) {
        let ctrl2 = self.reg(flush_reg::CTRL2);
        let by_vid = ctrl2 & flush_reg::CTRL2_MODE == flush_reg::MODE_PORT_VID;
        let vid = self.reg(flush_reg::CTRL1) & flush_reg::CTRL1_VID;

        for slot in self.l2.iter_mut() {
            let flush = slot.as_ref().is_some_and(|w| {
                !l2_is_multicast(w)
                    && w[5] & 0x0020 == 0
                    && ports & (1 << l2_port(w)) != 0
                    && (!by_vid || w[3] & 0x0FFF == vid)
            });
            if flush {
                *slot = None;
            }
        }
    }

    fn write(&mut self, addr: u16, value: u16) {
        self.registers.insert(addr, value);

        match addr {
            table_regs::CTRL => self.table_command(value),
            flush_reg::PORT => {
                self.flush(value & flush_reg::PORT_MASK);
                self.registers.insert(addr, 0);
            }
            flush_reg::PORT_EXT => {
                self.flush((value & flush_reg::PORT_EXT_MASK) << 8);
                self.registers.insert(addr, 0);
            }
            acl::regs::RESET if value & acl::regs::RESET_MASK != 0 => {
                self.tables
                    .retain(|(target, _), _| *target != TARGET_ACL_RULE && *target != TARGET_ACL_ACTION);
                self.registers.insert(addr, 0);
            }
            chip::regs::RESET if value & chip::regs::RESET_HW != 0 => {
                self.reset_left = self.reset_polls;
            }
            _ => {}
        }
    }

    fn read(&mut self, addr: u16) -> u16 {
        let value = self.reg(addr);
        match addr {
            table_regs::STATUS => {
                if self.stuck_busy {
                    value | table_regs::STATUS_BUSY
                } else if self.busy_left > 0 {
                    self.busy_left -= 1;
                    value | table_regs::STATUS_BUSY
                } else {
                    value
                }
            }
            flush_reg::PORT if self.stuck_busy => value | flush_reg::PORT_BUSY,
            flush_reg::PORT_EXT if self.stuck_busy => value | flush_reg::PORT_EXT_BUSY,
            chip::regs::CHIP_ID if self.reg(chip::regs::MAGIC) == chip::regs::MAGIC_VALUE => {
                self.chip_id.0
            }
            chip::regs::CHIP_VER if self.reg(chip::regs::MAGIC) == chip::regs::MAGIC_VALUE => {
                self.chip_id.1
            }
            chip::regs::RESET => {
                if self.reset_left > 0 {
                    self.reset_left -= 1;
                    value | chip::regs::RESET_HW
                } else {
                    let cleared = value & !chip::regs::RESET_HW;
                    self.registers.insert(addr, cleared);
                    cleared
                }
            }
            _ => value,
        }
    }
}

/// Behavioural model of the switch register file
///
/// Plain registers are a sparse map defaulting to 0. Writes to the table
/// control register run the command against modelled ACL, VLAN and L2
/// tables and raise the busy bit for a configurable number of status
/// reads. The L2 table is hashed: writes by key land in the first free
/// slot from the key's hash, and the "next" searches return the given
/// address unchanged when nothing follows it.
///
/// Clones share state, so a test keeps one handle while the code under
/// test owns another.
#[derive(Debug, Clone, Default)]
pub struct MockSwitch {
    state: Arc<Mutex<SwitchState>>,
}

impl MockSwitch {
    /// Create a new mock switch
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, SwitchState> {
        self.state.lock().unwrap()
    }

    /// Set a register without logging or side effects
    pub fn set_register(&self, addr: u16, value: u16) {
        self.state().registers.insert(addr, value);
    }

    /// Current value of a register (for test verification)
    pub fn get_register(&self, addr: u16) -> u16 {
        self.state().reg(addr)
    }

    /// Clear the read and write logs
    pub fn clear_log(&self) {
        let mut state = self.state();
        state.writes.clear();
        state.reads.clear();
        state.noack_writes.clear();
    }

    /// All acknowledged writes: (addr, value)
    pub fn writes(&self) -> Vec<(u16, u16)> {
        self.state().writes.clone()
    }

    /// All read addresses
    pub fn reads(&self) -> Vec<u16> {
        self.state().reads.clone()
    }

    /// All unacknowledged writes: (addr, value)
    pub fn noack_writes(&self) -> Vec<(u16, u16)> {
        self.state().noack_writes.clone()
    }

    /// Make every register access fail with a bus error
    pub fn fail_io(&self, fail: bool) {
        self.state().fail_io = fail;
    }

    /// Keep the table and flush busy bits set forever
    pub fn set_stuck_busy(&self, stuck: bool) {
        self.state().stuck_busy = stuck;
    }

    /// Number of status reads that report busy after each table command
    pub fn set_busy_polls(&self, polls: u32) {
        self.state().busy_polls = polls;
    }

    /// Place raw words in an L2 slot
    pub fn l2_insert(&self, addr: u16, words: [u16; 6]) {
        self.state().l2[addr as usize] = Some(words);
    }

    /// Raw words of an L2 slot
    pub fn l2_entry(&self, addr: u16) -> Option<[u16; 6]> {
        self.state().l2.get(addr as usize).copied().flatten()
    }

    /// Number of occupied L2 slots
    pub fn l2_len(&self) -> usize {
        self.state().l2.iter().filter(|slot| slot.is_some()).count()
    }

    /// Extend the L2 address space past the learn limit
    ///
    /// The extra slots are only reachable through [`l2_insert`](Self::l2_insert);
    /// hashed writes keep landing below the learn limit.
    pub fn set_l2_slots(&self, slots: usize) {
        self.state().l2.resize(slots, None);
    }

    /// Drop new L2 entries as if their hash bucket were full
    pub fn set_l2_full(&self, full: bool) {
        self.state().l2_full = full;
    }

    /// Values the ID registers show while unlocked
    pub fn set_chip_id(&self, chip_id: u16, chip_ver: u16) {
        self.state().chip_id = (chip_id, chip_ver);
    }

    /// Number of reads the hardware reset bit stays set after a reset
    pub fn set_reset_polls(&self, polls: u32) {
        self.state().reset_polls = polls;
    }
}

impl Transport for MockSwitch {
    fn read_reg(&mut self, addr: u16) -> Result<u16> {
        let mut state = self.state();
        if state.fail_io {
            return Err(IoError::Bus.into());
        }
        state.reads.push(addr);
        Ok(state.read(addr))
    }

    fn write_reg(&mut self, addr: u16, value: u16) -> Result<()> {
        let mut state = self.state();
        if state.fail_io {
            return Err(IoError::Bus.into());
        }
        state.writes.push((addr, value));
        state.write(addr, value);
        Ok(())
    }

    fn write_reg_noack(&mut self, addr: u16, value: u16) -> Result<()> {
        let mut state = self.state();
        if state.fail_io {
            return Err(IoError::Bus.into());
        }
        state.noack_writes.push((addr, value));
        state.write(addr, value);
        Ok(())
    }
}

// =============================================================================
// Test Assertions
// =============================================================================

/// Assert that an MDIO register was written with a specific value
#[macro_export]
macro_rules! assert_mdio_written {
    ($mdio:expr, $phy:expr, $reg:expr, $value:expr) => {
        let writes = $mdio.get_writes();
        assert!(
            writes
                .iter()
                .any(|w| w.0 == $phy && w.1 == $reg && w.2 == $value),
            "Expected write to PHY {} reg {} with value 0x{:04X}, but got: {:?}",
            $phy,
            $reg,
            $value,
            writes
        );
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::delay::DelayNs;

    #[test]
    fn mock_mdio_read_write() {
        let mut mdio = MockMdioBus::new();

        // Initially reads 0
        assert_eq!(mdio.read(0, 1).unwrap(), 0);

        mdio.set_register(0, 1, 0x1234);
        assert_eq!(mdio.read(0, 1).unwrap(), 0x1234);

        // Write updates the value and is logged
        mdio.write(0, 1, 0x5678).unwrap();
        assert_eq!(mdio.read(0, 1).unwrap(), 0x5678);
        assert_eq!(mdio.get_writes(), [(0, 1, 0x5678)]);
        assert_eq!(mdio.get_reads().len(), 3);
    }

    #[test]
    fn mock_mdio_failure_injection() {
        let mut mdio = MockMdioBus::new();
        mdio.fail_after(1);

        assert!(mdio.write(0, 1, 1).is_ok());
        assert!(mdio.read(0, 1).is_err());
        assert!(mdio.get_reads().is_empty());
    }

    #[test]
    fn mock_delay_tracking() {
        let delay = MockDelay::new();
        let mut handle = delay.clone();

        handle.delay_ns(1000);
        handle.delay_us(2);
        assert_eq!(delay.total_ns(), 3000);
        assert_eq!(delay.total_ms(), 0);

        handle.delay_ms(1);
        assert_eq!(delay.total_ms(), 1);

        delay.reset();
        assert_eq!(delay.total_ns(), 0);
    }

    #[test]
    fn mock_smi_records_edges_and_samples() {
        let (mut mdc, mut mdio, wire) = mock_smi_lines();
        wire.borrow_mut().script_bit(true);

        mdc.set_output(false).unwrap();
        mdio.set_output(true).unwrap();
        mdc.set_high().unwrap();
        mdc.set_low().unwrap();
        mdio.set_input().unwrap();
        mdc.set_high().unwrap();

        assert!(mdio.is_high().unwrap());
        assert!(!mdio.is_high().unwrap());
        assert_eq!(wire.borrow().edges(), [Some(true), None]);
        assert_eq!(wire.borrow().samples(), 2);
        assert!(wire.borrow().mdio_released());
        assert!(!wire.borrow().mdc_released());
    }

    #[test]
    fn mock_switch_status_encodes_high_addresses() {
        assert_eq!(status_for(0x0123), 0x1123);
        assert_eq!(status_for(2111), 0x1000 | 0x4000 | (2111 & 0x07FF));
    }

    #[test]
    fn mock_switch_busy_then_idle() {
        let mut chip = MockSwitch::new();
        chip.set_busy_polls(2);

        chip.write_reg(table_regs::CTRL, 0x0003).unwrap();

        let busy: Vec<bool> = (0..3)
            .map(|_| chip.read_reg(table_regs::STATUS).unwrap() & table_regs::STATUS_BUSY != 0)
            .collect();
        assert_eq!(busy, [true, true, false]);
    }
}
