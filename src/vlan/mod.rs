//! VLAN4k table and VLAN membership configs
//!
//! The VLAN4k table lives behind the table query engine and is addressed
//! by VLAN ID. The 32 membership configs are plain registers, four per
//! config, and are handed out by a [`VlanMcPool`].

pub mod entry;

use embedded_hal::delay::DelayNs;

pub use entry::{Vlan4k, VlanMc, VLAN4K_ENTRY_SIZE, VLANMC_ENTRY_SIZE};

use crate::constants::{NUM_MEMBER_CONFIGS, VID_MAX};
use crate::error::{CodecError, Result, TableError, TableResult};
use crate::hal::Transport;
use crate::regmap::RegisterMap;
use crate::sync::RawMutex;
use crate::table::{self, Table, TableOp, TableQuery};

/// Membership config registers
pub mod regs {
    /// First register of config 0
    pub const VLANMC_BASE: u16 = 0x0728;

    /// Register `word` of config `index`
    pub const fn vlanmc(index: u8, word: usize) -> u16 {
        VLANMC_BASE + (index as u16) * 4 + word as u16
    }
}

fn check_vid(vid: u16) -> Result<()> {
    if vid > VID_MAX {
        return Err(CodecError::Vid.into());
    }
    Ok(())
}

fn check_mc_index(index: u8) -> Result<()> {
    if index as usize >= NUM_MEMBER_CONFIGS {
        return Err(CodecError::McIndex.into());
    }
    Ok(())
}

// =============================================================================
// VLAN4k
// =============================================================================

/// Read the VLAN4k entry of `vid`
pub fn get_vlan4k<T, D, M>(map: &RegisterMap<T, D, M>, vid: u16) -> Result<Vlan4k>
where
    T: Transport,
    D: DelayNs,
    M: RawMutex,
{
    check_vid(vid)?;

    let mut words = [0u16; VLAN4K_ENTRY_SIZE];
    table::query(map, &mut TableQuery::read(Table::Cvlan, vid), &mut words)?;
    Ok(Vlan4k::decode(vid, &words))
}

/// Write the VLAN4k entry at `vlan.vid`
pub fn set_vlan4k<T, D, M>(map: &RegisterMap<T, D, M>, vlan: &Vlan4k) -> Result<()>
where
    T: Transport,
    D: DelayNs,
    M: RawMutex,
{
    let mut words = vlan.encode()?;
    table::query(map, &mut TableQuery::write(Table::Cvlan, vlan.vid), &mut words)?;

    #[cfg(feature = "defmt")]
    defmt::debug!("vlan: vid {} member {=u16:#x} untag {=u16:#x}", vlan.vid, vlan.member, vlan.untag);

    Ok(())
}

/// Read, modify and write back the VLAN4k entry of `vid`
///
/// The read and the write happen under one acquisition of the register
/// map lock. A VLAN ID change made by `f` is discarded. Returns the
/// entry as written.
pub fn update_vlan4k<T, D, M, F>(map: &RegisterMap<T, D, M>, vid: u16, f: F) -> Result<Vlan4k>
where
    T: Transport,
    D: DelayNs,
    M: RawMutex,
    F: FnOnce(&mut Vlan4k),
{
    check_vid(vid)?;

    map.locked(|bus| {
        let mut query = TableQuery::read(Table::Cvlan, vid);
        let mut words = [0u16; VLAN4K_ENTRY_SIZE];
        table::query_locked(bus, &mut query, &mut words)?;

        let mut vlan = Vlan4k::decode(vid, &words);
        f(&mut vlan);
        vlan.vid = vid;

        let mut words = vlan.encode()?;
        query.set_op(TableOp::Write);
        table::query_locked(bus, &mut query, &mut words)?;
        Ok(vlan)
    })
}

// =============================================================================
// Membership Configs
// =============================================================================

/// Read membership config `index`
pub fn get_vlanmc<T, D, M>(map: &RegisterMap<T, D, M>, index: u8) -> Result<VlanMc>
where
    T: Transport,
    D: DelayNs,
    M: RawMutex,
{
    check_mc_index(index)?;

    map.locked(|bus| {
        let mut words = [0u16; VLANMC_ENTRY_SIZE];
        for (i, word) in words.iter_mut().enumerate() {
            *word = bus.read(regs::vlanmc(index, i))?;
        }
        Ok(VlanMc::decode(&words))
    })
}

/// Write membership config `index`
pub fn set_vlanmc<T, D, M>(map: &RegisterMap<T, D, M>, index: u8, vlanmc: &VlanMc) -> Result<()>
where
    T: Transport,
    D: DelayNs,
    M: RawMutex,
{
    check_mc_index(index)?;
    let words = vlanmc.encode()?;

    map.locked(|bus| {
        for (i, word) in words.iter().enumerate() {
            bus.write(regs::vlanmc(index, i), *word)?;
        }
        Ok(())
    })
}

/// A membership config slot taken from a [`VlanMcPool`]
///
/// The slot index is fixed for the life of the handle; return it with
/// [`VlanMcPool::free`].
#[derive(Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct VlanMcEntry {
    index: u8,
    /// Config to program into the slot
    pub vlanmc: VlanMc,
}

impl VlanMcEntry {
    /// Slot index, as referenced by ACL CVLAN actions
    pub const fn index(&self) -> u8 {
        self.index
    }
}

/// Allocator for the membership config slots
#[derive(Debug, Clone, Default)]
pub struct VlanMcPool {
    used: u32,
}

impl VlanMcPool {
    /// Pool with every slot free
    pub const fn new() -> Self {
        Self { used: 0 }
    }

    /// Take the lowest free slot
    pub fn alloc(&mut self) -> TableResult<VlanMcEntry> {
        let index = (!self.used).trailing_zeros() as usize;
        if index >= NUM_MEMBER_CONFIGS {
            #[cfg(feature = "defmt")]
            defmt::warn!("vlan: no free membership config");

            return Err(TableError::NoSpace);
        }
        self.used |= 1 << index;

        Ok(VlanMcEntry {
            index: index as u8,
            vlanmc: VlanMc::default(),
        })
    }

    /// Return a slot to the pool
    pub fn free(&mut self, entry: VlanMcEntry) {
        self.used &= !(1 << entry.index);
    }

    /// Whether slot `index` is taken
    pub fn is_used(&self, index: u8) -> bool {
        (index as usize) < NUM_MEMBER_CONFIGS && self.used & (1 << index) != 0
    }

    /// Number of free slots
    pub fn available(&self) -> usize {
        NUM_MEMBER_CONFIGS - self.used.count_ones() as usize
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use std::vec::Vec;

    use super::*;
    use crate::error::Error;
    use crate::test_utils::{MockDelay, MockSwitch};

    fn new_map() -> (RegisterMap<MockSwitch, MockDelay>, MockSwitch) {
        let chip = MockSwitch::new();
        (RegisterMap::new(chip.clone(), MockDelay::new()), chip)
    }

    #[test]
    fn vlan4k_set_get_update() {
        let (map, _) = new_map();
        let vlan = Vlan4k {
            member: 0b111,
            untag: 0b111,
            fid: 0,
            ivl_en: true,
            ..Vlan4k::new(10)
        };

        set_vlan4k(&map, &vlan).unwrap();
        assert_eq!(get_vlan4k(&map, 10).unwrap(), vlan);

        let updated = update_vlan4k(&map, 10, |v| v.member |= 1 << 3).unwrap();

        assert_eq!(updated.member, 0b1111);
        assert_eq!(updated.untag, 0b111);
        assert_eq!(get_vlan4k(&map, 10).unwrap(), updated);
    }

    #[test]
    fn vlan4k_extension_ports_survive_the_table() {
        let (map, _) = new_map();
        let vlan = Vlan4k {
            member: 0x0601,
            untag: 0x0400,
            meter: 40,
            ..Vlan4k::new(VID_MAX)
        };

        set_vlan4k(&map, &vlan).unwrap();

        assert_eq!(get_vlan4k(&map, VID_MAX).unwrap(), vlan);
        assert_eq!(get_vlan4k(&map, 1).unwrap(), Vlan4k::new(1));
    }

    #[test]
    fn update_cannot_move_the_entry() {
        let (map, _) = new_map();

        let updated = update_vlan4k(&map, 20, |v| {
            v.vid = 30;
            v.member = 1;
        })
        .unwrap();

        assert_eq!(updated.vid, 20);
        assert_eq!(get_vlan4k(&map, 20).unwrap().member, 1);
        assert_eq!(get_vlan4k(&map, 30).unwrap().member, 0);
    }

    #[test]
    fn failed_update_writes_nothing() {
        let (map, chip) = new_map();
        chip.clear_log();

        let result = update_vlan4k(&map, 5, |v| v.fid = 16);

        assert_eq!(result, Err(Error::Codec(CodecError::Fid)));
        assert!(chip.writes().iter().all(|(reg, _)| *reg != table::regs::WRITE_BASE));
        assert_eq!(get_vlan4k(&map, 4096), Err(Error::Codec(CodecError::Vid)));
    }

    #[test]
    fn vlanmc_uses_plain_registers() {
        let (map, chip) = new_map();
        let mc = VlanMc {
            evid: 100,
            member: 0x0011,
            ..VlanMc::default()
        };

        set_vlanmc(&map, 31, &mc).unwrap();

        let written: Vec<u16> = chip.writes().into_iter().map(|(reg, _)| reg).collect();
        assert_eq!(written, [0x07A4, 0x07A5, 0x07A6, 0x07A7]);
        assert_eq!(chip.get_register(regs::vlanmc(31, 3)), 100);
        assert_eq!(get_vlanmc(&map, 31).unwrap(), mc);
        assert_eq!(get_vlanmc(&map, 32), Err(Error::Codec(CodecError::McIndex)));
    }

    #[test]
    fn pool_hands_out_lowest_free_slot() {
        let mut pool = VlanMcPool::new();

        let a = pool.alloc().unwrap();
        let b = pool.alloc().unwrap();
        let c = pool.alloc().unwrap();
        assert_eq!((a.index(), b.index(), c.index()), (0, 1, 2));

        pool.free(b);
        assert!(!pool.is_used(1));
        assert_eq!(pool.alloc().unwrap().index(), 1);
        assert_eq!(pool.available(), NUM_MEMBER_CONFIGS - 3);
    }

    #[test]
    fn pool_exhaustion() {
        let mut pool = VlanMcPool::new();
        let mut taken = Vec::new();
        for _ in 0..NUM_MEMBER_CONFIGS {
            taken.push(pool.alloc().unwrap());
        }

        assert_eq!(pool.alloc(), Err(TableError::NoSpace));

        let last = taken.pop().unwrap();
        pool.free(last);
        assert_eq!(pool.alloc().unwrap().index(), 31);
    }
}
