//! Switch handle
//!
//! [`Switch`] ties one register map to the chip it talks to. It owns the
//! application level L2 lock that serializes read-then-write sequences on
//! the forwarding database, and the allocator for VLAN membership configs.
//!
//! Every method takes `&self`; a `Switch` can be shared between tasks.
//! Lock order is always L2 lock first, register map lock second. Both are
//! per-instance blocking locks over the raw mutex `M`, so two switches
//! never wait for each other.

use embedded_hal::delay::DelayNs;

use super::config::SwitchConfig;
use crate::acl::{self, AclAction, AclRule, FieldSelConfig, TemplateConfig};
use crate::chip::{self, ChipInfo, ChipRegistry};
use crate::constants::MAX_NUM_PORTS;
use crate::error::{ConfigError, Result};
use crate::hal::Transport;
use crate::l2::{self, L2Entry, MacAddr, McEntry, McKey, UcEntry, UcKey};
use crate::regmap::RegisterMap;
use crate::sync::{CriticalSectionRawMutex, RawMutex};
use crate::table::{self, TableQuery};
use crate::vlan::{self, Vlan4k, VlanMc, VlanMcEntry, VlanMcPool};

/// Age given to static forwarding entries
const FDB_STATIC_AGE: u8 = 6;

/// Handle to one detected switch chip
///
/// `D` must be cloneable: the register map owns one copy for its table
/// polls and resets sleep on fresh copies with the map unlocked.
pub struct Switch<T, D, M = CriticalSectionRawMutex> {
    map: RegisterMap<T, D, M>,
    delay: D,
    info: ChipInfo,
    config: SwitchConfig,
    l2_lock: lock_api::Mutex<M, ()>,
    vlanmc_pool: lock_api::Mutex<M, VlanMcPool>,
}

impl<T, D, M> Switch<T, D, M>
where
    T: Transport,
    D: DelayNs + Clone,
    M: RawMutex,
{
    /// Bring up the chip behind `transport`
    ///
    /// Optionally resets the chip, then identifies it against `registry`.
    pub fn probe(
        transport: T,
        delay: D,
        registry: &ChipRegistry,
        config: SwitchConfig,
    ) -> Result<Self> {
        let map = RegisterMap::new(transport, delay.clone());

        if config.reset_on_probe {
            chip::reset(&map, &mut delay.clone(), &config)?;
        }
        let info = chip::detect(&map, registry)?;

        Ok(Self {
            map,
            delay,
            info,
            config,
            l2_lock: lock_api::Mutex::new(()),
            vlanmc_pool: lock_api::Mutex::new(VlanMcPool::new()),
        })
    }

    /// Detected chip
    pub fn chip_info(&self) -> &ChipInfo {
        &self.info
    }

    /// Configuration the switch was probed with
    pub fn config(&self) -> &SwitchConfig {
        &self.config
    }

    /// The underlying register map
    pub fn map(&self) -> &RegisterMap<T, D, M> {
        &self.map
    }

    /// Hardware reset with the probe configuration
    ///
    /// Forwarding database entries, ACLs and VLANs are lost; membership
    /// configs handed out earlier stay allocated. No lock is held while
    /// the chip settles, so other callers keep the bus meanwhile.
    pub fn reset(&self) -> Result<()> {
        chip::reset(&self.map, &mut self.delay.clone(), &self.config)
    }

    /// Consume the handle and return the transport and delay
    pub fn release(self) -> (T, D) {
        self.map.release()
    }

    /// Run `f` holding the L2 lock
    fn with_l2<R>(&self, f: impl FnOnce() -> R) -> R {
        let _l2 = self.l2_lock.lock();
        f()
    }

    // =========================================================================
    // Registers and Tables
    // =========================================================================

    /// Read a register
    pub fn register_read(&self, addr: u16) -> Result<u16> {
        self.map.read(addr)
    }

    /// Write a register
    pub fn register_write(&self, addr: u16, value: u16) -> Result<()> {
        self.map.write(addr, value)
    }

    /// Read-modify-write the bits of `addr` selected by `mask`
    pub fn register_update_bits(&self, addr: u16, mask: u16, value: u16) -> Result<()> {
        self.map.update_bits(addr, mask, value)
    }

    /// Run a raw table query
    pub fn table_query(&self, query: &mut TableQuery, entry: &mut [u16]) -> Result<()> {
        table::query(&self.map, query, entry)
    }

    // =========================================================================
    // Forwarding Database
    // =========================================================================

    /// Look up a unicast entry by key
    pub fn l2_get_uc(&self, key: &UcKey) -> Result<UcEntry> {
        l2::get_uc(&self.map, key)
    }

    /// Look up a multicast entry by key
    pub fn l2_get_mc(&self, key: &McKey) -> Result<McEntry> {
        l2::get_mc(&self.map, key)
    }

    /// Read the unicast entry at `addr`
    pub fn l2_get_uc_by_addr(&self, addr: u16) -> Result<UcEntry> {
        l2::get_uc_by_addr(&self.map, addr)
    }

    /// Read the multicast entry at `addr`
    pub fn l2_get_mc_by_addr(&self, addr: u16) -> Result<McEntry> {
        l2::get_mc_by_addr(&self.map, addr)
    }

    /// First occupied entry after `addr`
    pub fn l2_get_next(&self, addr: u16) -> Result<(u16, L2Entry)> {
        l2::get_next(&self.map, addr)
    }

    /// Add or overwrite a unicast entry
    pub fn l2_add_uc(&self, uc: &UcEntry) -> Result<()> {
        self.with_l2(|| l2::add_uc(&self.map, uc))
    }

    /// Add or overwrite a multicast entry
    pub fn l2_add_mc(&self, mc: &McEntry) -> Result<()> {
        self.with_l2(|| l2::add_mc(&self.map, mc))
    }

    /// Delete a unicast entry
    pub fn l2_del_uc(&self, key: &UcKey) -> Result<()> {
        self.with_l2(|| l2::del_uc(&self.map, key))
    }

    /// Delete a multicast entry
    pub fn l2_del_mc(&self, key: &McKey) -> Result<()> {
        self.with_l2(|| l2::del_mc(&self.map, key))
    }

    /// Flush dynamic entries learned on `port`, only those in `vid` if non-zero
    pub fn l2_flush(&self, port: u8, vid: u16) -> Result<()> {
        self.with_l2(|| l2::flush(&self.map, port, vid))
    }

    /// Add a static unicast entry for `mac` on `port`
    pub fn fdb_add(&self, port: u8, mac: MacAddr, vid: u16, efid: u8) -> Result<()> {
        let uc = UcEntry {
            port,
            age: FDB_STATIC_AGE,
            is_static: true,
            ..UcEntry::from_key(Self::fdb_key(mac, vid, efid))
        };

        #[cfg(feature = "defmt")]
        defmt::debug!("fdb: add port {} vid {} efid {}", port, vid, efid);

        self.l2_add_uc(&uc)
    }

    /// Delete the unicast entry for `mac`
    pub fn fdb_del(&self, mac: MacAddr, vid: u16, efid: u8) -> Result<()> {
        #[cfg(feature = "defmt")]
        defmt::debug!("fdb: del vid {} efid {}", vid, efid);

        self.l2_del_uc(&Self::fdb_key(mac, vid, efid))
    }

    /// Report every unicast entry pointing at `port`
    ///
    /// `f` receives the address, VLAN ID and static flag of each entry.
    /// The walk does not hold the L2 lock, so `f` may call back into the
    /// switch.
    pub fn fdb_dump<F>(&self, port: u8, mut f: F) -> Result<()>
    where
        F: FnMut(&MacAddr, u16, bool),
    {
        l2::walk_uc(&self.map, |_, uc| {
            if uc.port == port {
                f(&uc.key.mac, uc.key.vid, uc.is_static);
            }
        })
    }

    /// Add `port` to the multicast group `mac` in `vid`
    ///
    /// The group entry is created on first use.
    pub fn mdb_add(&self, port: u8, mac: MacAddr, vid: u16) -> Result<()> {
        let bit = Self::port_bit(port)?;
        let key = Self::mdb_key(mac, vid);

        self.with_l2(|| {
            let mut mc = match l2::get_mc(&self.map, &key) {
                Ok(mc) => mc,
                Err(e) if e.is_not_found() => McEntry {
                    is_static: true,
                    ..McEntry::from_key(key)
                },
                Err(e) => return Err(e),
            };
            mc.member |= bit;
            l2::add_mc(&self.map, &mc)
        })
    }

    /// Remove `port` from the multicast group `mac` in `vid`
    ///
    /// The group entry is deleted once its last member leaves.
    pub fn mdb_del(&self, port: u8, mac: MacAddr, vid: u16) -> Result<()> {
        let bit = Self::port_bit(port)?;
        let key = Self::mdb_key(mac, vid);

        self.with_l2(|| {
            let mut mc = l2::get_mc(&self.map, &key)?;
            mc.member &= !bit;
            if mc.member == 0 {
                l2::del_mc(&self.map, &key)
            } else {
                l2::add_mc(&self.map, &mc)
            }
        })
    }

    fn fdb_key(mac: MacAddr, vid: u16, efid: u8) -> UcKey {
        UcKey {
            mac,
            efid,
            ivl: true,
            vid,
            fid: 0,
        }
    }

    fn mdb_key(mac: MacAddr, vid: u16) -> McKey {
        McKey { mac, ivl: true, vid }
    }

    fn port_bit(port: u8) -> Result<u16> {
        if port >= MAX_NUM_PORTS {
            return Err(ConfigError::InvalidPort.into());
        }
        Ok(1 << port)
    }

    // =========================================================================
    // VLAN
    // =========================================================================

    /// Read the VLAN4k entry of `vid`
    pub fn get_vlan4k(&self, vid: u16) -> Result<Vlan4k> {
        vlan::get_vlan4k(&self.map, vid)
    }

    /// Write a VLAN4k entry
    pub fn set_vlan4k(&self, entry: &Vlan4k) -> Result<()> {
        vlan::set_vlan4k(&self.map, entry)
    }

    /// Read-modify-write the VLAN4k entry of `vid`
    pub fn update_vlan4k<F>(&self, vid: u16, f: F) -> Result<Vlan4k>
    where
        F: FnOnce(&mut Vlan4k),
    {
        vlan::update_vlan4k(&self.map, vid, f)
    }

    /// Read membership config `index`
    pub fn get_vlanmc(&self, index: u8) -> Result<VlanMc> {
        vlan::get_vlanmc(&self.map, index)
    }

    /// Write membership config `index`
    pub fn set_vlanmc(&self, index: u8, vlanmc: &VlanMc) -> Result<()> {
        vlan::set_vlanmc(&self.map, index, vlanmc)
    }

    /// Take a free membership config slot
    pub fn vlanmc_alloc(&self) -> Result<VlanMcEntry> {
        Ok(self.vlanmc_pool.lock().alloc()?)
    }

    /// Program an allocated slot with its config
    pub fn vlanmc_commit(&self, entry: &VlanMcEntry) -> Result<()> {
        self.set_vlanmc(entry.index(), &entry.vlanmc)
    }

    /// Return a slot to the pool
    ///
    /// The registers keep their last value.
    pub fn vlanmc_free(&self, entry: VlanMcEntry) {
        self.vlanmc_pool.lock().free(entry);
    }

    // =========================================================================
    // ACL
    // =========================================================================

    /// Reset ACL to a well-defined state
    pub fn acl_reset(&self) -> Result<()> {
        acl::reset(&self.map)
    }

    /// Program the field layout of all templates
    pub fn acl_set_template_config(&self, config: &TemplateConfig) -> Result<()> {
        acl::set_template_config(&self.map, config)
    }

    /// Program all field selectors
    pub fn acl_set_fieldsel_config(&self, config: &FieldSelConfig) -> Result<()> {
        acl::set_fieldsel_config(&self.map, config)
    }

    /// Enable or disable ACL lookups on `port`
    pub fn acl_set_port_enable(&self, port: u8, enable: bool) -> Result<()> {
        acl::set_port_enable(&self.map, port, enable)
    }

    /// Program rule `index`
    pub fn acl_set_rule(&self, index: u8, rule: &AclRule) -> Result<()> {
        acl::set_rule(&self.map, index, rule)
    }

    /// Read back rule `index`
    pub fn acl_get_rule(&self, index: u8) -> Result<AclRule> {
        acl::get_rule(&self.map, index)
    }

    /// Program action `index`
    pub fn acl_set_action(&self, index: u8, action: &AclAction) -> Result<()> {
        acl::set_action(&self.map, index, action)
    }

    /// Read back action `index`
    pub fn acl_get_action(&self, index: u8) -> Result<AclAction> {
        acl::get_action(&self.map, index)
    }
}

impl<T, D, M> core::fmt::Debug for Switch<T, D, M> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Switch")
            .field("chip", &self.info.name)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
