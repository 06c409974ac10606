//! L2 table entry codecs
//!
//! Both entry kinds occupy six words. The MAC address is stored in
//! reverse byte order across words 0..2; the kinds differ in words 3..5.

use crate::constants::{AGE_MAX, EFID_MAX, FID_MAX, MAX_NUM_PORTS, PORT_MASK_ALL, PRIORITY_MAX, VID_MAX};
use crate::error::{CodecError, CodecResult};
use crate::field;

/// Entry width in words
pub const ENTRY_SIZE: usize = 6;

/// Raw L2 entry
pub type L2Words = [u16; ENTRY_SIZE];

/// Ethernet MAC address
pub type MacAddr = [u8; 6];

/// Whether `mac` is a group (multicast or broadcast) address
#[inline]
pub const fn is_multicast(mac: &MacAddr) -> bool {
    mac[0] & 0x01 != 0
}

mod layout {
    pub const D0_MAC5: u16 = 0x00FF;
    pub const D0_MAC4: u16 = 0xFF00;
    pub const D1_MAC3: u16 = 0x00FF;
    pub const D1_MAC2: u16 = 0xFF00;
    pub const D2_MAC1: u16 = 0x00FF;
    pub const D2_MAC0: u16 = 0xFF00;

    pub const UC_D3_VID: u16 = 0x0FFF;
    pub const UC_D3_IVL: u16 = 0x2000;
    pub const UC_D3_PORT_EXT: u16 = 0x8000;
    pub const UC_D4_EFID: u16 = 0x0007;
    pub const UC_D4_FID: u16 = 0x0078;
    pub const UC_D4_SA_PRI: u16 = 0x0080;
    pub const UC_D4_PORT: u16 = 0x0700;
    pub const UC_D4_AGE: u16 = 0x3800;
    pub const UC_D4_AUTH: u16 = 0x4000;
    pub const UC_D4_SA_BLOCK: u16 = 0x8000;
    pub const UC_D5_DA_BLOCK: u16 = 0x0001;
    pub const UC_D5_PRIORITY: u16 = 0x000E;
    pub const UC_D5_FWD_PRI: u16 = 0x0010;
    pub const UC_D5_STATIC: u16 = 0x0020;

    pub const MC_D3_VID: u16 = 0x0FFF;
    pub const MC_D3_IVL: u16 = 0x2000;
    pub const MC_D3_MBR_EXT1: u16 = 0xC000;
    pub const MC_D4_MBR: u16 = 0x00FF;
    pub const MC_D4_IGMPIDX: u16 = 0xFF00;
    pub const MC_D5_IGMP_ASIC: u16 = 0x0001;
    pub const MC_D5_PRIORITY: u16 = 0x000E;
    pub const MC_D5_FWD_PRI: u16 = 0x0010;
    pub const MC_D5_STATIC: u16 = 0x0020;
    pub const MC_D5_MBR_EXT2: u16 = 0x0080;
}

use layout::*;

fn encode_mac(mac: &MacAddr, words: &mut L2Words) {
    words[0] = field::prep(D0_MAC5, mac[5] as u16) | field::prep(D0_MAC4, mac[4] as u16);
    words[1] = field::prep(D1_MAC3, mac[3] as u16) | field::prep(D1_MAC2, mac[2] as u16);
    words[2] = field::prep(D2_MAC1, mac[1] as u16) | field::prep(D2_MAC0, mac[0] as u16);
}

fn decode_mac(words: &L2Words) -> MacAddr {
    [
        field::get(D2_MAC0, words[2]) as u8,
        field::get(D2_MAC1, words[2]) as u8,
        field::get(D1_MAC2, words[1]) as u8,
        field::get(D1_MAC3, words[1]) as u8,
        field::get(D0_MAC4, words[0]) as u8,
        field::get(D0_MAC5, words[0]) as u8,
    ]
}

// =============================================================================
// Unicast
// =============================================================================

/// Lookup key of a unicast entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UcKey {
    /// MAC address
    pub mac: MacAddr,
    /// Extended filtering ID
    pub efid: u8,
    /// Independent VLAN learning: `vid` is part of the key when set,
    /// `fid` otherwise
    pub ivl: bool,
    /// VLAN ID
    pub vid: u16,
    /// Filtering ID
    pub fid: u8,
}

/// Unicast forwarding entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UcEntry {
    /// Lookup key
    pub key: UcKey,
    /// Destination port
    pub port: u8,
    /// Age; dynamic entries with age 0 are invalid
    pub age: u8,
    /// Priority
    pub priority: u8,
    /// Drop frames with this source address
    pub sa_block: bool,
    /// Drop frames with this destination address
    pub da_block: bool,
    /// 802.1X authenticated
    pub auth: bool,
    /// Not subject to aging
    pub is_static: bool,
    /// Source address priority enable
    pub sa_pri: bool,
    /// Forwarding priority enable
    pub fwd_pri: bool,
}

impl UcEntry {
    /// Entry carrying only `key`, every other field zero
    pub const fn from_key(key: UcKey) -> Self {
        Self {
            key,
            port: 0,
            age: 0,
            priority: 0,
            sa_block: false,
            da_block: false,
            auth: false,
            is_static: false,
            sa_pri: false,
            fwd_pri: false,
        }
    }

    fn validate(&self) -> CodecResult<()> {
        if self.key.vid > VID_MAX {
            return Err(CodecError::Vid);
        }
        if self.key.fid > FID_MAX {
            return Err(CodecError::Fid);
        }
        if self.key.efid > EFID_MAX {
            return Err(CodecError::Efid);
        }
        if self.port >= MAX_NUM_PORTS {
            return Err(CodecError::Port);
        }
        if self.age > AGE_MAX {
            return Err(CodecError::Age);
        }
        if self.priority > PRIORITY_MAX {
            return Err(CodecError::Priority);
        }
        Ok(())
    }

    /// Pack into table words
    pub fn encode(&self) -> CodecResult<L2Words> {
        self.validate()?;

        let key = &self.key;
        let port = self.port as u16;
        let mut words = [0u16; ENTRY_SIZE];
        encode_mac(&key.mac, &mut words);

        words[3] = field::prep(UC_D3_VID, key.vid)
            | field::prep_flag(UC_D3_IVL, key.ivl)
            | field::prep(UC_D3_PORT_EXT, port >> 3);
        words[4] = field::prep(UC_D4_EFID, key.efid as u16)
            | field::prep(UC_D4_FID, key.fid as u16)
            | field::prep_flag(UC_D4_SA_PRI, self.sa_pri)
            | field::prep(UC_D4_PORT, port)
            | field::prep(UC_D4_AGE, self.age as u16)
            | field::prep_flag(UC_D4_AUTH, self.auth)
            | field::prep_flag(UC_D4_SA_BLOCK, self.sa_block);
        words[5] = field::prep_flag(UC_D5_DA_BLOCK, self.da_block)
            | field::prep(UC_D5_PRIORITY, self.priority as u16)
            | field::prep_flag(UC_D5_FWD_PRI, self.fwd_pri)
            | field::prep_flag(UC_D5_STATIC, self.is_static);

        Ok(words)
    }

    /// Unpack from table words
    pub fn decode(words: &L2Words) -> Self {
        let port = field::get(UC_D4_PORT, words[4]) | (field::get(UC_D3_PORT_EXT, words[3]) << 3);

        Self {
            key: UcKey {
                mac: decode_mac(words),
                efid: field::get(UC_D4_EFID, words[4]) as u8,
                ivl: field::flag(UC_D3_IVL, words[3]),
                vid: field::get(UC_D3_VID, words[3]),
                fid: field::get(UC_D4_FID, words[4]) as u8,
            },
            port: port as u8,
            age: field::get(UC_D4_AGE, words[4]) as u8,
            priority: field::get(UC_D5_PRIORITY, words[5]) as u8,
            sa_block: field::flag(UC_D4_SA_BLOCK, words[4]),
            da_block: field::flag(UC_D5_DA_BLOCK, words[5]),
            auth: field::flag(UC_D4_AUTH, words[4]),
            is_static: field::flag(UC_D5_STATIC, words[5]),
            sa_pri: field::flag(UC_D4_SA_PRI, words[4]),
            fwd_pri: field::flag(UC_D5_FWD_PRI, words[5]),
        }
    }
}

// =============================================================================
// Multicast
// =============================================================================

/// Lookup key of a multicast entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct McKey {
    /// Group MAC address
    pub mac: MacAddr,
    /// Independent VLAN learning: `vid` holds a VLAN ID when set, a
    /// filtering ID otherwise
    pub ivl: bool,
    /// VLAN ID or filtering ID
    pub vid: u16,
}

/// Multicast forwarding entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct McEntry {
    /// Lookup key
    pub key: McKey,
    /// Member port mask
    pub member: u16,
    /// Priority
    pub priority: u8,
    /// IGMP group index
    pub igmpidx: u8,
    /// Not subject to aging
    pub is_static: bool,
    /// Forwarding priority enable
    pub fwd_pri: bool,
    /// Learned by the IGMP/MLD snooping engine
    pub igmp_asic: bool,
}

impl McEntry {
    /// Entry carrying only `key`, every other field zero
    pub const fn from_key(key: McKey) -> Self {
        Self {
            key,
            member: 0,
            priority: 0,
            igmpidx: 0,
            is_static: false,
            fwd_pri: false,
            igmp_asic: false,
        }
    }

    fn validate(&self) -> CodecResult<()> {
        if self.key.vid > VID_MAX {
            return Err(CodecError::Vid);
        }
        if self.member & !PORT_MASK_ALL != 0 {
            return Err(CodecError::PortMask);
        }
        if self.priority > PRIORITY_MAX {
            return Err(CodecError::Priority);
        }
        Ok(())
    }

    /// Pack into table words
    pub fn encode(&self) -> CodecResult<L2Words> {
        self.validate()?;

        let key = &self.key;
        let mut words = [0u16; ENTRY_SIZE];
        encode_mac(&key.mac, &mut words);

        // Member bits 8..9 live in word 3, bit 10 in word 5
        words[3] = field::prep(MC_D3_VID, key.vid)
            | field::prep_flag(MC_D3_IVL, key.ivl)
            | field::prep(MC_D3_MBR_EXT1, self.member >> 8);
        words[4] =
            field::prep(MC_D4_MBR, self.member) | field::prep(MC_D4_IGMPIDX, self.igmpidx as u16);
        words[5] = field::prep_flag(MC_D5_IGMP_ASIC, self.igmp_asic)
            | field::prep(MC_D5_PRIORITY, self.priority as u16)
            | field::prep_flag(MC_D5_FWD_PRI, self.fwd_pri)
            | field::prep_flag(MC_D5_STATIC, self.is_static)
            | field::prep(MC_D5_MBR_EXT2, self.member >> 10);

        Ok(words)
    }

    /// Unpack from table words
    pub fn decode(words: &L2Words) -> Self {
        let member = field::get(MC_D4_MBR, words[4])
            | (field::get(MC_D3_MBR_EXT1, words[3]) << 8)
            | (field::get(MC_D5_MBR_EXT2, words[5]) << 10);

        Self {
            key: McKey {
                mac: decode_mac(words),
                ivl: field::flag(MC_D3_IVL, words[3]),
                vid: field::get(MC_D3_VID, words[3]),
            },
            member,
            priority: field::get(MC_D5_PRIORITY, words[5]) as u8,
            igmpidx: field::get(MC_D4_IGMPIDX, words[4]) as u8,
            is_static: field::flag(MC_D5_STATIC, words[5]),
            fwd_pri: field::flag(MC_D5_FWD_PRI, words[5]),
            igmp_asic: field::flag(MC_D5_IGMP_ASIC, words[5]),
        }
    }
}

/// Whether raw words hold a multicast entry
pub(crate) fn words_are_multicast(words: &L2Words) -> bool {
    is_multicast(&decode_mac(words))
}

// =============================================================================
// Unit Tests
// =============================================================================
