//! VLAN4k entry and VLAN membership config codecs

use crate::constants::{EVID_MAX, FID_MAX, METER_MAX, PORT_MASK_ALL, PRIORITY_MAX, VID_MAX};
use crate::error::{CodecError, CodecResult};
use crate::field;

/// VLAN4k entry width in words
pub const VLAN4K_ENTRY_SIZE: usize = 3;

/// Membership config width in registers
pub const VLANMC_ENTRY_SIZE: usize = 4;

/// Raw VLAN4k entry
pub type Vlan4kWords = [u16; VLAN4K_ENTRY_SIZE];

/// Raw membership config
pub type VlanMcWords = [u16; VLANMC_ENTRY_SIZE];

mod layout {
    pub const V4K_D0_MBR: u16 = 0x00FF;
    pub const V4K_D0_UNTAG: u16 = 0xFF00;
    pub const V4K_D1_FID: u16 = 0x000F;
    pub const V4K_D1_VBPEN: u16 = 0x0010;
    pub const V4K_D1_VBPRI: u16 = 0x00E0;
    pub const V4K_D1_ENVLANPOL: u16 = 0x0100;
    pub const V4K_D1_METERIDX: u16 = 0x3E00;
    pub const V4K_D1_IVL_SVL: u16 = 0x4000;
    pub const V4K_D2_MBR_EXT: u16 = 0x0007;
    pub const V4K_D2_UNTAG_EXT: u16 = 0x0038;
    pub const V4K_D2_METERIDX_EXT: u16 = 0x0040;

    pub const MC_D0_MBR: u16 = 0x07FF;
    pub const MC_D1_FID: u16 = 0x000F;
    pub const MC_D2_METERIDX: u16 = 0x07E0;
    pub const MC_D2_ENVLANPOL: u16 = 0x0010;
    pub const MC_D2_VBPRI: u16 = 0x000E;
    pub const MC_D2_VBPEN: u16 = 0x0001;
    pub const MC_D3_EVID: u16 = 0x1FFF;
}

use layout::*;

fn check_common(member: u16, fid: u8, priority: u8, meter: u8) -> CodecResult<()> {
    if member & !PORT_MASK_ALL != 0 {
        return Err(CodecError::PortMask);
    }
    if fid > FID_MAX {
        return Err(CodecError::Fid);
    }
    if priority > PRIORITY_MAX {
        return Err(CodecError::Priority);
    }
    if meter > METER_MAX {
        return Err(CodecError::Meter);
    }
    Ok(())
}

// =============================================================================
// VLAN4k
// =============================================================================

/// VLAN4k table entry
///
/// The VLAN4k table holds the configuration the switch forwards with,
/// one entry per VLAN ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Vlan4k {
    /// VLAN ID, also the table address
    pub vid: u16,
    /// Member port mask
    pub member: u16,
    /// Ports that untag on egress
    pub untag: u16,
    /// Filtering ID (SVL only)
    pub fid: u8,
    /// Priority
    pub priority: u8,
    /// Priority enable
    pub priority_en: bool,
    /// Policing enable
    pub policing_en: bool,
    /// Independent VLAN learning instead of shared
    pub ivl_en: bool,
    /// Meter index
    pub meter: u8,
}

impl Vlan4k {
    /// Empty entry for `vid`
    pub const fn new(vid: u16) -> Self {
        Self {
            vid,
            member: 0,
            untag: 0,
            fid: 0,
            priority: 0,
            priority_en: false,
            policing_en: false,
            ivl_en: false,
            meter: 0,
        }
    }

    /// Pack into table words
    pub fn encode(&self) -> CodecResult<Vlan4kWords> {
        if self.vid > VID_MAX {
            return Err(CodecError::Vid);
        }
        if self.untag & !PORT_MASK_ALL != 0 {
            return Err(CodecError::PortMask);
        }
        check_common(self.member, self.fid, self.priority, self.meter)?;

        let meter = self.meter as u16;
        Ok([
            field::prep(V4K_D0_MBR, self.member) | field::prep(V4K_D0_UNTAG, self.untag),
            field::prep(V4K_D1_FID, self.fid as u16)
                | field::prep_flag(V4K_D1_VBPEN, self.priority_en)
                | field::prep(V4K_D1_VBPRI, self.priority as u16)
                | field::prep_flag(V4K_D1_ENVLANPOL, self.policing_en)
                | field::prep(V4K_D1_METERIDX, meter)
                | field::prep_flag(V4K_D1_IVL_SVL, self.ivl_en),
            field::prep(V4K_D2_MBR_EXT, self.member >> 8)
                | field::prep(V4K_D2_UNTAG_EXT, self.untag >> 8)
                | field::prep(V4K_D2_METERIDX_EXT, meter >> 5),
        ])
    }

    /// Unpack the entry stored at `vid`
    pub fn decode(vid: u16, words: &Vlan4kWords) -> Self {
        Self {
            vid,
            member: field::get(V4K_D0_MBR, words[0]) | (field::get(V4K_D2_MBR_EXT, words[2]) << 8),
            untag: field::get(V4K_D0_UNTAG, words[0])
                | (field::get(V4K_D2_UNTAG_EXT, words[2]) << 8),
            fid: field::get(V4K_D1_FID, words[1]) as u8,
            priority: field::get(V4K_D1_VBPRI, words[1]) as u8,
            priority_en: field::flag(V4K_D1_VBPEN, words[1]),
            policing_en: field::flag(V4K_D1_ENVLANPOL, words[1]),
            ivl_en: field::flag(V4K_D1_IVL_SVL, words[1]),
            meter: (field::get(V4K_D1_METERIDX, words[1])
                | (field::get(V4K_D2_METERIDX_EXT, words[2]) << 5)) as u8,
        }
    }
}

// =============================================================================
// Membership Config
// =============================================================================

/// VLAN membership config
///
/// Needed for port VLAN IDs and ACL CVLAN actions. Uses an enhanced
/// VLAN ID with a 13-bit range and has no learning mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct VlanMc {
    /// Enhanced VLAN ID
    pub evid: u16,
    /// Member port mask
    pub member: u16,
    /// Filtering ID
    pub fid: u8,
    /// Priority
    pub priority: u8,
    /// Priority enable
    pub priority_en: bool,
    /// Policing enable
    pub policing_en: bool,
    /// Meter index
    pub meter: u8,
}

impl VlanMc {
    /// Pack into register values
    pub fn encode(&self) -> CodecResult<VlanMcWords> {
        if self.evid > EVID_MAX {
            return Err(CodecError::Evid);
        }
        check_common(self.member, self.fid, self.priority, self.meter)?;

        Ok([
            field::prep(MC_D0_MBR, self.member),
            field::prep(MC_D1_FID, self.fid as u16),
            field::prep(MC_D2_METERIDX, self.meter as u16)
                | field::prep_flag(MC_D2_ENVLANPOL, self.policing_en)
                | field::prep(MC_D2_VBPRI, self.priority as u16)
                | field::prep_flag(MC_D2_VBPEN, self.priority_en),
            field::prep(MC_D3_EVID, self.evid),
        ])
    }

    /// Unpack from register values
    pub fn decode(words: &VlanMcWords) -> Self {
        Self {
            evid: field::get(MC_D3_EVID, words[3]),
            member: field::get(MC_D0_MBR, words[0]),
            fid: field::get(MC_D1_FID, words[1]) as u8,
            priority: field::get(MC_D2_VBPRI, words[2]) as u8,
            priority_en: field::flag(MC_D2_VBPEN, words[2]),
            policing_en: field::flag(MC_D2_ENVLANPOL, words[2]),
            meter: field::get(MC_D2_METERIDX, words[2]) as u8,
        }
    }
}
