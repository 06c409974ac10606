//! ACL templates and field selectors
//!
//! A template names the frame field each of the eight rule fields is
//! compared against. Field selectors are programmable fields: a base
//! (packet type dependent) plus an octet offset.

use super::entry::{NUM_FIELDS, NUM_TEMPLATES};

/// Number of field selectors
pub const NUM_FIELDSELS: usize = 16;

// =============================================================================
// Field Types
// =============================================================================

/// Frame fields a template can reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum FieldType {
    /// Field not used
    #[default]
    Unused = 0x00,
    /// Destination MAC bits 15..0
    Dmac0 = 0x01,
    /// Destination MAC bits 31..16
    Dmac1 = 0x02,
    /// Destination MAC bits 47..32
    Dmac2 = 0x03,
    /// Source MAC bits 15..0
    Smac0 = 0x04,
    /// Source MAC bits 31..16
    Smac1 = 0x05,
    /// Source MAC bits 47..32
    Smac2 = 0x06,
    /// EtherType / length
    EtherType = 0x07,
    /// 802.1ad tag: PCP, DEI, SVID
    Stag = 0x08,
    /// 802.1Q tag: PCP, DEI, CVID
    Ctag = 0x09,
    /// Source IPv4 bits 15..0
    Ipv4Sip0 = 0x10,
    /// Source IPv4 bits 31..16
    Ipv4Sip1 = 0x11,
    /// Destination IPv4 bits 15..0
    Ipv4Dip0 = 0x12,
    /// Destination IPv4 bits 31..16
    Ipv4Dip1 = 0x13,
    /// Source IPv6 bits 15..0
    Ipv6Sip0 = 0x20,
    /// Source IPv6 bits 31..16
    Ipv6Sip1 = 0x21,
    /// Destination IPv6 bits 15..0
    Ipv6Dip0 = 0x28,
    /// Destination IPv6 bits 31..16
    Ipv6Dip1 = 0x29,
    /// TCP/UDP destination port
    L4Dport = 0x2A,
    /// TCP/UDP source port
    L4Sport = 0x2B,
    /// VLAN range check
    VidRange = 0x30,
    /// IP range check
    IpRange = 0x31,
    /// L4 port range check
    PortRange = 0x32,
    /// Field selector valid flags
    FieldValid = 0x33,
    /// Field selector 0
    Fs00 = 0x40,
    /// Field selector 1
    Fs01 = 0x41,
    /// Field selector 2
    Fs02 = 0x42,
    /// Field selector 3
    Fs03 = 0x43,
    /// Field selector 4
    Fs04 = 0x44,
    /// Field selector 5
    Fs05 = 0x45,
    /// Field selector 6
    Fs06 = 0x46,
    /// Field selector 7
    Fs07 = 0x47,
    /// Field selector 8
    Fs08 = 0x48,
    /// Field selector 9
    Fs09 = 0x49,
    /// Field selector 10
    Fs10 = 0x4A,
    /// Field selector 11
    Fs11 = 0x4B,
    /// Field selector 12
    Fs12 = 0x4C,
    /// Field selector 13
    Fs13 = 0x4D,
    /// Field selector 14
    Fs14 = 0x4E,
    /// Field selector 15
    Fs15 = 0x4F,
}

/// Field layout of the five templates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TemplateConfig {
    /// `templates[t][f]` is field `f` of template `t`
    pub templates: [[FieldType; NUM_FIELDS]; NUM_TEMPLATES],
}

impl TemplateConfig {
    /// Recommended layout
    ///
    /// | T | 0 | 1 | 2 | 3 | 4 | 5 | 6 | 7 |
    /// |---|---|---|---|---|---|---|---|---|
    /// | 0 | DMAC0 | DMAC1 | DMAC2 | SMAC0 | SMAC1 | SMAC2 | EtherType | FS07 |
    /// | 1 | SIP0 | SIP1 | DIP0 | DIP1 | L4 sport | L4 dport | FS02 | FS07 |
    /// | 2 | SIP6.0 | SIP6.1 | L4 sport | L4 dport | FS05 | FS06 | FS00 | FS01 |
    /// | 3 | DIP6.0 | DIP6.1 | L4 sport | L4 dport | FS00 | FS03 | FS04 | FS07 |
    /// | 4 | FS01 | IP range | FS02 | CTAG | STAG | FS04 | FS03 | FS07 |
    pub const DEFAULT: Self = {
        use FieldType::*;
        Self {
            templates: [
                [Dmac0, Dmac1, Dmac2, Smac0, Smac1, Smac2, EtherType, Fs07],
                [Ipv4Sip0, Ipv4Sip1, Ipv4Dip0, Ipv4Dip1, L4Sport, L4Dport, Fs02, Fs07],
                [Ipv6Sip0, Ipv6Sip1, L4Sport, L4Dport, Fs05, Fs06, Fs00, Fs01],
                [Ipv6Dip0, Ipv6Dip1, L4Sport, L4Dport, Fs00, Fs03, Fs04, Fs07],
                [Fs01, IpRange, Fs02, Ctag, Stag, Fs04, Fs03, Fs07],
            ],
        }
    };
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

// =============================================================================
// Field Selectors
// =============================================================================

/// Base a field selector offset is counted from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum FieldSelType {
    /// Chip default
    #[default]
    Default = 0,
    /// Raw frame, after the preamble
    Raw = 1,
    /// LLC frame
    Llc = 2,
    /// IPv4 header
    Ipv4 = 3,
    /// ARP payload
    Arp = 4,
    /// IPv6 header
    Ipv6 = 5,
    /// IP payload
    IpPayload = 6,
    /// TCP/UDP payload (ICMP: 4 octets into the header)
    L4Payload = 7,
}

/// One field selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FieldSel {
    /// Base
    pub ty: FieldSelType,
    /// Offset from the base in octets
    pub offset: u8,
}

impl FieldSel {
    /// Selector at `offset` octets from `ty`
    pub const fn new(ty: FieldSelType, offset: u8) -> Self {
        Self { ty, offset }
    }
}

/// All sixteen field selectors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FieldSelConfig {
    /// Selector `i` feeds template field type `Fs<i>`
    pub fieldsels: [FieldSel; NUM_FIELDSELS],
}

impl FieldSelConfig {
    /// Recommended selectors, matching [`TemplateConfig::DEFAULT`]
    pub const DEFAULT: Self = {
        use FieldSelType::*;
        let unused = FieldSel::new(FieldSelType::Default, 0);
        Self {
            fieldsels: [
                FieldSel::new(Ipv6, 0),
                FieldSel::new(Ipv6, 6),
                FieldSel::new(IpPayload, 12),
                FieldSel::new(Ipv4, 12),
                FieldSel::new(IpPayload, 0),
                FieldSel::new(Ipv4, 0),
                FieldSel::new(Ipv4, 8),
                unused,
                unused,
                unused,
                unused,
                unused,
                unused,
                unused,
                unused,
                unused,
            ],
        }
    };
}

impl Default for FieldSelConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
