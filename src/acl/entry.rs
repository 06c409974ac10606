//! ACL rule and action entry codecs
//!
//! # Rules
//!
//! A rule occupies two rows of the rule table, a care row and a data row,
//! ten words each:
//!
//! | Word | Bits | Field |
//! |------|------|-------|
//! | 0 | 0..2 | template index |
//! | 0 | 3..7 | tag-exist flags |
//! | 0 | 8..15 | port mask, ports 0..7 |
//! | 1..8 | 0..15 | template fields 0..7 |
//! | 9 | 0 | valid (data row only) |
//! | 9 | 1..3 | port mask, ports 8..10 |
//!
//! The rows do not hold the logical care mask and data value directly.
//! Every word is stored as `care' = care & !data` and `data' = care & data`,
//! so that each bit pair encodes match-1, match-0 or don't-care. Reading
//! back, `care = care' ^ data'` and `data = data'`. Data bits outside the
//! care mask cannot be represented and are rejected.

use crate::constants::{NUM_ACL_CONFIGS, NUM_MEMBER_CONFIGS, PORT_MASK_ALL};
use crate::error::{CodecError, CodecResult};
use crate::field;

/// Number of templates
pub const NUM_TEMPLATES: usize = 5;

/// Fields per template and per rule
pub const NUM_FIELDS: usize = 8;

/// Rule row width in words
pub const RULE_ENTRY_SIZE: usize = 10;

/// Action entry width in words
pub const ACTION_ENTRY_SIZE: usize = 4;

/// Raw rule row
pub type RuleWords = [u16; RULE_ENTRY_SIZE];

/// Raw action entry
pub type ActionWords = [u16; ACTION_ENTRY_SIZE];

mod layout {
    pub const RULE_D0_TEMPLATE: u16 = 0x0007;
    pub const RULE_D0_TAGEXIST: u16 = 0x00F8;
    pub const RULE_D0_PORTMASK: u16 = 0xFF00;
    pub const RULE_D9_VALID: u16 = 0x0001;
    pub const RULE_D9_PORTMASK_EXT: u16 = 0x000E;

    pub const ACTION_D0_CVLAN_MCIDX: u16 = 0x003F;
    pub const ACTION_D0_CVLAN_SUBACT: u16 = 0x00C0;
}

use layout::*;

/// Rule table row of the care half of rule `index`
pub const fn care_row_addr(index: u8) -> u16 {
    row_addr(0, index)
}

/// Rule table row of the data half of rule `index`
pub const fn data_row_addr(index: u8) -> u16 {
    row_addr(1, index)
}

const fn row_addr(row: u16, index: u8) -> u16 {
    let x = index as u16;
    if x < 64 { (row << 6) | x } else { (row << 5) | (x + 64) }
}

/// Reject rule and action indices beyond the table
pub const fn check_index(index: u8) -> CodecResult<()> {
    if index >= NUM_ACL_CONFIGS {
        Err(CodecError::RuleIndex)
    } else {
        Ok(())
    }
}

// =============================================================================
// Rules
// =============================================================================

/// One half of a rule: ports and template field values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AclRulePart {
    /// Ingress port mask
    pub portmask: u16,
    /// Template field values
    pub fields: [u16; NUM_FIELDS],
}

/// ACL rule
///
/// A frame entering on `port` matches when
/// `BIT(port) & care.portmask & data.portmask == BIT(port)` and for every
/// field `frame[field] & care.fields[i] == data.fields[i]`. With `negate`
/// set, both conditions are inverted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AclRule {
    /// Rule participates in matching
    pub enabled: bool,
    /// Invert the match result
    pub negate: bool,
    /// Template the fields are interpreted with
    pub template: u8,
    /// Bits that take part in the comparison
    pub care: AclRulePart,
    /// Expected values of the cared bits
    pub data: AclRulePart,
}

impl AclRule {
    fn validate(&self) -> CodecResult<()> {
        if self.template as usize >= NUM_TEMPLATES {
            return Err(CodecError::Template);
        }
        if (self.care.portmask | self.data.portmask) & !PORT_MASK_ALL != 0 {
            return Err(CodecError::PortMask);
        }
        if self.data.portmask & !self.care.portmask != 0 {
            return Err(CodecError::DataOutsideCare);
        }
        let outside = self
            .care
            .fields
            .iter()
            .zip(self.data.fields.iter())
            .any(|(care, data)| data & !care != 0);
        if outside {
            return Err(CodecError::DataOutsideCare);
        }
        Ok(())
    }

    /// Pack into the stored `(care, data)` rows
    ///
    /// The valid bit is set in the data row only when the rule is enabled.
    pub fn encode(&self) -> CodecResult<(RuleWords, RuleWords)> {
        self.validate()?;

        let mut care = [0u16; RULE_ENTRY_SIZE];
        let mut data = [0u16; RULE_ENTRY_SIZE];

        // The template index is always fully cared
        care[0] = field::prep(RULE_D0_TEMPLATE, RULE_D0_TEMPLATE)
            | field::prep(RULE_D0_PORTMASK, self.care.portmask);
        data[0] = field::prep(RULE_D0_TEMPLATE, self.template as u16)
            | field::prep(RULE_D0_PORTMASK, self.data.portmask);

        care[1..9].copy_from_slice(&self.care.fields);
        data[1..9].copy_from_slice(&self.data.fields);

        care[9] = field::prep(RULE_D9_PORTMASK_EXT, self.care.portmask >> 8);
        data[9] = field::prep(RULE_D9_PORTMASK_EXT, self.data.portmask >> 8);

        for (c, d) in care.iter_mut().zip(data.iter_mut()) {
            let stored_care = *c & !*d;
            let stored_data = *c & *d;
            *c = stored_care;
            *d = stored_data;
        }

        // Applied after the transform so it cannot be masked away
        data[9] |= field::prep_flag(RULE_D9_VALID, self.enabled);

        Ok((care, data))
    }

    /// Unpack from the stored rows and the negate bit
    pub fn decode(stored_care: &RuleWords, stored_data: &RuleWords, negate: bool) -> Self {
        let mut care = [0u16; RULE_ENTRY_SIZE];
        for (c, (sc, sd)) in care
            .iter_mut()
            .zip(stored_care.iter().zip(stored_data.iter()))
        {
            *c = sc ^ sd;
        }
        care[9] &= !RULE_D9_VALID;
        let data = stored_data;

        let portmask = |words: &RuleWords| {
            field::get(RULE_D0_PORTMASK, words[0])
                | (field::get(RULE_D9_PORTMASK_EXT, words[9]) << 8)
        };

        let mut rule = Self {
            enabled: field::flag(RULE_D9_VALID, data[9]),
            negate,
            template: field::get(RULE_D0_TEMPLATE, data[0]) as u8,
            care: AclRulePart {
                portmask: portmask(&care),
                fields: [0; NUM_FIELDS],
            },
            data: AclRulePart {
                portmask: portmask(data),
                fields: [0; NUM_FIELDS],
            },
        };
        rule.care.fields.copy_from_slice(&care[1..9]);
        rule.data.fields.copy_from_slice(&data[1..9]);
        rule
    }
}

/// Whether a stored data row has its valid bit set
pub fn data_row_valid(words: &RuleWords) -> bool {
    field::flag(RULE_D9_VALID, words[9])
}

/// Tag-exist flags of a stored row
pub fn tag_exist(words: &RuleWords) -> u8 {
    field::get(RULE_D0_TAGEXIST, words[0]) as u8
}

// =============================================================================
// Actions
// =============================================================================

/// Set of action modes
///
/// An index whose mode set is empty cascades to the action of the
/// previous index, which lets several rules share one action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ActionMode(u8);

impl ActionMode {
    /// No own action, cascade to the previous index
    pub const CASCADE: Self = Self(0x00);
    /// CVLAN (802.1Q) reclassification
    pub const CVLAN: Self = Self(0x01);
    /// SVLAN (802.1ad) reclassification
    pub const SVLAN: Self = Self(0x02);
    /// Priority remarking
    pub const PRIORITY: Self = Self(0x04);
    /// Policing and logging
    pub const POLICING: Self = Self(0x08);
    /// Forwarding (drop, copy, trap, redirect)
    pub const FORWARD: Self = Self(0x10);
    /// Interrupt and GPIO
    pub const INTGPIO: Self = Self(0x20);
    /// Every mode
    pub const ALL: Self = Self(0x3F);

    /// Mode set from raw bits, dropping unknown bits
    pub const fn from_bits_truncate(bits: u8) -> Self {
        Self(bits & Self::ALL.0)
    }

    /// Raw bits
    pub const fn bits(&self) -> u8 {
        self.0
    }

    /// Whether every mode of `other` is set
    pub const fn contains(&self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether no mode is set
    pub const fn is_cascade(&self) -> bool {
        self.0 == 0
    }
}

impl core::ops::BitOr for ActionMode {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl core::ops::BitOrAssign for ActionMode {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Point in the pipeline where the CVLAN action reclassifies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum CvlanSubaction {
    /// On ingress, before learning
    #[default]
    Ingress = 0,
    /// On egress, before forwarding
    Egress = 1,
}

/// CVLAN action parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CvlanAction {
    /// Reclassification point
    pub subaction: CvlanSubaction,
    /// VLAN membership config index
    pub mcidx: u8,
}

/// ACL action
///
/// The mode set lives in the action control register; the parameters of
/// the enabled modes live in the action table. Only CVLAN parameters are
/// modelled; the remaining table words are written as zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AclAction {
    /// Enabled modes
    pub mode: ActionMode,
    /// CVLAN parameters, used when `mode` contains [`ActionMode::CVLAN`]
    pub cvlan: CvlanAction,
}

impl AclAction {
    /// Pack the table part of the action
    pub fn encode(&self) -> CodecResult<ActionWords> {
        if self.cvlan.mcidx as usize >= NUM_MEMBER_CONFIGS {
            return Err(CodecError::McIndex);
        }

        let mut words = [0u16; ACTION_ENTRY_SIZE];
        words[0] = field::prep(ACTION_D0_CVLAN_MCIDX, self.cvlan.mcidx as u16)
            | field::prep(ACTION_D0_CVLAN_SUBACT, self.cvlan.subaction as u16);
        Ok(words)
    }

    /// Unpack from the table part and the mode bits
    pub fn decode(words: &ActionWords, mode: ActionMode) -> Self {
        // Reserved encodings read back as egress
        let subaction = match field::get(ACTION_D0_CVLAN_SUBACT, words[0]) {
            0 => CvlanSubaction::Ingress,
            _ => CvlanSubaction::Egress,
        };

        Self {
            mode,
            cvlan: CvlanAction {
                subaction,
                mcidx: field::get(ACTION_D0_CVLAN_MCIDX, words[0]) as u8,
            },
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
