//! Access control lists
//!
//! An ACL config is one or more rules followed by an action. Rule `i` in
//! the rule table pairs with action `i` in the action table; an index
//! whose action mode set is empty cascades to the previous index, so
//! consecutive rules can share one action. Placing rules and actions at
//! suitable indices is up to the caller.
//!
//! Besides the two tables, each index owns a byte of an action control
//! register holding its mode set and the rule's negate bit.

pub mod entry;
pub mod template;

use embedded_hal::delay::DelayNs;

pub use entry::{
    AclAction, AclRule, AclRulePart, ActionMode, CvlanAction, CvlanSubaction, NUM_FIELDS,
    NUM_TEMPLATES,
};
pub use template::{FieldSel, FieldSelConfig, FieldSelType, FieldType, TemplateConfig, NUM_FIELDSELS};

use crate::constants::{MAX_NUM_PORTS, NUM_ACL_CONFIGS};
use crate::error::{ConfigError, Error, Result, TableError};
use crate::field;
use crate::hal::Transport;
use crate::regmap::RegisterMap;
use crate::sync::RawMutex;
use crate::table::{self, Table, TableQuery};

use entry::{ACTION_ENTRY_SIZE, RULE_ENTRY_SIZE};

// =============================================================================
// Register Definitions
// =============================================================================

/// ACL control registers
pub mod regs {
    /// Per-port ACL enable
    pub const ENABLE: u16 = 0x06D5;
    /// Per-port ACL enable mask
    pub const ENABLE_MASK: u16 = 0x07FF;

    /// Per-port permit of frames no rule matched
    pub const UNMATCH_PERMIT: u16 = 0x06D6;
    /// Per-port permit mask
    pub const UNMATCH_PERMIT_MASK: u16 = 0x07FF;

    /// Rule and action table reset
    pub const RESET: u16 = 0x06D9;
    /// Reset trigger
    pub const RESET_MASK: u16 = 0x0001;

    /// Action control, indices 0..63
    pub const ACTION_CTRL_BASE: u16 = 0x0614;
    /// Action control, indices 64..95
    pub const ACTION_CTRL_EXT_BASE: u16 = 0x06F0;
    /// Negate bit, low index of a pair
    pub const ACTION_CTRL_NEGATE: u16 = 0x0040;
    /// Mode bits, low index of a pair
    pub const ACTION_CTRL_MODE: u16 = 0x003F;

    /// Template registers
    pub const TEMPLATE_BASE: u16 = 0x0600;

    /// Field selector registers
    pub const FIELDSEL_BASE: u16 = 0x12E7;
    /// Field selector base type
    pub const FIELDSEL_TYPE: u16 = 0x0700;
    /// Field selector octet offset
    pub const FIELDSEL_OFFSET: u16 = 0x00FF;

    /// Action control register of `index`; two indices share a register
    pub const fn action_ctrl(index: u8) -> u16 {
        let x = index as u16;
        if x < 64 {
            ACTION_CTRL_BASE + (x >> 1)
        } else {
            ACTION_CTRL_EXT_BASE + ((x - 64) >> 1)
        }
    }

    /// Bit offset of `index` within its action control register
    pub const fn action_ctrl_shift(index: u8) -> u16 {
        8 * (index as u16 & 1)
    }

    /// Template register holding fields `f` and `f + 1` of template `t`
    pub const fn template(t: usize, f: usize) -> u16 {
        TEMPLATE_BASE + (t as u16) * 4 + ((f as u16) >> 1)
    }

    /// Field selector register `i`
    pub const fn fieldsel(i: usize) -> u16 {
        FIELDSEL_BASE + i as u16
    }
}

// =============================================================================
// Action Control
// =============================================================================

fn set_action_mode<T, D, M>(map: &RegisterMap<T, D, M>, index: u8, mode: ActionMode) -> Result<()>
where
    T: Transport,
    D: DelayNs,
    M: RawMutex,
{
    let shift = regs::action_ctrl_shift(index);
    map.update_bits(
        regs::action_ctrl(index),
        regs::ACTION_CTRL_MODE << shift,
        (mode.bits() as u16) << shift,
    )
}

fn get_action_mode<T, D, M>(map: &RegisterMap<T, D, M>, index: u8) -> Result<ActionMode>
where
    T: Transport,
    D: DelayNs,
    M: RawMutex,
{
    let value = map.read(regs::action_ctrl(index))?;
    let bits = field::get(regs::ACTION_CTRL_MODE, value >> regs::action_ctrl_shift(index));
    Ok(ActionMode::from_bits_truncate(bits as u8))
}

fn set_rule_negate<T, D, M>(map: &RegisterMap<T, D, M>, index: u8, negate: bool) -> Result<()>
where
    T: Transport,
    D: DelayNs,
    M: RawMutex,
{
    let shift = regs::action_ctrl_shift(index);
    map.update_bits(
        regs::action_ctrl(index),
        regs::ACTION_CTRL_NEGATE << shift,
        field::prep_flag(regs::ACTION_CTRL_NEGATE, negate) << shift,
    )
}

fn get_rule_negate<T, D, M>(map: &RegisterMap<T, D, M>, index: u8) -> Result<bool>
where
    T: Transport,
    D: DelayNs,
    M: RawMutex,
{
    let value = map.read(regs::action_ctrl(index))?;
    Ok(field::flag(
        regs::ACTION_CTRL_NEGATE,
        value >> regs::action_ctrl_shift(index),
    ))
}

// =============================================================================
// Global Configuration
// =============================================================================

/// Reset ACL to a well-defined state
///
/// Disables ACL on every port, permits unmatched frames, sets every mode
/// set to [`ActionMode::ALL`] and every negate bit to 0, then erases both
/// tables. Call before (re)configuring ACL.
pub fn reset<T, D, M>(map: &RegisterMap<T, D, M>) -> Result<()>
where
    T: Transport,
    D: DelayNs,
    M: RawMutex,
{
    map.write(regs::ENABLE, 0)?;
    map.write(regs::UNMATCH_PERMIT, regs::UNMATCH_PERMIT_MASK)?;

    for index in 0..NUM_ACL_CONFIGS {
        set_action_mode(map, index, ActionMode::ALL)?;
        set_rule_negate(map, index, false)?;
    }

    map.write(regs::RESET, regs::RESET_MASK)?;

    #[cfg(feature = "defmt")]
    defmt::info!("acl: reset");

    Ok(())
}

/// Program the field layout of all templates
pub fn set_template_config<T, D, M>(map: &RegisterMap<T, D, M>, config: &TemplateConfig) -> Result<()>
where
    T: Transport,
    D: DelayNs,
    M: RawMutex,
{
    for (t, fields) in config.templates.iter().enumerate() {
        for (pair, types) in fields.chunks_exact(2).enumerate() {
            let value = types[0] as u16 | ((types[1] as u16) << 8);
            map.write(regs::template(t, pair * 2), value)?;
        }
    }
    Ok(())
}

/// Program all field selectors
pub fn set_fieldsel_config<T, D, M>(map: &RegisterMap<T, D, M>, config: &FieldSelConfig) -> Result<()>
where
    T: Transport,
    D: DelayNs,
    M: RawMutex,
{
    for (i, sel) in config.fieldsels.iter().enumerate() {
        let value = field::prep(regs::FIELDSEL_TYPE, sel.ty as u16)
            | field::prep(regs::FIELDSEL_OFFSET, sel.offset as u16);
        map.write(regs::fieldsel(i), value)?;
    }
    Ok(())
}

/// Enable or disable ACL lookups on `port`
pub fn set_port_enable<T, D, M>(map: &RegisterMap<T, D, M>, port: u8, enable: bool) -> Result<()>
where
    T: Transport,
    D: DelayNs,
    M: RawMutex,
{
    if port >= MAX_NUM_PORTS {
        return Err(ConfigError::InvalidPort.into());
    }
    let bit = (1u16 << port) & regs::ENABLE_MASK;
    map.update_bits(regs::ENABLE, bit, if enable { bit } else { 0 })
}

// =============================================================================
// Actions
// =============================================================================

/// Program action `index`
pub fn set_action<T, D, M>(map: &RegisterMap<T, D, M>, index: u8, action: &AclAction) -> Result<()>
where
    T: Transport,
    D: DelayNs,
    M: RawMutex,
{
    entry::check_index(index)?;
    let mut words = action.encode()?;

    set_action_mode(map, index, action.mode)?;
    table::query(
        map,
        &mut TableQuery::write(Table::AclAction, index as u16),
        &mut words,
    )
}

/// Read back action `index`
pub fn get_action<T, D, M>(map: &RegisterMap<T, D, M>, index: u8) -> Result<AclAction>
where
    T: Transport,
    D: DelayNs,
    M: RawMutex,
{
    entry::check_index(index)?;

    let mode = get_action_mode(map, index)?;
    let mut words = [0u16; ACTION_ENTRY_SIZE];
    table::query(
        map,
        &mut TableQuery::read(Table::AclAction, index as u16),
        &mut words,
    )?;
    Ok(AclAction::decode(&words, mode))
}

// =============================================================================
// Rules
// =============================================================================

/// Program rule `index`
///
/// The data row is cleared first so the rule is invalid while it is
/// rewritten; a disabled rule stops there. The care row is written next
/// and the data row, carrying the valid bit, last.
pub fn set_rule<T, D, M>(map: &RegisterMap<T, D, M>, index: u8, rule: &AclRule) -> Result<()>
where
    T: Transport,
    D: DelayNs,
    M: RawMutex,
{
    entry::check_index(index)?;
    let (mut care, mut data) = rule.encode()?;

    let data_addr = entry::data_row_addr(index);
    let care_addr = entry::care_row_addr(index);

    let mut blank = [0u16; RULE_ENTRY_SIZE];
    table::query(map, &mut TableQuery::write(Table::AclRule, data_addr), &mut blank)?;

    if !rule.enabled {
        #[cfg(feature = "defmt")]
        defmt::debug!("acl: rule {} cleared", index);

        return Ok(());
    }

    set_rule_negate(map, index, rule.negate)?;
    table::query(map, &mut TableQuery::write(Table::AclRule, care_addr), &mut care)?;
    table::query(map, &mut TableQuery::write(Table::AclRule, data_addr), &mut data)?;

    #[cfg(feature = "defmt")]
    defmt::debug!("acl: rule {} template {} written", index, rule.template);

    Ok(())
}

/// Read back rule `index`
///
/// Returns [`TableError::NotFound`] when the rule is not valid.
pub fn get_rule<T, D, M>(map: &RegisterMap<T, D, M>, index: u8) -> Result<AclRule>
where
    T: Transport,
    D: DelayNs,
    M: RawMutex,
{
    entry::check_index(index)?;

    let mut data = [0u16; RULE_ENTRY_SIZE];
    let mut care = [0u16; RULE_ENTRY_SIZE];
    table::query(
        map,
        &mut TableQuery::read(Table::AclRule, entry::data_row_addr(index)),
        &mut data,
    )?;
    if !entry::data_row_valid(&data) {
        return Err(Error::Table(TableError::NotFound));
    }
    table::query(
        map,
        &mut TableQuery::read(Table::AclRule, entry::care_row_addr(index)),
        &mut care,
    )?;

    let negate = get_rule_negate(map, index)?;
    Ok(AclRule::decode(&care, &data, negate))
}

// =============================================================================
// Unit Tests
// =============================================================================
