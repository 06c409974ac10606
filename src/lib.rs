//! RTL8365MB Switch Core
//!
//! A `no_std`, `no_alloc` control-plane driver for the Realtek RTL8365MB
//! family of managed Ethernet switch chips (RTL8365MB-VC, RTL8367S,
//! RTL8367RB-VB).
//!
//! The crate talks to the switch over its management bus, exposes the
//! register file through a lock-protected register map and drives the
//! chip's internal tables: the forwarding database, the ACL rule and
//! action tables, the VLAN4k table and the VLAN membership configs.
//!
//! # Architecture
//!
//! The driver is organized into layers, each only calling the one below:
//!
//! 1. **Transport** ([`hal`]): bit-banged SMI or indirect MDIO access to
//!    one 16-bit register at a time
//! 2. **Register map** ([`regmap`]): serialized register access, polling
//!    and multi-register sequences under one lock
//! 3. **Table engine** ([`table`]): the shared read/write window used by
//!    every internal table
//! 4. **Codecs** ([`l2`], [`acl`], [`vlan`]): typed entries packed into
//!    and out of table words
//! 5. **Switch handle** ([`Switch`]): chip detection, reset and the
//!    L2 lock for read-modify-write sequences on the forwarding database
//!
//! # Features
//!
//! - `defmt`: Enable defmt logging and formatting for public types
//!
//! # Example
//!
//! ```ignore
//! use rtl8365mb::{ChipRegistry, SmiBus, SmiConfig, Switch, SwitchConfig};
//!
//! let smi = SmiBus::new(mdc, mdio, delay.clone(), SmiConfig::RTL8365MB);
//! let registry = ChipRegistry::with_known_chips();
//!
//! let switch: Switch<_, _> = Switch::probe(smi, delay, &registry, SwitchConfig::new())?;
//! switch.fdb_add(1, [0x02, 0x00, 0x00, 0x00, 0x00, 0x01], 1, 0)?;
//! ```
//!
//! # Locking
//!
//! All register traffic goes through the register map lock; the switch
//! handle adds an L2 lock around forwarding database updates, always taken
//! before the register map lock. Both are per-instance blocking mutexes
//! generic over a [`lock_api::RawMutex`] supplied by the host, defaulting
//! to [`sync::CriticalSectionRawMutex`]. Operations may sleep while
//! holding them and must not run in interrupt context.

#![no_std]
#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::correctness)]
#![warn(
    clippy::suspicious,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::cloned_instead_of_copied,
    clippy::explicit_iter_loop,
    clippy::implicit_clone,
    clippy::inconsistent_struct_constructor,
    clippy::manual_assert,
    clippy::manual_let_else,
    clippy::match_same_arms,
    clippy::needless_pass_by_value,
    clippy::semicolon_if_nothing_returned,
    clippy::uninlined_format_args,
    clippy::unnested_or_patterns,
    clippy::std_instead_of_core,
    clippy::std_instead_of_alloc,
    clippy::alloc_instead_of_core
)]
#![allow(
    clippy::mod_module_files,
    clippy::self_named_module_files,
    clippy::similar_names,
    clippy::too_many_arguments,
    clippy::struct_excessive_bools,
    clippy::fn_params_excessive_bools,
    clippy::type_complexity,
    clippy::must_use_candidate,
    clippy::assertions_on_constants,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss,
    clippy::cast_lossless,
    clippy::panic_in_result_fn,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::module_name_repetitions,
    clippy::wildcard_imports,
    clippy::items_after_statements
)]

// =============================================================================
// Modules
// =============================================================================

pub mod acl;
pub mod chip;
pub mod constants;
pub mod driver;
pub mod error;
pub mod field;
pub mod hal;
pub mod l2;
pub mod regmap;
pub mod sync;
pub mod table;
pub mod vlan;

// Test utilities (only available during testing)
#[cfg(test)]
mod test_utils;

// =============================================================================
// Re-exports
// =============================================================================

pub use chip::{ChipInfo, ChipRegistry};
pub use driver::config::{SmiConfig, SwitchConfig};
pub use driver::switch::Switch;
pub use error::{
    CodecError, CodecResult, ConfigError, ConfigResult, Error, IoError, IoResult, Result,
    TableError, TableResult,
};
pub use hal::{IndirectMdio, MdioBus, SmiBus, SmiLine, Transport};
pub use regmap::RegisterMap;
pub use sync::CriticalSectionRawMutex;

pub use acl::{AclAction, AclRule, FieldSelConfig, TemplateConfig};
pub use l2::{L2Entry, MacAddr, McEntry, McKey, UcEntry, UcKey};
pub use vlan::{Vlan4k, VlanMc, VlanMcEntry, VlanMcPool};
