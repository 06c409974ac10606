//! Centralized Constants
//!
//! Limits and timings shared by more than one part of the switch core.
//!
//! # Organization
//!
//! - **Ports**: port count and the all-ports mask
//! - **Table limits**: table sizes and field maxima
//! - **Timing**: poll intervals, timeouts and the reset sequence
//! - **SMI defaults**: per-variant bit-bang transport constants
//!
//! # Note
//!
//! Register addresses and bit masks stay in the module that owns the
//! corresponding hardware block (`table`, `l2`, `acl`, `vlan`, `chip`).

// =============================================================================
// Ports
// =============================================================================

/// Number of ports on the largest family member
pub const MAX_NUM_PORTS: u8 = 11;

/// Mask covering every switch port
pub const PORT_MASK_ALL: u16 = (1 << MAX_NUM_PORTS) - 1;

// =============================================================================
// Table Limits
// =============================================================================

/// Maximum number of entries the forwarding database can learn
pub const LEARN_LIMIT_MAX: u16 = 2112;

/// Number of ACL configs (rule/action pairs)
pub const NUM_ACL_CONFIGS: u8 = 96;

/// Number of VLAN membership configs
pub const NUM_MEMBER_CONFIGS: usize = 32;

/// Largest VLAN ID
pub const VID_MAX: u16 = 4095;

/// Largest enhanced VLAN ID
pub const EVID_MAX: u16 = 8191;

/// Largest priority value
pub const PRIORITY_MAX: u8 = 7;

/// Largest filtering ID
pub const FID_MAX: u8 = 15;

/// Largest extended filtering ID
pub const EFID_MAX: u8 = 7;

/// Largest meter index
pub const METER_MAX: u8 = 63;

/// Largest L2 age value
pub const AGE_MAX: u8 = 7;

// =============================================================================
// Timing Constants
// =============================================================================

/// Busy poll interval for table and flush commands (microseconds)
pub const TABLE_POLL_INTERVAL_US: u32 = 10;

/// Busy poll timeout for table and flush commands (microseconds)
pub const TABLE_POLL_TIMEOUT_US: u32 = 100;

/// Quiet time after a hardware reset before the bus is touched (milliseconds)
pub const RESET_SETTLE_MS: u32 = 100;

/// Poll interval while waiting for a hardware reset (milliseconds)
pub const RESET_POLL_MS: u32 = 20;

/// Hardware reset timeout (milliseconds)
pub const RESET_TIMEOUT_MS: u32 = 1000;

// =============================================================================
// SMI Defaults
// =============================================================================

/// Number of acknowledge polls before an SMI byte is declared lost
pub const SMI_ACK_RETRY_COUNT: u32 = 5;

/// SMI clock settle delay (nanoseconds)
pub const SMI_CLK_DELAY_NS: u32 = 10;

/// SMI read command byte
pub const SMI_CMD_READ: u8 = 0xB9;

/// SMI write command byte
pub const SMI_CMD_WRITE: u8 = 0xB8;
