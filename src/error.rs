//! Error types for the rtl8365mb switch core
//!
//! Errors are organized by the layer that raises them:
//! - [`IoError`]: transport and register-level failures
//! - [`TableError`]: table query engine outcomes
//! - [`CodecError`]: entry fields that do not fit the hardware layout
//! - [`ConfigError`]: chip identification and setup problems
//!
//! The unified [`Error`] enum wraps all domain errors and is returned
//! by the register map, the table engine and the typed wrappers.

// =============================================================================
// I/O Errors
// =============================================================================

/// Transport and register access errors
///
/// These errors occur while moving a single register value to or from
/// the chip, or while waiting for a register to reach a given state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IoError {
    /// The chip did not acknowledge a byte on the SMI bus
    AckTimeout,
    /// The parent MDIO bus reported a failure
    Bus,
    /// A GPIO line could not be driven or sampled
    Pin,
    /// A polled register did not reach the expected state in time
    Timeout,
}

impl core::fmt::Display for IoError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl IoError {
    /// Returns a human-readable description of the error
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            IoError::AckTimeout => "SMI acknowledge timeout",
            IoError::Bus => "MDIO bus failure",
            IoError::Pin => "GPIO line failure",
            IoError::Timeout => "register poll timed out",
        }
    }
}

// =============================================================================
// Table Errors
// =============================================================================

/// Table query engine errors
///
/// `NotFound` is an expected outcome of lookups and table walks; the
/// others indicate a caller contract violation or an exhausted table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TableError {
    /// Lookup missed, or the addressed slot is not valid
    NotFound,
    /// Entry is wider than the table window
    TooLarge,
    /// The table or pool has no room for a new entry
    NoSpace,
    /// The addressed entry is of the other kind (unicast vs multicast)
    KindMismatch,
    /// Source port does not fit the table control port field
    PortFilterUnsupported,
}

impl core::fmt::Display for TableError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TableError {
    /// Returns a human-readable description of the error
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            TableError::NotFound => "entry not found",
            TableError::TooLarge => "entry too large for table window",
            TableError::NoSpace => "no space left",
            TableError::KindMismatch => "entry kind mismatch",
            TableError::PortFilterUnsupported => "port filter not supported",
        }
    }
}

// =============================================================================
// Codec Errors
// =============================================================================

/// Field range errors raised while packing an entry
///
/// Codecs validate every field before a single register is touched, so
/// these errors never leave the hardware in a partially written state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CodecError {
    /// VLAN ID exceeds 12 bits
    Vid,
    /// Enhanced VLAN ID exceeds 13 bits
    Evid,
    /// Filtering ID exceeds 4 bits
    Fid,
    /// Extended filtering ID exceeds 3 bits
    Efid,
    /// Priority exceeds 3 bits
    Priority,
    /// Meter index exceeds 6 bits
    Meter,
    /// Port number is not a switch port
    Port,
    /// Port mask has bits beyond the last switch port
    PortMask,
    /// Age exceeds 3 bits
    Age,
    /// ACL template index is not one of the five templates
    Template,
    /// VLAN membership config index is out of range
    McIndex,
    /// ACL rule or action index is out of range
    RuleIndex,
    /// ACL data bits are set where the care mask is clear
    DataOutsideCare,
}

impl core::fmt::Display for CodecError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl CodecError {
    /// Returns a human-readable description of the error
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            CodecError::Vid => "VLAN ID out of range",
            CodecError::Evid => "enhanced VLAN ID out of range",
            CodecError::Fid => "filtering ID out of range",
            CodecError::Efid => "extended filtering ID out of range",
            CodecError::Priority => "priority out of range",
            CodecError::Meter => "meter index out of range",
            CodecError::Port => "port out of range",
            CodecError::PortMask => "port mask out of range",
            CodecError::Age => "age out of range",
            CodecError::Template => "ACL template index out of range",
            CodecError::McIndex => "membership config index out of range",
            CodecError::RuleIndex => "ACL index out of range",
            CodecError::DataOutsideCare => "ACL data bits outside care mask",
        }
    }
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Chip identification and setup errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Chip ID/version pair is not in the registry
    UnknownChip,
    /// Chip registry has no free slot
    RegistryFull,
    /// Chip ID/version pair is already registered
    DuplicateChip,
    /// Port number is not a switch port
    InvalidPort,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ConfigError {
    /// Returns a human-readable description of the error
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ConfigError::UnknownChip => "unrecognized switch chip",
            ConfigError::RegistryFull => "chip registry full",
            ConfigError::DuplicateChip => "chip already registered",
            ConfigError::InvalidPort => "invalid port",
        }
    }
}

// =============================================================================
// Unified Error Type
// =============================================================================

/// This enum wraps all domain-specific errors for unified error handling.
///
/// Match on the inner domain error for specific handling:
/// ```ignore
/// match switch.l2_get_uc(&key) {
///     Err(Error::Table(TableError::NotFound)) => { /* key absent */ }
///     Err(Error::Io(IoError::AckTimeout)) => { /* bus trouble */ }
///     _ => {}
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Transport or register error
    Io(IoError),
    /// Table engine error
    Table(TableError),
    /// Entry codec error
    Codec(CodecError),
    /// Configuration error
    Config(ConfigError),
}

impl Error {
    /// Whether this error is the expected miss of a lookup or walk
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Error::Table(TableError::NotFound))
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::Io(e) => write!(f, "io: {}", e.as_str()),
            Error::Table(e) => write!(f, "table: {}", e.as_str()),
            Error::Codec(e) => write!(f, "codec: {}", e.as_str()),
            Error::Config(e) => write!(f, "config: {}", e.as_str()),
        }
    }
}

impl From<IoError> for Error {
    fn from(e: IoError) -> Self {
        Error::Io(e)
    }
}

impl From<TableError> for Error {
    fn from(e: TableError) -> Self {
        Error::Table(e)
    }
}

impl From<CodecError> for Error {
    fn from(e: CodecError) -> Self {
        Error::Codec(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

/// Result type alias for switch operations
pub type Result<T> = core::result::Result<T, Error>;

/// Result type alias for transport operations
pub type IoResult<T> = core::result::Result<T, IoError>;

/// Result type alias for table engine operations
pub type TableResult<T> = core::result::Result<T, TableError>;

/// Result type alias for codec operations
pub type CodecResult<T> = core::result::Result<T, CodecError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = core::result::Result<T, ConfigError>;

// =============================================================================
// Unit Tests
// =============================================================================
