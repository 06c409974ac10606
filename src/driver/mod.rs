//! Switch handle and its configuration
//!
//! - [`config`] - Configuration types and builder patterns
//! - [`switch`] - The [`Switch`] handle tying chip, register map and locks together
//!
//! # Example
//!
//! ```ignore
//! use rtl8365mb::driver::{Switch, SwitchConfig};
//!
//! let config = SwitchConfig::new()
//!     .with_reset_on_probe(true)
//!     .with_reset_timeout_ms(2000);
//! ```

// Submodules
pub mod config;
pub mod switch;

// Re-exports for convenience
pub use config::{SmiConfig, SwitchConfig};
pub use switch::Switch;
