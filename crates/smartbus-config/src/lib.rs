//! SmartBus Config - configuration for SmartBus event buses.
//!
//! A bus is configured from TOML:
//!
//! ```toml
//! identifier = "orders"
//!
//! [dispatch]
//! mode = "async"      # or "immediate" (default)
//!
//! [log]               # optional
//! level = "info"
//! format = "compact"
//! ```
//!
//! # Example
//!
//! ```rust
//! use smartbus_config::{BusConfig, DispatchMode};
//!
//! # fn main() -> Result<(), smartbus_config::ConfigError> {
//! let config = BusConfig::from_toml_str("identifier = \"orders\"")?;
//! assert_eq!(config.dispatch.mode, DispatchMode::Immediate);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod error;
mod loader;
mod types;
mod validate;

pub use error::{ConfigError, ConfigResult};
pub use types::{BusConfig, DispatchConfig, DispatchMode};
