//! # settle-core
//!
//! Core errors, logging and configuration helpers for the settle cost
//! settlement tool.
//!
//! This crate provides:
//! - [`SettleError`] - Infrastructure error type (configuration, I/O)
//! - [`logging`] - Tracing setup and the `log_batch_event!` macro
//! - [`config`] - YAML configuration file loading
//!
//! ## Example
//!
//! ```no_run
//! use settle_core::{logging, SettleError};
//!
//! fn main() -> settle_core::Result<()> {
//!     let _guard = logging::init_logging(None, false)?;
//!
//!     let config_path = std::path::Path::new("/etc/settle.yaml");
//!     if !config_path.exists() {
//!         return Err(SettleError::config_not_found(config_path));
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;

pub use error::{Result, SettleError};
pub use logging::{LogGuard, init_logging};
