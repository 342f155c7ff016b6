//! Utility Functions and Diagnostics
//!
//! Startup diagnostics and user-friendly error formatting for the host
//! bridge binary.
//!
//! ## Diagnostics
//!
//! ```rust,no_run
//! use radiant_input::config::Config;
//! use radiant_input::utils::log_startup_diagnostics;
//!
//! let config = Config::default_config();
//! log_startup_diagnostics(&config); // OS, CPUs, effective settings
//! ```
//!
//! ## Error Formatting
//!
//! ```rust,no_run
//! use radiant_input::utils::format_user_error;
//!
//! fn run() -> anyhow::Result<()> {
//!     anyhow::bail!("Failed to parse config file")
//! }
//!
//! if let Err(e) = run() {
//!     eprintln!("{}", format_user_error(&e));
//! }
//! ```
//!
//! Error categories with context-aware help:
//! - Config errors → syntax, invalid values
//! - Host errors → closed or polluted protocol streams
//! - Log file errors → unwritable paths

pub mod diagnostics;
pub mod errors;

pub use diagnostics::{log_startup_diagnostics, SystemInfo};
pub use errors::format_user_error;
