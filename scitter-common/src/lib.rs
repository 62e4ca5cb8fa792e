//! Shared utilities for the Scitter crates.
//!
//! Kept deliberately small so every crate in the workspace can depend on it.
//!
//! - [`observability`]: centralised `tracing` initialisation used by the
//!   `scitter` binary and by integration tests.
//!
//! ```rust
//! use scitter_common::observability::{LogConfig, LogFormat};
//!
//! let cfg = LogConfig {
//!     format: LogFormat::Json,
//!     ..LogConfig::default()
//! };
//! assert_eq!(cfg.app_name, "scitter");
//! assert_eq!(cfg.default_filter, "info");
//! ```
pub mod observability;

pub use observability::{init_logging, LogConfig, LogFormat};
