#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
//! Configuration for the Warden gateway.
//!
//! A gateway protects one or more upstream APIs ("resources"). Each resource
//! carries two read-only snapshots:
//!
//! - [`PolicyConfig`]: deterministic rules (domain lock, verb/path allowlist,
//!   rate limit, numeric ceilings, approval triggers, dry-run).
//! - [`RiskReviewConfig`]: whether and how the external risk reviewer gates
//!   execution, including the [`RiskThresholds`] bands.
//!
//! # Usage
//!
//! ```rust,no_run
//! use warden_config::{ConfigStore, loader};
//!
//! let config = loader::load_file(std::path::Path::new("warden.toml")).unwrap();
//! let store = ConfigStore::from_config(&config).unwrap();
//! println!("{} resources configured", store.len());
//! ```
//!
//! # Snapshots
//!
//! [`ConfigStore`] publishes resource configs through an atomic pointer swap.
//! A decision takes one snapshot at its start; a concurrent update becomes
//! visible only to decisions that start after it commits.

/// Configuration error types.
pub mod error;
/// Configuration file loading.
pub mod loader;
/// Compiled path allowlist patterns.
pub mod pattern;
/// Versioned snapshot store.
pub mod store;
/// Configuration struct definitions.
pub mod types;
/// Configuration validation rules.
pub mod validate;

// Re-export primary types at the crate root.
pub use error::{ConfigError, ConfigResult};
pub use pattern::PathPattern;
pub use store::ConfigStore;
pub use types::*;
