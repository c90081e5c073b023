//! Warden Telemetry - Logging and tracing for the Warden gateway.
//!
//! This crate provides:
//! - Configurable logging setup (pretty, compact, JSON, or full format)
//! - A [`DecisionContext`] that correlates every log line of one decision
//!
//! # Example
//!
//! ```rust,no_run
//! use warden_telemetry::{DecisionContext, LogConfig, LogFormat, setup_logging};
//!
//! # fn main() -> Result<(), warden_telemetry::TelemetryError> {
//! let config = LogConfig::new("info")
//!     .with_format(LogFormat::Json)
//!     .with_directive("warden_review=debug");
//! setup_logging(&config)?;
//!
//! let ctx = DecisionContext::new("shop", "createOrder", "agent-7");
//! let _guard = ctx.span().entered();
//! tracing::info!("evaluating");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod context;
mod error;
mod logging;

pub use context::DecisionContext;
pub use error::{TelemetryError, TelemetryResult};
pub use logging::{LogConfig, LogFormat, LogTarget, setup_default_logging, setup_logging};
