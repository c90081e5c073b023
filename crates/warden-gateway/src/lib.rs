//! Warden Gateway - The decision orchestrator.
//!
//! [`DecisionGateway`] is the single entry point: every request flows through
//! [`DecisionGateway::decide`] before anything is sent upstream, and only an
//! ALLOW verdict ever reaches the [`UpstreamExecutor`].
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//! use warden_approval::ApprovalStore;
//! use warden_audit::AuditLog;
//! use warden_config::{ConfigStore, PolicyConfig, ResourceConfig};
//! use warden_core::{HttpVerb, InvocationRequest, Outcome};
//! use warden_gateway::DecisionGateway;
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let config = Arc::new(ConfigStore::new());
//! config
//!     .upsert(ResourceConfig::new(
//!         "shop",
//!         PolicyConfig::new("https://api.shop.example", [HttpVerb::Get]),
//!     ))
//!     .unwrap();
//!
//! let gateway = DecisionGateway::new(
//!     config,
//!     Arc::new(ApprovalStore::new(Duration::from_secs(3600))),
//!     AuditLog::in_memory(),
//! );
//!
//! let request = InvocationRequest::new("shop", "listOrders", HttpVerb::Get, "/orders");
//! let verdict = gateway.decide(&request, &CancellationToken::new()).await.unwrap();
//! assert_eq!(verdict.outcome, Outcome::Allow);
//! # });
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

/// Error types for the gateway.
pub mod error;
pub mod executor;
pub mod gateway;
/// The final verdict type.
pub mod verdict;

pub use error::{GatewayError, GatewayResult, UpstreamError};
pub use executor::{UpstreamCall, UpstreamExecutor};
pub use gateway::{DecisionGateway, Replay};
pub use verdict::FinalVerdict;
