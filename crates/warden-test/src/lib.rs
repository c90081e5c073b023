//! Warden Test - Shared test utilities for the Warden gateway.
//!
//! This crate provides mock implementations and test helpers that can be
//! used across multiple Warden crates as a dev-dependency.
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! warden-test.workspace = true
//! ```
//!
//! Then use in your tests:
//!
//! ```rust,ignore
//! #[cfg(test)]
//! mod tests {
//!     use warden_test::{ScriptedReviewer, shop_gateway, shop_resource, test_read_request};
//!
//!     #[tokio::test]
//!     async fn test_review_flow() {
//!         let reviewer = ScriptedReviewer::new().with_verdict("ALLOW", 10, "read only");
//!         let gateway = shop_gateway(shop_resource()).with_reviewer(reviewer.clone());
//!         // ...
//!     }
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

pub mod clock;
pub mod fixtures;
pub mod mocks;

pub use clock::*;
pub use fixtures::*;
pub use mocks::*;

/// Install a test subscriber honouring `RUST_LOG`. Safe to call repeatedly.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
