//! Prelude module - commonly used types for convenient import.
//!
//! Use `use warden_gateway::prelude::*;` to import all essential types.

// Errors
pub use crate::{GatewayError, GatewayResult, UpstreamError};

// Gateway
pub use crate::{DecisionGateway, FinalVerdict, Replay};

// Upstream
pub use crate::{UpstreamCall, UpstreamExecutor};
