//! The seam to whatever performs the real upstream HTTP call.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use warden_core::{HttpVerb, InvocationRequest};

use crate::error::UpstreamError;

/// Everything needed to perform an allowed call.
///
/// Arguments are the request's exact, unredacted map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpstreamCall {
    /// HTTP verb.
    pub verb: HttpVerb,
    /// Upstream base URL from the resource configuration.
    pub base_url: String,
    /// Request path.
    pub path: String,
    /// Argument map.
    pub arguments: Map<String, Value>,
}

impl UpstreamCall {
    /// Build the call for `request` against `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>, request: &InvocationRequest) -> Self {
        Self {
            verb: request.verb(),
            base_url: base_url.into(),
            path: request.path().to_string(),
            arguments: request.arguments().clone(),
        }
    }
}

/// Performs upstream calls for allowed requests.
#[async_trait]
pub trait UpstreamExecutor: Send + Sync {
    /// Perform the call and return a short summary of the result.
    async fn execute(&self, call: &UpstreamCall) -> Result<String, UpstreamError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_call_carries_exact_arguments() {
        let request = InvocationRequest::new("shop", "createOrder", HttpVerb::Post, "/orders")
            .with_json_arguments(json!({"amount": 5, "api_key": "sk-123456"}));
        let call = UpstreamCall::new("https://api.shop.example", &request);

        assert_eq!(call.verb, HttpVerb::Post);
        assert_eq!(call.path, "/orders");
        assert_eq!(call.arguments["api_key"], json!("sk-123456"));
    }
}
