//! The redacted view of a request that is sent to the reviewer.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use warden_core::{Classification, HttpVerb, InvocationRequest, ResourceId, redact_arguments};

/// What the risk reviewer is allowed to see of a request.
///
/// Argument values under secret-looking keys are replaced before the context
/// is built; the removed values are kept locally so they can be scrubbed from
/// whatever text the reviewer sends back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewContext {
    /// Resource the operation belongs to.
    pub resource_id: ResourceId,
    /// Operation identifier.
    pub operation_id: String,
    /// HTTP verb.
    pub verb: HttpVerb,
    /// Request path.
    pub path: String,
    /// Operation classification.
    pub classification: Classification,
    /// Free-form risk tags.
    pub risk_tags: Vec<String>,
    /// Arguments with secrets redacted.
    pub arguments: Map<String, Value>,
    #[serde(skip)]
    secrets: Vec<String>,
}

impl ReviewContext {
    /// Build the redacted context for a request.
    #[must_use]
    pub fn from_request(request: &InvocationRequest) -> Self {
        let redacted = redact_arguments(request.arguments());
        Self {
            resource_id: request.resource_id().clone(),
            operation_id: request.operation_id().to_string(),
            verb: request.verb(),
            path: request.path().to_string(),
            classification: request.classification(),
            risk_tags: request.risk_tags().iter().cloned().collect(),
            arguments: redacted.arguments,
            secrets: redacted.secrets,
        }
    }

    /// Secret values removed from the arguments.
    #[must_use]
    pub fn secrets(&self) -> &[String] {
        &self.secrets
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use warden_core::REDACTED;

    #[test]
    fn test_context_redacts_nested_secrets() {
        let request = InvocationRequest::new("shop", "createOrder", HttpVerb::Post, "/orders")
            .with_classification(Classification::Write)
            .with_risk_tag("payments")
            .with_json_arguments(json!({
                "amount": 10,
                "auth": {"api_key": "sk-live-123456", "region": "eu"},
            }));

        let ctx = ReviewContext::from_request(&request);
        assert_eq!(ctx.arguments["amount"], json!(10));
        assert_eq!(ctx.arguments["auth"]["api_key"], json!(REDACTED));
        assert_eq!(ctx.arguments["auth"]["region"], json!("eu"));
        assert_eq!(ctx.secrets(), ["sk-live-123456".to_string()]);
        assert_eq!(ctx.risk_tags, vec!["payments".to_string()]);
    }

    #[test]
    fn test_context_wire_shape() {
        let request = InvocationRequest::new("shop", "listOrders", HttpVerb::Get, "/orders")
            .with_json_arguments(json!({"password": "hunter22"}));
        let body = serde_json::to_value(ReviewContext::from_request(&request)).unwrap();

        assert_eq!(body["resourceId"], json!("shop"));
        assert_eq!(body["operationId"], json!("listOrders"));
        assert_eq!(body["verb"], json!("GET"));
        assert!(body.get("secrets").is_none());
        assert!(!body.to_string().contains("hunter22"));
    }
}
