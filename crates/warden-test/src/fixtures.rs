//! Test fixtures for common types.

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use warden_approval::ApprovalStore;
use warden_audit::AuditLog;
use warden_config::{
    ConfigStore, PolicyConfig, RateLimit, ResourceConfig, RiskReviewConfig, RiskThresholds,
};
use warden_core::{Classification, HttpVerb, InvocationRequest};
use warden_gateway::DecisionGateway;

/// Base URL of the shop test resource.
pub const SHOP_BASE_URL: &str = "https://api.shop.example";

/// Policy for the shop resource: GET/POST on `/orders` and `/orders/{id}`,
/// amount ceiling 100000.
///
/// # Panics
///
/// Panics if a constant path pattern fails to compile.
#[must_use]
pub fn shop_policy() -> PolicyConfig {
    PolicyConfig::new(SHOP_BASE_URL, [HttpVerb::Get, HttpVerb::Post])
        .with_ceiling("amount", 100_000.0)
        .with_path("/orders")
        .and_then(|p| p.with_path("/orders/{id}"))
        .expect("constant path patterns compile")
}

/// The shop resource with review disabled.
#[must_use]
pub fn shop_resource() -> ResourceConfig {
    ResourceConfig::new("shop", shop_policy())
}

/// The shop resource with an enforcing review and thresholds 30/31/71.
#[must_use]
pub fn shop_resource_reviewed(timeout: Duration) -> ResourceConfig {
    let thresholds = RiskThresholds::new(30, 31, 71).unwrap_or_default();
    shop_resource().with_review(RiskReviewConfig::enforcing(timeout).with_thresholds(thresholds))
}

/// The shop resource limited to `max` requests per `window_secs`.
#[must_use]
pub fn shop_resource_limited(max: u32, window_secs: u64) -> ResourceConfig {
    let mut resource = shop_resource();
    resource.policy = resource
        .policy
        .with_rate_limit(RateLimit::new(max, window_secs));
    resource
}

/// A gateway over a single resource with in-memory stores and 1h expiry.
///
/// # Panics
///
/// Panics if `resource` does not validate.
#[must_use]
pub fn shop_gateway(resource: ResourceConfig) -> DecisionGateway {
    let store = Arc::new(ConfigStore::new());
    store.upsert(resource).expect("test resource must validate");
    DecisionGateway::new(
        store,
        Arc::new(ApprovalStore::new(Duration::from_secs(3600))),
        AuditLog::in_memory(),
    )
}

/// `GET /orders`, classified READ.
#[must_use]
pub fn test_read_request() -> InvocationRequest {
    InvocationRequest::new("shop", "listOrders", HttpVerb::Get, "/orders")
        .with_caller("agent-1")
}

/// `POST /orders` with an amount, classified WRITE.
#[must_use]
pub fn test_write_request(amount: f64) -> InvocationRequest {
    InvocationRequest::new("shop", "createOrder", HttpVerb::Post, "/orders")
        .with_classification(Classification::Write)
        .with_caller("agent-1")
        .with_json_arguments(json!({
            "amount": amount,
            "currency": "EUR",
            "api_key": "sk-live-0123456789",
        }))
}
