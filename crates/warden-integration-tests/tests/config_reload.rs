//! Configuration loading, validation, and versioned updates.

use std::io::Write;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use warden_config::{ConfigError, PolicyConfig, ResourceConfig, loader};
use warden_core::{HttpVerb, Outcome};
use warden_gateway::{DecisionGateway, GatewayError};
use warden_test::{shop_gateway, shop_resource, test_read_request};

const CONFIG: &str = r#"
[logging]
level = "debug"
format = "json"

[approvals]
expiry_hours = 4

[[resources]]
id = "shop"

[resources.policy]
base_url = "https://api.shop.example"
allowed_verbs = ["GET", "POST"]
allowed_paths = ["/orders", "/orders/{id}"]
require_approval_for_writes = true
numeric_ceilings = { amount = 100000 }
rate_limit = { max_requests = 100, window_secs = 60 }

[resources.review]
enabled = true
mode = "enforcing"
timeout_ms = 1500
fallback = "REQUIRE_APPROVAL"
endpoint = "https://review.internal.example/v1/review"

[resources.review.thresholds]
allow_max = 30
approval_min = 31
block_min = 71
"#;

#[tokio::test]
async fn test_gateway_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(CONFIG.as_bytes()).unwrap();

    let config = loader::load_file(file.path()).unwrap();
    assert_eq!(config.logging.format, "json");
    assert_eq!(config.approvals.expiry(), Duration::from_secs(4 * 3600));
    let shop = &config.resources[0];
    assert_eq!(shop.review.timeout(), Duration::from_millis(1500));
    assert_eq!(shop.review.thresholds.block_min(), 71);

    let gateway = DecisionGateway::from_config(&config).unwrap();
    let blocked = gateway
        .decide(
            &warden_core::InvocationRequest::new("shop", "x", HttpVerb::Delete, "/orders"),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    assert_eq!(blocked.outcome, Outcome::Blocked);
}

#[test]
fn test_invalid_thresholds_are_rejected_at_load() {
    let broken = CONFIG.replace("approval_min = 31", "approval_min = 20");
    assert!(loader::from_toml_str(&broken).is_err());
}

#[test]
fn test_unknown_ceiling_field_is_rejected() {
    let broken = CONFIG.replace("{ amount = 100000 }", "{ colour = 3 }");
    assert!(matches!(
        loader::from_toml_str(&broken),
        Err(ConfigError::ValidationError { .. })
    ));
}

#[tokio::test]
async fn test_updates_apply_to_later_decisions_only() {
    let gateway = shop_gateway(shop_resource());
    let cancel = CancellationToken::new();

    let before = gateway.decide(&test_read_request(), &cancel).await.unwrap();
    assert_eq!(before.outcome, Outcome::Allow);
    let first_version = before.audit.policy.config_version;

    let locked = ResourceConfig::new(
        "shop",
        PolicyConfig::new("https://api.shop.example", [HttpVerb::Post]),
    );
    let version = gateway.update_resource(locked).unwrap();
    assert!(version > first_version);

    let after = gateway.decide(&test_read_request(), &cancel).await.unwrap();
    assert_eq!(after.outcome, Outcome::Blocked);
    assert_eq!(after.audit.policy.config_version, version);
}

#[tokio::test]
async fn test_rejected_update_keeps_previous_config() {
    let gateway = shop_gateway(shop_resource());
    let bad = ResourceConfig::new("shop", PolicyConfig::new("https://api.shop.example", Vec::<HttpVerb>::new()));

    let err = gateway.update_resource(bad).unwrap_err();
    assert!(matches!(err, GatewayError::InvalidConfig(_)));

    let verdict = gateway
        .decide(&test_read_request(), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(verdict.outcome, Outcome::Allow);
}

#[test]
fn test_unparsable_base_url_is_rejected_at_load() {
    let broken = CONFIG.replace("\"https://api.shop.example\"", "\"not a url\"");
    assert!(matches!(
        loader::from_toml_str(&broken),
        Err(ConfigError::ValidationError { field, .. }) if field == "resources.shop.policy.base_url"
    ));

    let gateway = shop_gateway(shop_resource());
    let bad = ResourceConfig::new("shop", PolicyConfig::new("not a url", [HttpVerb::Get]));
    assert!(matches!(
        gateway.update_resource(bad),
        Err(GatewayError::InvalidConfig(ConfigError::ValidationError { .. }))
    ));
}
