//! Post-deserialization configuration validation.
//!
//! Checks value ranges and cross-field invariants that serde cannot express.
//! Threshold ordering and path pattern syntax are already enforced at
//! deserialization time by their newtypes.

use std::collections::HashSet;

use tracing::warn;
use warden_core::{HostRejection, check_upstream_host};

use crate::error::{ConfigError, ConfigResult};
use crate::types::{
    ApprovalSection, GatewayConfig, LoggingSection, PolicyConfig, ResourceConfig,
    RiskReviewConfig, WATCHED_NUMERIC_FIELDS,
};

/// Upper bound for the reviewer timeout (one minute).
const MAX_REVIEW_TIMEOUT_MS: u64 = 60_000;

/// Upper bound for approval expiry (thirty days).
const MAX_EXPIRY_HOURS: u64 = 30 * 24;

/// Validate a deserialized gateway configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &GatewayConfig) -> ConfigResult<()> {
    validate_logging(&config.logging)?;
    validate_approvals(&config.approvals)?;

    let mut seen = HashSet::new();
    for resource in &config.resources {
        if !seen.insert(resource.id.as_str()) {
            return Err(ConfigError::ValidationError {
                field: "resources.id".to_owned(),
                message: format!("duplicate resource id '{}'", resource.id),
            });
        }
        validate_resource(resource)?;
    }
    Ok(())
}

/// Validate a single resource config.
///
/// Used both at load time and by [`ConfigStore::upsert`](crate::ConfigStore::upsert).
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate_resource(resource: &ResourceConfig) -> ConfigResult<()> {
    if resource.id.as_str().trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "resources.id".to_owned(),
            message: "resource id must not be empty".to_owned(),
        });
    }
    let prefix = format!("resources.{}", resource.id);
    validate_policy(&prefix, &resource.policy)?;
    validate_review(&prefix, &resource.review)?;
    Ok(())
}

fn validate_policy(prefix: &str, policy: &PolicyConfig) -> ConfigResult<()> {
    if policy.base_url.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: format!("{prefix}.policy.base_url"),
            message: "base_url is required".to_owned(),
        });
    }

    // An internal upstream is still loadable; the domain lock blocks every
    // request to it at decision time. A URL without a usable host is not.
    match check_upstream_host(&policy.base_url) {
        Ok(_) => {},
        Err(rejection @ (HostRejection::Unparsable(_) | HostRejection::MissingHost)) => {
            return Err(ConfigError::ValidationError {
                field: format!("{prefix}.policy.base_url"),
                message: rejection.to_string(),
            });
        },
        Err(rejection) => {
            warn!(
                resource = prefix,
                base_url = %policy.base_url,
                %rejection,
                "upstream fails the domain lock; all requests will be blocked"
            );
        },
    }

    if policy.enabled && policy.allowed_verbs.is_empty() {
        return Err(ConfigError::ValidationError {
            field: format!("{prefix}.policy.allowed_verbs"),
            message: "an enabled resource must allow at least one verb".to_owned(),
        });
    }

    if let Some(limit) = policy.rate_limit {
        if limit.max_requests == 0 {
            return Err(ConfigError::ValidationError {
                field: format!("{prefix}.policy.rate_limit.max_requests"),
                message: "max_requests must be at least 1".to_owned(),
            });
        }
        if limit.window_secs == 0 {
            return Err(ConfigError::ValidationError {
                field: format!("{prefix}.policy.rate_limit.window_secs"),
                message: "window_secs must be at least 1".to_owned(),
            });
        }
    }

    for (field, ceiling) in &policy.numeric_ceilings {
        if !WATCHED_NUMERIC_FIELDS.contains(&field.as_str()) {
            return Err(ConfigError::ValidationError {
                field: format!("{prefix}.policy.numeric_ceilings.{field}"),
                message: format!(
                    "'{field}' is not a watched field; expected one of: {}",
                    WATCHED_NUMERIC_FIELDS.join(", ")
                ),
            });
        }
        if !ceiling.is_finite() || *ceiling < 0.0 {
            return Err(ConfigError::ValidationError {
                field: format!("{prefix}.policy.numeric_ceilings.{field}"),
                message: "ceiling must be a finite non-negative number".to_owned(),
            });
        }
    }

    Ok(())
}

fn validate_review(prefix: &str, review: &RiskReviewConfig) -> ConfigResult<()> {
    if review.timeout_ms == 0 || review.timeout_ms > MAX_REVIEW_TIMEOUT_MS {
        return Err(ConfigError::ValidationError {
            field: format!("{prefix}.review.timeout_ms"),
            message: format!("timeout_ms must be between 1 and {MAX_REVIEW_TIMEOUT_MS}"),
        });
    }

    if let Some(endpoint) = &review.endpoint
        && url::Url::parse(endpoint).is_err()
    {
        return Err(ConfigError::ValidationError {
            field: format!("{prefix}.review.endpoint"),
            message: format!("'{endpoint}' is not a valid URL"),
        });
    }

    if review.fallback == warden_core::RiskDecision::Allow {
        warn!(
            resource = prefix,
            "review fallback is ALLOW; an unavailable reviewer will not hold requests"
        );
    }

    Ok(())
}

fn validate_approvals(approvals: &ApprovalSection) -> ConfigResult<()> {
    if approvals.expiry_hours == 0 || approvals.expiry_hours > MAX_EXPIRY_HOURS {
        return Err(ConfigError::ValidationError {
            field: "approvals.expiry_hours".to_owned(),
            message: format!("expiry_hours must be between 1 and {MAX_EXPIRY_HOURS}"),
        });
    }
    if approvals.sweep_interval_secs == 0 {
        return Err(ConfigError::ValidationError {
            field: "approvals.sweep_interval_secs".to_owned(),
            message: "sweep_interval_secs must be at least 1".to_owned(),
        });
    }
    Ok(())
}

fn validate_logging(logging: &LoggingSection) -> ConfigResult<()> {
    if !matches!(
        logging.level.as_str(),
        "trace" | "debug" | "info" | "warn" | "error"
    ) {
        return Err(ConfigError::ValidationError {
            field: "logging.level".to_owned(),
            message: format!(
                "unsupported level '{}'; expected one of: trace, debug, info, warn, error",
                logging.level
            ),
        });
    }
    if !matches!(
        logging.format.as_str(),
        "pretty" | "compact" | "json" | "full"
    ) {
        return Err(ConfigError::ValidationError {
            field: "logging.format".to_owned(),
            message: format!(
                "unsupported format '{}'; expected one of: pretty, compact, json, full",
                logging.format
            ),
        });
    }
    Ok(())
}
