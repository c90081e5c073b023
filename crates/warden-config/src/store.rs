//! Versioned, lock-free configuration snapshots.

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing::info;
use warden_core::ResourceId;

use crate::error::ConfigResult;
use crate::types::{GatewayConfig, ResourceConfig};
use crate::validate::validate_resource;

type Snapshot = HashMap<ResourceId, Arc<ResourceConfig>>;

/// Resource configs keyed by resource id, published through an atomic swap.
///
/// Readers call [`ConfigStore::snapshot`] once per decision and keep the
/// returned `Arc` for the whole decision. Writers build a new map and swap
/// it in, so a reader never observes a half-applied update.
#[derive(Debug, Default)]
pub struct ConfigStore {
    inner: ArcSwap<Snapshot>,
}

impl ConfigStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a loaded gateway config.
    ///
    /// # Errors
    ///
    /// Returns a validation error if any resource is invalid.
    pub fn from_config(config: &GatewayConfig) -> ConfigResult<Self> {
        let store = Self::new();
        for resource in &config.resources {
            store.upsert(resource.clone())?;
        }
        Ok(store)
    }

    /// Current config for a resource.
    #[must_use]
    pub fn snapshot(&self, id: &ResourceId) -> Option<Arc<ResourceConfig>> {
        self.inner.load().get(id).cloned()
    }

    /// Validate and publish a resource config.
    ///
    /// The stored policy version is one greater than the version it replaces
    /// (or the supplied version for a new resource). Returns the published version.
    ///
    /// # Errors
    ///
    /// Returns a validation error; the current snapshot is left untouched.
    pub fn upsert(&self, mut resource: ResourceConfig) -> ConfigResult<u64> {
        validate_resource(&resource)?;

        let mut version = resource.policy.version;
        self.inner.rcu(|current| {
            let mut next = Snapshot::clone(current);
            version = match current.get(&resource.id) {
                Some(previous) => previous
                    .policy
                    .version
                    .saturating_add(1)
                    .max(resource.policy.version),
                None => resource.policy.version,
            };
            resource.policy.version = version;
            next.insert(resource.id.clone(), Arc::new(resource.clone()));
            next
        });

        info!(resource = %resource.id, version, "published resource config");
        Ok(version)
    }

    /// Remove a resource. Returns whether it existed.
    pub fn remove(&self, id: &ResourceId) -> bool {
        let mut existed = false;
        self.inner.rcu(|current| {
            let mut next = Snapshot::clone(current);
            existed = next.remove(id).is_some();
            next
        });
        existed
    }

    /// Ids of all configured resources, sorted.
    #[must_use]
    pub fn resource_ids(&self) -> Vec<ResourceId> {
        let mut ids: Vec<_> = self.inner.load().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Number of configured resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.load().len()
    }

    /// Whether no resources are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.load().is_empty()
    }
}
