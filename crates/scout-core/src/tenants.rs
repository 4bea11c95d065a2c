use dashmap::DashMap;

use crate::error::ScoutError;
use crate::types::TenantConfig;

/// In-memory view of every known tenant's configuration.
///
/// Persistence of changes is the caller's job; every mutator returns the
/// updated config so it can be written through.
#[derive(Debug, Default)]
pub struct TenantDirectory {
    configs: DashMap<String, TenantConfig>,
}

impl TenantDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }

    pub fn contains(&self, tenant_id: &str) -> bool {
        self.configs.contains_key(tenant_id)
    }

    /// Insert or replace a config (e.g. when loading from storage).
    pub fn upsert(&self, config: TenantConfig) {
        self.configs.insert(config.tenant_id.clone(), config);
    }

    /// Register a tenant with `defaults` unless it is already known.
    ///
    /// Returns the config and whether it was newly created.
    pub fn register(&self, defaults: TenantConfig) -> (TenantConfig, bool) {
        let mut created = false;
        let config = self
            .configs
            .entry(defaults.tenant_id.clone())
            .or_insert_with(|| {
                created = true;
                defaults
            })
            .clone();
        (config, created)
    }

    pub fn get(&self, tenant_id: &str) -> Option<TenantConfig> {
        self.configs.get(tenant_id).map(|c| c.clone())
    }

    /// Like [`get`](Self::get) but fails with `UnknownTenant`.
    pub fn require(&self, tenant_id: &str) -> Result<TenantConfig, ScoutError> {
        self.get(tenant_id)
            .ok_or_else(|| ScoutError::UnknownTenant(tenant_id.to_string()))
    }

    pub fn all(&self) -> Vec<TenantConfig> {
        self.configs.iter().map(|c| c.value().clone()).collect()
    }

    /// Apply `f` to the tenant's config and return the result.
    pub fn update(
        &self,
        tenant_id: &str,
        f: impl FnOnce(&mut TenantConfig),
    ) -> Result<TenantConfig, ScoutError> {
        let mut entry = self
            .configs
            .get_mut(tenant_id)
            .ok_or_else(|| ScoutError::UnknownTenant(tenant_id.to_string()))?;
        f(entry.value_mut());
        Ok(entry.value().clone())
    }
}
