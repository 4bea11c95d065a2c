use std::sync::Arc;

use scout_core::config::ScoutConfig;
use scout_core::error::ScoutError;
use scout_core::registry::TenantBossRegistry;
use scout_core::sinks::BossStore;
use scout_core::tenants::TenantDirectory;
use scout_core::types::TenantConfig;
use tracing::{info, warn};

use crate::boards::BoardKeeper;

/// Result of an admin operation.
#[derive(Debug)]
pub struct AdminOutcome {
    pub config: TenantConfig,
    /// `false` when the request matched the current settings.
    pub changed: bool,
    /// Follow-up calls that failed; the in-memory change stands.
    pub failures: Vec<ScoutError>,
}

/// Tenant-level settings changes.
#[derive(Clone)]
pub struct TenantAdmin {
    tenants: Arc<TenantDirectory>,
    registry: Arc<TenantBossRegistry>,
    store: Arc<dyn BossStore>,
    boards: BoardKeeper,
    config: ScoutConfig,
}

impl TenantAdmin {
    pub fn new(
        tenants: Arc<TenantDirectory>,
        registry: Arc<TenantBossRegistry>,
        store: Arc<dyn BossStore>,
        boards: BoardKeeper,
        config: ScoutConfig,
    ) -> Self {
        Self {
            tenants,
            registry,
            store,
            boards,
            config,
        }
    }

    async fn persist(&self, config: &TenantConfig) -> Vec<ScoutError> {
        match self.store.save_tenant_config(config).await {
            Ok(()) => Vec::new(),
            Err(e) => {
                warn!(tenant_id = %config.tenant_id, error = %e, "failed to persist tenant config");
                vec![ScoutError::from(e)]
            }
        }
    }

    /// Register a tenant with the configured default templates.
    ///
    /// Registering an existing tenant changes nothing.
    pub async fn register_tenant(&self, tenant_id: &str) -> AdminOutcome {
        let (config, created) = self.tenants.register(self.config.tenant_defaults(tenant_id));
        self.registry.get_or_create(tenant_id).await;

        let failures = if created {
            info!(tenant_id, "tenant registered");
            self.persist(&config).await
        } else {
            Vec::new()
        };
        AdminOutcome {
            config,
            changed: created,
            failures,
        }
    }

    /// Flip respawn notifications on or off.
    pub async fn toggle_layer_notifications(
        &self,
        tenant_id: &str,
    ) -> Result<AdminOutcome, ScoutError> {
        let config = self
            .tenants
            .update(tenant_id, |c| c.layer_notifications = !c.layer_notifications)?;
        info!(tenant_id, enabled = config.layer_notifications, "layer notifications toggled");
        let failures = self.persist(&config).await;
        Ok(AdminOutcome {
            config,
            changed: true,
            failures,
        })
    }

    /// Point notifications and boards at `channel`.
    ///
    /// Moving to a new channel forgets the old boards and posts fresh ones.
    pub async fn set_notification_channel(
        &self,
        tenant_id: &str,
        channel: &str,
    ) -> Result<AdminOutcome, ScoutError> {
        let current = self.tenants.require(tenant_id)?;
        if current.notification_channel.as_deref() == Some(channel) {
            return Ok(AdminOutcome {
                config: current,
                changed: false,
                failures: Vec::new(),
            });
        }

        let config = self
            .tenants
            .update(tenant_id, |c| c.notification_channel = Some(channel.to_string()))?;
        info!(tenant_id, channel, "notification channel set");

        let mut failures = self.persist(&config).await;
        self.registry.get_or_create(tenant_id).await;
        self.boards.forget_boards(tenant_id).await?;
        failures.extend(self.boards.ensure_all(tenant_id).await);
        Ok(AdminOutcome {
            config,
            changed: true,
            failures,
        })
    }

    pub async fn set_found_message(
        &self,
        tenant_id: &str,
        template: &str,
    ) -> Result<AdminOutcome, ScoutError> {
        self.set_template(tenant_id, template, |c, t| c.found_message = t)
            .await
    }

    pub async fn set_respawn_message(
        &self,
        tenant_id: &str,
        template: &str,
    ) -> Result<AdminOutcome, ScoutError> {
        self.set_template(tenant_id, template, |c, t| c.respawn_message = t)
            .await
    }

    async fn set_template(
        &self,
        tenant_id: &str,
        template: &str,
        apply: impl FnOnce(&mut TenantConfig, String),
    ) -> Result<AdminOutcome, ScoutError> {
        let config = self
            .tenants
            .update(tenant_id, |c| apply(c, template.to_string()))?;
        info!(tenant_id, "message template updated");
        let failures = self.persist(&config).await;
        Ok(AdminOutcome {
            config,
            changed: true,
            failures,
        })
    }
}
