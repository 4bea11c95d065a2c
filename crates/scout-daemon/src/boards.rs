use std::sync::Arc;

use scout_core::board::render_board;
use scout_core::error::ScoutError;
use scout_core::registry::{MessageRefClaim, TenantBossRegistry};
use scout_core::sinks::{Effect, EffectRunner};
use scout_core::tenants::TenantDirectory;
use scout_core::types::{BossId, BossReport, TenantConfig};
use tracing::{debug, info, warn};

/// Effect that redraws an already posted board, if there is one.
pub fn refresh_effect(config: &TenantConfig, report: &BossReport) -> Option<Effect> {
    let channel = config.notification_channel.as_ref()?;
    let message_ref = report.message_ref.as_ref()?;
    Some(Effect::RefreshBoard {
        tenant_id: config.tenant_id.clone(),
        boss: report.boss,
        channel: channel.clone(),
        message_ref: message_ref.clone(),
        text: render_board(report),
        revision: report.revision(),
    })
}

/// Keeps one status board per tenant and boss.
///
/// Boards are identified only by the handle stored on the boss report.
#[derive(Clone)]
pub struct BoardKeeper {
    registry: Arc<TenantBossRegistry>,
    tenants: Arc<TenantDirectory>,
    runner: EffectRunner,
}

impl BoardKeeper {
    pub fn new(
        registry: Arc<TenantBossRegistry>,
        tenants: Arc<TenantDirectory>,
        runner: EffectRunner,
    ) -> Self {
        Self {
            registry,
            tenants,
            runner,
        }
    }

    /// Post the board if no handle is stored, otherwise edit it in place.
    ///
    /// Two concurrent callers may both post; only the first to claim the
    /// handle keeps its board and the other deletes its own post.
    ///
    /// Returns the board handle, or `None` when the tenant has no channel.
    pub async fn ensure_board(
        &self,
        tenant_id: &str,
        boss: BossId,
    ) -> Result<Option<String>, ScoutError> {
        let config = self.tenants.require(tenant_id)?;
        let Some(ref channel) = config.notification_channel else {
            debug!(tenant_id, boss = %boss, "no channel configured, skipping board");
            return Ok(None);
        };

        let state = self.registry.get_or_create(tenant_id).await;
        let report = state
            .get(boss)
            .ok_or_else(|| ScoutError::UnknownBoss(boss.key().to_string()))?;

        if let Some(handle) = &report.message_ref {
            if let Some(effect) = refresh_effect(&config, report) {
                self.runner.run(&effect).await?;
            }
            return Ok(Some(handle.clone()));
        }

        let posted = self
            .runner
            .platform()
            .post_board(tenant_id, &channel, &render_board(report))
            .await?;
        match self
            .registry
            .claim_message_ref(tenant_id, boss, posted.clone())
            .await?
        {
            MessageRefClaim::Claimed(updated) => {
                info!(tenant_id, boss = %boss, message_ref = %posted, "status board posted");
                self.runner.store().save_boss_report(tenant_id, &updated).await?;
                Ok(Some(posted))
            }
            MessageRefClaim::Taken(existing) => {
                debug!(tenant_id, boss = %boss, message_ref = %posted, "board already posted, removing duplicate");
                if let Err(e) = self
                    .runner
                    .platform()
                    .delete_board(tenant_id, &channel, &posted)
                    .await
                {
                    warn!(tenant_id, boss = %boss, message_ref = %posted, error = %e, "failed to remove duplicate board");
                }
                Ok(Some(existing))
            }
        }
    }

    /// Ensure both boards of a tenant; errors are collected, not short-circuited.
    pub async fn ensure_all(&self, tenant_id: &str) -> Vec<ScoutError> {
        let mut errors = Vec::new();
        for boss in BossId::ALL {
            if let Err(e) = self.ensure_board(tenant_id, boss).await {
                errors.push(e);
            }
        }
        errors
    }

    /// Forget stored handles so the next ensure posts fresh boards.
    pub async fn forget_boards(&self, tenant_id: &str) -> Result<(), ScoutError> {
        for boss in BossId::ALL {
            self.registry.set_message_ref(tenant_id, boss, None).await?;
        }
        Ok(())
    }
}
