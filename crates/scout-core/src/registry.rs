use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::ScoutError;
use crate::types::{BossId, BossLayerState, BossReport, BossStatus, Layer, TenantBossReports};

/// Which notification a sighting makes the tenant eligible for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationDue {
    None,
    Found,
}

/// Result of applying one sighting.
#[derive(Debug, Clone)]
pub struct SightingOutcome {
    pub boss: BossId,
    /// The layer after the transition.
    pub layer: BossLayerState,
    pub notification: NotificationDue,
    /// Snapshot of the whole boss report after the transition.
    pub report: BossReport,
}

/// Layers of one boss that a reconciliation pass reset to `Unknown`.
#[derive(Debug, Clone)]
pub struct RespawnedBoss {
    pub boss: BossId,
    pub layers: Vec<Layer>,
    /// Snapshot of the boss report after the reset, ready to flush.
    pub report: BossReport,
}

/// Outcome of [`TenantBossRegistry::claim_message_ref`].
#[derive(Debug, Clone)]
pub enum MessageRefClaim {
    /// The handle was recorded; snapshot after the change.
    Claimed(BossReport),
    /// Another board was recorded first; its handle.
    Taken(String),
}

/// In-memory owner of every tenant's boss state.
///
/// Each tenant sits behind its own async mutex, so updates for one tenant are
/// serialized while unrelated tenants proceed independently. This is the only
/// place boss state is mutated.
#[derive(Debug, Default)]
pub struct TenantBossRegistry {
    tenants: DashMap<String, Arc<Mutex<TenantBossReports>>>,
}

impl TenantBossRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, tenant_id: &str) -> Arc<Mutex<TenantBossReports>> {
        self.tenants
            .entry(tenant_id.to_string())
            .or_insert_with(|| {
                debug!(tenant_id, "materializing default boss state");
                Arc::new(Mutex::new(TenantBossReports::new()))
            })
            .clone()
    }

    fn existing(&self, tenant_id: &str) -> Option<Arc<Mutex<TenantBossReports>>> {
        self.tenants.get(tenant_id).map(|entry| entry.clone())
    }

    /// Number of tenants with in-memory state.
    pub fn len(&self) -> usize {
        self.tenants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tenants.is_empty()
    }

    pub fn contains(&self, tenant_id: &str) -> bool {
        self.tenants.contains_key(tenant_id)
    }

    /// Tenant ids currently tracked, in no particular order.
    pub fn tenant_ids(&self) -> Vec<String> {
        self.tenants.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Return the tenant's state, creating defaults on first contact.
    ///
    /// Never touches persistence; callers that want stored state should
    /// [`hydrate`](Self::hydrate) first.
    pub async fn get_or_create(&self, tenant_id: &str) -> TenantBossReports {
        self.slot(tenant_id).lock().await.clone()
    }

    /// Read-only lookup that does not create state.
    pub async fn get(&self, tenant_id: &str) -> Result<TenantBossReports, ScoutError> {
        let slot = self
            .existing(tenant_id)
            .ok_or_else(|| ScoutError::NotFound(format!("boss state for tenant {tenant_id}")))?;
        let reports = slot.lock().await.clone();
        Ok(reports)
    }

    /// Seed a tenant with reports loaded from storage.
    pub async fn hydrate(&self, tenant_id: &str, reports: impl IntoIterator<Item = BossReport>) {
        let slot = self.slot(tenant_id);
        let mut state = slot.lock().await;
        for report in reports {
            state.insert(report);
        }
    }

    /// Apply a sighting for `boss_id` / `layer_id` (`"Layer N"`).
    ///
    /// Input is validated before any state is created or changed.
    pub async fn apply_scout_report(
        &self,
        tenant_id: &str,
        boss_id: &str,
        layer_id: &str,
        status: BossStatus,
        now: DateTime<Utc>,
    ) -> Result<SightingOutcome, ScoutError> {
        let boss: BossId = boss_id.parse()?;
        let layer = Layer::from_label(layer_id)?;

        let slot = self.slot(tenant_id);
        let mut state = slot.lock().await;
        let report = state
            .get_mut(boss)
            .ok_or_else(|| ScoutError::UnknownBoss(boss_id.to_string()))?;
        let updated = report.apply_sighting(layer, status, now)?;

        info!(
            tenant_id,
            boss = %boss,
            layer = %layer,
            status = %status,
            total_kills = report.total_kills,
            "sighting applied"
        );

        Ok(SightingOutcome {
            boss,
            layer: updated,
            notification: if status == BossStatus::Alive {
                NotificationDue::Found
            } else {
                NotificationDue::None
            },
            report: report.clone(),
        })
    }

    /// Reset every layer of `tenant_id` whose respawn time has passed.
    ///
    /// Only bosses with at least one reset layer are returned. The tenant's
    /// lock is held for the whole pass.
    pub async fn respawn_due(&self, tenant_id: &str, now: DateTime<Utc>) -> Vec<RespawnedBoss> {
        let Some(slot) = self.existing(tenant_id) else {
            return Vec::new();
        };
        let mut state = slot.lock().await;
        let mut respawned = Vec::new();
        for boss in BossId::ALL {
            let Some(report) = state.get_mut(boss) else {
                continue;
            };
            let layers = report.respawn_due(now);
            if !layers.is_empty() {
                respawned.push(RespawnedBoss {
                    boss,
                    layers,
                    report: report.clone(),
                });
            }
        }
        respawned
    }

    /// Record the platform handle of a boss's status board.
    pub async fn set_message_ref(
        &self,
        tenant_id: &str,
        boss: BossId,
        message_ref: Option<String>,
    ) -> Result<BossReport, ScoutError> {
        let slot = self
            .existing(tenant_id)
            .ok_or_else(|| ScoutError::UnknownTenant(tenant_id.to_string()))?;
        let mut state = slot.lock().await;
        let report = state
            .get_mut(boss)
            .ok_or_else(|| ScoutError::UnknownBoss(boss.key().to_string()))?;
        report.set_message_ref(message_ref);
        Ok(report.clone())
    }

    /// Record `message_ref` only if the boss has no board handle yet.
    ///
    /// Checked and set under the tenant lock, so of two concurrent posts
    /// exactly one wins.
    pub async fn claim_message_ref(
        &self,
        tenant_id: &str,
        boss: BossId,
        message_ref: String,
    ) -> Result<MessageRefClaim, ScoutError> {
        let slot = self
            .existing(tenant_id)
            .ok_or_else(|| ScoutError::UnknownTenant(tenant_id.to_string()))?;
        let mut state = slot.lock().await;
        let report = state
            .get_mut(boss)
            .ok_or_else(|| ScoutError::UnknownBoss(boss.key().to_string()))?;
        if let Some(existing) = &report.message_ref {
            return Ok(MessageRefClaim::Taken(existing.clone()));
        }
        report.set_message_ref(Some(message_ref));
        Ok(MessageRefClaim::Claimed(report.clone()))
    }

    /// Snapshot of every tenant's state.
    pub async fn all_tenant_boss_reports(&self) -> Vec<(String, TenantBossReports)> {
        let slots: Vec<(String, Arc<Mutex<TenantBossReports>>)> = self
            .tenants
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();

        let mut out = Vec::with_capacity(slots.len());
        for (tenant_id, slot) in slots {
            let state = slot.lock().await.clone();
            out.push((tenant_id, state));
        }
        out
    }
}
