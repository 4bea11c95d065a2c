//! Collaborator contracts the core calls out to, and the effects it emits.
//!
//! The core never performs I/O itself while holding tenant state. Instead it
//! produces [`Effect`] values which are executed against a [`Platform`] and a
//! [`BossStore`] once the in-memory transition is complete.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::CollaboratorError;
use crate::types::{BossId, BossReport, ScoutReport, TenantConfig};

// ---------------------------------------------------------------------------
// Platform
// ---------------------------------------------------------------------------

/// The chat platform the tenants live on.
#[async_trait]
pub trait Platform: Send + Sync {
    /// Post a plain notification to a channel.
    async fn send_notification(
        &self,
        tenant_id: &str,
        channel: &str,
        text: &str,
    ) -> Result<(), CollaboratorError>;

    /// Post a new status board and return its handle.
    async fn post_board(
        &self,
        tenant_id: &str,
        channel: &str,
        text: &str,
    ) -> Result<String, CollaboratorError>;

    /// Replace the content of an existing status board.
    async fn edit_board(
        &self,
        tenant_id: &str,
        channel: &str,
        message_ref: &str,
        text: &str,
    ) -> Result<(), CollaboratorError>;

    /// Remove a status board that lost the race to become a boss's board.
    async fn delete_board(
        &self,
        tenant_id: &str,
        channel: &str,
        message_ref: &str,
    ) -> Result<(), CollaboratorError>;
}

// ---------------------------------------------------------------------------
// BossStore
// ---------------------------------------------------------------------------

/// Durable mirror of tenant configuration, boss reports, and sightings.
#[async_trait]
pub trait BossStore: Send + Sync {
    async fn load_boss_report(
        &self,
        tenant_id: &str,
        boss: BossId,
    ) -> Result<Option<BossReport>, CollaboratorError>;

    async fn save_boss_report(
        &self,
        tenant_id: &str,
        report: &BossReport,
    ) -> Result<(), CollaboratorError>;

    async fn append_scout_report(&self, report: &ScoutReport) -> Result<(), CollaboratorError>;

    async fn load_tenant_config(
        &self,
        tenant_id: &str,
    ) -> Result<Option<TenantConfig>, CollaboratorError>;

    async fn save_tenant_config(&self, config: &TenantConfig) -> Result<(), CollaboratorError>;

    async fn all_tenant_configs(&self) -> Result<Vec<TenantConfig>, CollaboratorError>;
}

// ---------------------------------------------------------------------------
// Effects
// ---------------------------------------------------------------------------

/// A notification the platform should deliver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRequest {
    pub channel: String,
    pub text: String,
}

/// A side effect produced by a state transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Notify {
        tenant_id: String,
        request: NotificationRequest,
    },
    SaveReport {
        tenant_id: String,
        report: BossReport,
    },
    AppendScoutReport(ScoutReport),
    RefreshBoard {
        tenant_id: String,
        boss: BossId,
        channel: String,
        message_ref: String,
        text: String,
        /// Revision of the report `text` was rendered from.
        revision: u64,
    },
}

impl Effect {
    pub fn kind(&self) -> &'static str {
        match self {
            Effect::Notify { .. } => "notify",
            Effect::SaveReport { .. } => "save_report",
            Effect::AppendScoutReport(_) => "append_scout_report",
            Effect::RefreshBoard { .. } => "refresh_board",
        }
    }
}

/// An effect that failed, returned so the caller can retry just that call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectFailure {
    pub effect: Effect,
    pub error: CollaboratorError,
}

/// Last board revision drawn per (tenant, boss).
type BoardRevisions = DashMap<(String, BossId), Arc<Mutex<Option<u64>>>>;

/// Executes effects against the collaborators.
#[derive(Clone)]
pub struct EffectRunner {
    platform: Arc<dyn Platform>,
    store: Arc<dyn BossStore>,
    boards: Arc<BoardRevisions>,
}

impl EffectRunner {
    pub fn new(platform: Arc<dyn Platform>, store: Arc<dyn BossStore>) -> Self {
        Self {
            platform,
            store,
            boards: Arc::new(DashMap::new()),
        }
    }

    pub fn store(&self) -> &Arc<dyn BossStore> {
        &self.store
    }

    pub fn platform(&self) -> &Arc<dyn Platform> {
        &self.platform
    }

    /// Run one effect.
    pub async fn run(&self, effect: &Effect) -> Result<(), CollaboratorError> {
        match effect {
            Effect::Notify { tenant_id, request } => {
                self.platform
                    .send_notification(tenant_id, &request.channel, &request.text)
                    .await
            }
            Effect::SaveReport { tenant_id, report } => {
                self.store.save_boss_report(tenant_id, report).await
            }
            Effect::AppendScoutReport(report) => self.store.append_scout_report(report).await,
            Effect::RefreshBoard {
                tenant_id,
                boss,
                channel,
                message_ref,
                text,
                revision,
            } => {
                self.refresh_board(tenant_id, *boss, channel, message_ref, text, *revision)
                    .await
            }
        }
    }

    /// Edits of one board are serialized, and a snapshot older than the one
    /// already drawn is dropped.
    async fn refresh_board(
        &self,
        tenant_id: &str,
        boss: BossId,
        channel: &str,
        message_ref: &str,
        text: &str,
        revision: u64,
    ) -> Result<(), CollaboratorError> {
        let slot = self
            .boards
            .entry((tenant_id.to_string(), boss))
            .or_default()
            .clone();
        let mut drawn = slot.lock().await;
        if drawn.is_some_and(|last| revision < last) {
            debug!(tenant_id, boss = %boss, revision, "skipping stale board refresh");
            return Ok(());
        }
        self.platform
            .edit_board(tenant_id, channel, message_ref, text)
            .await?;
        *drawn = Some(revision);
        Ok(())
    }

    /// Run all effects concurrently; there is no ordering between them.
    ///
    /// Failures are logged and returned, never retried.
    pub async fn run_all(&self, effects: Vec<Effect>) -> Vec<EffectFailure> {
        let results = join_all(effects.iter().map(|effect| self.run(effect))).await;
        effects
            .into_iter()
            .zip(results)
            .filter_map(|(effect, result)| {
                result.err().map(|error| {
                    warn!(effect = effect.kind(), error = %error, "collaborator call failed");
                    EffectFailure { effect, error }
                })
            })
            .collect()
    }
}

