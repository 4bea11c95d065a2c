use std::sync::Arc;

use chrono::{DateTime, Utc};
use scout_core::error::ScoutError;
use scout_core::registry::{NotificationDue, TenantBossRegistry};
use scout_core::sinks::{Effect, EffectFailure, EffectRunner, NotificationRequest};
use scout_core::tenants::TenantDirectory;
use scout_core::types::{render_template, BossId, BossLayerState, BossStatus, Layer, ScoutReport};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::boards::refresh_effect;

/// One sighting as entered by a scout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoutSubmission {
    pub tenant_id: String,
    /// Boss key, e.g. `"kazzy"`.
    pub boss_id: String,
    /// Layer number exactly as typed.
    pub layer_input: String,
    pub status: BossStatus,
    pub reporter_id: String,
    pub now: DateTime<Utc>,
}

/// Outcome of an accepted submission.
#[derive(Debug, Clone)]
pub struct SubmissionReceipt {
    pub boss: BossId,
    pub layer: BossLayerState,
    pub total_kills: u64,
    /// The "found" notification, when one was requested.
    pub notification: Option<NotificationRequest>,
    /// Collaborator calls that failed; the in-memory update stands.
    pub failures: Vec<EffectFailure>,
}

/// Turns scout submissions into state transitions and side effects.
#[derive(Clone)]
pub struct ScoutSubmissionProcessor {
    registry: Arc<TenantBossRegistry>,
    tenants: Arc<TenantDirectory>,
    runner: EffectRunner,
}

impl ScoutSubmissionProcessor {
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

    /// Validate and apply one submission, then run its effects concurrently.
    ///
    /// Validation failures return before any state is touched. Collaborator
    /// failures are reported on the receipt.
    pub async fn submit(&self, submission: ScoutSubmission) -> Result<SubmissionReceipt, ScoutError> {
        let config = self.tenants.require(&submission.tenant_id)?;
        let layer = Layer::parse_input(&submission.layer_input)?;

        let outcome = self
            .registry
            .apply_scout_report(
                &submission.tenant_id,
                &submission.boss_id,
                &layer.label(),
                submission.status,
                submission.now,
            )
            .await?;

        let mut effects = Vec::with_capacity(4);

        let notification = match (outcome.notification, &config.notification_channel) {
            (NotificationDue::Found, Some(channel)) => {
                let request = NotificationRequest {
                    channel: channel.clone(),
                    text: render_template(&config.found_message, outcome.boss, layer),
                };
                effects.push(Effect::Notify {
                    tenant_id: submission.tenant_id.clone(),
                    request: request.clone(),
                });
                Some(request)
            }
            (NotificationDue::Found, None) => {
                warn!(tenant_id = %submission.tenant_id, "boss found but no channel set");
                None
            }
            (NotificationDue::None, _) => None,
        };

        effects.push(Effect::SaveReport {
            tenant_id: submission.tenant_id.clone(),
            report: outcome.report.clone(),
        });
        effects.push(Effect::AppendScoutReport(ScoutReport::new(
            submission.tenant_id.clone(),
            outcome.boss,
            layer,
            submission.status,
            submission.reporter_id.clone(),
            submission.now,
        )));
        if let Some(effect) = refresh_effect(&config, &outcome.report) {
            effects.push(effect);
        }

        let failures = self.runner.run_all(effects).await;
        if !failures.is_empty() {
            info!(
                tenant_id = %submission.tenant_id,
                failures = failures.len(),
                "submission accepted with collaborator failures"
            );
        }

        Ok(SubmissionReceipt {
            boss: outcome.boss,
            layer: outcome.layer,
            total_kills: outcome.report.total_kills,
            notification,
            failures,
        })
    }
}
