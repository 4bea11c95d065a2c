use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use scout_core::registry::TenantBossRegistry;
use scout_core::sinks::{Effect, EffectFailure, EffectRunner, NotificationRequest};
use scout_core::tenants::TenantDirectory;
use scout_core::types::render_template;
use tracing::{debug, info, warn};

use crate::boards::refresh_effect;
use crate::shutdown::ShutdownSignal;

/// What a scan changed, before any collaborator is called.
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    /// Layers moved back to `Unknown`.
    pub transitions: usize,
    /// Respawn notifications, one per reset layer of an enabled tenant.
    pub notifications: Vec<(String, NotificationRequest)>,
    pub effects: Vec<Effect>,
}

impl TickReport {
    pub fn is_empty(&self) -> bool {
        self.transitions == 0
    }
}

/// Result of a full tick: the scan plus the collaborator calls it caused.
#[derive(Debug, Clone, Default)]
pub struct TickOutcome {
    pub transitions: usize,
    pub notifications: Vec<(String, NotificationRequest)>,
    pub failures: Vec<EffectFailure>,
}

/// Periodically resets layers whose respawn time has passed.
#[derive(Clone)]
pub struct ReconciliationScheduler {
    registry: Arc<TenantBossRegistry>,
    tenants: Arc<TenantDirectory>,
    runner: EffectRunner,
}

impl ReconciliationScheduler {
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

    /// Scan every tenant and apply due respawns.
    ///
    /// Each changed (tenant, boss) yields exactly one save, plus a board
    /// refresh when the tenant has a posted board. Clean tenants produce
    /// nothing.
    pub async fn scan(&self, now: DateTime<Utc>) -> TickReport {
        let mut tick = TickReport::default();

        for tenant_id in self.registry.tenant_ids() {
            let respawned = self.registry.respawn_due(&tenant_id, now).await;
            if respawned.is_empty() {
                continue;
            }
            let config = self.tenants.get(&tenant_id);
            let channel = config.as_ref().and_then(|cfg| {
                if !cfg.layer_notifications {
                    return None;
                }
                if cfg.notification_channel.is_none() {
                    warn!(tenant_id = %tenant_id, "layer notifications enabled but no channel set");
                }
                cfg.notification_channel.clone()
            });

            for boss in respawned {
                tick.transitions += boss.layers.len();
                debug!(
                    tenant_id = %tenant_id,
                    boss = %boss.boss,
                    layers = boss.layers.len(),
                    "layers respawned"
                );

                if let (Some(cfg), Some(channel)) = (&config, &channel) {
                    for layer in &boss.layers {
                        let request = NotificationRequest {
                            channel: channel.clone(),
                            text: render_template(&cfg.respawn_message, boss.boss, *layer),
                        };
                        tick.notifications.push((tenant_id.clone(), request.clone()));
                        tick.effects.push(Effect::Notify {
                            tenant_id: tenant_id.clone(),
                            request,
                        });
                    }
                }

                if let Some(effect) = config
                    .as_ref()
                    .and_then(|cfg| refresh_effect(cfg, &boss.report))
                {
                    tick.effects.push(effect);
                }
                tick.effects.push(Effect::SaveReport {
                    tenant_id: tenant_id.clone(),
                    report: boss.report,
                });
            }
        }

        tick
    }

    /// Scan, then execute the resulting effects.
    pub async fn run_reconciliation_tick(&self, now: DateTime<Utc>) -> TickOutcome {
        let tick = self.scan(now).await;
        if tick.is_empty() {
            return TickOutcome::default();
        }
        let failures = self.runner.run_all(tick.effects).await;
        info!(
            transitions = tick.transitions,
            notifications = tick.notifications.len(),
            failures = failures.len(),
            "reconciliation tick completed"
        );
        TickOutcome {
            transitions: tick.transitions,
            notifications: tick.notifications,
            failures,
        }
    }

    /// Run ticks every `interval` until `shutdown` fires.
    ///
    /// A tick already in progress always finishes; shutdown only prevents the
    /// next one from starting.
    pub async fn run(&self, interval: Duration, shutdown: ShutdownSignal) {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately.
        ticker.tick().await;

        let mut shutdown_rx = shutdown.subscribe();
        info!(interval_secs = interval.as_secs(), "reconciliation loop started");

        loop {
            if shutdown.is_shutting_down() {
                break;
            }
            tokio::select! {
                _ = ticker.tick() => {
                    if shutdown.is_shutting_down() {
                        break;
                    }
                    self.run_reconciliation_tick(Utc::now()).await;
                }
                _ = shutdown_rx.recv() => {
                    break;
                }
            }
        }

        info!("reconciliation loop stopped");
    }
}
