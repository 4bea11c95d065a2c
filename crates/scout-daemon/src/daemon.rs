use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use scout_core::config::ScoutConfig;
use scout_core::registry::TenantBossRegistry;
use scout_core::sinks::{BossStore, EffectRunner, Platform};
use scout_core::store::SqliteStore;
use scout_core::tenants::TenantDirectory;
use scout_core::types::BossId;
use tracing::{info, warn};

use crate::admin::TenantAdmin;
use crate::boards::BoardKeeper;
use crate::platform::LogPlatform;
use crate::reconciler::ReconciliationScheduler;
use crate::shutdown::ShutdownSignal;
use crate::submission::ScoutSubmissionProcessor;

/// The boss-scout background daemon.
///
/// Owns the registry and tenant directory, restores them from the store at
/// startup, and runs the reconciliation loop until the `ShutdownSignal` is
/// triggered (e.g. via ctrl-c).
pub struct Daemon {
    config: ScoutConfig,
    registry: Arc<TenantBossRegistry>,
    tenants: Arc<TenantDirectory>,
    runner: EffectRunner,
    shutdown: ShutdownSignal,
}

impl Daemon {
    /// Create a daemon over the given collaborators.
    pub fn with_collaborators(
        config: ScoutConfig,
        platform: Arc<dyn Platform>,
        store: Arc<dyn BossStore>,
    ) -> Self {
        Self {
            config,
            registry: Arc::new(TenantBossRegistry::new()),
            tenants: Arc::new(TenantDirectory::new()),
            runner: EffectRunner::new(platform, store),
            shutdown: ShutdownSignal::new(),
        }
    }

    /// Create a daemon backed by the SQLite store from config and the
    /// log-only platform.
    pub async fn new(config: ScoutConfig) -> Result<Self> {
        let path = config.store_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let store = SqliteStore::new(&path)
            .await
            .with_context(|| format!("failed to open store at {}", path.display()))?;
        Ok(Self::with_collaborators(
            config,
            Arc::new(LogPlatform::new()),
            Arc::new(store),
        ))
    }

    pub fn shutdown_handle(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    pub fn shutdown(&self) {
        self.shutdown.trigger();
    }

    pub fn config(&self) -> &ScoutConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<TenantBossRegistry> {
        &self.registry
    }

    pub fn tenants(&self) -> &Arc<TenantDirectory> {
        &self.tenants
    }

    pub fn processor(&self) -> ScoutSubmissionProcessor {
        ScoutSubmissionProcessor::new(
            self.registry.clone(),
            self.tenants.clone(),
            self.runner.clone(),
        )
    }

    pub fn scheduler(&self) -> ReconciliationScheduler {
        ReconciliationScheduler::new(
            self.registry.clone(),
            self.tenants.clone(),
            self.runner.clone(),
        )
    }

    pub fn boards(&self) -> BoardKeeper {
        BoardKeeper::new(
            self.registry.clone(),
            self.tenants.clone(),
            self.runner.clone(),
        )
    }

    pub fn admin(&self) -> TenantAdmin {
        TenantAdmin::new(
            self.tenants.clone(),
            self.registry.clone(),
            self.runner.store().clone(),
            self.boards(),
            self.config.clone(),
        )
    }

    /// Load every stored tenant and its boss reports into memory.
    ///
    /// Bosses without a stored report start from defaults. Returns the
    /// number of tenants restored.
    pub async fn hydrate(&self) -> Result<usize> {
        let store = self.runner.store();
        let configs = store
            .all_tenant_configs()
            .await
            .context("failed to load tenant configs")?;

        let count = configs.len();
        for config in configs {
            let tenant_id = config.tenant_id.clone();
            self.tenants.upsert(config);

            let mut reports = Vec::new();
            for boss in BossId::ALL {
                let stored = store
                    .load_boss_report(&tenant_id, boss)
                    .await
                    .with_context(|| format!("failed to load {boss} report for {tenant_id}"))?;
                reports.extend(stored);
            }
            self.registry.hydrate(&tenant_id, reports).await;
        }

        info!(tenants = count, "state restored from store");
        Ok(count)
    }

    /// Post or refresh boards for every tenant with a channel.
    pub async fn ensure_boards(&self) {
        let boards = self.boards();
        for config in self.tenants.all() {
            if config.notification_channel.is_none() {
                continue;
            }
            for error in boards.ensure_all(&config.tenant_id).await {
                warn!(tenant_id = %config.tenant_id, error = %error, "failed to ensure board");
            }
        }
    }

    /// Restore state, catch up on respawns missed while stopped, then run the
    /// reconciliation loop until shutdown.
    pub async fn run(&self) -> Result<()> {
        self.hydrate().await?;
        self.ensure_boards().await;

        let scheduler = self.scheduler();
        let catch_up = scheduler.run_reconciliation_tick(Utc::now()).await;
        if catch_up.transitions > 0 {
            info!(transitions = catch_up.transitions, "caught up on missed respawns");
        }

        let interval = Duration::from_secs(self.config.reconciliation.interval_secs);
        info!(
            interval_secs = interval.as_secs(),
            tenants = self.tenants.len(),
            "daemon starting event loop"
        );
        scheduler.run(interval, self.shutdown.clone()).await;

        info!("daemon stopped");
        Ok(())
    }
}
