#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use scout_core::config::ScoutConfig;
use scout_core::error::CollaboratorError;
use scout_core::sinks::{BossStore, Platform};
use scout_core::types::{BossId, BossReport, ScoutReport, TenantConfig};
use scout_daemon::daemon::Daemon;

pub fn wednesday_noon() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 3, 12, 0, 0).unwrap()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformCall {
    Notify { tenant_id: String, channel: String, text: String },
    Post { tenant_id: String, channel: String },
    Edit { tenant_id: String, message_ref: String, text: String },
    Delete { tenant_id: String, message_ref: String },
}

/// Platform fake that records every call.
///
/// `post_delay_ms` slows every post; `edit_delay_once_ms` slows only the next edit.
#[derive(Default)]
pub struct RecordingPlatform {
    pub calls: Mutex<Vec<PlatformCall>>,
    pub fail: AtomicBool,
    pub post_delay_ms: AtomicU64,
    pub edit_delay_once_ms: AtomicU64,
    posted: AtomicUsize,
}

impl RecordingPlatform {
    pub fn calls(&self) -> Vec<PlatformCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn notifications(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                PlatformCall::Notify { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    fn check(&self) -> Result<(), CollaboratorError> {
        if self.fail.load(Ordering::SeqCst) {
            Err(CollaboratorError::Platform("offline".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Platform for RecordingPlatform {
    async fn send_notification(
        &self,
        tenant_id: &str,
        channel: &str,
        text: &str,
    ) -> Result<(), CollaboratorError> {
        self.check()?;
        self.calls.lock().unwrap().push(PlatformCall::Notify {
            tenant_id: tenant_id.into(),
            channel: channel.into(),
            text: text.into(),
        });
        Ok(())
    }

    async fn post_board(
        &self,
        tenant_id: &str,
        channel: &str,
        _text: &str,
    ) -> Result<String, CollaboratorError> {
        self.check()?;
        pause(self.post_delay_ms.load(Ordering::SeqCst)).await;
        let n = self.posted.fetch_add(1, Ordering::SeqCst);
        self.calls.lock().unwrap().push(PlatformCall::Post {
            tenant_id: tenant_id.into(),
            channel: channel.into(),
        });
        Ok(format!("board-{n}"))
    }

    async fn edit_board(
        &self,
        tenant_id: &str,
        _channel: &str,
        message_ref: &str,
        text: &str,
    ) -> Result<(), CollaboratorError> {
        self.check()?;
        pause(self.edit_delay_once_ms.swap(0, Ordering::SeqCst)).await;
        self.calls.lock().unwrap().push(PlatformCall::Edit {
            tenant_id: tenant_id.into(),
            message_ref: message_ref.into(),
            text: text.into(),
        });
        Ok(())
    }

    async fn delete_board(
        &self,
        tenant_id: &str,
        _channel: &str,
        message_ref: &str,
    ) -> Result<(), CollaboratorError> {
        self.check()?;
        self.calls.lock().unwrap().push(PlatformCall::Delete {
            tenant_id: tenant_id.into(),
            message_ref: message_ref.into(),
        });
        Ok(())
    }
}

async fn pause(ms: u64) {
    if ms > 0 {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}

/// In-memory store fake; `fail` makes every write fail.
///
/// Like the SQLite store, a report save only lands if its revision is newer.
/// `save_delay_once_ms` holds back the next report save.
#[derive(Default)]
pub struct MemoryStore {
    pub reports: Mutex<HashMap<(String, BossId), BossReport>>,
    pub scouts: Mutex<Vec<ScoutReport>>,
    pub configs: Mutex<HashMap<String, TenantConfig>>,
    pub report_saves: AtomicUsize,
    pub fail: AtomicBool,
    pub save_delay_once_ms: AtomicU64,
}

impl MemoryStore {
    fn check(&self) -> Result<(), CollaboratorError> {
        if self.fail.load(Ordering::SeqCst) {
            Err(CollaboratorError::Persistence("disk full".into()))
        } else {
            Ok(())
        }
    }

    pub fn saved_report(&self, tenant_id: &str, boss: BossId) -> Option<BossReport> {
        self.reports
            .lock()
            .unwrap()
            .get(&(tenant_id.to_string(), boss))
            .cloned()
    }
}

#[async_trait]
impl BossStore for MemoryStore {
    async fn load_boss_report(
        &self,
        tenant_id: &str,
        boss: BossId,
    ) -> Result<Option<BossReport>, CollaboratorError> {
        Ok(self.saved_report(tenant_id, boss))
    }

    async fn save_boss_report(
        &self,
        tenant_id: &str,
        report: &BossReport,
    ) -> Result<(), CollaboratorError> {
        self.check()?;
        pause(self.save_delay_once_ms.swap(0, Ordering::SeqCst)).await;
        self.report_saves.fetch_add(1, Ordering::SeqCst);
        let mut reports = self.reports.lock().unwrap();
        let key = (tenant_id.to_string(), report.boss);
        if reports
            .get(&key)
            .map_or(true, |stored| report.revision() > stored.revision())
        {
            reports.insert(key, report.clone());
        }
        Ok(())
    }

    async fn append_scout_report(&self, report: &ScoutReport) -> Result<(), CollaboratorError> {
        self.check()?;
        self.scouts.lock().unwrap().push(report.clone());
        Ok(())
    }

    async fn load_tenant_config(
        &self,
        tenant_id: &str,
    ) -> Result<Option<TenantConfig>, CollaboratorError> {
        Ok(self.configs.lock().unwrap().get(tenant_id).cloned())
    }

    async fn save_tenant_config(&self, config: &TenantConfig) -> Result<(), CollaboratorError> {
        self.check()?;
        self.configs
            .lock()
            .unwrap()
            .insert(config.tenant_id.clone(), config.clone());
        Ok(())
    }

    async fn all_tenant_configs(&self) -> Result<Vec<TenantConfig>, CollaboratorError> {
        let mut all: Vec<TenantConfig> = self.configs.lock().unwrap().values().cloned().collect();
        all.sort_by(|a, b| a.tenant_id.cmp(&b.tenant_id));
        Ok(all)
    }
}

pub struct Harness {
    pub daemon: Daemon,
    pub platform: Arc<RecordingPlatform>,
    pub store: Arc<MemoryStore>,
}

pub fn harness() -> Harness {
    let platform = Arc::new(RecordingPlatform::default());
    let store = Arc::new(MemoryStore::default());
    let daemon = Daemon::with_collaborators(ScoutConfig::default(), platform.clone(), store.clone());
    Harness {
        daemon,
        platform,
        store,
    }
}

/// Register a tenant with `channel` directly in the directory.
pub async fn register(h: &Harness, tenant_id: &str, channel: Option<&str>) {
    let mut config = TenantConfig::new(tenant_id);
    config.notification_channel = channel.map(str::to_string);
    h.daemon.tenants().upsert(config);
    h.daemon.registry().get_or_create(tenant_id).await;
}
