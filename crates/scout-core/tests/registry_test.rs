use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use scout_core::error::ScoutError;
use scout_core::registry::{MessageRefClaim, NotificationDue, TenantBossRegistry};
use scout_core::respawn::next_respawn;
use scout_core::types::{BossId, BossReport, BossStatus, Layer};

fn wednesday_noon() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 3, 12, 0, 0).unwrap()
}

#[tokio::test]
async fn fresh_tenant_has_two_bosses_with_nine_unknown_layers() {
    let registry = TenantBossRegistry::new();
    let state = registry.get_or_create("guild-1").await;

    assert_eq!(state.reports().len(), 2);
    for report in state.reports() {
        assert_eq!(report.layers().len(), 9);
        assert_eq!(report.total_kills, 0);
        assert!(report
            .layers()
            .iter()
            .all(|l| l.status() == BossStatus::Unknown));
    }
    assert!(registry.contains("guild-1"));
}

#[tokio::test]
async fn get_does_not_create_state() {
    let registry = TenantBossRegistry::new();
    let err = registry.get("missing").await.unwrap_err();
    assert!(matches!(err, ScoutError::NotFound(_)));
    assert!(!err.is_validation());
    assert!(registry.is_empty());
}

#[tokio::test]
async fn defeated_on_unknown_layer_counts_a_kill_and_schedules_respawn() {
    let registry = TenantBossRegistry::new();
    let now = wednesday_noon();

    let outcome = registry
        .apply_scout_report("guild-1", "kazzy", "Layer 4", BossStatus::Defeated, now)
        .await
        .expect("valid sighting");

    assert_eq!(outcome.boss, BossId::Kazzak);
    assert_eq!(outcome.layer.status(), BossStatus::Defeated);
    assert_eq!(outcome.layer.next_respawn(), Some(next_respawn(now)));
    assert_eq!(outcome.layer.last_scouted(), Some(now));
    assert_eq!(outcome.notification, NotificationDue::None);
    assert_eq!(outcome.report.total_kills, 1);

    let state = registry.get("guild-1").await.unwrap();
    assert_eq!(state.get(BossId::Kazzak).unwrap().total_kills, 1);
    assert_eq!(state.get(BossId::Azuregos).unwrap().total_kills, 0);
}

#[tokio::test]
async fn alive_is_eligible_for_found_and_clears_respawn() {
    let registry = TenantBossRegistry::new();
    let now = wednesday_noon();
    registry
        .apply_scout_report("guild-1", "azzy", "Layer 2", BossStatus::Dead, now)
        .await
        .unwrap();

    let outcome = registry
        .apply_scout_report(
            "guild-1",
            "azzy",
            "Layer 2",
            BossStatus::Alive,
            now + Duration::hours(1),
        )
        .await
        .unwrap();

    assert_eq!(outcome.notification, NotificationDue::Found);
    assert!(outcome.layer.next_respawn().is_none());
}

#[tokio::test]
async fn invalid_input_is_rejected_without_mutation() {
    let registry = TenantBossRegistry::new();
    let now = wednesday_noon();

    let err = registry
        .apply_scout_report("guild-1", "onyxia", "Layer 1", BossStatus::Dead, now)
        .await
        .unwrap_err();
    assert!(matches!(err, ScoutError::UnknownBoss(_)));

    let err = registry
        .apply_scout_report("guild-1", "azzy", "Layer 10", BossStatus::Dead, now)
        .await
        .unwrap_err();
    assert!(matches!(err, ScoutError::UnknownLayer(_)));
    assert!(err.is_validation());

    assert!(
        !registry.contains("guild-1"),
        "rejected input must not materialize tenant state"
    );
}

#[tokio::test]
async fn respawn_due_resets_only_elapsed_layers() {
    let registry = TenantBossRegistry::new();
    let killed = wednesday_noon();
    registry
        .apply_scout_report("guild-1", "kazzy", "Layer 1", BossStatus::Dead, killed)
        .await
        .unwrap();
    registry
        .apply_scout_report(
            "guild-1",
            "kazzy",
            "Layer 2",
            BossStatus::Defeated,
            killed + Duration::hours(10),
        )
        .await
        .unwrap();

    let due = next_respawn(killed);
    assert!(registry.respawn_due("guild-1", due - Duration::seconds(1)).await.is_empty());

    let respawned = registry.respawn_due("guild-1", due).await;
    assert_eq!(respawned.len(), 1);
    assert_eq!(respawned[0].boss, BossId::Kazzak);
    assert_eq!(respawned[0].layers, vec![Layer::new(1).unwrap()]);
    let layer = &respawned[0].report.layers()[0];
    assert_eq!(layer.status(), BossStatus::Unknown);
    assert_eq!(layer.last_scouted(), Some(killed));
    assert_eq!(respawned[0].report.layers()[1].status(), BossStatus::Defeated);

    assert!(registry.respawn_due("guild-1", due).await.is_empty());
    assert!(registry.respawn_due("other-guild", due).await.is_empty());
}

#[tokio::test]
async fn hydrate_replaces_default_reports() {
    let registry = TenantBossRegistry::new();
    let mut stored = BossReport::new(BossId::Azuregos);
    stored.total_kills = 12;
    stored.message_ref = Some("msg-1".into());
    registry.hydrate("guild-1", vec![stored.clone()]).await;

    let state = registry.get("guild-1").await.unwrap();
    assert_eq!(state.get(BossId::Azuregos).unwrap(), &stored);
    assert_eq!(state.get(BossId::Kazzak).unwrap().total_kills, 0);
}

#[tokio::test]
async fn set_message_ref_requires_known_tenant() {
    let registry = TenantBossRegistry::new();
    let err = registry
        .set_message_ref("ghost", BossId::Kazzak, Some("m".into()))
        .await
        .unwrap_err();
    assert!(matches!(err, ScoutError::UnknownTenant(_)));

    registry.get_or_create("guild-1").await;
    let report = registry
        .set_message_ref("guild-1", BossId::Kazzak, Some("m".into()))
        .await
        .unwrap();
    assert_eq!(report.message_ref.as_deref(), Some("m"));
}

#[tokio::test]
async fn first_claim_of_a_board_handle_wins() {
    let registry = TenantBossRegistry::new();
    let err = registry
        .claim_message_ref("ghost", BossId::Kazzak, "board-0".into())
        .await
        .unwrap_err();
    assert!(matches!(err, ScoutError::UnknownTenant(_)));

    registry.get_or_create("guild-1").await;
    let first = registry
        .claim_message_ref("guild-1", BossId::Kazzak, "board-1".into())
        .await
        .unwrap();
    let MessageRefClaim::Claimed(report) = first else {
        panic!("first claim should win");
    };
    assert_eq!(report.message_ref.as_deref(), Some("board-1"));
    assert_eq!(report.revision(), 1);

    let second = registry
        .claim_message_ref("guild-1", BossId::Kazzak, "board-2".into())
        .await
        .unwrap();
    assert!(matches!(second, MessageRefClaim::Taken(ref h) if h == "board-1"));
    let state = registry.get("guild-1").await.unwrap();
    assert_eq!(state.get(BossId::Kazzak).unwrap().revision(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_defeats_on_same_layer_are_not_lost() {
    let registry = Arc::new(TenantBossRegistry::new());
    let now = wednesday_noon();

    let mut handles = Vec::new();
    for i in 0..32 {
        let registry = registry.clone();
        handles.push(tokio::spawn(async move {
            registry
                .apply_scout_report(
                    "guild-1",
                    "azzy",
                    "Layer 7",
                    BossStatus::Defeated,
                    now + Duration::seconds(i),
                )
                .await
                .map(|_| ())
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let state = registry.get("guild-1").await.unwrap();
    assert_eq!(state.get(BossId::Azuregos).unwrap().total_kills, 32);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn tenants_progress_independently() {
    let registry = Arc::new(TenantBossRegistry::new());
    let now = wednesday_noon();

    let mut handles = Vec::new();
    for tenant in 0..16 {
        let registry = registry.clone();
        handles.push(tokio::spawn(async move {
            let tenant_id = format!("guild-{tenant}");
            for _ in 0..4 {
                registry
                    .apply_scout_report(&tenant_id, "kazzy", "Layer 1", BossStatus::Defeated, now)
                    .await
                    .unwrap();
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let all = registry.all_tenant_boss_reports().await;
    assert_eq!(all.len(), 16);
    assert!(all
        .iter()
        .all(|(_, state)| state.get(BossId::Kazzak).unwrap().total_kills == 4));
}
