//! SQLite adapter tests against a private in-memory database.

#![cfg(feature = "sqlite")]

use chrono::{Duration, TimeZone, Utc};
use qrlogix_tracking::domain::{NewAuditRecord, NewSession};
use qrlogix_tracking::{
    AuditAction, CheckinRepository, CheckinService, Checkpoint, CycleOutcome, ManualActionRequest,
    ManualClock, SqliteConfig, SqliteRepository, TimeSource, TrackingConfig,
};
use std::sync::Arc;

async fn make_repo() -> SqliteRepository {
    SqliteRepository::connect(&SqliteConfig::memory())
        .await
        .unwrap()
}

fn t0() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 10, 25, 13, 0, 0).unwrap()
}

#[tokio::test]
async fn test_migrate_is_idempotent() {
    let repo = make_repo().await;
    repo.migrate().await.unwrap();
    repo.migrate().await.unwrap();
}

#[tokio::test]
async fn test_truck_and_session_roundtrip() {
    let repo = make_repo().await;

    let truck = repo.create_truck(Some("abc123")).await.unwrap();
    assert_eq!(
        repo.truck_by_cookie("abc123").await.unwrap().map(|t| t.id),
        Some(truck.id)
    );
    assert!(repo.truck_by_cookie("missing").await.unwrap().is_none());

    let session = repo
        .create_session(NewSession {
            truck_id: truck.id,
            plate: "HE2345".into(),
            started_at: t0(),
            duration: Duration::minutes(60),
        })
        .await
        .unwrap();
    assert_eq!(session.ends_at, t0() + Duration::minutes(60));

    let inside = t0() + Duration::minutes(30);
    let after = t0() + Duration::minutes(61);
    assert!(repo
        .active_session_for_truck(truck.id, inside)
        .await
        .unwrap()
        .is_some());
    assert!(repo
        .active_session_for_plate("HE2345", after)
        .await
        .unwrap()
        .is_none());
    assert_eq!(repo.count_active_sessions(inside).await.unwrap(), 1);

    let other = repo.create_truck(Some("def456")).await.unwrap();
    repo.reassign_session(session.id, other.id).await.unwrap();
    let reloaded = repo.session(session.id).await.unwrap().unwrap();
    assert_eq!(reloaded.truck_id, other.id);
}

#[tokio::test]
async fn test_cycle_scans_and_delete() {
    let repo = make_repo().await;
    let truck = repo.create_truck(Some("abc123")).await.unwrap();
    let session = repo
        .create_session(NewSession {
            truck_id: truck.id,
            plate: "HE2345".into(),
            started_at: t0(),
            duration: Duration::minutes(60),
        })
        .await
        .unwrap();
    let cycle = repo.create_cycle(session.id, t0()).await.unwrap();

    repo.insert_scan(cycle.id, Checkpoint::Waiting, t0() + Duration::minutes(5))
        .await
        .unwrap();
    repo.insert_scan(cycle.id, Checkpoint::Entry, t0())
        .await
        .unwrap();

    let scans = repo.scans_for_cycle(cycle.id).await.unwrap();
    assert_eq!(
        scans.iter().map(|s| s.checkpoint).collect::<Vec<_>>(),
        vec![Checkpoint::Entry, Checkpoint::Waiting]
    );
    assert_eq!(scans[0].status, "OK");
    assert_eq!(
        repo.last_scan(cycle.id).await.unwrap().map(|s| s.checkpoint),
        Some(Checkpoint::Waiting)
    );
    assert!(repo
        .scan_for_checkpoint(cycle.id, Checkpoint::Loading)
        .await
        .unwrap()
        .is_none());

    assert_eq!(repo.open_cycles().await.unwrap().len(), 1);
    repo.delete_cycle(cycle.id).await.unwrap();
    assert!(repo.open_cycles().await.unwrap().is_empty());
    assert!(repo.scans_for_cycle(cycle.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_complete_cycle_counts_in_range() {
    let repo = make_repo().await;
    let truck = repo.create_truck(None).await.unwrap();
    let session = repo
        .create_session(NewSession {
            truck_id: truck.id,
            plate: "HE2345".into(),
            started_at: t0(),
            duration: Duration::minutes(60),
        })
        .await
        .unwrap();
    let cycle = repo.create_cycle(session.id, t0()).await.unwrap();

    repo.complete_cycle(cycle.id, t0() + Duration::minutes(40))
        .await
        .unwrap();

    assert!(repo
        .open_cycle_for_session(session.id)
        .await
        .unwrap()
        .is_none());
    let day_end = t0() + Duration::hours(12);
    assert_eq!(
        repo.count_cycles_completed_between(t0(), day_end)
            .await
            .unwrap(),
        1
    );
    assert_eq!(
        repo.cycles_started_between(t0(), day_end)
            .await
            .unwrap()
            .len(),
        1
    );
}

#[tokio::test]
async fn test_audit_records() {
    let repo = make_repo().await;

    let stored = repo
        .insert_audit(NewAuditRecord {
            plate: "HE2345".into(),
            recorded_at: t0(),
            session_id: 7,
            cycle_id: 8,
            action: AuditAction::Closed,
            reason: "Cierre manual".into(),
            details: serde_json::json!({"nota": "ok"}),
            recorded_by: "supervisor".into(),
        })
        .await
        .unwrap();

    assert!(repo.audit_exists(7, 8).await.unwrap());
    assert!(!repo.audit_exists(7, 9).await.unwrap());

    let records = repo.audit_records_for_plate("HE2345").await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, stored.id);
    assert_eq!(records[0].action, AuditAction::Closed);
    assert_eq!(records[0].details, serde_json::json!({"nota": "ok"}));
    assert_eq!(records[0].recorded_at, t0());
}

#[tokio::test]
async fn test_whitelists() {
    let repo = make_repo().await;

    assert!(!repo.is_plate_authorized("HE2345").await.unwrap());
    assert!(repo.authorize_plate("HE2345").await.unwrap());
    assert!(!repo.authorize_plate("HE2345").await.unwrap());
    assert!(repo.is_plate_authorized("HE2345").await.unwrap());

    repo.authorize_device("dev-1", "HE2345").await.unwrap();
    repo.authorize_device("dev-1", "HE2345").await.unwrap();
    assert!(repo.is_device_authorized("dev-1", "HE2345").await.unwrap());
    assert!(!repo.is_device_authorized("dev-2", "HE2345").await.unwrap());
}

#[tokio::test]
async fn test_service_on_sqlite() {
    let repo = Arc::new(make_repo().await);
    let clock = Arc::new(ManualClock::new(t0()));
    let service = CheckinService::new(repo.clone(), clock.clone(), TrackingConfig::default());

    let first = service
        .scan_checkpoint(None, Some("HE2345".into()), Checkpoint::Entry)
        .await
        .unwrap();
    clock.advance(Duration::minutes(10));
    let exit = service
        .scan_checkpoint(Some(first.cookie.clone()), None, Checkpoint::Exit)
        .await
        .unwrap();

    assert_eq!(exit.cycle, CycleOutcome::Discarded);
    assert!(repo.open_cycles().await.unwrap().is_empty());
    let audit = repo.audit_records_for_plate("HE2345").await.unwrap();
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].recorded_by, "Sistema");

    let session = repo.session(exit.session_id).await.unwrap().unwrap();
    assert!(session.closed);
    assert_eq!(repo.count_active_sessions(clock.now()).await.unwrap(), 0);
}

#[tokio::test]
async fn test_close_session() {
    let repo = make_repo().await;
    let truck = repo.create_truck(Some("abc123")).await.unwrap();
    let session = repo
        .create_session(NewSession {
            truck_id: truck.id,
            plate: "HE2345".into(),
            started_at: t0(),
            duration: Duration::minutes(60),
        })
        .await
        .unwrap();

    repo.close_session(session.id, t0() + Duration::minutes(20))
        .await
        .unwrap();

    let inside = t0() + Duration::minutes(10);
    assert!(repo
        .active_session_for_truck(truck.id, inside)
        .await
        .unwrap()
        .is_none());
    let reloaded = repo.session(session.id).await.unwrap().unwrap();
    assert!(reloaded.closed);
    assert_eq!(reloaded.ends_at, t0() + Duration::minutes(20));
}

/// A cookie-only scan and a plate scan from the same phone race for a
/// session that has no open cycle. Both must land in one cycle.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_cookie_and_plate_scans_race_into_one_cycle() {
    for _ in 0..20 {
        let repo = Arc::new(make_repo().await);
        let clock = Arc::new(ManualClock::new(t0()));
        let service = Arc::new(CheckinService::new(
            repo.clone(),
            clock.clone(),
            TrackingConfig::default(),
        ));

        let first = service
            .scan_checkpoint(None, Some("HE2345".into()), Checkpoint::Entry)
            .await
            .unwrap();
        service
            .apply_manual_action(ManualActionRequest {
                placa: Some("HE2345".into()),
                accion: Some("eliminar".into()),
                ..ManualActionRequest::default()
            })
            .await
            .unwrap();
        assert!(repo
            .open_cycle_for_session(first.session_id)
            .await
            .unwrap()
            .is_none());
        clock.advance(Duration::minutes(1));

        let cookie_only = {
            let service = Arc::clone(&service);
            let cookie = first.cookie.clone();
            tokio::spawn(async move {
                service
                    .scan_checkpoint(Some(cookie), None, Checkpoint::Entry)
                    .await
            })
        };
        let with_plate = {
            let service = Arc::clone(&service);
            let cookie = first.cookie.clone();
            tokio::spawn(async move {
                service
                    .scan_checkpoint(Some(cookie), Some("HE2345".into()), Checkpoint::Entry)
                    .await
            })
        };
        let (a, b) = (
            cookie_only.await.unwrap().unwrap(),
            with_plate.await.unwrap().unwrap(),
        );

        assert_eq!(a.session_id, first.session_id);
        assert_eq!(b.session_id, first.session_id);
        assert_eq!(a.cycle_id, b.cycle_id);
        let open: Vec<_> = repo
            .open_cycles()
            .await
            .unwrap()
            .into_iter()
            .filter(|c| c.session_id == first.session_id)
            .collect();
        assert_eq!(open.len(), 1);
    }
}
