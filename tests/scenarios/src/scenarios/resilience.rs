//! Resilience scenarios: failures part way through a cycle, bad input from
//! the relay and overlapping triggers.

#[cfg(test)]
mod tests {
    use crate::harness::{Device, Note};
    use serde_json::json;
    use std::time::Duration;
    use sync_client::{
        encrypt_snapshot, ClientError, CycleOutcome, MockRelay, PullOutcome, RegistrySnapshot,
        Relay, RelayError, RelayOp, SyncStatus, SyncType,
    };
    use sync_types::{NewSnapshot, Timestamp, WorkspaceId};

    fn at(millis: u64) -> Timestamp {
        Timestamp::from_millis(millis)
    }

    async fn upload(
        relay: &MockRelay,
        workspace: WorkspaceId,
        device: &Device,
        snapshot: RegistrySnapshot,
    ) {
        let snapshot_blob = encrypt_snapshot(&snapshot, device.engine.identity().key()).unwrap();
        relay
            .create_snapshot(NewSnapshot {
                workspace_id: workspace,
                snapshot_blob,
            })
            .await
            .unwrap();
    }

    // ========================================================================
    // Failures inside a cycle
    // ========================================================================

    #[tokio::test]
    async fn failed_push_keeps_completed_pull() {
        let relay = MockRelay::new();
        let a = Device::new("a", &relay).await.unwrap();
        let b = Device::paired("b", &relay, &a).await.unwrap();
        let workspace = a.create_workspace().await.unwrap();
        b.join(&workspace).await.unwrap();

        b.notes.add_at("n", Note::titled("from b"), at(100)).unwrap();
        b.sync(SyncType::Push).await.unwrap();

        relay.fail_next(
            RelayOp::CreateSnapshot,
            RelayError::Unavailable("connection reset".into()),
        );
        let err = a.sync(SyncType::Both).await.unwrap_err();

        assert!(matches!(err.source, ClientError::NetworkUnavailable(_)));
        assert!(matches!(err.pulled, Some(PullOutcome::Hydrated { .. })));
        assert_eq!(a.note_title("n").as_deref(), Some("from b"));
        assert!(matches!(a.engine.status(), SyncStatus::Error { .. }));
        assert_eq!(relay.snapshots(&workspace.id).len(), 1);
    }

    #[tokio::test]
    async fn offline_relay_is_transient() {
        let relay = MockRelay::new();
        let a = Device::new("a", &relay).await.unwrap();
        a.create_workspace().await.unwrap();

        relay.set_offline(true);
        let err = a.sync(SyncType::Both).await.unwrap_err();
        assert!(matches!(err.source, ClientError::NetworkUnavailable(_)));
        assert!(err.source.is_transient());
        assert!(err.pulled.is_none());

        relay.set_offline(false);
        a.sync(SyncType::Both).await.unwrap();
        assert_eq!(a.engine.status(), SyncStatus::Idle);

        let statuses = a.observer.statuses();
        assert!(matches!(statuses[1], SyncStatus::Error { .. }));
        assert_eq!(statuses.last(), Some(&SyncStatus::Idle));
    }

    #[tokio::test]
    async fn unauthorized_relay_is_an_authorization_error() {
        let relay = MockRelay::new();
        let a = Device::new("a", &relay).await.unwrap();
        a.create_workspace().await.unwrap();

        relay.fail_next(
            RelayOp::LatestSnapshot,
            RelayError::Unauthorized("device revoked".into()),
        );
        let err = a.sync(SyncType::Both).await.unwrap_err();

        assert!(matches!(err.source, ClientError::Authorization(_)));
        assert!(!err.source.is_transient());
        assert_eq!(relay.call_count(RelayOp::CreateSnapshot), 0);
    }

    // ========================================================================
    // Bad input from the relay
    // ========================================================================

    #[tokio::test]
    async fn wrong_key_fails_decryption_and_merges_nothing() {
        let relay = MockRelay::new();
        let a = Device::new("a", &relay).await.unwrap();
        let stranger = Device::new("stranger", &relay).await.unwrap();
        let workspace = a.create_workspace().await.unwrap();
        stranger.join(&workspace).await.unwrap();

        a.notes.add_at("n", Note::titled("secret"), at(100)).unwrap();
        a.sync(SyncType::Push).await.unwrap();

        let err = stranger.sync(SyncType::Pull).await.unwrap_err();

        assert!(matches!(err.source, ClientError::DecryptionFailed));
        assert_eq!(stranger.note_title("n"), None);
        assert!(matches!(stranger.engine.status(), SyncStatus::Error { .. }));
    }

    #[tokio::test]
    async fn malformed_entity_is_skipped_and_reported() {
        let relay = MockRelay::new();
        let a = Device::new("a", &relay).await.unwrap();
        let workspace = a.create_workspace().await.unwrap();

        let mut snapshot = RegistrySnapshot::new();
        snapshot.insert(
            "notes".into(),
            json!({
                "entities": {
                    "good": { "id": "good", "createdAt": 100, "updatedAt": 100, "title": "ok" },
                    "bad": { "id": "bad", "createdAt": "yesterday" }
                }
            }),
        );
        upload(&relay, workspace.id, &a, snapshot).await;

        a.sync(SyncType::Pull).await.unwrap();

        assert_eq!(a.note_title("good").as_deref(), Some("ok"));
        assert_eq!(a.note_title("bad"), None);
        let skipped = a.observer.skipped_entities();
        assert_eq!(skipped.len(), 1);
        assert!(skipped[0].contains("bad"));
        assert_eq!(a.engine.status(), SyncStatus::Idle);
    }

    #[tokio::test]
    async fn unknown_store_keys_are_ignored() {
        let relay = MockRelay::new();
        let a = Device::new("a", &relay).await.unwrap();
        let workspace = a.create_workspace().await.unwrap();

        let mut snapshot = RegistrySnapshot::new();
        snapshot.insert("calendar".into(), json!({ "entities": {} }));
        snapshot.insert(
            "notes".into(),
            json!({
                "entities": {
                    "n": { "id": "n", "createdAt": 1, "updatedAt": 1, "title": "known" }
                }
            }),
        );
        upload(&relay, workspace.id, &a, snapshot).await;

        let outcome = a.sync(SyncType::Pull).await.unwrap();

        let CycleOutcome::Completed(report) = outcome else {
            panic!("cycle skipped");
        };
        let Some(PullOutcome::Hydrated { summary, .. }) = report.pulled else {
            panic!("nothing pulled");
        };
        assert_eq!(summary.unknown, vec!["calendar".to_string()]);
        assert_eq!(a.note_title("n").as_deref(), Some("known"));
        assert!(a.observer.skipped_entities().is_empty());
    }

    // ========================================================================
    // Overlapping triggers
    // ========================================================================

    #[tokio::test(start_paused = true)]
    async fn overlapping_trigger_is_dropped() {
        let relay = MockRelay::new();
        let a = Device::new("a", &relay).await.unwrap();
        a.create_workspace().await.unwrap();
        relay.set_delay(Some(Duration::from_secs(1)));
        relay.clear_calls();

        let (first, second) = tokio::join!(a.sync(SyncType::Both), a.sync(SyncType::Both));

        assert!(matches!(first.unwrap(), CycleOutcome::Completed(_)));
        assert_eq!(second.unwrap(), CycleOutcome::Skipped);
        assert_eq!(a.observer.skipped_cycles(), 1);
        assert_eq!(
            relay.calls(),
            vec![RelayOp::LatestSnapshot, RelayOp::CreateSnapshot]
        );
        assert!(!a.engine.is_busy());
    }
}
