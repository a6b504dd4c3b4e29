//! Membership scenarios: creating, joining and leaving a workspace.

#[cfg(test)]
mod tests {
    use crate::harness::{Device, Note};
    use std::time::Duration;
    use sync_client::{ClientError, MockRelay, RelayOp, SyncType};
    use sync_types::{InviteCode, Timestamp};

    // ========================================================================
    // Joining
    // ========================================================================

    #[tokio::test]
    async fn join_adds_member_without_pushing() {
        let relay = MockRelay::new();
        let a = Device::new("a", &relay).await.unwrap();
        let b = Device::paired("b", &relay, &a).await.unwrap();
        let c = Device::paired("c", &relay, &a).await.unwrap();

        let workspace = a.create_workspace().await.unwrap();
        b.join(&workspace).await.unwrap();
        a.notes
            .add_at("n", Note::titled("shared"), Timestamp::from_millis(100))
            .unwrap();
        a.sync(SyncType::Push).await.unwrap();
        relay.clear_calls();

        let record = c.join(&workspace).await.unwrap();

        assert_eq!(record.device_ids.len(), 3);
        assert!(record.has_member(&a.engine.device_id()));
        assert!(record.has_member(&b.engine.device_id()));
        assert!(record.has_member(&c.engine.device_id()));
        assert_eq!(relay.call_count(RelayOp::CreateSnapshot), 0);
        assert_eq!(relay.snapshots(&workspace.id).len(), 1);

        c.sync(SyncType::Pull).await.unwrap();
        assert_eq!(c.note_title("n").as_deref(), Some("shared"));
    }

    #[tokio::test]
    async fn joining_twice_keeps_one_membership() {
        let relay = MockRelay::new();
        let a = Device::new("a", &relay).await.unwrap();
        let b = Device::paired("b", &relay, &a).await.unwrap();
        let workspace = a.create_workspace().await.unwrap();

        b.join(&workspace).await.unwrap();
        relay.clear_calls();
        let record = b.join(&workspace).await.unwrap();

        assert_eq!(record.device_ids.len(), 2);
        assert_eq!(relay.call_count(RelayOp::AppendDevice), 0);
    }

    /// Both joiners read the member set before either appends; neither
    /// append may overwrite the other.
    #[tokio::test(start_paused = true)]
    async fn concurrent_joins_keep_every_member() {
        let relay = MockRelay::new();
        let a = Device::new("a", &relay).await.unwrap();
        let b = Device::paired("b", &relay, &a).await.unwrap();
        let c = Device::paired("c", &relay, &a).await.unwrap();
        let workspace = a.create_workspace().await.unwrap();
        relay.set_delay(Some(Duration::from_millis(50)));
        relay.clear_calls();

        let (joined_b, joined_c) = tokio::join!(b.join(&workspace), c.join(&workspace));
        joined_b.unwrap();
        joined_c.unwrap();

        assert_eq!(
            relay.calls(),
            vec![
                RelayOp::FetchWorkspace,
                RelayOp::FetchWorkspace,
                RelayOp::AppendDevice,
                RelayOp::AppendDevice
            ]
        );
        let stored = relay.workspace(&workspace.id).unwrap();
        assert_eq!(stored.device_ids.len(), 3);
        for device in [&a, &b, &c] {
            assert!(stored.has_member(&device.engine.device_id()), "{}", device.name);
        }
        assert_eq!(relay.call_count(RelayOp::CreateSnapshot), 0);
    }

    #[tokio::test]
    async fn wrong_invite_code_is_rejected_and_changes_nothing() {
        let relay = MockRelay::new();
        let a = Device::new("a", &relay).await.unwrap();
        let c = Device::paired("c", &relay, &a).await.unwrap();
        let workspace = a.create_workspace().await.unwrap();

        let result = c
            .engine
            .join_workspace(&workspace.id, &InviteCode::new("not-the-code"))
            .await;

        assert!(matches!(result, Err(ClientError::Authorization(_))));
        assert_eq!(relay.call_count(RelayOp::AppendDevice), 0);
        let stored = relay.workspace(&workspace.id).unwrap();
        assert!(!stored.has_member(&c.engine.device_id()));
        assert_eq!(c.engine.workspace_id().await.unwrap(), None);
    }

    // ========================================================================
    // Leaving
    // ========================================================================

    #[tokio::test]
    async fn leaving_stops_sync_but_keeps_membership() {
        let relay = MockRelay::new();
        let a = Device::new("a", &relay).await.unwrap();
        let workspace = a.create_workspace().await.unwrap();

        a.engine.leave_workspace().await.unwrap();

        let err = a.sync(SyncType::Both).await.unwrap_err();
        assert!(matches!(err.source, ClientError::NoWorkspace));
        let stored = relay.workspace(&workspace.id).unwrap();
        assert!(stored.has_member(&a.engine.device_id()));
    }
}
