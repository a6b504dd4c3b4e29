//! Opt-out scenarios: a store with sync disabled stays local.

#[cfg(test)]
mod tests {
    use crate::harness::{Device, Note, Task};
    use sync_client::{
        decrypt_snapshot, Hydration, MockRelay, PullOutcome, RegistrySnapshot, SyncType, Syncable,
    };
    use sync_types::{Timestamp, WorkspaceId};

    fn at(millis: u64) -> Timestamp {
        Timestamp::from_millis(millis)
    }

    fn latest(relay: &MockRelay, workspace: &WorkspaceId, device: &Device) -> RegistrySnapshot {
        let record = relay.snapshots(workspace).pop().unwrap();
        decrypt_snapshot(&record.snapshot_blob, device.engine.identity().key()).unwrap()
    }

    #[tokio::test]
    async fn disabled_store_ignores_incoming_slice() {
        let relay = MockRelay::new();
        let a = Device::new("a", &relay).await.unwrap();
        let b = Device::with_private_notes("b", &relay, &a).await.unwrap();
        let workspace = a.create_workspace().await.unwrap();
        b.join(&workspace).await.unwrap();

        b.notes.add_at("mine", Note::titled("private"), at(50)).unwrap();
        let before = b.notes.get_snapshot().unwrap();

        a.notes.add_at("n", Note::titled("public"), at(100)).unwrap();
        a.tasks.add_at("t", Task::open("shared task"), at(100)).unwrap();
        a.sync(SyncType::Push).await.unwrap();

        let outcome = b.sync(SyncType::Pull).await.unwrap();

        assert_eq!(b.notes.get_snapshot().unwrap(), before);
        assert_eq!(b.note_title("n"), None);
        assert_eq!(b.task_labels(), vec!["shared task"]);

        let sync_client::CycleOutcome::Completed(report) = outcome else {
            panic!("cycle skipped");
        };
        let Some(PullOutcome::Hydrated { summary, .. }) = report.pulled else {
            panic!("nothing pulled");
        };
        assert_eq!(summary.stores.get("notes"), Some(&Hydration::Disabled));
    }

    #[tokio::test]
    async fn disabled_store_is_left_out_of_push() {
        let relay = MockRelay::new();
        let a = Device::new("a", &relay).await.unwrap();
        let b = Device::with_private_notes("b", &relay, &a).await.unwrap();
        let workspace = a.create_workspace().await.unwrap();
        b.join(&workspace).await.unwrap();

        b.notes.add_at("mine", Note::titled("private"), at(50)).unwrap();
        b.tasks.add_at("t", Task::open("errand"), at(60)).unwrap();
        b.sync(SyncType::Push).await.unwrap();

        let snapshot = latest(&relay, &workspace.id, &b);
        assert!(snapshot.contains_key("tasks"));
        assert!(!snapshot.contains_key("notes"));

        a.sync(SyncType::Pull).await.unwrap();
        assert_eq!(a.note_title("mine"), None);
        assert_eq!(a.task_labels(), vec!["errand"]);
    }

    #[tokio::test]
    async fn re_enabling_merges_again() {
        let relay = MockRelay::new();
        let a = Device::new("a", &relay).await.unwrap();
        let b = Device::with_private_notes("b", &relay, &a).await.unwrap();
        let workspace = a.create_workspace().await.unwrap();
        b.join(&workspace).await.unwrap();

        a.notes.add_at("n", Note::titled("public"), at(100)).unwrap();
        a.sync(SyncType::Push).await.unwrap();
        b.sync(SyncType::Pull).await.unwrap();
        assert_eq!(b.note_title("n"), None);

        b.notes.set_sync_enabled(true);
        b.sync(SyncType::Pull).await.unwrap();
        assert_eq!(b.note_title("n").as_deref(), Some("public"));
    }
}
