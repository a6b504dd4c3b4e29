//! Conflict scenarios: concurrent edits on two devices.
//!
//! Edits never merge field by field. The record with the newer `updatedAt`
//! wins wholesale and the older edit is lost.

#[cfg(test)]
mod tests {
    use crate::harness::{Device, Note, Task};
    use sync_client::{MockRelay, SyncType};
    use sync_types::{EntityId, Timestamp};

    fn at(millis: u64) -> Timestamp {
        Timestamp::from_millis(millis)
    }

    // ========================================================================
    // Entity conflicts
    // ========================================================================

    /// Draft on A, Final on B at t=200, Oops on A at t=150: Final wins everywhere.
    #[tokio::test]
    async fn newer_edit_wins_on_both_devices() {
        let relay = MockRelay::new();
        let a = Device::new("a", &relay).await.unwrap();
        let b = Device::paired("b", &relay, &a).await.unwrap();
        let workspace = a.create_workspace().await.unwrap();
        b.join(&workspace).await.unwrap();

        a.notes.add_at("n", Note::titled("Draft"), at(100)).unwrap();
        a.sync(SyncType::Push).await.unwrap();

        b.sync(SyncType::Pull).await.unwrap();
        assert_eq!(b.note_title("n").as_deref(), Some("Draft"));
        b.notes
            .update_at(&EntityId::new("n"), Note::titled("Final"), at(200))
            .unwrap();
        b.sync(SyncType::Push).await.unwrap();

        a.notes
            .update_at(&EntityId::new("n"), Note::titled("Oops"), at(150))
            .unwrap();
        a.sync(SyncType::Pull).await.unwrap();

        assert_eq!(a.note_title("n").as_deref(), Some("Final"));
        assert_eq!(b.note_title("n").as_deref(), Some("Final"));
    }

    /// Equal timestamps keep whatever each device already has.
    #[tokio::test]
    async fn tie_keeps_local_copy() {
        let relay = MockRelay::new();
        let a = Device::new("a", &relay).await.unwrap();
        let b = Device::paired("b", &relay, &a).await.unwrap();
        let workspace = a.create_workspace().await.unwrap();
        b.join(&workspace).await.unwrap();

        a.notes.add_at("n", Note::titled("from a"), at(100)).unwrap();
        b.notes.add_at("n", Note::titled("from b"), at(100)).unwrap();

        a.sync(SyncType::Push).await.unwrap();
        b.sync(SyncType::Pull).await.unwrap();

        assert_eq!(b.note_title("n").as_deref(), Some("from b"));
    }

    /// A newer deletion reaches the other device; an older edit never revives it.
    #[tokio::test]
    async fn deletion_propagates_and_sticks() {
        let relay = MockRelay::new();
        let a = Device::new("a", &relay).await.unwrap();
        let b = Device::paired("b", &relay, &a).await.unwrap();
        let workspace = a.create_workspace().await.unwrap();
        b.join(&workspace).await.unwrap();

        a.notes.add_at("n", Note::titled("shared"), at(100)).unwrap();
        a.sync(SyncType::Push).await.unwrap();
        b.sync(SyncType::Pull).await.unwrap();

        b.notes.delete_at(&EntityId::new("n"), at(300)).unwrap();
        b.sync(SyncType::Push).await.unwrap();

        a.notes
            .update_at(&EntityId::new("n"), Note::titled("late edit"), at(200))
            .unwrap();
        a.sync(SyncType::Both).await.unwrap();

        assert_eq!(a.note_title("n"), None);
        let tombstone = a.notes.get(&EntityId::new("n")).unwrap();
        assert_eq!(tombstone.deleted_at, Some(at(300)));

        b.sync(SyncType::Pull).await.unwrap();
        assert_eq!(b.note_title("n"), None);
    }

    // ========================================================================
    // Order lists
    // ========================================================================

    /// Tasks created on both devices end up listed on both, newest first
    /// relative to the base list.
    #[tokio::test]
    async fn ordered_store_picks_up_remote_tasks() {
        let relay = MockRelay::new();
        let a = Device::new("a", &relay).await.unwrap();
        let b = Device::paired("b", &relay, &a).await.unwrap();
        let workspace = a.create_workspace().await.unwrap();
        b.join(&workspace).await.unwrap();

        a.tasks.add_at("t1", Task::open("one"), at(100)).unwrap();
        a.tasks.add_at("t2", Task::open("two"), at(110)).unwrap();
        a.sync(SyncType::Push).await.unwrap();

        b.tasks.add_at("t3", Task::open("three"), at(120)).unwrap();
        b.sync(SyncType::Both).await.unwrap();

        assert_eq!(b.task_labels(), vec!["three", "two", "one"]);

        a.sync(SyncType::Pull).await.unwrap();
        assert_eq!(a.task_labels(), vec!["three", "two", "one"]);
    }

    /// A pure reorder covers the same active set as the local list, so the
    /// local order is kept. Order lists are a heuristic and do not converge
    /// under reordering alone.
    #[tokio::test]
    async fn reorder_alone_keeps_local_order() {
        let relay = MockRelay::new();
        let a = Device::new("a", &relay).await.unwrap();
        let b = Device::paired("b", &relay, &a).await.unwrap();
        let workspace = a.create_workspace().await.unwrap();
        b.join(&workspace).await.unwrap();

        a.tasks.add_at("t1", Task::open("one"), at(100)).unwrap();
        a.tasks.add_at("t2", Task::open("two"), at(110)).unwrap();
        a.sync(SyncType::Push).await.unwrap();
        b.sync(SyncType::Pull).await.unwrap();

        a.tasks
            .reorder(vec![EntityId::new("t1"), EntityId::new("t2")])
            .unwrap();
        a.sync(SyncType::Push).await.unwrap();
        b.sync(SyncType::Pull).await.unwrap();

        assert_eq!(a.task_labels(), vec!["one", "two"]);
        assert_eq!(b.task_labels(), vec!["two", "one"]);
    }

    /// Deleting a task drops it from the other device's list.
    #[tokio::test]
    async fn deleted_task_leaves_remote_list() {
        let relay = MockRelay::new();
        let a = Device::new("a", &relay).await.unwrap();
        let b = Device::paired("b", &relay, &a).await.unwrap();
        let workspace = a.create_workspace().await.unwrap();
        b.join(&workspace).await.unwrap();

        a.tasks.add_at("t1", Task::open("one"), at(100)).unwrap();
        a.tasks.add_at("t2", Task::open("two"), at(110)).unwrap();
        a.sync(SyncType::Push).await.unwrap();
        b.sync(SyncType::Pull).await.unwrap();

        a.tasks.delete_at(&EntityId::new("t2"), at(200)).unwrap();
        a.sync(SyncType::Push).await.unwrap();
        b.sync(SyncType::Pull).await.unwrap();

        assert_eq!(b.task_labels(), vec!["one"]);
    }
}
