//! Retention scenarios: tombstones outlive sync and are purged locally.

#[cfg(test)]
mod tests {
    use crate::harness::{Device, Note};
    use sync_client::{MockRelay, SyncType, Syncable};
    use sync_types::{EntityId, Timestamp};

    fn day(n: u64) -> Timestamp {
        Timestamp::from_days(n)
    }

    #[tokio::test]
    async fn tombstone_kept_for_thirty_days() {
        let relay = MockRelay::new();
        let a = Device::new("a", &relay).await.unwrap();
        let b = Device::paired("b", &relay, &a).await.unwrap();
        let workspace = a.create_workspace().await.unwrap();
        b.join(&workspace).await.unwrap();

        a.notes.add_at("n", Note::titled("gone soon"), day(0)).unwrap();
        a.notes.delete_at(&EntityId::new("n"), day(1)).unwrap();
        a.sync(SyncType::Push).await.unwrap();
        b.sync(SyncType::Pull).await.unwrap();

        // Day 29: still within the window on both devices.
        assert_eq!(a.engine.purge_tombstones_at(day(29)), 0);
        assert_eq!(b.engine.purge_tombstones_at(day(29)), 0);
        let snapshot = b.notes.get_snapshot().unwrap();
        assert!(snapshot["entities"].get("n").is_some());

        // Day 31: thirty days after deletion.
        assert_eq!(a.engine.purge_tombstones_at(day(31)), 1);
        assert!(a.notes.get(&EntityId::new("n")).is_none());
        let snapshot = a.notes.get_snapshot().unwrap();
        assert!(snapshot["entities"].get("n").is_none());
    }

    /// A device that purged a tombstone never revives the entity from a
    /// peer that still holds the tombstone.
    #[tokio::test]
    async fn purged_peer_takes_tombstone_back_not_the_entity() {
        let relay = MockRelay::new();
        let a = Device::new("a", &relay).await.unwrap();
        let b = Device::paired("b", &relay, &a).await.unwrap();
        let workspace = a.create_workspace().await.unwrap();
        b.join(&workspace).await.unwrap();

        a.notes.add_at("n", Note::titled("x"), day(0)).unwrap();
        a.notes.delete_at(&EntityId::new("n"), day(1)).unwrap();
        a.sync(SyncType::Push).await.unwrap();
        b.sync(SyncType::Pull).await.unwrap();

        a.engine.purge_tombstones_at(day(40));
        b.sync(SyncType::Push).await.unwrap();
        a.sync(SyncType::Pull).await.unwrap();

        assert_eq!(a.note_title("n"), None);
    }

    #[tokio::test]
    async fn live_entities_are_never_purged() {
        let relay = MockRelay::new();
        let a = Device::new("a", &relay).await.unwrap();
        a.notes.add_at("n", Note::titled("keep"), day(0)).unwrap();

        assert_eq!(a.engine.purge_tombstones_at(day(365)), 0);
        assert_eq!(a.note_title("n").as_deref(), Some("keep"));
    }
}
