//! Integration tests for the JSONL file store.

use mnemosyne_core::{
    AuditEvent, AuditStore, BlockingStore, EventQuery, StoreResolver, StoreTarget,
};
use mnemosyne_file::{FileStore, FileStoreConfig};

fn tenant_resolver() -> StoreResolver {
    StoreResolver::routed("events", |event| {
        event
            .field_str("Tenant")
            .map_or_else(|| StoreTarget::new("events"), StoreTarget::new)
    })
}

#[tokio::test]
async fn routed_events_land_in_separate_journals() {
    let tmp = tempfile::tempdir().unwrap();
    let store = FileStore::new(FileStoreConfig::new(tmp.path()))
        .unwrap()
        .with_resolver(tenant_resolver());

    let north_id = store
        .insert(&AuditEvent::new("Connect").with_field("Tenant", "north"))
        .await
        .unwrap();
    let south_id = store
        .insert(&AuditEvent::new("Connect").with_field("Tenant", "south"))
        .await
        .unwrap();

    assert!(tmp.path().join("north.jsonl").exists());
    assert!(tmp.path().join("south.jsonl").exists());

    let north = StoreTarget::new("north");
    let south = StoreTarget::new("south");

    assert_eq!(
        store
            .get_from(&north, &north_id)
            .await
            .unwrap()
            .field_str("Tenant"),
        Some("north")
    );
    assert!(store
        .get_from(&south, &north_id)
        .await
        .unwrap_err()
        .is_not_found());
    assert!(store
        .get_from(&north, &south_id)
        .await
        .unwrap_err()
        .is_not_found());
}

#[tokio::test]
async fn events_survive_reopening_the_store() {
    let tmp = tempfile::tempdir().unwrap();

    let id = {
        let store = FileStore::new(FileStoreConfig::new(tmp.path())).unwrap();
        store
            .insert(&AuditEvent::new("Connect").with_field("ConnectionId", "abc123"))
            .await
            .unwrap()
    };

    let reopened = FileStore::new(FileStoreConfig::new(tmp.path())).unwrap();
    let loaded = reopened.get(&id).await.unwrap();
    assert_eq!(loaded.field_str("ConnectionId"), Some("abc123"));
}

#[tokio::test]
async fn query_spans_rotated_journals() {
    let tmp = tempfile::tempdir().unwrap();
    let config = FileStoreConfig::new(tmp.path())
        .with_max_file_bytes(256)
        .with_max_rotated_files(50);
    let store = FileStore::new(config).unwrap();

    for i in 0..20 {
        store
            .insert(&AuditEvent::new("Connect").with_field("Seq", i))
            .await
            .unwrap();
    }

    let all = store
        .query(&StoreTarget::new("events"), &EventQuery::new())
        .await
        .unwrap();
    assert_eq!(all.len(), 20);
}

#[test]
fn blocking_store_over_files() {
    let tmp = tempfile::tempdir().unwrap();
    let store =
        BlockingStore::new(FileStore::new(FileStoreConfig::new(tmp.path())).unwrap()).unwrap();

    let id = store
        .insert(&AuditEvent::new("Connect").with_field("ConnectionId", "abc123"))
        .unwrap();
    let loaded = store.get(&id).unwrap();
    assert_eq!(loaded.field_str("ConnectionId"), Some("abc123"));
}
