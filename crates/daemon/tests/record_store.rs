//! The SQLite record store against the storage contract

mod common;

use ::common::model::{
    ItemFields, ItemId, ItemPatch, ItemRole, Lifetime, ListPreset, NewItem, NewObject, ObjectId,
    ObjectKind,
};
use ::common::store::{RecordStore, StoreError};
use ephemera_daemon::database::Database;

use crate::common::setup_db;

fn new_list(lifetime: Lifetime) -> NewObject {
    NewObject {
        kind: ObjectKind::List {
            preset: ListPreset::Potluck,
        },
        encrypted_structure: b"sealed-structure".to_vec(),
        lifetime,
        password_digest: None,
    }
}

fn entry(payload: &[u8]) -> NewItem {
    NewItem {
        role: ItemRole::Entry,
        encrypted_payload: payload.to_vec(),
        fields: ItemFields {
            claimed: Some(false),
            position: Some(3),
            ..Default::default()
        },
    }
}

#[tokio::test]
async fn test_lifetime_survives_persistence_exactly() {
    let (db, _clock) = setup_db().await;

    for lifetime in Lifetime::ALL {
        let created = db.create_object(new_list(lifetime)).await.unwrap();
        let stored = db.read_object(&created.record.id).await.unwrap();

        assert_eq!(stored, created.record);
        assert_eq!(stored.expires_at - stored.created_at, lifetime.duration());
        assert!(stored.admin_digest.verify(created.admin_token.as_bytes()));
    }
}

#[tokio::test]
async fn test_items_round_trip_with_fields() {
    let (db, _clock) = setup_db().await;
    let id = db.create_object(new_list(Lifetime::OneHour)).await.unwrap().record.id;

    let first = db.append_item(&id, entry(b"salad")).await.unwrap();
    let second = db.append_item(&id, entry(b"bread")).await.unwrap();
    assert_eq!(first.object_version, 2);
    assert_eq!(second.object_version, 3);

    let updated = db
        .update_item(
            &id,
            &first.item_id,
            ItemPatch {
                fields: ItemFields {
                    claimed: Some(true),
                    ..Default::default()
                },
                ..Default::default()
            },
            1,
        )
        .await
        .unwrap();
    assert_eq!(updated.item_version, 2);
    assert_eq!(updated.object_version, 4);

    let snapshot = db.snapshot(&id).await.unwrap();
    assert_eq!(snapshot.version(), 4);
    assert_eq!(snapshot.items.len(), 2);

    let salad = &snapshot.items[0];
    assert_eq!(salad.id, first.item_id);
    assert_eq!(salad.encrypted_payload, b"salad".to_vec());
    // untouched fields keep their values
    assert_eq!(salad.fields.claimed, Some(true));
    assert_eq!(salad.fields.position, Some(3));
    assert_eq!(salad.fields.completed, None);
    assert_eq!(salad.version, 2);
}

#[tokio::test]
async fn test_failed_item_update_leaves_object_version_alone() {
    let (db, _clock) = setup_db().await;
    let id = db.create_object(new_list(Lifetime::OneHour)).await.unwrap().record.id;
    let item = db.append_item(&id, entry(b"salad")).await.unwrap();

    let err = db
        .update_item(&id, &item.item_id, ItemPatch::default(), 5)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::VersionConflict {
            expected: 5,
            current: 1
        }
    ));
    assert_eq!(db.version(&id).await.unwrap(), 2);
}

#[tokio::test]
async fn test_concurrent_stale_object_updates_have_one_winner() {
    let (db, _clock) = setup_db().await;
    let id = db.create_object(new_list(Lifetime::OneHour)).await.unwrap().record.id;

    let mut handles = Vec::new();
    for n in 0..8u8 {
        let db = db.clone();
        let id = id.clone();
        handles.push(tokio::spawn(async move {
            db.update_object(&id, vec![n], 1).await
        }));
    }

    let mut winners = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(version) => {
                assert_eq!(version, 2);
                winners += 1;
            }
            Err(StoreError::VersionConflict {
                expected: 1,
                current: 2,
            }) => conflicts += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    assert_eq!(winners, 1);
    assert_eq!(conflicts, 7);
    assert_eq!(db.version(&id).await.unwrap(), 2);
}

/// Racing item updates against a real file, so several pooled connections
/// contend for the write lock instead of taking turns on a single one
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_item_updates_on_disk_have_one_winner() {
    const WRITERS: usize = 24;

    let dir = tempfile::tempdir().unwrap();
    let url = url::Url::parse(&format!(
        "sqlite://{}",
        dir.path().join("race.sqlite").display()
    ))
    .unwrap();
    let db = Database::connect(&url).await.unwrap();

    let id = db.create_object(new_list(Lifetime::OneHour)).await.unwrap().record.id;
    let item = db.append_item(&id, entry(b"salad")).await.unwrap();
    assert_eq!(item.object_version, 2);

    let barrier = std::sync::Arc::new(tokio::sync::Barrier::new(WRITERS));
    let mut handles = Vec::new();
    for n in 0..WRITERS {
        let db = db.clone();
        let id = id.clone();
        let barrier = barrier.clone();
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            let patch = ItemPatch {
                encrypted_payload: Some(vec![n as u8]),
                ..Default::default()
            };
            db.update_item(&id, &item.item_id, patch, 1).await
        }));
    }

    let mut winners = Vec::new();
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(write) => winners.push(write),
            Err(StoreError::VersionConflict {
                expected: 1,
                current: 2,
            }) => conflicts += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    assert_eq!(winners.len(), 1);
    assert_eq!(winners[0].item_version, 2);
    assert_eq!(winners[0].object_version, 3);
    assert_eq!(conflicts, WRITERS - 1);

    // losers rolled back their object version bump
    assert_eq!(db.version(&id).await.unwrap(), 3);
    let snapshot = db.snapshot(&id).await.unwrap();
    assert_eq!(snapshot.items[0].version, 2);
}

#[tokio::test]
async fn test_item_role_only_sees_live_objects() {
    let (db, clock) = setup_db().await;
    let id = db
        .create_object(new_list(Lifetime::FiveMinutes))
        .await
        .unwrap()
        .record
        .id;
    let item = db.append_item(&id, entry(b"salad")).await.unwrap();

    assert_eq!(db.item_role(&id, &item.item_id).await.unwrap(), ItemRole::Entry);
    assert!(matches!(
        db.item_role(&id, &ItemId::generate()).await,
        Err(StoreError::NotFound)
    ));
    // the lookup is read-only
    assert_eq!(db.version(&id).await.unwrap(), 2);

    clock.advance(Lifetime::FiveMinutes.duration());
    assert!(matches!(
        db.item_role(&id, &item.item_id).await,
        Err(StoreError::NotFound)
    ));
}

#[tokio::test]
async fn test_expiry_follows_the_clock() {
    let (db, clock) = setup_db().await;
    let short = db
        .create_object(new_list(Lifetime::FiveMinutes))
        .await
        .unwrap()
        .record
        .id;
    let long = db.create_object(new_list(Lifetime::OneDay)).await.unwrap().record.id;

    clock.advance(Lifetime::FiveMinutes.duration());

    assert!(matches!(db.read_object(&short).await, Err(StoreError::NotFound)));
    assert!(matches!(db.snapshot(&short).await, Err(StoreError::NotFound)));
    assert!(matches!(
        db.append_item(&short, entry(b"late")).await,
        Err(StoreError::NotFound)
    ));
    assert!(db.read_object(&long).await.is_ok());

    let purged = db.purge_expired().await.unwrap();
    assert_eq!(purged, vec![short]);
    assert!(db.purge_expired().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_take_object_is_single_use() {
    let (db, _clock) = setup_db().await;
    let id = db
        .create_object(NewObject {
            kind: ObjectKind::Note {
                burn_after_reading: true,
            },
            encrypted_structure: b"sealed note".to_vec(),
            lifetime: Lifetime::OneWeek,
            password_digest: None,
        })
        .await
        .unwrap()
        .record
        .id;

    let taken = db.take_object(&id).await.unwrap();
    assert_eq!(taken.encrypted_structure, b"sealed note".to_vec());
    assert!(matches!(db.take_object(&id).await, Err(StoreError::NotFound)));
    assert!(matches!(db.read_object(&id).await, Err(StoreError::NotFound)));
}

#[tokio::test]
async fn test_deleting_an_object_removes_its_items() {
    let (db, _clock) = setup_db().await;
    let id = db.create_object(new_list(Lifetime::OneHour)).await.unwrap().record.id;
    db.append_item(&id, entry(b"salad")).await.unwrap();

    db.delete_object(&id).await.unwrap();
    assert!(matches!(db.delete_object(&id).await, Err(StoreError::NotFound)));

    let (orphans,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM items WHERE object_id = ?")
        .bind(id.as_str())
        .fetch_one(&*db)
        .await
        .unwrap();
    assert_eq!(orphans, 0);

    let unknown = ObjectId::generate().unwrap();
    assert!(matches!(db.version(&unknown).await, Err(StoreError::NotFound)));
}
