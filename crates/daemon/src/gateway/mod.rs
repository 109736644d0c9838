//! Capability checks, validation and orchestration for every write.
//!
//! The gateway is the only caller of the record store on the request path.
//! It knows who may do what, the store only knows how to do it atomically.

mod error;
mod watch;

use common::crypto::{Commitment, PasswordProof};
use common::model::{
    AdminToken, CreatedObject, ItemFields, ItemId, ItemPatch, ItemWrite, Lifetime, NewItem,
    NewObject, ObjectId, ObjectKind, ObjectRecord, Snapshot,
};
use common::store::{RecordStore, StoreError};

use crate::distributor::ChangeDistributor;

pub use error::GatewayError;
pub use watch::SnapshotStream;

/// Default cap on any single encrypted blob (256 KiB)
pub const DEFAULT_MAX_BLOB_BYTES: usize = 256 * 1024;

pub struct CreateObject {
    pub kind: ObjectKind,
    pub encrypted_structure: Vec<u8>,
    pub lifetime_secs: u64,
    pub password_proof: Option<PasswordProof>,
}

#[derive(Debug, Clone)]
pub struct ReadOutcome {
    pub snapshot: Snapshot,
    /// The read consumed a burn-after-reading note
    pub destroyed: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExistsOutcome {
    pub exists: bool,
    pub has_password: bool,
    pub burn_after_reading: bool,
}

#[derive(Debug, Clone)]
pub enum ItemOp {
    Append(NewItem),
    Update {
        item_id: ItemId,
        expected_version: u64,
        patch: ItemPatch,
    },
    Delete {
        item_id: ItemId,
        expected_version: Option<u64>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemOutcome {
    pub item_id: ItemId,
    /// `None` once the item is deleted
    pub item_version: Option<u64>,
    pub object_version: u64,
}

impl From<ItemWrite> for ItemOutcome {
    fn from(write: ItemWrite) -> Self {
        Self {
            item_id: write.item_id,
            item_version: Some(write.item_version),
            object_version: write.object_version,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Gateway<S> {
    store: S,
    distributor: ChangeDistributor,
    max_blob_bytes: usize,
}

fn check_password(record: &ObjectRecord, proof: Option<&PasswordProof>) -> Result<(), GatewayError> {
    let Some(digest) = &record.password_digest else {
        return Ok(());
    };
    match proof {
        Some(proof) if digest.verify(proof.as_bytes()) => Ok(()),
        _ => Err(GatewayError::Unauthorized),
    }
}

fn check_admin(record: &ObjectRecord, token: Option<&AdminToken>) -> Result<(), GatewayError> {
    match token {
        Some(token) if record.admin_digest.verify(token.as_bytes()) => Ok(()),
        _ => Err(GatewayError::Forbidden),
    }
}

impl<S: RecordStore> Gateway<S> {
    pub fn new(store: S, distributor: ChangeDistributor, max_blob_bytes: usize) -> Self {
        Self {
            store,
            distributor,
            max_blob_bytes,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn distributor(&self) -> &ChangeDistributor {
        &self.distributor
    }

    fn check_blob(&self, field: &str, blob: &[u8]) -> Result<(), GatewayError> {
        if blob.is_empty() {
            return Err(GatewayError::Validation(format!("{} must not be empty", field)));
        }
        if blob.len() > self.max_blob_bytes {
            return Err(GatewayError::Validation(format!(
                "{} is {} bytes, the limit is {}",
                field,
                blob.len(),
                self.max_blob_bytes
            )));
        }
        Ok(())
    }

    pub async fn create(&self, request: CreateObject) -> Result<CreatedObject, GatewayError> {
        let lifetime = Lifetime::from_secs(request.lifetime_secs)?;
        self.check_blob("encrypted_structure", &request.encrypted_structure)?;

        let created = self
            .store
            .create_object(NewObject {
                kind: request.kind,
                encrypted_structure: request.encrypted_structure,
                lifetime,
                password_digest: request
                    .password_proof
                    .map(|proof| Commitment::of(proof.as_bytes())),
            })
            .await?;

        tracing::info!(
            object_id = %created.record.id,
            kind = created.record.kind.name(),
            lifetime = %lifetime,
            "object created"
        );
        Ok(created)
    }

    /// Full state of an object, or `None` when `known_version` is still current.
    ///
    /// Burn-after-reading notes are consumed here: exactly one reader gets the
    /// content, with `destroyed` set.
    pub async fn read(
        &self,
        id: &ObjectId,
        proof: Option<&PasswordProof>,
        known_version: Option<u64>,
    ) -> Result<Option<ReadOutcome>, GatewayError> {
        let record = self.store.read_object(id).await?;
        check_password(&record, proof)?;

        if record.kind.burn_after_reading() {
            // a concurrent reader may have won; they got it, we get NotFound
            let object = self.store.take_object(id).await?;
            self.distributor.publish_destroyed(id);
            tracing::info!(object_id = %id, "burn-after-reading note consumed");
            return Ok(Some(ReadOutcome {
                snapshot: Snapshot {
                    object,
                    items: Vec::new(),
                },
                destroyed: true,
            }));
        }

        if known_version == Some(record.version) {
            return Ok(None);
        }

        let snapshot = self.store.snapshot(id).await?;
        Ok(Some(ReadOutcome {
            snapshot,
            destroyed: false,
        }))
    }

    /// Whether an object can be opened, without revealing or consuming anything
    pub async fn exists(&self, id: &ObjectId) -> Result<ExistsOutcome, GatewayError> {
        match self.store.read_object(id).await {
            Ok(record) => Ok(ExistsOutcome {
                exists: true,
                has_password: record.has_password(),
                burn_after_reading: record.kind.burn_after_reading(),
            }),
            Err(StoreError::NotFound) => Ok(ExistsOutcome::default()),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn mutate_item(
        &self,
        id: &ObjectId,
        proof: Option<&PasswordProof>,
        admin_token: Option<&AdminToken>,
        op: ItemOp,
    ) -> Result<ItemOutcome, GatewayError> {
        let record = self.store.read_object(id).await?;
        check_password(&record, proof)?;
        let kind = record.kind;

        let outcome = match op {
            ItemOp::Append(item) => {
                let rules = kind.validate_item(item.role, &item.fields, true)?;
                if rules.admin_only {
                    check_admin(&record, admin_token)?;
                }
                self.check_blob("encrypted_payload", &item.encrypted_payload)?;
                ItemOutcome::from(self.store.append_item(id, item).await?)
            }
            ItemOp::Update {
                item_id,
                expected_version,
                patch,
            } => {
                let role = self.store.item_role(id, &item_id).await?;
                let rules = kind.validate_item(role, &patch.fields, false)?;
                if rules.admin_only {
                    check_admin(&record, admin_token)?;
                }
                if let Some(payload) = &patch.encrypted_payload {
                    self.check_blob("encrypted_payload", payload)?;
                }
                ItemOutcome::from(
                    self.store
                        .update_item(id, &item_id, patch, expected_version)
                        .await?,
                )
            }
            ItemOp::Delete {
                item_id,
                expected_version,
            } => {
                let role = self.store.item_role(id, &item_id).await?;
                let rules = kind.validate_item(role, &ItemFields::default(), false)?;
                if rules.admin_only {
                    check_admin(&record, admin_token)?;
                }
                let object_version = self.store.delete_item(id, &item_id, expected_version).await?;
                ItemOutcome {
                    item_id,
                    item_version: None,
                    object_version,
                }
            }
        };

        self.distributor.publish(id, outcome.object_version);
        tracing::debug!(
            object_id = %id,
            item_id = %outcome.item_id,
            version = outcome.object_version,
            "item mutation accepted"
        );
        Ok(outcome)
    }

    /// Replace the encrypted structure (title, options, settings). Admin only.
    pub async fn reconfigure(
        &self,
        id: &ObjectId,
        admin_token: Option<&AdminToken>,
        encrypted_structure: Vec<u8>,
        expected_version: u64,
    ) -> Result<u64, GatewayError> {
        let record = self.store.read_object(id).await?;
        check_admin(&record, admin_token)?;
        self.check_blob("encrypted_structure", &encrypted_structure)?;

        let version = self
            .store
            .update_object(id, encrypted_structure, expected_version)
            .await?;
        self.distributor.publish(id, version);
        tracing::debug!(object_id = %id, version, "object reconfigured");
        Ok(version)
    }

    pub async fn delete(
        &self,
        id: &ObjectId,
        admin_token: Option<&AdminToken>,
    ) -> Result<(), GatewayError> {
        let record = self.store.read_object(id).await?;
        check_admin(&record, admin_token)?;

        self.store.delete_object(id).await?;
        self.distributor.publish_destroyed(id);
        tracing::info!(object_id = %id, "object deleted by admin");
        Ok(())
    }

    /// Purge expired objects and close any streams still watching them
    pub async fn purge_expired(&self) -> Result<Vec<ObjectId>, GatewayError> {
        let purged = self.store.purge_expired().await?;
        for id in &purged {
            self.distributor.publish_destroyed(id);
        }
        Ok(purged)
    }

    /// Live view of an object: the current state right away, then a fresh
    /// state after every accepted mutation.
    pub async fn watch(
        &self,
        id: &ObjectId,
        proof: Option<&PasswordProof>,
    ) -> Result<SnapshotStream, GatewayError> {
        let record = self.store.read_object(id).await?;
        check_password(&record, proof)?;
        if record.kind.burn_after_reading() {
            return Err(GatewayError::Validation(
                "burn-after-reading notes cannot be watched".into(),
            ));
        }

        // subscribe first so nothing accepted after the initial read is missed
        let subscription = self.distributor.subscribe(id);
        let initial = self.store.snapshot(id).await?;

        Ok(watch::snapshot_stream(
            self.store.clone(),
            subscription,
            initial,
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use common::clock::ManualClock;
    use common::model::{ItemRole, ListPreset, PollMode};
    use common::store::MemoryRecordStore;

    use super::*;

    fn gateway() -> (Gateway<MemoryRecordStore>, ManualClock) {
        let clock = ManualClock::default();
        let store = MemoryRecordStore::with_clock(Arc::new(clock.clone()));
        (
            Gateway::new(store, ChangeDistributor::new(16), DEFAULT_MAX_BLOB_BYTES),
            clock,
        )
    }

    fn create_request(kind: ObjectKind) -> CreateObject {
        CreateObject {
            kind,
            encrypted_structure: b"sealed".to_vec(),
            lifetime_secs: Lifetime::OneHour.as_secs(),
            password_proof: None,
        }
    }

    fn entry(fields: ItemFields) -> ItemOp {
        ItemOp::Append(NewItem {
            role: ItemRole::Entry,
            encrypted_payload: b"sealed entry".to_vec(),
            fields,
        })
    }

    #[tokio::test]
    async fn test_create_rejects_unlisted_lifetime() {
        let (gateway, _) = gateway();
        let mut request = create_request(ObjectKind::Quiz);
        request.lifetime_secs = 1234;

        let err = gateway.create(request).await.unwrap_err();
        assert_eq!(err, GatewayError::InvalidDuration(1234));
    }

    #[tokio::test]
    async fn test_create_rejects_oversized_structure() {
        let (gateway, _) = gateway();
        let mut request = create_request(ObjectKind::Group);
        request.encrypted_structure = vec![0u8; DEFAULT_MAX_BLOB_BYTES + 1];

        assert!(matches!(
            gateway.create(request).await,
            Err(GatewayError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_burn_after_reading_is_read_once() {
        let (gateway, _) = gateway();
        let created = gateway
            .create(create_request(ObjectKind::Note {
                burn_after_reading: true,
            }))
            .await
            .unwrap();
        let id = created.record.id;

        let first = gateway.read(&id, None, None).await.unwrap().unwrap();
        assert!(first.destroyed);
        assert_eq!(first.snapshot.object.encrypted_structure, b"sealed".to_vec());

        assert_eq!(
            gateway.read(&id, None, None).await.unwrap_err(),
            GatewayError::NotFound
        );
        assert!(!gateway.exists(&id).await.unwrap().exists);
    }

    #[tokio::test]
    async fn test_password_gates_reads_and_writes() {
        let (gateway, _) = gateway();
        let proof = PasswordProof::derive("open sesame");
        let mut request = create_request(ObjectKind::List {
            preset: ListPreset::Shopping,
        });
        request.password_proof = Some(proof.clone());
        let id = gateway.create(request).await.unwrap().record.id;

        let exists = gateway.exists(&id).await.unwrap();
        assert!(exists.exists && exists.has_password);

        assert_eq!(
            gateway.read(&id, None, None).await.unwrap_err(),
            GatewayError::Unauthorized
        );
        let wrong = PasswordProof::derive("open barley");
        assert_eq!(
            gateway.read(&id, Some(&wrong), None).await.unwrap_err(),
            GatewayError::Unauthorized
        );
        assert_eq!(
            gateway
                .mutate_item(&id, None, None, entry(ItemFields::default()))
                .await
                .unwrap_err(),
            GatewayError::Unauthorized
        );

        assert!(gateway.read(&id, Some(&proof), None).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_known_version_short_circuits() {
        let (gateway, _) = gateway();
        let id = gateway
            .create(create_request(ObjectKind::Poll {
                mode: PollMode::Fixed,
            }))
            .await
            .unwrap()
            .record
            .id;

        assert!(gateway.read(&id, None, Some(1)).await.unwrap().is_none());
        let outcome = gateway.read(&id, None, Some(0)).await.unwrap().unwrap();
        assert_eq!(outcome.snapshot.version(), 1);
    }

    #[tokio::test]
    async fn test_quiz_questions_need_admin_token() {
        let (gateway, _) = gateway();
        let created = gateway.create(create_request(ObjectKind::Quiz)).await.unwrap();
        let id = created.record.id;

        let question = || {
            ItemOp::Append(NewItem {
                role: ItemRole::Question,
                encrypted_payload: b"sealed question".to_vec(),
                fields: ItemFields {
                    position: Some(0),
                    ..Default::default()
                },
            })
        };

        assert_eq!(
            gateway
                .mutate_item(&id, None, None, question())
                .await
                .unwrap_err(),
            GatewayError::Forbidden
        );
        let forged = AdminToken::generate().unwrap();
        assert_eq!(
            gateway
                .mutate_item(&id, None, Some(&forged), question())
                .await
                .unwrap_err(),
            GatewayError::Forbidden
        );

        let outcome = gateway
            .mutate_item(&id, None, Some(&created.admin_token), question())
            .await
            .unwrap();
        assert_eq!(outcome.item_version, Some(1));
        assert_eq!(outcome.object_version, 2);

        // answers are open to every participant
        let answer = gateway
            .mutate_item(
                &id,
                None,
                None,
                ItemOp::Append(NewItem {
                    role: ItemRole::Answer,
                    encrypted_payload: b"sealed answer".to_vec(),
                    fields: ItemFields::default(),
                }),
            )
            .await
            .unwrap();
        assert_eq!(answer.object_version, 3);
    }

    #[tokio::test]
    async fn test_kind_rules_reject_foreign_items() {
        let (gateway, _) = gateway();
        let id = gateway
            .create(create_request(ObjectKind::List {
                preset: ListPreset::Plain,
            }))
            .await
            .unwrap()
            .record
            .id;

        let claimed = entry(ItemFields {
            claimed: Some(true),
            ..Default::default()
        });
        assert!(matches!(
            gateway.mutate_item(&id, None, None, claimed).await,
            Err(GatewayError::Validation(_))
        ));

        let vote = ItemOp::Append(NewItem {
            role: ItemRole::Vote,
            encrypted_payload: b"sealed vote".to_vec(),
            fields: ItemFields::default(),
        });
        assert!(matches!(
            gateway.mutate_item(&id, None, None, vote).await,
            Err(GatewayError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_stale_update_reports_conflict() {
        let (gateway, _) = gateway();
        let id = gateway
            .create(create_request(ObjectKind::List {
                preset: ListPreset::Potluck,
            }))
            .await
            .unwrap()
            .record
            .id;
        let item = gateway
            .mutate_item(&id, None, None, entry(ItemFields::default()))
            .await
            .unwrap();

        let claim = |expected_version| ItemOp::Update {
            item_id: item.item_id,
            expected_version,
            patch: ItemPatch {
                fields: ItemFields {
                    claimed: Some(true),
                    ..Default::default()
                },
                ..Default::default()
            },
        };

        let first = gateway.mutate_item(&id, None, None, claim(1)).await.unwrap();
        assert_eq!(first.item_version, Some(2));

        assert_eq!(
            gateway
                .mutate_item(&id, None, None, claim(1))
                .await
                .unwrap_err(),
            GatewayError::VersionConflict {
                expected: 1,
                current: 2
            }
        );
    }

    #[tokio::test]
    async fn test_mutating_unknown_item_is_not_found() {
        let (gateway, _) = gateway();
        let id = gateway
            .create(create_request(ObjectKind::List {
                preset: ListPreset::Potluck,
            }))
            .await
            .unwrap()
            .record
            .id;
        gateway
            .mutate_item(&id, None, None, entry(ItemFields::default()))
            .await
            .unwrap();
        let before = gateway.store.version(&id).await.unwrap();

        let stranger = ItemId::generate();
        let update = ItemOp::Update {
            item_id: stranger,
            expected_version: 1,
            patch: ItemPatch::default(),
        };
        let delete = ItemOp::Delete {
            item_id: stranger,
            expected_version: None,
        };
        for op in [update, delete] {
            assert_eq!(
                gateway.mutate_item(&id, None, None, op).await.unwrap_err(),
                GatewayError::NotFound
            );
        }

        // the role lookup alone never bumps the object version
        assert_eq!(gateway.store.version(&id).await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_delete_requires_admin_and_hides_object() {
        let (gateway, _) = gateway();
        let created = gateway.create(create_request(ObjectKind::Group)).await.unwrap();
        let id = created.record.id;

        assert_eq!(
            gateway.delete(&id, None).await.unwrap_err(),
            GatewayError::Forbidden
        );
        gateway.delete(&id, Some(&created.admin_token)).await.unwrap();

        assert_eq!(
            gateway.read(&id, None, None).await.unwrap_err(),
            GatewayError::NotFound
        );
        assert_eq!(
            gateway
                .delete(&id, Some(&created.admin_token))
                .await
                .unwrap_err(),
            GatewayError::NotFound
        );
    }

    #[tokio::test]
    async fn test_reconfigure_is_versioned() {
        let (gateway, _) = gateway();
        let created = gateway
            .create(create_request(ObjectKind::Poll {
                mode: PollMode::Flexible,
            }))
            .await
            .unwrap();
        let id = created.record.id;
        let admin = Some(&created.admin_token);

        let version = gateway
            .reconfigure(&id, admin, b"sealed v2".to_vec(), 1)
            .await
            .unwrap();
        assert_eq!(version, 2);

        assert!(matches!(
            gateway.reconfigure(&id, admin, b"sealed v3".to_vec(), 1).await,
            Err(GatewayError::VersionConflict { .. })
        ));
        assert_eq!(
            gateway
                .reconfigure(&id, None, b"sealed v3".to_vec(), 2)
                .await
                .unwrap_err(),
            GatewayError::Forbidden
        );
    }

    #[tokio::test]
    async fn test_expired_objects_vanish_and_purge() {
        let (gateway, clock) = gateway();
        let id = gateway
            .create(create_request(ObjectKind::Group))
            .await
            .unwrap()
            .record
            .id;

        clock.advance(Lifetime::OneHour.duration());
        assert_eq!(
            gateway.read(&id, None, None).await.unwrap_err(),
            GatewayError::NotFound
        );
        assert_eq!(gateway.purge_expired().await.unwrap(), vec![id]);
    }

    #[tokio::test]
    async fn test_burn_notes_cannot_be_watched() {
        let (gateway, _) = gateway();
        let id = gateway
            .create(create_request(ObjectKind::Note {
                burn_after_reading: true,
            }))
            .await
            .unwrap()
            .record
            .id;

        assert!(matches!(
            gateway.watch(&id, None).await,
            Err(GatewayError::Validation(_))
        ));
        // refusing to watch must not consume the note
        assert!(gateway.exists(&id).await.unwrap().exists);
    }
}
