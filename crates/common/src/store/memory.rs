use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use time::OffsetDateTime;

use super::provider::{RecordStore, StoreError};
use crate::clock::{SharedClock, SystemClock};
use crate::crypto::Commitment;
use crate::model::{
    AdminToken, CreatedObject, ItemId, ItemPatch, ItemRecord, ItemRole, ItemWrite, NewItem,
    NewObject, ObjectId, ObjectRecord, Snapshot,
};

/// In-memory record store.
///
/// A single `RwLock` guards all state, so every compare-and-swap runs
/// under one write guard.
#[derive(Debug, Clone)]
pub struct MemoryRecordStore {
    inner: Arc<RwLock<MemoryRecordStoreInner>>,
    clock: SharedClock,
}

#[derive(Debug, Default)]
struct MemoryRecordStoreInner {
    objects: HashMap<ObjectId, StoredObject>,
}

#[derive(Debug)]
struct StoredObject {
    record: ObjectRecord,
    /// Insertion order is the snapshot order
    items: Vec<ItemRecord>,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MemoryRecordStoreError {
    #[error("memory provider error: {0}")]
    Internal(String),
}

type Result<T> = std::result::Result<T, StoreError<MemoryRecordStoreError>>;

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: SharedClock) -> Self {
        Self {
            inner: Arc::new(RwLock::new(MemoryRecordStoreInner::default())),
            clock,
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryRecordStoreInner>> {
        self.inner.read().map_err(|e| {
            StoreError::Provider(MemoryRecordStoreError::Internal(format!(
                "failed to acquire read lock: {}",
                e
            )))
        })
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryRecordStoreInner>> {
        self.inner.write().map_err(|e| {
            StoreError::Provider(MemoryRecordStoreError::Internal(format!(
                "failed to acquire write lock: {}",
                e
            )))
        })
    }
}

impl Default for MemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRecordStoreInner {
    fn live(&self, id: &ObjectId, now: OffsetDateTime) -> Result<&StoredObject> {
        self.objects
            .get(id)
            .filter(|o| !o.record.is_expired_at(now))
            .ok_or(StoreError::NotFound)
    }

    fn live_mut(&mut self, id: &ObjectId, now: OffsetDateTime) -> Result<&mut StoredObject> {
        self.objects
            .get_mut(id)
            .filter(|o| !o.record.is_expired_at(now))
            .ok_or(StoreError::NotFound)
    }
}

fn check_version(expected: u64, current: u64) -> Result<()> {
    if expected == current {
        Ok(())
    } else {
        Err(StoreError::VersionConflict { expected, current })
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    type Error = MemoryRecordStoreError;

    async fn create_object(&self, new: NewObject) -> Result<CreatedObject> {
        let now = self.clock.now();
        let id = ObjectId::generate().map_err(|_| StoreError::Entropy)?;
        let admin_token = AdminToken::generate().map_err(|_| StoreError::Entropy)?;

        let record = ObjectRecord {
            id: id.clone(),
            kind: new.kind,
            encrypted_structure: new.encrypted_structure,
            admin_digest: Commitment::of(admin_token.as_bytes()),
            password_digest: new.password_digest,
            version: 1,
            created_at: now,
            expires_at: now + new.lifetime.duration(),
        };

        let mut inner = self.write()?;
        inner.objects.insert(
            id,
            StoredObject {
                record: record.clone(),
                items: Vec::new(),
            },
        );

        Ok(CreatedObject {
            record,
            admin_token,
        })
    }

    async fn read_object(&self, id: &ObjectId) -> Result<ObjectRecord> {
        let now = self.clock.now();
        let inner = self.read()?;
        Ok(inner.live(id, now)?.record.clone())
    }

    async fn snapshot(&self, id: &ObjectId) -> Result<Snapshot> {
        let now = self.clock.now();
        let inner = self.read()?;
        let stored = inner.live(id, now)?;
        Ok(Snapshot {
            object: stored.record.clone(),
            items: stored.items.clone(),
        })
    }

    async fn take_object(&self, id: &ObjectId) -> Result<ObjectRecord> {
        let now = self.clock.now();
        let mut inner = self.write()?;
        inner.live(id, now)?;
        inner
            .objects
            .remove(id)
            .map(|stored| stored.record)
            .ok_or(StoreError::NotFound)
    }

    async fn update_object(
        &self,
        id: &ObjectId,
        encrypted_structure: Vec<u8>,
        expected_version: u64,
    ) -> Result<u64> {
        let now = self.clock.now();
        let mut inner = self.write()?;
        let stored = inner.live_mut(id, now)?;

        check_version(expected_version, stored.record.version)?;
        stored.record.encrypted_structure = encrypted_structure;
        stored.record.version += 1;
        Ok(stored.record.version)
    }

    async fn delete_object(&self, id: &ObjectId) -> Result<()> {
        let now = self.clock.now();
        let mut inner = self.write()?;
        inner.live(id, now)?;
        inner.objects.remove(id);
        Ok(())
    }

    async fn item_role(&self, id: &ObjectId, item_id: &ItemId) -> Result<ItemRole> {
        let now = self.clock.now();
        let inner = self.read()?;
        inner
            .live(id, now)?
            .items
            .iter()
            .find(|i| &i.id == item_id)
            .map(|i| i.role)
            .ok_or(StoreError::NotFound)
    }

    async fn append_item(&self, id: &ObjectId, item: NewItem) -> Result<ItemWrite> {
        let now = self.clock.now();
        let mut inner = self.write()?;
        let stored = inner.live_mut(id, now)?;

        let item_id = ItemId::generate();
        stored.items.push(ItemRecord {
            id: item_id,
            role: item.role,
            encrypted_payload: item.encrypted_payload,
            version: 1,
            fields: item.fields,
            created_at: now,
            updated_at: now,
        });
        stored.record.version += 1;

        Ok(ItemWrite {
            item_id,
            item_version: 1,
            object_version: stored.record.version,
        })
    }

    async fn update_item(
        &self,
        id: &ObjectId,
        item_id: &ItemId,
        patch: ItemPatch,
        expected_version: u64,
    ) -> Result<ItemWrite> {
        let now = self.clock.now();
        let mut inner = self.write()?;
        let stored = inner.live_mut(id, now)?;

        let item = stored
            .items
            .iter_mut()
            .find(|i| &i.id == item_id)
            .ok_or(StoreError::NotFound)?;
        check_version(expected_version, item.version)?;

        if let Some(payload) = patch.encrypted_payload {
            item.encrypted_payload = payload;
        }
        if let Some(completed) = patch.fields.completed {
            item.fields.completed = Some(completed);
        }
        if let Some(claimed) = patch.fields.claimed {
            item.fields.claimed = Some(claimed);
        }
        if let Some(position) = patch.fields.position {
            item.fields.position = Some(position);
        }
        item.version += 1;
        item.updated_at = now;
        let item_version = item.version;

        stored.record.version += 1;

        Ok(ItemWrite {
            item_id: *item_id,
            item_version,
            object_version: stored.record.version,
        })
    }

    async fn delete_item(
        &self,
        id: &ObjectId,
        item_id: &ItemId,
        expected_version: Option<u64>,
    ) -> Result<u64> {
        let now = self.clock.now();
        let mut inner = self.write()?;
        let stored = inner.live_mut(id, now)?;

        let index = stored
            .items
            .iter()
            .position(|i| &i.id == item_id)
            .ok_or(StoreError::NotFound)?;
        if let Some(expected) = expected_version {
            check_version(expected, stored.items[index].version)?;
        }

        stored.items.remove(index);
        stored.record.version += 1;
        Ok(stored.record.version)
    }

    async fn purge_expired(&self) -> Result<Vec<ObjectId>> {
        let now = self.clock.now();
        let mut inner = self.write()?;

        let expired: Vec<ObjectId> = inner
            .objects
            .values()
            .filter(|o| o.record.is_expired_at(now))
            .map(|o| o.record.id.clone())
            .collect();
        for id in &expired {
            inner.objects.remove(id);
        }

        Ok(expired)
    }
}
