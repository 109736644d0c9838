use std::fmt::{Debug, Display};

use async_trait::async_trait;

use crate::model::{
    CreatedObject, ItemId, ItemPatch, ItemRole, ItemWrite, NewItem, NewObject, ObjectId,
    ObjectRecord, Snapshot,
};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError<T> {
    /// The backing provider failed
    #[error("unhandled record store provider error: {0}")]
    Provider(#[from] T),
    /// Missing, expired or destroyed. Never more specific than that.
    #[error("not found")]
    NotFound,
    /// The stored version moved on since the writer last read it
    #[error("version conflict: expected {expected}, current {current}")]
    VersionConflict { expected: u64, current: u64 },
    /// Identifier generation failed
    #[error("failed to generate identifiers")]
    Entropy,
}

/// Durable, TTL-bounded persistence of objects and their items.
///
/// Every write that carries an `expected_version` is a compare-and-swap:
/// implementations must compare and write atomically, and must report
/// `VersionConflict` to every writer that loses.
///
/// Implementations perform no authorization; that is the gateway's job.
/// Objects past their `expires_at` must behave exactly like objects that
/// never existed, whether or not they have been purged yet.
#[async_trait]
pub trait RecordStore: Send + Sync + Debug + Clone + 'static {
    type Error: Display + Debug + Send + Sync + 'static;

    /// Persist a new object at version 1 and mint its id and admin token
    async fn create_object(
        &self,
        new: NewObject,
    ) -> Result<CreatedObject, StoreError<Self::Error>>;

    async fn read_object(&self, id: &ObjectId) -> Result<ObjectRecord, StoreError<Self::Error>>;

    /// Read an object and all of its items consistently
    async fn snapshot(&self, id: &ObjectId) -> Result<Snapshot, StoreError<Self::Error>>;

    /// Read an object and remove it in the same atomic step.
    ///
    /// Of any number of concurrent callers at most one receives the record.
    async fn take_object(&self, id: &ObjectId) -> Result<ObjectRecord, StoreError<Self::Error>>;

    /// Replace the object structure if its version is still `expected_version`.
    /// Returns the new object version.
    async fn update_object(
        &self,
        id: &ObjectId,
        encrypted_structure: Vec<u8>,
        expected_version: u64,
    ) -> Result<u64, StoreError<Self::Error>>;

    async fn delete_object(&self, id: &ObjectId) -> Result<(), StoreError<Self::Error>>;

    /// Role of one item of a live object, without reading its payload
    async fn item_role(
        &self,
        id: &ObjectId,
        item_id: &ItemId,
    ) -> Result<ItemRole, StoreError<Self::Error>>;

    /// Add an item. Appends never conflict with each other.
    async fn append_item(
        &self,
        id: &ObjectId,
        item: NewItem,
    ) -> Result<ItemWrite, StoreError<Self::Error>>;

    /// Patch an item if its version is still `expected_version`
    async fn update_item(
        &self,
        id: &ObjectId,
        item_id: &ItemId,
        patch: ItemPatch,
        expected_version: u64,
    ) -> Result<ItemWrite, StoreError<Self::Error>>;

    /// Remove an item, optionally guarded by its version.
    /// Returns the new object version.
    async fn delete_item(
        &self,
        id: &ObjectId,
        item_id: &ItemId,
        expected_version: Option<u64>,
    ) -> Result<u64, StoreError<Self::Error>>;

    /// Physically remove every expired object, returning their ids
    async fn purge_expired(&self) -> Result<Vec<ObjectId>, StoreError<Self::Error>>;

    /// Current object version, the cheap "has anything changed" probe
    async fn version(&self, id: &ObjectId) -> Result<u64, StoreError<Self::Error>> {
        Ok(self.read_object(id).await?.version)
    }
}
