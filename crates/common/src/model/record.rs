use time::OffsetDateTime;

use super::{AdminToken, ItemFields, ItemId, ItemRole, Lifetime, ObjectId, ObjectKind};
use crate::crypto::Commitment;

/// Everything the store persists about an object.
///
/// `encrypted_structure` is opaque ciphertext. The server never interprets it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRecord {
    pub id: ObjectId,
    pub kind: ObjectKind,
    pub encrypted_structure: Vec<u8>,
    pub admin_digest: Commitment,
    pub password_digest: Option<Commitment>,
    pub version: u64,
    pub created_at: OffsetDateTime,
    pub expires_at: OffsetDateTime,
}

impl ObjectRecord {
    pub fn has_password(&self) -> bool {
        self.password_digest.is_some()
    }

    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        now >= self.expires_at
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemRecord {
    pub id: ItemId,
    pub role: ItemRole,
    pub encrypted_payload: Vec<u8>,
    pub version: u64,
    pub fields: ItemFields,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Full state of an object: the unit of every read and every push
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub object: ObjectRecord,
    /// In insertion order
    pub items: Vec<ItemRecord>,
}

impl Snapshot {
    pub fn version(&self) -> u64 {
        self.object.version
    }
}

#[derive(Debug, Clone)]
pub struct NewObject {
    pub kind: ObjectKind,
    pub encrypted_structure: Vec<u8>,
    pub lifetime: Lifetime,
    pub password_digest: Option<Commitment>,
}

/// Result of creating an object. The admin token exists in cleartext only here.
#[derive(Debug, Clone)]
pub struct CreatedObject {
    pub record: ObjectRecord,
    pub admin_token: AdminToken,
}

#[derive(Debug, Clone)]
pub struct NewItem {
    pub role: ItemRole,
    pub encrypted_payload: Vec<u8>,
    pub fields: ItemFields,
}

/// Changes to apply to an item; unset parts are left as they are
#[derive(Debug, Clone, Default)]
pub struct ItemPatch {
    pub encrypted_payload: Option<Vec<u8>>,
    pub fields: ItemFields,
}

/// Versions after an accepted item write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemWrite {
    pub item_id: ItemId,
    pub item_version: u64,
    pub object_version: u64,
}
