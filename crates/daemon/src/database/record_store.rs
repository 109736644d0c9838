use async_trait::async_trait;
use sqlx::SqliteConnection;
use time::OffsetDateTime;

use common::crypto::Commitment;
use common::model::{
    AdminToken, CreatedObject, ItemFields, ItemId, ItemPatch, ItemRecord, ItemRole, ItemWrite,
    NewItem, NewObject, ObjectId, ObjectRecord, Snapshot,
};
use common::store::{RecordStore, StoreError};

use crate::database::types::{DCommitment, DItemId, DObjectId, DObjectKind, DTimestamp};
use crate::database::Database;

type Result<T> = std::result::Result<T, StoreError<sqlx::Error>>;

#[derive(Debug, sqlx::FromRow)]
struct ObjectRow {
    id: DObjectId,
    kind: DObjectKind,
    encrypted_structure: Vec<u8>,
    admin_digest: DCommitment,
    password_digest: Option<DCommitment>,
    version: i64,
    created_at: DTimestamp,
    expires_at: DTimestamp,
}

impl From<ObjectRow> for ObjectRecord {
    fn from(row: ObjectRow) -> Self {
        ObjectRecord {
            id: row.id.into(),
            kind: row.kind.into(),
            encrypted_structure: row.encrypted_structure,
            admin_digest: row.admin_digest.into(),
            password_digest: row.password_digest.map(Commitment::from),
            version: row.version as u64,
            created_at: row.created_at.into(),
            expires_at: row.expires_at.into(),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ItemRow {
    id: DItemId,
    role: String,
    encrypted_payload: Vec<u8>,
    version: i64,
    completed: Option<bool>,
    claimed: Option<bool>,
    position: Option<i64>,
    created_at: DTimestamp,
    updated_at: DTimestamp,
}

impl TryFrom<ItemRow> for ItemRecord {
    type Error = sqlx::Error;

    fn try_from(row: ItemRow) -> std::result::Result<Self, Self::Error> {
        let role = row
            .role
            .parse()
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
        let position = row
            .position
            .map(u32::try_from)
            .transpose()
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;

        Ok(ItemRecord {
            id: row.id.into(),
            role,
            encrypted_payload: row.encrypted_payload,
            version: row.version as u64,
            fields: ItemFields {
                completed: row.completed,
                claimed: row.claimed,
                position,
            },
            created_at: row.created_at.into(),
            updated_at: row.updated_at.into(),
        })
    }
}

async fn live_object(
    conn: &mut SqliteConnection,
    id: &ObjectId,
    now: OffsetDateTime,
) -> std::result::Result<Option<ObjectRow>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT id, kind, encrypted_structure, admin_digest, password_digest,
               version, created_at, expires_at
        FROM objects
        WHERE id = ? AND expires_at > ?
        "#,
    )
    .bind(DObjectId::from(id))
    .bind(DTimestamp::from(now))
    .fetch_optional(conn)
    .await
}

async fn items_of(
    conn: &mut SqliteConnection,
    id: &ObjectId,
) -> std::result::Result<Vec<ItemRecord>, sqlx::Error> {
    let rows: Vec<ItemRow> = sqlx::query_as(
        r#"
        SELECT id, role, encrypted_payload, version, completed, claimed, position,
               created_at, updated_at
        FROM items
        WHERE object_id = ?
        ORDER BY rowid ASC
        "#,
    )
    .bind(DObjectId::from(id))
    .fetch_all(conn)
    .await?;

    rows.into_iter().map(ItemRecord::try_from).collect()
}

/// Bump the object version if the object is live. Always the first write of a
/// mutating transaction, so the transaction holds the write lock from here on.
async fn bump_object_version(
    conn: &mut SqliteConnection,
    id: &ObjectId,
    now: OffsetDateTime,
) -> std::result::Result<Option<i64>, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        UPDATE objects
        SET version = version + 1
        WHERE id = ? AND expires_at > ?
        RETURNING version
        "#,
    )
    .bind(DObjectId::from(id))
    .bind(DTimestamp::from(now))
    .fetch_optional(conn)
    .await
}

async fn current_item_version(
    conn: &mut SqliteConnection,
    id: &ObjectId,
    item_id: &ItemId,
) -> std::result::Result<Option<i64>, sqlx::Error> {
    sqlx::query_scalar("SELECT version FROM items WHERE object_id = ? AND id = ?")
        .bind(DObjectId::from(id))
        .bind(DItemId::from(*item_id))
        .fetch_optional(conn)
        .await
}

/// Turn a missed conditional write into the right error
fn missed_write(expected: u64, current: Option<i64>) -> StoreError<sqlx::Error> {
    match current {
        Some(current) => StoreError::VersionConflict {
            expected,
            current: current as u64,
        },
        None => StoreError::NotFound,
    }
}

#[async_trait]
impl RecordStore for Database {
    type Error = sqlx::Error;

    async fn create_object(&self, new: NewObject) -> Result<CreatedObject> {
        let now = self.clock.now();
        let id = ObjectId::generate().map_err(|_| StoreError::Entropy)?;
        let admin_token = AdminToken::generate().map_err(|_| StoreError::Entropy)?;

        let record = ObjectRecord {
            id,
            kind: new.kind,
            encrypted_structure: new.encrypted_structure,
            admin_digest: Commitment::of(admin_token.as_bytes()),
            password_digest: new.password_digest,
            version: 1,
            created_at: now,
            expires_at: now + new.lifetime.duration(),
        };

        sqlx::query(
            r#"
            INSERT INTO objects (id, kind, encrypted_structure, admin_digest, password_digest,
                                 version, created_at, expires_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(DObjectId::from(&record.id))
        .bind(DObjectKind::from(record.kind))
        .bind(record.encrypted_structure.as_slice())
        .bind(DCommitment::from(record.admin_digest))
        .bind(record.password_digest.map(DCommitment::from))
        .bind(record.version as i64)
        .bind(DTimestamp::from(record.created_at))
        .bind(DTimestamp::from(record.expires_at))
        .execute(&self.pool)
        .await?;

        Ok(CreatedObject {
            record,
            admin_token,
        })
    }

    async fn read_object(&self, id: &ObjectId) -> Result<ObjectRecord> {
        let now = self.clock.now();
        let mut conn = self.pool.acquire().await?;
        live_object(&mut conn, id, now)
            .await?
            .map(ObjectRecord::from)
            .ok_or(StoreError::NotFound)
    }

    async fn snapshot(&self, id: &ObjectId) -> Result<Snapshot> {
        let now = self.clock.now();
        let mut tx = self.pool.begin().await?;

        let object = live_object(&mut tx, id, now)
            .await?
            .map(ObjectRecord::from)
            .ok_or(StoreError::NotFound)?;
        let items = items_of(&mut tx, id).await?;
        tx.commit().await?;

        Ok(Snapshot { object, items })
    }

    async fn take_object(&self, id: &ObjectId) -> Result<ObjectRecord> {
        let now = self.clock.now();
        let row: Option<ObjectRow> = sqlx::query_as(
            r#"
            DELETE FROM objects
            WHERE id = ? AND expires_at > ?
            RETURNING id, kind, encrypted_structure, admin_digest, password_digest,
                      version, created_at, expires_at
            "#,
        )
        .bind(DObjectId::from(id))
        .bind(DTimestamp::from(now))
        .fetch_optional(&self.pool)
        .await?;

        row.map(ObjectRecord::from).ok_or(StoreError::NotFound)
    }

    async fn update_object(
        &self,
        id: &ObjectId,
        encrypted_structure: Vec<u8>,
        expected_version: u64,
    ) -> Result<u64> {
        let now = self.clock.now();
        let mut tx = self.pool.begin().await?;

        let updated: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE objects
            SET encrypted_structure = ?, version = version + 1
            WHERE id = ? AND expires_at > ? AND version = ?
            RETURNING version
            "#,
        )
        .bind(encrypted_structure)
        .bind(DObjectId::from(id))
        .bind(DTimestamp::from(now))
        .bind(expected_version as i64)
        .fetch_optional(&mut *tx)
        .await?;

        match updated {
            Some(version) => {
                tx.commit().await?;
                Ok(version as u64)
            }
            None => {
                let current = live_object(&mut tx, id, now).await?.map(|o| o.version);
                Err(missed_write(expected_version, current))
            }
        }
    }

    async fn delete_object(&self, id: &ObjectId) -> Result<()> {
        let now = self.clock.now();
        let result = sqlx::query("DELETE FROM objects WHERE id = ? AND expires_at > ?")
            .bind(DObjectId::from(id))
            .bind(DTimestamp::from(now))
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn item_role(&self, id: &ObjectId, item_id: &ItemId) -> Result<ItemRole> {
        let now = self.clock.now();
        let role: Option<String> = sqlx::query_scalar(
            r#"
            SELECT items.role
            FROM items
            JOIN objects ON objects.id = items.object_id
            WHERE items.object_id = ? AND items.id = ? AND objects.expires_at > ?
            "#,
        )
        .bind(DObjectId::from(id))
        .bind(DItemId::from(*item_id))
        .bind(DTimestamp::from(now))
        .fetch_optional(&self.pool)
        .await?;

        let role = role.ok_or(StoreError::NotFound)?;
        role.parse()
            .map_err(|e| StoreError::Provider(sqlx::Error::Decode(Box::new(e))))
    }

    async fn append_item(&self, id: &ObjectId, item: NewItem) -> Result<ItemWrite> {
        let now = self.clock.now();
        let mut tx = self.pool.begin().await?;

        let object_version = bump_object_version(&mut tx, id, now)
            .await?
            .ok_or(StoreError::NotFound)?;

        let item_id = ItemId::generate();
        sqlx::query(
            r#"
            INSERT INTO items (object_id, id, role, encrypted_payload, version,
                               completed, claimed, position, created_at, updated_at)
            VALUES (?, ?, ?, ?, 1, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(DObjectId::from(id))
        .bind(DItemId::from(item_id))
        .bind(item.role.as_str())
        .bind(item.encrypted_payload)
        .bind(item.fields.completed)
        .bind(item.fields.claimed)
        .bind(item.fields.position.map(i64::from))
        .bind(DTimestamp::from(now))
        .bind(DTimestamp::from(now))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(ItemWrite {
            item_id,
            item_version: 1,
            object_version: object_version as u64,
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
        let mut tx = self.pool.begin().await?;

        let object_version = bump_object_version(&mut tx, id, now)
            .await?
            .ok_or(StoreError::NotFound)?;

        let updated: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE items
            SET encrypted_payload = COALESCE(?, encrypted_payload),
                completed = COALESCE(?, completed),
                claimed = COALESCE(?, claimed),
                position = COALESCE(?, position),
                version = version + 1,
                updated_at = ?
            WHERE object_id = ? AND id = ? AND version = ?
            RETURNING version
            "#,
        )
        .bind(patch.encrypted_payload)
        .bind(patch.fields.completed)
        .bind(patch.fields.claimed)
        .bind(patch.fields.position.map(i64::from))
        .bind(DTimestamp::from(now))
        .bind(DObjectId::from(id))
        .bind(DItemId::from(*item_id))
        .bind(expected_version as i64)
        .fetch_optional(&mut *tx)
        .await?;

        match updated {
            Some(item_version) => {
                tx.commit().await?;
                Ok(ItemWrite {
                    item_id: *item_id,
                    item_version: item_version as u64,
                    object_version: object_version as u64,
                })
            }
            // dropping the transaction rolls back the object version bump
            None => {
                let current = current_item_version(&mut tx, id, item_id).await?;
                Err(missed_write(expected_version, current))
            }
        }
    }

    async fn delete_item(
        &self,
        id: &ObjectId,
        item_id: &ItemId,
        expected_version: Option<u64>,
    ) -> Result<u64> {
        let now = self.clock.now();
        let mut tx = self.pool.begin().await?;

        let object_version = bump_object_version(&mut tx, id, now)
            .await?
            .ok_or(StoreError::NotFound)?;

        let expected = expected_version.map(|v| v as i64);
        let result = sqlx::query(
            r#"
            DELETE FROM items
            WHERE object_id = ? AND id = ? AND (? IS NULL OR version = ?)
            "#,
        )
        .bind(DObjectId::from(id))
        .bind(DItemId::from(*item_id))
        .bind(expected)
        .bind(expected)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            let current = current_item_version(&mut tx, id, item_id).await?;
            return Err(missed_write(expected_version.unwrap_or_default(), current));
        }

        tx.commit().await?;
        Ok(object_version as u64)
    }

    async fn purge_expired(&self) -> Result<Vec<ObjectId>> {
        let now = self.clock.now();
        let ids: Vec<DObjectId> =
            sqlx::query_scalar("DELETE FROM objects WHERE expires_at <= ? RETURNING id")
                .bind(DTimestamp::from(now))
                .fetch_all(&self.pool)
                .await?;

        Ok(ids.into_iter().map(ObjectId::from).collect())
    }

    async fn version(&self, id: &ObjectId) -> Result<u64> {
        let now = self.clock.now();
        let version: Option<i64> =
            sqlx::query_scalar("SELECT version FROM objects WHERE id = ? AND expires_at > ?")
                .bind(DObjectId::from(id))
                .bind(DTimestamp::from(now))
                .fetch_optional(&self.pool)
                .await?;

        version.map(|v| v as u64).ok_or(StoreError::NotFound)
    }
}
