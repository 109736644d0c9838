use serde::{Deserialize, Serialize};
use sqlx::encode::IsNull;
use sqlx::error::BoxDynError;
use sqlx::sqlite::{SqliteTypeInfo, SqliteValueRef};
use sqlx::{Decode, Encode, Sqlite, Type};

use common::model::ObjectId;

/// Database-compatible object id, stored as lowercase hex TEXT
#[derive(Clone, Debug, Deserialize, Serialize, Eq, PartialEq, Hash)]
#[serde(transparent)]
pub struct DObjectId(ObjectId);

impl From<DObjectId> for ObjectId {
    fn from(val: DObjectId) -> Self {
        val.0
    }
}

impl From<ObjectId> for DObjectId {
    fn from(id: ObjectId) -> Self {
        Self(id)
    }
}

impl From<&ObjectId> for DObjectId {
    fn from(id: &ObjectId) -> Self {
        Self(id.clone())
    }
}

impl Decode<'_, Sqlite> for DObjectId {
    fn decode(value: SqliteValueRef<'_>) -> Result<Self, BoxDynError> {
        let s = <String as Decode<Sqlite>>::decode(value)?;
        Ok(Self(s.parse()?))
    }
}

impl<'q> Encode<'q, Sqlite> for DObjectId {
    fn encode_by_ref(
        &self,
        args: &mut <Sqlite as sqlx::Database>::ArgumentBuffer<'q>,
    ) -> Result<IsNull, BoxDynError> {
        <String as Encode<'q, Sqlite>>::encode(self.0.to_string(), args)
    }
}

impl Type<Sqlite> for DObjectId {
    fn compatible(ty: &SqliteTypeInfo) -> bool {
        <String as Type<Sqlite>>::compatible(ty)
    }

    fn type_info() -> SqliteTypeInfo {
        <String as Type<Sqlite>>::type_info()
    }
}
