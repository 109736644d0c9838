use sqlx::encode::IsNull;
use sqlx::error::BoxDynError;
use sqlx::sqlite::{SqliteTypeInfo, SqliteValueRef};
use sqlx::{Decode, Encode, Sqlite, Type};

use common::model::ObjectKind;

/// Object kind stored as its tagged JSON form, e.g. `{"type":"list","preset":"potluck"}`
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct DObjectKind(ObjectKind);

impl From<DObjectKind> for ObjectKind {
    fn from(val: DObjectKind) -> Self {
        val.0
    }
}

impl From<ObjectKind> for DObjectKind {
    fn from(kind: ObjectKind) -> Self {
        Self(kind)
    }
}

impl Decode<'_, Sqlite> for DObjectKind {
    fn decode(value: SqliteValueRef<'_>) -> Result<Self, BoxDynError> {
        let s = <String as Decode<Sqlite>>::decode(value)?;
        Ok(Self(serde_json::from_str(&s)?))
    }
}

impl<'q> Encode<'q, Sqlite> for DObjectKind {
    fn encode_by_ref(
        &self,
        args: &mut <Sqlite as sqlx::Database>::ArgumentBuffer<'q>,
    ) -> Result<IsNull, BoxDynError> {
        let json = serde_json::to_string(&self.0)?;
        <String as Encode<'q, Sqlite>>::encode(json, args)
    }
}

impl Type<Sqlite> for DObjectKind {
    fn compatible(ty: &SqliteTypeInfo) -> bool {
        <String as Type<Sqlite>>::compatible(ty)
    }

    fn type_info() -> SqliteTypeInfo {
        <String as Type<Sqlite>>::type_info()
    }
}
