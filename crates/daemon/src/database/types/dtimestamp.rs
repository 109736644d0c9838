use sqlx::encode::IsNull;
use sqlx::error::BoxDynError;
use sqlx::sqlite::{SqliteTypeInfo, SqliteValueRef};
use sqlx::{Decode, Encode, Sqlite, Type};
use time::OffsetDateTime;

/// UTC timestamp stored as INTEGER unix seconds.
///
/// Integer storage keeps `expires_at > ?` comparisons exact and index friendly.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub struct DTimestamp(OffsetDateTime);

impl From<DTimestamp> for OffsetDateTime {
    fn from(val: DTimestamp) -> Self {
        val.0
    }
}

impl From<OffsetDateTime> for DTimestamp {
    fn from(at: OffsetDateTime) -> Self {
        Self(at)
    }
}

impl Decode<'_, Sqlite> for DTimestamp {
    fn decode(value: SqliteValueRef<'_>) -> Result<Self, BoxDynError> {
        let secs = <i64 as Decode<Sqlite>>::decode(value)?;
        Ok(Self(OffsetDateTime::from_unix_timestamp(secs)?))
    }
}

impl<'q> Encode<'q, Sqlite> for DTimestamp {
    fn encode_by_ref(
        &self,
        args: &mut <Sqlite as sqlx::Database>::ArgumentBuffer<'q>,
    ) -> Result<IsNull, BoxDynError> {
        <i64 as Encode<'q, Sqlite>>::encode(self.0.unix_timestamp(), args)
    }
}

impl Type<Sqlite> for DTimestamp {
    fn compatible(ty: &SqliteTypeInfo) -> bool {
        <i64 as Type<Sqlite>>::compatible(ty)
    }

    fn type_info() -> SqliteTypeInfo {
        <i64 as Type<Sqlite>>::type_info()
    }
}
