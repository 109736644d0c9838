use sqlx::encode::IsNull;
use sqlx::error::BoxDynError;
use sqlx::sqlite::{SqliteTypeInfo, SqliteValueRef};
use sqlx::{Decode, Encode, Sqlite, Type};

use common::crypto::Commitment;

/// BLAKE3 commitment stored as hex TEXT
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct DCommitment(Commitment);

impl From<DCommitment> for Commitment {
    fn from(val: DCommitment) -> Self {
        val.0
    }
}

impl From<Commitment> for DCommitment {
    fn from(commitment: Commitment) -> Self {
        Self(commitment)
    }
}

impl Decode<'_, Sqlite> for DCommitment {
    fn decode(value: SqliteValueRef<'_>) -> Result<Self, BoxDynError> {
        let s = <String as Decode<Sqlite>>::decode(value)?;
        Ok(Self(s.parse()?))
    }
}

impl<'q> Encode<'q, Sqlite> for DCommitment {
    fn encode_by_ref(
        &self,
        args: &mut <Sqlite as sqlx::Database>::ArgumentBuffer<'q>,
    ) -> Result<IsNull, BoxDynError> {
        <String as Encode<'q, Sqlite>>::encode(self.0.to_hex(), args)
    }
}

impl Type<Sqlite> for DCommitment {
    fn compatible(ty: &SqliteTypeInfo) -> bool {
        <String as Type<Sqlite>>::compatible(ty)
    }

    fn type_info() -> SqliteTypeInfo {
        <String as Type<Sqlite>>::type_info()
    }
}
