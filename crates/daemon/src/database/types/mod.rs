mod dcommitment;
mod dkind;
mod dobject_id;
mod dtimestamp;
mod duuid;

pub use dcommitment::DCommitment;
pub use dkind::DObjectKind;
pub use dobject_id::DObjectId;
pub use dtimestamp::DTimestamp;
pub use duuid::DItemId;
