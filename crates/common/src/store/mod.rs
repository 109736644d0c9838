mod memory;
mod provider;

pub use memory::{MemoryRecordStore, MemoryRecordStoreError};
pub use provider::{RecordStore, StoreError};
