pub mod args;
pub mod op;
pub mod ops;
pub mod payload;

pub use ops::{
    AddItem, Create, Daemon, Delete, DeleteItem, EditItem, Exists, Expense, Health, Init, Read,
    Settle, Version, Watch,
};
