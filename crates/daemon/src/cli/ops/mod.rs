pub mod add_item;
pub mod create;
pub mod daemon;
pub mod delete;
pub mod delete_item;
pub mod edit_item;
pub mod exists;
pub mod expense;
pub mod health;
pub mod init;
pub mod read;
pub mod settle;
pub mod version;
pub mod watch;

pub use add_item::AddItem;
pub use create::Create;
pub use daemon::Daemon;
pub use delete::Delete;
pub use delete_item::DeleteItem;
pub use edit_item::EditItem;
pub use exists::Exists;
pub use expense::Expense;
pub use health::Health;
pub use init::Init;
pub use read::Read;
pub use settle::Settle;
pub use version::Version;
pub use watch::Watch;
