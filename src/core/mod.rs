pub mod aggregation;
pub mod manager;
pub mod matcher;
pub mod status;
pub mod sync_command;
pub mod synchronized_item;
pub mod synchronized_items;
pub mod updater;

pub use aggregation::aggregate;
pub use manager::SynchronizedDirectoriesManager;
pub use matcher::SynchronizedItemMatcher;
pub use status::{Status, StatusKind};
pub use sync_command::{action, CommandAction, SyncCommand, SyncContext};
pub use synchronized_item::SynchronizedItem;
pub use synchronized_items::{Side, SynchronizedItems};
pub use updater::SynchronizedItemsStatusAndCommandsUpdater;
