//! Config Watcher (C8): layered load/validate of the repository-set config
//! file, plus a hot-reload file watcher that diffs by repository id.

pub mod error;
pub mod loader;
pub mod watcher;

pub use error::{ConfigError, ConfigResult};
pub use loader::{default_config_path, load};
pub use watcher::{diff, watch, RepositorySetDiff};
