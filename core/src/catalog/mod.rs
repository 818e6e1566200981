//! Catalog files
//!
//! Boss templates and reward pools are configured in TOML. The loaders turn
//! the serde file types from `bossfall-types` into runtime catalogs,
//! repairing or skipping bad entries with a warning instead of failing the
//! whole file. [`CatalogWatcher`] reports when either file changes so the
//! engine can swap in a fresh snapshot.

mod error;
mod loader;
mod watcher;

pub use error::CatalogError;
pub use loader::{load_rewards, load_templates, parse_rewards, parse_templates};
pub use watcher::{CatalogEvent, CatalogWatcher};
