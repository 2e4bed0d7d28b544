//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! <author>.<plugin>.cfg (sectioned TOML)
//!     → loader.rs (parse & flatten into section/key pairs)
//!     → validation.rs (acceptable values, clamping)
//!     → store.rs (typed entries, save-on-set, change events)
//!
//! On file change:
//!     watcher.rs receives a notify event
//!     → debounce window check
//!     → guarded cycle: suppress save-on-set → reload → save → restore
//! ```
//!
//! # Design Decisions
//! - One file per plugin, fully rewritten on every save
//! - Keys the plugin never bound are kept and written back
//! - Reload replaces every bound value from disk, no merging

pub mod loader;
pub mod schema;
pub mod store;
pub mod validation;
pub mod watcher;

pub use loader::ConfigError;
pub use schema::{
    AcceptableValues, ConfigAttributes, ConfigDefinition, ConfigDescription, ConfigFileLocation,
    ConfigValue, PluginMetadata, Toggle,
};
pub use store::{ConfigEntry, ConfigEvent, ConfigFile, ConfigStore, SaveOnSetGuard};
pub use watcher::{
    ConfigReloadCoordinator, CoordinatorState, NotificationQueue, ReloadOutcome, WatchError,
};
