//! Building-piece mod template with hot-reloaded, server-synced configuration.

pub mod config;
pub mod lifecycle;
pub mod localization;
pub mod observability;
pub mod pieces;
pub mod plugin;
pub mod sync;

pub use config::{ConfigFile, ConfigReloadCoordinator};
pub use lifecycle::Shutdown;
pub use plugin::{PluginContext, PluginError, PluginOptions};
