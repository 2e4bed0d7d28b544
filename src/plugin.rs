//! The plugin and its process-wide context.
//!
//! # Lifecycle
//! ```text
//! host loads plugin → PluginContext::awake
//!     suppress save-on-set
//!     → localization, config entries, locking entry
//!     → piece declarations
//!     → start config watcher
//!     → save once, restore save-on-set
//! host frames      → PluginContext::pump (queued file notifications)
//! host unloads     → PluginContext::on_destroy (flush once, release watch)
//! ```

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::config::watcher::DEFAULT_DEBOUNCE;
use crate::config::{
    ConfigDescription, ConfigEntry, ConfigError, ConfigFile, ConfigFileLocation,
    ConfigReloadCoordinator, ConfigStore, NotificationQueue, PluginMetadata, ReloadOutcome,
    SaveOnSetGuard, Toggle, WatchError,
};
use crate::localization::Localizer;
use crate::pieces::{
    BuildPiece, BuildPieceCategory, CraftingTable, PieceConfig, PieceError, PieceRegistry,
    SpecialProperties,
};
use crate::sync::{bind_config, ConfigSync, SyncRole};

pub const MOD_NAME: &str = "PieceManagerModTemplate";
pub const MOD_VERSION: &str = "1.0.0";
pub const AUTHOR: &str = "{azumatt}";

/// Errors surfaced to the host's plugin-load failure path.
#[derive(Debug, Error)]
pub enum PluginError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Watch(#[from] WatchError),

    #[error(transparent)]
    Piece(#[from] PieceError),
}

/// What the host tells the plugin at load time.
#[derive(Debug, Clone)]
pub struct PluginOptions {
    /// Directory holding every plugin's config file.
    pub config_root: PathBuf,
    pub debounce: Duration,
    pub role: SyncRole,
}

impl PluginOptions {
    pub fn new(config_root: impl Into<PathBuf>) -> Self {
        Self {
            config_root: config_root.into(),
            debounce: DEFAULT_DEBOUNCE,
            role: SyncRole::Server,
        }
    }
}

pub fn metadata() -> PluginMetadata {
    PluginMetadata::new(AUTHOR, MOD_NAME, MOD_VERSION)
}

/// The building pieces this mod ships.
pub fn register_example_pieces(registry: &mut PieceRegistry) -> Result<(), PieceError> {
    let mut fun_ward = BuildPiece::with_folder("funward_bundle", "funward", "FunWard_BundleFolder");
    fun_ward.name.english("Fun Ward");
    fun_ward.description.english("Ward For testing the Piece Manager");
    fun_ward
        .required_items
        .add("FineWood", 20, false)
        .add("SurtlingCore", 20, false);
    fun_ward.category.set(BuildPieceCategory::Misc);
    fun_ward.crafting.set(CraftingTable::ArtisanTable);
    fun_ward.special_properties = SpecialProperties {
        admin_only: true,
        no_config: true,
    };
    registry.register(fun_ward)?;

    let mut wall = BuildPiece::new("bamboo", "Bamboo_Wall");
    wall.name.english("Bamboo Wall");
    wall.description.english("A wall made of bamboo!");
    wall.required_items.add("BambooLog", 20, false);
    wall.category.set(BuildPieceCategory::BuildingWorkbench);
    wall.crafting.set("CUSTOMTABLE");
    wall.special_properties.admin_only = true;
    registry.register(wall)?;

    let mut sapling = BuildPiece::new("bamboo", "Bamboo_Sapling");
    sapling.name.english("Bamboo Sapling");
    sapling.description.english("A young bamboo tree, called a sapling");
    sapling.required_items.add("BambooSeed", 20, false);
    sapling.tool.add("Cultivator");
    sapling.special_properties.no_config = true;
    sapling.snapshot();
    registry.register(sapling)?;

    let mut light = BuildPiece::new("bamboo", "Bamboo_Beam_Light");
    light.name.english("Bamboo Beam Light");
    light.description.english("A light made of bamboo!");
    light.required_items.add("BambooLog", 20, false);
    light.category.set("Custom Category");
    light.crafting.set("CUSTOMTABLE");
    light.tool.add("Custom Hammer");
    light.special_properties.no_config = true;
    light.snapshot();
    registry.register(light)?;

    registry.register_prefab("bamboo", "Bamboo_Beam_Light");
    registry.register_for_material_swap("Bamboo_Sapling", false);
    Ok(())
}

/// Everything the plugin owns, constructed once per process.
pub struct PluginContext {
    metadata: PluginMetadata,
    config: Arc<ConfigFile>,
    sync: Arc<ConfigSync>,
    pieces: PieceRegistry,
    piece_configs: Vec<PieceConfig>,
    localizer: Localizer,
    coordinator: Arc<ConfigReloadCoordinator>,
    server_config_locked: ConfigEntry<Toggle>,
    notifications: Option<NotificationQueue>,
    destroyed: AtomicBool,
}

impl PluginContext {
    /// Build the plugin. A missing config directory is fatal.
    pub fn awake(options: PluginOptions) -> Result<Self, PluginError> {
        let metadata = metadata();
        let guid = metadata.guid();
        let location = ConfigFileLocation::new(&options.config_root, &guid);
        let config = Arc::new(ConfigFile::new(location.clone(), metadata.clone()));
        config.load()?;

        let suppressed = SaveOnSetGuard::new(&*config);

        let localizer = Localizer::new();
        localizer.load();

        let sync = ConfigSync::new(guid.clone())
            .with_display_name(MOD_NAME)
            .with_current_version(MOD_VERSION)
            .with_minimum_required_version(MOD_VERSION);
        sync.set_role(options.role);

        let server_config_locked = bind_config(
            &config,
            &sync,
            "1 - General",
            "Lock Configuration",
            Toggle::On,
            ConfigDescription::new(
                "If on, the configuration is locked and can be changed by server admins only.",
            )
            .with_acceptable(Toggle::acceptable_values()),
            true,
        )?;
        sync.add_locking_config_entry(&server_config_locked);

        let mut pieces = PieceRegistry::new();
        pieces.set_configuration_enabled(false);
        register_example_pieces(&mut pieces)?;
        let piece_configs = pieces.bind_configs(&config, &sync)?;

        let store: Arc<dyn ConfigStore> = config.clone();
        let coordinator = Arc::new(
            ConfigReloadCoordinator::new(location, store).with_debounce(options.debounce),
        );
        let notifications = coordinator.start()?;

        config.save()?;
        drop(suppressed);

        tracing::info!(
            guid = %guid,
            version = MOD_VERSION,
            pieces = pieces.pieces().len(),
            path = %config.location().full_path().display(),
            "Plugin loaded"
        );

        Ok(Self {
            metadata,
            config,
            sync: Arc::new(sync),
            pieces,
            piece_configs,
            localizer,
            coordinator,
            server_config_locked,
            notifications: Some(notifications),
            destroyed: AtomicBool::new(false),
        })
    }

    pub fn metadata(&self) -> &PluginMetadata {
        &self.metadata
    }

    pub fn config(&self) -> &Arc<ConfigFile> {
        &self.config
    }

    pub fn sync(&self) -> &Arc<ConfigSync> {
        &self.sync
    }

    pub fn pieces(&self) -> &PieceRegistry {
        &self.pieces
    }

    pub fn piece_configs(&self) -> &[PieceConfig] {
        &self.piece_configs
    }

    pub fn localizer(&self) -> &Localizer {
        &self.localizer
    }

    pub fn coordinator(&self) -> &Arc<ConfigReloadCoordinator> {
        &self.coordinator
    }

    pub fn server_config_locked(&self) -> &ConfigEntry<Toggle> {
        &self.server_config_locked
    }

    /// Hand the notification queue to an async consumer.
    ///
    /// After this, `pump` has nothing left to process.
    pub fn take_notifications(&mut self) -> Option<NotificationQueue> {
        self.notifications.take()
    }

    /// Process queued file notifications on the caller's thread.
    pub fn pump(&mut self) -> Vec<ReloadOutcome> {
        match self.notifications.as_mut() {
            Some(queue) => self.coordinator.drain(queue),
            None => Vec::new(),
        }
    }

    /// Flush config once and release the watch. Later calls do nothing.
    pub fn on_destroy(&self) {
        if self.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Err(e) = self.coordinator.shutdown() {
            tracing::error!(error = %e, "Config not saved on unload");
        }
        self.coordinator.stop();
        tracing::info!(guid = %self.metadata.guid(), "Plugin unloaded");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_example_pieces() {
        let mut registry = PieceRegistry::new();
        register_example_pieces(&mut registry).unwrap();

        assert_eq!(registry.pieces().len(), 4);
        let ward = registry.get("funward").unwrap();
        assert!(ward.special_properties.admin_only);
        assert!(ward.special_properties.no_config);
        assert_eq!(ward.folder, "FunWard_BundleFolder");
        assert_eq!(registry.get("Bamboo_Wall").unwrap().folder, "assets");
        assert!(registry.get("Bamboo_Sapling").unwrap().snapshot.is_some());
        assert_eq!(registry.custom_stations(), vec!["CUSTOMTABLE".to_string()]);
        assert_eq!(registry.prefabs().len(), 1);
        assert_eq!(registry.material_swaps().len(), 1);
    }
}
