//! In-memory config store mirrored to a single file.
//!
//! # Responsibilities
//! - Bind typed entries with defaults and descriptions
//! - Persist on every change while save-on-set is enabled
//! - Reload every bound value from disk
//! - Keep unbound keys found in the file (orphans) and write them back
//!
//! # Design Decisions
//! - Values are held as `toml::Value`; typing lives in `ConfigEntry<T>`
//! - Reload routes every value through the regular setter, so save-on-set
//!   fires per entry unless the caller suppresses it (see `SaveOnSetGuard`)

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tokio::sync::broadcast;

use crate::config::loader::{self, ConfigError, RenderedEntry};
use crate::config::schema::{
    short_type_name, ConfigDefinition, ConfigDescription, ConfigFileLocation, ConfigValue,
    PluginMetadata,
};
use crate::config::validation;
use crate::observability::metrics;

/// The narrow surface the reload coordinator drives.
pub trait ConfigStore: Send + Sync {
    /// Whether every individual change is persisted immediately.
    fn save_on_set(&self) -> bool;

    fn set_save_on_set(&self, enabled: bool);

    /// Replace in-memory values from disk.
    fn reload(&self) -> Result<(), ConfigError>;

    /// Persist the in-memory state.
    fn save(&self) -> Result<(), ConfigError>;
}

/// Disables save-on-set for its lifetime and restores the previous value on drop.
///
/// Restoration also happens when the guarded work fails or panics.
pub struct SaveOnSetGuard<'a> {
    store: &'a dyn ConfigStore,
    previous: bool,
}

impl<'a> SaveOnSetGuard<'a> {
    pub fn new(store: &'a dyn ConfigStore) -> Self {
        let previous = store.save_on_set();
        store.set_save_on_set(false);
        Self { store, previous }
    }

    /// The value that will be restored.
    pub fn previous(&self) -> bool {
        self.previous
    }
}

impl Drop for SaveOnSetGuard<'_> {
    fn drop(&mut self) {
        self.store.set_save_on_set(self.previous);
    }
}

/// Notifications published by a `ConfigFile`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigEvent {
    SettingChanged(ConfigDefinition),
    Reloaded,
    Saved,
}

type Normalizer = fn(&toml::Value) -> Result<toml::Value, String>;

struct EntrySlot {
    description: ConfigDescription,
    type_name: String,
    default: toml::Value,
    value: toml::Value,
    normalize: Normalizer,
}

impl EntrySlot {
    fn accept(&self, value: toml::Value) -> toml::Value {
        match &self.description.acceptable {
            Some(acceptable) => validation::clamp(acceptable, value),
            None => value,
        }
    }
}

#[derive(Default)]
struct Model {
    entries: BTreeMap<ConfigDefinition, EntrySlot>,
    orphans: BTreeMap<ConfigDefinition, toml::Value>,
}

/// Round-trip a raw value through `T` to check it has the right shape.
fn normalize_as<T: ConfigValue>(raw: &toml::Value) -> Result<toml::Value, String> {
    let typed: T = raw.clone().try_into().map_err(|e: toml::de::Error| e.to_string())?;
    toml::Value::try_from(&typed).map_err(|e| e.to_string())
}

/// A sectioned config file and its in-memory mirror.
pub struct ConfigFile {
    location: ConfigFileLocation,
    metadata: PluginMetadata,
    save_on_set: AtomicBool,
    model: RwLock<Model>,
    write_lock: Mutex<()>,
    events: broadcast::Sender<ConfigEvent>,
}

impl ConfigFile {
    /// Create an empty store. No I/O happens until `load`, `reload` or `save`.
    pub fn new(location: ConfigFileLocation, metadata: PluginMetadata) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            location,
            metadata,
            save_on_set: AtomicBool::new(true),
            model: RwLock::new(Model::default()),
            write_lock: Mutex::new(()),
            events,
        }
    }

    pub fn location(&self) -> &ConfigFileLocation {
        &self.location
    }

    pub fn metadata(&self) -> &PluginMetadata {
        &self.metadata
    }

    /// Read the file if it exists.
    pub fn load(&self) -> Result<(), ConfigError> {
        if self.location.full_path().exists() {
            self.reload()
        } else {
            Ok(())
        }
    }

    /// Subscribe to change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<ConfigEvent> {
        self.events.subscribe()
    }

    /// Bind a typed entry.
    ///
    /// A value already read from the file is adopted if it fits `T`,
    /// otherwise the default is used. Binding the same definition twice
    /// returns a handle to the existing entry.
    pub fn bind<T: ConfigValue>(
        self: &Arc<Self>,
        section: &str,
        key: &str,
        default: T,
        description: impl Into<ConfigDescription>,
    ) -> Result<ConfigEntry<T>, ConfigError> {
        let definition = ConfigDefinition::new(section, key);
        let type_name = short_type_name::<T>();
        let default_raw =
            toml::Value::try_from(&default).map_err(|e| ConfigError::Serialize {
                definition: definition.clone(),
                reason: e.to_string(),
            })?;

        let handle = ConfigEntry {
            file: Arc::clone(self),
            definition: definition.clone(),
            default,
        };

        {
            let mut model = self.write_model();
            if let Some(existing) = model.entries.get(&definition) {
                if existing.type_name != type_name {
                    return Err(ConfigError::TypeMismatch {
                        definition,
                        existing: existing.type_name.clone(),
                        requested: type_name,
                    });
                }
                return Ok(handle);
            }

            let mut slot = EntrySlot {
                description: description.into(),
                type_name,
                default: default_raw.clone(),
                value: default_raw,
                normalize: normalize_as::<T>,
            };
            if let Some(raw) = model.orphans.remove(&definition) {
                match normalize_as::<T>(&raw) {
                    Ok(value) => slot.value = slot.accept(value),
                    Err(reason) => tracing::warn!(
                        entry = %definition,
                        %reason,
                        "Stored value does not fit the entry type, using default"
                    ),
                }
            }
            tracing::debug!(entry = %definition, "Config entry bound");
            model.entries.insert(definition, slot);
        }

        if self.save_on_set() {
            self.save()?;
        }
        Ok(handle)
    }

    /// Current raw value of a bound or orphaned entry.
    pub fn raw_value(&self, definition: &ConfigDefinition) -> Option<toml::Value> {
        let model = self.read_model();
        model
            .entries
            .get(definition)
            .map(|slot| slot.value.clone())
            .or_else(|| model.orphans.get(definition).cloned())
    }

    /// Description a bound entry was registered with.
    pub fn description(&self, definition: &ConfigDefinition) -> Option<ConfigDescription> {
        self.read_model()
            .entries
            .get(definition)
            .map(|slot| slot.description.clone())
    }

    /// Definitions of all bound entries, sorted.
    pub fn definitions(&self) -> Vec<ConfigDefinition> {
        self.read_model().entries.keys().cloned().collect()
    }

    /// Definitions read from the file that nothing has bound.
    pub fn orphans(&self) -> Vec<ConfigDefinition> {
        self.read_model().orphans.keys().cloned().collect()
    }

    /// Set a raw value. Returns whether the stored value changed.
    fn set_raw(&self, definition: &ConfigDefinition, raw: toml::Value) -> Result<bool, ConfigError> {
        {
            let mut model = self.write_model();
            let Some(slot) = model.entries.get_mut(definition) else {
                return Ok(false);
            };
            let value = slot.accept(raw);
            if slot.value == value {
                return Ok(false);
            }
            slot.value = value;
        }

        let _ = self.events.send(ConfigEvent::SettingChanged(definition.clone()));
        if self.save_on_set() {
            self.save()?;
            metrics::record_save("set");
        }
        Ok(true)
    }

    fn read_model(&self) -> std::sync::RwLockReadGuard<'_, Model> {
        self.model.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_model(&self) -> std::sync::RwLockWriteGuard<'_, Model> {
        self.model.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ConfigStore for ConfigFile {
    fn save_on_set(&self) -> bool {
        self.save_on_set.load(Ordering::SeqCst)
    }

    fn set_save_on_set(&self, enabled: bool) {
        self.save_on_set.store(enabled, Ordering::SeqCst);
    }

    fn reload(&self) -> Result<(), ConfigError> {
        let path = self.location.full_path();
        let values = loader::flatten(loader::read_table(&path)?);

        let mut updates = Vec::new();
        {
            let mut model = self.write_model();
            model.orphans.clear();
            for (definition, raw) in values {
                match model.entries.get(&definition) {
                    Some(slot) => match (slot.normalize)(&raw) {
                        Ok(value) => updates.push((definition, value)),
                        Err(reason) => tracing::warn!(
                            entry = %definition,
                            %reason,
                            "Ignoring value of the wrong type"
                        ),
                    },
                    None => {
                        model.orphans.insert(definition, raw);
                    }
                }
            }
        }

        let count = updates.len();
        for (definition, value) in updates {
            self.set_raw(&definition, value)?;
        }

        let _ = self.events.send(ConfigEvent::Reloaded);
        tracing::debug!(path = %path.display(), entries = count, "Config file read");
        Ok(())
    }

    fn save(&self) -> Result<(), ConfigError> {
        let _write = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let content = {
            let model = self.read_model();
            let mut rendered: Vec<RenderedEntry<'_>> = model
                .entries
                .iter()
                .map(|(definition, slot)| RenderedEntry {
                    definition,
                    description: Some(&slot.description),
                    type_name: Some(&slot.type_name),
                    default: Some(&slot.default),
                    value: &slot.value,
                })
                .chain(model.orphans.iter().map(|(definition, value)| RenderedEntry {
                    definition,
                    description: None,
                    type_name: None,
                    default: None,
                    value,
                }))
                .collect();
            rendered.sort_by(|a, b| a.definition.cmp(b.definition));
            loader::render(&self.metadata, rendered)
        };

        loader::write_file(&self.location.full_path(), &content)?;
        let _ = self.events.send(ConfigEvent::Saved);
        Ok(())
    }
}

/// Typed handle to a bound entry.
pub struct ConfigEntry<T> {
    file: Arc<ConfigFile>,
    definition: ConfigDefinition,
    default: T,
}

impl<T: ConfigValue> ConfigEntry<T> {
    pub fn definition(&self) -> &ConfigDefinition {
        &self.definition
    }

    pub fn default_value(&self) -> &T {
        &self.default
    }

    /// Current value, or the default if the stored value no longer decodes.
    pub fn value(&self) -> T {
        self.file
            .raw_value(&self.definition)
            .and_then(|raw| raw.try_into().ok())
            .unwrap_or_else(|| self.default.clone())
    }

    /// Change the value. Persists immediately while save-on-set is enabled.
    pub fn set(&self, value: T) -> Result<(), ConfigError> {
        let raw = toml::Value::try_from(&value).map_err(|e| ConfigError::Serialize {
            definition: self.definition.clone(),
            reason: e.to_string(),
        })?;
        self.file.set_raw(&self.definition, raw)?;
        Ok(())
    }
}

impl<T: Clone> Clone for ConfigEntry<T> {
    fn clone(&self) -> Self {
        Self {
            file: Arc::clone(&self.file),
            definition: self.definition.clone(),
            default: self.default.clone(),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for ConfigEntry<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigEntry")
            .field("definition", &self.definition)
            .field("default", &self.default)
            .finish()
    }
}
