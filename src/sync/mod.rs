//! Server-to-client config synchronization contract.
//!
//! # Responsibilities
//! - Record which entries are replicated from the server
//! - Decide whether an entry may be changed locally (locking entry)
//! - Check client/server version compatibility
//! - Produce the payload a server would replicate
//!
//! # Design Decisions
//! - The wire protocol is not implemented here; only its inputs are
//! - Entries are synchronized unless explicitly opted out

use dashmap::DashMap;
use std::cmp::Ordering as CmpOrdering;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use crate::config::{
    ConfigDefinition, ConfigDescription, ConfigEntry, ConfigError, ConfigFile, ConfigValue, Toggle,
};

/// Description suffix for entries replicated from the server.
pub const SYNCED_SUFFIX: &str = " [Synced with Server]";
/// Description suffix for local-only entries.
pub const NOT_SYNCED_SUFFIX: &str = " [Not Synced with Server]";

/// Append the sync marker to a description.
pub fn describe_synced(text: &str, synchronized: bool) -> String {
    let suffix = if synchronized {
        SYNCED_SUFFIX
    } else {
        NOT_SYNCED_SUFFIX
    };
    format!("{text}{suffix}")
}

/// Bind an entry, mark its description with the sync suffix and register it
/// for synchronization.
///
/// Acceptable values and attributes of `description` are kept as given.
pub fn bind_config<T: ConfigValue>(
    config: &Arc<ConfigFile>,
    sync: &ConfigSync,
    section: &str,
    key: &str,
    value: T,
    description: impl Into<ConfigDescription>,
    synchronized: bool,
) -> Result<ConfigEntry<T>, ConfigError> {
    let mut description = description.into();
    description.text = describe_synced(&description.text, synchronized);
    let entry = config.bind(section, key, value, description)?;
    sync.add_config_entry(&entry).set_synchronized(synchronized);
    Ok(entry)
}

/// Which side of the connection this process is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncRole {
    Server,
    Client,
}

/// Values that can act as the lock switch.
pub trait LockingValue {
    fn is_locking(&self) -> bool;
}

impl LockingValue for Toggle {
    fn is_locking(&self) -> bool {
        self.is_on()
    }
}

impl LockingValue for bool {
    fn is_locking(&self) -> bool {
        *self
    }
}

/// Handle recording whether an entry participates in sync.
pub struct SyncedConfigEntry<T> {
    entry: ConfigEntry<T>,
    synchronized: Arc<AtomicBool>,
}

impl<T: ConfigValue> SyncedConfigEntry<T> {
    pub fn entry(&self) -> &ConfigEntry<T> {
        &self.entry
    }

    pub fn synchronized(&self) -> bool {
        self.synchronized.load(Ordering::SeqCst)
    }

    pub fn set_synchronized(&self, synchronized: bool) {
        self.synchronized.store(synchronized, Ordering::SeqCst);
    }
}

type Snapshot = Box<dyn Fn() -> Option<toml::Value> + Send + Sync>;
type LockCheck = Box<dyn Fn() -> bool + Send + Sync>;

struct SyncedSlot {
    synchronized: Arc<AtomicBool>,
    snapshot: Snapshot,
}

/// Registry of synchronized config entries for one plugin.
pub struct ConfigSync {
    guid: String,
    display_name: String,
    current_version: String,
    minimum_required_version: String,
    role: RwLock<SyncRole>,
    entries: DashMap<ConfigDefinition, SyncedSlot>,
    locking: RwLock<Option<LockCheck>>,
}

impl ConfigSync {
    pub fn new(guid: impl Into<String>) -> Self {
        let guid = guid.into();
        Self {
            display_name: guid.clone(),
            guid,
            current_version: String::new(),
            minimum_required_version: String::new(),
            role: RwLock::new(SyncRole::Server),
            entries: DashMap::new(),
            locking: RwLock::new(None),
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    pub fn with_current_version(mut self, version: impl Into<String>) -> Self {
        self.current_version = version.into();
        self
    }

    pub fn with_minimum_required_version(mut self, version: impl Into<String>) -> Self {
        self.minimum_required_version = version.into();
        self
    }

    pub fn guid(&self) -> &str {
        &self.guid
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn current_version(&self) -> &str {
        &self.current_version
    }

    pub fn role(&self) -> SyncRole {
        *self.role.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_role(&self, role: SyncRole) {
        *self.role.write().unwrap_or_else(PoisonError::into_inner) = role;
    }

    /// Register an entry. Registering twice shares the synchronized flag.
    pub fn add_config_entry<T: ConfigValue>(&self, entry: &ConfigEntry<T>) -> SyncedConfigEntry<T> {
        let definition = entry.definition().clone();
        let synchronized = self
            .entries
            .entry(definition.clone())
            .or_insert_with(|| {
                let source = entry.clone();
                SyncedSlot {
                    synchronized: Arc::new(AtomicBool::new(true)),
                    snapshot: Box::new(move || toml::Value::try_from(source.value()).ok()),
                }
            })
            .synchronized
            .clone();

        tracing::debug!(entry = %definition, "Config entry registered for sync");
        SyncedConfigEntry {
            entry: entry.clone(),
            synchronized,
        }
    }

    /// Register the entry that locks synchronized settings for non-admins.
    pub fn add_locking_config_entry<T: ConfigValue + LockingValue>(
        &self,
        entry: &ConfigEntry<T>,
    ) -> SyncedConfigEntry<T> {
        let synced = self.add_config_entry(entry);
        let source = entry.clone();
        *self.locking.write().unwrap_or_else(PoisonError::into_inner) =
            Some(Box::new(move || source.value().is_locking()));
        synced
    }

    pub fn is_locked(&self) -> bool {
        self.locking
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|check| check())
            .unwrap_or(false)
    }

    pub fn is_synchronized(&self, definition: &ConfigDefinition) -> bool {
        self.entries
            .get(definition)
            .map(|slot| slot.synchronized.load(Ordering::SeqCst))
            .unwrap_or(false)
    }

    /// Whether a local change to `definition` is allowed.
    ///
    /// The server always may. A client may change local-only entries, and
    /// synchronized ones only while unlocked or when it is an admin.
    pub fn can_modify(&self, definition: &ConfigDefinition, is_admin: bool) -> bool {
        match self.role() {
            SyncRole::Server => true,
            SyncRole::Client => {
                !self.is_synchronized(definition) || !self.is_locked() || is_admin
            }
        }
    }

    /// Whether a peer running `remote_version` may connect.
    pub fn accepts_version(&self, remote_version: &str) -> bool {
        if self.minimum_required_version.is_empty() {
            return true;
        }
        compare_versions(remote_version, &self.minimum_required_version) != CmpOrdering::Less
    }

    /// Current values of all synchronized entries, grouped by section.
    pub fn synced_values(&self) -> serde_json::Value {
        let mut sections = serde_json::Map::new();
        for slot in self.entries.iter() {
            if !slot.synchronized.load(Ordering::SeqCst) {
                continue;
            }
            let Some(value) = (slot.snapshot)().and_then(|v| serde_json::to_value(v).ok()) else {
                continue;
            };
            let definition = slot.key();
            let section = sections
                .entry(definition.section.clone())
                .or_insert_with(|| serde_json::Value::Object(serde_json::Map::new()));
            if let serde_json::Value::Object(keys) = section {
                keys.insert(definition.key.clone(), value);
            }
        }
        serde_json::Value::Object(sections)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Compare dotted numeric versions; missing parts count as zero and
/// non-numeric parts as zero.
pub fn compare_versions(a: &str, b: &str) -> CmpOrdering {
    let parse = |v: &str| -> Vec<u64> {
        v.trim()
            .split('.')
            .map(|part| part.trim().parse().unwrap_or(0))
            .collect()
    };
    let (a, b) = (parse(a), parse(b));
    let len = a.len().max(b.len());
    for i in 0..len {
        let ord = a.get(i).unwrap_or(&0).cmp(b.get(i).unwrap_or(&0));
        if ord != CmpOrdering::Equal {
            return ord;
        }
    }
    CmpOrdering::Equal
}
