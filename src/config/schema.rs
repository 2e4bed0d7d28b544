//! Configuration schema definitions.
//!
//! Identifiers and metadata shared by the config store, the file codec and
//! the reload coordinator.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::loader::ConfigError;

/// Values that can be bound to a config entry.
///
/// Anything serde can map onto a TOML value qualifies.
pub trait ConfigValue:
    Serialize + DeserializeOwned + Clone + PartialEq + Send + Sync + 'static
{
}

impl<T> ConfigValue for T where
    T: Serialize + DeserializeOwned + Clone + PartialEq + Send + Sync + 'static
{
}

/// Identity of the plugin that owns a config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginMetadata {
    pub author: String,
    pub name: String,
    pub version: String,
}

impl PluginMetadata {
    pub fn new(author: impl Into<String>, name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            name: name.into(),
            version: version.into(),
        }
    }

    /// Globally unique plugin id, `<author>.<name>`.
    pub fn guid(&self) -> String {
        format!("{}.{}", self.author, self.name)
    }
}

/// Location of the single config file a plugin owns.
///
/// Derived once from the config root; immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigFileLocation {
    directory: PathBuf,
    file_name: String,
}

impl ConfigFileLocation {
    /// `<root>/<guid>.cfg`
    pub fn new(config_root: impl AsRef<Path>, guid: &str) -> Self {
        Self {
            directory: config_root.as_ref().to_path_buf(),
            file_name: format!("{guid}.cfg"),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn full_path(&self) -> PathBuf {
        self.directory.join(&self.file_name)
    }
}

/// Section and key of a single entry.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConfigDefinition {
    pub section: String,
    pub key: String,
}

impl ConfigDefinition {
    pub fn new(section: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            section: section.into(),
            key: key.into(),
        }
    }
}

impl fmt::Display for ConfigDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.section, self.key)
    }
}

/// Restriction on the values an entry accepts.
#[derive(Debug, Clone, PartialEq)]
pub enum AcceptableValues {
    /// Value must be one of the listed values.
    List(Vec<toml::Value>),
    /// Numeric value clamped into `min..=max`.
    Range { min: f64, max: f64 },
}

impl AcceptableValues {
    /// Build a list restriction from anything serializable.
    pub fn list<T: Serialize>(values: &[T]) -> Self {
        Self::List(
            values
                .iter()
                .filter_map(|v| toml::Value::try_from(v).ok())
                .collect(),
        )
    }

    /// Build a range restriction. Bounds must be ordered and not NaN.
    pub fn range(min: f64, max: f64) -> Result<Self, ConfigError> {
        if min.is_nan() || max.is_nan() || min > max {
            return Err(ConfigError::InvalidRange { min, max });
        }
        Ok(Self::Range { min, max })
    }
}

/// Display hints for an in-game configuration manager.
///
/// Kept in memory only; the file never carries them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigAttributes {
    /// Sort position inside the section, higher first.
    pub order: Option<i32>,
    /// Whether the entry is shown at all.
    pub browsable: Option<bool>,
    /// Overrides the section name the manager groups the entry under.
    pub category: Option<String>,
}

/// Human-readable description attached to an entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigDescription {
    pub text: String,
    pub acceptable: Option<AcceptableValues>,
    pub attributes: Option<ConfigAttributes>,
}

impl ConfigDescription {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            acceptable: None,
            attributes: None,
        }
    }

    pub fn with_acceptable(mut self, acceptable: AcceptableValues) -> Self {
        self.acceptable = Some(acceptable);
        self
    }

    pub fn with_attributes(mut self, attributes: ConfigAttributes) -> Self {
        self.attributes = Some(attributes);
        self
    }
}

impl From<&str> for ConfigDescription {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for ConfigDescription {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

/// On/off switch stored as `"On"` / `"Off"` in the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Toggle {
    On,
    Off,
}

impl Toggle {
    pub fn is_on(self) -> bool {
        self == Toggle::On
    }

    pub fn acceptable_values() -> AcceptableValues {
        AcceptableValues::list(&[Toggle::Off, Toggle::On])
    }
}

impl From<bool> for Toggle {
    fn from(on: bool) -> Self {
        if on { Toggle::On } else { Toggle::Off }
    }
}

/// Strip module paths from a Rust type name, keeping generics readable.
///
/// `alloc::vec::Vec<alloc::string::String>` becomes `Vec<String>`.
pub(crate) fn short_type_name<T: ?Sized>() -> String {
    let full = std::any::type_name::<T>();
    let mut out = String::with_capacity(full.len());
    let mut token = String::new();
    for c in full.chars() {
        if c.is_alphanumeric() || c == '_' || c == ':' {
            token.push(c);
        } else {
            out.push_str(token.rsplit("::").next().unwrap_or_default());
            token.clear();
            out.push(c);
        }
    }
    out.push_str(token.rsplit("::").next().unwrap_or_default());
    out
}
