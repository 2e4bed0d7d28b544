//! Config file codec: reading, flattening and rendering.
//!
//! The file is valid TOML. Every top-level table is a section, every key in
//! it an entry. Descriptions, type and default hints are written as comments
//! and ignored on read.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::schema::{ConfigDefinition, ConfigDescription, PluginMetadata};
use crate::config::validation::describe_acceptable;

/// Error type for configuration loading and persisting.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Cannot serialize value for {definition}: {reason}")]
    Serialize {
        definition: ConfigDefinition,
        reason: String,
    },

    #[error("Invalid value range: {min} to {max}")]
    InvalidRange { min: f64, max: f64 },

    #[error("Entry {definition} is already bound as {existing}, not {requested}")]
    TypeMismatch {
        definition: ConfigDefinition,
        existing: String,
        requested: String,
    },
}

/// One entry as it should appear in the rendered file.
pub struct RenderedEntry<'a> {
    pub definition: &'a ConfigDefinition,
    pub description: Option<&'a ConfigDescription>,
    pub type_name: Option<&'a str>,
    pub default: Option<&'a toml::Value>,
    pub value: &'a toml::Value,
}

/// Read and parse a config file into a TOML table.
pub fn read_table(path: &Path) -> Result<toml::Table, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_table(path, &content)
}

pub fn parse_table(path: &Path, content: &str) -> Result<toml::Table, ConfigError> {
    toml::from_str(content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Flatten a parsed table into section/key pairs.
///
/// Top-level values outside any section land in the empty section.
pub fn flatten(table: toml::Table) -> BTreeMap<ConfigDefinition, toml::Value> {
    let mut entries = BTreeMap::new();
    for (name, value) in table {
        match value {
            toml::Value::Table(section) => {
                for (key, value) in section {
                    entries.insert(ConfigDefinition::new(name.clone(), key), value);
                }
            }
            other => {
                entries.insert(ConfigDefinition::new("", name), other);
            }
        }
    }
    entries
}

/// Render a whole config file. Entries must be sorted by definition.
pub fn render<'a>(
    metadata: &PluginMetadata,
    entries: impl IntoIterator<Item = RenderedEntry<'a>>,
) -> String {
    let mut out = format!(
        "## Settings file was created by plugin {} v{}\n## Plugin GUID: {}\n",
        metadata.name,
        metadata.version,
        metadata.guid()
    );

    let mut current_section: Option<&str> = None;
    for entry in entries {
        let section = entry.definition.section.as_str();
        if current_section != Some(section) {
            if !section.is_empty() {
                out.push_str(&format!("\n[{}]\n", format_key(section)));
            }
            current_section = Some(section);
        }

        out.push('\n');
        if let Some(description) = entry.description {
            for line in description.text.lines() {
                out.push_str(&format!("## {line}\n"));
            }
        }
        if let Some(type_name) = entry.type_name {
            out.push_str(&format!("# Setting type: {type_name}\n"));
        }
        if let Some(default) = entry.default {
            out.push_str(&format!("# Default value: {}\n", inline_value(default)));
        }
        if let Some(acceptable) = entry.description.and_then(|d| d.acceptable.as_ref()) {
            out.push_str(&format!("# {}\n", describe_acceptable(acceptable)));
        }
        out.push_str(&format!(
            "{} = {}\n",
            format_key(&entry.definition.key),
            inline_value(entry.value)
        ));
    }
    out
}

/// Write rendered content, creating the directory if needed.
pub fn write_file(path: &Path, content: &str) -> Result<(), ConfigError> {
    let io_err = |source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
    }
    fs::write(path, content).map_err(io_err)
}

/// Bare keys stay bare, everything else is quoted.
pub fn format_key(key: &str) -> String {
    let bare = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if bare {
        key.to_string()
    } else {
        quote(key)
    }
}

/// Render a value as TOML on a single line.
///
/// The `toml` serializer writes text with line breaks as a `"""` block,
/// which would spill out of the `#` comment lines.
pub fn inline_value(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => quote(s),
        toml::Value::Array(items) => {
            let items: Vec<String> = items.iter().map(inline_value).collect();
            format!("[{}]", items.join(", "))
        }
        toml::Value::Table(table) => {
            let pairs: Vec<String> = table
                .iter()
                .map(|(k, v)| format!("{} = {}", format_key(k), inline_value(v)))
                .collect();
            if pairs.is_empty() {
                "{}".to_string()
            } else {
                format!("{{ {} }}", pairs.join(", "))
            }
        }
        other => other.to_string(),
    }
}

/// Basic TOML string with every control character escaped.
fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\u{:04X}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::AcceptableValues;

    fn meta() -> PluginMetadata {
        PluginMetadata::new("{azumatt}", "PieceManagerModTemplate", "1.0.0")
    }

    #[test]
    fn test_format_key() {
        assert_eq!(format_key("Speed"), "Speed");
        assert_eq!(format_key("max_items-2"), "max_items-2");
        assert_eq!(format_key("Lock Configuration"), "\"Lock Configuration\"");
        assert_eq!(format_key("1 - General"), "\"1 - General\"");
    }

    #[test]
    fn test_render_layout() {
        let def = ConfigDefinition::new("1 - General", "Lock Configuration");
        let desc = ConfigDescription::new("Locks things. [Synced with Server]")
            .with_acceptable(AcceptableValues::list(&["Off", "On"]));
        let value = toml::Value::String("On".into());

        let content = render(
            &meta(),
            vec![RenderedEntry {
                definition: &def,
                description: Some(&desc),
                type_name: Some("Toggle"),
                default: Some(&value),
                value: &value,
            }],
        );

        assert!(content.starts_with(
            "## Settings file was created by plugin PieceManagerModTemplate v1.0.0\n"
        ));
        assert!(content.contains("## Plugin GUID: {azumatt}.PieceManagerModTemplate\n"));
        assert!(content.contains("[\"1 - General\"]\n"));
        assert!(content.contains("## Locks things. [Synced with Server]\n"));
        assert!(content.contains("# Setting type: Toggle\n"));
        assert!(content.contains("# Default value: \"On\"\n"));
        assert!(content.contains("# Acceptable values: \"Off\", \"On\"\n"));
        assert!(content.contains("\"Lock Configuration\" = \"On\"\n"));
    }

    #[test]
    fn test_rendered_file_parses_back() {
        let a = ConfigDefinition::new("", "Loose");
        let b = ConfigDefinition::new("1 - General", "Speed");
        let c = ConfigDefinition::new("2 - Pieces", "Name");
        let loose = toml::Value::Boolean(true);
        let speed = toml::Value::Integer(3);
        let name = toml::Value::String("Fun Ward".into());
        let entries = vec![
            RenderedEntry { definition: &a, description: None, type_name: None, default: None, value: &loose },
            RenderedEntry { definition: &b, description: None, type_name: None, default: None, value: &speed },
            RenderedEntry { definition: &c, description: None, type_name: None, default: None, value: &name },
        ];

        let content = render(&meta(), entries);
        let flat = flatten(parse_table(Path::new("test.cfg"), &content).unwrap());

        assert_eq!(flat.len(), 3);
        assert_eq!(flat[&a], loose);
        assert_eq!(flat[&b], speed);
        assert_eq!(flat[&c], name);
    }

    #[test]
    fn test_inline_value_stays_on_one_line() {
        let text = toml::Value::String("line one\nline \"two\"\t\\".into());
        assert_eq!(inline_value(&text), r#""line one\nline \"two\"\t\\""#);

        let list = toml::Value::Array(vec![toml::Value::Integer(1), text.clone()]);
        assert!(!inline_value(&list).contains('\n'));
        assert_eq!(format_key("a\nb"), r#""a\nb""#);

        let parsed: toml::Table = toml::from_str(&format!("v = {}", inline_value(&list))).unwrap();
        assert_eq!(parsed["v"], list);
    }

    #[test]
    fn test_multiline_default_keeps_file_parseable() {
        let def = ConfigDefinition::new("General", "Motd");
        let motd = toml::Value::String("line one\nline two".into());
        let desc = ConfigDescription::new("Message of the day")
            .with_acceptable(AcceptableValues::List(vec![motd.clone()]));

        let content = render(
            &meta(),
            vec![RenderedEntry {
                definition: &def,
                description: Some(&desc),
                type_name: Some("String"),
                default: Some(&motd),
                value: &motd,
            }],
        );

        assert!(content.contains("# Default value: \"line one\\nline two\"\n"));
        let flat = flatten(parse_table(Path::new("motd.cfg"), &content).unwrap());
        assert_eq!(flat[&def], motd);
    }

    #[test]
    fn test_malformed_content_is_parse_error() {
        let err = parse_table(Path::new("bad.cfg"), "[[[ not toml").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
