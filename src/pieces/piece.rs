//! Declarative building-piece definitions.
//!
//! A `BuildPiece` only records what the mod declares; turning it into a
//! placeable object is the game's business.

use serde::Serialize;
use std::fmt;

use crate::localization::LocalizedText;

/// Folder assets are loaded from when none is given.
pub const DEFAULT_ASSET_FOLDER: &str = "assets";
/// Maximum distance to the station for an extension when none is given.
pub const DEFAULT_MAX_STATION_DISTANCE: f32 = 5.0;
/// Light intensity used for icon snapshots when none is given.
pub const DEFAULT_SNAPSHOT_LIGHT_INTENSITY: f32 = 1.3;

/// Build menu tab a piece appears in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum BuildPieceCategory {
    Misc,
    Crafting,
    BuildingWorkbench,
    BuildingStonecutter,
    Furniture,
    All,
    Custom(String),
}

impl From<&str> for BuildPieceCategory {
    fn from(name: &str) -> Self {
        match name {
            "Misc" => Self::Misc,
            "Crafting" => Self::Crafting,
            "BuildingWorkbench" => Self::BuildingWorkbench,
            "BuildingStonecutter" => Self::BuildingStonecutter,
            "Furniture" => Self::Furniture,
            "All" => Self::All,
            other => Self::Custom(other.to_string()),
        }
    }
}

impl fmt::Display for BuildPieceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Custom(name) => f.write_str(name),
            other => write!(f, "{other:?}"),
        }
    }
}

/// Crafting station a piece requires nearby.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum CraftingTable {
    None,
    Workbench,
    Cauldron,
    Forge,
    ArtisanTable,
    StoneCutter,
    MageTable,
    BlackForge,
    Custom(String),
}

impl From<&str> for CraftingTable {
    fn from(name: &str) -> Self {
        match name {
            "None" => Self::None,
            "Workbench" => Self::Workbench,
            "Cauldron" => Self::Cauldron,
            "Forge" => Self::Forge,
            "ArtisanTable" => Self::ArtisanTable,
            "StoneCutter" => Self::StoneCutter,
            "MageTable" => Self::MageTable,
            "BlackForge" => Self::BlackForge,
            other => Self::Custom(other.to_string()),
        }
    }
}

impl fmt::Display for CraftingTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Custom(name) => f.write_str(name),
            other => write!(f, "{other:?}"),
        }
    }
}

/// One material needed to build a piece.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Requirement {
    pub item: String,
    pub amount: u32,
    pub recoverable: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RequiredItems {
    items: Vec<Requirement>,
}

impl RequiredItems {
    pub fn add(&mut self, item: &str, amount: u32, recoverable: bool) -> &mut Self {
        self.items.push(Requirement {
            item: item.to_string(),
            amount,
            recoverable,
        });
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &Requirement> {
        self.items.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// `item:amount:recoverable` pairs separated by commas.
    pub fn to_config_string(&self) -> String {
        self.items
            .iter()
            .map(|r| format!("{}:{}:{}", r.item, r.amount, r.recoverable))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Parse the form written by `to_config_string`.
    ///
    /// Amount defaults to 1 and recoverable to true when omitted.
    pub fn parse(value: &str) -> Result<Self, String> {
        let mut items = Self::default();
        for part in value.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let mut fields = part.split(':').map(str::trim);
            let item = fields.next().unwrap_or_default();
            if item.is_empty() {
                return Err(format!("missing item name in '{part}'"));
            }
            let amount = match fields.next() {
                Some(raw) => raw
                    .parse()
                    .map_err(|_| format!("invalid amount '{raw}' for {item}"))?,
                None => 1,
            };
            let recoverable = match fields.next() {
                Some(raw) => raw
                    .parse()
                    .map_err(|_| format!("invalid recoverable flag '{raw}' for {item}"))?,
                None => true,
            };
            items.add(item, amount, recoverable);
        }
        Ok(items)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CategorySetting(BuildPieceCategory);

impl CategorySetting {
    pub fn set(&mut self, category: impl Into<BuildPieceCategory>) {
        self.0 = category.into();
    }

    pub fn get(&self) -> &BuildPieceCategory {
        &self.0
    }
}

impl Default for CategorySetting {
    fn default() -> Self {
        Self(BuildPieceCategory::Misc)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CraftingSetting(CraftingTable);

impl CraftingSetting {
    pub fn set(&mut self, station: impl Into<CraftingTable>) {
        self.0 = station.into();
    }

    pub fn get(&self) -> &CraftingTable {
        &self.0
    }
}

impl Default for CraftingSetting {
    fn default() -> Self {
        Self(CraftingTable::None)
    }
}

/// Makes the piece an extension of a crafting station.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationExtension {
    pub station: CraftingTable,
    pub max_station_distance: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ExtensionSetting(Option<StationExtension>);

impl ExtensionSetting {
    pub fn set(&mut self, station: impl Into<CraftingTable>, max_station_distance: f32) {
        self.0 = Some(StationExtension {
            station: station.into(),
            max_station_distance,
        });
    }

    pub fn set_default_distance(&mut self, station: impl Into<CraftingTable>) {
        self.set(station, DEFAULT_MAX_STATION_DISTANCE);
    }

    pub fn get(&self) -> Option<&StationExtension> {
        self.0.as_ref()
    }
}

/// Items carrying the piece table the piece is added to, e.g. `Cultivator`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Tools(Vec<String>);

impl Tools {
    pub fn add(&mut self, item: &str) -> &mut Self {
        self.0.push(item.to_string());
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SpecialProperties {
    /// Only visible to admins.
    pub admin_only: bool,
    /// No config section is generated for this piece.
    pub no_config: bool,
}

/// Icon snapshot request. Rendering happens in the game.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotRequest {
    pub light_intensity: f32,
    pub camera_rotation: Option<[f32; 4]>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BuildPiece {
    pub asset_bundle: String,
    pub prefab: String,
    pub folder: String,
    pub name: LocalizedText,
    pub description: LocalizedText,
    pub required_items: RequiredItems,
    pub category: CategorySetting,
    pub crafting: CraftingSetting,
    pub extension: ExtensionSetting,
    pub tool: Tools,
    pub special_properties: SpecialProperties,
    pub snapshot: Option<SnapshotRequest>,
}

impl BuildPiece {
    /// Piece loaded from the default `assets` folder.
    pub fn new(asset_bundle: &str, prefab: &str) -> Self {
        Self::with_folder(asset_bundle, prefab, DEFAULT_ASSET_FOLDER)
    }

    pub fn with_folder(asset_bundle: &str, prefab: &str, folder: &str) -> Self {
        Self {
            asset_bundle: asset_bundle.to_string(),
            prefab: prefab.to_string(),
            folder: folder.to_string(),
            name: LocalizedText::default(),
            description: LocalizedText::default(),
            required_items: RequiredItems::default(),
            category: CategorySetting::default(),
            crafting: CraftingSetting::default(),
            extension: ExtensionSetting::default(),
            tool: Tools::default(),
            special_properties: SpecialProperties::default(),
            snapshot: None,
        }
    }

    /// Ask the game to render an icon with default lighting.
    pub fn snapshot(&mut self) {
        self.snapshot_with(DEFAULT_SNAPSHOT_LIGHT_INTENSITY, None);
    }

    pub fn snapshot_with(&mut self, light_intensity: f32, camera_rotation: Option<[f32; 4]>) {
        self.snapshot = Some(SnapshotRequest {
            light_intensity,
            camera_rotation,
        });
    }

    /// English name, or the prefab id if none was given.
    pub fn display_name(&self) -> &str {
        self.name.get("English").unwrap_or(self.prefab.as_str())
    }
}
