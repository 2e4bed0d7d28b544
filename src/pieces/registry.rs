//! Piece registry and per-piece config generation.

use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::config::{ConfigEntry, ConfigFile};
use crate::pieces::piece::{BuildPiece, BuildPieceCategory, CraftingTable, RequiredItems};
use crate::pieces::PieceError;
use crate::sync::{bind_config, ConfigSync};

/// A prefab registered with the game without being added to any tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrefabRef {
    pub asset_bundle: String,
    pub prefab: String,
}

/// A prefab whose materials should be swapped for the game's own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MaterialSwap {
    pub prefab: String,
    pub is_jotunn_mock: bool,
}

/// Game shader a prefab's materials should be switched to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ShaderType {
    PieceShader,
    VegetationShader,
    RockShader,
    RugShader,
    GrassShader,
    CustomCreature,
    /// Keep the shader the prefab was authored with.
    UseUnityShader,
}

/// A prefab whose shader should be swapped for one of the game's.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShaderSwap {
    pub prefab: String,
    pub shader: ShaderType,
}

/// Config entries generated for one piece.
#[derive(Debug, Clone)]
pub struct PieceConfig {
    pub prefab: String,
    pub category: ConfigEntry<String>,
    pub crafting_station: ConfigEntry<String>,
    pub crafting_costs: ConfigEntry<String>,
}

impl PieceConfig {
    pub fn category(&self) -> BuildPieceCategory {
        self.category.value().as_str().into()
    }

    pub fn crafting_station(&self) -> CraftingTable {
        self.crafting_station.value().as_str().into()
    }

    pub fn required_items(&self) -> Result<RequiredItems, PieceError> {
        RequiredItems::parse(&self.crafting_costs.value()).map_err(|reason| {
            PieceError::InvalidCosts {
                prefab: self.prefab.clone(),
                reason,
            }
        })
    }
}

#[derive(Debug, Serialize)]
pub struct PieceRegistry {
    pieces: Vec<BuildPiece>,
    prefabs: Vec<PrefabRef>,
    material_swaps: Vec<MaterialSwap>,
    shader_swaps: Vec<ShaderSwap>,
    configuration_enabled: bool,
}

impl Default for PieceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PieceRegistry {
    pub fn new() -> Self {
        Self {
            pieces: Vec::new(),
            prefabs: Vec::new(),
            material_swaps: Vec::new(),
            shader_swaps: Vec::new(),
            configuration_enabled: true,
        }
    }

    /// Globally switch per-piece config generation on or off.
    pub fn set_configuration_enabled(&mut self, enabled: bool) {
        self.configuration_enabled = enabled;
    }

    pub fn configuration_enabled(&self) -> bool {
        self.configuration_enabled
    }

    /// Validate and store a piece.
    pub fn register(&mut self, piece: BuildPiece) -> Result<(), PieceError> {
        if piece.asset_bundle.is_empty() {
            return Err(PieceError::EmptyIdentifier { field: "asset_bundle" });
        }
        if piece.prefab.is_empty() {
            return Err(PieceError::EmptyIdentifier { field: "prefab" });
        }
        if let Some(req) = piece.required_items.iter().find(|r| r.amount == 0) {
            return Err(PieceError::InvalidAmount {
                prefab: piece.prefab.clone(),
                item: req.item.clone(),
            });
        }
        if self.pieces.iter().any(|p| p.prefab == piece.prefab) {
            return Err(PieceError::Duplicate {
                prefab: piece.prefab,
            });
        }

        tracing::debug!(
            prefab = %piece.prefab,
            bundle = %piece.asset_bundle,
            category = %piece.category.get(),
            "Piece registered"
        );
        self.pieces.push(piece);
        Ok(())
    }

    pub fn register_prefab(&mut self, asset_bundle: &str, prefab: &str) {
        self.prefabs.push(PrefabRef {
            asset_bundle: asset_bundle.to_string(),
            prefab: prefab.to_string(),
        });
    }

    pub fn register_for_material_swap(&mut self, prefab: &str, is_jotunn_mock: bool) {
        self.material_swaps.push(MaterialSwap {
            prefab: prefab.to_string(),
            is_jotunn_mock,
        });
    }

    pub fn register_for_shader_swap(&mut self, prefab: &str, shader: ShaderType) {
        self.shader_swaps.push(ShaderSwap {
            prefab: prefab.to_string(),
            shader,
        });
    }

    pub fn pieces(&self) -> &[BuildPiece] {
        &self.pieces
    }

    pub fn get(&self, prefab: &str) -> Option<&BuildPiece> {
        self.pieces.iter().find(|p| p.prefab == prefab)
    }

    pub fn prefabs(&self) -> &[PrefabRef] {
        &self.prefabs
    }

    pub fn material_swaps(&self) -> &[MaterialSwap] {
        &self.material_swaps
    }

    pub fn shader_swaps(&self) -> &[ShaderSwap] {
        &self.shader_swaps
    }

    /// Distinct custom crafting stations referenced by any piece.
    pub fn custom_stations(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.pieces
            .iter()
            .filter_map(|p| match p.crafting.get() {
                CraftingTable::Custom(name) => Some(name.clone()),
                _ => None,
            })
            .filter(|name| seen.insert(name.clone()))
            .collect()
    }

    /// Bind a config section per piece, unless generation is disabled
    /// globally or for the piece.
    ///
    /// The section is the piece's display name. Two configurable pieces
    /// sharing one is an error.
    pub fn bind_configs(
        &self,
        config: &Arc<ConfigFile>,
        sync: &ConfigSync,
    ) -> Result<Vec<PieceConfig>, PieceError> {
        if !self.configuration_enabled {
            tracing::debug!("Piece configuration disabled");
            return Ok(Vec::new());
        }

        let configurable: Vec<&BuildPiece> = self
            .pieces
            .iter()
            .filter(|p| !p.special_properties.no_config)
            .collect();

        let mut owners: HashMap<&str, &str> = HashMap::new();
        for piece in &configurable {
            if let Some(first) = owners.insert(piece.display_name(), &piece.prefab) {
                return Err(PieceError::SectionCollision {
                    section: piece.display_name().to_string(),
                    first: first.to_string(),
                    second: piece.prefab.clone(),
                });
            }
        }

        let mut bound = Vec::new();
        for piece in configurable {
            let section = piece.display_name();
            let category = bind_config(
                config,
                sync,
                section,
                "Build Table Category",
                piece.category.get().to_string(),
                "Build category where this piece appears.",
                true,
            )?;
            let crafting_station = bind_config(
                config,
                sync,
                section,
                "Crafting Station",
                piece.crafting.get().to_string(),
                "Crafting station needed to construct this piece.",
                true,
            )?;
            let crafting_costs = bind_config(
                config,
                sync,
                section,
                "Crafting Costs",
                piece.required_items.to_config_string(),
                "Item costs to build this piece. Format: item:amount:recoverable, comma separated.",
                true,
            )?;

            bound.push(PieceConfig {
                prefab: piece.prefab.clone(),
                category,
                crafting_station,
                crafting_costs,
            });
        }
        Ok(bound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigFileLocation, ConfigStore, PluginMetadata};
    use crate::pieces::piece::SpecialProperties;

    fn ward() -> BuildPiece {
        let mut piece = BuildPiece::with_folder("funward_bundle", "funward", "FunWard_BundleFolder");
        piece.name.english("Fun Ward");
        piece.required_items.add("FineWood", 20, false);
        piece.crafting.set(CraftingTable::ArtisanTable);
        piece
    }

    #[test]
    fn test_register_validates() {
        let mut registry = PieceRegistry::new();
        registry.register(ward()).unwrap();

        assert!(matches!(
            registry.register(ward()),
            Err(PieceError::Duplicate { .. })
        ));
        assert!(matches!(
            registry.register(BuildPiece::new("", "x")),
            Err(PieceError::EmptyIdentifier { field: "asset_bundle" })
        ));

        let mut free = BuildPiece::new("bamboo", "Bamboo_Wall");
        free.required_items.add("BambooLog", 0, false);
        assert!(matches!(
            registry.register(free),
            Err(PieceError::InvalidAmount { .. })
        ));
        assert_eq!(registry.pieces().len(), 1);
    }

    #[test]
    fn test_shader_swap_requests_are_recorded() {
        let mut registry = PieceRegistry::new();
        registry.register_for_shader_swap("Bamboo_Wall", ShaderType::PieceShader);
        registry.register_for_shader_swap("Bamboo_Beam_Light", ShaderType::UseUnityShader);

        assert_eq!(
            registry.shader_swaps(),
            &[
                ShaderSwap {
                    prefab: "Bamboo_Wall".into(),
                    shader: ShaderType::PieceShader,
                },
                ShaderSwap {
                    prefab: "Bamboo_Beam_Light".into(),
                    shader: ShaderType::UseUnityShader,
                },
            ]
        );
    }

    #[test]
    fn test_shared_display_name_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let meta = PluginMetadata::new("tester", "Pieces", "1.0.0");
        let file = Arc::new(ConfigFile::new(
            ConfigFileLocation::new(dir.path(), &meta.guid()),
            meta,
        ));
        file.set_save_on_set(false);
        let sync = ConfigSync::new("tester.Pieces");

        let mut registry = PieceRegistry::new();
        registry.register(ward()).unwrap();
        let mut twin = BuildPiece::new("other_bundle", "funward_large");
        twin.name.english("Fun Ward");
        registry.register(twin).unwrap();

        assert!(matches!(
            registry.bind_configs(&file, &sync),
            Err(PieceError::SectionCollision { ref first, ref second, .. })
                if first == "funward" && second == "funward_large"
        ));
        assert!(file.definitions().is_empty());

        // A hidden twin does not get a section, so it does not collide.
        let mut registry = PieceRegistry::new();
        registry.register(ward()).unwrap();
        let mut hidden = BuildPiece::new("other_bundle", "funward_large");
        hidden.name.english("Fun Ward");
        hidden.special_properties.no_config = true;
        registry.register(hidden).unwrap();
        assert_eq!(registry.bind_configs(&file, &sync).unwrap().len(), 1);
    }

    #[test]
    fn test_custom_stations_are_distinct() {
        let mut registry = PieceRegistry::new();
        for prefab in ["a", "b", "c"] {
            let mut piece = BuildPiece::new("bamboo", prefab);
            piece.crafting.set(if prefab == "c" { "Forge" } else { "CUSTOMTABLE" });
            registry.register(piece).unwrap();
        }
        assert_eq!(registry.custom_stations(), vec!["CUSTOMTABLE".to_string()]);
    }

    #[test]
    fn test_bind_configs_skips_no_config_pieces() {
        let dir = tempfile::tempdir().unwrap();
        let meta = PluginMetadata::new("tester", "Pieces", "1.0.0");
        let file = Arc::new(ConfigFile::new(
            ConfigFileLocation::new(dir.path(), &meta.guid()),
            meta,
        ));
        file.set_save_on_set(false);
        let sync = ConfigSync::new("tester.Pieces");

        let mut registry = PieceRegistry::new();
        registry.register(ward()).unwrap();
        let mut hidden = BuildPiece::new("bamboo", "Bamboo_Sapling");
        hidden.special_properties = SpecialProperties {
            admin_only: false,
            no_config: true,
        };
        registry.register(hidden).unwrap();

        let configs = registry.bind_configs(&file, &sync).unwrap();
        assert_eq!(configs.len(), 1);
        let ward_config = &configs[0];
        assert_eq!(ward_config.crafting_station(), CraftingTable::ArtisanTable);
        assert_eq!(ward_config.category(), BuildPieceCategory::Misc);
        assert_eq!(
            ward_config.required_items().unwrap().to_config_string(),
            "FineWood:20:false"
        );
        assert!(sync.is_synchronized(ward_config.crafting_costs.definition()));
        assert_eq!(
            file.description(ward_config.crafting_station.definition())
                .unwrap()
                .text,
            "Crafting station needed to construct this piece. [Synced with Server]"
        );

        ward_config.crafting_station.set("Forge".into()).unwrap();
        assert_eq!(ward_config.crafting_station(), CraftingTable::Forge);

        registry.set_configuration_enabled(false);
        assert!(registry.bind_configs(&file, &sync).unwrap().is_empty());
    }
}
