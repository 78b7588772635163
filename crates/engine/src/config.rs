use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::asset_keys::validate_asset_key;
use crate::bake::BakeConfig;
use crate::tiles::TilesetDescriptor;
use crate::world::{
    BehaviorTuning, CollisionMap, Footprint, InteractableZone, SessionSetup, StaticNpc, Vec2,
    WalkableGrid,
};

pub const DEFAULT_INTERACTION_DISTANCE: f32 = 24.0;
pub const DEFAULT_PLAYER_SPEED: f32 = 1.5;
pub const DEFAULT_NPC_PROXIMITY: f32 = 48.0;
pub const DEFAULT_HEART_TICKS: u32 = 180;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("parse config {path}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("parse config {path} at {json_path}: {message}")]
    ParseAt {
        path: PathBuf,
        json_path: String,
        message: String,
    },
    #[error("validation failed in {path} at {field}: {message}")]
    Invalid {
        path: PathBuf,
        field: String,
        message: String,
    },
}

/// `assets/config/scene.json`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SceneConfig {
    /// Asset key of the TMX map, resolved to `assets/<key>.tmx`.
    pub map: String,
    pub tilesets: Vec<TilesetDescriptor>,
    #[serde(default)]
    pub bake: BakeConfig,
    /// One string per map row, `'1'` walkable and `'0'` blocked.
    pub walkable: Vec<String>,
    #[serde(default)]
    pub interactables: Vec<InteractableZone>,
    #[serde(default = "default_interaction_distance")]
    pub interaction_distance: f32,
    pub player: PlayerConfig,
    #[serde(default)]
    pub static_npc: Option<StaticNpcConfig>,
    #[serde(default)]
    pub wanderers: Vec<WandererConfig>,
    #[serde(default)]
    pub behavior: BehaviorTuning,
    /// Fixed seed for the wanderer RNG; entropy when absent.
    #[serde(default)]
    pub rng_seed: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PlayerConfig {
    /// Top-left of the collision box, in pixels.
    pub start: [f32; 2],
    #[serde(default = "default_player_speed")]
    pub speed: f32,
    pub sprite: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StaticNpcConfig {
    pub name: String,
    /// `[col, row]` of the cell the character stands on.
    pub tile: [u32; 2],
    pub sprite: String,
    #[serde(default = "default_npc_proximity")]
    pub proximity: f32,
    #[serde(default = "default_heart_ticks")]
    pub heart_ticks: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WandererConfig {
    pub name: String,
    /// `[col, row]` of the spawn cell; the box's top-left sits on the cell's corner.
    pub tile: [u32; 2],
    pub sprite: String,
}

fn default_interaction_distance() -> f32 {
    DEFAULT_INTERACTION_DISTANCE
}

fn default_player_speed() -> f32 {
    DEFAULT_PLAYER_SPEED
}

fn default_npc_proximity() -> f32 {
    DEFAULT_NPC_PROXIMITY
}

fn default_heart_ticks() -> u32 {
    DEFAULT_HEART_TICKS
}

pub fn load_scene_config(path: &Path) -> Result<SceneConfig, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_scene_config(&raw, path)
}

/// Parses and validates; `path` is only used in error messages.
pub fn parse_scene_config(raw: &str, path: &Path) -> Result<SceneConfig, ConfigError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    let config = match serde_path_to_error::deserialize::<_, SceneConfig>(&mut deserializer) {
        Ok(config) => config,
        Err(error) => {
            let json_path = error.path().to_string();
            let message = error.into_inner().to_string();
            return Err(if json_path.is_empty() || json_path == "." {
                ConfigError::Parse {
                    path: path.to_path_buf(),
                    message,
                }
            } else {
                ConfigError::ParseAt {
                    path: path.to_path_buf(),
                    json_path,
                    message,
                }
            });
        }
    };

    config
        .validate()
        .map_err(|(field, message)| ConfigError::Invalid {
            path: path.to_path_buf(),
            field,
            message,
        })?;
    Ok(config)
}

type Invalid = (String, String);

fn invalid(field: impl Into<String>, message: impl Into<String>) -> Invalid {
    (field.into(), message.into())
}

fn expected_actual(
    field: impl Into<String>,
    expected: &str,
    actual: impl std::fmt::Display,
) -> Invalid {
    invalid(field, format!("expected {expected}, got {actual}"))
}

fn check_key(field: impl Into<String>, key: &str) -> Result<(), Invalid> {
    validate_asset_key(key).map_err(|error| invalid(field, error.to_string()))
}

fn check_positive(field: &str, value: f32) -> Result<(), Invalid> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(expected_actual(field, "finite number > 0", value))
    }
}

impl SceneConfig {
    fn validate(&self) -> Result<(), Invalid> {
        check_key("map", &self.map)?;
        check_key("bake.output_dir", &self.bake.output_dir)?;

        if self.tilesets.is_empty() {
            return Err(invalid("tilesets", "at least one tileset is required"));
        }
        for (index, tileset) in self.tilesets.iter().enumerate() {
            check_key(format!("tilesets[{index}].image"), &tileset.image)?;
            if tileset.columns == 0 {
                return Err(expected_actual(
                    format!("tilesets[{index}].columns"),
                    "at least 1",
                    tileset.columns,
                ));
            }
        }

        WalkableGrid::from_rows(&self.walkable)
            .map_err(|error| invalid("walkable", error.to_string()))?;

        let mut ids = HashSet::with_capacity(self.interactables.len());
        for (index, zone) in self.interactables.iter().enumerate() {
            if zone.id.is_empty() {
                return Err(invalid(format!("interactables[{index}].id"), "must not be empty"));
            }
            if !ids.insert(zone.id.as_str()) {
                return Err(invalid(
                    format!("interactables[{index}].id"),
                    format!("duplicate id '{}'", zone.id),
                ));
            }
            if zone.width == 0 || zone.height == 0 {
                return Err(invalid(
                    format!("interactables[{index}]"),
                    "width and height must be at least 1",
                ));
            }
        }

        check_positive("interaction_distance", self.interaction_distance)?;
        check_positive("player.speed", self.player.speed)?;
        if !self.player.start.iter().all(|value| value.is_finite()) {
            return Err(invalid("player.start", "coordinates must be finite"));
        }
        check_key("player.sprite", &self.player.sprite)?;

        if let Some(npc) = &self.static_npc {
            check_key("static_npc.sprite", &npc.sprite)?;
            check_positive("static_npc.proximity", npc.proximity)?;
        }
        for (index, wanderer) in self.wanderers.iter().enumerate() {
            if wanderer.name.is_empty() {
                return Err(invalid(format!("wanderers[{index}].name"), "must not be empty"));
            }
            check_key(format!("wanderers[{index}].sprite"), &wanderer.sprite)?;
        }

        let behavior = &self.behavior;
        for (field, chance) in [
            ("behavior.walk_chance", behavior.walk_chance),
            ("behavior.sleep_chance", behavior.sleep_chance),
        ] {
            if !(0.0..=1.0).contains(&chance) {
                return Err(expected_actual(field, "probability in [0, 1]", chance));
            }
        }
        if behavior.walk_chance + behavior.sleep_chance > 1.0 {
            return Err(invalid(
                "behavior",
                "walk_chance + sleep_chance must not exceed 1",
            ));
        }
        check_positive("behavior.speed", behavior.speed)?;
        Ok(())
    }

    pub fn walkable_grid(&self) -> Result<WalkableGrid, crate::world::WalkableGridError> {
        WalkableGrid::from_rows(&self.walkable)
    }

    /// Builds the runtime session inputs for a map with the given tile size.
    pub fn session_setup(
        &self,
        tile_size: u32,
    ) -> Result<SessionSetup, crate::world::WalkableGridError> {
        let tile = tile_size as f32;
        let static_npc = self.static_npc.as_ref().map(|npc| {
            StaticNpc::at_tile(
                npc.name.clone(),
                npc.tile[0],
                npc.tile[1],
                tile_size,
                Footprint::PLAYER,
                npc.proximity,
            )
        });
        Ok(SessionSetup {
            collision: CollisionMap::new(self.walkable_grid()?, tile_size),
            interactables: self.interactables.clone(),
            interaction_distance: self.interaction_distance,
            player_start: Vec2::new(self.player.start[0], self.player.start[1]),
            player_speed: self.player.speed,
            static_npc,
            wanderers: self
                .wanderers
                .iter()
                .map(|wanderer| {
                    let position =
                        Vec2::new(wanderer.tile[0] as f32 * tile, wanderer.tile[1] as f32 * tile);
                    (wanderer.name.clone(), position)
                })
                .collect(),
            behavior: self.behavior.clone(),
            heart_ticks: self
                .static_npc
                .as_ref()
                .map_or(DEFAULT_HEART_TICKS, |npc| npc.heart_ticks),
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;
    use crate::bake::LayerSelection;

    fn sample() -> serde_json::Value {
        json!({
            "map": "maps/cottage",
            "tilesets": [
                {"name": "floor", "first_id": 1, "columns": 4, "tile_count": 84, "image": "tilesets/floors"}
            ],
            "bake": {
                "composite": {
                    "background": {"all_except": ["fram"]},
                    "frame": {"named": ["fram"]},
                    "excluded_layers": ["walk"]
                }
            },
            "walkable": ["000", "011", "011"],
            "interactables": [
                {"id": "book1", "type": "book", "x": 1, "y": 1, "width": 1, "height": 1, "label": "Diary"}
            ],
            "player": {"start": [20.0, 12.0], "sprite": "char/player"},
            "static_npc": {"name": "man", "tile": [2, 2], "sprite": "char/man"},
            "wanderers": [{"name": "bwcat", "tile": [1, 2], "sprite": "char/bwcat"}],
            "rng_seed": 7
        })
    }

    fn parse(value: serde_json::Value) -> Result<SceneConfig, ConfigError> {
        parse_scene_config(&value.to_string(), Path::new("scene.json"))
    }

    #[test]
    fn sample_parses_with_defaults() {
        let config = parse(sample()).expect("config");
        assert_eq!(config.interaction_distance, DEFAULT_INTERACTION_DISTANCE);
        assert_eq!(config.player.speed, DEFAULT_PLAYER_SPEED);
        assert_eq!(config.bake.output_dir, "baked");
        assert_eq!(
            config.bake.composite.background,
            LayerSelection::AllExcept(vec!["fram".to_string()])
        );
        assert_eq!(config.bake.markers.first_floor_row, 10);
        assert_eq!(config.behavior, BehaviorTuning::default());
        let npc = config.static_npc.as_ref().expect("npc");
        assert_eq!((npc.proximity, npc.heart_ticks), (48.0, 180));
    }

    #[test]
    fn parse_errors_carry_the_json_path() {
        let mut value = sample();
        value["tilesets"][0]["columns"] = json!("four");
        let error = parse(value).expect_err("error");
        let ConfigError::ParseAt { json_path, .. } = &error else {
            panic!("expected path error, got {error}");
        };
        assert_eq!(json_path, "tilesets[0].columns");
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let mut value = sample();
        value["player"]["colour"] = json!("red");
        let error = parse(value).expect_err("error");
        assert!(error.to_string().contains("player"), "{error}");
    }

    #[test]
    fn validation_reports_the_failing_field() {
        let cases = [
            ("/walkable", json!(["01", "1"]), "walkable"),
            ("/player/sprite", json!("Char/Player"), "player.sprite"),
            ("/interaction_distance", json!(0.0), "interaction_distance"),
            ("/tilesets/0/columns", json!(0), "tilesets[0].columns"),
        ];
        for (pointer, replacement, expected_field) in cases {
            let mut value = sample();
            *value.pointer_mut(pointer).expect("pointer") = replacement;
            let error = parse(value).expect_err("error");
            let ConfigError::Invalid { field, .. } = &error else {
                panic!("expected validation error for {pointer}, got {error}");
            };
            assert_eq!(field, expected_field);
        }
    }

    #[test]
    fn duplicate_interactable_ids_are_rejected() {
        let mut value = sample();
        let zone = value["interactables"][0].clone();
        value["interactables"]
            .as_array_mut()
            .expect("array")
            .push(zone);
        let error = parse(value).expect_err("error");
        assert!(error.to_string().contains("duplicate id 'book1'"), "{error}");
    }

    #[test]
    fn chances_above_one_are_rejected() {
        let mut value = sample();
        value["behavior"] = json!({"walk_chance": 0.9, "sleep_chance": 0.2});
        let error = parse(value).expect_err("error");
        assert!(matches!(error, ConfigError::Invalid { .. }));
    }

    #[test]
    fn session_setup_places_entities_on_tiles() {
        let config = parse(sample()).expect("config");
        let setup = config.session_setup(16).expect("setup");
        assert_eq!(setup.player_start, Vec2::new(20.0, 12.0));
        assert_eq!(setup.wanderers, vec![("bwcat".to_string(), Vec2::new(16.0, 32.0))]);
        let npc = setup.static_npc.expect("npc");
        assert_eq!(npc.foot_y(), 48.0);
        assert_eq!(setup.heart_ticks, 180);
        assert_eq!(setup.collision.grid().walkable_count(), 4);
    }

    #[test]
    fn load_reads_from_disk() {
        let temp = TempDir::new().expect("temp");
        let path = temp.path().join("scene.json");
        fs::write(&path, sample().to_string()).expect("write");
        assert!(load_scene_config(&path).is_ok());

        let missing = load_scene_config(&temp.path().join("absent.json")).expect_err("missing");
        assert!(matches!(missing, ConfigError::Read { .. }));
    }
}
