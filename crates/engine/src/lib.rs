pub mod app;
pub mod asset_keys;
pub mod bake;
pub mod config;
pub mod map;
pub mod paths;
pub mod tiles;
pub mod world;

pub use app::{
    run_app, run_app_with_metrics, AppError, InputAction, InputSnapshot, LoopConfig,
    LoopMetricsSnapshot, MetricsHandle, Renderer, Scene, SceneCommand, SceneImages, SceneView,
};
pub use asset_keys::{asset_path, validate_asset_key, AssetKeyError};
pub use config::{load_scene_config, parse_scene_config, ConfigError, SceneConfig};
pub use map::{read_tile_map, MapLoadError, MapParseError, TileMap};
pub use paths::{
    resolve_app_paths, resolve_app_paths_with_root, AppPaths, RootSource, StartupError,
    ROOT_ENV_VAR, SCENE_CONFIG_RELATIVE_PATH,
};
pub use tiles::PixelBuffer;
pub use world::{FrameEvents, FrameInput, GameSession, InteractionEvent, PlayerSnapshot};
