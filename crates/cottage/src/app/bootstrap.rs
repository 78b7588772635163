use engine::bake::CompositeTarget;
use engine::world::WalkableGridError;
use engine::{
    asset_path, load_scene_config, read_tile_map, resolve_app_paths, AppPaths, ConfigError,
    GameSession, LoopConfig, MapLoadError, MetricsHandle, Scene, SceneImages, SceneView,
    StartupError,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use thiserror::Error;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use super::cottage::CottageScene;

#[derive(Debug, Error)]
pub(crate) enum BootstrapError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Map(#[from] MapLoadError),
    #[error("walkable grid is invalid: {0}")]
    Walkable(#[from] WalkableGridError),
}

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) scene: Box<dyn Scene>,
    pub(crate) metrics: MetricsHandle,
}

impl std::fmt::Debug for AppWiring {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppWiring")
            .field("config", &self.config)
            .field("metrics", &self.metrics)
            .finish_non_exhaustive()
    }
}

pub(crate) fn build_app() -> Result<AppWiring, BootstrapError> {
    info!("=== Cottage Startup ===");
    let paths = resolve_app_paths()?;
    build_app_at(&paths)
}

fn build_app_at(paths: &AppPaths) -> Result<AppWiring, BootstrapError> {
    info!(
        root = %paths.root.display(),
        assets_dir = %paths.assets_dir.display(),
        config = %paths.config_path.display(),
        "startup"
    );
    let config = load_scene_config(&paths.config_path)?;
    let map = read_tile_map(&asset_path(&paths.assets_dir, &config.map, "tmx"))?;
    info!(
        map = %config.map,
        width = map.width,
        height = map.height,
        tile_size = map.tile_size,
        layers = map.layers.len(),
        "map_loaded"
    );

    let setup = config.session_setup(map.tile_size)?;
    let grid = setup.collision.grid();
    if (grid.width(), grid.height()) != (map.width, map.height) {
        warn!(
            grid_width = grid.width(),
            grid_height = grid.height(),
            map_width = map.width,
            map_height = map.height,
            "walkable_grid_size_mismatch"
        );
    }

    let rng = match config.rng_seed {
        Some(seed) => {
            info!(seed, "rng_seeded_from_config");
            ChaCha8Rng::seed_from_u64(seed)
        }
        None => ChaCha8Rng::from_os_rng(),
    };
    let session = GameSession::new(setup, rng);

    let images = SceneImages::load(&paths.assets_dir, &config);
    if images.background.is_none() {
        warn!(
            missing = CompositeTarget::Background.file_name(),
            hint = "cargo run -p bake_cli -- bake",
            "baked_background_missing"
        );
    }
    let view = SceneView::new(
        images,
        map.pixel_width(),
        map.pixel_height(),
        map.tile_size,
        config.bake.composite.background_fill,
    );

    Ok(AppWiring {
        config: LoopConfig::default(),
        scene: Box::new(CottageScene::new(session, view)),
        metrics: MetricsHandle::default(),
    })
}

pub(crate) fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}
