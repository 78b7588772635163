use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::asset_keys::asset_path;
use crate::map::{parse_tile_map, MapParseError, TileMap};
use crate::tiles::{PixelBuffer, RegistryError, TilesetDescriptor, TilesetRegistry};
use crate::world::WalkableGrid;

use super::atomic_io::{write_bytes_atomic, write_json_atomic, AtomicJsonError};
use super::compositor::{composite_layers, CompositeSettings, CompositeTarget, LayerReport};
use super::hashing::BakeInputHasher;
use super::manifest::{
    manifest_mismatch, read_manifest, write_manifest_atomic, BakeManifest, ManifestReadState,
    BAKE_FORMAT_VERSION, MANIFEST_FILE_NAME,
};
use super::markers::{blocked_cells, derive_walkable_grid, extract_markers, MarkerReport, MarkerSettings};

pub const REPORT_FILE_NAME: &str = "bake_report.json";
pub const DEFAULT_OUTPUT_DIR: &str = "baked";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct BakeConfig {
    /// Directory under the assets directory that receives the baked outputs.
    pub output_dir: String,
    pub composite: CompositeSettings,
    pub markers: MarkerSettings,
}

impl Default for BakeConfig {
    fn default() -> Self {
        Self {
            output_dir: DEFAULT_OUTPUT_DIR.to_string(),
            composite: CompositeSettings::default(),
            markers: MarkerSettings::default(),
        }
    }
}

/// Everything a bake reads. Paths are resolved against `assets_dir`.
#[derive(Debug, Clone, Copy)]
pub struct BakeInputs<'a> {
    pub assets_dir: &'a Path,
    pub map_key: &'a str,
    pub tilesets: &'a [TilesetDescriptor],
    pub config: &'a BakeConfig,
}

impl BakeInputs<'_> {
    pub fn map_path(&self) -> PathBuf {
        asset_path(self.assets_dir, self.map_key, "tmx")
    }

    pub fn output_dir(&self) -> PathBuf {
        baked_dir(self.assets_dir, self.config)
    }
}

pub fn baked_dir(assets_dir: &Path, config: &BakeConfig) -> PathBuf {
    assets_dir.join(&config.output_dir)
}

#[derive(Debug, Error)]
pub enum BakePipelineError {
    #[error("failed to read map {path}: {source}")]
    ReadMap {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed map {path}: {source}")]
    Map {
        path: PathBuf,
        #[source]
        source: MapParseError,
    },
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("failed to encode {target} image: {source}")]
    EncodePng {
        target: &'static str,
        #[source]
        source: image::ImageError,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write {path}: {source}")]
    WriteJson {
        path: PathBuf,
        #[source]
        source: AtomicJsonError,
    },
    #[error("failed to read {path}: {source}")]
    ReadManifest {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to hash bake configuration: {0}")]
    HashConfig(#[source] serde_json::Error),
}

/// Content of `bake_report.json`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct BakeReport {
    pub map_width: u32,
    pub map_height: u32,
    pub tile_size: u32,
    pub layers: Vec<LayerReport>,
    pub markers: MarkerReport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BakeAction {
    Composited,
    UpToDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BakeReason {
    Forced,
    ManifestMissing,
    ManifestUnreadable,
    ManifestMismatch(&'static str),
    OutputMissing,
    ReportUnreadable,
    CacheHit,
}

impl BakeReason {
    pub fn label(self) -> &'static str {
        match self {
            BakeReason::Forced => "forced",
            BakeReason::ManifestMissing => "manifest missing",
            BakeReason::ManifestUnreadable => "manifest unreadable",
            BakeReason::ManifestMismatch(detail) => detail,
            BakeReason::OutputMissing => "output missing",
            BakeReason::ReportUnreadable => "report unreadable",
            BakeReason::CacheHit => "inputs unchanged",
        }
    }
}

#[derive(Debug, Clone)]
pub struct BakeSummary {
    pub action: BakeAction,
    pub reason: BakeReason,
    pub input_hash: String,
    pub output_dir: PathBuf,
    pub report: BakeReport,
}

/// The parsed map with its marker analysis, without compositing anything.
#[derive(Debug, Clone)]
pub struct MapAnalysis {
    pub map: TileMap,
    pub markers: MarkerReport,
    /// `None` when the floor layer is missing.
    pub walkable: Option<WalkableGrid>,
}

struct LoadedInputs {
    map: TileMap,
    registry: TilesetRegistry,
    sheets: Vec<Option<PixelBuffer>>,
    input_hash: String,
}

/// Composites the map and writes every output, unless the manifest shows the
/// same inputs were already baked and `force` is false.
pub fn run_bake(inputs: &BakeInputs<'_>, force: bool) -> Result<BakeSummary, BakePipelineError> {
    let loaded = load_inputs(inputs)?;
    let output_dir = inputs.output_dir();
    let expected = BakeManifest {
        format_version: BAKE_FORMAT_VERSION,
        tool_version: env!("CARGO_PKG_VERSION").to_string(),
        input_hash_sha256_hex: loaded.input_hash.clone(),
    };

    let reason = if force {
        BakeReason::Forced
    } else {
        match check_cache(&output_dir, &expected)? {
            Ok(report) => {
                info!(
                    input_hash = %loaded.input_hash,
                    output_dir = %output_dir.display(),
                    "bake_cache_hit"
                );
                return Ok(BakeSummary {
                    action: BakeAction::UpToDate,
                    reason: BakeReason::CacheHit,
                    input_hash: loaded.input_hash,
                    output_dir,
                    report,
                });
            }
            Err(reason) => reason,
        }
    };

    if !matches!(reason, BakeReason::Forced | BakeReason::ManifestMissing) {
        warn!(
            reason = reason.label(),
            output_dir = %output_dir.display(),
            "bake_cache_invalid_rebuilding"
        );
    }
    info!(
        reason = reason.label(),
        input_hash = %loaded.input_hash,
        "bake_started"
    );

    let composite = composite_layers(
        &loaded.map,
        &loaded.registry,
        &loaded.sheets,
        &inputs.config.composite,
    );
    for target in CompositeTarget::ALL {
        let bytes = composite
            .image(target)
            .encode_png()
            .map_err(|source| BakePipelineError::EncodePng {
                target: target.as_str(),
                source,
            })?;
        let path = output_dir.join(target.file_name());
        write_bytes_atomic(&path, &bytes)
            .map_err(|source| BakePipelineError::Write { path: path.clone(), source })?;
        info!(
            target = target.as_str(),
            path = %path.display(),
            bytes = bytes.len(),
            "bake_output_written"
        );
    }

    let report = BakeReport {
        map_width: loaded.map.width,
        map_height: loaded.map.height,
        tile_size: loaded.map.tile_size,
        layers: composite.layers,
        markers: extract_markers(&loaded.map, &inputs.config.markers),
    };
    let report_path = output_dir.join(REPORT_FILE_NAME);
    write_json_atomic(&report_path, &report).map_err(|source| BakePipelineError::WriteJson {
        path: report_path.clone(),
        source,
    })?;

    // Written last so an interrupted bake never looks complete.
    let manifest_path = output_dir.join(MANIFEST_FILE_NAME);
    write_manifest_atomic(&manifest_path, &expected).map_err(|source| {
        BakePipelineError::WriteJson {
            path: manifest_path.clone(),
            source,
        }
    })?;

    info!(
        layers = report.layers.len(),
        obstacle_rects = report.markers.obstacles.len(),
        interactable_rects = report.markers.interactables.len(),
        output_dir = %output_dir.display(),
        "bake_finished"
    );
    Ok(BakeSummary {
        action: BakeAction::Composited,
        reason,
        input_hash: loaded.input_hash,
        output_dir,
        report,
    })
}

/// Parses the map and runs marker extraction only.
pub fn analyze_map(inputs: &BakeInputs<'_>) -> Result<MapAnalysis, BakePipelineError> {
    let map = read_map(&inputs.map_path())?;
    let settings = &inputs.config.markers;
    let markers = extract_markers(&map, settings);
    let (_, _, blocked) = blocked_cells(&map, settings);
    let walkable = map
        .layer(&settings.floor_layer)
        .and_then(|floor| derive_walkable_grid(&map, floor, &blocked, settings.first_floor_row));
    Ok(MapAnalysis {
        map,
        markers,
        walkable,
    })
}

fn read_map(path: &Path) -> Result<TileMap, BakePipelineError> {
    read_map_with_bytes(path).map(|(_, map)| map)
}

/// Reads and parses a map, keeping the raw bytes for hashing. Invalid UTF-8 is fatal.
fn read_map_with_bytes(path: &Path) -> Result<(Vec<u8>, TileMap), BakePipelineError> {
    let read_error = |source: io::Error| BakePipelineError::ReadMap {
        path: path.to_path_buf(),
        source,
    };
    let bytes = fs::read(path).map_err(read_error)?;
    let raw = std::str::from_utf8(&bytes)
        .map_err(|error| read_error(io::Error::new(io::ErrorKind::InvalidData, error)))?;
    let map = parse_tile_map(raw).map_err(|source| BakePipelineError::Map {
        path: path.to_path_buf(),
        source,
    })?;
    Ok((bytes, map))
}

fn load_inputs(inputs: &BakeInputs<'_>) -> Result<LoadedInputs, BakePipelineError> {
    let map_path = inputs.map_path();
    let (map_bytes, map) = read_map_with_bytes(&map_path)?;
    let registry = TilesetRegistry::new(inputs.tilesets.to_vec())?;

    let mut hasher = BakeInputHasher::new(env!("CARGO_PKG_VERSION"));
    hasher.add_part("map", &map_bytes);
    let config_json = serde_json::to_vec(&(inputs.tilesets, inputs.config))
        .map_err(BakePipelineError::HashConfig)?;
    hasher.add_part("config", &config_json);

    let mut sheets = Vec::with_capacity(registry.len());
    for descriptor in registry.descriptors() {
        let tag = format!("tileset:{}", descriptor.name);
        let path = asset_path(inputs.assets_dir, &descriptor.image, "png");
        let sheet = match fs::read(&path) {
            Ok(bytes) => {
                hasher.add_part(&tag, &bytes);
                match PixelBuffer::decode_png(&bytes) {
                    Ok(sheet) => Some(sheet),
                    Err(error) => {
                        warn!(
                            tileset = %descriptor.name,
                            path = %path.display(),
                            reason = %error,
                            "bake_tileset_decode_failed_treating_as_absent"
                        );
                        None
                    }
                }
            }
            Err(error) => {
                hasher.add_absent(&tag);
                warn!(
                    tileset = %descriptor.name,
                    path = %path.display(),
                    reason = %error,
                    "bake_tileset_missing_treating_as_absent"
                );
                None
            }
        };
        sheets.push(sheet);
    }

    info!(
        map_path = %map_path.display(),
        width = map.width,
        height = map.height,
        tile_size = map.tile_size,
        layers = map.layers.len(),
        tilesets = registry.len(),
        tilesets_loaded = sheets.iter().filter(|sheet| sheet.is_some()).count(),
        "bake_inputs_loaded"
    );

    Ok(LoadedInputs {
        map,
        registry,
        sheets,
        input_hash: hasher.finish_hex(),
    })
}

/// `Ok(Ok(report))` when the cached outputs can be reused.
fn check_cache(
    output_dir: &Path,
    expected: &BakeManifest,
) -> Result<Result<BakeReport, BakeReason>, BakePipelineError> {
    let manifest_path = output_dir.join(MANIFEST_FILE_NAME);
    let manifest = match read_manifest(&manifest_path).map_err(|source| {
        BakePipelineError::ReadManifest {
            path: manifest_path.clone(),
            source,
        }
    })? {
        ManifestReadState::Present(manifest) => manifest,
        ManifestReadState::Missing => return Ok(Err(BakeReason::ManifestMissing)),
        ManifestReadState::Unreadable => return Ok(Err(BakeReason::ManifestUnreadable)),
    };
    if let Some(detail) = manifest_mismatch(&manifest, expected) {
        return Ok(Err(BakeReason::ManifestMismatch(detail)));
    }

    let all_present = CompositeTarget::ALL
        .iter()
        .all(|target| output_dir.join(target.file_name()).is_file());
    if !all_present {
        return Ok(Err(BakeReason::OutputMissing));
    }

    let report = fs::read_to_string(output_dir.join(REPORT_FILE_NAME))
        .ok()
        .and_then(|raw| serde_json::from_str::<BakeReport>(&raw).ok());
    Ok(report.ok_or(BakeReason::ReportUnreadable))
}
