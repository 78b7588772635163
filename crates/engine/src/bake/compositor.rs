use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::map::TileMap;
use crate::tiles::{blit_tile, BlitOutcome, CellResolution, GidResolver, PixelBuffer, TilesetRegistry};

pub const DEFAULT_BACKGROUND_FILL: [u8; 4] = [5, 3, 3, 255];

/// Which map layers a composite group draws.
///
/// Serialized externally tagged: `"all"`, `{"all_except": [..]}`, `{"named": [..]}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerSelection {
    All,
    AllExcept(Vec<String>),
    Named(Vec<String>),
}

impl LayerSelection {
    pub fn selects(&self, layer_name: &str) -> bool {
        match self {
            LayerSelection::All => true,
            LayerSelection::AllExcept(names) => !names.iter().any(|name| name == layer_name),
            LayerSelection::Named(names) => names.iter().any(|name| name == layer_name),
        }
    }
}

impl Default for LayerSelection {
    fn default() -> Self {
        LayerSelection::Named(Vec::new())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompositeTarget {
    Background,
    Foreground,
    Frame,
}

impl CompositeTarget {
    pub const ALL: [CompositeTarget; 3] = [
        CompositeTarget::Background,
        CompositeTarget::Foreground,
        CompositeTarget::Frame,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            CompositeTarget::Background => "background",
            CompositeTarget::Foreground => "foreground",
            CompositeTarget::Frame => "frame",
        }
    }

    pub const fn file_name(self) -> &'static str {
        match self {
            CompositeTarget::Background => "background.png",
            CompositeTarget::Foreground => "foreground.png",
            CompositeTarget::Frame => "frame.png",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompositeSettings {
    pub background_fill: [u8; 4],
    pub background: LayerSelection,
    pub foreground: LayerSelection,
    pub frame: LayerSelection,
    /// Trigger layers that are never drawn, whatever the group selections say.
    pub excluded_layers: Vec<String>,
}

impl Default for CompositeSettings {
    fn default() -> Self {
        Self {
            background_fill: DEFAULT_BACKGROUND_FILL,
            background: LayerSelection::All,
            foreground: LayerSelection::default(),
            frame: LayerSelection::default(),
            excluded_layers: Vec::new(),
        }
    }
}

impl CompositeSettings {
    pub fn selection(&self, target: CompositeTarget) -> &LayerSelection {
        match target {
            CompositeTarget::Background => &self.background,
            CompositeTarget::Foreground => &self.foreground,
            CompositeTarget::Frame => &self.frame,
        }
    }

    pub fn is_excluded(&self, layer_name: &str) -> bool {
        self.excluded_layers.iter().any(|name| name == layer_name)
    }
}

/// Tile counts for one layer drawn into one target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct LayerReport {
    pub layer: String,
    pub target: Option<CompositeTarget>,
    pub rendered: usize,
    pub unresolved: usize,
    pub missing_image: usize,
    pub out_of_bounds: usize,
}

#[derive(Debug, Clone)]
pub struct CompositeOutput {
    pub background: PixelBuffer,
    pub foreground: PixelBuffer,
    pub frame: PixelBuffer,
    pub layers: Vec<LayerReport>,
}

impl CompositeOutput {
    pub fn image(&self, target: CompositeTarget) -> &PixelBuffer {
        match target {
            CompositeTarget::Background => &self.background,
            CompositeTarget::Foreground => &self.foreground,
            CompositeTarget::Frame => &self.frame,
        }
    }

    fn image_mut(&mut self, target: CompositeTarget) -> &mut PixelBuffer {
        match target {
            CompositeTarget::Background => &mut self.background,
            CompositeTarget::Foreground => &mut self.foreground,
            CompositeTarget::Frame => &mut self.frame,
        }
    }
}

/// Flattens the map into the three composite images.
///
/// `sheets[i]` is the loaded image of registry descriptor `i`, `None` when it
/// could not be loaded. Layers are visited in map paint order and each one is
/// fully blitted before the next.
pub fn composite_layers(
    map: &TileMap,
    registry: &TilesetRegistry,
    sheets: &[Option<PixelBuffer>],
    settings: &CompositeSettings,
) -> CompositeOutput {
    let width = map.pixel_width();
    let height = map.pixel_height();
    let mut output = CompositeOutput {
        background: PixelBuffer::filled(width, height, settings.background_fill),
        foreground: PixelBuffer::transparent(width, height),
        frame: PixelBuffer::transparent(width, height),
        layers: Vec::new(),
    };
    let resolver = GidResolver::new(registry, map.tile_size);

    for layer in &map.layers {
        if settings.is_excluded(&layer.name) {
            info!(layer = %layer.name, "bake_layer_excluded");
            output.layers.push(LayerReport {
                layer: layer.name.clone(),
                ..LayerReport::default()
            });
            continue;
        }

        let mut drawn_anywhere = false;
        for target in CompositeTarget::ALL {
            if !settings.selection(target).selects(&layer.name) {
                continue;
            }
            drawn_anywhere = true;
            let report = draw_layer(
                output.image_mut(target),
                map,
                &layer.cells,
                &resolver,
                sheets,
                &layer.name,
                target,
            );
            info!(
                layer = %report.layer,
                target = target.as_str(),
                rendered = report.rendered,
                unresolved = report.unresolved,
                missing_image = report.missing_image,
                out_of_bounds = report.out_of_bounds,
                "bake_layer_composited"
            );
            output.layers.push(report);
        }

        if !drawn_anywhere {
            info!(layer = %layer.name, "bake_layer_not_selected");
            output.layers.push(LayerReport {
                layer: layer.name.clone(),
                ..LayerReport::default()
            });
        }
    }

    output
}

fn draw_layer(
    canvas: &mut PixelBuffer,
    map: &TileMap,
    cells: &[u32],
    resolver: &GidResolver<'_>,
    sheets: &[Option<PixelBuffer>],
    layer_name: &str,
    target: CompositeTarget,
) -> LayerReport {
    let mut report = LayerReport {
        layer: layer_name.to_string(),
        target: Some(target),
        ..LayerReport::default()
    };
    let columns = map.width.max(1) as usize;
    let tile_size = map.tile_size;

    for (index, &raw) in cells.iter().enumerate() {
        let tile = match resolver.resolve(raw) {
            CellResolution::Empty => continue,
            CellResolution::Unresolved { .. } => {
                report.unresolved += 1;
                continue;
            }
            CellResolution::Tile(tile) => tile,
        };
        let Some(sheet) = sheets.get(tile.tileset_index).and_then(Option::as_ref) else {
            report.missing_image += 1;
            continue;
        };

        let col = (index % columns) as i64;
        let row = (index / columns) as i64;
        let outcome = blit_tile(
            canvas,
            col * i64::from(tile_size),
            row * i64::from(tile_size),
            sheet,
            &tile,
            tile_size,
        );
        match outcome {
            BlitOutcome::Drawn => report.rendered += 1,
            BlitOutcome::SkippedOutOfBounds => report.out_of_bounds += 1,
        }
    }

    if report.out_of_bounds > 0 {
        warn!(
            layer = %layer_name,
            target = target.as_str(),
            out_of_bounds = report.out_of_bounds,
            "bake_tiles_outside_sheet_skipped"
        );
    }
    report
}
