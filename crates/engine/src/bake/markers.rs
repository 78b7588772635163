use std::collections::{HashSet, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::map::{Layer, TileMap};
use crate::tiles::is_marked_cell;
use crate::world::WalkableGrid;

pub const DEFAULT_FIRST_FLOOR_ROW: u32 = 10;

/// Axis-aligned rectangle in cell units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct CellRect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct MarkerSettings {
    pub obstacle_layer: String,
    pub interactable_layer: String,
    pub floor_layer: String,
    /// Rows above this one are wall art, never floor.
    pub first_floor_row: u32,
}

impl Default for MarkerSettings {
    fn default() -> Self {
        Self {
            obstacle_layer: "obstacles".to_string(),
            interactable_layer: "interactables".to_string(),
            floor_layer: "floor".to_string(),
            first_floor_row: DEFAULT_FIRST_FLOOR_ROW,
        }
    }
}

/// Marked `(col, row)` cells of one layer, in row-major discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkerSet {
    pub layer: String,
    pub cells: Vec<(u32, u32)>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct FloorOccupancy {
    pub first_floor_row: u32,
    pub floor_tiles: usize,
    pub blocked_floor_tiles: usize,
    pub walkable_floor_tiles: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct MarkerReport {
    pub obstacles: Vec<CellRect>,
    pub interactables: Vec<CellRect>,
    /// `None` when the floor layer is missing from the map.
    pub floor: Option<FloorOccupancy>,
}

pub fn collect_markers(map: &TileMap, layer_name: &str) -> MarkerSet {
    let Some(layer) = map.layer(layer_name) else {
        warn!(layer = %layer_name, "bake_marker_layer_missing");
        return MarkerSet {
            layer: layer_name.to_string(),
            cells: Vec::new(),
        };
    };

    let columns = map.width.max(1);
    let cells = layer
        .cells
        .iter()
        .enumerate()
        .filter(|(_, &raw)| is_marked_cell(raw))
        .map(|(index, _)| (index as u32 % columns, index as u32 / columns))
        .collect();
    MarkerSet {
        layer: layer_name.to_string(),
        cells,
    }
}

/// Bounding boxes of the 4-connected components of `cells`, sorted by `(y, x)`.
pub fn group_into_rects(cells: &[(u32, u32)]) -> Vec<CellRect> {
    let marked = cells.iter().copied().collect::<HashSet<_>>();
    let mut visited = HashSet::with_capacity(marked.len());
    let mut rects = Vec::new();

    for &start in cells {
        if !visited.insert(start) {
            continue;
        }
        let (mut min_x, mut max_x, mut min_y, mut max_y) = (start.0, start.0, start.1, start.1);
        let mut queue = VecDeque::from([start]);

        while let Some((x, y)) = queue.pop_front() {
            min_x = min_x.min(x);
            max_x = max_x.max(x);
            min_y = min_y.min(y);
            max_y = max_y.max(y);

            let neighbours = [
                x.checked_add(1).map(|nx| (nx, y)),
                x.checked_sub(1).map(|nx| (nx, y)),
                y.checked_add(1).map(|ny| (x, ny)),
                y.checked_sub(1).map(|ny| (x, ny)),
            ];
            for next in neighbours.into_iter().flatten() {
                if marked.contains(&next) && visited.insert(next) {
                    queue.push_back(next);
                }
            }
        }

        rects.push(CellRect {
            x: min_x,
            y: min_y,
            w: max_x - min_x + 1,
            h: max_y - min_y + 1,
        });
    }

    rects.sort_by_key(|rect| (rect.y, rect.x));
    rects
}

pub fn floor_occupancy(
    map: &TileMap,
    floor: &Layer,
    blocked: &HashSet<(u32, u32)>,
    first_floor_row: u32,
) -> FloorOccupancy {
    let mut occupancy = FloorOccupancy {
        first_floor_row,
        ..FloorOccupancy::default()
    };
    for row in first_floor_row..map.height {
        for col in 0..map.width {
            if map.cell(floor, col, row).unwrap_or(0) == 0 {
                continue;
            }
            occupancy.floor_tiles += 1;
            if blocked.contains(&(col, row)) {
                occupancy.blocked_floor_tiles += 1;
            }
        }
    }
    occupancy.walkable_floor_tiles = occupancy.floor_tiles - occupancy.blocked_floor_tiles;
    occupancy
}

/// A candidate walkable grid: floor cells at or below `first_floor_row` that no marker covers.
pub fn derive_walkable_grid(
    map: &TileMap,
    floor: &Layer,
    blocked: &HashSet<(u32, u32)>,
    first_floor_row: u32,
) -> Option<WalkableGrid> {
    let mut cells = Vec::with_capacity(map.width as usize * map.height as usize);
    for row in 0..map.height {
        for col in 0..map.width {
            let is_floor = row >= first_floor_row && map.cell(floor, col, row).unwrap_or(0) != 0;
            cells.push(is_floor && !blocked.contains(&(col, row)));
        }
    }
    WalkableGrid::from_cells(map.width, map.height, cells)
}

/// Marker sets for the obstacle and interactable layers, unioned into one blocked set.
pub fn blocked_cells(
    map: &TileMap,
    settings: &MarkerSettings,
) -> (MarkerSet, MarkerSet, HashSet<(u32, u32)>) {
    let obstacles = collect_markers(map, &settings.obstacle_layer);
    let interactables = collect_markers(map, &settings.interactable_layer);
    let blocked = obstacles
        .cells
        .iter()
        .chain(interactables.cells.iter())
        .copied()
        .collect();
    (obstacles, interactables, blocked)
}

pub fn extract_markers(map: &TileMap, settings: &MarkerSettings) -> MarkerReport {
    let (obstacles, interactables, blocked) = blocked_cells(map, settings);
    let report = MarkerReport {
        obstacles: group_into_rects(&obstacles.cells),
        interactables: group_into_rects(&interactables.cells),
        floor: match map.layer(&settings.floor_layer) {
            Some(floor) => Some(floor_occupancy(map, floor, &blocked, settings.first_floor_row)),
            None => {
                warn!(layer = %settings.floor_layer, "bake_floor_layer_missing");
                None
            }
        },
    };

    info!(
        obstacle_tiles = obstacles.cells.len(),
        obstacle_rects = report.obstacles.len(),
        interactable_tiles = interactables.cells.len(),
        interactable_rects = report.interactables.len(),
        floor_tiles = report.floor.map_or(0, |floor| floor.floor_tiles),
        blocked_floor_tiles = report.floor.map_or(0, |floor| floor.blocked_floor_tiles),
        "bake_markers_extracted"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map_with(width: u32, height: u32, layers: Vec<(&str, Vec<u32>)>) -> TileMap {
        TileMap {
            width,
            height,
            tile_size: 16,
            layers: layers
                .into_iter()
                .map(|(name, cells)| Layer {
                    name: name.to_string(),
                    cells,
                })
                .collect(),
            tileset_refs: Vec::new(),
        }
    }

    #[test]
    fn l_shape_and_island_group_into_two_boxes() {
        let rects = group_into_rects(&[(0, 0), (1, 0), (0, 1), (5, 5)]);
        assert_eq!(
            rects,
            vec![
                CellRect { x: 0, y: 0, w: 2, h: 2 },
                CellRect { x: 5, y: 5, w: 1, h: 1 },
            ]
        );
    }

    #[test]
    fn diagonal_neighbours_are_separate_components() {
        let rects = group_into_rects(&[(1, 1), (2, 2)]);
        assert_eq!(rects.len(), 2);
    }

    #[test]
    fn rects_sort_by_row_then_column() {
        let rects = group_into_rects(&[(7, 3), (2, 3), (9, 0)]);
        let origins = rects.iter().map(|rect| (rect.x, rect.y)).collect::<Vec<_>>();
        assert_eq!(origins, vec![(9, 0), (2, 3), (7, 3)]);
    }

    #[test]
    fn flip_only_codes_still_count_as_markers() {
        let map = map_with(3, 1, vec![("obstacles", vec![0, 0x8000_0000, 5])]);
        let set = collect_markers(&map, "obstacles");
        assert_eq!(set.cells, vec![(1, 0), (2, 0)]);
    }

    #[test]
    fn missing_marker_layer_yields_empty_set() {
        let map = map_with(1, 1, vec![]);
        assert!(collect_markers(&map, "obstacles").cells.is_empty());
    }

    #[test]
    fn floor_occupancy_counts_rows_from_first_floor_row() {
        // 3x3 map, floor starts at row 1; one obstacle and one interactable on the floor.
        let map = map_with(
            3,
            3,
            vec![
                ("floor", vec![1, 1, 1, 1, 1, 0, 1, 1, 1]),
                ("obstacles", vec![7, 0, 0, 7, 0, 0, 0, 0, 0]),
                ("interactables", vec![0, 0, 0, 0, 0, 0, 0, 0, 9]),
            ],
        );
        let settings = MarkerSettings {
            first_floor_row: 1,
            ..MarkerSettings::default()
        };
        let report = extract_markers(&map, &settings);
        assert_eq!(
            report.floor,
            Some(FloorOccupancy {
                first_floor_row: 1,
                floor_tiles: 5,
                blocked_floor_tiles: 2,
                walkable_floor_tiles: 3,
            })
        );
        assert_eq!(report.obstacles, vec![CellRect { x: 0, y: 0, w: 1, h: 2 }]);
        assert_eq!(report.interactables, vec![CellRect { x: 2, y: 2, w: 1, h: 1 }]);

        let (_, _, blocked) = blocked_cells(&map, &settings);
        let floor = map.layer("floor").expect("floor");
        let grid = derive_walkable_grid(&map, floor, &blocked, 1).expect("grid");
        assert_eq!(grid.to_rows(), vec!["000", "010", "110"]);
    }

    #[test]
    fn missing_floor_layer_skips_occupancy() {
        let map = map_with(1, 1, vec![("obstacles", vec![1])]);
        let report = extract_markers(&map, &MarkerSettings::default());
        assert!(report.floor.is_none());
        assert_eq!(report.obstacles.len(), 1);
    }
}
