use thiserror::Error;

use super::geometry::Vec2;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalkableGridError {
    #[error("walkable grid must have at least one row and one column")]
    Empty,
    #[error("walkable row {row} has {actual} cells, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        actual: usize,
    },
    #[error("walkable row {row} column {col} has invalid cell '{character}' (expected '0' or '1')")]
    InvalidCell {
        row: usize,
        col: usize,
        character: char,
    },
}

/// Per-cell walkability. Cells outside the grid are never walkable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkableGrid {
    width: u32,
    height: u32,
    cells: Vec<bool>,
}

impl WalkableGrid {
    /// Parses rows of `'1'` (walkable) and `'0'` (blocked) characters.
    pub fn from_rows<S: AsRef<str>>(rows: &[S]) -> Result<Self, WalkableGridError> {
        let Some(first) = rows.first() else {
            return Err(WalkableGridError::Empty);
        };
        let width = first.as_ref().chars().count();
        if width == 0 {
            return Err(WalkableGridError::Empty);
        }

        let mut cells = Vec::with_capacity(width * rows.len());
        for (row_index, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            let actual = row.chars().count();
            if actual != width {
                return Err(WalkableGridError::RaggedRow {
                    row: row_index,
                    expected: width,
                    actual,
                });
            }
            for (col, character) in row.chars().enumerate() {
                match character {
                    '1' => cells.push(true),
                    '0' => cells.push(false),
                    _ => {
                        return Err(WalkableGridError::InvalidCell {
                            row: row_index,
                            col,
                            character,
                        })
                    }
                }
            }
        }

        Ok(Self {
            width: width as u32,
            height: rows.len() as u32,
            cells,
        })
    }

    pub fn from_cells(width: u32, height: u32, cells: Vec<bool>) -> Option<Self> {
        (width > 0 && height > 0 && cells.len() == width as usize * height as usize).then_some(
            Self {
                width,
                height,
                cells,
            },
        )
    }

    pub fn to_rows(&self) -> Vec<String> {
        self.cells
            .chunks(self.width as usize)
            .map(|row| row.iter().map(|&walkable| if walkable { '1' } else { '0' }).collect())
            .collect()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_walkable(&self, col: i64, row: i64) -> bool {
        if col < 0 || row < 0 || col >= i64::from(self.width) || row >= i64::from(self.height) {
            return false;
        }
        self.cells[row as usize * self.width as usize + col as usize]
    }

    pub fn walkable_count(&self) -> usize {
        self.cells.iter().filter(|&&walkable| walkable).count()
    }
}

/// The lower-body collision box of a moving entity.
///
/// `size` is the nominal square sprite box; only its lower half plus
/// `bottom_margin` is tested, shrunk horizontally by `padding` on each side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Footprint {
    pub size: f32,
    pub padding: f32,
    pub bottom_margin: f32,
}

impl Footprint {
    pub const PLAYER: Footprint = Footprint {
        size: 28.0,
        padding: 4.0,
        bottom_margin: 4.0,
    };

    pub const WANDERER: Footprint = Footprint {
        size: 20.0,
        padding: 2.0,
        bottom_margin: 2.0,
    };

    /// Four corners of the reduced box plus the midpoint of its bottom edge.
    pub fn sample_points(&self, position: Vec2) -> [Vec2; 5] {
        let left = position.x + self.padding;
        let right = position.x + self.size - self.padding;
        let top = position.y + self.size / 2.0;
        let bottom = position.y + self.size + self.bottom_margin;
        [
            Vec2::new(left, top),
            Vec2::new(right, top),
            Vec2::new(left, bottom),
            Vec2::new(right, bottom),
            Vec2::new((left + right) / 2.0, bottom),
        ]
    }

    pub fn center(&self, position: Vec2) -> Vec2 {
        Vec2::new(position.x + self.size / 2.0, position.y + self.size / 2.0)
    }

    pub fn foot_y(&self, position: Vec2) -> f32 {
        position.y + self.size
    }
}

#[derive(Debug, Clone)]
pub struct CollisionMap {
    grid: WalkableGrid,
    tile_size: u32,
}

impl CollisionMap {
    pub fn new(grid: WalkableGrid, tile_size: u32) -> Self {
        Self { grid, tile_size }
    }

    pub fn grid(&self) -> &WalkableGrid {
        &self.grid
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    fn point_walkable(&self, point: Vec2) -> bool {
        let tile = self.tile_size.max(1) as f32;
        let col = (point.x / tile).floor();
        let row = (point.y / tile).floor();
        if !col.is_finite() || !row.is_finite() {
            return false;
        }
        self.grid.is_walkable(col as i64, row as i64)
    }

    /// Blocked when any sample point is outside the grid or on a non-walkable cell.
    pub fn is_blocked(&self, footprint: &Footprint, position: Vec2) -> bool {
        footprint
            .sample_points(position)
            .iter()
            .any(|&point| !self.point_walkable(point))
    }

    /// Applies `delta` one axis at a time, X first, so entities slide along walls.
    pub fn resolve_move(&self, footprint: &Footprint, from: Vec2, delta: Vec2) -> Vec2 {
        let mut resolved = from;
        let try_x = Vec2::new(from.x + delta.x, from.y);
        if !self.is_blocked(footprint, try_x) {
            resolved.x = try_x.x;
        }
        let try_y = Vec2::new(resolved.x, from.y + delta.y);
        if !self.is_blocked(footprint, try_y) {
            resolved.y = try_y.y;
        }
        resolved
    }
}
