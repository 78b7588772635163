use super::registry::TilesetRegistry;

pub const FLIP_HORIZONTAL: u32 = 0x8000_0000;
pub const FLIP_VERTICAL: u32 = 0x4000_0000;
pub const FLIP_DIAGONAL: u32 = 0x2000_0000;
const FLIP_MASK: u32 = FLIP_HORIZONTAL | FLIP_VERTICAL | FLIP_DIAGONAL;

/// Strips the three flip bits from a raw cell code.
pub const fn clean_id(raw: u32) -> u32 {
    raw & !FLIP_MASK
}

/// A cell draws nothing when its clean id is zero, whatever flip bits it carries.
pub const fn is_empty_cell(raw: u32) -> bool {
    clean_id(raw) == 0
}

/// Marker layers only care whether anything was painted into the cell.
pub const fn is_marked_cell(raw: u32) -> bool {
    raw != 0
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct FlipFlags {
    pub horizontal: bool,
    pub vertical: bool,
    pub diagonal: bool,
}

impl FlipFlags {
    pub const NONE: Self = Self {
        horizontal: false,
        vertical: false,
        diagonal: false,
    };

    pub const fn from_raw(raw: u32) -> Self {
        Self {
            horizontal: raw & FLIP_HORIZONTAL != 0,
            vertical: raw & FLIP_VERTICAL != 0,
            diagonal: raw & FLIP_DIAGONAL != 0,
        }
    }

    pub const fn is_identity(self) -> bool {
        !self.horizontal && !self.vertical && !self.diagonal
    }

    /// Maps a destination-local pixel to the tile-local source pixel it samples.
    ///
    /// Transpose first, then mirror x, then mirror y. Callers guarantee
    /// `px < tile_size` and `py < tile_size`.
    pub const fn source_pixel(self, px: u32, py: u32, tile_size: u32) -> (u32, u32) {
        let (mut sx, mut sy) = if self.diagonal { (py, px) } else { (px, py) };
        if self.horizontal {
            sx = tile_size - 1 - sx;
        }
        if self.vertical {
            sy = tile_size - 1 - sy;
        }
        (sx, sy)
    }
}

/// Where one cell's pixels come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRef {
    pub tileset_index: usize,
    pub src_x: u32,
    pub src_y: u32,
    pub flips: FlipFlags,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellResolution {
    Empty,
    Unresolved { clean_id: u32 },
    Tile(TileRef),
}

/// Turns raw cell codes into tile references against a registry.
#[derive(Debug, Clone, Copy)]
pub struct GidResolver<'a> {
    registry: &'a TilesetRegistry,
    tile_size: u32,
}

impl<'a> GidResolver<'a> {
    pub fn new(registry: &'a TilesetRegistry, tile_size: u32) -> Self {
        Self {
            registry,
            tile_size,
        }
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    pub fn resolve(&self, raw: u32) -> CellResolution {
        let id = clean_id(raw);
        if id == 0 {
            return CellResolution::Empty;
        }
        let Some((tileset_index, descriptor)) = self.registry.resolve(id) else {
            return CellResolution::Unresolved { clean_id: id };
        };

        let local = id - descriptor.first_id;
        let col = local % descriptor.columns;
        let row = local / descriptor.columns;
        // A source offset past u32 cannot exist in any sheet.
        let (Some(src_x), Some(src_y)) = (
            col.checked_mul(self.tile_size),
            row.checked_mul(self.tile_size),
        ) else {
            return CellResolution::Unresolved { clean_id: id };
        };
        CellResolution::Tile(TileRef {
            tileset_index,
            src_x,
            src_y,
            flips: FlipFlags::from_raw(raw),
        })
    }
}
