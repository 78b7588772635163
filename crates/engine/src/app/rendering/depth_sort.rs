use crate::tiles::PixelBuffer;

/// The foreground image cut into one full-width strip per tile row. Rows
/// without a single visible pixel are stored as `None` and never drawn.
#[derive(Debug, Clone, Default)]
pub struct ForegroundStrips {
    tile_size: u32,
    strips: Vec<Option<PixelBuffer>>,
}

impl ForegroundStrips {
    pub fn slice(foreground: &PixelBuffer, tile_size: u32) -> Self {
        let tile_size = tile_size.max(1);
        let rows = foreground.height().div_ceil(tile_size);
        let strips = (0..rows)
            .map(|row| {
                let y = row * tile_size;
                foreground
                    .rows_have_content(y, tile_size)
                    .then(|| foreground.row_band(y, tile_size))
            })
            .collect();
        Self { tile_size, strips }
    }

    pub fn row_count(&self) -> u32 {
        self.strips.len() as u32
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    pub fn strip(&self, row: u32) -> Option<&PixelBuffer> {
        self.strips.get(row as usize).and_then(Option::as_ref)
    }

    pub fn present_rows(&self) -> Vec<bool> {
        self.strips.iter().map(Option::is_some).collect()
    }

    pub fn non_empty_count(&self) -> usize {
        self.strips.iter().filter(|strip| strip.is_some()).count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawOp<K> {
    Entity(K),
    /// Foreground strip for this tile row, drawn at `row * tile_size`.
    Strip(u32),
}

/// Interleaves entities with foreground strips. Entities are taken in ascending
/// foot order (ties keep input order) and each is placed before the first row
/// whose bottom edge lies strictly below its feet; an entity whose feet sit
/// exactly on a row's bottom edge is drawn after that row's strip.
pub fn plan_draw_order<K: Copy>(
    entities: &[(K, f32)],
    present_rows: &[bool],
    tile_size: u32,
) -> Vec<DrawOp<K>> {
    let mut pending = entities.to_vec();
    pending.sort_by(|a, b| a.1.total_cmp(&b.1));

    let mut ops = Vec::with_capacity(pending.len() + present_rows.len());
    let mut next = 0;
    for (row, &present) in present_rows.iter().enumerate() {
        let bottom = (row as f32 + 1.0) * tile_size as f32;
        while let Some(&(key, foot_y)) = pending.get(next) {
            if foot_y >= bottom || foot_y.is_nan() {
                break;
            }
            ops.push(DrawOp::Entity(key));
            next += 1;
        }
        if present {
            ops.push(DrawOp::Strip(row as u32));
        }
    }
    ops.extend(pending[next..].iter().map(|&(key, _)| DrawOp::Entity(key)));
    ops
}
