use std::path::PathBuf;
use std::thread;

use tracing::{info, warn};

use crate::tiles::PixelBuffer;
use crate::world::Direction;

/// Grid of equally sized animation frames in one sheet image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SheetLayout {
    pub columns: u32,
    pub rows: u32,
    pub frame_width: u32,
    pub frame_height: u32,
}

pub const PLAYER_SHEET: SheetLayout = SheetLayout {
    columns: 3,
    rows: 4,
    frame_width: 429,
    frame_height: 583,
};

pub const CAT_SHEET: SheetLayout = SheetLayout {
    columns: 4,
    rows: 4,
    frame_width: 125,
    frame_height: 125,
};

/// Standing, left foot, standing, right foot.
pub const PLAYER_WALK_SEQUENCE: [u32; 4] = [0, 1, 0, 2];
pub const CAT_WALK_SEQUENCE: [u32; 4] = [0, 1, 2, 3];

pub fn player_sheet_row(direction: Direction) -> u32 {
    match direction {
        Direction::Down => 0,
        Direction::Left => 1,
        Direction::Right => 2,
        Direction::Up => 3,
    }
}

pub fn cat_sheet_row(direction: Direction) -> u32 {
    match direction {
        Direction::Down => 0,
        Direction::Right => 1,
        Direction::Up => 2,
        Direction::Left => 3,
    }
}

/// Source rectangle in pixels, `[x, x + width) x [y, y + height)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl SheetLayout {
    pub fn frame(&self, column: u32, row: u32) -> SourceRect {
        SourceRect {
            x: column.min(self.columns.saturating_sub(1)) * self.frame_width,
            y: row.min(self.rows.saturating_sub(1)) * self.frame_height,
            width: self.frame_width,
            height: self.frame_height,
        }
    }
}

/// Destination rectangle on the canvas; fractional origins are rounded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DestRect {
    pub x: f32,
    pub y: f32,
    pub width: u32,
    pub height: u32,
}

/// Nearest-neighbour scaled blit of `src` region into `dest`, blended and clipped.
pub fn draw_region_scaled(
    canvas: &mut PixelBuffer,
    image: &PixelBuffer,
    src: SourceRect,
    dest: DestRect,
) {
    if src.width == 0 || src.height == 0 || dest.width == 0 || dest.height == 0 {
        return;
    }
    let origin_x = dest.x.round() as i64;
    let origin_y = dest.y.round() as i64;
    for dy in 0..dest.height {
        let sy = src.y + (u64::from(dy) * u64::from(src.height) / u64::from(dest.height)) as u32;
        for dx in 0..dest.width {
            let sx =
                src.x + (u64::from(dx) * u64::from(src.width) / u64::from(dest.width)) as u32;
            if let Some(color) = image.pixel(sx, sy) {
                if color[3] > 0 {
                    canvas.blend_pixel(origin_x + i64::from(dx), origin_y + i64::from(dy), color);
                }
            }
        }
    }
}

pub fn draw_image_scaled(canvas: &mut PixelBuffer, image: &PixelBuffer, dest: DestRect) {
    let src = SourceRect {
        x: 0,
        y: 0,
        width: image.width(),
        height: image.height(),
    };
    draw_region_scaled(canvas, image, src, dest);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRequest {
    pub label: String,
    pub path: PathBuf,
}

/// Loads every request on its own scoped thread and joins them all. A failed
/// load is logged and yields `None` without affecting the others.
pub fn load_images(requests: &[ImageRequest]) -> Vec<Option<PixelBuffer>> {
    thread::scope(|scope| {
        let handles = requests
            .iter()
            .map(|request| scope.spawn(move || PixelBuffer::load_png(&request.path)))
            .collect::<Vec<_>>();

        handles
            .into_iter()
            .zip(requests)
            .map(|(handle, request)| match handle.join() {
                Ok(Ok(image)) => {
                    info!(
                        label = %request.label,
                        width = image.width(),
                        height = image.height(),
                        "image_loaded"
                    );
                    Some(image)
                }
                Ok(Err(error)) => {
                    warn!(
                        label = %request.label,
                        path = %request.path.display(),
                        error = %error,
                        "sprite_load_failed_using_absent"
                    );
                    None
                }
                Err(_) => {
                    warn!(label = %request.label, "sprite_load_panicked_using_absent");
                    None
                }
            })
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn frame_rects_follow_the_grid() {
        assert_eq!(
            PLAYER_SHEET.frame(2, 3),
            SourceRect {
                x: 858,
                y: 1749,
                width: 429,
                height: 583,
            }
        );
        // Out-of-range indices clamp to the last frame.
        assert_eq!(CAT_SHEET.frame(9, 0).x, 375);
    }

    #[test]
    fn sheet_rows_match_their_art() {
        assert_eq!(player_sheet_row(Direction::Left), 1);
        assert_eq!(cat_sheet_row(Direction::Left), 3);
        assert_eq!(cat_sheet_row(Direction::Right), 1);
    }

    #[test]
    fn scaled_draw_repeats_source_pixels() {
        let mut image = PixelBuffer::transparent(2, 1);
        image.set_pixel(0, 0, [255, 0, 0, 255]);
        image.set_pixel(1, 0, [0, 0, 255, 255]);
        let mut canvas = PixelBuffer::filled(4, 2, [0, 0, 0, 255]);

        draw_image_scaled(
            &mut canvas,
            &image,
            DestRect {
                x: 0.0,
                y: 0.0,
                width: 4,
                height: 2,
            },
        );
        assert_eq!(canvas.pixel(1, 1), Some([255, 0, 0, 255]));
        assert_eq!(canvas.pixel(2, 0), Some([0, 0, 255, 255]));
    }

    #[test]
    fn region_draw_reads_only_the_selected_frame() {
        let mut sheet = PixelBuffer::transparent(4, 2);
        sheet.set_pixel(2, 1, [7, 7, 7, 255]);
        let layout = SheetLayout {
            columns: 2,
            rows: 1,
            frame_width: 2,
            frame_height: 2,
        };
        let mut canvas = PixelBuffer::transparent(2, 2);
        draw_region_scaled(
            &mut canvas,
            &sheet,
            layout.frame(1, 0),
            DestRect {
                x: -0.4,
                y: 0.0,
                width: 2,
                height: 2,
            },
        );
        assert_eq!(canvas.pixel(0, 1), Some([7, 7, 7, 255]));
        assert_eq!(canvas.pixel(1, 1), Some([0, 0, 0, 0]));
    }

    #[test]
    fn failed_loads_become_absent_without_cancelling_others() {
        let temp = TempDir::new().expect("tempdir");
        let good = temp.path().join("good.png");
        std::fs::write(
            &good,
            PixelBuffer::filled(1, 1, [1, 2, 3, 255])
                .encode_png()
                .expect("encode"),
        )
        .expect("write");
        let bad = temp.path().join("bad.png");
        std::fs::write(&bad, b"not a png").expect("write");

        let loaded = load_images(&[
            ImageRequest {
                label: "missing".to_string(),
                path: temp.path().join("missing.png"),
            },
            ImageRequest {
                label: "good".to_string(),
                path: good,
            },
            ImageRequest {
                label: "bad".to_string(),
                path: bad,
            },
        ]);
        assert!(loaded[0].is_none());
        assert_eq!(loaded[1].as_ref().map(PixelBuffer::width), Some(1));
        assert!(loaded[2].is_none());
    }
}
