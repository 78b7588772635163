use super::gid::TileRef;
use super::pixel_buffer::PixelBuffer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlitOutcome {
    Drawn,
    SkippedOutOfBounds,
}

/// Straight-alpha source-over of one RGBA pixel onto another, in place.
///
/// Alpha 0 leaves the destination untouched and alpha 255 overwrites it.
/// Anything in between is blended with channels rounded to the nearest integer.
pub fn composite_pixel(dst: &mut [u8; 4], src: [u8; 4]) {
    let alpha = src[3];
    if alpha == 0 {
        return;
    }
    if alpha == 255 {
        *dst = [src[0], src[1], src[2], 255];
        return;
    }

    let sa = f64::from(alpha) / 255.0;
    let da = f64::from(dst[3]) / 255.0;
    let out_a = sa + da * (1.0 - sa);
    if out_a <= 0.0 {
        return;
    }
    for channel in 0..3 {
        let blended = (f64::from(src[channel]) * sa
            + f64::from(dst[channel]) * da * (1.0 - sa))
            / out_a;
        dst[channel] = blended.round().clamp(0.0, 255.0) as u8;
    }
    dst[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
}

/// Copies one tile from a tileset sheet onto `dst` with its top-left at
/// `(dst_x, dst_y)`, honouring flips.
///
/// A source rectangle that does not fit inside the sheet skips the whole tile.
/// Destination pixels outside `dst` are clipped.
pub fn blit_tile(
    dst: &mut PixelBuffer,
    dst_x: i64,
    dst_y: i64,
    sheet: &PixelBuffer,
    tile: &TileRef,
    tile_size: u32,
) -> BlitOutcome {
    let fits_x = tile
        .src_x
        .checked_add(tile_size)
        .is_some_and(|right| right <= sheet.width());
    let fits_y = tile
        .src_y
        .checked_add(tile_size)
        .is_some_and(|bottom| bottom <= sheet.height());
    if !fits_x || !fits_y {
        return BlitOutcome::SkippedOutOfBounds;
    }

    for py in 0..tile_size {
        for px in 0..tile_size {
            let (sx, sy) = tile.flips.source_pixel(px, py, tile_size);
            let Some(color) = sheet.pixel(tile.src_x + sx, tile.src_y + sy) else {
                continue;
            };
            dst.blend_pixel(dst_x + i64::from(px), dst_y + i64::from(py), color);
        }
    }
    BlitOutcome::Drawn
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tiles::gid::{FlipFlags, FLIP_DIAGONAL, FLIP_HORIZONTAL};

    fn gradient_sheet(size: u32) -> PixelBuffer {
        let mut sheet = PixelBuffer::transparent(size, size);
        for y in 0..size {
            for x in 0..size {
                sheet.set_pixel(x, y, [x as u8, y as u8, 7, 255]);
            }
        }
        sheet
    }

    fn tile_at_origin(flips: FlipFlags) -> TileRef {
        TileRef {
            tileset_index: 0,
            src_x: 0,
            src_y: 0,
            flips,
        }
    }

    #[test]
    fn half_alpha_green_over_opaque_red() {
        let mut dst = [255, 0, 0, 255];
        composite_pixel(&mut dst, [0, 255, 0, 128]);
        assert_eq!(dst, [127, 128, 0, 255]);
    }

    #[test]
    fn transparent_source_is_skipped_and_opaque_overwrites() {
        let mut dst = [10, 20, 30, 40];
        composite_pixel(&mut dst, [200, 200, 200, 0]);
        assert_eq!(dst, [10, 20, 30, 40]);

        composite_pixel(&mut dst, [1, 2, 3, 255]);
        assert_eq!(dst, [1, 2, 3, 255]);
    }

    #[test]
    fn partial_alpha_onto_transparent_keeps_source_color() {
        let mut dst = [0, 0, 0, 0];
        composite_pixel(&mut dst, [90, 60, 30, 64]);
        assert_eq!(dst, [90, 60, 30, 64]);
    }

    #[test]
    fn opaque_blit_is_idempotent() {
        let sheet = gradient_sheet(8);
        let tile = tile_at_origin(FlipFlags::NONE);
        let mut once = PixelBuffer::filled(8, 8, [5, 3, 3, 255]);
        blit_tile(&mut once, 0, 0, &sheet, &tile, 8);
        let mut twice = once.clone();
        blit_tile(&mut twice, 0, 0, &sheet, &tile, 8);
        assert_eq!(once, twice);
    }

    #[test]
    fn diagonal_horizontal_tile_lands_transposed_then_mirrored() {
        let size = 8;
        let sheet = gradient_sheet(size);
        let flips = FlipFlags::from_raw(FLIP_DIAGONAL | FLIP_HORIZONTAL);
        let mut dst = PixelBuffer::transparent(size, size);
        assert_eq!(
            blit_tile(&mut dst, 0, 0, &sheet, &tile_at_origin(flips), size),
            BlitOutcome::Drawn
        );

        for py in 0..size {
            for px in 0..size {
                let expected = sheet.pixel(size - 1 - py, px).expect("source pixel");
                assert_eq!(dst.pixel(px, py), Some(expected), "dest=({px},{py})");
            }
        }
        // Source pixel (3, 1) shows up at destination (1, size - 1 - 3).
        assert_eq!(dst.pixel(1, size - 1 - 3), sheet.pixel(3, 1));
    }

    #[test]
    fn out_of_bounds_source_skips_whole_tile() {
        let sheet = gradient_sheet(8);
        let tile = TileRef {
            tileset_index: 0,
            src_x: 4,
            src_y: 0,
            flips: FlipFlags::NONE,
        };
        let mut dst = PixelBuffer::transparent(8, 8);
        assert_eq!(
            blit_tile(&mut dst, 0, 0, &sheet, &tile, 8),
            BlitOutcome::SkippedOutOfBounds
        );
        assert_eq!(dst, PixelBuffer::transparent(8, 8));
    }

    #[test]
    fn destination_is_clipped() {
        let sheet = gradient_sheet(4);
        let tile = tile_at_origin(FlipFlags::NONE);
        let mut dst = PixelBuffer::transparent(4, 4);
        blit_tile(&mut dst, 2, -2, &sheet, &tile, 4);
        assert_eq!(dst.pixel(2, 0), sheet.pixel(0, 2));
        assert_eq!(dst.pixel(3, 1), sheet.pixel(1, 3));
        assert_eq!(dst.pixel(0, 0), Some([0, 0, 0, 0]));
    }
}
