use std::io;
use std::path::{Path, PathBuf};

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, ImageError, ImageReader};
use thiserror::Error;

use super::blit::composite_pixel;

#[derive(Debug, Error)]
pub enum ImageLoadError {
    #[error("failed to open image {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to decode image {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: ImageError,
    },
}

/// Straight (non-premultiplied) RGBA8 image, rows top to bottom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl PixelBuffer {
    pub fn filled(width: u32, height: u32, color: [u8; 4]) -> Self {
        let pixel_count = width as usize * height as usize;
        let mut rgba = Vec::with_capacity(pixel_count * 4);
        for _ in 0..pixel_count {
            rgba.extend_from_slice(&color);
        }
        Self {
            width,
            height,
            rgba,
        }
    }

    pub fn transparent(width: u32, height: u32) -> Self {
        Self::filled(width, height, [0, 0, 0, 0])
    }

    /// Wraps raw RGBA bytes; `None` when the length does not match the size.
    pub fn from_rgba(width: u32, height: u32, rgba: Vec<u8>) -> Option<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)?
            .checked_mul(4)?;
        (rgba.len() == expected).then_some(Self {
            width,
            height,
            rgba,
        })
    }

    pub fn load_png(path: &Path) -> Result<Self, ImageLoadError> {
        let reader = ImageReader::open(path).map_err(|source| ImageLoadError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let decoded = reader.decode().map_err(|source| ImageLoadError::Decode {
            path: path.to_path_buf(),
            source,
        })?;
        let image = decoded.to_rgba8();
        Ok(Self {
            width: image.width(),
            height: image.height(),
            rgba: image.into_raw(),
        })
    }

    pub fn decode_png(bytes: &[u8]) -> Result<Self, ImageError> {
        let image = image::load_from_memory_with_format(bytes, image::ImageFormat::Png)?.to_rgba8();
        Ok(Self {
            width: image.width(),
            height: image.height(),
            rgba: image.into_raw(),
        })
    }

    pub fn encode_png(&self) -> Result<Vec<u8>, ImageError> {
        let mut bytes = Vec::new();
        PngEncoder::new(&mut bytes).write_image(
            &self.rgba,
            self.width,
            self.height,
            ExtendedColorType::Rgba8,
        )?;
        Ok(bytes)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn as_rgba(&self) -> &[u8] {
        &self.rgba
    }

    fn offset(&self, x: u32, y: u32) -> Option<usize> {
        if x >= self.width || y >= self.height {
            return None;
        }
        (y as usize)
            .checked_mul(self.width as usize)
            .and_then(|row| row.checked_add(x as usize))
            .and_then(|pixel| pixel.checked_mul(4))
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        let offset = self.offset(x, y)?;
        let bytes = self.rgba.get(offset..offset + 4)?;
        Some([bytes[0], bytes[1], bytes[2], bytes[3]])
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, color: [u8; 4]) {
        if let Some(offset) = self.offset(x, y) {
            self.rgba[offset..offset + 4].copy_from_slice(&color);
        }
    }

    /// Source-over blend at a signed position; out-of-range positions are ignored.
    pub fn blend_pixel(&mut self, x: i64, y: i64, color: [u8; 4]) {
        if x < 0 || y < 0 || x > i64::from(u32::MAX) || y > i64::from(u32::MAX) {
            return;
        }
        let Some(offset) = self.offset(x as u32, y as u32) else {
            return;
        };
        let mut dst = [
            self.rgba[offset],
            self.rgba[offset + 1],
            self.rgba[offset + 2],
            self.rgba[offset + 3],
        ];
        composite_pixel(&mut dst, color);
        self.rgba[offset..offset + 4].copy_from_slice(&dst);
    }

    pub fn fill(&mut self, color: [u8; 4]) {
        for pixel in self.rgba.chunks_exact_mut(4) {
            pixel.copy_from_slice(&color);
        }
    }

    /// Overwrites every pixel with `src`; returns `false` and leaves `self`
    /// untouched when the sizes differ.
    pub fn copy_from(&mut self, src: &PixelBuffer) -> bool {
        if src.width != self.width || src.height != self.height {
            return false;
        }
        self.rgba.copy_from_slice(&src.rgba);
        true
    }

    /// Whether any pixel in rows `[y, y + rows)` has non-zero alpha.
    pub fn rows_have_content(&self, y: u32, rows: u32) -> bool {
        let end = y.saturating_add(rows).min(self.height);
        if y >= end {
            return false;
        }
        let row_bytes = self.width as usize * 4;
        let start = y as usize * row_bytes;
        let stop = end as usize * row_bytes;
        self.rgba[start..stop]
            .chunks_exact(4)
            .any(|pixel| pixel[3] > 0)
    }

    /// Copies a horizontal band of full-width rows; rows past the bottom are clipped.
    pub fn row_band(&self, y: u32, rows: u32) -> Self {
        let end = y.saturating_add(rows).min(self.height);
        let band_height = end.saturating_sub(y);
        let row_bytes = self.width as usize * 4;
        let start = y as usize * row_bytes;
        let rgba = if band_height == 0 {
            Vec::new()
        } else {
            self.rgba[start..start + band_height as usize * row_bytes].to_vec()
        };
        Self {
            width: self.width,
            height: band_height,
            rgba,
        }
    }

    /// Blends `src` onto `self` with its top-left at `(x, y)`, clipped.
    pub fn draw_image(&mut self, src: &PixelBuffer, x: i64, y: i64) {
        for sy in 0..src.height {
            for sx in 0..src.width {
                if let Some(color) = src.pixel(sx, sy) {
                    self.blend_pixel(x + i64::from(sx), y + i64::from(sy), color);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn from_rgba_rejects_wrong_length() {
        assert!(PixelBuffer::from_rgba(2, 2, vec![0; 15]).is_none());
        assert!(PixelBuffer::from_rgba(2, 2, vec![0; 16]).is_some());
    }

    #[test]
    fn png_round_trip_keeps_pixels() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("tile.png");
        let mut image = PixelBuffer::transparent(3, 2);
        image.set_pixel(1, 1, [10, 20, 30, 128]);
        std::fs::write(&path, image.encode_png().expect("encode")).expect("write");

        let loaded = PixelBuffer::load_png(&path).expect("load");
        assert_eq!(loaded, image);
    }

    #[test]
    fn missing_file_reports_open_error() {
        let temp = TempDir::new().expect("tempdir");
        let error = PixelBuffer::load_png(&temp.path().join("nope.png")).expect_err("missing");
        assert!(matches!(error, ImageLoadError::Open { .. }));
    }

    #[test]
    fn row_content_and_bands() {
        let mut image = PixelBuffer::transparent(4, 6);
        image.set_pixel(2, 4, [1, 1, 1, 1]);
        assert!(!image.rows_have_content(0, 3));
        assert!(image.rows_have_content(3, 3));

        let band = image.row_band(3, 3);
        assert_eq!((band.width(), band.height()), (4, 3));
        assert_eq!(band.pixel(2, 1), Some([1, 1, 1, 1]));
        assert_eq!(image.row_band(5, 3).height(), 1);
    }

    #[test]
    fn draw_image_clips_and_blends() {
        let mut dst = PixelBuffer::filled(2, 2, [0, 0, 0, 255]);
        let src = PixelBuffer::filled(2, 2, [255, 255, 255, 255]);
        dst.draw_image(&src, 1, 1);
        assert_eq!(dst.pixel(0, 0), Some([0, 0, 0, 255]));
        assert_eq!(dst.pixel(1, 1), Some([255, 255, 255, 255]));
    }
}
