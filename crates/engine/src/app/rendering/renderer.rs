use std::sync::Arc;

use pixels::{Error, Pixels, SurfaceTexture, TextureError};
use winit::window::Window;

use crate::tiles::PixelBuffer;

/// Presents a fixed-size canvas, scaled to whatever size the window has.
pub struct Renderer {
    pixels: Pixels<'static>,
    canvas_width: u32,
    canvas_height: u32,
}

impl Renderer {
    pub fn new(window: Arc<Window>, canvas_width: u32, canvas_height: u32) -> Result<Self, Error> {
        let size = window.inner_size();
        let surface = SurfaceTexture::new(size.width.max(1), size.height.max(1), window);
        let pixels = Pixels::new(canvas_width, canvas_height, surface)?;
        Ok(Self {
            pixels,
            canvas_width,
            canvas_height,
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), TextureError> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.pixels.resize_surface(width, height)
    }

    /// Copies `canvas` into the frame and presents it. A canvas of the wrong size
    /// is copied row by row into the overlapping region.
    pub fn present(&mut self, canvas: &PixelBuffer) -> Result<(), Error> {
        let frame = self.pixels.frame_mut();
        if canvas.width() == self.canvas_width && canvas.height() == self.canvas_height {
            frame.copy_from_slice(canvas.as_rgba());
        } else {
            let frame_row = self.canvas_width as usize * 4;
            let canvas_row = canvas.width() as usize * 4;
            let copy_bytes = frame_row.min(canvas_row);
            let rows = self.canvas_height.min(canvas.height()) as usize;
            for row in 0..rows {
                let src = &canvas.as_rgba()[row * canvas_row..row * canvas_row + copy_bytes];
                frame[row * frame_row..row * frame_row + copy_bytes].copy_from_slice(src);
            }
        }
        self.pixels.render()
    }
}
