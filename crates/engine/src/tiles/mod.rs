mod blit;
mod gid;
mod pixel_buffer;
mod registry;

pub use blit::{blit_tile, composite_pixel, BlitOutcome};
pub use gid::{
    clean_id, is_empty_cell, is_marked_cell, CellResolution, FlipFlags, GidResolver, TileRef,
    FLIP_DIAGONAL, FLIP_HORIZONTAL, FLIP_VERTICAL,
};
pub use pixel_buffer::{ImageLoadError, PixelBuffer};
pub use registry::{RegistryError, TilesetDescriptor, TilesetRegistry};
