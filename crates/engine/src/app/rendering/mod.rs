mod depth_sort;
mod font;
mod hud;
mod renderer;
mod scene_view;
mod sprites;

pub use depth_sort::{plan_draw_order, DrawOp, ForegroundStrips};
pub use renderer::Renderer;
pub use scene_view::{SceneImages, SceneView};
pub use sprites::{load_images, ImageRequest, SheetLayout, CAT_SHEET, PLAYER_SHEET};
