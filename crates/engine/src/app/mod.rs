mod input;
mod loop_runner;
mod metrics;
mod rendering;
mod scene;

pub use input::InputAction;
pub use loop_runner::{run_app, run_app_with_metrics, AppError, LoopConfig};
pub use metrics::{LoopMetricsSnapshot, MetricsHandle};
pub use rendering::{
    load_images, plan_draw_order, DrawOp, ForegroundStrips, ImageRequest, Renderer, SceneImages,
    SceneView, SheetLayout, CAT_SHEET, PLAYER_SHEET,
};
pub use scene::{InputSnapshot, Scene, SceneCommand};
