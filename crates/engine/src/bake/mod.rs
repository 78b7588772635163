mod atomic_io;
mod compositor;
mod hashing;
mod manifest;
mod markers;
mod pipeline;

pub use atomic_io::AtomicJsonError;
pub use compositor::{
    composite_layers, CompositeOutput, CompositeSettings, CompositeTarget, LayerReport,
    LayerSelection, DEFAULT_BACKGROUND_FILL,
};
pub use markers::{
    blocked_cells, collect_markers, derive_walkable_grid, extract_markers, floor_occupancy,
    group_into_rects, CellRect, FloorOccupancy, MarkerReport, MarkerSet, MarkerSettings,
    DEFAULT_FIRST_FLOOR_ROW,
};
pub use pipeline::{
    analyze_map, baked_dir, run_bake, BakeAction, BakeConfig, BakeInputs, BakePipelineError,
    BakeReason, BakeReport, BakeSummary, MapAnalysis, DEFAULT_OUTPUT_DIR, REPORT_FILE_NAME,
};
