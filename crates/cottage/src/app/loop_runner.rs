use std::process::ExitCode;

use engine::run_app_with_metrics;
use tracing::{error, info};

use super::bootstrap::AppWiring;

pub(crate) fn run(app: AppWiring) -> ExitCode {
    let metrics = app.metrics.clone();
    if let Err(err) = run_app_with_metrics(app.config, app.scene, app.metrics) {
        error!(error = %err, "event_loop_failed");
        return ExitCode::FAILURE;
    }

    let last = metrics.snapshot();
    info!(fps = last.fps, tps = last.tps, "exited_cleanly");
    ExitCode::SUCCESS
}
