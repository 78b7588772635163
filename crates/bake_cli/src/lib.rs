use std::io::{self, Write};
use std::path::PathBuf;

use engine::bake::{
    analyze_map, run_bake, BakeAction, BakeInputs, BakeSummary, CellRect, MapAnalysis,
    MarkerReport,
};
use engine::{load_scene_config, resolve_app_paths_with_root, AppPaths};
use tracing::info;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommonOptions {
    pub root: Option<PathBuf>,
    pub config: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Bake { force: bool },
    Report,
    Walkable,
}

impl CommandKind {
    fn name(self) -> &'static str {
        match self {
            CommandKind::Bake { .. } => "bake",
            CommandKind::Report => "report",
            CommandKind::Walkable => "walkable",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedArgs {
    Help,
    Run {
        kind: CommandKind,
        options: CommonOptions,
    },
}

pub fn parse_args(args: &[String]) -> Result<ParsedArgs, String> {
    if args.is_empty() {
        return Err(usage_text());
    }
    if args[0] == "-h" || args[0] == "--help" {
        return Ok(ParsedArgs::Help);
    }

    let mut options = CommonOptions::default();
    let mut index = 0usize;
    while index < args.len() {
        match args[index].as_str() {
            "--root" => {
                let value = args
                    .get(index + 1)
                    .ok_or_else(|| "missing value for --root".to_string())?;
                options.root = Some(PathBuf::from(value));
                index += 2;
            }
            "--config" => {
                let value = args
                    .get(index + 1)
                    .ok_or_else(|| "missing value for --config".to_string())?;
                options.config = Some(PathBuf::from(value));
                index += 2;
            }
            _ => break,
        }
    }

    let command = args
        .get(index)
        .ok_or_else(|| "missing subcommand".to_string())?
        .as_str();
    let command_args = &args[(index + 1)..];

    let kind = match command {
        "bake" => {
            let mut force = false;
            for arg in command_args {
                if arg == "--force" {
                    force = true;
                } else {
                    return Err(format!("unknown bake argument '{arg}' (expected --force)"));
                }
            }
            CommandKind::Bake { force }
        }
        "report" => {
            if !command_args.is_empty() {
                return Err("report takes no arguments".to_string());
            }
            CommandKind::Report
        }
        "walkable" => {
            if !command_args.is_empty() {
                return Err("walkable takes no arguments".to_string());
            }
            CommandKind::Walkable
        }
        other => return Err(format!("unknown subcommand '{other}'")),
    };

    Ok(ParsedArgs::Run { kind, options })
}

pub fn usage_text() -> String {
    [
        "bake_cli - offline scene compositor and marker report",
        "",
        "Usage:",
        "  bake_cli [--root <dir>] [--config <path>] bake [--force]",
        "  bake_cli [--root <dir>] [--config <path>] report",
        "  bake_cli [--root <dir>] [--config <path>] walkable",
        "",
        "Defaults:",
        "  --root     $COTTAGE_ROOT, else the nearest ancestor of the executable with Cargo.toml",
        "  --config   assets/config/scene.json under the root",
    ]
    .join("\n")
}

pub fn run<W: Write>(kind: CommandKind, opts: &CommonOptions, stdout: &mut W) -> Result<(), String> {
    let paths = resolve_paths(opts)?;
    let config = load_scene_config(&paths.config_path).map_err(|error| error.to_string())?;
    let inputs = BakeInputs {
        assets_dir: &paths.assets_dir,
        map_key: &config.map,
        tilesets: &config.tilesets,
        config: &config.bake,
    };
    info!(
        command = kind.name(),
        root = %paths.root.display(),
        map = %config.map,
        "bake_cli_command"
    );

    let written = match kind {
        CommandKind::Bake { force } => {
            let summary = run_bake(&inputs, force).map_err(|error| error.to_string())?;
            write_summary(stdout, &summary)
        }
        CommandKind::Report => {
            let analysis = analyze_map(&inputs).map_err(|error| error.to_string())?;
            write_analysis(stdout, &analysis)
        }
        CommandKind::Walkable => {
            let analysis = analyze_map(&inputs).map_err(|error| error.to_string())?;
            let grid = analysis.walkable.ok_or_else(|| {
                format!(
                    "map has no floor layer named '{}'",
                    config.bake.markers.floor_layer
                )
            })?;
            let rows = grid.to_rows();
            write_walkable(stdout, &rows, rows == config.walkable)
        }
    };
    written.map_err(|error| format!("failed to write output: {error}"))
}

fn resolve_paths(opts: &CommonOptions) -> Result<AppPaths, String> {
    let paths =
        resolve_app_paths_with_root(opts.root.as_deref()).map_err(|error| error.to_string())?;
    Ok(match &opts.config {
        Some(config) => paths.with_config_path(config),
        None => paths,
    })
}

fn write_summary<W: Write>(out: &mut W, summary: &BakeSummary) -> io::Result<()> {
    let action = match summary.action {
        BakeAction::Composited => "composited",
        BakeAction::UpToDate => "up to date",
    };
    writeln!(out, "bake: {action} ({})", summary.reason.label())?;
    writeln!(out, "output: {}", summary.output_dir.display())?;
    writeln!(out, "input hash: {}", summary.input_hash)?;
    let report = &summary.report;
    writeln!(
        out,
        "map: {}x{} tiles of {} px",
        report.map_width, report.map_height, report.tile_size
    )?;
    writeln!(out, "layers:")?;
    for layer in &report.layers {
        let target = layer.target.map_or("skipped", |target| target.as_str());
        writeln!(
            out,
            "  {} -> {target}: rendered {}, unresolved {}, missing image {}, out of bounds {}",
            layer.layer, layer.rendered, layer.unresolved, layer.missing_image, layer.out_of_bounds
        )?;
    }
    write_markers(out, &report.markers)
}

fn write_analysis<W: Write>(out: &mut W, analysis: &MapAnalysis) -> io::Result<()> {
    let map = &analysis.map;
    writeln!(
        out,
        "map: {}x{} tiles of {} px",
        map.width, map.height, map.tile_size
    )?;
    writeln!(out, "layers:")?;
    for layer in &map.layers {
        let marked = layer.cells.iter().filter(|cell| **cell != 0).count();
        writeln!(out, "  {} ({marked} non-empty cells)", layer.name)?;
    }
    write_markers(out, &analysis.markers)
}

fn write_markers<W: Write>(out: &mut W, markers: &MarkerReport) -> io::Result<()> {
    write_rects(out, "obstacles", &markers.obstacles)?;
    write_rects(out, "interactables", &markers.interactables)?;
    match &markers.floor {
        Some(floor) => writeln!(
            out,
            "floor: from row {}, {} tiles, {} blocked, {} walkable",
            floor.first_floor_row,
            floor.floor_tiles,
            floor.blocked_floor_tiles,
            floor.walkable_floor_tiles
        ),
        None => writeln!(out, "floor: layer missing"),
    }
}

fn write_rects<W: Write>(out: &mut W, label: &str, rects: &[CellRect]) -> io::Result<()> {
    writeln!(out, "{label}: {} rect(s)", rects.len())?;
    for rect in rects {
        writeln!(out, "  ({}, {}) {}x{}", rect.x, rect.y, rect.w, rect.h)?;
    }
    Ok(())
}

/// Prints the rows as a JSON array ready to paste into the scene config.
fn write_walkable<W: Write>(out: &mut W, rows: &[String], matches_config: bool) -> io::Result<()> {
    writeln!(out, "\"walkable\": [")?;
    for (index, row) in rows.iter().enumerate() {
        let separator = if index + 1 < rows.len() { "," } else { "" };
        writeln!(out, "  \"{row}\"{separator}")?;
    }
    writeln!(out, "]")?;
    let status = if matches_config {
        "matches the configured rows"
    } else {
        "differs from the configured rows"
    };
    writeln!(out, "# {status}")
}
