use std::env;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

pub const ROOT_ENV_VAR: &str = "COTTAGE_ROOT";
pub const SCENE_CONFIG_RELATIVE_PATH: &str = "assets/config/scene.json";

/// Where the project root came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootSource {
    Explicit,
    Environment,
    ExecutableAncestor,
}

impl fmt::Display for RootSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RootSource::Explicit => "--root",
            RootSource::Environment => ROOT_ENV_VAR,
            RootSource::ExecutableAncestor => "executable location",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    pub root: PathBuf,
    pub assets_dir: PathBuf,
    pub config_path: PathBuf,
}

impl AppPaths {
    pub fn from_root(root: &Path) -> Self {
        let root = canonical_or_given(root);
        Self {
            assets_dir: root.join("assets"),
            config_path: root.join(SCENE_CONFIG_RELATIVE_PATH),
            root,
        }
    }

    /// Replaces the scene configuration path, resolving relative paths against the root.
    pub fn with_config_path(mut self, config_path: &Path) -> Self {
        self.config_path = if config_path.is_absolute() {
            config_path.to_path_buf()
        } else {
            self.root.join(config_path)
        };
        self
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to read environment variable COTTAGE_ROOT: {0}")]
    EnvVar(#[source] env::VarError),
    #[error("failed to locate the running executable: {0}")]
    CurrentExe(#[source] io::Error),
    #[error(
        "{source_kind} points at {path}, which is not a project root \
         (expected Cargo.toml next to crates/ or assets/)"
    )]
    InvalidRoot {
        path: PathBuf,
        source_kind: RootSource,
    },
    #[error(
        "no project root above {start_dir} (expected Cargo.toml next to crates/ or assets/); \
         set COTTAGE_ROOT, e.g. export COTTAGE_ROOT=\"/path/to/cottage\""
    )]
    RootNotFound { start_dir: PathBuf },
}

pub fn resolve_app_paths() -> Result<AppPaths, StartupError> {
    resolve_app_paths_with_root(None)
}

/// Like [`resolve_app_paths`], but an explicit root wins over the environment
/// and the executable location.
pub fn resolve_app_paths_with_root(explicit_root: Option<&Path>) -> Result<AppPaths, StartupError> {
    let (root, source) = locate_root(explicit_root)?;
    debug!(root = %root.display(), source = %source, "project_root_resolved");
    Ok(AppPaths::from_root(&root))
}

fn locate_root(explicit_root: Option<&Path>) -> Result<(PathBuf, RootSource), StartupError> {
    if let Some(root) = explicit_root {
        return checked_root(root, RootSource::Explicit);
    }
    match env::var(ROOT_ENV_VAR) {
        Ok(value) => checked_root(Path::new(&value), RootSource::Environment),
        Err(env::VarError::NotPresent) => {
            let exe = env::current_exe().map_err(StartupError::CurrentExe)?;
            let start_dir = exe.parent().unwrap_or(exe.as_path());
            start_dir
                .ancestors()
                .find(|candidate| looks_like_project_root(candidate))
                .map(|root| (canonical_or_given(root), RootSource::ExecutableAncestor))
                .ok_or_else(|| StartupError::RootNotFound {
                    start_dir: canonical_or_given(start_dir),
                })
        }
        Err(error) => Err(StartupError::EnvVar(error)),
    }
}

fn checked_root(path: &Path, source: RootSource) -> Result<(PathBuf, RootSource), StartupError> {
    let path = canonical_or_given(path);
    if looks_like_project_root(&path) {
        Ok((path, source))
    } else {
        Err(StartupError::InvalidRoot {
            path,
            source_kind: source,
        })
    }
}

fn looks_like_project_root(path: &Path) -> bool {
    path.join("Cargo.toml").is_file()
        && (path.join("crates").is_dir() || path.join("assets").is_dir())
}

fn canonical_or_given(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
