use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::config::render_default_config;
use crate::store::CatalogStore;

pub const STATE_DIR_NAME: &str = ".wikicatalog";
pub const DB_FILENAME: &str = "catalog.db";
pub const CONFIG_FILENAME: &str = "config.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSource {
    Flag,
    Env,
    Heuristic,
    Default,
}

impl ValueSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Flag => "flag",
            Self::Env => "env",
            Self::Heuristic => "heuristic",
            Self::Default => "default",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PathOverrides {
    pub project_root: Option<PathBuf>,
    pub db_path: Option<PathBuf>,
    pub config: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct ResolutionContext {
    pub cwd: PathBuf,
}

impl ResolutionContext {
    pub fn from_process() -> Result<Self> {
        let cwd = env::current_dir().context("failed to read current directory")?;
        Ok(Self { cwd })
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedPaths {
    pub project_root: PathBuf,
    pub state_dir: PathBuf,
    pub db_path: PathBuf,
    pub config_path: PathBuf,
    pub root_source: ValueSource,
    pub db_source: ValueSource,
    pub config_source: ValueSource,
}

impl ResolvedPaths {
    pub fn diagnostics(&self) -> String {
        format!(
            "project_root={} ({})\nstate_dir={}\ndb_path={} ({})\nconfig_path={} ({})",
            normalize_for_display(&self.project_root),
            self.root_source.as_str(),
            normalize_for_display(&self.state_dir),
            normalize_for_display(&self.db_path),
            self.db_source.as_str(),
            normalize_for_display(&self.config_path),
            self.config_source.as_str(),
        )
    }
}

#[derive(Debug, Clone)]
pub struct RuntimeStatus {
    pub state_dir_exists: bool,
    pub db_exists: bool,
    pub db_size_bytes: Option<u64>,
    pub config_exists: bool,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct InitReport {
    pub created_dirs: Vec<PathBuf>,
    pub wrote_config: bool,
    pub created_db: bool,
}

pub fn resolve_paths(
    context: &ResolutionContext,
    overrides: &PathOverrides,
) -> Result<ResolvedPaths> {
    resolve_paths_with_lookup(context, overrides, |key| env::var(key).ok())
}

fn resolve_paths_with_lookup<F>(
    context: &ResolutionContext,
    overrides: &PathOverrides,
    lookup_env: F,
) -> Result<ResolvedPaths>
where
    F: Fn(&str) -> Option<String>,
{
    let (project_root, root_source) = resolve_project_root(context, overrides, &lookup_env);
    let state_dir = project_root.join(STATE_DIR_NAME);

    let (db_path, db_source) = if let Some(path) = overrides.db_path.as_deref() {
        (absolutize(path, &project_root), ValueSource::Flag)
    } else if let Some(value) = non_empty(lookup_env("WIKICATALOG_DB")) {
        (
            absolutize(Path::new(&value), &project_root),
            ValueSource::Env,
        )
    } else {
        (state_dir.join("data").join(DB_FILENAME), ValueSource::Default)
    };

    let (config_path, config_source) = if let Some(path) = overrides.config.as_deref() {
        (absolutize(path, &project_root), ValueSource::Flag)
    } else if let Some(value) = non_empty(lookup_env("WIKICATALOG_CONFIG")) {
        (
            absolutize(Path::new(&value), &project_root),
            ValueSource::Env,
        )
    } else {
        (state_dir.join(CONFIG_FILENAME), ValueSource::Default)
    };

    Ok(ResolvedPaths {
        project_root,
        state_dir,
        db_path,
        config_path,
        root_source,
        db_source,
        config_source,
    })
}

pub fn init_layout(paths: &ResolvedPaths, force: bool) -> Result<InitReport> {
    let mut created_dirs = Vec::new();
    let mut required_dirs = vec![paths.state_dir.clone()];
    if let Some(parent) = paths.db_path.parent() {
        required_dirs.push(parent.to_path_buf());
    }

    for dir in &required_dirs {
        if !dir.exists() {
            fs::create_dir_all(dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
            created_dirs.push(dir.clone());
        }
    }

    let wrote_config = write_text_file(&paths.config_path, &render_default_config(), force)?;

    let created_db = !paths.db_path.exists();
    CatalogStore::open(&paths.db_path)?;

    Ok(InitReport {
        created_dirs,
        wrote_config,
        created_db,
    })
}

pub fn inspect_runtime(paths: &ResolvedPaths) -> Result<RuntimeStatus> {
    let state_dir_exists = paths.state_dir.exists();
    let config_exists = paths.config_path.exists();
    let db_exists = paths.db_path.exists();
    let db_size_bytes = if db_exists {
        let metadata = fs::metadata(&paths.db_path)
            .with_context(|| format!("failed to inspect {}", paths.db_path.display()))?;
        Some(metadata.len())
    } else {
        None
    };

    let mut warnings = Vec::new();
    if !db_exists {
        warnings.push(
            "catalog database is missing; run `wikicatalog init` or `wikicatalog ingest`"
                .to_string(),
        );
    }
    if !config_exists {
        warnings.push("config.toml is missing; built-in defaults are in effect".to_string());
    }

    Ok(RuntimeStatus {
        state_dir_exists,
        db_exists,
        db_size_bytes,
        config_exists,
        warnings,
    })
}

fn resolve_project_root<F>(
    context: &ResolutionContext,
    overrides: &PathOverrides,
    lookup_env: &F,
) -> (PathBuf, ValueSource)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(path) = overrides.project_root.as_deref() {
        return (absolutize(path, &context.cwd), ValueSource::Flag);
    }

    if let Some(value) = non_empty(lookup_env("WIKICATALOG_PROJECT_ROOT")) {
        return (
            absolutize(Path::new(&value), &context.cwd),
            ValueSource::Env,
        );
    }

    (detect_project_root_heuristic(&context.cwd), ValueSource::Heuristic)
}

/// Nearest ancestor of `cwd` holding a state dir, else `cwd` itself.
fn detect_project_root_heuristic(cwd: &Path) -> PathBuf {
    let mut seen = HashSet::new();
    for candidate in cwd.ancestors() {
        if !seen.insert(normalize_for_display(candidate)) {
            continue;
        }
        if candidate.join(STATE_DIR_NAME).is_dir() {
            return candidate.to_path_buf();
        }
    }
    cwd.to_path_buf()
}

fn absolutize(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn write_text_file(path: &Path, content: &str, force: bool) -> Result<bool> {
    if path.exists() && !force {
        return Ok(false);
    }

    let parent = path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("path has no parent: {}", path.display()))?;
    fs::create_dir_all(parent)
        .with_context(|| format!("failed to create parent directory {}", parent.display()))?;
    fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(true)
}

pub fn normalize_for_display(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
