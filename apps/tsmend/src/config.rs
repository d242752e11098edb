//! Configuration discovery and effective settings resolution.
//!
//! tsmend reads `tsmend.toml|yaml|yml` from the repository root (or the
//! closest ancestor) and merges it with CLI flags to produce an
//! `Effective` config.
//! Defaults:
//! - `include`: `ts`, `tsx`
//! - `exclude_dirs`: `node_modules`, `vendor`, `dist`, `build`, `.git`, `coverage`
//! - `output`: `human`
//! - `dry_run|verbose|verify|strict|diff`: false
//! - `checker.command`: `npx tsc --noEmit --pretty false`, `checker.timeout_secs`: 300
//! - `backup.suffix`: unset (timestamped backups)
//!
//! Overrides precedence: CLI > config file > defaults.

use crate::backup::BackupNaming;
use crate::diagnostics::{CheckerCommand, DiagnosticSource};
use crate::discover::DEFAULT_EXCLUDE_DIRS;
use crate::error::{CatalogError, CheckerError, ConfigError};
use crate::fix::RunConfig;
use crate::rules::{builtin, Catalog};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CHECKER: &[&str] = &["npx", "tsc", "--noEmit", "--pretty", "false"];
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

#[derive(Debug, Default, Deserialize, Clone)]
/// `[checker]` section.
pub struct CheckerCfg {
    pub command: Option<Vec<String>>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize, Clone)]
/// `[backup]` section.
pub struct BackupCfg {
    /// Fixed suffix such as `bak`; absent means timestamped names.
    pub suffix: Option<String>,
}

#[derive(Debug, Default, Deserialize, Clone)]
/// Root configuration loaded from `tsmend.toml|yaml`.
pub struct TsmendConfig {
    pub path: Option<String>,
    pub include: Option<Vec<String>>,
    pub exclude_dirs: Option<Vec<String>>,
    pub dry_run: Option<bool>,
    pub verbose: Option<bool>,
    pub verify: Option<bool>,
    pub strict: Option<bool>,
    pub diff: Option<bool>,
    pub steps: Option<Vec<u32>>,
    pub jobs: Option<usize>,
    pub output: Option<String>,
    /// External catalog, relative to the repository root.
    pub catalog: Option<String>,
    pub backup: Option<BackupCfg>,
    pub checker: Option<CheckerCfg>,
}

#[derive(Debug, Default, Clone)]
/// Values supplied on the command line; `None`/empty means "not given".
pub struct CliOverrides {
    pub path: Option<String>,
    pub include: Vec<String>,
    pub dry_run: Option<bool>,
    pub verbose: Option<bool>,
    pub verify: Option<bool>,
    pub strict: Option<bool>,
    pub diff: Option<bool>,
    pub steps: Option<Vec<u32>>,
    pub jobs: Option<usize>,
    pub output: Option<String>,
    pub catalog: Option<String>,
}

#[derive(Debug, Clone)]
/// Fully-resolved configuration used by commands after applying precedence.
pub struct Effective {
    pub repo_root: PathBuf,
    pub config_found: bool,
    pub target_path: PathBuf,
    pub include: Vec<String>,
    pub exclude_dirs: Vec<String>,
    pub dry_run: bool,
    pub verbose: bool,
    pub verify: bool,
    pub strict: bool,
    pub diff: bool,
    pub steps: Option<Vec<u32>>,
    pub jobs: usize,
    pub output: String,
    pub catalog: Option<PathBuf>,
    pub backup_suffix: Option<String>,
    pub checker_command: Vec<String>,
    pub checker_timeout: Duration,
}

impl Effective {
    /// Engine-level settings for one run.
    pub fn run_config(&self) -> RunConfig {
        let backup = match &self.backup_suffix {
            Some(s) => BackupNaming::Suffix(s.clone()),
            None => BackupNaming::timestamp_now(),
        };
        RunConfig {
            target_path: self.target_path.clone(),
            include_extensions: self.include.clone(),
            exclude_dirs: self.exclude_dirs.clone(),
            dry_run: self.dry_run,
            verbose: self.verbose,
            verify: self.verify,
            selected_steps: self.steps.clone(),
            jobs: self.jobs,
            diff: self.diff,
            backup,
        }
    }

    pub fn diagnostic_source(&self) -> Result<DiagnosticSource, CheckerError> {
        let cmd = CheckerCommand::from_argv(&self.checker_command, self.checker_timeout)?;
        Ok(DiagnosticSource::new(cmd, self.repo_root.clone()))
    }

    /// External catalog when configured, otherwise the built-in one.
    pub fn load_catalog(&self) -> Result<Catalog, CatalogError> {
        match &self.catalog {
            Some(p) => Catalog::from_file(p),
            None => builtin::catalog(),
        }
    }
}

/// Walk upward from `start` to detect the repository root.
///
/// `start` is made absolute first. Stops when a `tsmend.toml|yaml|yml` or
/// a `.git` directory is found; falls back to `start` itself.
pub fn detect_repo_root(start: &Path) -> PathBuf {
    let start = absolute(start);
    let mut cur = start.as_path();
    loop {
        if CONFIG_FILES.iter().any(|f| cur.join(f).exists()) || cur.join(".git").exists() {
            return cur.to_path_buf();
        }
        match cur.parent() {
            Some(p) if !p.as_os_str().is_empty() => cur = p,
            _ => return start,
        }
    }
}

fn absolute(p: &Path) -> PathBuf {
    let p = if p.as_os_str().is_empty() { Path::new(".") } else { p };
    fs::canonicalize(p)
        .or_else(|_| std::env::current_dir().map(|cwd| cwd.join(p)))
        .unwrap_or_else(|_| p.to_path_buf())
}

const CONFIG_FILES: [&str; 3] = ["tsmend.toml", "tsmend.yaml", "tsmend.yml"];

/// Load `TsmendConfig` from `tsmend.toml` or `tsmend.yaml|yml`.
///
/// `Ok(None)` when no config file exists; a file that cannot be read or
/// parsed is an error.
pub fn load_config(root: &Path) -> Result<Option<TsmendConfig>, ConfigError> {
    let Some(path) = CONFIG_FILES.iter().map(|f| root.join(f)).find(|p| p.exists()) else {
        return Ok(None);
    };
    let src = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
        path: path.clone(),
        source,
    })?;
    let parsed = if path.extension().is_some_and(|e| e == "toml") {
        toml::from_str(&src).map_err(|e| e.to_string())
    } else {
        serde_yaml::from_str(&src).map_err(|e| e.to_string())
    };
    parsed
        .map(Some)
        .map_err(|message| ConfigError::Parse { path, message })
}

/// Resolve `Effective` by merging CLI flags, discovered config, and defaults.
/// A malformed config file is an error, never silently skipped.
pub fn resolve_effective(cli: &CliOverrides) -> Result<Effective, ConfigError> {
    let start = PathBuf::from(cli.path.as_deref().unwrap_or("."));
    let search_from = if start.is_file() {
        start.parent().map(Path::to_path_buf).unwrap_or_default()
    } else {
        start.clone()
    };
    let repo_root = detect_repo_root(&search_from);
    let loaded = load_config(&repo_root)?;
    let config_found = loaded.is_some();
    let cfg = loaded.unwrap_or_default();

    let target_path = match (&cli.path, &cfg.path) {
        (Some(_), _) => start,
        (None, Some(p)) => repo_root.join(p),
        (None, None) => repo_root.clone(),
    };

    let include = if !cli.include.is_empty() {
        cli.include.clone()
    } else {
        cfg.include
            .clone()
            .unwrap_or_else(|| vec!["ts".to_string(), "tsx".to_string()])
    };
    let exclude_dirs = cfg
        .exclude_dirs
        .clone()
        .unwrap_or_else(|| DEFAULT_EXCLUDE_DIRS.iter().map(|s| s.to_string()).collect());

    let dry_run = cli.dry_run.or(cfg.dry_run).unwrap_or(false);
    let verbose = cli.verbose.or(cfg.verbose).unwrap_or(false);
    let verify = cli.verify.or(cfg.verify).unwrap_or(false);
    let strict = cli.strict.or(cfg.strict).unwrap_or(false);
    let diff = cli.diff.or(cfg.diff).unwrap_or(false);
    let steps = cli.steps.clone().or(cfg.steps.clone());
    let jobs = cli.jobs.or(cfg.jobs).unwrap_or(0);
    let output = cli
        .output
        .clone()
        .or(cfg.output.clone())
        .unwrap_or_else(|| "human".to_string());

    // CLI catalog paths are relative to cwd; config ones to the repo root
    let catalog = cli
        .catalog
        .as_ref()
        .map(PathBuf::from)
        .or_else(|| cfg.catalog.as_ref().map(|c| repo_root.join(c)));

    let backup_suffix = cfg.backup.as_ref().and_then(|b| b.suffix.clone());
    let checker_command = cfg
        .checker
        .as_ref()
        .and_then(|c| c.command.clone())
        .unwrap_or_else(|| DEFAULT_CHECKER.iter().map(|s| s.to_string()).collect());
    let checker_timeout = Duration::from_secs(
        cfg.checker
            .as_ref()
            .and_then(|c| c.timeout_secs)
            .unwrap_or(DEFAULT_TIMEOUT_SECS),
    );

    Ok(Effective {
        repo_root,
        config_found,
        target_path,
        include,
        exclude_dirs,
        dry_run,
        verbose,
        verify,
        strict,
        diff,
        steps,
        jobs,
        output,
        catalog,
        backup_suffix,
        checker_command,
        checker_timeout,
    })
}
