//! Run orchestrator: discovery, optional diagnostic collection, per-file
//! step application, and backup + write (or preview).
//!
//! Files are independent, so they are processed on a rayon pool and the
//! per-file `RunStats` are merged afterwards. Within a file every selected
//! step runs to completion, in ascending priority, before the next one.

use crate::backup::{write_backup, BackupNaming};
use crate::diagnostics::{DiagnosticIndex, DiagnosticSource};
use crate::error::{CheckerError, EngineError, FileError};
use crate::models::{Cancelled, FileFailure, FileOutcome, FilePreview, RunStats};
use crate::output::unified_diff;
use crate::rules::{Catalog, FixStep};
use crate::transform::apply_step;
use crate::{discover, utils};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone)]
/// Immutable settings for one run.
pub struct RunConfig {
    pub target_path: PathBuf,
    pub include_extensions: Vec<String>,
    pub exclude_dirs: Vec<String>,
    pub dry_run: bool,
    pub verbose: bool,
    pub verify: bool,
    /// Step priorities to run; `None` runs all.
    pub selected_steps: Option<Vec<u32>>,
    /// Worker threads; 0 lets rayon decide.
    pub jobs: usize,
    /// Capture unified diffs for dry-run previews.
    pub diff: bool,
    pub backup: BackupNaming,
}

#[derive(Debug, Clone, Default)]
/// Cooperative cancellation flag, checked before each file.
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub stats: RunStats,
    /// Diagnostic count before any rewrite, when it could be collected.
    pub baseline: Option<usize>,
}

/// Drives a catalog over a target tree.
pub struct Engine<'a> {
    catalog: &'a Catalog,
    source: Option<&'a DiagnosticSource>,
    cancel: CancelToken,
}

struct FileJob<'a> {
    steps: &'a [&'a FixStep],
    index: &'a DiagnosticIndex,
    base: &'a Path,
    config: &'a RunConfig,
}

impl<'a> Engine<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self {
            catalog,
            source: None,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_source(mut self, source: &'a DiagnosticSource) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Execute one run. Only fatal conditions return `Err`, and they are
    /// all detected before any file is written.
    pub fn run(&self, config: &RunConfig) -> Result<RunOutcome, EngineError> {
        if !config.target_path.exists() {
            return Err(EngineError::TargetMissing(config.target_path.clone()));
        }
        let steps = self.catalog.steps_by_priority(config.selected_steps.as_deref())?;
        let scoped = steps.iter().any(|s| s.has_scoped_rules());

        let (index, baseline) = if scoped || config.verify {
            self.collect_baseline()?
        } else {
            (DiagnosticIndex::default(), None)
        };

        let files = discover::discover_files(
            &config.target_path,
            &config.include_extensions,
            &config.exclude_dirs,
        );
        let total = files.len();
        info!(files = total, steps = steps.len(), dry_run = config.dry_run, "starting run");

        let base = if config.target_path.is_file() {
            config
                .target_path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default()
        } else {
            config.target_path.clone()
        };
        let job = FileJob {
            steps: &steps,
            index: &index,
            base: &base,
            config,
        };

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.jobs)
            .build()
            .map_err(|e| EngineError::WorkerPool(e.to_string()))?;
        let mut stats = pool.install(|| {
            files
                .par_iter()
                .map(|path| {
                    if self.cancel.is_cancelled() {
                        return RunStats::default();
                    }
                    process_file(path, &job)
                })
                .reduce(RunStats::default, RunStats::merge)
        });
        stats.normalize();
        if self.cancel.is_cancelled() && stats.total_files < total {
            warn!(processed = stats.total_files, total, "run cancelled");
            stats.cancelled = Some(Cancelled {
                processed: stats.total_files,
                total,
            });
        }
        debug_assert!(stats.is_consistent());
        Ok(RunOutcome { stats, baseline })
    }

    /// Collect diagnostics once per run, before rewriting. The index only
    /// gates rules by file and code, so it stays valid across steps.
    /// A checker that cannot be
    /// started is fatal; timeouts and unparseable output degrade to an
    /// empty set so scoped rules simply do not fire.
    fn collect_baseline(&self) -> Result<(DiagnosticIndex, Option<usize>), EngineError> {
        let Some(source) = self.source else {
            warn!("diagnostic-scoped rules selected but no checker configured; they will be skipped");
            return Ok((DiagnosticIndex::default(), None));
        };
        match source.collect() {
            Ok(diags) => {
                info!(diagnostics = diags.len(), "baseline collected");
                Ok((DiagnosticIndex::build(source.root(), &diags), Some(diags.len())))
            }
            Err(e @ (CheckerError::Spawn { .. } | CheckerError::EmptyCommand)) => Err(e.into()),
            Err(e) => {
                warn!("diagnostic collection degraded: {e}");
                Ok((DiagnosticIndex::default(), None))
            }
        }
    }
}

fn process_file(path: &Path, job: &FileJob<'_>) -> RunStats {
    let shown = utils::rel_to(path, job.base);
    let bytes = match fs::read(path) {
        Ok(b) => b,
        Err(source) => return failed(&shown, FileError::Read { path: path.to_path_buf(), source }),
    };
    let original = match String::from_utf8(bytes.clone()) {
        Ok(s) => s,
        Err(e) => {
            let source = std::io::Error::new(std::io::ErrorKind::InvalidData, e);
            return failed(&shown, FileError::Read { path: path.to_path_buf(), source });
        }
    };

    let rel = path.strip_prefix(job.base).unwrap_or(path);
    let codes = job.index.codes_for(path);
    let mut outcome = FileOutcome::unchanged(original);
    let mut rule_failures = Vec::new();
    for step in job.steps {
        if step.fully_scoped() && !step.rules.iter().any(|r| r.accepts_codes(codes)) {
            debug!(step = %step.name, file = %shown, "no matching diagnostics; step skipped");
            continue;
        }
        let out = apply_step(step, &outcome.text, rel, path, codes);
        *outcome.step_counts.entry(step.name.clone()).or_insert(0) += out.total();
        for (rule, n) in out.counts {
            *outcome.fix_counts.entry(rule).or_insert(0) += n;
        }
        rule_failures.extend(out.failures.into_iter().map(|e| FileFailure {
            file: shown.clone(),
            message: e.to_string(),
        }));
        outcome.text = out.text;
    }
    outcome.modified = outcome.text != outcome.original;

    let mut stats = RunStats::from_outcome(&outcome, &shown);
    stats.rule_failures = rule_failures;
    if !outcome.modified {
        return stats;
    }

    if job.config.dry_run {
        debug!(file = %shown, fixes = outcome.total_fixes(), "would modify");
        if job.config.diff {
            stats.previews.push(FilePreview {
                file: shown,
                diff: unified_diff(&outcome.original, &outcome.text),
            });
        }
        return stats;
    }

    let backup = match write_backup(path, &bytes, &job.config.backup) {
        Ok(b) => b,
        Err(source) => return failed(&shown, FileError::Backup { path: path.to_path_buf(), source }),
    };
    if let Err(source) = fs::write(path, outcome.text.as_bytes()) {
        return failed(&shown, FileError::Write { path: path.to_path_buf(), source });
    }
    debug!(file = %shown, backup = %backup.backup_path.display(), "written");
    stats.backups.push(backup);
    stats
}

fn failed(shown: &str, err: FileError) -> RunStats {
    error!("{err}");
    RunStats::from_failure(shown, err.to_string())
}
