//! Error types for the fix engine.
//!
//! `EngineError` and `ConfigError` are fatal. Everything else is absorbed by the
//! orchestrator, logged, and surfaced through `RunStats`.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Failures of the external checker invocation.
#[derive(Error, Debug)]
pub enum CheckerError {
    /// The checker command is empty in configuration.
    #[error("checker command is empty")]
    EmptyCommand,

    /// The process could not be started at all (binary missing, no permission).
    #[error("failed to start checker `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The process ran past its deadline and was killed.
    #[error("checker did not finish within {0:?}")]
    Timeout(Duration),

    /// Non-zero exit without a single parseable diagnostic line.
    #[error("checker exited with code {code:?} and produced no parseable diagnostics")]
    Unparseable { code: Option<i32> },

    /// Waiting on or reading from the child failed.
    #[error("checker I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A config file that exists but cannot be used.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config {path} is not valid: {message}")]
    Parse { path: PathBuf, message: String },
}

/// Problems found while loading or validating a rule catalog.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("catalog {path} is not valid: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("rule `{rule}` has an invalid pattern: {source}")]
    Pattern {
        rule: String,
        #[source]
        source: regex::Error,
    },

    #[error("rule `{rule}` has an invalid file filter `{filter}`: {source}")]
    FileFilter {
        rule: String,
        filter: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("steps `{first}` and `{second}` share priority {priority}")]
    DuplicatePriority {
        priority: u32,
        first: String,
        second: String,
    },

    #[error("step name `{0}` is used more than once")]
    DuplicateStepName(String),

    #[error("rule name `{0}` is used more than once")]
    DuplicateRuleName(String),

    #[error("step with priority {0} has an empty name")]
    EmptyStepName(u32),

    #[error("step `{0}` contains a rule with an empty name")]
    EmptyRuleName(String),

    #[error("unknown step id(s): {0:?}")]
    UnknownSteps(Vec<u32>),
}

/// A rule transform that refused to produce replacement text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("rule `{rule}` failed: {message}")]
pub struct RuleError {
    pub rule: String,
    pub message: String,
}

impl RuleError {
    pub fn new(rule: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            rule: rule.into(),
            message: message.into(),
        }
    }
}

/// Per-file recoverable failures.
#[derive(Error, Debug)]
pub enum FileError {
    #[error("read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("backup {path}: {source}")]
    Backup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Fatal errors: the run aborts before any file is touched.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("target path does not exist: {0}")]
    TargetMissing(PathBuf),

    #[error(transparent)]
    Checker(#[from] CheckerError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("failed to build worker pool: {0}")]
    WorkerPool(String),
}
