//! tsmend core library.
//!
//! This crate exposes programmatic APIs for rewriting a TypeScript tree with
//! ordered, regex-based fix steps, optionally gated and verified by the
//! diagnostics of an external type checker.
//!
//! High-level modules:
//! - `cli`: CLI argument parsing (binary uses this).
//! - `config`: Discovery and effective configuration resolution.
//! - `diagnostics`: Checker subprocess, output parsing, per-file code index.
//! - `rules`: Fix rules, steps, and the catalog (built-in or TOML).
//! - `transform`: Applying one step's rules to a file's text.
//! - `fix`: The run orchestrator (discovery, backups, writes, stats).
//! - `verify`: Post-run diagnostic comparison.
//! - `models`: Diagnostics, per-file outcomes, run statistics.
//! - `output`: Human/JSON printers for run, steps, and check.
//! - `discover`, `backup`, `error`, `utils`: Supporting pieces.
pub mod backup;
pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod discover;
pub mod error;
pub mod fix;
pub mod models;
pub mod output;
pub mod rules;
pub mod transform;
pub mod utils;
pub mod verify;
