//! Shared data models for diagnostics, per-file outcomes, and run statistics.

pub mod catalog;

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
/// One problem reported by the external checker.
pub struct Diagnostic {
    /// Path exactly as printed by the checker (usually project-relative).
    pub file: String,
    pub line: u32,
    pub column: u32,
    /// Opaque category tag, e.g. `TS2339`.
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone)]
/// Result of running every selected step over a single file.
pub struct FileOutcome {
    pub original: String,
    pub text: String,
    pub modified: bool,
    /// rule name -> applied fixes
    pub fix_counts: BTreeMap<String, usize>,
    /// step name -> applied fixes
    pub step_counts: BTreeMap<String, usize>,
}

impl FileOutcome {
    pub fn unchanged(text: String) -> Self {
        Self {
            original: text.clone(),
            text,
            modified: false,
            fix_counts: BTreeMap::new(),
            step_counts: BTreeMap::new(),
        }
    }

    pub fn total_fixes(&self) -> usize {
        self.fix_counts.values().sum()
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
/// A copy of pre-run bytes written before an overwrite.
pub struct Backup {
    pub original_path: PathBuf,
    pub backup_path: PathBuf,
    #[serde(skip)]
    pub content: Vec<u8>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct FileFailure {
    pub file: String,
    pub message: String,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct FilePreview {
    pub file: String,
    pub diff: String,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled {
    pub processed: usize,
    pub total: usize,
}

#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
/// Aggregated statistics. Built by reducing `FileOutcome`s with `merge`,
/// which is associative and commutative.
pub struct RunStats {
    pub total_files: usize,
    pub files_modified: usize,
    pub files_skipped: usize,
    pub files_errored: usize,
    pub total_fixes: usize,
    pub fixes_by_step: BTreeMap<String, usize>,
    pub fixes_by_rule: BTreeMap<String, usize>,
    pub modified_files: Vec<String>,
    pub backups: Vec<Backup>,
    pub errors: Vec<FileFailure>,
    /// Rules whose transform failed on a file; the file itself was processed.
    pub rule_failures: Vec<FileFailure>,
    pub previews: Vec<FilePreview>,
    pub cancelled: Option<Cancelled>,
}

impl RunStats {
    /// Statistics contributed by one successfully processed file, listed
    /// under `file`.
    pub fn from_outcome(outcome: &FileOutcome, file: &str) -> Self {
        let mut stats = RunStats {
            total_files: 1,
            total_fixes: outcome.total_fixes(),
            fixes_by_rule: outcome.fix_counts.clone(),
            fixes_by_step: outcome.step_counts.clone(),
            ..Default::default()
        };
        if outcome.modified {
            stats.files_modified = 1;
            stats.modified_files.push(file.to_string());
        } else {
            stats.files_skipped = 1;
        }
        stats
    }

    /// Statistics contributed by a file that failed; its fixes are excluded.
    pub fn from_failure(file: &str, message: String) -> Self {
        RunStats {
            total_files: 1,
            files_errored: 1,
            errors: vec![FileFailure {
                file: file.to_string(),
                message,
            }],
            ..Default::default()
        }
    }

    pub fn merge(mut self, other: RunStats) -> RunStats {
        self.total_files += other.total_files;
        self.files_modified += other.files_modified;
        self.files_skipped += other.files_skipped;
        self.files_errored += other.files_errored;
        self.total_fixes += other.total_fixes;
        for (k, v) in other.fixes_by_step {
            *self.fixes_by_step.entry(k).or_default() += v;
        }
        for (k, v) in other.fixes_by_rule {
            *self.fixes_by_rule.entry(k).or_default() += v;
        }
        self.modified_files.extend(other.modified_files);
        self.backups.extend(other.backups);
        self.errors.extend(other.errors);
        self.rule_failures.extend(other.rule_failures);
        self.previews.extend(other.previews);
        self.cancelled = self.cancelled.or(other.cancelled);
        self
    }

    /// Sort list-valued fields by file so output does not depend on worker order.
    pub fn normalize(&mut self) {
        self.modified_files.sort();
        self.backups.sort_by(|a, b| a.original_path.cmp(&b.original_path));
        self.errors.sort_by(|a, b| a.file.cmp(&b.file).then(a.message.cmp(&b.message)));
        self.rule_failures
            .sort_by(|a, b| a.file.cmp(&b.file).then(a.message.cmp(&b.message)));
        self.previews.sort_by(|a, b| a.file.cmp(&b.file));
    }

    /// `sum(fixes_by_rule) == total_fixes == sum(fixes_by_step)`
    pub fn is_consistent(&self) -> bool {
        let by_rule: usize = self.fixes_by_rule.values().sum();
        let by_step: usize = self.fixes_by_step.values().sum();
        by_rule == self.total_fixes && by_step == self.total_fixes
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
/// Before/after diagnostic counts from the verifier.
pub struct Verification {
    pub previous_count: usize,
    pub new_count: usize,
    pub resolved_count: usize,
    pub success: bool,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum VerifyStatus {
    Done(Verification),
    Skipped { reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(rule: &str, step: &str, n: usize) -> FileOutcome {
        let mut o = FileOutcome::unchanged("x".into());
        if n > 0 {
            o.text = "y".into();
            o.modified = true;
            o.fix_counts.insert(rule.into(), n);
            o.step_counts.insert(step.into(), n);
        }
        o
    }

    #[test]
    fn merge_is_order_independent() {
        let parts = vec![
            RunStats::from_outcome(&outcome("r1", "s1", 2), "a.ts"),
            RunStats::from_outcome(&outcome("r2", "s1", 1), "b.ts"),
            RunStats::from_outcome(&outcome("r1", "s2", 0), "c.ts"),
            RunStats::from_failure("d.ts", "boom".into()),
        ];
        let mut fwd = parts.iter().cloned().fold(RunStats::default(), RunStats::merge);
        let mut rev = parts.into_iter().rev().fold(RunStats::default(), RunStats::merge);
        fwd.normalize();
        rev.normalize();
        assert_eq!(fwd, rev);
        assert_eq!(fwd.total_files, 4);
        assert_eq!(fwd.files_modified, 2);
        assert_eq!(fwd.files_skipped, 1);
        assert_eq!(fwd.files_errored, 1);
        assert_eq!(fwd.fixes_by_rule.get("r1"), Some(&2));
        assert!(fwd.is_consistent());
    }
}
