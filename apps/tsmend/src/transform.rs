//! File transformer: applies one step's rules to one file's text.
//!
//! Rules run in declaration order and each sees the previous rule's output.
//! A match counts as a fix only when its replacement differs from the
//! matched text, which keeps counts at zero for already-fixed input.

use crate::error::RuleError;
use crate::rules::{FixRule, FixStep};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use tracing::{debug, error};

#[derive(Debug, Clone, PartialEq, Eq)]
/// Output of one step over one file.
pub struct StepOutput {
    pub text: String,
    /// rule name -> fixes; present (possibly zero) for every rule that ran.
    pub counts: BTreeMap<String, usize>,
    pub failures: Vec<RuleError>,
}

impl StepOutput {
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }
}

/// Apply `step` to `text`.
///
/// `rel` is the path relative to the target root and `full` the on-disk
/// path; both are offered to rule file filters. `codes` holds the file's
/// outstanding diagnostic codes (`None` when none were collected).
pub fn apply_step(
    step: &FixStep,
    text: &str,
    rel: &Path,
    full: &Path,
    codes: Option<&HashSet<String>>,
) -> StepOutput {
    let mut current = text.to_string();
    let mut counts = BTreeMap::new();
    let mut failures = Vec::new();
    for rule in &step.rules {
        if !rule.accepts_path(rel, full) || !rule.accepts_codes(codes) {
            continue;
        }
        match apply_rule(rule, &current) {
            Ok((next, n)) => {
                if n > 0 {
                    debug!(rule = %rule.name, file = %rel.display(), fixes = n, "rule applied");
                    current = next;
                }
                *counts.entry(rule.name.clone()).or_insert(0) += n;
            }
            Err(e) => {
                error!(file = %rel.display(), "{e}");
                counts.entry(rule.name.clone()).or_insert(0);
                failures.push(e);
            }
        }
    }
    StepOutput {
        text: current,
        counts,
        failures,
    }
}

/// Replace every non-overlapping match of `rule` in `text`.
///
/// All-or-nothing: if the transform fails on any match the text is left
/// as it was.
fn apply_rule(rule: &FixRule, text: &str) -> Result<(String, usize), RuleError> {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    let mut count = 0;
    for caps in rule.pattern.captures_iter(text) {
        let Some(m) = caps.get(0) else { continue };
        let replacement = rule
            .transform
            .replacement(&caps)
            .map_err(|msg| RuleError::new(&rule.name, msg))?;
        out.push_str(&text[last..m.start()]);
        if replacement != m.as_str() {
            count += 1;
        }
        out.push_str(&replacement);
        last = m.end();
    }
    if count == 0 {
        return Ok((text.to_string(), 0));
    }
    out.push_str(&text[last..]);
    Ok((out, count))
}
