//! Fix rules, fix steps, and the step catalog.
//!
//! A `FixRule` is a regex plus a `Transform` producing replacement text,
//! optionally gated by a file glob and a set of diagnostic codes. A
//! `FixStep` groups rules at one priority. The `Catalog` owns all steps in
//! ascending priority and is never mutated after construction.

pub mod builtin;

use crate::error::CatalogError;
use crate::models::catalog::CatalogFile;
use glob::{MatchOptions, Pattern};
use regex::{Captures, Regex};
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Closure form of a transform. `Err` carries a message and makes the rule
/// contribute nothing to the file being processed.
pub type TransformFn = dyn Fn(&Captures<'_>) -> Result<String, String> + Send + Sync;

#[derive(Clone)]
/// How a match is turned into replacement text.
pub enum Transform {
    /// Regex template: `$1`, `${name}` expand from captures.
    Template(String),
    /// Inserted verbatim.
    Literal(String),
    Func(Arc<TransformFn>),
}

impl Transform {
    pub fn func<F>(f: F) -> Self
    where
        F: Fn(&Captures<'_>) -> Result<String, String> + Send + Sync + 'static,
    {
        Transform::Func(Arc::new(f))
    }

    pub fn replacement(&self, caps: &Captures<'_>) -> Result<String, String> {
        match self {
            Transform::Template(t) => {
                let mut dst = String::new();
                caps.expand(t, &mut dst);
                Ok(dst)
            }
            Transform::Literal(s) => Ok(s.clone()),
            Transform::Func(f) => f(caps),
        }
    }
}

impl fmt::Debug for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transform::Template(t) => f.debug_tuple("Template").field(t).finish(),
            Transform::Literal(s) => f.debug_tuple("Literal").field(s).finish(),
            Transform::Func(_) => f.write_str("Func(..)"),
        }
    }
}

#[derive(Debug, Clone)]
/// A named, pure text transformation.
pub struct FixRule {
    pub name: String,
    pub pattern: Regex,
    pub transform: Transform,
    pub file_filter: Option<Pattern>,
    /// Empty means unconditional.
    pub codes: BTreeSet<String>,
}

impl FixRule {
    pub fn new(name: &str, pattern: &str, transform: Transform) -> Result<Self, CatalogError> {
        let pattern = Regex::new(pattern).map_err(|source| CatalogError::Pattern {
            rule: name.to_string(),
            source,
        })?;
        Ok(Self {
            name: name.to_string(),
            pattern,
            transform,
            file_filter: None,
            codes: BTreeSet::new(),
        })
    }

    pub fn with_files(mut self, glob: &str) -> Result<Self, CatalogError> {
        let pat = Pattern::new(glob).map_err(|source| CatalogError::FileFilter {
            rule: self.name.clone(),
            filter: glob.to_string(),
            source,
        })?;
        self.file_filter = Some(pat);
        Ok(self)
    }

    pub fn with_codes<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.codes.extend(codes.into_iter().map(Into::into));
        self
    }

    pub fn is_scoped(&self) -> bool {
        !self.codes.is_empty()
    }

    /// Whether the file filter (if any) admits `rel` (path relative to the
    /// target root) or, failing that, the full path.
    pub fn accepts_path(&self, rel: &Path, full: &Path) -> bool {
        match &self.file_filter {
            None => true,
            Some(p) => {
                let opts = MatchOptions::new();
                p.matches_path_with(rel, opts) || p.matches_path_with(full, opts)
            }
        }
    }

    /// Unscoped rules always pass; scoped rules need one matching code.
    pub fn accepts_codes(&self, outstanding: Option<&HashSet<String>>) -> bool {
        if !self.is_scoped() {
            return true;
        }
        outstanding
            .map(|set| self.codes.iter().any(|c| set.contains(c)))
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone)]
/// An ordered group of rules applied together at one priority.
pub struct FixStep {
    pub name: String,
    pub description: String,
    pub priority: u32,
    pub rules: Vec<FixRule>,
}

impl FixStep {
    pub fn new(name: &str, description: &str, priority: u32, rules: Vec<FixRule>) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            priority,
            rules,
        }
    }

    pub fn has_scoped_rules(&self) -> bool {
        self.rules.iter().any(FixRule::is_scoped)
    }

    /// True when every rule is diagnostic-scoped, so a file without
    /// matching diagnostics can skip the step entirely.
    pub fn fully_scoped(&self) -> bool {
        !self.rules.is_empty() && self.rules.iter().all(FixRule::is_scoped)
    }
}

#[derive(Debug, Clone)]
/// Immutable, priority-ordered set of steps.
pub struct Catalog {
    steps: Vec<FixStep>,
}

impl Catalog {
    /// Build a catalog, sorting by priority and rejecting duplicate
    /// priorities, step names, and rule names.
    pub fn new(mut steps: Vec<FixStep>) -> Result<Self, CatalogError> {
        steps.sort_by_key(|s| s.priority);
        for s in &steps {
            if s.name.trim().is_empty() {
                return Err(CatalogError::EmptyStepName(s.priority));
            }
            if s.rules.iter().any(|r| r.name.trim().is_empty()) {
                return Err(CatalogError::EmptyRuleName(s.name.clone()));
            }
        }
        let mut step_names = HashSet::new();
        let mut rule_names = HashSet::new();
        for s in &steps {
            if !step_names.insert(s.name.as_str()) {
                return Err(CatalogError::DuplicateStepName(s.name.clone()));
            }
            for r in &s.rules {
                if !rule_names.insert(r.name.as_str()) {
                    return Err(CatalogError::DuplicateRuleName(r.name.clone()));
                }
            }
        }
        for pair in steps.windows(2) {
            if pair[0].priority == pair[1].priority {
                return Err(CatalogError::DuplicatePriority {
                    priority: pair[0].priority,
                    first: pair[0].name.clone(),
                    second: pair[1].name.clone(),
                });
            }
        }
        Ok(Self { steps })
    }

    /// Load a catalog from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, CatalogError> {
        let src = fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&src, path)
    }

    pub fn from_toml_str(src: &str, origin: &Path) -> Result<Self, CatalogError> {
        let file: CatalogFile = toml::from_str(src).map_err(|e| CatalogError::Parse {
            path: origin.to_path_buf(),
            message: e.to_string(),
        })?;
        let mut steps = Vec::with_capacity(file.steps.len());
        for st in file.steps {
            let mut rules = Vec::with_capacity(st.rules.len());
            for rs in st.rules {
                let transform = if rs.literal {
                    Transform::Literal(rs.replace)
                } else {
                    Transform::Template(rs.replace)
                };
                let mut rule = FixRule::new(&rs.name, &rs.pattern, transform)?.with_codes(rs.codes);
                if let Some(glob) = rs.files.as_deref() {
                    rule = rule.with_files(glob)?;
                }
                rules.push(rule);
            }
            steps.push(FixStep::new(&st.name, &st.description, st.priority, rules));
        }
        Self::new(steps)
    }

    pub fn all_steps(&self) -> &[FixStep] {
        &self.steps
    }

    /// Steps restricted to `subset` (by priority), still in ascending order.
    /// `None` selects everything; unknown ids are an error.
    pub fn steps_by_priority(&self, subset: Option<&[u32]>) -> Result<Vec<&FixStep>, CatalogError> {
        let Some(ids) = subset else {
            return Ok(self.steps.iter().collect());
        };
        let mut unknown: Vec<u32> = ids
            .iter()
            .copied()
            .filter(|id| !self.steps.iter().any(|s| s.priority == *id))
            .collect();
        if !unknown.is_empty() {
            unknown.sort_unstable();
            unknown.dedup();
            return Err(CatalogError::UnknownSteps(unknown));
        }
        Ok(self
            .steps
            .iter()
            .filter(|s| ids.contains(&s.priority))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn rule(name: &str) -> FixRule {
        FixRule::new(name, "x", Transform::Literal("y".into())).unwrap()
    }

    #[test]
    fn catalog_sorts_and_selects_by_priority() {
        let cat = Catalog::new(vec![
            FixStep::new("late", "", 9, vec![rule("a")]),
            FixStep::new("early", "", 1, vec![rule("b")]),
            FixStep::new("mid", "", 4, vec![rule("c")]),
        ])
        .unwrap();
        let names: Vec<_> = cat.all_steps().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["early", "mid", "late"]);
        // selection order follows priority, not the order ids were given
        let picked = cat.steps_by_priority(Some(&[9, 1])).unwrap();
        let names: Vec<_> = picked.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["early", "late"]);
    }

    #[test]
    fn duplicate_priority_is_rejected() {
        let err = Catalog::new(vec![
            FixStep::new("one", "", 2, vec![]),
            FixStep::new("two", "", 2, vec![]),
        ])
        .unwrap_err();
        assert!(matches!(err, CatalogError::DuplicatePriority { priority: 2, .. }));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let err = Catalog::new(vec![
            FixStep::new("same", "", 1, vec![rule("a")]),
            FixStep::new("same", "", 2, vec![rule("b")]),
        ])
        .unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateStepName(ref n) if n == "same"));

        let err = Catalog::new(vec![
            FixStep::new("one", "", 1, vec![rule("a")]),
            FixStep::new("two", "", 2, vec![rule("b"), rule("a")]),
        ])
        .unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateRuleName(ref n) if n == "a"));
    }

    #[test]
    fn unknown_step_ids_are_reported() {
        let cat = Catalog::new(vec![FixStep::new("one", "", 1, vec![])]).unwrap();
        let err = cat.steps_by_priority(Some(&[1, 7, 3])).unwrap_err();
        assert!(matches!(err, CatalogError::UnknownSteps(ids) if ids == vec![3, 7]));
    }

    #[test]
    fn catalog_loads_from_toml() {
        let src = r#"
[[steps]]
name = "Quotes"
priority = 3

[[steps.rules]]
name = "double to single"
pattern = '"(\w+)"'
replace = "'$1'"
files = "src/**/*.ts"

[[steps.rules]]
name = "scoped"
pattern = 'foo'
replace = '$bar'
literal = true
codes = ["TS1005"]
"#;
        let cat = Catalog::from_toml_str(src, Path::new("fixes.toml")).unwrap();
        let step = &cat.all_steps()[0];
        assert_eq!(step.priority, 3);
        assert_eq!(step.rules.len(), 2);
        assert!(step.has_scoped_rules());
        assert!(!step.fully_scoped());
        let r = &step.rules[0];
        assert!(r.accepts_path(Path::new("src/a/b.ts"), &PathBuf::from("/x/src/a/b.ts")));
        assert!(!r.accepts_path(Path::new("lib/b.ts"), &PathBuf::from("/x/lib/b.ts")));
        assert!(matches!(step.rules[1].transform, Transform::Literal(ref s) if s == "$bar"));
    }

    #[test]
    fn bad_pattern_fails_loading() {
        let src = r#"
[[steps]]
name = "Broken"
priority = 1
[[steps.rules]]
name = "unclosed"
pattern = '(abc'
"#;
        let err = Catalog::from_toml_str(src, Path::new("fixes.toml")).unwrap_err();
        assert!(matches!(err, CatalogError::Pattern { ref rule, .. } if rule == "unclosed"));
    }

    #[test]
    fn scoped_rule_needs_matching_code() {
        let r = rule("r").with_codes(["E200"]);
        let mut codes = HashSet::new();
        assert!(!r.accepts_codes(None));
        codes.insert("E100".to_string());
        assert!(!r.accepts_codes(Some(&codes)));
        codes.insert("E200".to_string());
        assert!(r.accepts_codes(Some(&codes)));
        assert!(rule("free").accepts_codes(None));
    }
}
