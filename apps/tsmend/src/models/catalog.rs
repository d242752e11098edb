//! Catalog schema: an external TOML file declaring fix steps and their rules.
//!
//! ```toml
//! [[steps]]
//! name = "Promise Patterns"
//! description = "Repair generic misuse on Promise statics"
//! priority = 2
//!
//! [[steps.rules]]
//! name = "Promise<T>.resolve() syntax"
//! pattern = 'Promise<[^<>()]+>\.resolve\('
//! replace = 'Promise.resolve('
//! files = "**/*.ts"        # optional glob
//! codes = ["TS2693"]       # optional diagnostic scope
//! literal = false          # optional: disable `$1` expansion
//! ```

use serde::Deserialize;

#[derive(Deserialize, Debug)]
/// Root of a catalog file.
pub struct CatalogFile {
    #[serde(default)]
    pub steps: Vec<StepSpec>,
}

#[derive(Deserialize, Debug)]
pub struct StepSpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub priority: u32,
    #[serde(default)]
    pub rules: Vec<RuleSpec>,
}

#[derive(Deserialize, Debug)]
pub struct RuleSpec {
    pub name: String,
    pub pattern: String,
    /// Replacement template; `$1`/`${name}` expand unless `literal` is set.
    #[serde(default)]
    pub replace: String,
    #[serde(default)]
    pub literal: bool,
    /// Glob matched against the file path relative to the target root.
    #[serde(default)]
    pub files: Option<String>,
    #[serde(default)]
    pub codes: Vec<String>,
}
