//! Report rendering for `run`, `steps`, and `check`.
//!
//! Supports `human` (default) and `json` outputs. Renderers are pure and
//! return strings; the `print_*` wrappers only write them to stdout.

use crate::fix::RunConfig;
use crate::models::{Diagnostic, RunStats, VerifyStatus};
use crate::rules::{Catalog, FixStep};
use owo_colors::OwoColorize;
use serde_json::json;
use serde_json::Value as JsonVal;
use similar::{ChangeTag, TextDiff};
use std::fmt::Write as _;

/// Everything a run report is derived from.
pub struct RunReport<'a> {
    pub config: &'a RunConfig,
    pub steps: &'a [&'a FixStep],
    pub stats: &'a RunStats,
    pub verification: Option<&'a VerifyStatus>,
}

fn paint(s: &str, color: bool, f: impl Fn(&str) -> String) -> String {
    if color {
        f(s)
    } else {
        s.to_string()
    }
}

/// Print a run report in the requested format.
pub fn print_run(report: &RunReport<'_>, output: &str) {
    match output {
        "json" => println!(
            "{}",
            serde_json::to_string_pretty(&compose_run_json(report)).unwrap_or_default()
        ),
        _ => print!("{}", render_run(report, crate::utils::use_colors(output))),
    }
}

/// Human-readable run report.
pub fn render_run(report: &RunReport<'_>, color: bool) -> String {
    let cfg = report.config;
    let stats = report.stats;
    let mut out = String::new();

    let _ = writeln!(out, "{}", paint("Configuration", color, |s| s.bold().to_string()));
    let _ = writeln!(out, "  path:     {}", cfg.target_path.display());
    let _ = writeln!(out, "  mode:     {}", if cfg.dry_run { "dry run" } else { "write" });
    let _ = writeln!(out, "  include:  {}", cfg.include_extensions.join(", "));
    let step_list: Vec<String> = report
        .steps
        .iter()
        .map(|s| format!("{} {}", s.priority, s.name))
        .collect();
    let _ = writeln!(out, "  steps:    {}", step_list.join(", "));
    let _ = writeln!(out, "  verify:   {}", if cfg.verify { "yes" } else { "no" });
    out.push('\n');

    for step in report.steps {
        let n = stats.fixes_by_step.get(&step.name).copied().unwrap_or(0);
        let head = format!("[{}] {}: {} fix(es)", step.priority, step.name, n);
        let _ = writeln!(out, "{}", paint(&head, color, |s| s.cyan().bold().to_string()));
        for rule in &step.rules {
            let c = stats.fixes_by_rule.get(&rule.name).copied().unwrap_or(0);
            if c > 0 || cfg.verbose {
                let _ = writeln!(out, "    {:<40} {}", rule.name, c);
            }
        }
    }

    if !stats.modified_files.is_empty() {
        out.push('\n');
        let label = if cfg.dry_run { "would modify:" } else { "modified:" };
        for f in &stats.modified_files {
            let _ = writeln!(out, "{} {}", paint(label, color, |s| s.green().bold().to_string()), f);
        }
    }
    if cfg.verbose {
        for b in &stats.backups {
            let _ = writeln!(out, "  backup: {}", b.backup_path.display());
        }
    }
    for p in &stats.previews {
        let _ = writeln!(out, "{} {}\n{}", paint("---", color, |s| s.cyan().bold().to_string()), p.file, p.diff);
    }
    for e in &stats.errors {
        let _ = writeln!(out, "{} {}: {}", paint("✖", color, |s| s.red().to_string()), e.file, e.message);
    }
    for e in &stats.rule_failures {
        let _ = writeln!(out, "{} {}: {}", paint("▲", color, |s| s.yellow().to_string()), e.file, e.message);
    }

    match report.verification {
        Some(VerifyStatus::Done(v)) => {
            let line = format!(
                "Verification: before={} after={} resolved={} ({})",
                v.previous_count,
                v.new_count,
                v.resolved_count,
                if v.success { "ok" } else { "regressed" }
            );
            let _ = writeln!(
                out,
                "\n{}",
                paint(&line, color, |s| if v.success {
                    s.green().to_string()
                } else {
                    s.red().to_string()
                })
            );
        }
        Some(VerifyStatus::Skipped { reason }) => {
            let _ = writeln!(out, "\nVerification skipped: {}", reason);
        }
        None => {}
    }

    let verb = if cfg.dry_run { "would_modify" } else { "modified" };
    let summary = format!(
        "— Summary — files={} {}={} skipped={} errored={} fixes={}",
        stats.total_files,
        verb,
        stats.files_modified,
        stats.files_skipped,
        stats.files_errored,
        stats.total_fixes
    );
    let _ = writeln!(out, "\n{}", paint(&summary, color, |s| s.bold().to_string()));
    if let Some(c) = stats.cancelled {
        let _ = writeln!(out, "cancelled after {}/{} files", c.processed, c.total);
    }
    out
}

/// Compose the run report as JSON (pure) for testing/snapshot purposes.
pub fn compose_run_json(report: &RunReport<'_>) -> JsonVal {
    let cfg = report.config;
    let steps: Vec<_> = report
        .steps
        .iter()
        .map(|s| {
            let rules: Vec<_> = s
                .rules
                .iter()
                .map(|r| {
                    json!({
                        "name": r.name,
                        "fixes": report.stats.fixes_by_rule.get(&r.name).copied().unwrap_or(0),
                    })
                })
                .collect();
            json!({
                "priority": s.priority,
                "name": s.name,
                "fixes": report.stats.fixes_by_step.get(&s.name).copied().unwrap_or(0),
                "rules": rules,
            })
        })
        .collect();
    json!({
        "config": {
            "path": cfg.target_path.to_string_lossy(),
            "dry_run": cfg.dry_run,
            "verify": cfg.verify,
            "include": cfg.include_extensions,
            "steps": cfg.selected_steps,
        },
        "steps": steps,
        "stats": report.stats,
        "verification": report.verification,
    })
}

/// Print the catalog listing for `tsmend steps`.
pub fn print_steps(catalog: &Catalog, output: &str) {
    match output {
        "json" => println!(
            "{}",
            serde_json::to_string_pretty(&compose_steps_json(catalog)).unwrap_or_default()
        ),
        _ => print!("{}", render_steps(catalog, crate::utils::use_colors(output))),
    }
}

pub fn render_steps(catalog: &Catalog, color: bool) -> String {
    let mut out = String::new();
    for s in catalog.all_steps() {
        let head = format!("[{}] {}", s.priority, s.name);
        let _ = writeln!(out, "{}", paint(&head, color, |x| x.bold().to_string()));
        if !s.description.is_empty() {
            let _ = writeln!(out, "    {}", s.description);
        }
        for r in &s.rules {
            let mut line = format!("    - {}", r.name);
            if let Some(f) = &r.file_filter {
                let _ = write!(line, " [files: {}]", f.as_str());
            }
            if r.is_scoped() {
                let codes: Vec<&str> = r.codes.iter().map(String::as_str).collect();
                let _ = write!(line, " [codes: {}]", codes.join(", "));
            }
            let _ = writeln!(out, "{}", line);
        }
    }
    out
}

pub fn compose_steps_json(catalog: &Catalog) -> JsonVal {
    let steps: Vec<_> = catalog
        .all_steps()
        .iter()
        .map(|s| {
            let rules: Vec<_> = s
                .rules
                .iter()
                .map(|r| {
                    json!({
                        "name": r.name,
                        "pattern": r.pattern.as_str(),
                        "files": r.file_filter.as_ref().map(|f| f.as_str()),
                        "codes": r.codes,
                    })
                })
                .collect();
            json!({
                "priority": s.priority,
                "name": s.name,
                "description": s.description,
                "rules": rules,
            })
        })
        .collect();
    json!({ "steps": steps })
}

/// Print `tsmend check` results: per-code counts and, when verbose, lines.
pub fn print_check(diagnostics: &[Diagnostic], summary: &[(String, usize)], output: &str, verbose: bool) {
    match output {
        "json" => {
            let by_code: Vec<_> = summary
                .iter()
                .map(|(code, n)| json!({"code": code, "count": n}))
                .collect();
            let out = json!({
                "total": diagnostics.len(),
                "by_code": by_code,
                "diagnostics": if verbose { Some(diagnostics) } else { None },
            });
            println!("{}", serde_json::to_string_pretty(&out).unwrap_or_default());
        }
        _ => {
            let color = crate::utils::use_colors(output);
            if verbose {
                for d in diagnostics {
                    println!("{}({},{}): {} {}", d.file, d.line, d.column, d.code, d.message);
                }
            }
            for (code, n) in summary {
                println!("  {:<10} {}", code, n);
            }
            let total = format!("— Summary — diagnostics={}", diagnostics.len());
            println!("{}", paint(&total, color, |s| s.bold().to_string()));
        }
    }
}

/// Unified diff between two texts with three lines of context.
pub fn unified_diff(original: &str, modified: &str) -> String {
    let diff = TextDiff::from_lines(original, modified);
    let mut output = String::new();
    for (idx, group) in diff.grouped_ops(3).iter().enumerate() {
        if idx > 0 {
            output.push_str("...\n");
        }
        for op in group {
            for change in diff.iter_changes(op) {
                let sign = match change.tag() {
                    ChangeTag::Delete => "-",
                    ChangeTag::Insert => "+",
                    ChangeTag::Equal => " ",
                };
                output.push_str(sign);
                output.push_str(change.value());
                if change.missing_newline() {
                    output.push('\n');
                }
            }
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::BackupNaming;
    use crate::models::{Cancelled, FileFailure, Verification};
    use crate::rules::builtin;
    use std::path::PathBuf;

    fn cfg(dry_run: bool) -> RunConfig {
        RunConfig {
            target_path: PathBuf::from("/proj"),
            include_extensions: vec!["ts".into()],
            exclude_dirs: vec![],
            dry_run,
            verbose: false,
            verify: true,
            selected_steps: None,
            jobs: 0,
            diff: false,
            backup: BackupNaming::Suffix("bak".into()),
        }
    }

    fn stats() -> RunStats {
        let mut s = RunStats {
            total_files: 4,
            files_modified: 1,
            files_skipped: 2,
            files_errored: 1,
            total_fixes: 3,
            modified_files: vec!["src/a.ts".into()],
            errors: vec![FileFailure {
                file: "bad.ts".into(),
                message: "read bad.ts: denied".into(),
            }],
            ..Default::default()
        };
        s.fixes_by_step.insert("Promise Patterns".into(), 3);
        s.fixes_by_rule.insert("Promise<T>.resolve() syntax".into(), 3);
        s
    }

    #[test]
    fn human_report_lists_steps_and_summary() {
        let cat = builtin::catalog().unwrap();
        let steps: Vec<_> = cat.all_steps().iter().collect();
        let stats = stats();
        let v = VerifyStatus::Done(Verification {
            previous_count: 10,
            new_count: 6,
            resolved_count: 4,
            success: true,
        });
        let config = cfg(true);
        let report = RunReport {
            config: &config,
            steps: &steps,
            stats: &stats,
            verification: Some(&v),
        };
        let text = render_run(&report, false);
        assert!(text.contains("mode:     dry run"));
        assert!(text.contains("[2] Promise Patterns: 3 fix(es)"));
        assert!(text.contains("Promise<T>.resolve() syntax"));
        // zero-count rules are hidden unless verbose
        assert!(!text.contains("Trailing whitespace"));
        assert!(text.contains("would modify: src/a.ts"));
        assert!(text.contains("bad.ts: read bad.ts: denied"));
        assert!(text.contains("before=10 after=6 resolved=4 (ok)"));
        assert!(text.contains("files=4 would_modify=1 skipped=2 errored=1 fixes=3"));
    }

    #[test]
    fn cancelled_runs_say_so() {
        let cat = builtin::catalog().unwrap();
        let steps: Vec<_> = cat.all_steps().iter().collect();
        let mut stats = stats();
        stats.cancelled = Some(Cancelled { processed: 2, total: 9 });
        let config = cfg(false);
        let report = RunReport {
            config: &config,
            steps: &steps,
            stats: &stats,
            verification: None,
        };
        let text = render_run(&report, false);
        assert!(text.contains("cancelled after 2/9 files"));
        assert!(text.contains("modified: src/a.ts"));
    }

    #[test]
    fn json_report_shape() {
        let cat = builtin::catalog().unwrap();
        let steps: Vec<_> = cat.all_steps().iter().collect();
        let stats = stats();
        let skipped = VerifyStatus::Skipped {
            reason: "dry run wrote nothing".into(),
        };
        let config = cfg(true);
        let report = RunReport {
            config: &config,
            steps: &steps,
            stats: &stats,
            verification: Some(&skipped),
        };
        let out = compose_run_json(&report);
        assert_eq!(out["config"]["dry_run"], true);
        assert_eq!(out["steps"][1]["name"], "Promise Patterns");
        assert_eq!(out["steps"][1]["fixes"], 3);
        assert_eq!(out["stats"]["total_fixes"], 3);
        assert_eq!(out["stats"]["fixes_by_rule"]["Promise<T>.resolve() syntax"], 3);
        assert_eq!(out["verification"]["status"], "skipped");
    }

    #[test]
    fn steps_listing_mentions_scopes() {
        let cat = builtin::catalog().unwrap();
        let text = render_steps(&cat, false);
        assert!(text.contains("[4] Missing Types"));
        assert!(text.contains("[codes: TS7006]"));
        assert!(text.contains("[files: **/*.tsx]"));
        let js = compose_steps_json(&cat);
        assert_eq!(js["steps"][0]["priority"], 1);
    }

    #[test]
    fn diff_marks_changes() {
        let d = unified_diff("line1\nold\nline3", "line1\nnew\nline3");
        assert!(d.contains("-old"));
        assert!(d.contains("+new"));
        assert!(unified_diff("same\n", "same\n").is_empty());
    }
}
