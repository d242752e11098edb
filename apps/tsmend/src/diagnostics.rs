//! Diagnostic source: runs the external type-checker and parses its output.
//!
//! A non-zero exit is the normal outcome when diagnostics exist. Only a
//! failure to start, a timeout, or a non-zero exit with nothing parseable
//! are errors.
//!
//! Line grammar (non-pretty tsc output):
//! `path/to/file.ts(42,5): error TS2304: Cannot find name 'foo'.`

use crate::error::CheckerError;
use crate::models::Diagnostic;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

const ERROR_MARKER: &str = "): error ";

#[derive(Debug, Clone, PartialEq, Eq)]
/// External checker invocation.
pub struct CheckerCommand {
    pub program: String,
    pub args: Vec<String>,
    pub timeout: Duration,
}

impl CheckerCommand {
    /// Build from an argv list such as `["npx", "tsc", "--noEmit"]`.
    pub fn from_argv(argv: &[String], timeout: Duration) -> Result<Self, CheckerError> {
        let (program, args) = argv.split_first().ok_or(CheckerError::EmptyCommand)?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
            timeout,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Raw result of one checker process.
pub struct CheckerOutput {
    /// `None` when terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CheckerOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Run the checker in `cwd`, appending `files` to its arguments.
///
/// Drives the async runner on a private current-thread runtime.
pub fn run_checker(
    cmd: &CheckerCommand,
    cwd: &Path,
    files: &[PathBuf],
) -> Result<CheckerOutput, CheckerError> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    rt.block_on(run_checker_async(cmd, cwd, files))
}

async fn run_checker_async(
    cmd: &CheckerCommand,
    cwd: &Path,
    files: &[PathBuf],
) -> Result<CheckerOutput, CheckerError> {
    let mut command = Command::new(&cmd.program);
    command
        .args(&cmd.args)
        .args(files)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    // own group: on timeout, wrappers such as `npx` die with their children
    #[cfg(unix)]
    command.process_group(0);

    let child = command.spawn().map_err(|source| CheckerError::Spawn {
        program: cmd.program.clone(),
        source,
    })?;
    let pid = child.id();

    let started = Instant::now();
    match timeout(cmd.timeout, child.wait_with_output()).await {
        Ok(output) => {
            let o = output?;
            debug!(
                program = %cmd.program,
                code = ?o.status.code(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "checker finished"
            );
            Ok(CheckerOutput {
                exit_code: o.status.code(),
                stdout: String::from_utf8_lossy(&o.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&o.stderr).into_owned(),
            })
        }
        Err(_) => {
            kill_group(pid);
            Err(CheckerError::Timeout(cmd.timeout))
        }
    }
}

#[cfg(unix)]
fn kill_group(pid: Option<u32>) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Some(pid) = pid.and_then(|p| i32::try_from(p).ok()) else {
        return;
    };
    if let Err(e) = killpg(Pid::from_raw(pid), Signal::SIGKILL) {
        debug!("killing checker process group {pid}: {e}");
    }
}

#[cfg(not(unix))]
fn kill_group(_pid: Option<u32>) {}

/// Parse every diagnostic line from both streams.
///
/// Non-zero exit with zero diagnostics is `Unparseable`.
pub fn parse_output(out: &CheckerOutput) -> Result<Vec<Diagnostic>, CheckerError> {
    let diagnostics: Vec<Diagnostic> = out
        .stdout
        .lines()
        .chain(out.stderr.lines())
        .filter_map(parse_diagnostic)
        .collect();
    if !out.success() && diagnostics.is_empty() {
        return Err(CheckerError::Unparseable {
            code: out.exit_code,
        });
    }
    Ok(diagnostics)
}

/// Parse one `file(line,col): error CODE: message` line. Warnings and
/// anything else yield `None`.
pub fn parse_diagnostic(line: &str) -> Option<Diagnostic> {
    let line = line.trim_end_matches('\r');
    let marker = line.find(ERROR_MARKER)?;

    let loc = &line[..marker];
    let paren = loc.rfind('(')?;
    let file = &loc[..paren];
    if file.is_empty() {
        return None;
    }
    let (l, c) = loc[paren + 1..].split_once(',')?;
    let line_num: u32 = l.trim().parse().ok()?;
    let col: u32 = c.trim().parse().ok()?;

    let rest = &line[marker + ERROR_MARKER.len()..];
    let (code, message) = rest.split_once(": ")?;
    if code.is_empty() || code.contains(char::is_whitespace) {
        return None;
    }

    Some(Diagnostic {
        file: file.to_string(),
        line: line_num,
        column: col,
        code: code.to_string(),
        message: message.to_string(),
    })
}

/// Counts per code, most frequent first.
pub fn summarize(diagnostics: &[Diagnostic]) -> Vec<(String, usize)> {
    let mut by_code: HashMap<&str, usize> = HashMap::new();
    for d in diagnostics {
        *by_code.entry(d.code.as_str()).or_default() += 1;
    }
    let mut out: Vec<(String, usize)> = by_code
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
    out.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    out
}

#[derive(Debug, Clone)]
/// Runs the checker for one project root.
pub struct DiagnosticSource {
    command: CheckerCommand,
    root: PathBuf,
}

impl DiagnosticSource {
    pub fn new(command: CheckerCommand, root: impl Into<PathBuf>) -> Self {
        Self {
            command,
            root: root.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whole-project diagnostics.
    pub fn collect(&self) -> Result<Vec<Diagnostic>, CheckerError> {
        self.collect_files(&[])
    }

    /// Diagnostics for the given files only (passed as checker arguments).
    pub fn collect_files(&self, files: &[PathBuf]) -> Result<Vec<Diagnostic>, CheckerError> {
        let out = run_checker(&self.command, &self.root, files)?;
        let diagnostics = parse_output(&out)?;
        debug!(count = diagnostics.len(), "diagnostics collected");
        Ok(diagnostics)
    }
}

#[derive(Debug, Default, Clone)]
/// Outstanding diagnostic codes per file.
pub struct DiagnosticIndex {
    by_file: HashMap<PathBuf, HashSet<String>>,
}

impl DiagnosticIndex {
    /// Index diagnostics, resolving their paths against `root`.
    pub fn build(root: &Path, diagnostics: &[Diagnostic]) -> Self {
        let mut by_file: HashMap<PathBuf, HashSet<String>> = HashMap::new();
        for d in diagnostics {
            let key = normalize(&root.join(&d.file));
            by_file.entry(key).or_default().insert(d.code.clone());
        }
        Self { by_file }
    }

    pub fn codes_for(&self, path: &Path) -> Option<&HashSet<String>> {
        self.by_file.get(&normalize(path))
    }
}

fn normalize(p: &Path) -> PathBuf {
    match fs::canonicalize(p) {
        Ok(c) => c,
        Err(_) => {
            debug!(path = %p.display(), "diagnostic path does not resolve");
            p.to_path_buf()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sh(script: &str, timeout: Duration) -> CheckerCommand {
        CheckerCommand::from_argv(&["sh".into(), "-c".into(), script.into()], timeout).unwrap()
    }

    #[test]
    fn parse_error_line() {
        let d = parse_diagnostic("src/obj_player.ts(42,5): error TS2304: Cannot find name 'foo'.")
            .expect("should parse");
        assert_eq!(d.file, "src/obj_player.ts");
        assert_eq!(d.line, 42);
        assert_eq!(d.column, 5);
        assert_eq!(d.code, "TS2304");
        assert_eq!(d.message, "Cannot find name 'foo'.");
    }

    #[test]
    fn parse_keeps_colons_in_message_and_parens_in_path() {
        let d = parse_diagnostic("a (copy).ts(1,2): error E200: expected ':' here: really\r")
            .expect("should parse");
        assert_eq!(d.file, "a (copy).ts");
        assert_eq!(d.code, "E200");
        assert_eq!(d.message, "expected ':' here: really");
    }

    #[test]
    fn warning_lines_are_ignored() {
        assert!(parse_diagnostic("lib/u.ts(10,1): warning TS6133: 'x' is never read.").is_none());
    }

    #[test]
    fn skip_non_diagnostic() {
        assert!(parse_diagnostic("Found 42 errors in 3 files.").is_none());
        assert!(parse_diagnostic("").is_none());
        assert!(parse_diagnostic("x.ts(a,b): error TS1: nope").is_none());
        assert!(parse_diagnostic("(1,1): error TS1: no file").is_none());
    }

    #[test]
    fn non_zero_exit_with_diagnostics_is_success_path() {
        let dir = tempdir().unwrap();
        let cmd = sh(
            "echo 'banner'; echo 'a.ts(1,1): error TS1005: x'; echo 'b.ts(2,3): error TS2339: y' >&2; exit 2",
            Duration::from_secs(10),
        );
        let src = DiagnosticSource::new(cmd, dir.path());
        let diags = src.collect().unwrap();
        assert_eq!(diags.len(), 2);
        assert_eq!(diags[1].code, "TS2339");
    }

    #[test]
    fn non_zero_exit_without_diagnostics_is_unparseable() {
        let dir = tempdir().unwrap();
        let src = DiagnosticSource::new(sh("echo 'config broken'; exit 1", Duration::from_secs(10)), dir.path());
        assert!(matches!(src.collect(), Err(CheckerError::Unparseable { code: Some(1) })));
    }

    #[test]
    fn clean_exit_yields_empty_set() {
        let dir = tempdir().unwrap();
        let src = DiagnosticSource::new(sh("echo ok", Duration::from_secs(10)), dir.path());
        assert!(src.collect().unwrap().is_empty());
    }

    #[test]
    fn missing_binary_is_spawn_error() {
        let dir = tempdir().unwrap();
        let cmd = CheckerCommand::from_argv(
            &["definitely-not-a-checker-binary".into()],
            Duration::from_secs(1),
        )
        .unwrap();
        let src = DiagnosticSource::new(cmd, dir.path());
        assert!(matches!(src.collect(), Err(CheckerError::Spawn { .. })));
    }

    #[test]
    fn slow_checker_times_out() {
        let dir = tempdir().unwrap();
        let src = DiagnosticSource::new(sh("exec sleep 5", Duration::from_millis(200)), dir.path());
        assert!(matches!(src.collect(), Err(CheckerError::Timeout(_))));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn timeout_kills_forked_children() {
        let dir = tempdir().unwrap();
        let src = DiagnosticSource::new(
            sh("sleep 30 & echo $! > child.pid; wait", Duration::from_millis(300)),
            dir.path(),
        );
        assert!(matches!(src.collect(), Err(CheckerError::Timeout(_))));
        let pid = std::fs::read_to_string(dir.path().join("child.pid")).unwrap();
        let stat = format!("/proc/{}/stat", pid.trim());
        let gone = (0..100).any(|_| {
            let alive = std::fs::read_to_string(&stat)
                .map(|s| !s.contains(") Z "))
                .unwrap_or(false);
            if alive {
                std::thread::sleep(Duration::from_millis(20));
            }
            !alive
        });
        assert!(gone, "background child survived the timeout");
    }

    #[test]
    fn scoped_collection_passes_files() {
        let dir = tempdir().unwrap();
        // `sh -c script name args...`: $0 is the first appended file
        let cmd = sh("echo \"$0(1,1): error E1: scoped\"; exit 1", Duration::from_secs(10));
        let src = DiagnosticSource::new(cmd, dir.path());
        let diags = src.collect_files(&[PathBuf::from("only.ts")]).unwrap();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].file, "only.ts");
    }

    #[test]
    fn empty_command_is_rejected() {
        assert!(matches!(
            CheckerCommand::from_argv(&[], Duration::from_secs(1)),
            Err(CheckerError::EmptyCommand)
        ));
    }

    #[test]
    fn index_resolves_relative_paths() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/a.ts"), "x").unwrap();
        let d = parse_diagnostic("src/a.ts(1,1): error E200: boom").unwrap();
        let idx = DiagnosticIndex::build(dir.path(), &[d]);
        let codes = idx.codes_for(&dir.path().join("src/a.ts")).unwrap();
        assert!(codes.contains("E200"));
        assert!(idx.codes_for(&dir.path().join("src/b.ts")).is_none());
    }

    #[test]
    fn summary_orders_by_count() {
        let lines = [
            "a.ts(1,1): error TS2304: x",
            "a.ts(2,1): error TS2304: y",
            "b.ts(1,1): error TS2339: z",
        ];
        let diags: Vec<_> = lines.iter().filter_map(|l| parse_diagnostic(l)).collect();
        let s = summarize(&diags);
        assert_eq!(s[0], ("TS2304".to_string(), 2));
        assert_eq!(s[1], ("TS2339".to_string(), 1));
    }
}
