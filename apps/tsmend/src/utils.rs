//! Small helpers shared by the binary and the printers.

use owo_colors::OwoColorize;
use std::path::Path;

/// Colors are used for human output unless `NO_COLOR` is set.
pub fn use_colors(output: &str) -> bool {
    output != "json" && std::env::var_os("NO_COLOR").is_none()
}

pub fn error_prefix() -> String {
    if use_colors("human") {
        "error:".red().bold().to_string()
    } else {
        "error:".to_string()
    }
}

pub fn note_prefix() -> String {
    if use_colors("human") {
        "note:".cyan().bold().to_string()
    } else {
        "note:".to_string()
    }
}

pub fn info_prefix() -> String {
    if use_colors("human") {
        "info:".blue().bold().to_string()
    } else {
        "info:".to_string()
    }
}

/// `path` relative to `base` with forward slashes; falls back to `path`.
pub fn rel_to(path: &Path, base: &Path) -> String {
    let rel = pathdiff::diff_paths(path, base)
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| path.to_path_buf());
    rel.to_string_lossy().replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rel_paths() {
        assert_eq!(rel_to(Path::new("/r/src/a.ts"), Path::new("/r")), "src/a.ts");
        assert_eq!(rel_to(Path::new("/r/a.ts"), Path::new("/r/a.ts")), "/r/a.ts");
    }
}
