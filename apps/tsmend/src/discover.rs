//! Candidate file discovery.

use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::{DirEntry, WalkDir};

/// Directories never descended into.
pub const DEFAULT_EXCLUDE_DIRS: &[&str] = &["node_modules", "vendor", "dist", "build", ".git", "coverage"];

/// Files under `root` whose extension is in `extensions`, sorted by path.
///
/// A `root` that is itself a file is returned as-is when its extension
/// matches. Unreadable entries are logged and skipped.
pub fn discover_files(root: &Path, extensions: &[String], exclude_dirs: &[String]) -> Vec<PathBuf> {
    if root.is_file() {
        return if has_extension(root, extensions) {
            vec![root.to_path_buf()]
        } else {
            Vec::new()
        };
    }
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_excluded_dir(e, exclude_dirs))
        .filter_map(|res| match res {
            Ok(e) => Some(e),
            Err(err) => {
                warn!("skipping unreadable entry: {err}");
                None
            }
        })
        .filter(|e| e.file_type().is_file() && has_extension(e.path(), extensions))
        .map(DirEntry::into_path)
        .collect();
    files.sort();
    files
}

fn is_excluded_dir(entry: &DirEntry, exclude_dirs: &[String]) -> bool {
    entry.file_type().is_dir()
        && exclude_dirs
            .iter()
            .any(|d| entry.file_name().to_string_lossy() == d.as_str())
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .map(|ext| {
            let ext = ext.to_string_lossy();
            extensions
                .iter()
                .any(|want| want.trim_start_matches('.').eq_ignore_ascii_case(&ext))
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn filters_extensions_and_vendor_dirs() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        for p in [
            "src/a.ts",
            "src/b.tsx",
            "src/c.js",
            "src/a.ts.bak",
            "node_modules/lib/index.ts",
            "vendor/x.ts",
            "src/nested/d.TS",
        ] {
            let full = root.join(p);
            std::fs::create_dir_all(full.parent().unwrap()).unwrap();
            std::fs::write(full, "x").unwrap();
        }
        let exclude: Vec<String> = DEFAULT_EXCLUDE_DIRS.iter().map(|s| s.to_string()).collect();
        let files = discover_files(root, &strings(&["ts", ".tsx"]), &exclude);
        let rel: Vec<String> = files
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(rel, vec!["src/a.ts", "src/b.tsx", "src/nested/d.TS"]);
    }

    #[test]
    fn single_file_root() {
        let dir = tempdir().unwrap();
        let f = dir.path().join("one.ts");
        std::fs::write(&f, "x").unwrap();
        assert_eq!(discover_files(&f, &strings(&["ts"]), &[]), vec![f.clone()]);
        assert!(discover_files(&f, &strings(&["js"]), &[]).is_empty());
    }
}
