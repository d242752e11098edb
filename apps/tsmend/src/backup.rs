//! Backups written next to the original before an overwrite.

use crate::models::Backup;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
/// How backup file names are derived.
pub enum BackupNaming {
    /// `<name>.<suffix>`, e.g. `a.ts.bak`.
    Suffix(String),
    /// `<name>.bak-<stamp>`; one stamp per run.
    Timestamp(String),
}

impl BackupNaming {
    /// Timestamped naming using the current local time.
    pub fn timestamp_now() -> Self {
        BackupNaming::Timestamp(chrono::Local::now().format("%Y%m%d%H%M%S").to_string())
    }

    pub fn backup_path(&self, original: &Path) -> PathBuf {
        let name = original
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let file = match self {
            BackupNaming::Suffix(s) => format!("{}.{}", name, s.trim_start_matches('.')),
            BackupNaming::Timestamp(stamp) => format!("{}.bak-{}", name, stamp),
        };
        original.with_file_name(file)
    }
}

const MAX_BACKUP_ATTEMPTS: u32 = 1000;

/// Copy `content` (the pre-run bytes of `original`) to its backup path.
///
/// Existing backups are never overwritten: when the name is taken, `.1`,
/// `.2`, ... are appended until a free name is found.
pub fn write_backup(original: &Path, content: &[u8], naming: &BackupNaming) -> io::Result<Backup> {
    let base = naming.backup_path(original);
    for n in 0..MAX_BACKUP_ATTEMPTS {
        let candidate = if n == 0 {
            base.clone()
        } else {
            let mut name = base.as_os_str().to_os_string();
            name.push(format!(".{n}"));
            PathBuf::from(name)
        };
        match OpenOptions::new().write(true).create_new(true).open(&candidate) {
            Ok(mut f) => {
                f.write_all(content)?;
                return Ok(Backup {
                    original_path: original.to_path_buf(),
                    backup_path: candidate,
                    content: content.to_vec(),
                });
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e),
        }
    }
    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("no free backup name next to {}", base.display()),
    ))
}
