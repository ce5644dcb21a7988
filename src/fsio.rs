//! Safe I/O helpers for the run artifacts.
//!
//! The plan artifact is rewritten whole each run, so it goes through an
//! atomic write (temp file, fsync, rename). The manifest and log are
//! append-only; appends are taken under an advisory exclusive lock so a
//! second concurrent invocation fails loudly instead of interleaving rows.

use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

pub fn ensure_dir(path: &Path) -> io::Result<()> {
    fs::create_dir_all(path)
}

/// Write `data` to `path` atomically: temp file in the same directory,
/// fsync, then rename over the target.
pub fn atomic_write(path: &Path, data: &[u8]) -> io::Result<()> {
    let parent = path.parent().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("no parent directory for {}", path.display()),
        )
    })?;
    ensure_dir(parent)?;

    let temp_name = format!(
        ".{}.tmp.{}",
        path.file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "file".to_string()),
        std::process::id()
    );
    let temp_path = parent.join(temp_name);

    let result = (|| {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)?;
        file.write_all(data)?;
        file.sync_all()?;
        fs::rename(&temp_path, path)
    })();

    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

/// Open `path` for appending (creating it if needed) and take an exclusive
/// advisory lock. The lock is released when the returned handle drops.
/// The bool reports whether the file existed before this call, which is
/// what decides header writing for the manifest.
pub fn locked_append(path: &Path) -> io::Result<(File, bool)> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    let existed = path.exists();
    let file = OpenOptions::new().append(true).create(true).open(path)?;
    file.lock_exclusive()?;
    Ok((file, existed))
}
