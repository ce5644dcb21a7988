//! The fixed research-project folder skeleton.

use crate::fsio::ensure_dir;
use std::io;
use std::path::Path;

/// Permanent category-base directories, relative to the project root.
pub const SKELETON_DIRS: &[&str] = &[
    "0_admin",
    "1_proposals",
    "2_data/raw",
    "2_data/processed",
    "3_code",
    "4_analysis",
    "5_manuscript",
    "6_talks_posters",
    "7_outputs",
];

/// Create any missing skeleton directories. Idempotent; called after every
/// apply so moves can never leave the permanent structure incomplete.
pub fn ensure_project_skeleton(project_dir: &Path) -> io::Result<()> {
    for rel in SKELETON_DIRS {
        ensure_dir(&project_dir.join(rel))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_skeleton_idempotent() {
        let dir = tempdir().unwrap();
        ensure_project_skeleton(dir.path()).unwrap();
        ensure_project_skeleton(dir.path()).unwrap();
        for rel in SKELETON_DIRS {
            assert!(dir.path().join(rel).is_dir(), "missing {rel}");
        }
    }
}
