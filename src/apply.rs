//! Plan application: destination routing, copy/move, and the durable audit
//! trail (plan artifact, manifest, log).
//!
//! The manifest and log are append-only across arbitrarily many runs
//! against the same project; the plan artifact is rewritten atomically each
//! run so a dry run is always inspectable before any mutation. Manifest
//! rows are appended one per placed file, so an interrupted run leaves a
//! valid prefix of the intended output.

use crate::category::{Category, DestLayout};
use crate::config::is_intake_marker;
use crate::error::AutofileError;
use crate::fsio::{atomic_write, ensure_dir, locked_append};
use crate::model::{ClassificationDecision, ManifestRow, Plan};
use crate::skeleton::ensure_project_skeleton;
use filetime::FileTime;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Column order of the manifest CSV; stable across versions.
const MANIFEST_FIELDS: &[&str] = &[
    "batch_id",
    "original_path",
    "new_path",
    "category",
    "confidence",
    "reason",
    "bytes",
];

/// Artifacts and counts produced by one apply run.
#[derive(Debug)]
pub struct ApplyOutcome {
    pub plan_path: PathBuf,
    pub manifest_path: PathBuf,
    pub log_path: PathBuf,
    pub placed: usize,
    pub skipped: usize,
}

/// The quarantine policy, applied at apply time: any non-ignore decision
/// below the threshold is coerced to `Unknown` regardless of its category.
pub fn effective_category(decision: &ClassificationDecision, quarantine_threshold: f64) -> Category {
    if decision.category != Category::Ignore && decision.confidence < quarantine_threshold {
        Category::Unknown
    } else {
        decision.category
    }
}

/// Serialize the plan, one decision record per line with its path, to the
/// dated, source-labeled artifact. Runs in dry mode too.
pub fn write_plan_artifact(
    plan: &Plan,
    project_dir: &Path,
    layout: &DestLayout,
) -> Result<PathBuf, AutofileError> {
    let path = project_dir.join(format!("autofile_plan_{}_{}.jsonl", layout.label, layout.date));
    let mut buf = Vec::new();
    for entry in plan.entries() {
        serde_json::to_writer(&mut buf, &entry)?;
        buf.push(b'\n');
    }
    atomic_write(&path, &buf)?;
    info!(plan = %path.display(), decisions = plan.len(), "Wrote plan artifact");
    Ok(path)
}

/// Execute a finalized plan against a project.
pub fn apply_plan(
    plan: &Plan,
    dump: &Path,
    project_dir: &Path,
    layout: &DestLayout,
    move_files: bool,
    quarantine_threshold: f64,
) -> Result<ApplyOutcome, AutofileError> {
    if !project_dir.exists() {
        return Err(AutofileError::ProjectNotFound(project_dir.to_path_buf()));
    }

    let plan_path = write_plan_artifact(plan, project_dir, layout)?;
    let manifest_path =
        project_dir.join(format!("autofile_manifest_{}_{}.csv", layout.label, layout.date));
    let log_path = project_dir.join("AUTOFILE_LOG.md");

    // One batch id per apply invocation, stamped on every row of this run.
    let batch_id = chrono::Local::now().format("%Y-%m-%dT%H:%M:%S").to_string();

    let (manifest_file, existed) = locked_append(&manifest_path)?;
    let mut manifest = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(manifest_file);
    if !existed {
        manifest.write_record(MANIFEST_FIELDS)?;
    }

    let mut placed = 0usize;
    let mut skipped = 0usize;

    for (src, decision) in &plan.decisions {
        let name = src
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        if is_intake_marker(&name) {
            skipped += 1;
            continue;
        }

        let category = effective_category(decision, quarantine_threshold);
        let base = match layout.base_for(category) {
            Some(base) => base,
            None => {
                skipped += 1;
                continue;
            }
        };

        let dest = base.join(dest_rel_path(src, dump, decision.rename.as_deref()));
        if let Some(parent) = dest.parent() {
            ensure_dir(parent)?;
        }
        place_file(src, &dest, move_files)?;
        placed += 1;

        let bytes = fs::metadata(&dest).map(|m| m.len()).unwrap_or(0);
        manifest.serialize(ManifestRow {
            batch_id: batch_id.clone(),
            original_path: src.to_string_lossy().into_owned(),
            new_path: dest.to_string_lossy().into_owned(),
            category,
            confidence: decision.confidence,
            reason: decision.reason.clone(),
            bytes,
        })?;
        manifest.flush()?;
        debug!(src = %src.display(), dest = %dest.display(), %category, "Placed file");
    }
    // Drop releases the advisory lock.
    drop(manifest);

    append_log_summary(
        &log_path,
        layout,
        move_files,
        &plan_path,
        &manifest_path,
        placed,
        skipped,
    )?;

    // Best-effort cleanup of directories emptied by moves; never fatal and
    // never touches the permanent skeleton above the run bases.
    for base in layout.all_bases() {
        prune_empty_children(&base);
    }
    ensure_project_skeleton(project_dir)?;

    info!(placed, skipped, manifest = %manifest_path.display(), "Apply complete");

    Ok(ApplyOutcome {
        plan_path,
        manifest_path,
        log_path,
        placed,
        skipped,
    })
}

/// Relative path under the destination base: the source's path under the
/// dump, with the leaf swapped for the sanitized rename if one was given.
fn dest_rel_path(src: &Path, dump: &Path, rename: Option<&str>) -> PathBuf {
    let rel = src
        .strip_prefix(dump)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| src.file_name().map(PathBuf::from).unwrap_or_default());
    match rename {
        Some(rename) => {
            // Neutralize path separators so a rename cannot escape the base.
            let safe = rename.replace(['/', '\\'], "-");
            rel.parent()
                .map(|p| p.join(&safe))
                .unwrap_or_else(|| PathBuf::from(&safe))
        }
        None => rel,
    }
}

/// Copy or move one file. Copy duplicates the source timestamps onto the
/// destination; move falls back to copy-and-delete across filesystems.
fn place_file(src: &Path, dest: &Path, move_files: bool) -> Result<(), AutofileError> {
    if move_files {
        if fs::rename(src, dest).is_err() {
            copy_with_times(src, dest)?;
            fs::remove_file(src)?;
        }
    } else {
        copy_with_times(src, dest)?;
    }
    Ok(())
}

fn copy_with_times(src: &Path, dest: &Path) -> Result<(), AutofileError> {
    fs::copy(src, dest)?;
    if let Ok(meta) = fs::metadata(src) {
        let atime = FileTime::from_last_access_time(&meta);
        let mtime = FileTime::from_last_modification_time(&meta);
        if let Err(e) = filetime::set_file_times(dest, atime, mtime) {
            warn!(dest = %dest.display(), error = %e, "Could not preserve timestamps");
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn append_log_summary(
    log_path: &Path,
    layout: &DestLayout,
    move_files: bool,
    plan_path: &Path,
    manifest_path: &Path,
    placed: usize,
    skipped: usize,
) -> Result<(), AutofileError> {
    let mut summary = format!("# AutoFile Intake {} from {}\n\n", layout.date, layout.label);
    summary.push_str(&format!(
        "Mode: {}\n\n",
        if move_files { "MOVE" } else { "COPY" }
    ));
    summary.push_str(&format!(
        "Plan: `{}`\n\n",
        plan_path.file_name().unwrap_or_default().to_string_lossy()
    ));
    summary.push_str(&format!(
        "Manifest: `{}`\n\n",
        manifest_path.file_name().unwrap_or_default().to_string_lossy()
    ));
    summary.push_str(&format!(
        "Moved {placed} files; skipped {skipped} ignored items.\n\n"
    ));

    let (mut file, _) = locked_append(log_path)?;
    file.write_all(summary.as_bytes())?;
    Ok(())
}

/// Remove directories under `root` that are now empty, deepest first. The
/// root itself is kept. Failures are suppressed: cleanup must never fail a
/// run that already placed its files.
fn prune_empty_children(root: &Path) {
    if !root.is_dir() {
        return;
    }
    let mut dirs: Vec<PathBuf> = WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_dir())
        .map(|e| e.path().to_path_buf())
        .collect();
    dirs.sort_by_key(|d| std::cmp::Reverse(d.components().count()));
    for dir in dirs {
        // remove_dir fails on non-empty directories, which is the point.
        let _ = fs::remove_dir(&dir);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ClassificationDecision;
    use tempfile::tempdir;

    fn decision(category: Category, confidence: f64) -> ClassificationDecision {
        ClassificationDecision {
            id: Some("f0".to_string()),
            category,
            confidence,
            reason: "test".to_string(),
            rename: None,
        }
    }

    #[test]
    fn test_quarantine_coercion() {
        let low = decision(Category::Data, 0.2);
        assert_eq!(effective_category(&low, 0.45), Category::Unknown);

        let high = decision(Category::Data, 0.8);
        assert_eq!(effective_category(&high, 0.45), Category::Data);

        // ignore is never quarantined
        let ignored = decision(Category::Ignore, 0.1);
        assert_eq!(effective_category(&ignored, 0.45), Category::Ignore);
    }

    #[test]
    fn test_dest_rel_path_sanitizes_rename() {
        let dump = Path::new("/dump");
        let src = Path::new("/dump/sub/old.pdf");
        assert_eq!(
            dest_rel_path(src, dump, None),
            PathBuf::from("sub/old.pdf")
        );
        assert_eq!(
            dest_rel_path(src, dump, Some("../escape/new.pdf")),
            PathBuf::from("sub/..-escape-new.pdf")
        );
    }

    #[test]
    fn test_copy_preserves_timestamps() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src.txt");
        let dest = dir.path().join("dest.txt");
        fs::write(&src, b"content").unwrap();
        let old = FileTime::from_unix_time(1_500_000_000, 0);
        filetime::set_file_times(&src, old, old).unwrap();

        copy_with_times(&src, &dest).unwrap();

        let meta = fs::metadata(&dest).unwrap();
        assert_eq!(FileTime::from_last_modification_time(&meta).unix_seconds(), 1_500_000_000);
        assert!(src.exists());
    }

    #[test]
    fn test_prune_keeps_root_and_nonempty() {
        let dir = tempdir().unwrap();
        let base = dir.path().join("base");
        fs::create_dir_all(base.join("empty/nested")).unwrap();
        fs::create_dir_all(base.join("full")).unwrap();
        fs::write(base.join("full/file.txt"), b"x").unwrap();

        prune_empty_children(&base);

        assert!(base.exists());
        assert!(!base.join("empty").exists());
        assert!(base.join("full/file.txt").exists());
    }
}
