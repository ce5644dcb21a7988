//! Dump traversal and bundle detection.
//!
//! The scanner walks the dump top-down and produces a partition: every file
//! is either inside exactly one bundle root or appears exactly once as a
//! loose `FileRecord`. Bundle atomicity is structural — once a directory is
//! claimed as a bundle the walk never descends into it, so its contents can
//! never show up in the loose set.

use crate::category::Category;
use crate::config::is_intake_marker;
use crate::error::AutofileError;
use crate::model::{BundleRoot, FileRecord};
use crate::rules::classify_by_rule;
use std::collections::HashSet;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Marker files/directories indicating a version-controlled or packaged
/// source tree.
const CODE_REPO_MARKERS: &[&str] = &[
    ".git",
    "pyproject.toml",
    "requirements.txt",
    "setup.py",
    "environment.yml",
    "package.json",
    "Cargo.toml",
    "Makefile",
    ".Rproj",
    ".Rproj.user",
    "src",
];

const FIGURE_DIR_NAMES: &[&str] = &["figures", "figs", "images", "img"];

/// Extensions eligible for a bounded text preview.
const TEXT_EXT: &[&str] = &[
    ".txt", ".md", ".rst", ".tex", ".bib", ".csv", ".tsv", ".json", ".yaml", ".yml", ".ini",
    ".cfg", ".toml", ".py", ".r", ".ipynb", ".m", ".jl", ".sh", ".bash", ".ps1", ".bat", ".sql",
    ".log",
];

/// Result of scanning a dump: disjoint by construction.
#[derive(Debug, Default)]
pub struct ScanOutcome {
    pub bundle_roots: Vec<BundleRoot>,
    pub loose_files: Vec<FileRecord>,
}

/// Does this directory look like the root of a code repository?
pub fn is_code_repo_root(dir: &Path) -> bool {
    CODE_REPO_MARKERS.iter().any(|m| dir.join(m).exists())
}

/// Does this directory look like the root of a manuscript bundle?
///
/// Signals, strongest first: a manuscript/paper-ish directory name; a `.tex`
/// file alongside a bibliography or figures directory; a manuscript/paper
/// document plus at least three figure/supplemental/table assets; a
/// canonical `main.tex`.
pub fn is_manuscript_root(dir: &Path) -> bool {
    let dir_name = dir
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    if dir_name.contains("manuscript") || dir_name.contains("paper") {
        return true;
    }

    let entries: Vec<String> = match fs::read_dir(dir) {
        Ok(rd) => rd
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect(),
        Err(_) => return false,
    };

    let has_ext = |ext: &str| entries.iter().any(|n| n.to_lowercase().ends_with(ext));
    if has_ext(".tex")
        && (has_ext(".bib") || FIGURE_DIR_NAMES.iter().any(|d| dir.join(d).is_dir()))
    {
        return true;
    }

    let has_main_doc = entries.iter().any(|n| {
        let n = n.to_lowercase();
        (n.contains("manuscript") || n.contains("paper"))
            && (n.ends_with(".docx") || n.ends_with(".pdf"))
    });
    if has_main_doc && count_manuscript_assets(dir) >= 3 {
        return true;
    }

    dir.join("main.tex").exists()
}

/// Recursive count of figure/supplemental/table-named files under `dir`.
fn count_manuscript_assets(dir: &Path) -> usize {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            let name = e.file_name().to_string_lossy().to_lowercase();
            name.starts_with("figure") || name.contains("supplemental") || name.contains("table")
        })
        .count()
}

/// Walk the dump, claiming bundle roots and collecting loose file paths.
/// Ignored directory names are pruned at every depth. Unreadable
/// directories are skipped with a warning rather than aborting the scan.
pub fn scan_dump(
    dump: &Path,
    ignore_dirs: &HashSet<String>,
    bundle_code: bool,
    bundle_manuscript: bool,
) -> Result<ScanOutcome, AutofileError> {
    if !dump.exists() {
        return Err(AutofileError::DumpNotFound(dump.to_path_buf()));
    }

    let mut bundle_roots = Vec::new();
    let mut loose_paths = Vec::new();
    visit(
        dump,
        ignore_dirs,
        bundle_code,
        bundle_manuscript,
        &mut bundle_roots,
        &mut loose_paths,
    );
    loose_paths.sort();

    debug!(
        bundles = bundle_roots.len(),
        loose = loose_paths.len(),
        "Scan complete"
    );

    Ok(ScanOutcome {
        bundle_roots,
        loose_files: loose_paths
            .into_iter()
            .enumerate()
            .map(|(i, path)| bare_record(i, path, dump))
            .collect(),
    })
}

fn visit(
    dir: &Path,
    ignore_dirs: &HashSet<String>,
    bundle_code: bool,
    bundle_manuscript: bool,
    bundle_roots: &mut Vec<BundleRoot>,
    loose_paths: &mut Vec<PathBuf>,
) {
    // Code is tested before manuscript: a directory matching both is code.
    if bundle_code && is_code_repo_root(dir) {
        bundle_roots.push(BundleRoot {
            path: dir.to_path_buf(),
            category: Category::Code,
            reason: "code repository markers".to_string(),
        });
        return;
    }
    if bundle_manuscript && is_manuscript_root(dir) {
        bundle_roots.push(BundleRoot {
            path: dir.to_path_buf(),
            category: Category::Manuscript,
            reason: "manuscript tree signals".to_string(),
        });
        return;
    }

    let entries = match fs::read_dir(dir) {
        Ok(rd) => rd,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "Skipping unreadable directory");
            return;
        }
    };

    for entry in entries.filter_map(|e| e.ok()) {
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().to_string();
        let file_type = match entry.file_type() {
            Ok(ft) => ft,
            Err(_) => continue,
        };
        if file_type.is_dir() {
            if ignore_dirs.contains(&name) {
                continue;
            }
            visit(
                &path,
                ignore_dirs,
                bundle_code,
                bundle_manuscript,
                bundle_roots,
                loose_paths,
            );
        } else if file_type.is_file() {
            if is_intake_marker(&name) {
                continue;
            }
            loose_paths.push(path);
        }
    }
}

/// Build a `FileRecord` without a preview (metadata and rule guess only).
fn bare_record(index: usize, path: PathBuf, dump: &Path) -> FileRecord {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
        .unwrap_or_default();
    let size_bytes = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
    let parents = path
        .parent()
        .and_then(|p| p.strip_prefix(dump).ok())
        .map(|rel| {
            rel.components()
                .map(|c| c.as_os_str().to_string_lossy().to_string())
                .collect()
        })
        .unwrap_or_default();
    let rule_guess = classify_by_rule(&name, &ext);

    FileRecord {
        id: format!("f{index}"),
        path,
        name,
        ext,
        size_bytes,
        parents,
        rule_guess,
        text_preview: String::new(),
    }
}

/// Attach bounded text previews to text-like records, in place.
pub fn attach_previews(records: &mut [FileRecord], peek_bytes: usize) {
    for record in records.iter_mut() {
        if is_textlike(&record.path, &record.ext) {
            record.text_preview = preview_text(&record.path, peek_bytes);
        }
    }
}

fn is_textlike(path: &Path, ext: &str) -> bool {
    if TEXT_EXT.contains(&ext) {
        return true;
    }
    mime_guess::from_path(path)
        .first()
        .map(|m| m.type_() == mime_guess::mime::TEXT)
        .unwrap_or(false)
}

/// First `max_bytes` of the file, lossily decoded; empty on any error.
fn preview_text(path: &Path, max_bytes: usize) -> String {
    let mut buf = vec![0u8; max_bytes];
    match fs::File::open(path).and_then(|mut f| {
        let mut read = 0;
        loop {
            match f.read(&mut buf[read..]) {
                Ok(0) => break Ok(read),
                Ok(n) => read += n,
                Err(e) => break Err(e),
            }
        }
    }) {
        Ok(n) => String::from_utf8_lossy(&buf[..n]).into_owned(),
        Err(_) => String::new(),
    }
}
