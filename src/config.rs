//! Run options and the auto-intake marker file.
//!
//! A dropped folder can carry a small JSON marker (`.autofile.json`,
//! `autofile.json`, or `_autofile.json`) that supplies the same knobs as the
//! CLI flags, enabling unattended intake of a watched folder.

use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

pub const INTAKE_MARKER_NAMES: &[&str] = &[".autofile.json", "autofile.json", "_autofile.json"];

pub const DEFAULT_API_BASE: &str = "http://127.0.0.1:1234/v1";
pub const DEFAULT_MODEL: &str = "deepseek/deepseek-r1-0528-qwen3-8b";
pub const DEFAULT_AUTH: &str = "Bearer lm-studio";

pub const DEFAULT_IGNORE_DIRS: &[&str] = &[
    "venv",
    ".venv",
    "__pycache__",
    "node_modules",
    "dist",
    "build",
    ".ipynb_checkpoints",
    ".mypy_cache",
    ".pytest_cache",
    ".Rproj.user",
    ".idea",
    ".vscode",
];

/// Case-insensitive test for the intake marker filename.
pub fn is_intake_marker(name: &str) -> bool {
    let name = name.to_lowercase();
    INTAKE_MARKER_NAMES.contains(&name.as_str())
}

/// Everything the pipeline needs to know about one run, resolved from CLI
/// flags, environment, and (in auto mode) the intake marker.
#[derive(Debug, Clone)]
pub struct IntakeOptions {
    pub source_label: String,
    pub apply: bool,
    pub move_files: bool,
    pub bundle_code: bool,
    pub bundle_manuscript: bool,
    pub ignore_dirs: HashSet<String>,
    pub quarantine_threshold: f64,
    pub use_ai: bool,
    pub api_base: String,
    pub model: String,
    pub batch_size: usize,
    pub include_content: bool,
    pub peek_bytes: usize,
}

impl Default for IntakeOptions {
    fn default() -> Self {
        Self {
            source_label: String::new(),
            apply: false,
            move_files: false,
            bundle_code: true,
            bundle_manuscript: true,
            ignore_dirs: DEFAULT_IGNORE_DIRS.iter().map(|s| s.to_string()).collect(),
            quarantine_threshold: 0.45,
            use_ai: true,
            api_base: std::env::var("LMSTUDIO_API_BASE").unwrap_or_else(|_| DEFAULT_API_BASE.to_string()),
            model: std::env::var("LMSTUDIO_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            batch_size: 40,
            include_content: true,
            peek_bytes: 2000,
        }
    }
}

/// Parsed contents of the intake marker. All fields optional; anything
/// missing falls back to the CLI/default value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IntakeMarker {
    pub project: Option<String>,
    pub source: Option<String>,
    pub apply: Option<bool>,
    #[serde(rename = "move")]
    pub move_files: Option<bool>,
    pub bundle: Option<Vec<String>>,
    pub quarantine_threshold: Option<f64>,
    pub use_ai: Option<bool>,
    pub ignore_dirs: Option<String>,
}

impl IntakeMarker {
    /// Look for a marker file directly inside `drop_dir`. A missing or
    /// malformed marker yields the empty default (best-effort, matching the
    /// unattended use case).
    pub fn load(drop_dir: &Path) -> Self {
        for name in INTAKE_MARKER_NAMES {
            let candidate = drop_dir.join(name);
            if candidate.exists() {
                match fs::read_to_string(&candidate)
                    .ok()
                    .and_then(|text| serde_json::from_str::<IntakeMarker>(&text).ok())
                {
                    Some(marker) => return marker,
                    None => {
                        tracing::warn!(path = %candidate.display(), "Unreadable intake marker, ignoring");
                    }
                }
            }
        }
        Self::default()
    }

    /// Fold the marker's values into a set of options; marker values win
    /// over whatever the options already held.
    pub fn apply_to(&self, options: &mut IntakeOptions) {
        if let Some(source) = &self.source {
            options.source_label = source.clone();
        }
        if let Some(apply) = self.apply {
            options.apply = options.apply || apply;
        }
        if let Some(move_files) = self.move_files {
            options.move_files = options.move_files || move_files;
        }
        if let Some(bundle) = &self.bundle {
            options.bundle_code = bundle.iter().any(|b| b == "code");
            options.bundle_manuscript = bundle.iter().any(|b| b == "manuscript");
        }
        if let Some(threshold) = self.quarantine_threshold {
            options.quarantine_threshold = threshold;
        }
        if let Some(use_ai) = self.use_ai {
            options.use_ai = use_ai;
        }
        if let Some(dirs) = &self.ignore_dirs {
            options.ignore_dirs = dirs
                .split(',')
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string)
                .collect();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_marker_names() {
        assert!(is_intake_marker(".autofile.json"));
        assert!(is_intake_marker("AUTOFILE.JSON"));
        assert!(is_intake_marker("_autofile.json"));
        assert!(!is_intake_marker("autofile.yaml"));
    }

    #[test]
    fn test_load_and_apply_marker() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join(".autofile.json"),
            r#"{"project":"2025-CRISPR-MutSim","source":"AliceLab","apply":true,"bundle":["code"],"quarantine_threshold":0.6,"ignore_dirs":"venv,tmp"}"#,
        )
        .unwrap();

        let marker = IntakeMarker::load(dir.path());
        assert_eq!(marker.project.as_deref(), Some("2025-CRISPR-MutSim"));

        let mut options = IntakeOptions::default();
        marker.apply_to(&mut options);
        assert_eq!(options.source_label, "AliceLab");
        assert!(options.apply);
        assert!(options.bundle_code);
        assert!(!options.bundle_manuscript);
        assert_eq!(options.quarantine_threshold, 0.6);
        assert_eq!(options.ignore_dirs.len(), 2);
    }

    #[test]
    fn test_malformed_marker_is_ignored() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("autofile.json"), "not json at all").unwrap();
        let marker = IntakeMarker::load(dir.path());
        assert!(marker.project.is_none());
    }
}
