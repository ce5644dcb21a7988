//! Plan construction: scan, classify, and merge into one path-keyed plan.
//!
//! Per-file decisions (AI or rule-only) are computed first; bundle
//! propagation runs afterwards and overwrites on conflict. The scanner's
//! partition makes the two key sets disjoint, so an overlap indicates a
//! scanner bug — it is logged as a warning and the bundle decision wins.

use crate::ai::{classify_records, ChatClient};
use crate::config::IntakeOptions;
use crate::error::AutofileError;
use crate::model::{ClassificationDecision, Plan};
use crate::scanner::{attach_previews, scan_dump};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

/// Confidence assigned to every file inherited from a bundle root.
const BUNDLE_CONFIDENCE: f64 = 0.99;
/// Confidence for decisions in rule-only mode (AI disabled).
const RULE_ONLY_CONFIDENCE: f64 = 0.5;

/// Build the full plan for a dump. Pure planning: no destination paths are
/// computed and nothing is written.
pub async fn build_plan(dump: &Path, options: &IntakeOptions) -> Result<Plan, AutofileError> {
    let mut outcome = scan_dump(
        dump,
        &options.ignore_dirs,
        options.bundle_code,
        options.bundle_manuscript,
    )?;
    info!(
        bundles = outcome.bundle_roots.len(),
        loose = outcome.loose_files.len(),
        "Scanned dump"
    );

    let mut decisions: BTreeMap<PathBuf, ClassificationDecision> = if options.use_ai {
        if options.include_content {
            attach_previews(&mut outcome.loose_files, options.peek_bytes);
        }
        let client = ChatClient::new(&options.api_base, &options.model)?;
        classify_records(&client, &outcome.loose_files, options).await
    } else {
        outcome
            .loose_files
            .iter()
            .map(|record| {
                (
                    record.path.clone(),
                    ClassificationDecision {
                        id: Some(record.id.clone()),
                        category: record.rule_guess,
                        confidence: RULE_ONLY_CONFIDENCE,
                        reason: "rule-based only".to_string(),
                        rename: None,
                    },
                )
            })
            .collect()
    };

    // Bundle propagation last: every file under a bundle root inherits the
    // bundle category. Bundle wins over any earlier per-file decision.
    for bundle in &outcome.bundle_roots {
        let reason = format!(
            "{} bundle root at {}",
            bundle.category,
            bundle.path.display()
        );
        for entry in WalkDir::new(&bundle.path)
            .into_iter()
            .filter_entry(|e| {
                !e.file_type().is_dir()
                    || !options
                        .ignore_dirs
                        .contains(&e.file_name().to_string_lossy().to_string())
            })
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let path = entry.path().to_path_buf();
            let decision = ClassificationDecision {
                id: None,
                category: bundle.category,
                confidence: BUNDLE_CONFIDENCE,
                reason: reason.clone(),
                rename: None,
            };
            if decisions.insert(path.clone(), decision).is_some() {
                warn!(
                    path = %path.display(),
                    "File was classified both loose and in a bundle; bundle category kept"
                );
            }
        }
    }

    Ok(Plan {
        decisions,
        bundle_roots: outcome.bundle_roots,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::Category;
    use std::fs;
    use tempfile::tempdir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"x").unwrap();
    }

    fn rule_only_options() -> IntakeOptions {
        IntakeOptions {
            use_ai: false,
            ..IntakeOptions::default()
        }
    }

    #[tokio::test]
    async fn test_rule_only_plan_covers_all_files() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("counts.csv"));
        touch(&dir.path().join("IRB_approval_2024.pdf"));

        let plan = build_plan(dir.path(), &rule_only_options()).await.unwrap();
        assert_eq!(plan.len(), 2);

        let irb = plan.get(&dir.path().join("IRB_approval_2024.pdf")).unwrap();
        assert_eq!(irb.category, Category::Admin);
        assert_eq!(irb.confidence, 0.5);
        assert_eq!(irb.reason, "rule-based only");
    }

    #[tokio::test]
    async fn test_bundle_subtree_inherits_category() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("ms/main.tex"));
        touch(&dir.path().join("ms/figures/fig1.png"));
        touch(&dir.path().join("ms/supplement.pdf"));
        touch(&dir.path().join("loose.csv"));

        let plan = build_plan(dir.path(), &rule_only_options()).await.unwrap();
        assert_eq!(plan.bundle_roots.len(), 1);
        assert_eq!(plan.len(), 4);

        for inner in ["ms/main.tex", "ms/figures/fig1.png", "ms/supplement.pdf"] {
            let d = plan.get(&dir.path().join(inner)).unwrap();
            assert_eq!(d.category, Category::Manuscript, "{inner}");
            assert_eq!(d.confidence, 0.99);
            assert!(d.reason.contains("bundle root at"), "{inner}: {}", d.reason);
            assert!(d.id.is_none());
        }
        assert_eq!(
            plan.get(&dir.path().join("loose.csv")).unwrap().category,
            Category::Data
        );
    }

    #[tokio::test]
    async fn test_bundle_ignore_dirs_pruned() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("repo/Cargo.toml"));
        touch(&dir.path().join("repo/node_modules/dep/index.js"));

        let plan = build_plan(dir.path(), &rule_only_options()).await.unwrap();
        assert!(plan
            .get(&dir.path().join("repo/node_modules/dep/index.js"))
            .is_none());
        assert!(plan.get(&dir.path().join("repo/Cargo.toml")).is_some());
    }
}
