//! Core data model for one intake run: scanned records, bundle roots,
//! classification decisions, the plan, and the manifest row.

use crate::category::Category;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// One loose (non-bundle) file discovered by the scanner. Immutable after
/// creation; `id` is opaque and unique within a planning run.
#[derive(Debug, Clone)]
pub struct FileRecord {
    pub id: String,
    /// Absolute source path.
    pub path: PathBuf,
    pub name: String,
    /// Lowercased extension including the dot, or empty.
    pub ext: String,
    pub size_bytes: u64,
    /// Parent directory components relative to the dump root.
    pub parents: Vec<String>,
    pub rule_guess: Category,
    /// Bounded text preview, empty when content inclusion is off or the
    /// file is not text-like.
    pub text_preview: String,
}

/// A directory claimed as an atomic unit. Its entire subtree inherits one
/// category and is excluded from loose-file enumeration.
#[derive(Debug, Clone)]
pub struct BundleRoot {
    pub path: PathBuf,
    pub category: Category,
    /// Which predicate matched, for the decision reason.
    pub reason: String,
}

/// One classification decision, keyed by absolute source path in the plan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClassificationDecision {
    /// Record id this decision answered, `None` for bundle-derived ones.
    pub id: Option<String>,
    pub category: Category,
    pub confidence: f64,
    pub reason: String,
    /// Optional new leaf filename; sanitized before use.
    #[serde(default)]
    pub rename: Option<String>,
}

impl ClassificationDecision {
    /// The rule-based substitute used whenever the AI path yields nothing
    /// usable for a record.
    pub fn rule_fallback(record: &FileRecord) -> Self {
        Self {
            id: Some(record.id.clone()),
            category: record.rule_guess,
            confidence: 0.65,
            reason: "rule-based fallback".to_string(),
            rename: None,
        }
    }
}

/// A decision record as serialized to the plan artifact: the decision plus
/// the source path it applies to, one JSON object per line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanEntry {
    pub path: PathBuf,
    #[serde(flatten)]
    pub decision: ClassificationDecision,
}

/// The full mapping from source path to decision for one planning run.
/// Ordered so the plan artifact is deterministic.
#[derive(Debug, Clone, Default)]
pub struct Plan {
    pub decisions: BTreeMap<PathBuf, ClassificationDecision>,
    pub bundle_roots: Vec<BundleRoot>,
}

impl Plan {
    pub fn len(&self) -> usize {
        self.decisions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decisions.is_empty()
    }

    pub fn get(&self, path: &Path) -> Option<&ClassificationDecision> {
        self.decisions.get(path)
    }

    pub fn entries(&self) -> impl Iterator<Item = PlanEntry> + '_ {
        self.decisions.iter().map(|(path, decision)| PlanEntry {
            path: path.clone(),
            decision: decision.clone(),
        })
    }
}

/// One application-time record, appended to the per-project manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestRow {
    /// Timestamp of the apply invocation; shared by every row of one run.
    pub batch_id: String,
    pub original_path: String,
    pub new_path: String,
    pub category: Category,
    pub confidence: f64,
    pub reason: String,
    pub bytes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, guess: Category) -> FileRecord {
        FileRecord {
            id: "f0".to_string(),
            path: PathBuf::from(format!("/dump/{name}")),
            name: name.to_string(),
            ext: ".txt".to_string(),
            size_bytes: 10,
            parents: vec![],
            rule_guess: guess,
            text_preview: String::new(),
        }
    }

    #[test]
    fn test_rule_fallback_carries_guess() {
        let dec = ClassificationDecision::rule_fallback(&record("a.txt", Category::Data));
        assert_eq!(dec.category, Category::Data);
        assert_eq!(dec.confidence, 0.65);
        assert_eq!(dec.reason, "rule-based fallback");
    }

    #[test]
    fn test_plan_entry_round_trip() {
        let entry = PlanEntry {
            path: PathBuf::from("/dump/a.csv"),
            decision: ClassificationDecision {
                id: Some("f1".to_string()),
                category: Category::Data,
                confidence: 0.9,
                reason: "csv extension".to_string(),
                rename: None,
            },
        };
        let line = serde_json::to_string(&entry).unwrap();
        let back: PlanEntry = serde_json::from_str(&line).unwrap();
        assert_eq!(back.path, entry.path);
        assert_eq!(back.decision, entry.decision);
    }

    #[test]
    fn test_plan_is_ordered_by_path() {
        let mut plan = Plan::default();
        for name in ["c.txt", "a.txt", "b.txt"] {
            plan.decisions.insert(
                PathBuf::from(format!("/dump/{name}")),
                ClassificationDecision::rule_fallback(&record(name, Category::Unknown)),
            );
        }
        let paths: Vec<_> = plan.entries().map(|e| e.path).collect();
        assert_eq!(
            paths,
            vec![
                PathBuf::from("/dump/a.txt"),
                PathBuf::from("/dump/b.txt"),
                PathBuf::from("/dump/c.txt"),
            ]
        );
    }
}
