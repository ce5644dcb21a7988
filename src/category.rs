//! The closed category set and the destination layout derived from it.
//!
//! Every file or bundle ends up in exactly one of these categories, and the
//! applier maps each category to a dated, source-labeled base directory
//! inside the project. Keeping the mapping in an explicit value (rather than
//! a global table) means the applier can be handed a layout and tested
//! against a temp directory.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Intake category. The set is closed: AI output naming anything else is
/// rejected and replaced by the rule guess.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Admin,
    Proposals,
    Data,
    Code,
    Talks,
    Manuscript,
    Unknown,
    Ignore,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Proposals => "proposals",
            Self::Data => "data",
            Self::Code => "code",
            Self::Talks => "talks",
            Self::Manuscript => "manuscript",
            Self::Unknown => "unknown",
            Self::Ignore => "ignore",
        }
    }

    /// Strict parse against the closed set. Returns `None` for anything
    /// outside it, which callers treat as an invalid decision.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Some(Self::Admin),
            "proposals" => Some(Self::Proposals),
            "data" => Some(Self::Data),
            "code" => Some(Self::Code),
            "talks" => Some(Self::Talks),
            "manuscript" => Some(Self::Manuscript),
            "unknown" => Some(Self::Unknown),
            "ignore" => Some(Self::Ignore),
            _ => None,
        }
    }

    /// True for categories that carry real routing information, i.e.
    /// anything other than `Unknown` or `Ignore`. A specific rule guess is a
    /// floor the AI answer cannot fall below.
    pub fn is_specific(&self) -> bool {
        !matches!(self, Self::Unknown | Self::Ignore)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Destination bases for one intake run: a fixed mapping from category to a
/// project-relative directory, parameterized by source label and run date so
/// that re-runs against the same project land in the same buckets.
#[derive(Debug, Clone)]
pub struct DestLayout {
    project_dir: PathBuf,
    pub label: String,
    pub date: String,
}

impl DestLayout {
    pub fn new(project_dir: &Path, source_label: &str, date: &str) -> Self {
        let label = if source_label.is_empty() {
            "collab".to_string()
        } else {
            source_label.to_string()
        };
        Self {
            project_dir: project_dir.to_path_buf(),
            label,
            date: date.to_string(),
        }
    }

    /// Base directory for a category, or `None` for `Ignore` (skipped
    /// entirely). `Unknown` routes to the quarantine bucket.
    pub fn base_for(&self, category: Category) -> Option<PathBuf> {
        let tagged = format!("_from_{}_{}", self.label, self.date);
        let dated = format!("{}_{}", self.label, self.date);
        let rel: PathBuf = match category {
            Category::Admin => ["0_admin", tagged.as_str()].iter().collect(),
            Category::Proposals => ["1_proposals", tagged.as_str()].iter().collect(),
            Category::Data => ["2_data", "raw", dated.as_str()].iter().collect(),
            Category::Code => ["3_code", tagged.as_str()].iter().collect(),
            Category::Talks => ["6_talks_posters", tagged.as_str()].iter().collect(),
            Category::Manuscript => ["5_manuscript", tagged.as_str()].iter().collect(),
            Category::Unknown => ["0_admin", "_intake_unsorted", dated.as_str()]
                .iter()
                .collect(),
            Category::Ignore => return None,
        };
        Some(self.project_dir.join(rel))
    }

    /// All bases this run can write under, for post-run pruning.
    pub fn all_bases(&self) -> Vec<PathBuf> {
        [
            Category::Admin,
            Category::Proposals,
            Category::Data,
            Category::Code,
            Category::Talks,
            Category::Manuscript,
            Category::Unknown,
        ]
        .iter()
        .filter_map(|c| self.base_for(*c))
        .collect()
    }
}
