//! Rule-based classifier: an ordered chain of (label, predicate) rules
//! evaluated first-match-wins over a file's name and extension.
//!
//! The order is a designed tie-break, not an accident. A PDF could be a
//! talk, a manuscript, or a figure; figure/supplemental/table keywords are
//! checked before anything else so figures never leak into other buckets,
//! and keyword rules (proposals, admin) outrank extension rules so
//! `IRB_approval_2024.pdf` lands in admin rather than talks.

use crate::category::Category;
use crate::config::is_intake_marker;

const CODE_EXT: &[&str] = &[
    ".py", ".r", ".ipynb", ".m", ".jl", ".sh", ".bash", ".bat", ".ps1", ".sql", ".yaml", ".yml",
    ".toml", ".json",
];

const DATA_EXT: &[&str] = &[
    ".csv", ".tsv", ".xlsx", ".xls", ".parquet", ".h5", ".hdf5", ".feather", ".rds", ".rdata",
    ".sav", ".dta", ".mat", ".gz", ".zip", ".fastq", ".fq", ".bam", ".sam", ".vcf", ".tif",
    ".tiff", ".nii",
];

const TALKS_EXT: &[&str] = &[".ppt", ".pptx", ".key", ".pdf"];

const MANUSCRIPT_EXT: &[&str] = &[
    ".tex", ".bib", ".doc", ".docx", ".rtf", ".odt", ".pdf", ".svg", ".eps", ".png", ".jpg",
    ".jpeg", ".tif", ".tiff",
];

/// Extensions that can carry a figure/table/supplemental asset.
const FIGURE_LIKE_EXT: &[&str] = &[
    ".pdf", ".tif", ".tiff", ".png", ".jpg", ".jpeg", ".svg", ".eps",
];

const PROPOSAL_KW: &[&str] = &[
    "specific aims", "aims", "proposal", "grant", "biosketch", "narrative", "cover letter",
];

const ADMIN_KW: &[&str] = &[
    "irb", "mta", "dua", "du a", "nda", "budget", "invoice", "contract", "ica", "agreement",
    "ethics",
];

const MANUSCRIPT_KW: &[&str] = &[
    "manuscript", "paper", "ms", "draft", "submission", "rebuttal", "overleaf",
];

const TALK_KW: &[&str] = &[
    "slides", "talk", "poster", "deck", "seminar", "colloquium", "keynote",
];

const FIGURE_KW: &[&str] = &[
    "figure", "fig ", "fig_", "supplemental figure", "supp fig", "supplemental", "supp", "suppl",
    "table", "supplemental table", "supp table",
];

fn contains_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| text.contains(k))
}

fn ext_in(ext: &str, set: &[&str]) -> bool {
    set.contains(&ext)
}

/// The ordered rule chain. Each rule sees the lowercased name and extension
/// and either claims the file or passes.
type Rule = fn(name: &str, ext: &str) -> Option<Category>;

pub const RULE_CHAIN: &[(&str, Rule)] = &[
    ("intake-marker", |name, _| {
        is_intake_marker(name).then_some(Category::Ignore)
    }),
    ("figure-asset", |name, ext| {
        (ext_in(ext, FIGURE_LIKE_EXT) && contains_any(name, FIGURE_KW))
            .then_some(Category::Manuscript)
    }),
    ("proposal-keyword", |name, _| {
        contains_any(name, PROPOSAL_KW).then_some(Category::Proposals)
    }),
    ("admin-keyword", |name, _| {
        contains_any(name, ADMIN_KW).then_some(Category::Admin)
    }),
    ("code-extension", |_, ext| {
        ext_in(ext, CODE_EXT).then_some(Category::Code)
    }),
    ("data-extension", |_, ext| {
        ext_in(ext, DATA_EXT).then_some(Category::Data)
    }),
    ("talk", |name, ext| {
        (contains_any(name, TALK_KW) || ext_in(ext, TALKS_EXT)).then_some(Category::Talks)
    }),
    ("manuscript", |name, ext| {
        (contains_any(name, MANUSCRIPT_KW) || ext_in(ext, MANUSCRIPT_EXT))
            .then_some(Category::Manuscript)
    }),
    ("os-junk", |name, _| {
        (name == ".ds_store" || name == "thumbs.db" || name.ends_with('~'))
            .then_some(Category::Ignore)
    }),
];

/// Classify a file by name and extension alone. Total: always returns a
/// category, `Unknown` when no rule claims the file.
pub fn classify_by_rule(name: &str, ext: &str) -> Category {
    let name = name.to_lowercase();
    let ext = ext.to_lowercase();
    for (_, rule) in RULE_CHAIN {
        if let Some(category) = rule(&name, &ext) {
            return category;
        }
    }
    Category::Unknown
}

/// Like `classify_by_rule` but also reports which rule fired.
pub fn classify_with_rule_name(name: &str, ext: &str) -> (Category, &'static str) {
    let name = name.to_lowercase();
    let ext = ext.to_lowercase();
    for (label, rule) in RULE_CHAIN {
        if let Some(category) = rule(&name, &ext) {
            return (category, label);
        }
    }
    (Category::Unknown, "no-match")
}
