//! Prompt construction for the classification endpoint.

use crate::model::FileRecord;
use serde::Serialize;

pub const SYSTEM_PROMPT: &str = r#"You are a meticulous file-intake classifier for an academic research lab.
Decide which category each file belongs to, based on filename, extension, size, and a small text preview when available.
Pick exactly one category from:
- admin        : IRB/ethics, MTAs, DUAs, NDAs, contracts, budgets, invoices, agreements
- proposals    : proposal/grant material, biosketches, specific aims, narratives
- data         : datasets (CSV/TSV/XLSX/Parquet/HDF5/FASTQ/BAM/VCF/TIFF/NIfTI/etc.)
- code         : scripts, notebooks, configs (py, R, ipynb, m, jl, sh, sql, yaml, toml, json)
- talks        : slides/posters/decks (ppt/pptx/key/pdf if clearly talk/poster)
- manuscript   : manuscripts, LaTeX, figures, submission/rebuttal docs
- unknown      : unclear; send to quarantine
- ignore       : junk or generated files we should skip (e.g., .DS_Store, Thumbs.db, cache, tmp).

Output STRICTLY in JSON Lines (JSONL), one object per file we give you, with this schema:
{"id": "<opaque id we provide>", "category":"admin|proposals|data|code|talks|manuscript|unknown|ignore", "confidence": 0.0-1.0, "reason": "short rationale", "rename": "optional new safe filename or empty string"}

Never include code fences, markdown, or extra prose. Only JSONL.
If uncertain, choose 'unknown' with moderate confidence and explain why in 'reason'."#;

/// Per-record summary sent to the model.
#[derive(Serialize)]
struct RecordSummary<'a> {
    id: &'a str,
    name: &'a str,
    ext: &'a str,
    size_bytes: u64,
    parents: &'a [String],
    rule_guess: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    text_preview: &'a str,
}

/// Build the user message for one batch: a fixed instruction followed by a
/// JSON array of per-record summaries.
pub fn build_user_message(records: &[FileRecord], include_content: bool) -> String {
    let summaries: Vec<RecordSummary> = records
        .iter()
        .map(|r| RecordSummary {
            id: &r.id,
            name: &r.name,
            ext: &r.ext,
            size_bytes: r.size_bytes,
            parents: &r.parents,
            rule_guess: r.rule_guess.as_str(),
            text_preview: if include_content { &r.text_preview } else { "" },
        })
        .collect();

    format!(
        "Classify the following files. Return JSONL, one object per entry.\n{}",
        serde_json::to_string(&summaries).unwrap_or_else(|_| "[]".to_string())
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::Category;
    use std::path::PathBuf;

    fn record(preview: &str) -> FileRecord {
        FileRecord {
            id: "f0".to_string(),
            path: PathBuf::from("/dump/a.csv"),
            name: "a.csv".to_string(),
            ext: ".csv".to_string(),
            size_bytes: 42,
            parents: vec!["sub".to_string()],
            rule_guess: Category::Data,
            text_preview: preview.to_string(),
        }
    }

    #[test]
    fn test_message_contains_summary_fields() {
        let msg = build_user_message(&[record("col1,col2")], true);
        assert!(msg.contains("\"id\":\"f0\""));
        assert!(msg.contains("\"rule_guess\":\"data\""));
        assert!(msg.contains("col1,col2"));
    }

    #[test]
    fn test_content_excluded_when_disabled() {
        let msg = build_user_message(&[record("secret")], false);
        assert!(!msg.contains("secret"));
        assert!(!msg.contains("text_preview"));
    }
}
