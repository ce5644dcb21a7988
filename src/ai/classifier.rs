//! Batch loop and merge logic.
//!
//! Records are partitioned into fixed-size batches and sent to the endpoint
//! strictly one at a time. Failure isolation is per-batch: a transport error
//! or unparseable reply degrades that batch to rule-based decisions and the
//! next batch proceeds normally.

use crate::category::Category;
use crate::config::IntakeOptions;
use crate::model::{ClassificationDecision, FileRecord};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use tracing::{debug, warn};

use super::client::ChatClient;
use super::parse::{parse_reply_lines, AiReply};
use super::prompts::{build_user_message, SYSTEM_PROMPT};

/// What happened to one batch, kept distinct for diagnostics even though
/// every failure maps to the same rule-based fallback.
#[derive(Debug)]
pub enum BatchOutcome {
    /// Endpoint reachable, at least one reply object parsed.
    Parsed(HashMap<String, AiReply>),
    /// Endpoint reachable but nothing in the reply parsed.
    ParseFailed,
    /// Transport/endpoint failure (connection, HTTP status, timeout).
    Unreachable(String),
}

impl BatchOutcome {
    fn replies(self) -> HashMap<String, AiReply> {
        match self {
            Self::Parsed(replies) => replies,
            Self::ParseFailed | Self::Unreachable(_) => HashMap::new(),
        }
    }
}

/// Classify loose records via the AI path, returning decisions keyed by
/// absolute source path.
pub async fn classify_records(
    client: &ChatClient,
    records: &[FileRecord],
    options: &IntakeOptions,
) -> BTreeMap<PathBuf, ClassificationDecision> {
    let mut decisions = BTreeMap::new();
    let batch_size = options.batch_size.max(1);

    for (index, batch) in records.chunks(batch_size).enumerate() {
        let outcome = run_batch(client, batch, options.include_content).await;
        match &outcome {
            BatchOutcome::Parsed(replies) => {
                debug!(batch = index, replies = replies.len(), "Batch classified");
            }
            BatchOutcome::ParseFailed => {
                warn!(batch = index, "No parseable objects in model reply; falling back to rules for this batch");
            }
            BatchOutcome::Unreachable(error) => {
                warn!(batch = index, %error, "Classification call failed; falling back to rules for this batch");
            }
        }
        merge_batch(batch, outcome.replies(), &mut decisions);
    }

    decisions
}

async fn run_batch(client: &ChatClient, batch: &[FileRecord], include_content: bool) -> BatchOutcome {
    let user_message = build_user_message(batch, include_content);
    let content = match client.complete(SYSTEM_PROMPT, &user_message).await {
        Ok(content) => content,
        Err(e) => return BatchOutcome::Unreachable(e.to_string()),
    };

    let replies = parse_reply_lines(&content);
    if replies.is_empty() {
        return BatchOutcome::ParseFailed;
    }
    BatchOutcome::Parsed(
        replies
            .into_iter()
            .filter_map(|r| r.id.clone().map(|id| (id, r)))
            .collect(),
    )
}

/// Merge one batch's replies into the decision map. A record with no
/// matching reply, or a reply naming a category outside the closed set,
/// gets the rule guess at fixed fallback confidence. An accepted
/// unknown/ignore answer is upgraded to a more specific rule guess: the
/// rule signal is a floor the model cannot fall below for clearly-typed
/// files.
pub fn merge_batch(
    batch: &[FileRecord],
    replies: HashMap<String, AiReply>,
    decisions: &mut BTreeMap<PathBuf, ClassificationDecision>,
) {
    for record in batch {
        let mut decision = match replies.get(&record.id) {
            Some(reply) => match reply.category.as_deref().and_then(Category::parse) {
                Some(category) => ClassificationDecision {
                    id: Some(record.id.clone()),
                    category,
                    confidence: reply.confidence.unwrap_or(0.0).clamp(0.0, 1.0),
                    reason: reply.reason.clone().unwrap_or_default(),
                    rename: reply
                        .rename
                        .as_deref()
                        .map(str::trim)
                        .filter(|r| !r.is_empty())
                        .map(str::to_string),
                },
                None => ClassificationDecision::rule_fallback(record),
            },
            None => ClassificationDecision::rule_fallback(record),
        };

        if !decision.category.is_specific() && record.rule_guess.is_specific() {
            decision.category = record.rule_guess;
            decision.reason = format!("{} | upgraded by extension rule", decision.reason)
                .trim_start_matches(" | ")
                .to_string();
        }

        decisions.insert(record.path.clone(), decision);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, name: &str, guess: Category) -> FileRecord {
        FileRecord {
            id: id.to_string(),
            path: PathBuf::from(format!("/dump/{name}")),
            name: name.to_string(),
            ext: format!(
                ".{}",
                name.rsplit_once('.').map(|(_, e)| e).unwrap_or_default()
            ),
            size_bytes: 1,
            parents: vec![],
            rule_guess: guess,
            text_preview: String::new(),
        }
    }

    fn reply(id: &str, category: &str, confidence: f64) -> AiReply {
        AiReply {
            id: Some(id.to_string()),
            category: Some(category.to_string()),
            confidence: Some(confidence),
            reason: Some("model says so".to_string()),
            rename: None,
        }
    }

    #[test]
    fn test_accepted_reply_is_kept() {
        let batch = vec![record("f0", "deck.pdf", Category::Talks)];
        let replies = HashMap::from([("f0".to_string(), reply("f0", "talks", 0.9))]);
        let mut decisions = BTreeMap::new();
        merge_batch(&batch, replies, &mut decisions);

        let d = decisions.get(&PathBuf::from("/dump/deck.pdf")).unwrap();
        assert_eq!(d.category, Category::Talks);
        assert_eq!(d.confidence, 0.9);
        assert_eq!(d.reason, "model says so");
    }

    #[test]
    fn test_missing_reply_falls_back_to_rule() {
        let batch = vec![record("f0", "counts.csv", Category::Data)];
        let mut decisions = BTreeMap::new();
        merge_batch(&batch, HashMap::new(), &mut decisions);

        let d = decisions.get(&PathBuf::from("/dump/counts.csv")).unwrap();
        assert_eq!(d.category, Category::Data);
        assert_eq!(d.confidence, 0.65);
        assert_eq!(d.reason, "rule-based fallback");
    }

    #[test]
    fn test_out_of_set_category_falls_back() {
        let batch = vec![record("f0", "counts.csv", Category::Data)];
        let replies = HashMap::from([("f0".to_string(), reply("f0", "spreadsheets", 0.95))]);
        let mut decisions = BTreeMap::new();
        merge_batch(&batch, replies, &mut decisions);

        let d = decisions.get(&PathBuf::from("/dump/counts.csv")).unwrap();
        assert_eq!(d.category, Category::Data);
        assert_eq!(d.reason, "rule-based fallback");
    }

    #[test]
    fn test_unknown_upgraded_by_specific_rule_guess() {
        let batch = vec![record("f0", "analysis.py", Category::Code)];
        let replies = HashMap::from([("f0".to_string(), reply("f0", "unknown", 0.8))]);
        let mut decisions = BTreeMap::new();
        merge_batch(&batch, replies, &mut decisions);

        let d = decisions.get(&PathBuf::from("/dump/analysis.py")).unwrap();
        assert_eq!(d.category, Category::Code);
        assert_eq!(d.confidence, 0.8);
        assert!(d.reason.ends_with("| upgraded by extension rule"));
    }

    #[test]
    fn test_no_upgrade_when_rule_guess_is_unknown() {
        let batch = vec![record("f0", "notes.xyz", Category::Unknown)];
        let replies = HashMap::from([("f0".to_string(), reply("f0", "unknown", 0.8))]);
        let mut decisions = BTreeMap::new();
        merge_batch(&batch, replies, &mut decisions);

        let d = decisions.get(&PathBuf::from("/dump/notes.xyz")).unwrap();
        assert_eq!(d.category, Category::Unknown);
        assert_eq!(d.confidence, 0.8);
        assert!(!d.reason.contains("upgraded"));
    }

    #[test]
    fn test_confidence_clamped() {
        let batch = vec![record("f0", "a.csv", Category::Data)];
        let replies = HashMap::from([("f0".to_string(), reply("f0", "data", 1.7))]);
        let mut decisions = BTreeMap::new();
        merge_batch(&batch, replies, &mut decisions);
        assert_eq!(decisions.values().next().unwrap().confidence, 1.0);
    }

    #[test]
    fn test_empty_rename_is_none() {
        let batch = vec![record("f0", "a.csv", Category::Data)];
        let mut r = reply("f0", "data", 0.9);
        r.rename = Some("  ".to_string());
        let replies = HashMap::from([("f0".to_string(), r)]);
        let mut decisions = BTreeMap::new();
        merge_batch(&batch, replies, &mut decisions);
        assert!(decisions.values().next().unwrap().rename.is_none());
    }
}
