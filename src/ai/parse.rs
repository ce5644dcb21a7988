//! Tolerant parsing of model replies.
//!
//! The contract asks for JSON Lines, one object per file, but models wrap
//! output in prose or code fences often enough that we extract the
//! outermost matched braces per line and silently drop anything that still
//! fails to parse.

use serde::Deserialize;

/// One reply object as the model emits it. `category` stays a raw string
/// here; validation against the closed set happens in the merge step.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AiReply {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub rename: Option<String>,
}

/// Parse newline-delimited reply objects, tolerating surrounding prose.
pub fn parse_reply_lines(text: &str) -> Vec<AiReply> {
    let mut out = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Ok(reply) = serde_json::from_str::<AiReply>(line) {
            out.push(reply);
            continue;
        }
        if let Some(snippet) = outermost_braces(line) {
            if let Ok(reply) = serde_json::from_str::<AiReply>(snippet) {
                out.push(reply);
            }
        }
    }
    out
}

/// Slice from the first `{` to the last `}` of a line, if both exist in
/// order. Good enough for one object embedded in prose; a line holding
/// multiple objects is out of contract.
fn outermost_braces(line: &str) -> Option<&str> {
    let start = line.find('{')?;
    let end = line.rfind('}')?;
    (end > start).then(|| &line[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_jsonl() {
        let text = concat!(
            r#"{"id":"f0","category":"data","confidence":0.9,"reason":"csv","rename":""}"#,
            "\n",
            r#"{"id":"f1","category":"code","confidence":0.8,"reason":"script","rename":""}"#,
        );
        let replies = parse_reply_lines(text);
        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0].id.as_deref(), Some("f0"));
        assert_eq!(replies[1].category.as_deref(), Some("code"));
    }

    #[test]
    fn test_object_embedded_in_prose() {
        let text = r#"Sure! Here is the result: {"id":"f0","category":"talks","confidence":0.7,"reason":"deck"} hope that helps"#;
        let replies = parse_reply_lines(text);
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].category.as_deref(), Some("talks"));
    }

    #[test]
    fn test_unparseable_lines_dropped() {
        let text = "thinking...\n{not json}\n{\"id\":\"f2\",\"category\":\"admin\"}\n```";
        let replies = parse_reply_lines(text);
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].id.as_deref(), Some("f2"));
        assert!(replies[0].confidence.is_none());
    }

    #[test]
    fn test_empty_input() {
        assert!(parse_reply_lines("").is_empty());
        assert!(parse_reply_lines("no objects here").is_empty());
    }
}
