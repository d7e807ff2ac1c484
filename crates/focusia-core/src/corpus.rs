//! Tip corpus normalization.
//!
//! Turns raw JSON rows into canonical [`UnitDraft`]s:
//!
//! 1. Skip rows that are not objects or have blank `content`.
//! 2. Build `topic + "\n\n" + content` (or just `content` without a topic).
//! 3. Reject texts shorter than [`MIN_TEXT_CHARS`]; tiny fragments embed poorly.
//! 4. Drop repeated `(topic, text)` pairs, keeping the first occurrence.
//!
//! Normalization is pure. Reading the corpus file is the index builder's job.

use sha2::{Digest, Sha256};
use std::collections::HashSet;

use crate::error::FocusiaError;
use crate::models::{TipRecord, UnitDraft};

/// Minimum unit text length, in characters.
pub const MIN_TEXT_CHARS: usize = 8;

/// Counters describing what normalization kept and dropped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeStats {
    pub rows: usize,
    pub skipped: usize,
    pub duplicates: usize,
    pub units: usize,
}

#[derive(Debug, Clone)]
pub struct NormalizedCorpus {
    pub units: Vec<UnitDraft>,
    pub stats: NormalizeStats,
}

/// Normalize a parsed corpus document.
///
/// # Errors
///
/// - [`FocusiaError::Schema`] if `value` is not a JSON array.
/// - [`FocusiaError::EmptyCorpus`] if no row survives normalization.
pub fn parse_corpus(value: &serde_json::Value) -> Result<NormalizedCorpus, FocusiaError> {
    let rows = value.as_array().ok_or_else(|| {
        FocusiaError::Schema(format!(
            "expected a top-level list of tip records, found {}",
            json_kind(value)
        ))
    })?;
    normalize(rows)
}

/// Normalize and deduplicate raw rows, preserving input order.
pub fn normalize(rows: &[serde_json::Value]) -> Result<NormalizedCorpus, FocusiaError> {
    let mut stats = NormalizeStats {
        rows: rows.len(),
        ..Default::default()
    };
    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut units = Vec::new();

    for row in rows {
        let Some(draft) = normalize_row(row) else {
            stats.skipped += 1;
            continue;
        };
        let key = (draft.topic.clone(), draft.text.trim().to_string());
        if !seen.insert(key) {
            stats.duplicates += 1;
            continue;
        }
        units.push(draft);
    }

    if units.is_empty() {
        return Err(FocusiaError::EmptyCorpus {
            min_chars: MIN_TEXT_CHARS,
        });
    }

    stats.units = units.len();
    Ok(NormalizedCorpus { units, stats })
}

/// Normalize a single row; `None` means the row is filtered out.
pub fn normalize_row(row: &serde_json::Value) -> Option<UnitDraft> {
    normalize_record(&TipRecord::from_value(row)?)
}

pub fn normalize_record(record: &TipRecord) -> Option<UnitDraft> {
    let topic = record.topic.as_deref().unwrap_or("").trim();
    let content = record.content.as_deref().unwrap_or("").trim();
    if content.is_empty() {
        return None;
    }

    let text = if topic.is_empty() {
        content.to_string()
    } else {
        format!("{}\n\n{}", topic, content)
    };

    if text.chars().count() < MIN_TEXT_CHARS {
        return None;
    }

    Some(UnitDraft {
        id: unit_id(topic, &text),
        topic: topic.to_string(),
        text,
    })
}

/// Hex SHA-256 over `topic`, a NUL separator, and `text`.
pub fn unit_id(topic: &str, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(topic.as_bytes());
    hasher.update([0u8]);
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "a list",
        serde_json::Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_topic_and_content_are_joined() {
        let corpus = parse_corpus(&json!([
            {"topic": " Pomodoro ", "content": " Work 25 minutes, break 5. "}
        ]))
        .unwrap();
        assert_eq!(corpus.units.len(), 1);
        assert_eq!(corpus.units[0].topic, "Pomodoro");
        assert_eq!(corpus.units[0].text, "Pomodoro\n\nWork 25 minutes, break 5.");
    }

    #[test]
    fn test_missing_topic_uses_content_alone() {
        let corpus = parse_corpus(&json!([{"content": "Telefonu başka odaya koy."}])).unwrap();
        assert_eq!(corpus.units[0].topic, "");
        assert_eq!(corpus.units[0].text, "Telefonu başka odaya koy.");
    }

    #[test]
    fn test_invalid_rows_are_skipped() {
        let corpus = parse_corpus(&json!([
            "not an object",
            {"topic": "Empty", "content": "   "},
            {"topic": "No content"},
            {"content": "short"},
            {"topic": "Kept", "content": "A real tip with enough text."}
        ]))
        .unwrap();
        assert_eq!(corpus.units.len(), 1);
        assert_eq!(corpus.units[0].topic, "Kept");
        assert_eq!(corpus.stats.rows, 5);
        assert_eq!(corpus.stats.skipped, 4);
    }

    #[test]
    fn test_length_threshold_counts_characters() {
        // 7 chars (multi-byte) is rejected, 8 chars is kept.
        assert!(normalize_row(&json!({"content": "ğğğğğğğ"})).is_none());
        assert!(normalize_row(&json!({"content": "ğğğğğğğğ"})).is_some());
    }

    #[test]
    fn test_topic_counts_toward_length() {
        // "Tip\n\nabc" is exactly 8 characters.
        assert!(normalize_row(&json!({"topic": "Tip", "content": "abc"})).is_some());
    }

    #[test]
    fn test_duplicates_dropped_first_wins() {
        let corpus = parse_corpus(&json!([
            {"topic": "A", "content": "First version of the tip"},
            {"topic": "B", "content": "Another tip entirely"},
            {"topic": "A", "content": "  First version of the tip  "},
        ]))
        .unwrap();
        assert_eq!(corpus.units.len(), 2);
        assert_eq!(corpus.units[0].topic, "A");
        assert_eq!(corpus.units[1].topic, "B");
        assert_eq!(corpus.stats.duplicates, 1);
    }

    #[test]
    fn test_same_content_different_topic_kept() {
        let corpus = parse_corpus(&json!([
            {"topic": "A", "content": "Shared content here"},
            {"topic": "B", "content": "Shared content here"},
        ]))
        .unwrap();
        assert_eq!(corpus.units.len(), 2);
        assert_ne!(corpus.units[0].id, corpus.units[1].id);
    }

    #[test]
    fn test_non_list_is_schema_error() {
        let err = parse_corpus(&json!({"topic": "x", "content": "y"})).unwrap_err();
        assert!(matches!(err, FocusiaError::Schema(_)), "got {:?}", err);
        assert!(err.to_string().contains("an object"));
    }

    #[test]
    fn test_all_invalid_is_empty_corpus() {
        let err = parse_corpus(&json!([{"content": ""}, 3, {"content": "tiny"}])).unwrap_err();
        assert!(matches!(err, FocusiaError::EmptyCorpus { .. }));
    }

    #[test]
    fn test_unit_id_is_stable_and_separated() {
        assert_eq!(unit_id("a", "b"), unit_id("a", "b"));
        assert_ne!(unit_id("ab", "c"), unit_id("a", "bc"));
        assert_eq!(unit_id("a", "b").len(), 64);
    }
}
