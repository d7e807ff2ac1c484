//! Core data models that flow through the retrieval and generation pipeline.

use serde::Serialize;

/// Label shown for sources whose tip had no topic.
pub const UNTITLED_SOURCE_LABEL: &str = "focus_tips.json satırı";

/// Maximum snippet length (in characters) in the caller-facing source list.
pub const SNIPPET_CHARS: usize = 220;

/// One row of the tip corpus, as read from disk.
///
/// Fields are optional: rows missing `content` are filtered out by the
/// normalizer, and a missing `topic` just means the unit text is the
/// content alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TipRecord {
    pub topic: Option<String>,
    pub content: Option<String>,
}

impl TipRecord {
    /// Read a record from an untyped JSON row.
    ///
    /// Returns `None` when the row is not an object. Non-string field
    /// values are treated as absent.
    pub fn from_value(row: &serde_json::Value) -> Option<Self> {
        let obj = row.as_object()?;
        Some(Self {
            topic: obj.get("topic").and_then(|v| v.as_str()).map(str::to_string),
            content: obj
                .get("content")
                .and_then(|v| v.as_str())
                .map(str::to_string),
        })
    }
}

/// A normalized tip, ready to be embedded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitDraft {
    /// Stable content hash of `(topic, text)`.
    pub id: String,
    /// Trimmed topic; empty when the record had none.
    pub topic: String,
    /// `topic + "\n\n" + content`, or `content` alone.
    pub text: String,
}

/// An embedded tip stored in the index.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedUnit {
    pub id: String,
    pub topic: String,
    pub text: String,
    pub embedding: Vec<f32>,
}

impl IndexedUnit {
    pub fn from_draft(draft: UnitDraft, embedding: Vec<f32>) -> Self {
        Self {
            id: draft.id,
            topic: draft.topic,
            text: draft.text,
            embedding,
        }
    }

    /// Caller-facing projection: topic plus a short snippet of the text.
    pub fn source_ref(&self) -> SourceRef {
        SourceRef {
            topic: self.topic.clone(),
            snippet: snippet(&self.text, SNIPPET_CHARS),
        }
    }
}

/// A unit picked by the retriever with its cosine similarity to the query.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredUnit {
    pub unit: IndexedUnit,
    pub score: f32,
}

/// Final pipeline output handed back to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerResult {
    /// Postprocessed answer text.
    pub text: String,
    /// Retrieved units in MMR selection order.
    pub sources: Vec<IndexedUnit>,
}

impl AnswerResult {
    pub fn source_refs(&self) -> Vec<SourceRef> {
        self.sources.iter().map(IndexedUnit::source_ref).collect()
    }

    /// The JSON shape returned by `POST /ask` and `focusia ask --json`.
    pub fn to_response(&self) -> AnswerResponse {
        AnswerResponse {
            text: self.text.clone(),
            sources: self.source_refs(),
        }
    }
}

/// `{topic, snippet}` as consumed by presentation layers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceRef {
    pub topic: String,
    pub snippet: String,
}

impl SourceRef {
    /// Topic, or a generic label when the tip had none.
    pub fn display_topic(&self) -> &str {
        let t = self.topic.trim();
        if t.is_empty() {
            UNTITLED_SOURCE_LABEL
        } else {
            t
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnswerResponse {
    pub text: String,
    pub sources: Vec<SourceRef>,
}

/// First `max_chars` characters of `text`, with `…` appended when cut.
pub fn snippet(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}…", &text[..byte_idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tip_record_from_object() {
        let rec = TipRecord::from_value(&json!({"topic": "Pomodoro", "content": "Work 25"})).unwrap();
        assert_eq!(rec.topic.as_deref(), Some("Pomodoro"));
        assert_eq!(rec.content.as_deref(), Some("Work 25"));
    }

    #[test]
    fn test_tip_record_rejects_non_object() {
        assert!(TipRecord::from_value(&json!("just a string")).is_none());
        assert!(TipRecord::from_value(&json!(42)).is_none());
    }

    #[test]
    fn test_tip_record_non_string_fields_are_absent() {
        let rec = TipRecord::from_value(&json!({"topic": 7, "content": null})).unwrap();
        assert_eq!(rec, TipRecord::default());
    }

    #[test]
    fn test_snippet_short_text_untouched() {
        assert_eq!(snippet("kısa metin", 220), "kısa metin");
    }

    #[test]
    fn test_snippet_cuts_on_char_boundary() {
        let text = "ğ".repeat(300);
        let s = snippet(&text, 220);
        assert_eq!(s.chars().count(), 221);
        assert!(s.ends_with('…'));
    }

    #[test]
    fn test_display_topic_falls_back_to_label() {
        let r = SourceRef {
            topic: "  ".into(),
            snippet: String::new(),
        };
        assert_eq!(r.display_topic(), UNTITLED_SOURCE_LABEL);
    }
}
