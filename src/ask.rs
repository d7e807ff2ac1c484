//! `focusia ask`: one query through the pipeline, printed for a terminal.

use anyhow::{bail, Result};

use focusia_core::models::{AnswerResult, SourceRef};

use crate::config::Config;
use crate::runtime::build_pipeline;

/// Shown when the query is blank.
pub const BLANK_QUERY_MESSAGE: &str = "Lütfen kısa bir durum cümlesi yaz.";

/// Trimmed query, or an error when it is blank.
pub fn validate_query(query: &str) -> Result<&str> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        bail!(BLANK_QUERY_MESSAGE);
    }
    Ok(trimmed)
}

/// Sources with repeated display topics removed, first occurrence kept.
pub fn unique_sources(result: &AnswerResult) -> Vec<SourceRef> {
    let mut seen = std::collections::HashSet::new();
    result
        .source_refs()
        .into_iter()
        .filter(|s| seen.insert(s.display_topic().to_string()))
        .collect()
}

/// Plain-text rendering: the answer, then a source list.
pub fn render_answer(result: &AnswerResult, snippets: bool) -> String {
    let mut out = String::new();
    out.push_str(&result.text);
    out.push('\n');

    let sources = unique_sources(result);
    if !sources.is_empty() {
        out.push_str("\nKaynaklar:\n");
        for source in &sources {
            out.push_str(&format!("  - {}\n", source.display_topic()));
            if snippets {
                for line in source.snippet.lines() {
                    out.push_str(&format!("      {}\n", line));
                }
            }
        }
    }
    out
}

pub async fn run_ask(config: &Config, query: &str, snippets: bool, json: bool) -> Result<()> {
    let query = validate_query(query)?;
    let runtime = build_pipeline(config).await?;
    let result = runtime.pipeline.invoke(query).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result.to_response())?);
    } else {
        print!("{}", render_answer(&result, snippets));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use focusia_core::models::IndexedUnit;

    fn unit(topic: &str, text: &str) -> IndexedUnit {
        IndexedUnit {
            id: format!("{}-{}", topic, text),
            topic: topic.to_string(),
            text: text.to_string(),
            embedding: vec![],
        }
    }

    #[test]
    fn test_blank_query_rejected() {
        assert!(validate_query("   \n").is_err());
        assert_eq!(validate_query("  odaklanamıyorum ").unwrap(), "odaklanamıyorum");
    }

    #[test]
    fn test_sources_deduplicated_by_topic() {
        let result = AnswerResult {
            text: "- a".into(),
            sources: vec![
                unit("Pomodoro", "Pomodoro\n\nWork 25"),
                unit("", "untitled one"),
                unit("Pomodoro", "Pomodoro\n\nBreak 5"),
                unit("", "untitled two"),
            ],
        };
        let topics: Vec<String> = unique_sources(&result)
            .iter()
            .map(|s| s.display_topic().to_string())
            .collect();
        assert_eq!(topics, vec!["Pomodoro", "focus_tips.json satırı"]);
    }

    #[test]
    fn test_render_with_snippets() {
        let result = AnswerResult {
            text: "- Telefonu uzaklaştır".into(),
            sources: vec![unit("Pomodoro", "Work 25 minutes, break 5.")],
        };
        let plain = render_answer(&result, false);
        assert!(plain.starts_with("- Telefonu uzaklaştır\n"));
        assert!(plain.contains("  - Pomodoro\n"));
        assert!(!plain.contains("Work 25"));

        let detailed = render_answer(&result, true);
        assert!(detailed.contains("      Work 25 minutes, break 5.\n"));
    }
}
