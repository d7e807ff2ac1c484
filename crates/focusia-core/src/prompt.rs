//! Fixed prompt texts and prompt assembly.
//!
//! The coach answers in Turkish only; both the system prompt and the answer
//! template enforce that, along with the "three suggestions plus one
//! micro-exercise" shape the postprocessor expects.

use crate::models::ScoredUnit;

/// System instructions sent with every generation request.
pub const SYSTEM_PROMPT: &str = "Sen bir odaklanma koçusun. Türkçe, doğal ve kısa cümlelerle konuş.\n\
- 'Sen' diye hitap et.\n\
- Üç net öneri ve bir mini egzersiz yaz.\n\
- Yapay/çeviri kokan ifadeler kullanma; sohbet tonu koru.\n\
- İngilizce kelime, emoji, [INST] gibi kalıntılar yazma.\n";

/// User-turn template. `{context}` and `{input}` are substituted verbatim.
pub const ANSWER_TEMPLATE: &str = "Aşağıdaki kullanıcı mesajına, verilen bağlama dayanarak kısa ve uygulanabilir öneriler üret.\n\
- Tamamen Türkçe yaz.\n\
- 3 madde + 1 mini egzersiz ver.\n\
- Gereksiz laf kalabalığından kaçın.\n\
\n\
Bağlam:\n\
{context}\n\
\n\
Kullanıcı: {input}\n\
\n\
Yanıt:";

/// Everything needed for one generation call. Built per query, never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub system_prompt: String,
    pub context: String,
    pub query: String,
}

impl GenerationRequest {
    pub fn new(context: String, query: &str) -> Self {
        Self {
            system_prompt: SYSTEM_PROMPT.to_string(),
            context,
            query: query.to_string(),
        }
    }

    /// The filled user-turn prompt.
    pub fn user_prompt(&self) -> String {
        fill_template(&self.context, &self.query)
    }
}

/// Join retrieved unit texts with blank lines.
pub fn format_context(units: &[ScoredUnit]) -> String {
    units
        .iter()
        .map(|u| u.unit.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Substitute `context` and `input` into [`ANSWER_TEMPLATE`].
///
/// Substitution is single-pass: braces inside the context or the query are
/// left alone.
pub fn fill_template(context: &str, input: &str) -> String {
    let (head, rest) = split_once_or_all(ANSWER_TEMPLATE, "{context}");
    let (mid, tail) = split_once_or_all(rest, "{input}");
    let mut out = String::with_capacity(ANSWER_TEMPLATE.len() + context.len() + input.len());
    out.push_str(head);
    out.push_str(context);
    out.push_str(mid);
    out.push_str(input);
    out.push_str(tail);
    out
}

fn split_once_or_all<'a>(s: &'a str, pat: &str) -> (&'a str, &'a str) {
    s.split_once(pat).unwrap_or((s, ""))
}

/// Flattened prompt for plain-completion endpoints that take no message list.
pub fn completion_prompt(system: &str, prompt: &str) -> String {
    format!("{}\n\nKullanıcı mesajı:\n{}\n\nYanıt:", system, prompt)
}
