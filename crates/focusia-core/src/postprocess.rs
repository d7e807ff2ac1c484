//! Answer cleanup.
//!
//! Models rarely return exactly the requested shape. [`clean`] turns free
//! model text into a dash-bulleted list that always ends with a
//! micro-exercise:
//!
//! 1. drop template leftovers (`[INST]`, `Yanıt:`, `Answer:` ...)
//! 2. unify bullet glyphs to `-`
//! 3. stop at the first `Kaynak` / `Source` line (sources are shown separately)
//! 4. strip enumeration from each line and fold short follow-up lines into
//!    the previous bullet as a parenthetical
//! 5. append a default exercise when none was written
//!
//! It never fails; when nothing survives the cleanup the raw text is kept.

/// Substring whose presence marks an answer as already having an exercise.
pub const EXERCISE_KEYWORD: &str = "egzersiz";

/// Appended when the answer has no exercise.
pub const DEFAULT_EXERCISE: &str =
    "Mini egzersiz: 2 dakika nefesine odaklan; her nefeste 4'e kadar say.";

const LEAKAGE_MARKERS: [&str; 6] = ["[/INST]", "[INST]", "Yanıt:", "Yanıtı:", "Answer:", "Response:"];

const BULLET_GLYPHS: [char; 3] = ['•', '●', '►'];

const SOURCE_MARKERS: [&str; 2] = ["kaynak", "source"];

/// Follow-up lines with more words than this stay separate bullets.
const MAX_MERGE_WORDS: usize = 10;

pub fn clean(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }

    let mut text = raw.to_string();
    for marker in LEAKAGE_MARKERS {
        text = text.replace(marker, "");
    }
    let text: String = text
        .chars()
        .map(|c| if BULLET_GLYPHS.contains(&c) { '-' } else { c })
        .collect();

    let lines: Vec<&str> = text
        .split(is_line_break)
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    let mut fixed: Vec<String> = Vec::with_capacity(lines.len());
    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];
        if is_source_marker(line) {
            break;
        }

        let stripped = strip_enumeration(line).trim();
        if stripped.is_empty() {
            i += 1;
            continue;
        }

        let mut bullet = stripped.to_string();
        if let Some(next) = lines.get(i + 1) {
            if is_clarification(next) {
                bullet = format!("{} ({})", bullet, next);
                i += 1;
            }
        }
        fixed.push(bullet);
        i += 1;
    }

    let mut out = if fixed.is_empty() {
        raw.to_string()
    } else {
        format!("- {}", fixed.join("\n- "))
    };

    if !out.to_lowercase().contains(EXERCISE_KEYWORD) {
        out.push_str("\n\n");
        out.push_str(DEFAULT_EXERCISE);
    }

    out.trim().to_string()
}

/// Line boundaries: `\n`, `\r`, vertical tab, form feed, the ASCII
/// file/group/record separators, NEL, and the Unicode line and paragraph
/// separators. `\r\n` yields an empty piece, which is dropped.
fn is_line_break(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\x0b' | '\x0c' | '\x1c' | '\x1d' | '\x1e' | '\u{85}' | '\u{2028}' | '\u{2029}'
    )
}

fn is_source_marker(line: &str) -> bool {
    let lower = line.to_lowercase();
    SOURCE_MARKERS.iter().any(|m| lower.starts_with(m))
}

/// Drop leading list numbering and bullet tokens (`1.`, `2)`, `-`, `•`, `–`).
/// Any Unicode digit counts as numbering.
fn strip_enumeration(line: &str) -> &str {
    let mut rest = line;
    while let Some(first) = rest.chars().next() {
        if !(first.is_numeric() || matches!(first, '-' | '•' | '.' | '–')) {
            break;
        }
        rest = rest[first.len_utf8()..].trim_start_matches([' ', '.', '-', ')']);
    }
    rest
}

/// A short line that does not look like a new item or a source heading.
fn is_clarification(line: &str) -> bool {
    let Some(first) = line.chars().next() else {
        return false;
    };
    !first.is_numeric()
        && first != '-'
        && line.split_whitespace().count() <= MAX_MERGE_WORDS
        && !is_source_marker(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dash_lines(text: &str) -> usize {
        text.lines().filter(|l| l.starts_with("- ")).count()
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(clean(""), "");
    }

    #[test]
    fn test_numbered_list_becomes_bullets_with_exercise() {
        let raw = "1. Telefonu başka odaya koy.\n2. Bildirimleri kapat.\n3. Yirmi beş dakikalık bloklar kullan.";
        let out = clean(raw);
        assert_eq!(
            out,
            "- Telefonu başka odaya koy.\n- Bildirimleri kapat.\n- Yirmi beş dakikalık bloklar kullan.\n\n\
             Mini egzersiz: 2 dakika nefesine odaklan; her nefeste 4'e kadar say."
        );
        assert_eq!(dash_lines(&out), 3);
    }

    #[test]
    fn test_leakage_markers_removed() {
        let out = clean("[INST] Yanıt: 1) Masanı topla [/INST]\nAnswer: 2) Su iç");
        assert!(!out.contains("[INST]"));
        assert!(!out.contains("[/INST]"));
        assert!(!out.contains("Yanıt:"));
        assert!(!out.contains("Answer:"));
        assert!(out.starts_with("- Masanı topla"));
    }

    #[test]
    fn test_bullet_glyphs_normalized() {
        let out = clean("• Birinci öneri burada yazıyor\n● İkinci öneri burada yazıyor\n► Üçüncü öneri");
        assert!(out.starts_with("- Birinci öneri"));
        assert!(!out.contains('•'));
        assert!(!out.contains('●'));
        assert!(!out.contains('►'));
    }

    #[test]
    fn test_source_line_cuts_rest() {
        let raw = "1. Tek iş seç.\n2. Zamanlayıcı kur.\nSOURCES:\n3. Bu görünmemeli.";
        let out = clean(raw);
        assert!(!out.contains("görünmemeli"));
        assert!(!out.to_lowercase().contains("sources"));

        let out = clean("- Öneri bir\nKaynak: focus_tips.json\n- Öneri iki");
        assert!(!out.contains("Öneri iki"));
        assert!(!out.contains("focus_tips"));
    }

    #[test]
    fn test_short_followup_is_merged() {
        let raw = "1. Telefonu uzaklaştır\nÖzellikle çalışırken\n2. Mola ver";
        let out = clean(raw);
        assert!(out.starts_with("- Telefonu uzaklaştır (Özellikle çalışırken)\n- Mola ver"));
    }

    #[test]
    fn test_long_followup_stays_separate() {
        let raw = "1. Telefonu uzaklaştır\nbu satır on kelimeden daha uzun olduğu için ayrı bir madde olarak kalır";
        let out = clean(raw);
        assert_eq!(dash_lines(&out), 2);
        assert!(!out.contains('('));
    }

    #[test]
    fn test_followup_source_marker_is_not_merged() {
        let out = clean("1. Masanı topla\nSource: tips");
        assert!(out.starts_with("- Masanı topla\n"));
        assert!(!out.contains("tips"));
    }

    #[test]
    fn test_leading_numbers_are_treated_as_enumeration() {
        assert_eq!(clean("3. 25 dakika çalış"), clean("dakika çalış"));
    }

    #[test]
    fn test_multi_digit_and_dash_enumeration() {
        assert_eq!(strip_enumeration("10. On numara"), "On numara");
        assert_eq!(strip_enumeration("2) İki"), "İki");
        assert_eq!(strip_enumeration("– Uzun tire"), "Uzun tire");
        assert_eq!(strip_enumeration("-.- karışık"), "karışık");
        assert_eq!(strip_enumeration("Düz metin"), "Düz metin");
    }

    #[test]
    fn test_existing_exercise_not_duplicated() {
        let raw = "1. Odaklan\n2. Su iç\n3. Yürü\nMini egzersiz: gözlerini kapat ve nefes al, sonra yavaşça ver ve tekrar et.";
        let out = clean(raw);
        assert_eq!(out.matches("egzersiz").count(), 1);
        assert!(!out.contains(DEFAULT_EXERCISE));
    }

    #[test]
    fn test_nothing_survives_falls_back_to_raw() {
        let out = clean("1.\n2.\n-");
        assert!(out.starts_with("1.\n2.\n-"));
        assert!(out.ends_with(DEFAULT_EXERCISE));
    }

    #[test]
    fn test_non_empty_input_always_has_exercise() {
        for raw in ["x", "   ", "[INST]", "Kaynak: a", "Source", "•", "1. Bir\n2. İki"] {
            let out = clean(raw);
            assert!(!out.is_empty(), "empty output for {:?}", raw);
            assert!(out.to_lowercase().contains(EXERCISE_KEYWORD), "no exercise for {:?}", raw);
        }
    }

    #[test]
    fn test_reclean_converges() {
        let raw = "Yanıt:\n1. Telefonu başka odaya koy.\n2. Bildirimleri kapat.\n3. Kısa molalar ver.\nKaynak: Pomodoro";
        let once = clean(raw);
        let twice = clean(&once);
        let thrice = clean(&twice);
        assert_eq!(twice, thrice);
        assert!(twice.contains(DEFAULT_EXERCISE));
        assert!(twice.contains("- Telefonu başka odaya koy."));
        assert!(twice.contains("- Bildirimleri kapat."));
        assert!(twice.contains("- Kısa molalar ver."));
        assert_eq!(twice.matches("egzersiz").count(), 1);
    }

    #[test]
    fn test_other_line_separators_split() {
        let expected = clean("1. Telefonu kapat\n2. Masanı topla");
        for raw in [
            "1. Telefonu kapat\r2. Masanı topla",
            "1. Telefonu kapat\r\n2. Masanı topla",
            "1. Telefonu kapat\u{2028}2. Masanı topla",
            "1. Telefonu kapat\u{85}2. Masanı topla",
        ] {
            assert_eq!(clean(raw), expected, "raw: {:?}", raw);
        }
        assert!(expected.starts_with("- Telefonu kapat\n- Masanı topla"));
    }

    #[test]
    fn test_non_ascii_digits_are_enumeration() {
        let out = clean("١. Telefonu kapat\n٢) Masanı topla");
        assert!(out.starts_with("- Telefonu kapat\n- Masanı topla"), "got: {}", out);
    }

    #[test]
    fn test_deterministic() {
        let raw = "• a uzun bir öneri\nkısa not\n3) diğer";
        assert_eq!(clean(raw), clean(raw));
    }
}
