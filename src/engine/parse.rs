// Poetry Engine — Tolerant response parsing
//
// Model replies are asked to follow a labelled-section format but often
// don't. Nothing here returns an error: a missing marker degrades to a
// default, so every reply yields something usable.
//
// Markers are matched case-insensitively at the start of a line and may be
// wrapped in markdown (`**TITLE:**`, `## Title:`). A section's text runs from
// its marker to the next recognised marker; the first occurrence of each
// marker wins.

use crate::atoms::constants::{TITLE_HEURISTIC_MAX_CHARS, UNTITLED};
use crate::atoms::types::CritiqueSections;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

static POEM_MARKERS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^[ \t>#*_]*(thinking|title|poem)[ \t*_]*:[ \t*_]*").expect("static regex")
});

static CRITIQUE_MARKERS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?im)^[ \t>#*_]*(strengths|weaknesses|suggestions|(?:overall[ \t]+)?assessment)[ \t*_]*:[ \t*_]*",
    )
    .expect("static regex")
});

static VOICE_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^[ \t>#*_]*(voice[ \t]+principles)[ \t*_]*:[ \t*_]*").expect("static regex")
});

static BULLET_PAIR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*[-*•]\s*(.+?):\s*(.+)$").expect("static regex")
});

const BULLET_CHARS: &[char] = &['-', '*', '•'];

/// Canonical section key: upper-case, single spaces, "OVERALL ASSESSMENT" → "ASSESSMENT".
fn section_key(raw: &str) -> String {
    let key = raw.split_whitespace().collect::<Vec<_>>().join(" ").to_uppercase();
    match key.as_str() {
        "OVERALL ASSESSMENT" => "ASSESSMENT".to_string(),
        _ => key,
    }
}

/// Split `raw` into marker → trimmed section text.
fn split_sections(markers: &Regex, raw: &str) -> HashMap<String, String> {
    let hits: Vec<(String, usize, usize)> = markers
        .captures_iter(raw)
        .filter_map(|c| {
            let whole = c.get(0)?;
            Some((section_key(c.get(1)?.as_str()), whole.start(), whole.end()))
        })
        .collect();

    let mut sections = HashMap::new();
    for (i, (key, _, content_start)) in hits.iter().enumerate() {
        let content_end = hits.get(i + 1).map(|h| h.1).unwrap_or(raw.len());
        sections
            .entry(key.clone())
            .or_insert_with(|| raw[*content_start..content_end].trim().to_string());
    }
    sections
}

/// Strip quotes, markdown markers and whitespace from both ends.
pub fn sanitize_title(raw: &str) -> String {
    raw.trim_matches(|c: char| c.is_whitespace() || "\"'“”‘’`*_#".contains(c))
        .to_string()
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedPoem {
    pub thinking: String,
    pub title: String,
    pub body: String,
}

/// Parse a poem reply. Three shapes, tried in order:
///   1. THINKING / TITLE / POEM sections all present
///   2. TITLE and/or POEM present without THINKING: thinking is empty
///   3. no TITLE or POEM marker: the whole reply is the body, and a short
///      first line that doesn't trail off into punctuation becomes the title
pub fn parse_poem(raw: &str) -> ParsedPoem {
    let sections = split_sections(&POEM_MARKERS, raw);
    let title_section = sections.get("TITLE");
    let poem_section = sections.get("POEM");

    if title_section.is_none() && poem_section.is_none() {
        return parse_unstructured(raw);
    }

    let thinking = sections.get("THINKING").cloned().unwrap_or_default();

    // The title is the first line of its section; anything after it is
    // only used when there is no POEM section.
    let (title_line, title_rest) = match title_section {
        Some(t) => match t.split_once('\n') {
            Some((first, rest)) => (first.to_string(), rest.trim().to_string()),
            None => (t.clone(), String::new()),
        },
        None => (String::new(), String::new()),
    };

    let title = match sanitize_title(&title_line) {
        t if t.is_empty() => UNTITLED.to_string(),
        t => t,
    };
    let body = match poem_section {
        Some(p) => p.clone(),
        None => title_rest,
    };

    ParsedPoem { thinking, title, body }
}

fn parse_unstructured(raw: &str) -> ParsedPoem {
    let trimmed = raw.trim();
    let untitled = || ParsedPoem {
        thinking: String::new(),
        title: UNTITLED.to_string(),
        body: trimmed.to_string(),
    };

    let Some((first, rest)) = trimmed.split_once('\n') else {
        return untitled();
    };
    let first = first.trim();
    let rest = rest.trim();
    let title = sanitize_title(first);

    let promotable = first.chars().count() < TITLE_HEURISTIC_MAX_CHARS
        && !first.ends_with([',', ';', ':'])
        && !title.is_empty()
        && !rest.is_empty();

    if promotable {
        ParsedPoem { thinking: String::new(), title, body: rest.to_string() }
    } else {
        untitled()
    }
}

/// Parse a self-critique. Missing sections are empty, except the overall
/// assessment, which falls back to the whole reply.
pub fn parse_critique(raw: &str) -> CritiqueSections {
    let mut sections = split_sections(&CRITIQUE_MARKERS, raw);
    let mut take = |key: &str| sections.remove(key).unwrap_or_default();
    let strengths = take("STRENGTHS");
    let weaknesses = take("WEAKNESSES");
    let suggestions = take("SUGGESTIONS");
    let overall_assessment = match take("ASSESSMENT") {
        a if a.is_empty() => raw.trim().to_string(),
        a => a,
    };
    CritiqueSections { strengths, weaknesses, suggestions, overall_assessment }
}

/// Bullet-prefixed lines of `text`, bullet stripped, empties dropped.
pub fn bullet_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| l.starts_with(BULLET_CHARS))
        .map(|l| l.trim_start_matches(BULLET_CHARS).trim().to_string())
        .filter(|l| !l.is_empty())
        .collect()
}

/// Parse the VOICE PRINCIPLES section, or the whole reply if it is missing.
pub fn parse_voice(raw: &str) -> String {
    split_sections(&VOICE_MARKER, raw)
        .remove("VOICE PRINCIPLES")
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| raw.trim().to_string())
}

/// `- LABEL: description` pairs from an extraction reply.
pub fn parse_bullet_pairs(raw: &str) -> Vec<(String, String)> {
    raw.lines()
        .filter_map(|line| {
            let caps = BULLET_PAIR.captures(line)?;
            let label = sanitize_title(caps.get(1)?.as_str());
            let description = caps.get(2)?.as_str().trim().to_string();
            (!label.is_empty() && !description.is_empty()).then_some((label, description))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fully_structured_reply() {
        let raw = "THINKING:\n  The fog and the harbor share a silence.  \n\nTITLE:\n  Harbor Fog \n\nPOEM:\n  Boats wait.\nThe bell is wet.\n";
        let p = parse_poem(raw);
        assert_eq!(p.thinking, "The fog and the harbor share a silence.");
        assert_eq!(p.title, "Harbor Fog");
        assert_eq!(p.body, "Boats wait.\nThe bell is wet.");
    }

    #[test]
    fn markdown_wrapped_markers() {
        let raw = "**Thinking:** small things\n**Title:** \"Moss\"\n**Poem:**\nGreen on green.";
        let p = parse_poem(raw);
        assert_eq!(p.thinking, "small things");
        assert_eq!(p.title, "Moss");
        assert_eq!(p.body, "Green on green.");
    }

    #[test]
    fn title_and_poem_without_thinking() {
        let p = parse_poem("TITLE: Thaw\nPOEM:\nThe eaves drip all night.");
        assert_eq!(p.thinking, "");
        assert_eq!(p.title, "Thaw");
        assert_eq!(p.body, "The eaves drip all night.");
    }

    #[test]
    fn title_only_takes_following_lines_as_body() {
        let p = parse_poem("Title: Thaw\nThe eaves drip all night.");
        assert_eq!(p.title, "Thaw");
        assert_eq!(p.body, "The eaves drip all night.");
    }

    #[test]
    fn poem_only_is_untitled() {
        let p = parse_poem("POEM:\nOnly the river.");
        assert_eq!(p.title, UNTITLED);
        assert_eq!(p.body, "Only the river.");
    }

    #[test]
    fn unstructured_short_first_line_becomes_title() {
        let p = parse_poem("Autumn Light\nThe trees let go.");
        assert_eq!(p.title, "Autumn Light");
        assert_eq!(p.body, "The trees let go.");
        assert_eq!(p.thinking, "");
    }

    #[test]
    fn unstructured_long_prose_is_untitled() {
        let raw = "  The morning came in slowly over the hills, and nobody in the village could remember the last time \
it had been this quiet, so they waited.\nThen the birds.  ";
        let p = parse_poem(raw);
        assert_eq!(p.title, UNTITLED);
        assert_eq!(p.body, raw.trim());
    }

    #[test]
    fn unstructured_first_line_ending_in_comma_is_not_title() {
        let p = parse_poem("Under the bridge,\nthe water talks.");
        assert_eq!(p.title, UNTITLED);
        assert_eq!(p.body, "Under the bridge,\nthe water talks.");
    }

    #[test]
    fn single_line_reply_is_body() {
        let p = parse_poem("just one line");
        assert_eq!(p.title, UNTITLED);
        assert_eq!(p.body, "just one line");
    }

    #[test]
    fn title_sanitizing() {
        assert_eq!(sanitize_title("  **“Salt”**  "), "Salt");
        assert_eq!(sanitize_title("# 'Low Tide'"), "Low Tide");
        assert_eq!(sanitize_title("\"\""), "");
    }

    #[test]
    fn critique_sections() {
        let raw = "STRENGTHS:\nVivid.\nWEAKNESSES:\nRushed.\nSUGGESTIONS:\n- Slow the middle\n* Cut adverbs\nplain line\n• End on an image\n- Fourth\nOVERALL ASSESSMENT: Close.";
        let c = parse_critique(raw);
        assert_eq!(c.strengths, "Vivid.");
        assert_eq!(c.weaknesses, "Rushed.");
        assert_eq!(c.overall_assessment, "Close.");
        assert_eq!(
            bullet_lines(&c.suggestions),
            vec!["Slow the middle", "Cut adverbs", "End on an image", "Fourth"]
        );
    }

    #[test]
    fn critique_without_markers_keeps_raw_as_assessment() {
        let c = parse_critique("  It is fine, I suppose.  ");
        assert_eq!(c.strengths, "");
        assert_eq!(c.suggestions, "");
        assert_eq!(c.overall_assessment, "It is fine, I suppose.");
    }

    #[test]
    fn voice_section_or_raw() {
        assert_eq!(parse_voice("Some preamble\nVOICE PRINCIPLES:\n1. Plain words."), "1. Plain words.");
        assert_eq!(parse_voice("**Voice Principles:** Be brief."), "Be brief.");
        assert_eq!(parse_voice(" 1. Plain words. "), "1. Plain words.");
    }

    #[test]
    fn bullet_pairs() {
        let raw = "Here you go:\n- Salt Wind: The air tastes of the sea.\n- **Gulls**: Loud above the pier.\n- no colon here\nnot a bullet: ignored";
        let pairs = parse_bullet_pairs(raw);
        assert_eq!(
            pairs,
            vec![
                ("Salt Wind".to_string(), "The air tastes of the sea.".to_string()),
                ("Gulls".to_string(), "Loud above the pier.".to_string()),
            ]
        );
    }
}
