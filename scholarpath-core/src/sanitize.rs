//! Cleanup for LLM-produced explanation text before it is displayed.
//!
//! The cleanup is an ordered pipeline of small pure rules. Each rule is
//! public so it can be tested on its own; [`clean`] runs them in order and
//! [`sanitize`] additionally applies the minimum-length cutoff.

use regex::Regex;
use std::sync::LazyLock;

/// Cleaned explanations shorter than this (in characters) carry no usable content.
pub const MIN_EXPLANATION_CHARS: usize = 25;

static PREAMBLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*(?:here are the explanations|i['’]?ll explain each figure|i['’]?d be happy to explain)[^:\n]*:",
    )
    .expect("preamble pattern is valid")
});

static DISCLAIMER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)i do not have (?:direct )?access.*$").expect("disclaimer pattern is valid")
});

static FIGURE_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)fig\.?\s*\d+[:.\-\s]*").expect("figure reference pattern is valid")
});

/// Remove a conversational opener such as "Here are the explanations...:".
///
/// Only an opener at the start of the text counts. It is removed from the
/// phrase up to and including the first colon on the same line.
pub fn strip_preambles(text: &str) -> String {
    PREAMBLE.replace(text, "").into_owned()
}

/// Remove "I do not have (direct) access..." disclaimers through the end of the text.
pub fn strip_disclaimers(text: &str) -> String {
    DISCLAIMER.replace_all(text, "").into_owned()
}

/// Remove figure reference tokens like `Fig. 3:` or `fig 12 -`.
pub fn strip_figure_refs(text: &str) -> String {
    FIGURE_REF.replace_all(text, "").into_owned()
}

/// Remove markdown bold delimiters.
pub fn strip_bold_markers(text: &str) -> String {
    text.replace("**", "")
}

fn clean_once(text: &str) -> String {
    let text = strip_preambles(text);
    let text = strip_disclaimers(&text);
    let text = strip_figure_refs(&text);
    let text = strip_bold_markers(&text);
    text.trim().to_string()
}

/// Run the rule pipeline until the text stops changing.
///
/// A single pass can expose a new match (`fig**. 1` only becomes a figure
/// reference once the bold markers are gone), so the pipeline is repeated.
/// Every rule only deletes characters, so this terminates.
pub fn clean(raw: &str) -> String {
    let mut current = clean_once(raw);
    loop {
        let next = clean_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

/// Clean an explanation and return `None` when nothing usable remains.
pub fn sanitize(raw: &str) -> Option<String> {
    let cleaned = clean(raw);
    if cleaned.chars().count() < MIN_EXPLANATION_CHARS {
        None
    } else {
        Some(cleaned)
    }
}
