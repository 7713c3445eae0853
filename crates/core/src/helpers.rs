//! Helper functions for text normalization and paragraph handling.

use regex::Regex;
use std::sync::LazyLock;

use crate::PARAGRAPH_SEPARATOR;

static WHITESPACE_RUN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Map typographic variants onto their plain ASCII spelling.
///
/// Curly quotes become straight quotes, an em dash becomes `--`, an en dash
/// becomes `-` and the ellipsis glyph becomes `...`.
fn push_plain(out: &mut String, ch: char) {
    match ch {
        '\u{201c}' | '\u{201d}' => out.push('"'),
        '\u{2018}' | '\u{2019}' => out.push('\''),
        '\u{2014}' => out.push_str("--"),
        '\u{2013}' => out.push('-'),
        '\u{2026}' => out.push_str("..."),
        other => out.push(other),
    }
}

/// Number of chars `ch` occupies once passed through [`push_plain`].
fn plain_width(ch: char) -> usize {
    match ch {
        '\u{2014}' => 2,
        '\u{2026}' => 3,
        _ => 1,
    }
}

/// Normalize text into a canonical form for substring comparison.
///
/// Trims, unifies quote/dash/ellipsis variants and collapses whitespace runs
/// to a single space. Idempotent.
pub fn normalize_text(text: &str) -> String {
    let mut plain = String::with_capacity(text.len());
    for ch in text.trim().chars() {
        push_plain(&mut plain, ch);
    }
    WHITESPACE_RUN_RE.replace_all(&plain, " ").into_owned()
}

/// Running length (in chars) of [`normalize_text`] applied to a growing prefix.
///
/// Feeding the chars of `s` one by one yields, after each char, exactly
/// `normalize_text(prefix).chars().count()` for the prefix seen so far.
#[derive(Debug, Default, Clone, Copy)]
pub struct NormalizedLength {
    len: usize,
    seen_text: bool,
    pending_space: bool,
}

impl NormalizedLength {
    pub fn push(&mut self, ch: char) {
        if ch.is_whitespace() {
            // Leading whitespace is trimmed, trailing whitespace only counts
            // once something follows it.
            self.pending_space = self.seen_text;
            return;
        }
        if self.pending_space {
            self.len += 1;
            self.pending_space = false;
        }
        self.len += plain_width(ch);
        self.seen_text = true;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Normalize a label or slug so underscores and hyphens compare equal.
pub fn normalize_label(label: &str) -> String {
    label.replace('_', "-")
}

/// Split text into paragraphs on exact double-newline boundaries.
///
/// Paragraph content is not trimmed, so joining the result with
/// [`PARAGRAPH_SEPARATOR`] reproduces the input exactly.
pub fn segment_paragraphs(text: &str) -> Vec<&str> {
    text.split(PARAGRAPH_SEPARATOR).collect()
}

/// Join paragraphs back together with [`PARAGRAPH_SEPARATOR`].
pub fn join_paragraphs(paragraphs: &[&str]) -> String {
    paragraphs.join(PARAGRAPH_SEPARATOR)
}

/// Remove a prompt (the opening of an essay) from the essay text.
///
/// Both texts are compared in normalized form, so the prompt may differ from
/// the essay in quote style, dash style or whitespace. The match end is mapped
/// back onto the original text and the remainder starts at the next paragraph
/// boundary after it, with leading newlines removed. If the match ends in the
/// last paragraph, the rest of that paragraph is returned trimmed.
///
/// Returns `None` when the prompt cannot be located; the caller decides how
/// to report that.
pub fn strip_prompt<'a>(essay: &'a str, prompt: &str) -> Option<&'a str> {
    let norm_prompt = normalize_text(prompt);
    if norm_prompt.is_empty() {
        return None;
    }
    let norm_essay = normalize_text(essay);
    let idx = norm_essay.find(&norm_prompt)?;
    let match_end = norm_essay[..idx].chars().count() + norm_prompt.chars().count();

    let mut consumed = NormalizedLength::default();
    let mut cut = essay.len();
    for (i, ch) in essay.char_indices() {
        consumed.push(ch);
        if consumed.len() >= match_end {
            cut = i + ch.len_utf8();
            break;
        }
    }

    let rest = &essay[cut..];
    match rest.find(PARAGRAPH_SEPARATOR) {
        Some(boundary) => Some(rest[boundary..].trim_start_matches('\n')),
        None => Some(rest.trim()),
    }
}

/// Single-line preview of at most `max_chars` chars, with `...` when cut.
pub fn preview(text: &str, max_chars: usize) -> String {
    let mut out: String = text.chars().take(max_chars).collect();
    out = out.replace('\n', " ");
    if text.chars().count() > max_chars {
        out.push_str("...");
    }
    out
}
