use super::matcher::{find_occurrences, is_word_char};
use crate::types::{Highlight, MatchMode};

pub const ELLIPSIS: char = '…';

/// How far a window edge may move outward to avoid cutting a word.
const MAX_WORD_WIDEN: usize = 20;

pub(crate) struct ExcerptSpec<'a> {
    /// Display text (whitespace already flattened to spaces).
    pub plain: &'a [char],
    /// Text the terms were matched against; same length as `plain`.
    pub haystack: &'a [char],
    pub anchor: usize,
    pub anchor_len: usize,
    pub terms: &'a [Vec<char>],
    pub mode: MatchMode,
    pub max_chars: usize,
    pub highlight: Option<&'a Highlight>,
}

/// Window of `max_chars` around the anchor, match about a third of the way in.
pub(crate) fn excerpt_window(
    plain: &[char],
    anchor: usize,
    anchor_len: usize,
    max_chars: usize,
) -> (usize, usize) {
    let len = plain.len();
    if len <= max_chars {
        return (0, len);
    }

    let lead = max_chars / 3;
    let mut start = anchor.saturating_sub(lead);
    let mut end = (start + max_chars).min(len);
    if end == len {
        start = len - max_chars;
    }
    end = end.max((anchor + anchor_len).min(len));

    let mut widened = 0;
    while start > 0
        && widened < MAX_WORD_WIDEN
        && is_word_char(plain[start - 1])
        && is_word_char(plain[start])
    {
        start -= 1;
        widened += 1;
    }
    widened = 0;
    while end < len
        && widened < MAX_WORD_WIDEN
        && is_word_char(plain[end - 1])
        && is_word_char(plain[end])
    {
        end += 1;
        widened += 1;
    }

    while start < end && plain[start] == ' ' {
        start += 1;
    }
    while end > start && plain[end - 1] == ' ' {
        end -= 1;
    }
    (start, end)
}

pub(crate) fn build_excerpt(spec: &ExcerptSpec<'_>) -> String {
    let len = spec.plain.len();
    let (start, end) = excerpt_window(spec.plain, spec.anchor, spec.anchor_len, spec.max_chars);

    let mut out = String::new();
    if start > 0 {
        out.push(ELLIPSIS);
    }

    match spec.highlight {
        Some(highlight) => {
            let spans = highlight_spans(spec, start, end);
            let mut cursor = start;
            for (s, e) in spans {
                out.extend(&spec.plain[cursor..s]);
                out.push_str(&highlight.pre);
                out.extend(&spec.plain[s..e]);
                out.push_str(&highlight.post);
                cursor = e;
            }
            out.extend(&spec.plain[cursor..end]);
        }
        None => out.extend(&spec.plain[start..end]),
    }

    if end < len {
        out.push(ELLIPSIS);
    }
    out
}

/// Sorted, merged spans of term occurrences fully inside `[start, end)`.
fn highlight_spans(spec: &ExcerptSpec<'_>, start: usize, end: usize) -> Vec<(usize, usize)> {
    let mut spans: Vec<(usize, usize)> = spec
        .terms
        .iter()
        .flat_map(|term| {
            find_occurrences(spec.haystack, term, spec.mode)
                .into_iter()
                .map(move |s| (s, s + term.len()))
        })
        .filter(|&(s, e)| s >= start && e <= end)
        .collect();
    spans.sort_unstable();

    let mut merged: Vec<(usize, usize)> = Vec::with_capacity(spans.len());
    for (s, e) in spans {
        match merged.last_mut() {
            Some(last) if s <= last.1 => last.1 = last.1.max(e),
            _ => merged.push((s, e)),
        }
    }
    merged
}
