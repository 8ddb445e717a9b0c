//! Markdown/HTML artifact removal for CMS field text.
//!
//! `clean_text` runs the full chain; the individual stages are public so callers can reuse
//! them (e.g. HTML-only cleanup for fields known to be plain markup).

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html};

static RE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*(?:```|~~~)[^\n]*$").unwrap());
static RE_AUTOLINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<(?:https?|ftp|mailto):[^>\s]*>").unwrap());
static RE_HTML_HINT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)</?[a-z][a-z0-9-]*(?:\s[^>]*)?/?>|&(?:#[0-9]+|#x[0-9a-f]+|[a-z][a-z0-9]+);")
        .unwrap()
});

// Block-level markdown
static RE_REF_DEF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]{0,3}\[[^\]\n]+\]:[ \t]*\S+[^\n]*$").unwrap());
static RE_HEADING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]{0,3}#{1,6}[ \t]+(.*?)(?:[ \t]+#+)?[ \t]*$").unwrap()
});
static RE_HRULE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*(?:(?:\*[ \t]*){3,}|(?:-[ \t]*){3,}|(?:_[ \t]*){3,})$").unwrap()
});
static RE_SETEXT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^[ \t]*=+[ \t]*$").unwrap());
static RE_BLOCKQUOTE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*(?:>[ \t]?)+").unwrap());
static RE_LIST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*(?:[-*+]|[0-9]{1,9}[.)])[ \t]+").unwrap());
static RE_TABLE_SEP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*\|?[ \t]*:?-{3,}:?[ \t]*(?:\|[ \t]*:?-{3,}:?[ \t]*)*\|?[ \t]*$\n?")
        .unwrap()
});

// Inline markdown
static RE_IMAGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"!\[([^\]\n]*)\]\([^)\n]*\)").unwrap());
static RE_LINK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[([^\]\n]+)\]\([^)\n]*\)").unwrap());
static RE_REF_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([^\]\n]+)\]\[[^\]\n]*\]").unwrap());
static RE_INLINE_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"`+([^`\n]*)`+").unwrap());
static RE_BOLD_STAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*([^*\n]+?)\*\*").unwrap());
static RE_BOLD_UNDERSCORE: Lazy<Regex> = Lazy::new(|| Regex::new(r"__([^_\n]+?)__").unwrap());
static RE_STRIKE: Lazy<Regex> = Lazy::new(|| Regex::new(r"~~([^~\n]+?)~~").unwrap());
static RE_ITALIC_STAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*([^*\s](?:[^*\n]*[^*\s])?)\*").unwrap());
static RE_ITALIC_UNDERSCORE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b_([^_\s](?:[^_\n]*[^_\s])?)_\b").unwrap());

const BLOCK_ELEMENTS: &[&str] = &[
    "p", "div", "section", "article", "header", "footer", "aside", "main", "nav", "h1", "h2",
    "h3", "h4", "h5", "h6", "ul", "ol", "li", "dl", "dt", "dd", "blockquote", "pre", "table",
    "thead", "tbody", "tr", "figure", "figcaption", "hr",
];

/// Upper bound on repeated passes; decoding or unwrapping one layer can expose another.
const MAX_PASSES: usize = 8;

/// Full cleaning pipeline: code fences, autolinks, HTML, markdown, whitespace.
///
/// Passes repeat until the text stops changing, so cleaning already-clean text is a no-op.
pub fn clean_text(raw: &str) -> String {
    if raw.trim().is_empty() {
        return String::new();
    }

    let mut current = clean_pass(raw);
    for _ in 1..MAX_PASSES {
        let next = clean_pass(&current);
        if next == current {
            break;
        }
        current = next;
    }
    current
}

fn clean_pass(input: &str) -> String {
    let s = RE_FENCE.replace_all(input, "");
    let s = RE_AUTOLINK.replace_all(&s, "");
    let s = strip_html(&s);
    let s = strip_markdown(&s);
    normalize_whitespace(&s)
}

/// Drop markup and keep text nodes. Inputs without any tag or entity are returned as-is.
///
/// Decoded entities may spell out markup (`&lt;b&gt;`, `&amp;amp;`), so parsing repeats
/// while anything tag- or entity-like remains.
pub fn strip_html(input: &str) -> String {
    let mut current = input.to_string();
    for _ in 0..MAX_PASSES {
        if !RE_HTML_HINT.is_match(&current) {
            break;
        }
        let fragment = Html::parse_fragment(&current);
        let mut out = String::with_capacity(current.len());
        collect_text(fragment.root_element(), &mut out);
        current = out;
    }
    current
}

fn collect_text(element: ElementRef, out: &mut String) {
    for child in element.children() {
        if let Some(child_element) = ElementRef::wrap(child) {
            let tag_name = child_element.value().name();
            if matches!(tag_name, "script" | "style" | "noscript" | "template" | "svg") {
                continue;
            }
            if tag_name == "br" {
                out.push('\n');
                continue;
            }

            let is_block = BLOCK_ELEMENTS.contains(&tag_name);
            if is_block {
                end_line(out);
            }
            collect_text(child_element, out);
            if is_block {
                end_line(out);
            } else if matches!(tag_name, "td" | "th") {
                out.push(' ');
            }
        } else if let Some(text_node) = child.value().as_text() {
            out.push_str(&text_node.text);
        }
    }
}

fn end_line(out: &mut String) {
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
}

/// Remove markdown syntax, keeping the readable text it decorates.
///
/// Nested constructs (`- - item`, `[[a](b)](c)`) lose one layer per pass.
pub fn strip_markdown(input: &str) -> String {
    let mut current = input.to_string();
    for _ in 0..MAX_PASSES {
        let next = strip_markdown_once(&current);
        if next == current {
            break;
        }
        current = next;
    }
    current
}

fn strip_markdown_once(input: &str) -> String {
    // Block constructs first so bullets and rules are not mistaken for emphasis.
    let s = RE_REF_DEF.replace_all(input, "");
    let s = RE_HEADING.replace_all(&s, "$1");
    let s = RE_HRULE.replace_all(&s, "");
    let s = RE_TABLE_SEP.replace_all(&s, "");
    let s = RE_SETEXT.replace_all(&s, "");
    let s = RE_BLOCKQUOTE.replace_all(&s, "");
    let s = RE_LIST.replace_all(&s, "");
    let s = strip_table_pipes(&s);

    let s = RE_IMAGE.replace_all(&s, "$1");
    let s = RE_LINK.replace_all(&s, "$1");
    let s = RE_REF_LINK.replace_all(&s, "$1");
    let s = RE_INLINE_CODE.replace_all(&s, "$1");
    let s = RE_BOLD_STAR.replace_all(&s, "$1");
    let s = RE_BOLD_UNDERSCORE.replace_all(&s, "$1");
    let s = RE_STRIKE.replace_all(&s, "$1");
    let s = RE_ITALIC_STAR.replace_all(&s, "$1");
    let s = RE_ITALIC_UNDERSCORE.replace_all(&s, "$1");
    s.into_owned()
}

/// Table rows (lines starting with a pipe, or carrying two or more) lose their pipes.
fn strip_table_pipes(input: &str) -> String {
    input
        .split('\n')
        .map(|line| {
            let trimmed = line.trim_start();
            if trimmed.starts_with('|') || line.matches('|').count() >= 2 {
                line.replace('|', " ")
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Collapse horizontal whitespace, trim lines and squeeze blank-line runs to one.
pub fn normalize_whitespace(input: &str) -> String {
    let replaced: String = input
        .chars()
        .filter_map(|c| match c {
            '\u{00A0}' | '\u{2007}' | '\u{202F}' | '\t' => Some(' '),
            '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{2060}' | '\u{FEFF}' | '\r' => None,
            other => Some(other),
        })
        .collect();

    let mut lines: Vec<String> = Vec::new();
    let mut pending_blank = false;
    for line in replaced.split('\n') {
        let collapsed = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if collapsed.is_empty() {
            pending_blank = !lines.is_empty();
            continue;
        }
        if pending_blank {
            lines.push(String::new());
            pending_blank = false;
        }
        lines.push(collapsed);
    }

    lines.join("\n")
}
