//! Linear-scan search over extracted entries.
//!
//! Scoring (per entry):
//! - +1 per term occurrence, +2 more when that occurrence is a whole word (substring mode)
//! - +10 per full-phrase occurrence for multi-term queries
//! - +5 when every term occurs, +3 when the text starts with the query
//! - doubled for boosted fields, then damped by text length

mod excerpt;
pub mod matcher;

use crate::types::{Document, MatchMode, SearchHit, SearchOptions, TextEntry};
use excerpt::{build_excerpt, ExcerptSpec};
use matcher::{find_occurrences, fold_chars, is_whole_word};
use std::cmp::Ordering;
use tracing::debug;

pub use excerpt::ELLIPSIS;

const TERM_WEIGHT: f64 = 1.0;
const WHOLE_WORD_BONUS: f64 = 2.0;
const PHRASE_WEIGHT: f64 = 10.0;
const ALL_TERMS_BONUS: f64 = 5.0;
const PREFIX_BONUS: f64 = 3.0;
const FIELD_BOOST: f64 = 2.0;
const LENGTH_DAMPING_CHARS: f64 = 500.0;

#[derive(Debug)]
struct IndexedEntry {
    entry: TextEntry,
    /// Display chars, whitespace flattened.
    plain: Vec<char>,
    /// Lowercased `plain`.
    folded: Vec<char>,
}

/// In-memory corpus of cleaned entries.
#[derive(Debug)]
pub struct SearchIndex {
    entries: Vec<IndexedEntry>,
    documents: usize,
}

struct Query {
    phrase: Vec<char>,
    /// Distinct terms; a repeated word is scored once.
    terms: Vec<Vec<char>>,
    /// Words in the query, repeats included.
    words: usize,
}

impl Query {
    fn parse(raw: &str, case_sensitive: bool) -> Option<Self> {
        let normalized = raw.split_whitespace().collect::<Vec<_>>().join(" ");
        if normalized.is_empty() {
            return None;
        }

        let mut terms: Vec<Vec<char>> = Vec::new();
        let mut words = 0;
        for word in normalized.split(' ') {
            words += 1;
            let folded = fold_chars(word, case_sensitive);
            if !terms.contains(&folded) {
                terms.push(folded);
            }
        }
        Some(Self {
            phrase: fold_chars(&normalized, case_sensitive),
            terms,
            words,
        })
    }

    fn is_multi_term(&self) -> bool {
        self.words > 1
    }
}

struct Scored<'a> {
    item: &'a IndexedEntry,
    score: f64,
    match_count: usize,
    anchor: usize,
    anchor_len: usize,
}

impl SearchIndex {
    pub fn new(documents: Vec<Document>) -> Self {
        let count = documents.len();
        let entries = documents.into_iter().flat_map(|d| d.entries).collect();
        let mut index = Self::from_entries(entries);
        index.documents = count;
        index
    }

    pub fn from_entries(entries: Vec<TextEntry>) -> Self {
        let mut slugs: Vec<&str> = entries.iter().map(|e| e.document_slug.as_str()).collect();
        slugs.sort_unstable();
        slugs.dedup();
        let documents = slugs.len();

        let entries = entries
            .into_iter()
            .map(|entry| {
                let plain = fold_chars(&entry.text, true);
                let folded = fold_chars(&entry.text, false);
                IndexedEntry {
                    entry,
                    plain,
                    folded,
                }
            })
            .collect();
        Self { entries, documents }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn document_count(&self) -> usize {
        self.documents
    }

    pub fn entries(&self) -> impl Iterator<Item = &TextEntry> {
        self.entries.iter().map(|e| &e.entry)
    }

    pub fn search(&self, query: &str, opts: &SearchOptions) -> Vec<SearchHit> {
        self.search_with_total(query, opts).1
    }

    /// Ranked hits plus the number of matching entries before `limit` was applied.
    pub fn search_with_total(&self, query: &str, opts: &SearchOptions) -> (usize, Vec<SearchHit>) {
        let Some(query) = Query::parse(query, opts.case_sensitive) else {
            return (0, Vec::new());
        };

        let mut scored: Vec<Scored<'_>> = self
            .entries
            .iter()
            .filter_map(|item| score_entry(item, &query, opts))
            .collect();
        scored.sort_by(compare_scored);

        let total = scored.len();
        if opts.limit > 0 {
            scored.truncate(opts.limit);
        }
        debug!(
            "search matched {} of {} entries ({} terms, mode {})",
            total,
            self.entries.len(),
            query.terms.len(),
            opts.mode.as_str()
        );

        let hits = scored
            .into_iter()
            .map(|s| to_hit(s, &query, opts))
            .collect();
        (total, hits)
    }
}

fn haystack<'a>(item: &'a IndexedEntry, opts: &SearchOptions) -> &'a [char] {
    if opts.case_sensitive {
        &item.plain
    } else {
        &item.folded
    }
}

fn score_entry<'a>(item: &'a IndexedEntry, query: &Query, opts: &SearchOptions) -> Option<Scored<'a>> {
    let hay = haystack(item, opts);

    let mut score = 0.0;
    let mut match_count = 0;
    let mut terms_found = 0;
    let mut first_term: Option<(usize, usize)> = None;

    for term in &query.terms {
        let occurrences = find_occurrences(hay, term, opts.mode);
        if occurrences.is_empty() {
            continue;
        }
        terms_found += 1;
        match_count += occurrences.len();
        score += TERM_WEIGHT * occurrences.len() as f64;
        if opts.mode == MatchMode::Substring {
            let whole = occurrences
                .iter()
                .filter(|&&s| is_whole_word(hay, s, term.len()))
                .count();
            score += WHOLE_WORD_BONUS * whole as f64;
        }
        let first = occurrences[0];
        if first_term.map(|(s, _)| first < s).unwrap_or(true) {
            first_term = Some((first, term.len()));
        }
    }

    let (first, first_len) = first_term?;

    let phrase_hits = find_occurrences(hay, &query.phrase, opts.mode);
    if query.is_multi_term() {
        score += PHRASE_WEIGHT * phrase_hits.len() as f64;
    }
    if terms_found == query.terms.len() {
        score += ALL_TERMS_BONUS;
    }
    if phrase_hits.first() == Some(&0) {
        score += PREFIX_BONUS;
    }
    if opts
        .boost_fields
        .iter()
        .any(|f| f.eq_ignore_ascii_case(&item.entry.field))
    {
        score *= FIELD_BOOST;
    }
    score /= 1.0 + (1.0 + item.plain.len() as f64 / LENGTH_DAMPING_CHARS).ln();

    let (anchor, anchor_len) = match phrase_hits.first() {
        Some(&p) => (p, query.phrase.len()),
        None => (first, first_len),
    };

    Some(Scored {
        item,
        score,
        match_count,
        anchor,
        anchor_len,
    })
}

fn compare_scored(a: &Scored<'_>, b: &Scored<'_>) -> Ordering {
    b.score
        .partial_cmp(&a.score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| b.match_count.cmp(&a.match_count))
        .then_with(|| a.item.plain.len().cmp(&b.item.plain.len()))
        .then_with(|| a.item.entry.document_slug.cmp(&b.item.entry.document_slug))
        .then_with(|| a.item.entry.path.cmp(&b.item.entry.path))
}

fn to_hit(scored: Scored<'_>, query: &Query, opts: &SearchOptions) -> SearchHit {
    let item = scored.item;
    let excerpt = build_excerpt(&ExcerptSpec {
        plain: &item.plain,
        haystack: haystack(item, opts),
        anchor: scored.anchor,
        anchor_len: scored.anchor_len,
        terms: &query.terms,
        mode: opts.mode,
        max_chars: opts.excerpt_chars.max(1),
        highlight: opts.highlight.as_ref(),
    });

    SearchHit {
        document_id: item.entry.document_id.clone(),
        document_slug: item.entry.document_slug.clone(),
        path: item.entry.path.clone(),
        field: item.entry.field.clone(),
        locale: item.entry.locale.clone(),
        score: (scored.score * 1000.0).round() / 1000.0,
        match_count: scored.match_count,
        excerpt,
    }
}
