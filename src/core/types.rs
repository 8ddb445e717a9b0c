use serde::{Deserialize, Serialize};

/// One cleaned, human-readable text value pulled out of a story.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct TextEntry {
    pub document_id: String,
    pub document_slug: String,
    /// Dotted path with array indices, e.g. `content.body[2].text`.
    pub path: String,
    /// Base field name, localization suffix removed.
    pub field: String,
    #[serde(default)]
    pub locale: Option<String>,
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Document {
    pub id: String,
    pub slug: String,
    pub name: String,
    pub entries: Vec<TextEntry>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    #[default]
    Substring,
    WholeWord,
}

impl MatchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchMode::Substring => "substring",
            MatchMode::WholeWord => "whole_word",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Highlight {
    pub pre: String,
    pub post: String,
}

#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub mode: MatchMode,
    pub case_sensitive: bool,
    /// Maximum hits returned. `0` means unlimited.
    pub limit: usize,
    pub excerpt_chars: usize,
    pub highlight: Option<Highlight>,
    /// Fields whose score is doubled.
    pub boost_fields: Vec<String>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            mode: MatchMode::Substring,
            case_sensitive: false,
            limit: 20,
            excerpt_chars: 160,
            highlight: None,
            boost_fields: crate::core::config::DEFAULT_BOOST_FIELDS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SearchHit {
    pub document_id: String,
    pub document_slug: String,
    pub path: String,
    pub field: String,
    #[serde(default)]
    pub locale: Option<String>,
    pub score: f64,
    pub match_count: usize,
    pub excerpt: String,
}

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default)]
    pub locale: Option<String>,
    #[serde(default)]
    pub mode: Option<MatchMode>,
    #[serde(default)]
    pub case_sensitive: Option<bool>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub excerpt_chars: Option<usize>,
    #[serde(default)]
    pub highlight: Option<Highlight>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    pub query: String,
    #[serde(default)]
    pub locale: Option<String>,
    /// Number of matching entries before `limit` was applied.
    pub total: usize,
    pub hits: Vec<SearchHit>,
    pub indexed_documents: usize,
}

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct RefreshRequest {
    #[serde(default)]
    pub locale: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshResponse {
    #[serde(default)]
    pub locale: Option<String>,
    pub documents: usize,
    pub entries: usize,
    pub refreshed_at: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
