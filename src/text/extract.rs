use super::clean::clean_text;
use super::richtext;
use crate::core::config::ExtractConfig;
use crate::types::{Document, TextEntry};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashSet;
use tracing::debug;

/// Infix separating a field name from its translation locale: `title__i18n__de`.
pub const I18N_MARKER: &str = "__i18n__";

/// Keys whose values are CMS plumbing rather than prose.
pub const DEFAULT_SKIP_KEYS: &[&str] = &[
    "_uid",
    "_editable",
    "component",
    "id",
    "uuid",
    "slug",
    "full_slug",
    "default_full_slug",
    "parent_id",
    "group_id",
    "position",
    "created_at",
    "updated_at",
    "published_at",
    "first_published_at",
    "sort_by_date",
    "is_startpage",
    "is_folder",
    "lang",
    "path",
    "release_id",
    "alternates",
    "translated_slugs",
    "tag_list",
    "meta_data",
    "linktype",
    "fieldtype",
    "cached_url",
    "url",
    "href",
    "filename",
    "plugin",
    "attrs",
    "marks",
    "type",
    "anchor",
    "target",
    "focus",
    "source",
    "copyright",
    "content_type",
];

static RE_HEX_COLOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^#(?:[0-9a-fA-F]{3,4}|[0-9a-fA-F]{6}|[0-9a-fA-F]{8})$").unwrap()
});
static RE_ISO_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\d{4}-\d{2}-\d{2}(?:[T ]\d{2}:\d{2}(?::\d{2}(?:\.\d+)?)?(?:Z|[+-]\d{2}:?\d{2})?)?$",
    )
    .unwrap()
});
static RE_UUID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
        .unwrap()
});
static RE_ASSET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^\S+\.(?:png|jpe?g|gif|webp|svg|avif|ico|bmp|tiff?|mp4|webm|mov|m4v|mp3|wav|ogg|pdf|zip|docx?|xlsx?|pptx?|csv|json)$",
    )
    .unwrap()
});

#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Requested translation. `None` reads only untranslated fields.
    pub locale: Option<String>,
    pub skip_keys: HashSet<String>,
    /// Minimum cleaned length in characters.
    pub min_text_chars: usize,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            locale: None,
            skip_keys: DEFAULT_SKIP_KEYS.iter().map(|k| k.to_string()).collect(),
            min_text_chars: 2,
        }
    }
}

impl ExtractOptions {
    pub fn from_config(cfg: &ExtractConfig, locale: Option<String>) -> Self {
        let mut opts = Self::default().with_locale(locale);
        opts.skip_keys
            .extend(cfg.skip_keys.iter().map(|k| k.trim().to_string()));
        opts.min_text_chars = cfg.resolve_min_text_chars();
        opts
    }

    pub fn with_locale(mut self, locale: Option<String>) -> Self {
        self.locale = locale
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty());
        self
    }

    fn wants_locale(&self, locale: &str) -> bool {
        self.locale
            .as_deref()
            .map(|want| want.eq_ignore_ascii_case(locale))
            .unwrap_or(false)
    }
}

/// Split `title__i18n__de` into (`title`, `Some("de")`). Plain keys return `None`.
pub fn split_localized_key(key: &str) -> (&str, Option<&str>) {
    match key.split_once(I18N_MARKER) {
        Some((base, locale)) if !base.is_empty() && !locale.is_empty() => (base, Some(locale)),
        _ => (key, None),
    }
}

/// True for strings that are identifiers, links, dates or other non-prose values.
pub fn is_technical_value(value: &str) -> bool {
    let v = value.trim();
    if v.is_empty() {
        return true;
    }
    let single_token = !v.chars().any(char::is_whitespace);

    if single_token
        && ["http://", "https://", "//", "mailto:", "tel:"]
            .iter()
            .any(|p| v.starts_with(p))
    {
        return true;
    }
    if RE_HEX_COLOR.is_match(v) || RE_ISO_DATE.is_match(v) || RE_UUID.is_match(v) {
        return true;
    }
    if v.chars().any(|c| c.is_ascii_digit()) && v.parse::<f64>().is_ok() {
        return true;
    }
    if RE_ASSET.is_match(v) {
        return true;
    }
    !v.chars().any(char::is_alphabetic)
}

/// Walk `value` and return every human-readable text field, cleaned.
///
/// Document id/slug on the returned entries are left empty; `document_from_story` fills them.
pub fn extract_text(value: &Value, opts: &ExtractOptions) -> Vec<TextEntry> {
    let mut out = Vec::new();
    walk(value, "", "", None, opts, &mut out);
    out
}

/// Build a `Document` from one story object: its `name` plus everything under `content`.
pub fn document_from_story(story: &Value, opts: &ExtractOptions) -> Document {
    let id = match story.get("id") {
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        _ => str_field(story, "uuid"),
    };
    let slug = Some(str_field(story, "full_slug"))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| str_field(story, "slug"));
    let name = str_field(story, "name");

    let mut entries = Vec::new();
    push_text(&name, "name", "name", None, opts, &mut entries);
    if let Some(content) = story.get("content") {
        walk(content, "content", "content", None, opts, &mut entries);
    }

    for entry in &mut entries {
        entry.document_id = id.clone();
        entry.document_slug = slug.clone();
    }
    debug!(
        "extracted {} entries from story '{}' (locale: {:?})",
        entries.len(),
        slug,
        opts.locale
    );

    Document {
        id,
        slug,
        name: clean_text(&name),
        entries,
    }
}

fn str_field(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

fn child_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", parent, key)
    }
}

fn walk(
    value: &Value,
    path: &str,
    field: &str,
    locale: Option<&str>,
    opts: &ExtractOptions,
    out: &mut Vec<TextEntry>,
) {
    match value {
        Value::Object(map) => {
            if richtext::is_rich_text(map) {
                let flat = richtext::flatten(value);
                push_text(&flat, path, field, locale, opts, out);
                return;
            }
            walk_object(map, path, locale, opts, out);
        }
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                let item_path = format!("{}[{}]", path, index);
                walk(item, &item_path, field, locale, opts, out);
            }
        }
        Value::String(text) => {
            if !is_technical_value(text) {
                push_text(text, path, field, locale, opts, out);
            }
        }
        Value::Number(_) | Value::Bool(_) | Value::Null => {}
    }
}

fn walk_object(
    map: &Map<String, Value>,
    path: &str,
    inherited_locale: Option<&str>,
    opts: &ExtractOptions,
    out: &mut Vec<TextEntry>,
) {
    for (key, child) in map {
        let (base, key_locale) = split_localized_key(key);
        if opts.skip_keys.contains(key) || opts.skip_keys.contains(base) {
            continue;
        }

        let next_path = child_path(path, key);
        match key_locale {
            Some(key_locale) => {
                if opts.wants_locale(key_locale) {
                    walk(child, &next_path, base, Some(key_locale), opts, out);
                }
            }
            None => {
                if let Some(want) = opts.locale.as_deref() {
                    if has_translation(map, base, want) {
                        continue;
                    }
                }
                walk(child, &next_path, key, inherited_locale, opts, out);
            }
        }
    }
}

/// Does `map` carry a non-empty `base__i18n__<locale>` sibling?
fn has_translation(map: &Map<String, Value>, base: &str, locale: &str) -> bool {
    map.iter().any(|(key, value)| {
        let (key_base, key_locale) = split_localized_key(key);
        key_base == base
            && key_locale
                .map(|l| l.eq_ignore_ascii_case(locale))
                .unwrap_or(false)
            && !is_empty_value(value)
    })
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Number(_) | Value::Bool(_) => false,
    }
}

fn push_text(
    raw: &str,
    path: &str,
    field: &str,
    locale: Option<&str>,
    opts: &ExtractOptions,
    out: &mut Vec<TextEntry>,
) {
    let text = clean_text(raw);
    if text.is_empty() || text.chars().count() < opts.min_text_chars {
        return;
    }
    out.push(TextEntry {
        document_id: String::new(),
        document_slug: String::new(),
        path: path.to_string(),
        field: field.to_string(),
        locale: locale.map(|l| l.to_string()),
        text,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn texts(entries: &[TextEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.text.as_str()).collect()
    }

    #[test]
    fn walks_nested_components_in_order() {
        let content = json!({
            "component": "page",
            "_uid": "1f0c6a52-1b2c-4d3e-8f90-a1b2c3d4e5f6",
            "title": "Summer **sale**",
            "body": [
                {"component": "teaser", "headline": "Big savings", "color": "#ff8800"},
                {"component": "image", "image": {"filename": "https://a.example.com/x.png", "alt": "Beach at dusk"}}
            ]
        });
        let entries = extract_text(&content, &ExtractOptions::default());
        assert_eq!(texts(&entries), vec!["Summer sale", "Big savings", "Beach at dusk"]);
        assert_eq!(entries[1].path, "body[0].headline");
        assert_eq!(entries[1].field, "headline");
        assert_eq!(entries[2].path, "body[1].image.alt");
    }

    #[test]
    fn technical_values_are_ignored() {
        for v in [
            "https://example.com/page",
            "#fff",
            "2024-05-01T10:00:00.000Z",
            "2024-05-01",
            "8b0e4e6a-3f1c-4b5d-9a2e-7c6d5e4f3a21",
            "42",
            "-3.5",
            "hero-banner.JPG",
            "---",
        ] {
            assert!(is_technical_value(v), "expected technical: {}", v);
        }
        assert!(!is_technical_value("Visit https://example.com today"));
        assert!(!is_technical_value("Hello"));
    }

    #[test]
    fn localized_field_replaces_default() {
        let content = json!({
            "title": "Hello",
            "title__i18n__de": "Hallo",
            "title__i18n__fr": "Bonjour",
            "intro": "Only english"
        });

        let de = extract_text(&content, &ExtractOptions::default().with_locale(Some("DE".into())));
        assert_eq!(texts(&de), vec!["Hallo", "Only english"]);
        assert_eq!(de[0].field, "title");
        assert_eq!(de[0].locale.as_deref(), Some("de"));
        assert_eq!(de[0].path, "title__i18n__de");
        assert_eq!(de[1].locale, None);

        let default = extract_text(&content, &ExtractOptions::default());
        assert_eq!(texts(&default), vec!["Hello", "Only english"]);
    }

    #[test]
    fn empty_translation_falls_back_to_default() {
        let content = json!({"title": "Hello", "title__i18n__de": "  "});
        let de = extract_text(&content, &ExtractOptions::default().with_locale(Some("de".into())));
        assert_eq!(texts(&de), vec!["Hello"]);
    }

    #[test]
    fn localized_subtrees_inherit_locale() {
        let content = json!({
            "body__i18n__es": [{"component": "text", "text": "Hola mundo"}]
        });
        let es = extract_text(&content, &ExtractOptions::default().with_locale(Some("es".into())));
        assert_eq!(es.len(), 1);
        assert_eq!(es[0].locale.as_deref(), Some("es"));
        assert_eq!(es[0].path, "body__i18n__es[0].text");
    }

    #[test]
    fn rich_text_becomes_one_entry() {
        let content = json!({
            "description": {
                "type": "doc",
                "content": [
                    {"type": "paragraph", "content": [{"type": "text", "text": "First line"}]},
                    {"type": "paragraph", "content": [{"type": "text", "text": "Second line"}]}
                ]
            }
        });
        let entries = extract_text(&content, &ExtractOptions::default());
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].text, "First line\nSecond line");
        assert_eq!(entries[0].field, "description");
    }

    #[test]
    fn short_and_custom_skipped_values_are_dropped() {
        let cfg = ExtractConfig {
            skip_keys: vec!["internal_note".into()],
            min_text_chars: Some(4),
        };
        let opts = ExtractOptions::from_config(&cfg, None);
        let content = json!({"label": "Go", "internal_note": "do not index", "body": "Kept text"});
        assert_eq!(texts(&extract_text(&content, &opts)), vec!["Kept text"]);
    }

    #[test]
    fn story_becomes_document() {
        let story = json!({
            "id": 101,
            "name": "About us",
            "slug": "about",
            "full_slug": "en/about",
            "content": {"component": "page", "text": "We make **bikes**."}
        });
        let doc = document_from_story(&story, &ExtractOptions::default());
        assert_eq!(doc.id, "101");
        assert_eq!(doc.slug, "en/about");
        assert_eq!(doc.name, "About us");
        assert_eq!(texts(&doc.entries), vec!["About us", "We make bikes."]);
        assert!(doc.entries.iter().all(|e| e.document_slug == "en/about"));
        assert_eq!(doc.entries[1].path, "content.text");
    }
}
