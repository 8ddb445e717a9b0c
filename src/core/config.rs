use std::path::PathBuf;

// ---------------------------------------------------------------------------
// SearchConfig: file-based config loader (cms-search.json) with env-var fallback
// ---------------------------------------------------------------------------

pub const ENV_CONFIG_PATH: &str = "CMS_SEARCH_CONFIG";
pub const ENV_BASE_URL: &str = "CMS_BASE_URL";
pub const ENV_TOKEN: &str = "CMS_TOKEN";
pub const ENV_VERSION: &str = "CMS_VERSION";
pub const ENV_LANGUAGE: &str = "CMS_LANGUAGE";
pub const ENV_PER_PAGE: &str = "CMS_PER_PAGE";
pub const ENV_MAX_PAGES: &str = "CMS_MAX_PAGES";
pub const ENV_STARTS_WITH: &str = "CMS_STARTS_WITH";
pub const ENV_MAX_RETRY_SECS: &str = "CMS_MAX_RETRY_SECS";
pub const ENV_INDEX_TTL_SECS: &str = "INDEX_TTL_SECS";

pub const DEFAULT_BASE_URL: &str = "https://api.storyblok.com/v2/cdn";
pub const DEFAULT_BOOST_FIELDS: &[&str] = &["title", "name", "headline", "heading"];

fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env_string(key).and_then(|v| v.parse().ok())
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_ref()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Content delivery API settings (mirrors the `cms` key in cms-search.json).
#[derive(serde::Deserialize, Default, Clone, Debug)]
pub struct CmsConfig {
    /// API root, e.g. `https://api.storyblok.com/v2/cdn`.
    pub base_url: Option<String>,
    /// Delivery token. Never logged.
    pub token: Option<String>,
    /// `published` or `draft`.
    pub version: Option<String>,
    pub default_language: Option<String>,
    pub per_page: Option<u32>,
    pub max_pages: Option<u32>,
    /// Only fetch stories whose full slug starts with this prefix.
    pub starts_with: Option<String>,
    /// Upper bound on time spent retrying one request.
    pub max_retry_secs: Option<u64>,
}

impl CmsConfig {
    /// Base URL: JSON field → `CMS_BASE_URL` → public delivery endpoint.
    /// Trailing slashes are removed.
    pub fn resolve_base_url(&self) -> String {
        non_blank(&self.base_url)
            .or_else(|| env_string(ENV_BASE_URL))
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string()
    }

    /// Token: JSON field → `CMS_TOKEN` → `None`.
    pub fn resolve_token(&self) -> Option<String> {
        non_blank(&self.token).or_else(|| env_string(ENV_TOKEN))
    }

    /// Content version: JSON field → `CMS_VERSION` → `published`.
    /// Anything other than `draft` is treated as `published`.
    pub fn resolve_version(&self) -> &'static str {
        let raw = non_blank(&self.version).or_else(|| env_string(ENV_VERSION));
        match raw.map(|v| v.to_ascii_lowercase()) {
            Some(v) if v == "draft" => "draft",
            _ => "published",
        }
    }

    pub fn resolve_default_language(&self) -> Option<String> {
        non_blank(&self.default_language).or_else(|| env_string(ENV_LANGUAGE))
    }

    /// Page size: JSON field → `CMS_PER_PAGE` → 100, clamped to 1..=100.
    pub fn resolve_per_page(&self) -> u32 {
        self.per_page
            .or_else(|| env_parse(ENV_PER_PAGE))
            .unwrap_or(100)
            .clamp(1, 100)
    }

    pub fn resolve_max_pages(&self) -> u32 {
        self.max_pages
            .or_else(|| env_parse(ENV_MAX_PAGES))
            .unwrap_or(50)
            .max(1)
    }

    pub fn resolve_starts_with(&self) -> Option<String> {
        non_blank(&self.starts_with).or_else(|| env_string(ENV_STARTS_WITH))
    }

    pub fn resolve_max_retry_secs(&self) -> u64 {
        self.max_retry_secs
            .or_else(|| env_parse(ENV_MAX_RETRY_SECS))
            .unwrap_or(10)
    }
}

/// Tree-walk settings (mirrors the `extract` key).
#[derive(serde::Deserialize, Default, Clone, Debug)]
pub struct ExtractConfig {
    /// Extra keys skipped on top of the built-in technical-key list.
    #[serde(default)]
    pub skip_keys: Vec<String>,
    pub min_text_chars: Option<usize>,
}

impl ExtractConfig {
    pub fn resolve_min_text_chars(&self) -> usize {
        self.min_text_chars.unwrap_or(2)
    }
}

/// Search defaults applied when a request leaves a knob unset (mirrors the `search` key).
#[derive(serde::Deserialize, Default, Clone, Debug)]
pub struct SearchDefaults {
    pub max_results: Option<usize>,
    pub excerpt_chars: Option<usize>,
    pub whole_word: Option<bool>,
    pub boost_fields: Option<Vec<String>>,
}

impl SearchDefaults {
    pub fn resolve_max_results(&self) -> usize {
        self.max_results.unwrap_or(20)
    }

    /// Excerpt width in characters, never below 20.
    pub fn resolve_excerpt_chars(&self) -> usize {
        self.excerpt_chars.unwrap_or(160).max(20)
    }

    pub fn resolve_whole_word(&self) -> bool {
        self.whole_word.unwrap_or(false)
    }

    pub fn resolve_boost_fields(&self) -> Vec<String> {
        match &self.boost_fields {
            Some(fields) => fields.iter().map(|f| f.trim().to_string()).collect(),
            None => DEFAULT_BOOST_FIELDS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Top-level config loaded from `cms-search.json`.
#[derive(serde::Deserialize, Default, Clone, Debug)]
pub struct SearchConfig {
    #[serde(default)]
    pub cms: CmsConfig,
    #[serde(default)]
    pub extract: ExtractConfig,
    #[serde(default)]
    pub search: SearchDefaults,
}

/// Load `cms-search.json` from standard locations.
///
/// Search order (first found wins):
/// 1. `CMS_SEARCH_CONFIG` env var path
/// 2. `./cms-search.json`
/// 3. `../cms-search.json`
///
/// Missing file → `SearchConfig::default()` (silent, all env-var fallbacks apply).
/// Parse error → log a warning, return `SearchConfig::default()`.
pub fn load_search_config() -> SearchConfig {
    let mut candidates = vec![
        PathBuf::from("cms-search.json"),
        PathBuf::from("../cms-search.json"),
    ];
    if let Some(env_path) = env_string(ENV_CONFIG_PATH) {
        candidates.insert(0, PathBuf::from(env_path));
    }

    for path in &candidates {
        let Ok(contents) = std::fs::read_to_string(path) else {
            continue;
        };
        return match parse_search_config(&contents) {
            Ok(cfg) => {
                tracing::info!("cms-search.json loaded from {}", path.display());
                cfg
            }
            Err(e) => {
                tracing::warn!(
                    "cms-search.json parse error at {}: {} - using defaults",
                    path.display(),
                    e
                );
                SearchConfig::default()
            }
        };
    }

    SearchConfig::default()
}

pub fn parse_search_config(contents: &str) -> serde_json::Result<SearchConfig> {
    serde_json::from_str(contents)
}

/// Lifetime of a cached search index before it is rebuilt from the CMS.
pub fn index_ttl_secs() -> u64 {
    env_parse(ENV_INDEX_TTL_SECS).unwrap_or(300)
}
