use super::config::{self, SearchConfig};
use super::types::{RefreshResponse, SearchRequest, SearchResponse};
use crate::cms::{CmsClient, ContentSource};
use crate::search::SearchIndex;
use crate::text::{document_from_story, ExtractOptions};
use crate::types::{MatchMode, SearchOptions};
use anyhow::Result;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// A failed index build, shared by every caller that waited on it.
#[derive(Debug, Clone)]
pub struct IndexBuildError(pub Arc<anyhow::Error>);

impl fmt::Display for IndexBuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for IndexBuildError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&**self.0)
    }
}

#[derive(Clone)]
pub struct AppState {
    pub http_client: reqwest::Client,
    pub source: Arc<dyn ContentSource>,
    pub config: Arc<SearchConfig>,
    // Built indexes, key: locale ("" for the default content)
    pub index_cache: moka::future::Cache<String, Arc<SearchIndex>>,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("source", &self.source.describe())
            .field("cached_indexes", &self.index_cache.entry_count())
            .finish()
    }
}

impl AppState {
    /// State backed by the CMS delivery API described in `config.cms`.
    pub fn new(http_client: reqwest::Client, config: SearchConfig) -> Self {
        let source: Arc<dyn ContentSource> = Arc::new(CmsClient::new(http_client.clone(), &config.cms));
        Self::with_source(http_client, config, source)
    }

    pub fn with_source(
        http_client: reqwest::Client,
        config: SearchConfig,
        source: Arc<dyn ContentSource>,
    ) -> Self {
        let ttl = Duration::from_secs(config::index_ttl_secs());
        Self {
            http_client,
            source,
            config: Arc::new(config),
            index_cache: moka::future::Cache::builder()
                .max_capacity(64)
                .time_to_live(ttl)
                .build(),
        }
    }

    /// Requested locale, else the configured default language.
    pub fn resolve_locale(&self, requested: Option<&str>) -> Option<String> {
        requested
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .or_else(|| self.config.cms.resolve_default_language())
    }

    fn cache_key(locale: Option<&str>) -> String {
        locale.unwrap_or_default().to_ascii_lowercase()
    }

    /// Load stories, extract their text and build a fresh index (no caching).
    pub async fn build_index(&self, locale: Option<&str>) -> Result<Arc<SearchIndex>> {
        let stories = self.source.load_stories(locale).await?;
        let opts = ExtractOptions::from_config(&self.config.extract, locale.map(str::to_string));
        let documents = stories
            .iter()
            .map(|story| document_from_story(story, &opts))
            .collect::<Vec<_>>();

        let index = SearchIndex::new(documents);
        info!(
            "built index from {}: {} documents, {} entries (locale: {:?})",
            self.source.describe(),
            index.document_count(),
            index.len(),
            locale
        );
        Ok(Arc::new(index))
    }

    /// Cached index for `locale`, built on first use and after TTL expiry.
    /// Concurrent callers for the same locale share a single build.
    pub async fn index_for(&self, locale: Option<&str>) -> Result<Arc<SearchIndex>> {
        let key = Self::cache_key(locale);
        self.index_cache
            .try_get_with(key, self.build_index(locale))
            .await
            .map_err(|e| anyhow::Error::new(IndexBuildError(e)))
    }

    /// Drop the cached index for `locale` and rebuild it now.
    pub async fn refresh(&self, locale: Option<&str>) -> Result<RefreshResponse> {
        let locale = self.resolve_locale(locale);
        let key = Self::cache_key(locale.as_deref());
        self.index_cache.invalidate(&key).await;

        let index = self.build_index(locale.as_deref()).await?;
        self.index_cache.insert(key, index.clone()).await;

        Ok(RefreshResponse {
            locale,
            documents: index.document_count(),
            entries: index.len(),
            refreshed_at: chrono::Utc::now().to_rfc3339(),
        })
    }

    /// Request knobs layered over the `search` section of the config.
    pub fn search_options(&self, request: &SearchRequest) -> SearchOptions {
        let defaults = &self.config.search;
        let mode = request.mode.unwrap_or(if defaults.resolve_whole_word() {
            MatchMode::WholeWord
        } else {
            MatchMode::Substring
        });

        SearchOptions {
            mode,
            case_sensitive: request.case_sensitive.unwrap_or(false),
            limit: request.limit.unwrap_or_else(|| defaults.resolve_max_results()),
            excerpt_chars: request
                .excerpt_chars
                .unwrap_or_else(|| defaults.resolve_excerpt_chars())
                .max(20),
            highlight: request.highlight.clone(),
            boost_fields: defaults.resolve_boost_fields(),
        }
    }

    pub async fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        let locale = self.resolve_locale(request.locale.as_deref());
        let index = self.index_for(locale.as_deref()).await?;
        let opts = self.search_options(request);
        let (total, hits) = index.search_with_total(&request.query, &opts);
        info!(
            "search '{}' -> {} hits ({} shown, locale: {:?})",
            request.query,
            total,
            hits.len(),
            locale
        );

        Ok(SearchResponse {
            query: request.query.trim().to_string(),
            locale,
            total,
            hits,
            indexed_documents: index.document_count(),
        })
    }
}
