mod error;
mod source;

pub use error::FetchError;
pub use source::{ContentSource, StaticSource};

use crate::core::config::CmsConfig;
use backoff::future::retry;
use backoff::ExponentialBackoffBuilder;
use reqwest::{header, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Longest response body kept in a `FetchError::Status`.
const ERROR_BODY_CHARS: usize = 300;

/// JSON body plus the `Total` header the delivery API sends on listings.
#[derive(Debug)]
pub struct FetchedJson {
    pub value: Value,
    pub total: Option<usize>,
}

/// Content delivery API client: URL building, retries, pagination.
#[derive(Clone)]
pub struct CmsClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
    version: &'static str,
    default_language: Option<String>,
    per_page: u32,
    max_pages: u32,
    starts_with: Option<String>,
    max_retry: Duration,
}

impl std::fmt::Debug for CmsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CmsClient")
            .field("base_url", &self.base_url)
            .field("token_set", &self.token.is_some())
            .field("version", &self.version)
            .field("per_page", &self.per_page)
            .finish()
    }
}

impl CmsClient {
    pub fn new(http: reqwest::Client, cfg: &CmsConfig) -> Self {
        Self {
            http,
            base_url: cfg.resolve_base_url(),
            token: cfg.resolve_token(),
            version: cfg.resolve_version(),
            default_language: cfg.resolve_default_language(),
            per_page: cfg.resolve_per_page(),
            max_pages: cfg.resolve_max_pages(),
            starts_with: cfg.resolve_starts_with(),
            max_retry: Duration::from_secs(cfg.resolve_max_retry_secs()),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `{base}/stories?token=..&version=..&per_page=..&page=..[&language=..][&starts_with=..]`
    pub fn stories_url(&self, page: u32, language: Option<&str>) -> Result<Url, FetchError> {
        let mut url = self.endpoint(&["stories"])?;
        self.apply_common_params(&mut url, language)?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("per_page", &self.per_page.to_string());
            query.append_pair("page", &page.max(1).to_string());
            if let Some(prefix) = &self.starts_with {
                query.append_pair("starts_with", prefix);
            }
        }
        Ok(url)
    }

    /// `{base}/stories/{full/slug}` with the same auth/version/language parameters.
    pub fn story_url(&self, slug: &str, language: Option<&str>) -> Result<Url, FetchError> {
        let mut segments = vec!["stories"];
        segments.extend(slug.split('/').filter(|s| !s.is_empty()));
        if segments.len() == 1 {
            return Err(FetchError::InvalidUrl(format!("empty story slug '{}'", slug)));
        }
        let mut url = self.endpoint(&segments)?;
        self.apply_common_params(&mut url, language)?;
        Ok(url)
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, FetchError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| FetchError::InvalidUrl(format!("{}: {}", self.base_url, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(FetchError::InvalidUrl(format!(
                "{}: must start with http:// or https://",
                self.base_url
            )));
        }
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| FetchError::InvalidUrl(format!("{}: cannot be a base", self.base_url)))?;
            path.pop_if_empty();
            for segment in segments {
                path.push(segment);
            }
        }
        Ok(url)
    }

    fn apply_common_params(&self, url: &mut Url, language: Option<&str>) -> Result<(), FetchError> {
        let token = self.token.as_deref().ok_or(FetchError::MissingToken)?;
        let language = language
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .or(self.default_language.as_deref());

        let mut query = url.query_pairs_mut();
        query.append_pair("token", token);
        query.append_pair("version", self.version);
        if let Some(language) = language {
            query.append_pair("language", language);
        }
        Ok(())
    }

    /// GET `url` and parse JSON, retrying transient failures with exponential backoff.
    pub async fn fetch_page(&self, url: Url) -> Result<FetchedJson, FetchError> {
        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(200))
            .with_max_interval(Duration::from_secs(2))
            .with_max_elapsed_time(Some(self.max_retry))
            .build();
        let redacted = redact_url(&url);

        retry(policy, || {
            let url = url.clone();
            let redacted = redacted.as_str();
            async move {
                self.fetch_once(url).await.map_err(|e| {
                    if e.is_transient() {
                        warn!("transient CMS error for {}: {} (retrying)", redacted, e);
                        backoff::Error::transient(e)
                    } else {
                        backoff::Error::permanent(e)
                    }
                })
            }
        })
        .await
    }

    pub async fn fetch_json(&self, url: Url) -> Result<Value, FetchError> {
        Ok(self.fetch_page(url).await?.value)
    }

    async fn fetch_once(&self, url: Url) -> Result<FetchedJson, FetchError> {
        let redacted = redact_url(&url);
        debug!("GET {}", redacted);

        let resp = self
            .http
            .get(url)
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = resp.status();
        let total = resp
            .headers()
            .get("total")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<usize>().ok());
        let body = resp.text().await?;

        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound { url: redacted });
        }
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: redacted,
                body: body.chars().take(ERROR_BODY_CHARS).collect(),
            });
        }

        let value = serde_json::from_str(&body).map_err(|e| FetchError::Decode {
            url: redacted,
            reason: e.to_string(),
        })?;
        Ok(FetchedJson { value, total })
    }

    /// One story by full slug; returns the `story` object.
    pub async fn fetch_story(&self, slug: &str, language: Option<&str>) -> Result<Value, FetchError> {
        let url = self.story_url(slug, language)?;
        let redacted = redact_url(&url);
        let mut value = self.fetch_json(url).await?;
        match value.get_mut("story").map(Value::take) {
            Some(story @ Value::Object(_)) => Ok(story),
            _ => Err(FetchError::Decode {
                url: redacted,
                reason: "missing `story` object".to_string(),
            }),
        }
    }

    /// Every story, page by page. Stops on an empty or short page, once the `Total`
    /// header is reached, or after `max_pages`.
    pub async fn fetch_all_stories(&self, language: Option<&str>) -> Result<Vec<Value>, FetchError> {
        let per_page = self.per_page as usize;
        let mut stories: Vec<Value> = Vec::new();

        for page in 1..=self.max_pages {
            let url = self.stories_url(page, language)?;
            let redacted = redact_url(&url);
            let FetchedJson { mut value, total } = self.fetch_page(url).await?;

            let batch = match value.get_mut("stories").map(Value::take) {
                Some(Value::Array(items)) => items,
                _ => {
                    return Err(FetchError::Decode {
                        url: redacted,
                        reason: "missing `stories` array".to_string(),
                    })
                }
            };
            let received = batch.len();
            stories.extend(batch);
            debug!("page {}: {} stories (total header: {:?})", page, received, total);

            if received == 0 || received < per_page {
                break;
            }
            if total.map(|t| stories.len() >= t).unwrap_or(false) {
                break;
            }
            if page == self.max_pages {
                warn!(
                    "stopped after {} pages ({} stories); raise cms.max_pages to fetch more",
                    page,
                    stories.len()
                );
            }
        }

        info!(
            "fetched {} stories from {} (language: {:?})",
            stories.len(),
            self.base_url,
            language.or(self.default_language.as_deref())
        );
        Ok(stories)
    }
}

/// URL with the `token` query value masked, for logs and error messages.
pub fn redact_url(url: &Url) -> String {
    if !url.query_pairs().any(|(k, _)| k == "token") {
        return url.to_string();
    }
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let v = if k == "token" { "***".to_string() } else { v.into_owned() };
            (k.into_owned(), v)
        })
        .collect();

    let mut redacted = url.clone();
    redacted.query_pairs_mut().clear().extend_pairs(pairs);
    redacted.to_string()
}
