use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid CMS url: {0}")]
    InvalidUrl(String),

    #[error("missing CMS token (set cms.token in cms-search.json or CMS_TOKEN)")]
    MissingToken,

    #[error("not found: {url}")]
    NotFound { url: String },

    #[error("http {status} from {url}: {body}")]
    Status { status: u16, url: String, body: String },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected response from {url}: {reason}")]
    Decode { url: String, reason: String },
}

impl FetchError {
    /// Worth retrying: network failures, rate limiting and server-side errors.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Transport(_) => true,
            FetchError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(code: u16) -> FetchError {
        FetchError::Status {
            status: code,
            url: "http://cms.local/stories".into(),
            body: String::new(),
        }
    }

    #[test]
    fn classifies_transient_statuses() {
        assert!(status(429).is_transient());
        assert!(status(503).is_transient());
        assert!(!status(401).is_transient());
        assert!(!FetchError::MissingToken.is_transient());
        assert!(!FetchError::NotFound { url: "x".into() }.is_transient());
    }
}
