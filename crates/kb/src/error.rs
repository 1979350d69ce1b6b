use thiserror::Error;

#[derive(Debug, Error)]
pub enum KbError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("lookup failed: {0}")]
    Lookup(String),

    #[error("cache backend unavailable: {0}")]
    CacheUnavailable(String),
}

impl KbError {
    /// Fatal errors abort the whole batch instead of skipping one candidate.
    pub fn is_fatal(&self) -> bool {
        matches!(self, KbError::CacheUnavailable(_))
    }
}

pub(crate) fn unavailable(e: impl std::fmt::Display) -> KbError {
    KbError::CacheUnavailable(e.to_string())
}
