use thiserror::Error;

/// Errors raised by a [`PostSource`](crate::sources::PostSource).
#[derive(Debug, Error)]
pub enum SourceError {
    /// The provider rejected the configured credentials.
    #[error("provider login failed: {0}")]
    Auth(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("pagination limit reached for {subject}: exceeded {max_pages} pages")]
    PaginationLimit { subject: String, max_pages: usize },

    #[error("invalid gateway URL \"{url}\": {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

/// Failure reported by a [`ResultStore`](crate::store::ResultStore) backend.
#[derive(Debug, Error)]
#[error("result store error: {0}")]
pub struct StoreError(#[source] pub Box<dyn std::error::Error + Send + Sync>);

impl StoreError {
    pub fn new(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self(Box::new(err))
    }
}

/// Why a fetch ended without a result.
///
/// `SubjectNotFound` means the provider has no such account; `Stream` means
/// reading posts broke part-way and a later retry may succeed.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("subject must not be empty")]
    InvalidSubject,

    #[error("authentication failed: {0}")]
    Auth(#[source] SourceError),

    #[error("user not found: {subject}")]
    SubjectNotFound { subject: String },

    #[error("reading posts failed after {accepted} posts: {source}")]
    Stream {
        accepted: usize,
        #[source]
        source: SourceError,
    },

    #[error("reading cached stats failed: {0}")]
    Store(#[source] StoreError),

    #[error("saving stats failed: {0}")]
    Persistence(#[source] StoreError),
}

impl FetchError {
    /// Short text published as the failure status.
    #[must_use]
    pub fn status_text(&self) -> String {
        match self {
            FetchError::InvalidSubject => "Invalid username".to_string(),
            FetchError::Auth(_) => "Could not connect to provider".to_string(),
            FetchError::SubjectNotFound { .. } => "User not found".to_string(),
            FetchError::Stream { .. } => "Failed to fetch posts".to_string(),
            FetchError::Store(_) => "Failed to load stats".to_string(),
            FetchError::Persistence(_) => "Failed to save stats".to_string(),
        }
    }
}
