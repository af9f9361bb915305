use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Rate limited by image API")]
    RateLimited,

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Response contained no image")]
    MissingImage,
}

impl From<reqwest::Error> for ImageError {
    fn from(err: reqwest::Error) -> Self {
        ImageError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for ImageError {
    fn from(err: serde_json::Error) -> Self {
        ImageError::Parse(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        StoreError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Parse(err.to_string())
    }
}

/// Why a single entry did not get an image.
#[derive(Debug, Error)]
pub enum EntryError {
    #[error("entry has no id")]
    MissingId,

    #[error("generation failed: {0}")]
    Generation(#[from] ImageError),

    #[error("storage failed: {0}")]
    Store(#[from] StoreError),

    #[error("no row updated for id {0}")]
    NotUpdated(String),
}
