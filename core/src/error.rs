use thiserror::Error;

pub type Result<T, E = SearchError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum SearchError {
    /// The index could not be read, decoded or validated. No query can run.
    #[error("index unavailable: {0}")]
    IndexUnavailable(String),
    /// Reserved for stricter query validation; the scorer accepts any text today.
    #[error("invalid query: {0}")]
    InvalidQuery(String),
    /// Writing an index to disk failed.
    #[error("failed to write index: {0}")]
    WriteFailed(String),
}

impl SearchError {
    pub(crate) fn unavailable(msg: impl std::fmt::Display) -> Self {
        SearchError::IndexUnavailable(msg.to_string())
    }

    pub(crate) fn write_failed(msg: impl std::fmt::Display) -> Self {
        SearchError::WriteFailed(msg.to_string())
    }
}
