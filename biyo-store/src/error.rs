use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Invalid record: {message}")]
    InvalidRecord { message: String },

    #[error("Table {key} does not hold a JSON array")]
    CorruptTable { key: String },

    #[error("Upstream returned {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Authentication failed: {message}")]
    Auth { message: String },

    #[error("Storage backend error: {source}")]
    Backend {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("Serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },
}

impl StoreError {
    pub fn backend<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Backend {
            source: Box::new(error),
        }
    }

    pub fn invalid<S: Into<String>>(message: S) -> Self {
        Self::InvalidRecord {
            message: message.into(),
        }
    }

    pub fn auth<S: Into<String>>(message: S) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    /// Failures that came from a remote service rather than local state.
    pub fn is_upstream(&self) -> bool {
        matches!(self, StoreError::Http { .. } | StoreError::Auth { .. } | StoreError::Backend { .. })
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(e: reqwest::Error) -> Self {
        StoreError::backend(e)
    }
}
