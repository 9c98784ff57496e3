//! Error types for token acquisition

use common::{Envelope, FAILURE, empty_data};

/// Errors from token lookup, login exchange and credential caching.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("配置信息【{0}】不能为空")]
    MissingConfig(&'static str),

    /// The gateway (or a custom authenticator) rejected the login. The
    /// message is the upstream one, unchanged.
    #[error("{message}")]
    Rejected { code: String, message: String },

    #[error("invalid login response: {0}")]
    InvalidResponse(String),

    #[error("credential cache error: {0}")]
    Cache(String),

    #[error(transparent)]
    Gateway(#[from] gateway::Error),
}

impl Error {
    pub fn code(&self) -> String {
        match self {
            Error::Rejected { code, .. } => code.clone(),
            Error::Gateway(e) => e.code(),
            Error::MissingConfig(_) | Error::InvalidResponse(_) | Error::Cache(_) => {
                FAILURE.to_string()
            }
        }
    }
}

impl From<Error> for Envelope {
    fn from(err: Error) -> Self {
        match err {
            Error::Gateway(e) => e.into(),
            other => Envelope::new(other.code(), other.to_string(), empty_data()),
        }
    }
}

/// Result alias for auth operations.
pub type Result<T> = std::result::Result<T, Error>;
