//! Client error types

use common::{Envelope, FAILURE, empty_data};

/// Errors from a client operation, before conversion to an `Envelope`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A caller-supplied argument is outside its allowed set. Raised before
    /// any network I/O.
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Auth(#[from] jdt_auth::Error),

    #[error(transparent)]
    Gateway(#[from] gateway::Error),
}

impl Error {
    pub fn code(&self) -> String {
        match self {
            Error::Validation(_) => FAILURE.to_string(),
            Error::Auth(e) => e.code(),
            Error::Gateway(e) => e.code(),
        }
    }
}

impl From<Error> for Envelope {
    fn from(err: Error) -> Self {
        match err {
            Error::Validation(message) => Envelope::new(FAILURE, message, empty_data()),
            Error::Auth(e) => e.into(),
            Error::Gateway(e) => e.into(),
        }
    }
}

/// Result alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;
