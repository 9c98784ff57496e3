//! Transport errors and their envelope form

use common::{Envelope, FAILURE};
use serde_json::json;

/// Errors from a gateway round trip, after transport retries are exhausted.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("gateway returned HTTP {status} after {attempts} attempt(s)")]
    Status {
        status: u16,
        attempts: u32,
        body: String,
    },

    #[error("connection to gateway failed after {attempts} attempt(s): {source}")]
    Connect {
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },

    #[error("gateway request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("invalid gateway response body: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("HTTP client setup failed: {0}")]
    Client(String),
}

impl Error {
    /// Code carried into the failure envelope.
    ///
    /// Exhausted status retries report the last HTTP status; connection and
    /// request faults report `0`.
    pub fn code(&self) -> String {
        match self {
            Error::Status { status, .. } => status.to_string(),
            Error::Connect { .. } | Error::Request(_) => "0".to_string(),
            Error::Decode(_) | Error::Client(_) => FAILURE.to_string(),
        }
    }

    /// The error followed by its source chain, one cause per line.
    pub fn trace(&self) -> String {
        let mut lines = vec![format!("0: {self}")];
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            lines.push(format!("{}: {cause}", lines.len()));
            source = cause.source();
        }
        lines.join("\n")
    }
}

impl From<Error> for Envelope {
    fn from(err: Error) -> Self {
        Envelope::new(err.code(), err.to_string(), json!({ "trace": err.trace() }))
    }
}

/// Result alias for transport operations.
pub type Result<T> = std::result::Result<T, Error>;
