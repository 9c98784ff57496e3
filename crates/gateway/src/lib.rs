//! Transport layer for the JDT cloud gateway
//!
//! Every gateway call is a form-encoded `POST` to a fixed base URL. The
//! `Transport` owns the HTTP client, the per-attempt timeouts and the
//! bounded transport retry policy (connection failures and non-200
//! statuses). It knows nothing about tokens; authenticated dispatch is
//! layered on top by the client crate, and the login exchange calls the
//! transport directly.

pub mod error;
pub mod form;
pub mod retry;
pub mod transport;

pub use error::{Error, Result};
pub use form::Form;
pub use retry::RetryPolicy;
pub use transport::{CONNECT_TIMEOUT, DEFAULT_BASE_URL, REQUEST_TIMEOUT, Transport};
