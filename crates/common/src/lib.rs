//! Shared types for the JDT gateway client
//!
//! `Envelope` is the public result contract returned by every client
//! operation. `Secret` keeps the application secret out of logs.

mod envelope;
mod error;
mod secret;

pub use envelope::{Envelope, FAILURE, SUCCESS, business_code, empty_data};
pub use error::{Error, Result};
pub use secret::Secret;
