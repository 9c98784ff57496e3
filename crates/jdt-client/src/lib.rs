//! Client for the JDT text-correction service behind the midu cloud gateway
//!
//! `JdtClient` exposes one async method per gateway operation, each
//! returning the uniform `Envelope`. Requests flow through the
//! `Dispatcher`, which attaches the cached access token and re-authenticates
//! once when the gateway reports it expired.
//!
//! ```no_run
//! # async fn demo() -> jdt_client::Result<()> {
//! use jdt_auth::AuthSettings;
//! use jdt_client::JdtClient;
//!
//! let settings = AuthSettings::new("app-id", "app-secret", "/var/lib/jdt", "jdt/auth.json");
//! let client = JdtClient::builder(settings).build()?;
//! let envelope = client.get_correct_ability().await;
//! println!("{}", serde_json::to_string(&envelope).unwrap_or_default());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod dispatcher;
pub mod error;
pub mod wbjc;
pub mod words;

#[cfg(test)]
mod test_support;

pub use client::{JdtClient, JdtClientBuilder};
pub use common::Envelope;
pub use dispatcher::{ACCESS_TOKEN_FIELD, Dispatcher, TOKEN_EXPIRED_CODES, is_token_expired};
pub use error::{Error, Result};
pub use wbjc::{TRANSACTION_HEADER, WBJC_PREFIX};
pub use words::{Abilities, WordAction, WordEntry, WordQuery, WordStatus, WordType};
