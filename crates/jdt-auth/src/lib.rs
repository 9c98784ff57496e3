//! Token lifecycle for the JDT cloud gateway
//!
//! Obtains an access token through the gateway's two-step login exchange,
//! caches it in a persistent store so later processes can reuse it, and
//! refreshes it when it is missing, close to expiry, or rejected upstream.
//!
//! Token flow:
//! 1. `TokenManager::access_token(false)` reads the `CredentialStore`
//! 2. A record with more than `REFRESH_SKEW_SECS` left is returned as is
//! 3. Otherwise the configured `Authenticator` runs, single-flight
//! 4. The built-in `ExchangeAuthenticator` calls `exchange::login_authorize`
//!    then `exchange::login_token`
//! 5. The new record is written back through the `Cache` capability

pub mod authenticator;
pub mod cache;
pub mod constants;
pub mod credentials;
pub mod error;
pub mod exchange;
pub mod manager;
pub mod settings;

pub use authenticator::{
    AuthFuture, Authenticator, CustomAuthFn, CustomAuthRequest, CustomAuthenticator,
    ExchangeAuthenticator, IssuedToken, boxed_hook,
};
pub use cache::{Cache, DiskCache, MemoryCache, Visibility};
pub use constants::*;
pub use credentials::{CredentialRecord, CredentialStore, now_secs};
pub use error::{Error, Result};
pub use exchange::{AuthorizationCode, TokenGrant, login_authorize, login_token};
pub use manager::{AccessToken, TokenManager};
pub use settings::AuthSettings;
