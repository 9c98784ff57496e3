//! Application identity and cache location

use common::Secret;

use crate::error::{Error, Result};

/// Static per-deployment settings for token acquisition.
///
/// Fields may be empty at construction time; `validate` reports the first
/// missing one before any I/O happens.
#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub app_id: String,
    pub app_secret: Secret<String>,
    /// Storage root the credential cache lives under
    pub disk: String,
    /// Cache key of the credential record within `disk`
    pub auth_file: String,
    /// Endpoint handed to a custom authenticator, when one is configured
    pub custom_auth_url: Option<String>,
}

impl AuthSettings {
    pub fn new(
        app_id: impl Into<String>,
        app_secret: impl Into<Secret<String>>,
        disk: impl Into<String>,
        auth_file: impl Into<String>,
    ) -> Self {
        Self {
            app_id: app_id.into(),
            app_secret: app_secret.into(),
            disk: disk.into(),
            auth_file: auth_file.into(),
            custom_auth_url: None,
        }
    }

    pub fn with_custom_auth_url(mut self, url: impl Into<String>) -> Self {
        self.custom_auth_url = Some(url.into());
        self
    }

    /// Check required settings in a fixed order: `app_id`, `app_secret`,
    /// `disk`, `auth_file`.
    pub fn validate(&self) -> Result<()> {
        if self.app_id.trim().is_empty() {
            return Err(Error::MissingConfig("app_id"));
        }
        if self.app_secret.is_blank() {
            return Err(Error::MissingConfig("app_secret"));
        }
        if self.disk.trim().is_empty() {
            return Err(Error::MissingConfig("disk"));
        }
        if self.auth_file.trim().is_empty() {
            return Err(Error::MissingConfig("auth_file"));
        }
        Ok(())
    }
}
