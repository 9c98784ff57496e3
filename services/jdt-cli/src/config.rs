//! Configuration types and loading
//!
//! Precedence: `--config` > `CONFIG_PATH` > `jdt.toml`. The app secret comes
//! from the `JDT_APP_SECRET` env var or `app_secret_file` and is never read
//! from the TOML itself.

use std::path::{Path, PathBuf};

use common::Secret;
use jdt_auth::AuthSettings;
use serde::Deserialize;

/// Env var holding the app secret; wins over `app_secret_file`.
pub const SECRET_ENV: &str = "JDT_APP_SECRET";

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
}

/// Application identity issued by the gateway
#[derive(Debug, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub app_id: String,
    #[serde(skip)]
    pub app_secret: Option<Secret<String>>,
    /// Path to a file containing the app secret (alternative to JDT_APP_SECRET)
    #[serde(default)]
    pub app_secret_file: Option<PathBuf>,
}

/// Where the credential record is kept
#[derive(Debug, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub disk: String,
    #[serde(default = "default_auth_file")]
    pub auth_file: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct AuthConfig {
    /// Token endpoint used instead of the built-in login
    #[serde(default)]
    pub custom_auth_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub base_url: Option<String>,
}

fn default_auth_file() -> String {
    "jdt/auth.json".into()
}

fn check_http_url(field: &str, url: &str) -> common::Result<()> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(common::Error::Config(format!(
            "{field} must start with http:// or https://, got: {url}"
        )))
    }
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    ///
    /// Empty identity fields are accepted here; the token manager reports
    /// them per call.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;

        if let Some(ref base_url) = config.gateway.base_url {
            check_http_url("base_url", base_url)?;
        }
        if let Some(ref url) = config.auth.custom_auth_url {
            check_http_url("custom_auth_url", url)?;
        }

        if let Ok(secret) = std::env::var(SECRET_ENV) {
            config.app.app_secret = Some(Secret::new(secret));
        } else if let Some(ref secret_file) = config.app.app_secret_file {
            let secret = std::fs::read_to_string(secret_file).map_err(|e| {
                common::Error::Config(format!(
                    "failed to read app_secret_file {}: {e}",
                    secret_file.display()
                ))
            })?;
            let secret = secret.trim().to_owned();
            if !secret.is_empty() {
                config.app.app_secret = Some(Secret::new(secret));
            }
        }

        Ok(config)
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("jdt.toml")
    }

    pub fn auth_settings(&self) -> AuthSettings {
        let secret = self
            .app
            .app_secret
            .clone()
            .unwrap_or_else(|| Secret::new(String::new()));
        let settings = AuthSettings::new(
            self.app.app_id.clone(),
            secret,
            self.storage.disk.clone(),
            self.storage.auth_file.clone(),
        );
        match self.auth.custom_auth_url {
            Some(ref url) => settings.with_custom_auth_url(url.clone()),
            None => settings,
        }
    }
}
