//! JDT gateway command-line client
//!
//! Loads credentials and storage settings from TOML, runs one gateway
//! operation and prints its `{code, message, data}` envelope as JSON on
//! stdout. Logs go to stderr.

mod command;
mod config;
mod hook;

use std::process::ExitCode;

use anyhow::{Context, Result};
use jdt_auth::CustomAuthRequest;
use jdt_client::JdtClient;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::command::Command;
use crate::config::Config;

/// Split `--config <path>` out of the argument list.
fn split_config_arg(args: Vec<String>) -> (Option<String>, Vec<String>) {
    let mut config = None;
    let mut rest = Vec::with_capacity(args.len());
    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        if arg == "--config" {
            config = iter.next();
        } else {
            rest.push(arg);
        }
    }
    (config, rest)
}

fn build_client(config: &Config) -> Result<JdtClient> {
    let mut builder = JdtClient::builder(config.auth_settings());
    if let Some(ref base_url) = config.gateway.base_url {
        builder = builder.base_url(base_url.clone());
    }
    if config.auth.custom_auth_url.is_some() {
        let http = hook::client().context("failed to build custom auth HTTP client")?;
        builder = builder.custom_auth(move |url: String, request: CustomAuthRequest| {
            let http = http.clone();
            async move { hook::request_token(&http, &url, &request).await }
        });
    }
    builder.build().context("failed to build gateway client")
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // JSON logs on stderr with LOG_LEVEL / RUST_LOG support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
        .init();

    let (cli_config_path, args) = split_config_arg(std::env::args().skip(1).collect());
    let command = Command::parse(&args)?;

    let config_path = Config::resolve_path(cli_config_path.as_deref());
    debug!(path = %config_path.display(), "loading configuration");
    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    let client = build_client(&config)?;
    info!(command = command.name(), "running command");
    let envelope = command.run(&client).await;

    println!(
        "{}",
        serde_json::to_string_pretty(&envelope).context("failed to encode envelope")?
    );
    Ok(if envelope.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
