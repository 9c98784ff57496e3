//! Subcommand parsing and dispatch

use anyhow::{Context, Result, bail};
use common::Envelope;
use gateway::Form;
use jdt_client::{Abilities, JdtClient, WordQuery};

pub const USAGE: &str = "\
usage: jdt [--config <path>] <command> [args]

commands:
  token [--refresh]                 current access token
  authorize [state]                 login step 1, prints the authorization code
  login-token <code>                login step 2, prints the issued token
  abilities                         correction abilities
  auth-info                         account subscription details
  correct <text> [son_user_id]      proofread text with every ability
  son-users [page] [page_count] [search]
  words <word_type> [page] [page_count] [search]
  clear-words <word_type> [son_user_id]
  call <path> [name=value ...]      authenticated POST to any gateway path";

/// One parsed invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Token { refresh: bool },
    Authorize { state: String },
    LoginToken { code: String },
    Abilities,
    AuthInfo,
    Correct { text: String, son_user_id: Option<String> },
    SonUsers { page: u32, page_count: u32, search: Option<String> },
    Words { word_type: i64, query: WordQuery },
    ClearWords { word_type: i64, son_user_id: Option<String> },
    Call { path: String, fields: Vec<(String, String)> },
}

fn number<T: std::str::FromStr>(arg: Option<&String>, name: &str, default: T) -> Result<T> {
    match arg {
        Some(raw) => raw
            .parse()
            .ok()
            .with_context(|| format!("{name} must be a number, got: {raw}")),
        None => Ok(default),
    }
}

impl Command {
    /// Parse the arguments after the program name, `--config <path>` removed.
    pub fn parse(args: &[String]) -> Result<Self> {
        let Some((name, rest)) = args.split_first() else {
            bail!("missing command\n\n{USAGE}");
        };

        let command = match name.as_str() {
            "token" => Command::Token {
                refresh: rest.iter().any(|a| a == "--refresh"),
            },
            "authorize" => Command::Authorize {
                state: rest.first().cloned().unwrap_or_default(),
            },
            "login-token" => Command::LoginToken {
                code: rest.first().cloned().context("login-token needs <code>")?,
            },
            "abilities" => Command::Abilities,
            "auth-info" => Command::AuthInfo,
            "correct" => Command::Correct {
                text: rest.first().cloned().context("correct needs <text>")?,
                son_user_id: rest.get(1).cloned(),
            },
            "son-users" => Command::SonUsers {
                page: number(rest.first(), "page", 1)?,
                page_count: number(rest.get(1), "page_count", 10)?,
                search: rest.get(2).cloned(),
            },
            "words" => Command::Words {
                word_type: number(
                    Some(rest.first().context("words needs <word_type>")?),
                    "word_type",
                    0,
                )?,
                query: WordQuery {
                    page: number(rest.get(1), "page", 1)?,
                    page_count: number(rest.get(2), "page_count", 10)?,
                    search_word: rest.get(3).cloned(),
                    son_user_id: None,
                },
            },
            "clear-words" => Command::ClearWords {
                word_type: number(
                    Some(rest.first().context("clear-words needs <word_type>")?),
                    "word_type",
                    0,
                )?,
                son_user_id: rest.get(1).cloned(),
            },
            "call" => Command::Call {
                path: rest.first().cloned().context("call needs <path>")?,
                fields: rest
                    .iter()
                    .skip(1)
                    .map(|pair| {
                        pair.split_once('=')
                            .map(|(k, v)| (k.to_string(), v.to_string()))
                            .with_context(|| format!("expected name=value, got: {pair}"))
                    })
                    .collect::<Result<_>>()?,
            },
            other => bail!("unknown command: {other}\n\n{USAGE}"),
        };
        Ok(command)
    }

    /// Subcommand name as typed, free of arguments.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Token { .. } => "token",
            Command::Authorize { .. } => "authorize",
            Command::LoginToken { .. } => "login-token",
            Command::Abilities => "abilities",
            Command::AuthInfo => "auth-info",
            Command::Correct { .. } => "correct",
            Command::SonUsers { .. } => "son-users",
            Command::Words { .. } => "words",
            Command::ClearWords { .. } => "clear-words",
            Command::Call { .. } => "call",
        }
    }

    pub async fn run(self, client: &JdtClient) -> Envelope {
        match self {
            Command::Token { refresh } => client.get_access_token(refresh).await,
            Command::Authorize { state } => client.login_authorize(&state).await,
            Command::LoginToken { code } => client.login_token(&code).await,
            Command::Abilities => client.get_correct_ability().await,
            Command::AuthInfo => client.get_wbjc_auth_info().await,
            Command::Correct { text, son_user_id } => {
                client
                    .article_correct_external(&text, &Abilities::All, son_user_id.as_deref())
                    .await
            }
            Command::SonUsers {
                page,
                page_count,
                search,
            } => {
                client
                    .get_son_user(page, page_count, search.as_deref())
                    .await
            }
            Command::Words { word_type, query } => client.get_word_list(word_type, &query).await,
            Command::ClearWords {
                word_type,
                son_user_id,
            } => client.del_all_word(word_type, son_user_id.as_deref()).await,
            Command::Call { path, fields } => {
                let form = fields
                    .into_iter()
                    .fold(Form::new(), |form, (name, value)| form.field(&name, value));
                client.call(&path, form).await
            }
        }
    }
}
