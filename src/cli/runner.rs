//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands};
use crate::client::Client;
use crate::config::load_config;
use crate::error::{Error, Result};
use crate::token::{AccessToken, EXPIRE_THRESHOLD};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Value};
use tracing::{debug, info};

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command and print its output
    pub async fn run(&self) -> Result<()> {
        let output = self.execute().await?;
        println!("{output}");
        Ok(())
    }

    /// Run the CLI command and return what it would print
    pub async fn execute(&self) -> Result<String> {
        let client = self.client()?;

        match &self.cli.command {
            Commands::Token { no_refresh } => {
                let oauth = client.oauth2()?;
                oauth.get_access_token(!no_refresh, EXPIRE_THRESHOLD).await
            }

            Commands::AuthorizeUrl {
                redirect_url,
                scopes,
                state,
                signed_state,
            } => {
                let oauth = client.oauth2()?;
                let state = if *signed_state {
                    Some(oauth.generate_state()?)
                } else {
                    state.clone()
                };
                let scopes = (!scopes.is_empty()).then_some(scopes.as_slice());
                oauth.build_redirect_url(redirect_url.as_deref(), scopes, state.as_deref())
            }

            Commands::ExchangeCode { code, state } => {
                let oauth = client.oauth2()?;
                let token = match state {
                    Some(state) => oauth.fetch_access_token_by_code_with_state(code, state).await?,
                    None => oauth.fetch_access_token_by_code(code).await?,
                };
                info!("Stored new access token");
                pretty(&summary(&token))
            }

            Commands::ShowToken => {
                let oauth = client.oauth2()?;
                match oauth.token_store().get().await? {
                    Some(token) => pretty(&summary(&token)),
                    None => Ok("No access token stored".to_string()),
                }
            }

            Commands::ClearToken => {
                client.oauth2()?.remove_token().await?;
                Ok("Access token removed".to_string())
            }
        }
    }

    fn client(&self) -> Result<Client> {
        debug!("Loading config from {}", self.cli.config.display());
        load_config(&self.cli.config)?.into_client()
    }
}

/// Token description without the secret values
fn summary(token: &AccessToken) -> Value {
    let expires_at = token.expires_at_timestamp();
    let expires_at = DateTime::<Utc>::from_timestamp(expires_at, 0)
        .map_or_else(|| expires_at.to_string(), |dt| {
            dt.to_rfc3339_opts(SecondsFormat::Secs, true)
        });

    json!({
        "token_type": token.token_type(),
        "expires_at": expires_at,
        "expired": token.is_expired_at(Utc::now().timestamp()),
        "scope": token.scope(),
        "has_refresh_token": token.has_refresh_token(),
    })
}

fn pretty(value: &Value) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(Error::from)
}
