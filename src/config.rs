//! Runtime configuration
//!
//! Describes a client (base URL, transport settings, credential and token
//! store) in YAML or JSON so the CLI and tests can build one without code.
//! String values may reference environment variables as `${NAME}`.

use crate::auth::{Credential, Location, OAuth2Credentials};
use crate::client::{Client, ClientConfig, DEFAULT_TIMEOUT};
use crate::error::{Error, Result, ResultExt};
use crate::http::USER_AGENT;
use crate::token::{FileTokenStore, MemoryTokenStore, TokenStore, DEFAULT_TOKEN_KEY};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};
use std::time::Duration;

/// Matches `${NAME}` references
static ENV_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid regex"));

// ============================================================================
// Config types
// ============================================================================

/// Complete client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Base URL of the API
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// User agent override
    #[serde(default)]
    pub user_agent: Option<String>,

    /// Headers added to every request
    #[serde(default)]
    pub headers: HashMap<String, String>,

    /// Credential used to authenticate
    #[serde(default)]
    pub credentials: CredentialConfig,

    /// Where OAuth2 tokens are kept (memory when omitted)
    #[serde(default)]
    pub token_store: Option<TokenStoreConfig>,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

/// Credential definition
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CredentialConfig {
    #[default]
    Anonymous,

    ApiKey {
        token: String,
        name: String,
        #[serde(default)]
        location: Location,
    },

    HttpBasic {
        username: String,
        password: String,
    },

    HttpBearer {
        token: String,
    },

    ClientCredentials(OAuth2Config),

    AuthorizationCode(OAuth2Config),
}

/// OAuth2 client registration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuth2Config {
    pub client_id: String,
    pub client_secret: String,
    pub token_url: String,
    #[serde(default)]
    pub authorization_url: String,
    #[serde(default)]
    pub scopes: Vec<String>,
}

/// Token store definition
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TokenStoreConfig {
    Memory,
    File {
        dir: PathBuf,
        #[serde(default = "default_token_name")]
        name: String,
    },
}

fn default_token_name() -> String {
    DEFAULT_TOKEN_KEY.to_string()
}

impl TokenStoreConfig {
    /// Build the configured store
    pub fn build(&self) -> Arc<dyn TokenStore> {
        match self {
            TokenStoreConfig::Memory => Arc::new(MemoryTokenStore::new()),
            TokenStoreConfig::File { dir, name } => {
                Arc::new(FileTokenStore::with_name(dir, name.clone()))
            }
        }
    }
}

impl RuntimeConfig {
    /// Resolve the credential, attaching the configured token store to OAuth2 credentials
    pub fn credential(&self) -> Result<Credential> {
        let credential = match &self.credentials {
            CredentialConfig::Anonymous => Credential::Anonymous,
            CredentialConfig::ApiKey {
                token,
                name,
                location,
            } => {
                require("credentials.token", token)?;
                require("credentials.name", name)?;
                Credential::api_key(token, name, *location)
            }
            CredentialConfig::HttpBasic { username, password } => {
                require("credentials.username", username)?;
                Credential::basic(username, password)
            }
            CredentialConfig::HttpBearer { token } => {
                require("credentials.token", token)?;
                Credential::bearer(token)
            }
            CredentialConfig::ClientCredentials(oauth) => {
                Credential::client_credentials(self.oauth2_credentials(oauth)?)
            }
            CredentialConfig::AuthorizationCode(oauth) => {
                require("credentials.authorization_url", &oauth.authorization_url)?;
                Credential::authorization_code(self.oauth2_credentials(oauth)?)
            }
        };
        Ok(credential)
    }

    fn oauth2_credentials(&self, oauth: &OAuth2Config) -> Result<OAuth2Credentials> {
        require("credentials.client_id", &oauth.client_id)?;
        require("credentials.token_url", &oauth.token_url)?;

        let mut credentials = OAuth2Credentials::new(
            &oauth.client_id,
            &oauth.client_secret,
            &oauth.token_url,
            &oauth.authorization_url,
        )
        .with_scopes(oauth.scopes.iter().cloned());

        if let Some(store) = &self.token_store {
            credentials = credentials.with_token_store(store.build());
        }
        Ok(credentials)
    }

    /// Transport settings
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.base_url.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
            user_agent: self
                .user_agent
                .clone()
                .unwrap_or_else(|| USER_AGENT.to_string()),
            default_headers: self.headers.clone(),
        }
    }

    /// Build a ready client
    pub fn into_client(self) -> Result<Client> {
        let credential = self.credential()?;
        Client::new(self.client_config(), &credential)
    }

    fn validate(&self) -> Result<()> {
        require("base_url", &self.base_url)?;
        url::Url::parse(&self.base_url)?;
        if self.timeout_secs == 0 {
            return Err(Error::config("timeout_secs must be greater than zero"));
        }
        Ok(())
    }
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        Err(Error::missing_field(field))
    } else {
        Ok(())
    }
}

// ============================================================================
// Loading
// ============================================================================

/// Replace every `${NAME}` with the environment variable's value
pub fn interpolate_env(input: &str) -> Result<String> {
    let mut missing = Vec::new();
    let output = ENV_REGEX.replace_all(input, |caps: &regex::Captures<'_>| {
        let name = &caps[1];
        std::env::var(name).unwrap_or_else(|_| {
            missing.push(name.to_string());
            String::new()
        })
    });

    if missing.is_empty() {
        Ok(output.into_owned())
    } else {
        Err(Error::undefined_var(missing.join(", ")))
    }
}

/// Parse a YAML config
pub fn from_yaml_str(yaml: &str) -> Result<RuntimeConfig> {
    let config: RuntimeConfig = serde_yaml::from_str(&interpolate_env(yaml)?)?;
    config.validate()?;
    Ok(config)
}

/// Parse a JSON config
pub fn from_json_str(json: &str) -> Result<RuntimeConfig> {
    let config: RuntimeConfig = serde_json::from_str(&interpolate_env(json)?)?;
    config.validate()?;
    Ok(config)
}

/// Load a config file; `.json` is read as JSON, anything else as YAML
pub fn load_config(path: impl AsRef<Path>) -> Result<RuntimeConfig> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;

    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => from_json_str(&content),
        _ => from_yaml_str(&content),
    }
}
