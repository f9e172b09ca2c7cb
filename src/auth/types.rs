//! Credential types
//!
//! A `Credential` is the static description of how a client proves its
//! identity. Values are immutable once built; there are no setters.

use crate::token::TokenStore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Location for API key placement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Location {
    /// Place in HTTP header
    #[default]
    Header,
    /// Place in query parameter
    Query,
}

/// API key sent verbatim in a header or query parameter
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey {
    token: String,
    name: String,
    location: Location,
}

impl ApiKey {
    pub fn new(token: impl Into<String>, name: impl Into<String>, location: Location) -> Self {
        Self {
            token: token.into(),
            name: name.into(),
            location,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Header or query parameter name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn location(&self) -> Location {
        self.location
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKey")
            .field("name", &self.name)
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}

/// HTTP Basic username/password pair
#[derive(Clone, PartialEq, Eq)]
pub struct HttpBasic {
    username: String,
    password: String,
}

impl HttpBasic {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for HttpBasic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpBasic")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// Static bearer token
#[derive(Clone, PartialEq, Eq)]
pub struct HttpBearer {
    token: String,
}

impl HttpBearer {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

impl fmt::Debug for HttpBearer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpBearer").finish_non_exhaustive()
    }
}

/// OAuth2 grant a credential is configured for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
    ClientCredentials,
    AuthorizationCode,
}

impl fmt::Display for GrantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrantType::ClientCredentials => f.write_str("client_credentials"),
            GrantType::AuthorizationCode => f.write_str("authorization_code"),
        }
    }
}

/// OAuth2 client registration shared by both grant variants
#[derive(Clone)]
pub struct OAuth2Credentials {
    client_id: String,
    client_secret: String,
    token_url: String,
    authorization_url: String,
    scopes: Vec<String>,
    token_store: Option<Arc<dyn TokenStore>>,
}

impl OAuth2Credentials {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        token_url: impl Into<String>,
        authorization_url: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            token_url: token_url.into(),
            authorization_url: authorization_url.into(),
            scopes: Vec::new(),
            token_store: None,
        }
    }

    /// Default scopes requested by this client
    #[must_use]
    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    /// Token store to use instead of the in-memory default
    #[must_use]
    pub fn with_token_store(mut self, store: Arc<dyn TokenStore>) -> Self {
        self.token_store = Some(store);
        self
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }

    pub fn token_url(&self) -> &str {
        &self.token_url
    }

    pub fn authorization_url(&self) -> &str {
        &self.authorization_url
    }

    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    pub fn token_store(&self) -> Option<&Arc<dyn TokenStore>> {
        self.token_store.as_ref()
    }
}

impl fmt::Debug for OAuth2Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuth2Credentials")
            .field("client_id", &self.client_id)
            .field("token_url", &self.token_url)
            .field("authorization_url", &self.authorization_url)
            .field("scopes", &self.scopes)
            .field("token_store", &self.token_store)
            .finish_non_exhaustive()
    }
}

/// How a client authenticates
#[derive(Debug, Clone, Default)]
pub enum Credential {
    /// No authentication
    #[default]
    Anonymous,

    /// API key in a header or query parameter
    ApiKey(ApiKey),

    /// HTTP Basic authentication
    HttpBasic(HttpBasic),

    /// Static bearer token
    HttpBearer(HttpBearer),

    /// OAuth2 client credentials grant
    OAuth2ClientCredentials(OAuth2Credentials),

    /// OAuth2 authorization code grant
    OAuth2AuthorizationCode(OAuth2Credentials),
}

impl Credential {
    /// API key credential
    pub fn api_key(token: impl Into<String>, name: impl Into<String>, location: Location) -> Self {
        Self::ApiKey(ApiKey::new(token, name, location))
    }

    /// HTTP Basic credential
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::HttpBasic(HttpBasic::new(username, password))
    }

    /// Static bearer credential
    pub fn bearer(token: impl Into<String>) -> Self {
        Self::HttpBearer(HttpBearer::new(token))
    }

    /// OAuth2 client credentials grant
    pub fn client_credentials(credentials: OAuth2Credentials) -> Self {
        Self::OAuth2ClientCredentials(credentials)
    }

    /// OAuth2 authorization code grant
    pub fn authorization_code(credentials: OAuth2Credentials) -> Self {
        Self::OAuth2AuthorizationCode(credentials)
    }

    /// OAuth2 grant type, if this is an OAuth2 credential
    pub fn grant_type(&self) -> Option<GrantType> {
        match self {
            Credential::OAuth2ClientCredentials(_) => Some(GrantType::ClientCredentials),
            Credential::OAuth2AuthorizationCode(_) => Some(GrantType::AuthorizationCode),
            _ => None,
        }
    }
}
