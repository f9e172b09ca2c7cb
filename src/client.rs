//! Client facade for generated SDKs
//!
//! A [`Client`] owns the wired-up HTTP client and parser. Generated tag
//! types borrow both through a [`Tag`] and never touch credentials.

use crate::auth::{Authenticator, AuthenticatorFactory, Credential, OAuth2Authenticator};
use crate::error::{Error, Result};
use crate::http::{HttpClient, HttpClientFactory, USER_AGENT};
use crate::multipart::Multipart;
use crate::parser::Parser;
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Transport settings for a [`Client`]
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub user_agent: String,
    pub default_headers: HashMap<String, String>,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: USER_AGENT.to_string(),
            default_headers: HashMap::new(),
        }
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = agent.into();
        self
    }

    /// Header sent with every request unless the caller sets it
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.insert(name.into(), value.into());
        self
    }
}

/// Entry point of a generated SDK
#[derive(Debug, Clone)]
pub struct Client {
    http: Arc<HttpClient>,
    parser: Arc<Parser>,
}

impl Client {
    /// Build a client for `credential`.
    ///
    /// The same transport carries API calls and OAuth2 token exchanges.
    pub fn new(config: ClientConfig, credential: &Credential) -> Result<Self> {
        let transport = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        let authenticator = AuthenticatorFactory::factory(credential, transport.clone());
        Self::with_authenticator(config, authenticator, transport)
    }

    /// Build a client around an existing authenticator and transport
    pub fn with_authenticator(
        config: ClientConfig,
        authenticator: Authenticator,
        transport: reqwest::Client,
    ) -> Result<Self> {
        let mut factory = HttpClientFactory::new(authenticator)
            .with_client(transport)
            .user_agent(config.user_agent);
        for (name, value) in config.default_headers {
            factory = factory.header(name, value);
        }

        debug!("Created client for {}", config.base_url);

        Ok(Self {
            http: Arc::new(factory.factory()?),
            parser: Arc::new(Parser::new(&config.base_url)),
        })
    }

    pub fn http(&self) -> &Arc<HttpClient> {
        &self.http
    }

    pub fn parser(&self) -> &Arc<Parser> {
        &self.parser
    }

    pub fn authenticator(&self) -> &Authenticator {
        self.http.authenticator()
    }

    /// The OAuth2 authenticator, for the authorization code and token management calls
    pub fn oauth2(&self) -> Result<&OAuth2Authenticator> {
        self.authenticator().as_oauth2().ok_or_else(|| {
            Error::invalid_credentials("The configured credentials are not OAuth2 credentials")
        })
    }

    /// Handle shared by generated tag types
    pub fn tag(&self) -> Tag {
        Tag::new(Arc::clone(&self.http), Arc::clone(&self.parser))
    }
}

/// Base of a generated tag: the HTTP client and parser of its [`Client`]
#[derive(Debug, Clone)]
pub struct Tag {
    http: Arc<HttpClient>,
    parser: Arc<Parser>,
}

impl Tag {
    pub fn new(http: Arc<HttpClient>, parser: Arc<Parser>) -> Self {
        Self { http, parser }
    }

    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    pub fn parser(&self) -> &Parser {
        &self.parser
    }

    /// Send a request and decode a 2xx JSON body into `T`
    pub async fn execute_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let response = self.http.send(builder).await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(Error::http_status(status.as_u16(), body));
        }

        self.parser.parse(&body)
    }

    /// Attach `multipart` as the request body, then send like [`Self::execute_json`]
    pub async fn execute_multipart<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        multipart: Multipart,
    ) -> Result<T> {
        self.execute_json(builder.multipart(multipart.into_form()?))
            .await
    }
}
