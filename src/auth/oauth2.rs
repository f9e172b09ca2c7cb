//! OAuth2 token lifecycle
//!
//! The cached token is re-evaluated on every request; there is no
//! background timer. Exchanges with the token endpoint are serialized per
//! authenticator so concurrent callers racing past a stale token share a
//! single exchange and see the same resulting token.

use super::authenticator::Authenticator;
use super::state::{issue_state, verify_state};
use super::types::{GrantType, HttpBasic, OAuth2Credentials};
use crate::error::{Error, Result};
use crate::http::HttpClientFactory;
use crate::token::{AccessToken, MemoryTokenStore, TokenState, TokenStore, EXPIRE_THRESHOLD};
use chrono::Utc;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Method, Response, StatusCode};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

/// Stateful OAuth2 authenticator
pub struct OAuth2Authenticator {
    credentials: OAuth2Credentials,
    grant: GrantType,
    token_store: Arc<dyn TokenStore>,
    http_client: Client,
    /// Held across get-decide-persist so exchanges are single-flight
    exchange_lock: Mutex<()>,
}

impl OAuth2Authenticator {
    /// Authenticator for the client credentials grant
    pub fn client_credentials(credentials: OAuth2Credentials, http_client: Client) -> Self {
        Self::new(credentials, GrantType::ClientCredentials, http_client)
    }

    /// Authenticator for the authorization code grant
    pub fn authorization_code(credentials: OAuth2Credentials, http_client: Client) -> Self {
        Self::new(credentials, GrantType::AuthorizationCode, http_client)
    }

    fn new(credentials: OAuth2Credentials, grant: GrantType, http_client: Client) -> Self {
        let token_store = credentials
            .token_store()
            .cloned()
            .unwrap_or_else(|| Arc::new(MemoryTokenStore::new()));

        Self {
            credentials,
            grant,
            token_store,
            http_client,
            exchange_lock: Mutex::new(()),
        }
    }

    pub fn grant_type(&self) -> GrantType {
        self.grant
    }

    pub fn credentials(&self) -> &OAuth2Credentials {
        &self.credentials
    }

    /// Store holding the cached token
    pub fn token_store(&self) -> &Arc<dyn TokenStore> {
        &self.token_store
    }

    /// Current access token with automatic refresh and the default threshold
    pub async fn access_token(&self) -> Result<String> {
        self.get_access_token(true, EXPIRE_THRESHOLD).await
    }

    /// Resolve the access token to send, fetching or refreshing as needed.
    ///
    /// - no token and a client credentials grant: fetch one
    /// - no token otherwise: [`Error::FoundNoAccessToken`]
    /// - valid for more than `expire_threshold` seconds: returned as is
    /// - stale with a refresh token and `automatic_refresh`: refreshed
    /// - stale and expired on a client credentials grant: fetch a new one
    /// - otherwise the stale token is returned unchanged
    pub async fn get_access_token(
        &self,
        automatic_refresh: bool,
        expire_threshold: i64,
    ) -> Result<String> {
        // Fast path, no lock
        if let Some(token) = self.token_store.get().await? {
            let now = Utc::now().timestamp();
            if TokenState::of(Some(&token), now, expire_threshold) == TokenState::Valid {
                debug!("Using cached access token");
                return Ok(token.access_token().to_string());
            }
        }

        let _guard = self.exchange_lock.lock().await;

        // Re-read: another task may have finished an exchange meanwhile
        let cached = self.token_store.get().await?;
        let now = Utc::now().timestamp();

        let token = match cached {
            Some(token) => token,
            None if self.grant == GrantType::ClientCredentials => {
                let token = self.exchange_client_credentials().await?;
                return Ok(token.access_token().to_string());
            }
            None => return Err(Error::FoundNoAccessToken),
        };

        if TokenState::of(Some(&token), now, expire_threshold) == TokenState::Valid {
            debug!("Using access token obtained by a concurrent request");
            return Ok(token.access_token().to_string());
        }

        if automatic_refresh && token.has_refresh_token() {
            let refreshed = self.exchange_refresh_token(token.refresh_token()).await?;
            return Ok(refreshed.access_token().to_string());
        }

        if self.grant == GrantType::ClientCredentials && token.is_expired_at(now) {
            let token = self.exchange_client_credentials().await?;
            return Ok(token.access_token().to_string());
        }

        warn!("Access token is close to expiry and cannot be refreshed, using it as is");
        Ok(token.access_token().to_string())
    }

    /// Build the URL the user is redirected to for the authorization code flow.
    ///
    /// Existing query parameters on the authorization URL are kept; the new
    /// ones override them. Explicit `scopes` win over the configured ones.
    pub fn build_redirect_url(
        &self,
        redirect_url: Option<&str>,
        scopes: Option<&[String]>,
        state: Option<&str>,
    ) -> Result<String> {
        self.require_authorization_code()?;

        let mut parameters: Vec<(&str, String)> = vec![
            ("response_type", "code".to_string()),
            ("client_id", self.credentials.client_id().to_string()),
        ];

        if let Some(redirect_url) = redirect_url.filter(|s| !s.is_empty()) {
            parameters.push(("redirect_uri", redirect_url.to_string()));
        }

        let scopes = scopes
            .filter(|s| !s.is_empty())
            .unwrap_or(self.credentials.scopes());
        if !scopes.is_empty() {
            parameters.push(("scope", scopes.join(",")));
        }

        if let Some(state) = state.filter(|s| !s.is_empty()) {
            parameters.push(("state", state.to_string()));
        }

        let mut url = Url::parse(self.credentials.authorization_url())?;
        let mut merged: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        for (key, value) in parameters {
            match merged.iter_mut().find(|(k, _)| k == key) {
                Some(existing) => existing.1 = value,
                None => merged.push((key.to_string(), value)),
            }
        }
        url.query_pairs_mut().clear().extend_pairs(&merged);

        Ok(url.to_string())
    }

    /// Issue a signed `state` value for [`Self::build_redirect_url`]
    pub fn generate_state(&self) -> Result<String> {
        issue_state(self.credentials.client_secret(), Utc::now().timestamp())
    }

    /// Verify a `state` value issued by [`Self::generate_state`]
    pub fn verify_state(&self, state: &str) -> Result<()> {
        verify_state(self.credentials.client_secret(), state)
    }

    /// Exchange an authorization code for a token and persist it
    pub async fn fetch_access_token_by_code(&self, code: &str) -> Result<AccessToken> {
        self.require_authorization_code()?;
        let _guard = self.exchange_lock.lock().await;
        self.exchange(&[("grant_type", "authorization_code"), ("code", code)])
            .await
    }

    /// Verify the round-tripped `state`, then exchange the code
    pub async fn fetch_access_token_by_code_with_state(
        &self,
        code: &str,
        state: &str,
    ) -> Result<AccessToken> {
        self.require_authorization_code()?;
        self.verify_state(state)?;
        self.fetch_access_token_by_code(code).await
    }

    /// Run a client credentials exchange and persist the result
    pub async fn fetch_access_token_by_client_credentials(&self) -> Result<AccessToken> {
        let _guard = self.exchange_lock.lock().await;
        self.exchange_client_credentials().await
    }

    /// Run a refresh token exchange and persist the result
    pub async fn fetch_access_token_by_refresh(&self, refresh_token: &str) -> Result<AccessToken> {
        let _guard = self.exchange_lock.lock().await;
        self.exchange_refresh_token(refresh_token).await
    }

    /// Drop the cached token
    pub async fn remove_token(&self) -> Result<()> {
        self.token_store.remove().await
    }

    fn require_authorization_code(&self) -> Result<()> {
        if self.grant == GrantType::AuthorizationCode {
            Ok(())
        } else {
            Err(Error::invalid_credentials(
                "The configured credentials do not support the OAuth2 authorization code flow",
            ))
        }
    }

    async fn exchange_client_credentials(&self) -> Result<AccessToken> {
        let scope = self.credentials.scopes().join(",");
        let mut form = vec![("grant_type", "client_credentials")];
        if !scope.is_empty() {
            form.push(("scope", scope.as_str()));
        }
        self.exchange(&form).await
    }

    async fn exchange_refresh_token(&self, refresh_token: &str) -> Result<AccessToken> {
        self.exchange(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ])
        .await
    }

    /// POST a grant to the token endpoint, authenticated with the client id
    /// and secret over HTTP Basic.
    async fn exchange(&self, form: &[(&str, &str)]) -> Result<AccessToken> {
        let grant = form
            .iter()
            .find(|(k, _)| *k == "grant_type")
            .map_or("unknown", |(_, v)| *v);
        debug!("Requesting access token ({grant}) from {}", self.credentials.token_url());

        let client_auth = Authenticator::HttpBasic(HttpBasic::new(
            self.credentials.client_id(),
            self.credentials.client_secret(),
        ));
        let http = HttpClientFactory::new(client_auth)
            .with_client(self.http_client.clone())
            .factory()?;

        let request = http
            .request(Method::POST, self.credentials.token_url())
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .form(form)
            .build()
            .map_err(Error::AccessTokenRequest)?;

        let response = http.execute(request).await.map_err(|e| match e {
            Error::Http(e) => Error::AccessTokenRequest(e),
            other => other,
        })?;

        let token = self.parse_token_response(response).await?;
        info!("Obtained access token via {grant} grant");
        Ok(token)
    }

    /// Validate a token endpoint response, persist and return the token
    async fn parse_token_response(&self, response: Response) -> Result<AccessToken> {
        let status = response.status();
        if status != StatusCode::OK {
            return Err(Error::token_endpoint_status(status.as_u16()));
        }

        let body = response.text().await.map_err(Error::AccessTokenRequest)?;
        let data: Value = serde_json::from_str(&body).map_err(|e| {
            Error::invalid_access_token(format!("Could not obtain access token: {e}"))
        })?;

        let token = AccessToken::from_value(&data)?.normalized_at(Utc::now().timestamp());
        self.token_store.persist(&token).await?;

        Ok(token)
    }
}

impl fmt::Debug for OAuth2Authenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuth2Authenticator")
            .field("credentials", &self.credentials)
            .field("grant", &self.grant)
            .field("token_store", &self.token_store)
            .finish_non_exhaustive()
    }
}
