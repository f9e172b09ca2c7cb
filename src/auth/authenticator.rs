//! Authenticator implementation
//!
//! Applies a credential to outgoing requests. Every variant consumes the
//! request and hands back the decorated one.

use super::oauth2::OAuth2Authenticator;
use super::types::{ApiKey, Credential, HttpBasic, HttpBearer, Location};
use crate::error::{Error, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::header::{HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::{Client, Request};

/// Request mutator for one credential kind
#[derive(Debug)]
pub enum Authenticator {
    /// Leaves the request untouched
    Anonymous,
    /// Adds the raw key as a header or query parameter
    ApiKey(ApiKey),
    /// Adds `Authorization: Basic base64(user:pass)`
    HttpBasic(HttpBasic),
    /// Adds `Authorization: Bearer <token>`
    HttpBearer(HttpBearer),
    /// Adds `Authorization: Bearer <access token>` from the token lifecycle
    OAuth2(OAuth2Authenticator),
}

impl Authenticator {
    /// Apply authentication to a request
    pub async fn apply(&self, request: Request) -> Result<Request> {
        match self {
            Authenticator::Anonymous => Ok(request),

            Authenticator::ApiKey(key) => match key.location() {
                Location::Header => with_header(request, key.name(), key.token()),
                Location::Query => {
                    let mut request = request;
                    let url = request.url_mut();
                    let kept: Vec<(String, String)> = url
                        .query_pairs()
                        .into_owned()
                        .filter(|(name, _)| name != key.name())
                        .collect();
                    url.query_pairs_mut()
                        .clear()
                        .extend_pairs(&kept)
                        .append_pair(key.name(), key.token());
                    Ok(request)
                }
            },

            Authenticator::HttpBasic(basic) => {
                with_header(request, AUTHORIZATION.as_str(), &basic_value(basic))
            }

            Authenticator::HttpBearer(bearer) => with_header(
                request,
                AUTHORIZATION.as_str(),
                &format!("Bearer {}", bearer.token()),
            ),

            Authenticator::OAuth2(oauth) => {
                let token = oauth.access_token().await?;
                with_header(request, AUTHORIZATION.as_str(), &format!("Bearer {token}"))
            }
        }
    }

    /// The OAuth2 authenticator, if this is one
    pub fn as_oauth2(&self) -> Option<&OAuth2Authenticator> {
        match self {
            Authenticator::OAuth2(oauth) => Some(oauth),
            _ => None,
        }
    }
}

/// Maps a credential to its authenticator
pub struct AuthenticatorFactory;

impl AuthenticatorFactory {
    /// Build the authenticator for `credential`.
    ///
    /// `http_client` is the transport used for OAuth2 token endpoint calls.
    pub fn factory(credential: &Credential, http_client: Client) -> Authenticator {
        match credential {
            Credential::Anonymous => Authenticator::Anonymous,
            Credential::ApiKey(key) => Authenticator::ApiKey(key.clone()),
            Credential::HttpBasic(basic) => Authenticator::HttpBasic(basic.clone()),
            Credential::HttpBearer(bearer) => Authenticator::HttpBearer(bearer.clone()),
            Credential::OAuth2ClientCredentials(oauth) => {
                Authenticator::OAuth2(OAuth2Authenticator::client_credentials(
                    oauth.clone(),
                    http_client,
                ))
            }
            Credential::OAuth2AuthorizationCode(oauth) => {
                Authenticator::OAuth2(OAuth2Authenticator::authorization_code(
                    oauth.clone(),
                    http_client,
                ))
            }
        }
    }
}

fn basic_value(basic: &HttpBasic) -> String {
    let raw = format!("{}:{}", basic.username(), basic.password());
    format!("Basic {}", STANDARD.encode(raw))
}

/// Set (replace) a header on a request
fn with_header(mut request: Request, name: &str, value: &str) -> Result<Request> {
    let header_name =
        HeaderName::from_bytes(name.as_bytes()).map_err(|e| Error::invalid_header(name, e))?;
    let mut header_value = HeaderValue::from_str(value).map_err(|e| Error::invalid_header(name, e))?;
    header_value.set_sensitive(true);
    request.headers_mut().insert(header_name, header_value);
    Ok(request)
}
