//! Authentication module
//!
//! Supports: Anonymous, API Key, Basic, Bearer, OAuth2 (client credentials
//! and authorization code)
//!
//! `AuthenticatorFactory` maps a `Credential` to its `Authenticator`. The
//! OAuth2 variant owns the token lifecycle: it reads the `TokenStore`,
//! fetches or refreshes tokens on demand and persists every new token.

mod authenticator;
mod oauth2;
mod state;
mod types;

pub use authenticator::{Authenticator, AuthenticatorFactory};
pub use oauth2::OAuth2Authenticator;
pub use state::{issue_state, verify_state, STATE_LIFETIME};
pub use types::{ApiKey, Credential, GrantType, HttpBasic, HttpBearer, Location, OAuth2Credentials};

#[cfg(test)]
mod tests;
