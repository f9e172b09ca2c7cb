//! # SDK Runtime
//!
//! Shared runtime for generated API client SDKs. Generated code describes
//! endpoints; this crate authenticates requests, manages OAuth2 tokens,
//! builds URLs and decodes responses.
//!
//! ## Features
//!
//! - **Credentials**: Anonymous, API key (header or query), HTTP Basic, Bearer, OAuth2
//! - **OAuth2 Token Lifecycle**: client credentials, authorization code, automatic refresh
//! - **Token Stores**: memory, file, session and pluggable cache backends
//! - **Request Pipeline**: authenticator first, then non-overriding default headers
//! - **Multipart Bodies**: ordered parts with optional file names and headers
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sdk_runtime::{Client, ClientConfig, Credential, OAuth2Credentials, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let oauth = OAuth2Credentials::new(
//!         "client-id",
//!         "client-secret",
//!         "https://auth.acme.com/token",
//!         "https://auth.acme.com/authorize",
//!     );
//!     let client = Client::new(
//!         ClientConfig::new("https://api.acme.com"),
//!         &Credential::client_credentials(oauth),
//!     )?;
//!
//!     let tag = client.tag();
//!     let url = tag.parser().url("/products/:id", &[("id", 42.into())]);
//!     let product: serde_json::Value = tag
//!         .execute_json(tag.http().request(reqwest::Method::GET, url))
//!         .await?;
//!     println!("{product}");
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Client  →  Tag (generated)                  │
//! └─────────────────────────────────────────────────────────────┘
//!                                │
//! ┌──────────────┬───────────────┴──────┬───────────┬───────────┐
//! │    Auth      │        HTTP          │  Parser   │  Token    │
//! ├──────────────┼──────────────────────┼───────────┼───────────┤
//! │ API Key      │ Authenticate         │ URL       │ Memory    │
//! │ Basic/Bearer │ Default headers      │ Query     │ File      │
//! │ OAuth2       │ Injectable transport │ Decode    │ Session   │
//! │ Signed state │                      │           │ Cache     │
//! └──────────────┴──────────────────────┴───────────┴───────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types for the runtime
pub mod error;

/// Access tokens and token stores
pub mod token;

/// Credentials and authenticators
pub mod auth;

/// HTTP client and request pipeline
pub mod http;

/// URL templating and response decoding
pub mod parser;

/// Multipart request bodies
pub mod multipart;

/// Client facade used by generated SDKs
pub mod client;

/// YAML/JSON client configuration
pub mod config;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};

pub use auth::{
    Authenticator, AuthenticatorFactory, Credential, GrantType, Location, OAuth2Authenticator,
    OAuth2Credentials,
};
pub use client::{Client, ClientConfig, Tag};
pub use config::{load_config, RuntimeConfig};
pub use http::{HttpClient, HttpClientFactory, USER_AGENT};
pub use multipart::{Multipart, MultipartPart};
pub use parser::{Param, Parser};
pub use token::{AccessToken, FileTokenStore, MemoryTokenStore, TokenStore};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
