//! Error types for the SDK runtime
//!
//! This module defines the error hierarchy for the entire runtime.
//! All public APIs return `Result<T, Error>` where Error is defined here.

use thiserror::Error;

/// The main error type for the SDK runtime
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Authentication Errors
    // ============================================================================
    #[error("Invalid credentials: {message}")]
    InvalidCredentials { message: String },

    #[error("Invalid access token: {message}")]
    InvalidAccessToken {
        message: String,
        /// Status code returned by the token endpoint, if any
        status: Option<u16>,
    },

    #[error("Found no access token, please obtain an access token before making a request")]
    FoundNoAccessToken,

    #[error("Could not request access token: {0}")]
    AccessTokenRequest(#[source] reqwest::Error),

    #[error("Invalid state: {message}")]
    InvalidState { message: String },

    // ============================================================================
    // Token Store Errors
    // ============================================================================
    #[error("Token store error: {message}")]
    TokenStore { message: String },

    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Missing required config field: {field}")]
    MissingConfigField { field: String },

    #[error("Undefined variable in config: {variable}")]
    UndefinedVariable { variable: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // HTTP Errors
    // ============================================================================
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Invalid header '{name}': {message}")]
    InvalidHeader { name: String, message: String },

    // ============================================================================
    // Response Parsing Errors
    // ============================================================================
    #[error("Failed to parse response: {message}")]
    Parse { message: String },

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an invalid credentials error
    pub fn invalid_credentials(message: impl Into<String>) -> Self {
        Self::InvalidCredentials {
            message: message.into(),
        }
    }

    /// Create an invalid access token error without a status code
    pub fn invalid_access_token(message: impl Into<String>) -> Self {
        Self::InvalidAccessToken {
            message: message.into(),
            status: None,
        }
    }

    /// Create an invalid access token error for a rejected token endpoint call
    pub fn token_endpoint_status(status: u16) -> Self {
        Self::InvalidAccessToken {
            message: format!(
                "Could not obtain access token, received a non successful status code: {status}"
            ),
            status: Some(status),
        }
    }

    /// Create an invalid state error
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Create a token store error
    pub fn token_store(message: impl Into<String>) -> Self {
        Self::TokenStore {
            message: message.into(),
        }
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a missing field error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingConfigField {
            field: field.into(),
        }
    }

    /// Create an undefined variable error
    pub fn undefined_var(variable: impl Into<String>) -> Self {
        Self::UndefinedVariable {
            variable: variable.into(),
        }
    }

    /// Create an HTTP status error
    pub fn http_status(status: u16, body: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            body: body.into(),
        }
    }

    /// Create an invalid header error
    pub fn invalid_header(name: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::InvalidHeader {
            name: name.into(),
            message: message.to_string(),
        }
    }

    /// Create a parse error
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// HTTP status carried by this error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::InvalidAccessToken { status, .. } => *status,
            Error::HttpStatus { status, .. } => Some(*status),
            Error::AccessTokenRequest(e) | Error::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Check if this error comes from the authentication layer
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidCredentials { .. }
                | Error::InvalidAccessToken { .. }
                | Error::FoundNoAccessToken
                | Error::AccessTokenRequest(_)
                | Error::InvalidState { .. }
        )
    }
}

/// Result type alias for the SDK runtime
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", message.into(), inner))
        })
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", f(), inner))
        })
    }
}
