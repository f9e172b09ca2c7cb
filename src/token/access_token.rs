//! OAuth2 access token envelope
//!
//! An `AccessToken` is the parsed result of one OAuth2 grant. It is built
//! from a token endpoint response or a persisted blob and never mutated;
//! a refresh produces a new value.

use crate::error::{Error, Result};
use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Map, Value};

/// `expires_in` values below this Unix timestamp (1986-10-09) are read as a
/// duration in seconds, anything at or above it as an absolute timestamp.
///
/// A lifetime of more than ~16 years would be misread as a timestamp.
pub const DURATION_THRESHOLD: i64 = 529_196_400;

/// Safety margin before expiry at which a token counts as stale
pub const EXPIRE_THRESHOLD: i64 = 600;

/// One OAuth2 grant result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    access_token: String,
    token_type: String,
    expires_in: i64,
    refresh_token: String,
    scope: String,
}

impl AccessToken {
    /// Create a new access token
    pub fn new(
        access_token: impl Into<String>,
        token_type: impl Into<String>,
        expires_in: i64,
        refresh_token: impl Into<String>,
        scope: impl Into<String>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: token_type.into(),
            expires_in,
            refresh_token: refresh_token.into(),
            scope: scope.into(),
        }
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn token_type(&self) -> &str {
        &self.token_type
    }

    /// Raw `expires_in` value, either a duration or a timestamp
    pub fn expires_in(&self) -> i64 {
        self.expires_in
    }

    /// Refresh token, empty when the grant did not issue one
    pub fn refresh_token(&self) -> &str {
        &self.refresh_token
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn has_refresh_token(&self) -> bool {
        !self.refresh_token.is_empty()
    }

    /// Absolute expiry timestamp relative to the current time
    pub fn expires_at_timestamp(&self) -> i64 {
        self.expires_at_timestamp_at(Utc::now().timestamp())
    }

    /// Absolute expiry timestamp, reading durations relative to `now`
    pub fn expires_at_timestamp_at(&self, now: i64) -> i64 {
        if self.expires_in < DURATION_THRESHOLD {
            now.saturating_add(self.expires_in)
        } else {
            self.expires_in
        }
    }

    /// Whether the token is past its expiry at `now` (no safety margin)
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expires_at_timestamp_at(now) <= now
    }

    /// Pin a duration `expires_in` to the absolute timestamp it denotes at `now`.
    ///
    /// Tokens coming off the wire are normalized before they are persisted so
    /// that a stored token ages instead of being re-read as "now + duration".
    #[must_use]
    pub fn normalized_at(self, now: i64) -> Self {
        let expires_in = self.expires_at_timestamp_at(now);
        Self { expires_in, ..self }
    }

    /// Serialize to the persisted blob format
    pub fn to_value(&self) -> Value {
        json!({
            "access_token": self.access_token,
            "token_type": self.token_type,
            "expires_in": self.expires_in,
            "refresh_token": self.refresh_token,
            "scope": self.scope,
        })
    }

    /// Parse from a token endpoint response or persisted blob.
    ///
    /// `access_token`, `token_type` and `expires_in` are required;
    /// `refresh_token` and `scope` default to the empty string.
    pub fn from_value(value: &Value) -> Result<Self> {
        let map = value
            .as_object()
            .ok_or_else(|| Error::invalid_access_token("Could not obtain access token"))?;

        let access_token = required_string(map, "access_token")?;
        if access_token.is_empty() {
            return Err(Error::invalid_access_token(
                "Key \"access_token\" must not be empty",
            ));
        }

        Ok(Self {
            access_token,
            token_type: required_string(map, "token_type")?,
            expires_in: required_integer(map, "expires_in")?,
            refresh_token: optional_string(map, "refresh_token"),
            scope: optional_string(map, "scope"),
        })
    }
}

fn present<'a>(map: &'a Map<String, Value>, key: &str) -> Result<&'a Value> {
    match map.get(key) {
        Some(Value::Null) | None => Err(Error::invalid_access_token(format!(
            "Key \"{key}\" not available"
        ))),
        Some(value) => Ok(value),
    }
}

fn required_string(map: &Map<String, Value>, key: &str) -> Result<String> {
    match present(map, key)? {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        _ => Err(Error::invalid_access_token(format!(
            "Key \"{key}\" must be a string"
        ))),
    }
}

fn required_integer(map: &Map<String, Value>, key: &str) -> Result<i64> {
    let value = present(map, key)?;
    let parsed = match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| Error::invalid_access_token(format!("Key \"{key}\" must be an integer")))
}

fn optional_string(map: &Map<String, Value>, key: &str) -> String {
    match map.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

impl TryFrom<&Value> for AccessToken {
    type Error = Error;

    fn try_from(value: &Value) -> Result<Self> {
        Self::from_value(value)
    }
}

impl Serialize for AccessToken {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for AccessToken {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(&value).map_err(serde::de::Error::custom)
    }
}

/// Lifecycle state of the cached token, evaluated on every request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    /// Nothing in the store
    Absent,
    /// Expires later than `now + threshold`
    Valid,
    /// Present but within the threshold or already expired
    Expiring,
}

impl TokenState {
    /// Classify a token at `now` with the given safety margin in seconds
    pub fn of(token: Option<&AccessToken>, now: i64, threshold: i64) -> Self {
        match token {
            None => TokenState::Absent,
            Some(token) if token.expires_at_timestamp_at(now) > now.saturating_add(threshold) => {
                TokenState::Valid
            }
            Some(_) => TokenState::Expiring,
        }
    }
}
