//! Signed `state` parameter for the authorization code flow
//!
//! The state is an HS256 JWT signed with the client secret, so the callback
//! can be checked without server-side storage.

use crate::error::{Error, Result};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Lifetime of an issued state in seconds
pub const STATE_LIFETIME: i64 = 300;

#[derive(Debug, Serialize, Deserialize)]
struct StateClaims {
    iat: i64,
    exp: i64,
}

/// Issue a state token valid for [`STATE_LIFETIME`] seconds from `now`
pub fn issue_state(secret: &str, now: i64) -> Result<String> {
    let claims = StateClaims {
        iat: now,
        exp: now + STATE_LIFETIME,
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| Error::invalid_state(format!("Failed to sign state: {e}")))
}

/// Check signature and expiry of a round-tripped state
pub fn verify_state(secret: &str, state: &str) -> Result<()> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    decode::<StateClaims>(
        state,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|_| ())
    .map_err(|e| Error::invalid_state(format!("Provided state is invalid: {e}")))
}
