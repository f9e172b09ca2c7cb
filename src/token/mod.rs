//! Access tokens and token persistence
//!
//! Supports: memory, file, host session map, external cache
//!
//! `AccessToken` carries the `expires_in` normalization; `TokenState`
//! classifies a cached token as absent, valid or expiring.

mod access_token;
mod store;

pub use access_token::{AccessToken, TokenState, DURATION_THRESHOLD, EXPIRE_THRESHOLD};
pub use store::{
    CacheBackend, CacheTokenStore, FileTokenStore, MemoryTokenStore, Session, SessionTokenStore,
    TokenStore, DEFAULT_TOKEN_KEY,
};
