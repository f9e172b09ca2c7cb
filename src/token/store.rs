//! Token persistence backends
//!
//! A `TokenStore` holds at most one `AccessToken`. The OAuth2 authenticator
//! is the only caller of `get`/`persist`/`remove`; the store owns physical
//! persistence.

use super::access_token::AccessToken;
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Default key / file stem used by the persistent stores
pub const DEFAULT_TOKEN_KEY: &str = "sdk_access_token";

/// Pluggable persistence for a single cached access token
#[async_trait]
pub trait TokenStore: Send + Sync + fmt::Debug {
    /// Load the cached token, if any
    async fn get(&self) -> Result<Option<AccessToken>>;

    /// Replace the cached token
    async fn persist(&self, token: &AccessToken) -> Result<()>;

    /// Forget the cached token
    async fn remove(&self) -> Result<()>;
}

// ============================================================================
// Memory
// ============================================================================

/// Process-local token store, the default for OAuth2 credentials
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: RwLock<Option<AccessToken>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-seeded with a token
    pub fn with_token(token: AccessToken) -> Self {
        Self {
            token: RwLock::new(Some(token)),
        }
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn get(&self) -> Result<Option<AccessToken>> {
        Ok(self.token.read().await.clone())
    }

    async fn persist(&self, token: &AccessToken) -> Result<()> {
        *self.token.write().await = Some(token.clone());
        Ok(())
    }

    async fn remove(&self) -> Result<()> {
        *self.token.write().await = None;
        Ok(())
    }
}

// ============================================================================
// File
// ============================================================================

/// Token store backed by a JSON file at `<dir>/<name>.json`
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    dir: PathBuf,
    name: String,
}

impl Default for FileTokenStore {
    fn default() -> Self {
        Self::new(std::env::temp_dir())
    }
}

impl FileTokenStore {
    /// Create a store in `dir` using the default file name
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self::with_name(dir, DEFAULT_TOKEN_KEY)
    }

    /// Create a store in `dir` with a custom file stem
    pub fn with_name(dir: impl AsRef<Path>, name: impl Into<String>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            name: name.into(),
        }
    }

    /// Full path of the token file
    pub fn path(&self) -> PathBuf {
        self.dir.join(format!("{}.json", self.name))
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn get(&self) -> Result<Option<AccessToken>> {
        let path = self.path();
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(Error::token_store(format!(
                    "Failed to read token file {}: {e}",
                    path.display()
                )))
            }
        };

        if raw.trim().is_empty() {
            return Ok(None);
        }

        let data: Value = match serde_json::from_str(&raw) {
            Ok(data) => data,
            Err(e) => {
                warn!("Ignoring unreadable token file {}: {e}", path.display());
                return Ok(None);
            }
        };

        if !data.is_object() {
            return Ok(None);
        }

        AccessToken::from_value(&data).map(Some)
    }

    async fn persist(&self, token: &AccessToken) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| Error::token_store(format!("Failed to create token dir: {e}")))?;

        let contents = serde_json::to_string(&token.to_value())?;

        // Write to temp file first, then rename for atomicity
        let path = self.path();
        let temp_path = path.with_extension("json.tmp");
        tokio::fs::write(&temp_path, &contents)
            .await
            .map_err(|e| Error::token_store(format!("Failed to write token file: {e}")))?;

        tokio::fs::rename(&temp_path, &path)
            .await
            .map_err(|e| Error::token_store(format!("Failed to rename token file: {e}")))?;

        debug!("Persisted access token to {}", path.display());
        Ok(())
    }

    async fn remove(&self) -> Result<()> {
        match tokio::fs::remove_file(self.path()).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::token_store(format!(
                "Failed to remove token file: {e}"
            ))),
        }
    }
}

// ============================================================================
// Session
// ============================================================================

/// Key-value session map owned by the host application
pub type Session = Arc<RwLock<HashMap<String, Value>>>;

/// Token store that keeps the token inside a host-provided session map
#[derive(Debug, Clone)]
pub struct SessionTokenStore {
    session: Session,
    key: String,
}

impl SessionTokenStore {
    /// Create a store over `session` using the default key
    pub fn new(session: Session) -> Self {
        Self::with_key(session, DEFAULT_TOKEN_KEY)
    }

    /// Create a store over `session` with a custom key
    pub fn with_key(session: Session, key: impl Into<String>) -> Self {
        Self {
            session,
            key: key.into(),
        }
    }
}

#[async_trait]
impl TokenStore for SessionTokenStore {
    async fn get(&self) -> Result<Option<AccessToken>> {
        let session = self.session.read().await;
        match session.get(&self.key) {
            Some(Value::Null) | None => Ok(None),
            Some(value) => AccessToken::from_value(value).map(Some),
        }
    }

    async fn persist(&self, token: &AccessToken) -> Result<()> {
        self.session
            .write()
            .await
            .insert(self.key.clone(), token.to_value());
        Ok(())
    }

    async fn remove(&self) -> Result<()> {
        self.session.write().await.remove(&self.key);
        Ok(())
    }
}

// ============================================================================
// External cache
// ============================================================================

/// Minimal string cache interface (Redis, memcached, ...)
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: String) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;
}

/// Token store on top of an external cache
#[derive(Clone)]
pub struct CacheTokenStore {
    cache: Arc<dyn CacheBackend>,
    key: String,
}

impl CacheTokenStore {
    /// Create a store over `cache` using the default key
    pub fn new(cache: Arc<dyn CacheBackend>) -> Self {
        Self::with_key(cache, DEFAULT_TOKEN_KEY)
    }

    /// Create a store over `cache` with a custom key
    pub fn with_key(cache: Arc<dyn CacheBackend>, key: impl Into<String>) -> Self {
        Self {
            cache,
            key: key.into(),
        }
    }
}

impl fmt::Debug for CacheTokenStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheTokenStore")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl TokenStore for CacheTokenStore {
    async fn get(&self) -> Result<Option<AccessToken>> {
        let Some(raw) = self.cache.get(&self.key).await? else {
            return Ok(None);
        };
        if raw.is_empty() {
            return Ok(None);
        }

        let data: Value = serde_json::from_str(&raw)
            .map_err(|e| Error::invalid_access_token(format!("Cached token is not JSON: {e}")))?;
        AccessToken::from_value(&data).map(Some)
    }

    async fn persist(&self, token: &AccessToken) -> Result<()> {
        let blob = serde_json::to_string(&token.to_value())?;
        self.cache.set(&self.key, blob).await
    }

    async fn remove(&self) -> Result<()> {
        self.cache.delete(&self.key).await
    }
}
