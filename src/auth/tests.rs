//! Tests for the auth module

use super::*;
use crate::error::{Error, Result};
use crate::token::{AccessToken, MemoryTokenStore, TokenStore, EXPIRE_THRESHOLD};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Utc;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn get(url: &str) -> reqwest::Request {
    reqwest::Client::new().get(url).build().unwrap()
}

fn now() -> i64 {
    Utc::now().timestamp()
}

fn basic_header(user: &str, pass: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{user}:{pass}")))
}

/// Memory store that counts writes
#[derive(Debug, Default)]
struct RecordingStore {
    inner: MemoryTokenStore,
    persisted: AtomicUsize,
}

impl RecordingStore {
    fn with_token(token: AccessToken) -> Self {
        Self {
            inner: MemoryTokenStore::with_token(token),
            persisted: AtomicUsize::new(0),
        }
    }

    fn persist_count(&self) -> usize {
        self.persisted.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenStore for RecordingStore {
    async fn get(&self) -> Result<Option<AccessToken>> {
        self.inner.get().await
    }

    async fn persist(&self, token: &AccessToken) -> Result<()> {
        self.persisted.fetch_add(1, Ordering::SeqCst);
        self.inner.persist(token).await
    }

    async fn remove(&self) -> Result<()> {
        self.inner.remove().await
    }
}

fn credentials(server: &MockServer, store: Arc<dyn TokenStore>) -> OAuth2Credentials {
    OAuth2Credentials::new(
        "client",
        "secret",
        format!("{}/token", server.uri()),
        format!("{}/authorize", server.uri()),
    )
    .with_token_store(store)
}

fn token_response(access_token: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "access_token": access_token,
        "token_type": "bearer",
        "expires_in": 3600,
        "refresh_token": "rt2",
        "scope": "read"
    }))
}

fn authorization(request: &reqwest::Request) -> &str {
    request
        .headers()
        .get("authorization")
        .unwrap()
        .to_str()
        .unwrap()
}

// ============================================================================
// Simple authenticators
// ============================================================================

#[tokio::test]
async fn test_anonymous_leaves_request_untouched() {
    let request = Authenticator::Anonymous
        .apply(get("https://api.acme.com/items"))
        .await
        .unwrap();
    assert!(request.headers().is_empty());
    assert_eq!(request.url().as_str(), "https://api.acme.com/items");
}

#[tokio::test]
async fn test_api_key_header() {
    let auth = Authenticator::ApiKey(ApiKey::new("key-123", "X-Api-Key", Location::Header));
    let request = auth.apply(get("https://api.acme.com/items")).await.unwrap();
    assert_eq!(request.headers().get("x-api-key").unwrap(), "key-123");
}

#[tokio::test]
async fn test_api_key_query_keeps_existing_parameters() {
    let auth = Authenticator::ApiKey(ApiKey::new("key-123", "api_key", Location::Query));
    let request = auth
        .apply(get("https://api.acme.com/items?page=2"))
        .await
        .unwrap();
    assert_eq!(
        request.url().as_str(),
        "https://api.acme.com/items?page=2&api_key=key-123"
    );
    assert!(request.headers().get("authorization").is_none());
}

#[tokio::test]
async fn test_api_key_query_replaces_existing_value() {
    let auth = Authenticator::ApiKey(ApiKey::new("key-123", "api_key", Location::Query));
    let request = auth
        .apply(get("https://api.acme.com/items?api_key=old&page=2"))
        .await
        .unwrap();

    let pairs: Vec<(String, String)> = request.url().query_pairs().into_owned().collect();
    assert_eq!(
        pairs,
        vec![
            ("page".to_string(), "2".to_string()),
            ("api_key".to_string(), "key-123".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_http_basic() {
    let auth = Authenticator::HttpBasic(HttpBasic::new("foo", "bar"));
    let request = auth.apply(get("https://api.acme.com/")).await.unwrap();
    assert_eq!(authorization(&request), "Basic Zm9vOmJhcg==");
}

#[tokio::test]
async fn test_http_bearer_replaces_existing_header() {
    let mut request = get("https://api.acme.com/");
    request
        .headers_mut()
        .insert("authorization", "Bearer old".parse().unwrap());

    let auth = Authenticator::HttpBearer(HttpBearer::new("new-token"));
    let request = auth.apply(request).await.unwrap();
    assert_eq!(authorization(&request), "Bearer new-token");
    assert_eq!(request.headers().get_all("authorization").iter().count(), 1);
}

#[tokio::test]
async fn test_invalid_header_name() {
    let auth = Authenticator::ApiKey(ApiKey::new("key", "bad header", Location::Header));
    let err = auth.apply(get("https://api.acme.com/")).await.unwrap_err();
    assert!(matches!(err, Error::InvalidHeader { .. }));
}

#[test]
fn test_factory_maps_credentials() {
    let client = reqwest::Client::new();

    assert!(matches!(
        AuthenticatorFactory::factory(&Credential::Anonymous, client.clone()),
        Authenticator::Anonymous
    ));
    assert!(matches!(
        AuthenticatorFactory::factory(&Credential::bearer("t"), client.clone()),
        Authenticator::HttpBearer(_)
    ));
    assert!(matches!(
        AuthenticatorFactory::factory(&Credential::basic("u", "p"), client.clone()),
        Authenticator::HttpBasic(_)
    ));

    let oauth = OAuth2Credentials::new("id", "secret", "https://a/token", "https://a/auth");
    let auth = AuthenticatorFactory::factory(&Credential::authorization_code(oauth), client);
    assert_eq!(
        auth.as_oauth2().unwrap().grant_type(),
        GrantType::AuthorizationCode
    );
}

#[tokio::test]
async fn test_factory_uses_configured_token_store() {
    let store: Arc<dyn TokenStore> = Arc::new(MemoryTokenStore::with_token(AccessToken::new(
        "stored",
        "bearer",
        now() + 3600,
        "",
        "",
    )));
    let oauth = OAuth2Credentials::new("id", "secret", "https://a/token", "https://a/auth")
        .with_token_store(store.clone());

    let auth = AuthenticatorFactory::factory(
        &Credential::client_credentials(oauth),
        reqwest::Client::new(),
    );
    assert!(Arc::ptr_eq(auth.as_oauth2().unwrap().token_store(), &store));

    let request = auth.apply(get("https://api.acme.com/")).await.unwrap();
    assert_eq!(authorization(&request), "Bearer stored");
}

// ============================================================================
// OAuth2 token lifecycle
// ============================================================================

#[tokio::test]
async fn test_valid_token_makes_no_network_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(token_response("unused"))
        .expect(0)
        .mount(&server)
        .await;

    let store = Arc::new(RecordingStore::with_token(AccessToken::new(
        "cached",
        "bearer",
        now() + 3600,
        "rt",
        "",
    )));
    let auth = Authenticator::OAuth2(OAuth2Authenticator::client_credentials(
        credentials(&server, store.clone()),
        reqwest::Client::new(),
    ));

    let request = auth.apply(get("https://api.acme.com/")).await.unwrap();
    assert_eq!(authorization(&request), "Bearer cached");
    assert_eq!(store.persist_count(), 0);
}

#[tokio::test]
async fn test_expired_token_is_refreshed_once() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(header("authorization", basic_header("client", "secret").as_str()))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=rt"))
        .respond_with(token_response("refreshed"))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(RecordingStore::with_token(AccessToken::new(
        "stale",
        "bearer",
        now() - 10,
        "rt",
        "",
    )));
    let auth = Authenticator::OAuth2(OAuth2Authenticator::authorization_code(
        credentials(&server, store.clone()),
        reqwest::Client::new(),
    ));

    let request = auth.apply(get("https://api.acme.com/")).await.unwrap();
    assert_eq!(authorization(&request), "Bearer refreshed");

    let stored = store.get().await.unwrap().unwrap();
    assert_eq!(stored.access_token(), "refreshed");
    assert_eq!(stored.refresh_token(), "rt2");
    // Stored as an absolute timestamp
    assert!(stored.expires_in() >= now() + 3500);
    assert_eq!(store.persist_count(), 1);
}

#[tokio::test]
async fn test_client_credentials_fetch_when_absent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(header("authorization", basic_header("client", "secret").as_str()))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string_contains("grant_type=client_credentials"))
        .respond_with(token_response("fresh"))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(RecordingStore::default());
    let auth = Authenticator::OAuth2(OAuth2Authenticator::client_credentials(
        credentials(&server, store.clone()),
        reqwest::Client::new(),
    ));

    let request = auth.apply(get("https://api.acme.com/")).await.unwrap();
    assert_eq!(authorization(&request), "Bearer fresh");
    assert_eq!(store.persist_count(), 1);
    assert_eq!(
        store.get().await.unwrap().unwrap().access_token(),
        "fresh"
    );

    // Second request reuses the cached token
    let request = auth.apply(get("https://api.acme.com/")).await.unwrap();
    assert_eq!(authorization(&request), "Bearer fresh");
    assert_eq!(store.persist_count(), 1);
}

#[tokio::test]
async fn test_client_credentials_sends_comma_joined_scopes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains("scope=read%2Cwrite"))
        .respond_with(token_response("scoped"))
        .expect(1)
        .mount(&server)
        .await;

    let oauth = credentials(&server, Arc::new(MemoryTokenStore::new()))
        .with_scopes(["read", "write"]);
    let oauth = OAuth2Authenticator::client_credentials(oauth, reqwest::Client::new());

    let token = oauth.fetch_access_token_by_client_credentials().await.unwrap();
    assert_eq!(token.access_token(), "scoped");
}

#[tokio::test]
async fn test_authorization_code_without_token_fails() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(token_response("unused"))
        .expect(0)
        .mount(&server)
        .await;

    let auth = Authenticator::OAuth2(OAuth2Authenticator::authorization_code(
        credentials(&server, Arc::new(MemoryTokenStore::new())),
        reqwest::Client::new(),
    ));

    let err = auth.apply(get("https://api.acme.com/")).await.unwrap_err();
    assert!(matches!(err, Error::FoundNoAccessToken));
    assert!(err.is_auth_error());
}

#[tokio::test]
async fn test_token_endpoint_rejection_is_not_persisted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(RecordingStore::default());
    let oauth = OAuth2Authenticator::client_credentials(
        credentials(&server, store.clone()),
        reqwest::Client::new(),
    );

    let err = oauth.access_token().await.unwrap_err();
    assert!(matches!(
        err,
        Error::InvalidAccessToken {
            status: Some(401),
            ..
        }
    ));
    assert_eq!(err.status(), Some(401));
    assert!(err.to_string().contains("401"));
    assert_eq!(store.persist_count(), 0);
    assert!(store.get().await.unwrap().is_none());
}

#[tokio::test]
async fn test_incomplete_token_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"access_token": "x"})),
        )
        .mount(&server)
        .await;

    let store = Arc::new(RecordingStore::default());
    let oauth = OAuth2Authenticator::client_credentials(
        credentials(&server, store.clone()),
        reqwest::Client::new(),
    );

    let err = oauth.access_token().await.unwrap_err();
    assert!(matches!(err, Error::InvalidAccessToken { status: None, .. }));
    assert_eq!(store.persist_count(), 0);
}

#[tokio::test]
async fn test_non_json_token_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let oauth = OAuth2Authenticator::client_credentials(
        credentials(&server, Arc::new(MemoryTokenStore::new())),
        reqwest::Client::new(),
    );

    let err = oauth.access_token().await.unwrap_err();
    assert!(matches!(err, Error::InvalidAccessToken { .. }));
}

#[tokio::test]
async fn test_transport_failure() {
    let oauth = OAuth2Credentials::new(
        "client",
        "secret",
        "http://127.0.0.1:1/token",
        "http://127.0.0.1:1/authorize",
    );
    let oauth = OAuth2Authenticator::client_credentials(oauth, reqwest::Client::new());

    let err = oauth.access_token().await.unwrap_err();
    assert!(matches!(err, Error::AccessTokenRequest(_)));
}

#[tokio::test]
async fn test_concurrent_requests_share_one_exchange() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(token_response("shared"))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(RecordingStore::default());
    let auth = Authenticator::OAuth2(OAuth2Authenticator::client_credentials(
        credentials(&server, store.clone()),
        reqwest::Client::new(),
    ));

    let (a, b) = tokio::join!(
        auth.apply(get("https://api.acme.com/a")),
        auth.apply(get("https://api.acme.com/b"))
    );
    assert_eq!(authorization(&a.unwrap()), "Bearer shared");
    assert_eq!(authorization(&b.unwrap()), "Bearer shared");
    assert_eq!(store.persist_count(), 1);
}

#[tokio::test]
async fn test_expired_client_credentials_token_without_refresh_is_refetched() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains("grant_type=client_credentials"))
        .respond_with(token_response("renewed"))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(RecordingStore::with_token(AccessToken::new(
        "old",
        "bearer",
        now() - 60,
        "",
        "",
    )));
    let oauth = OAuth2Authenticator::client_credentials(
        credentials(&server, store.clone()),
        reqwest::Client::new(),
    );

    assert_eq!(oauth.access_token().await.unwrap(), "renewed");
    assert_eq!(store.persist_count(), 1);
}

#[tokio::test]
async fn test_stale_token_without_refresh_is_used_as_is() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(token_response("unused"))
        .expect(0)
        .mount(&server)
        .await;

    let store = Arc::new(RecordingStore::with_token(AccessToken::new(
        "almost",
        "bearer",
        now() + 60,
        "",
        "",
    )));
    let oauth = OAuth2Authenticator::authorization_code(
        credentials(&server, store.clone()),
        reqwest::Client::new(),
    );

    assert_eq!(oauth.access_token().await.unwrap(), "almost");
    assert_eq!(store.persist_count(), 0);
}

#[tokio::test]
async fn test_automatic_refresh_disabled() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(token_response("unused"))
        .expect(0)
        .mount(&server)
        .await;

    let store = Arc::new(RecordingStore::with_token(AccessToken::new(
        "stale",
        "bearer",
        now() - 10,
        "rt",
        "",
    )));
    let oauth = OAuth2Authenticator::authorization_code(
        credentials(&server, store),
        reqwest::Client::new(),
    );

    let token = oauth
        .get_access_token(false, EXPIRE_THRESHOLD)
        .await
        .unwrap();
    assert_eq!(token, "stale");
}

#[tokio::test]
async fn test_custom_threshold() {
    let store = Arc::new(MemoryTokenStore::with_token(AccessToken::new(
        "short",
        "bearer",
        now() + 120,
        "",
        "",
    )));
    let oauth = OAuth2Credentials::new("id", "secret", "http://127.0.0.1:1/token", "")
        .with_token_store(store);
    let oauth = OAuth2Authenticator::authorization_code(oauth, reqwest::Client::new());

    // Valid under a 60 second threshold, no exchange attempted
    assert_eq!(oauth.get_access_token(true, 60).await.unwrap(), "short");
}

#[tokio::test]
async fn test_huge_threshold_treats_token_as_stale() {
    let store = Arc::new(MemoryTokenStore::with_token(AccessToken::new(
        "cached",
        "bearer",
        now() + 3600,
        "",
        "",
    )));
    let oauth = OAuth2Credentials::new("id", "secret", "http://127.0.0.1:1/token", "")
        .with_token_store(store);
    let oauth = OAuth2Authenticator::authorization_code(oauth, reqwest::Client::new());

    assert_eq!(oauth.get_access_token(false, i64::MAX).await.unwrap(), "cached");
}

#[tokio::test]
async fn test_remove_token() {
    let store = Arc::new(MemoryTokenStore::with_token(AccessToken::new(
        "t",
        "bearer",
        now() + 3600,
        "",
        "",
    )));
    let oauth = OAuth2Credentials::new("id", "secret", "https://a/token", "")
        .with_token_store(store.clone());
    let oauth = OAuth2Authenticator::authorization_code(oauth, reqwest::Client::new());

    oauth.remove_token().await.unwrap();
    assert!(store.get().await.unwrap().is_none());
}

// ============================================================================
// Authorization code flow
// ============================================================================

#[test]
fn test_build_redirect_url() {
    let oauth = OAuth2Credentials::new(
        "client",
        "secret",
        "https://auth.acme.com/token",
        "https://auth.acme.com/authorize?existing=1&client_id=stale",
    )
    .with_scopes(["profile"]);
    let oauth = OAuth2Authenticator::authorization_code(oauth, reqwest::Client::new());

    let scopes = vec!["read".to_string(), "write".to_string()];
    let url = oauth
        .build_redirect_url(
            Some("https://app.acme.com/callback"),
            Some(&scopes),
            Some("xyz"),
        )
        .unwrap();

    let url = url::Url::parse(&url).unwrap();
    assert_eq!(url.host_str(), Some("auth.acme.com"));
    assert_eq!(url.path(), "/authorize");

    let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    let find = |key: &str| {
        pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    };
    assert_eq!(find("existing"), Some("1"));
    assert_eq!(find("client_id"), Some("client"));
    assert_eq!(find("response_type"), Some("code"));
    assert_eq!(find("redirect_uri"), Some("https://app.acme.com/callback"));
    assert_eq!(find("scope"), Some("read,write"));
    assert_eq!(find("state"), Some("xyz"));
    assert_eq!(pairs.iter().filter(|(k, _)| k == "client_id").count(), 1);
}

#[test]
fn test_build_redirect_url_defaults() {
    let oauth = OAuth2Credentials::new(
        "client",
        "secret",
        "https://auth.acme.com/token",
        "https://auth.acme.com/authorize",
    )
    .with_scopes(["profile", "email"]);
    let oauth = OAuth2Authenticator::authorization_code(oauth, reqwest::Client::new());

    let url = oauth.build_redirect_url(None, None, None).unwrap();
    let url = url::Url::parse(&url).unwrap();
    let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();

    assert!(pairs.contains(&("scope".to_string(), "profile,email".to_string())));
    assert!(!pairs.iter().any(|(k, _)| k == "redirect_uri" || k == "state"));
}

#[test]
fn test_build_redirect_url_requires_authorization_code() {
    let oauth = OAuth2Credentials::new("id", "secret", "https://a/token", "https://a/auth");
    let oauth = OAuth2Authenticator::client_credentials(oauth, reqwest::Client::new());

    let err = oauth.build_redirect_url(None, None, None).unwrap_err();
    assert!(matches!(err, Error::InvalidCredentials { .. }));
}

#[tokio::test]
async fn test_fetch_by_code_requires_authorization_code() {
    let oauth = OAuth2Credentials::new("id", "secret", "http://127.0.0.1:1/token", "");
    let oauth = OAuth2Authenticator::client_credentials(oauth, reqwest::Client::new());

    let err = oauth.fetch_access_token_by_code("code").await.unwrap_err();
    assert!(matches!(err, Error::InvalidCredentials { .. }));
}

#[tokio::test]
async fn test_fetch_by_code_then_apply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=abc"))
        .respond_with(token_response("from-code"))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(RecordingStore::default());
    let auth = Authenticator::OAuth2(OAuth2Authenticator::authorization_code(
        credentials(&server, store.clone()),
        reqwest::Client::new(),
    ));

    let oauth = auth.as_oauth2().unwrap();
    let state = oauth.generate_state().unwrap();
    let token = oauth
        .fetch_access_token_by_code_with_state("abc", &state)
        .await
        .unwrap();
    assert_eq!(token.access_token(), "from-code");

    let request = auth.apply(get("https://api.acme.com/")).await.unwrap();
    assert_eq!(authorization(&request), "Bearer from-code");
    assert_eq!(store.persist_count(), 1);
}

#[tokio::test]
async fn test_state_mismatch_makes_no_exchange() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(token_response("unused"))
        .expect(0)
        .mount(&server)
        .await;

    let oauth = OAuth2Authenticator::authorization_code(
        credentials(&server, Arc::new(MemoryTokenStore::new())),
        reqwest::Client::new(),
    );

    let forged = issue_state("another-secret", now()).unwrap();
    let err = oauth
        .fetch_access_token_by_code_with_state("abc", &forged)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidState { .. }));

    let err = oauth
        .fetch_access_token_by_code_with_state("abc", "not-a-jwt")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidState { .. }));
}
