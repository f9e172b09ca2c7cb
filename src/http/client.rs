//! Outbound request pipeline
//!
//! Every request runs through an ordered list of transforms fixed at
//! construction time: authenticate first, then fill in default headers.
//! The default headers stage never overrides a header an earlier stage or
//! the caller has set.

use crate::auth::Authenticator;
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderName, HeaderValue, ACCEPT, USER_AGENT as USER_AGENT_HEADER};
use reqwest::{Client, Method, Request, RequestBuilder, Response};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// User agent sent by every client
pub const USER_AGENT: &str = concat!("sdk-runtime/", env!("CARGO_PKG_VERSION"));

/// One stage of the outbound pipeline
#[async_trait]
pub trait RequestTransform: Send + Sync {
    /// Consume a request and return the transformed one
    async fn transform(&self, request: Request) -> Result<Request>;
}

#[async_trait]
impl RequestTransform for Authenticator {
    async fn transform(&self, request: Request) -> Result<Request> {
        self.apply(request).await
    }
}

/// Sets `User-Agent`, `Accept` and configured headers when absent
#[derive(Debug, Clone)]
pub struct DefaultHeaders {
    headers: Vec<(HeaderName, HeaderValue)>,
}

impl DefaultHeaders {
    /// `User-Agent: <user_agent>` and `Accept: application/json`
    pub fn new(user_agent: &str) -> Result<Self> {
        let user_agent = HeaderValue::from_str(user_agent)
            .map_err(|e| Error::invalid_header(USER_AGENT_HEADER.as_str(), e))?;
        Ok(Self {
            headers: vec![
                (USER_AGENT_HEADER, user_agent),
                (ACCEPT, HeaderValue::from_static("application/json")),
            ],
        })
    }

    /// Add another default header
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self> {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| Error::invalid_header(name, e))?;
        let header_value =
            HeaderValue::from_str(value).map_err(|e| Error::invalid_header(name, e))?;
        self.headers.push((header_name, header_value));
        Ok(self)
    }
}

#[async_trait]
impl RequestTransform for DefaultHeaders {
    async fn transform(&self, mut request: Request) -> Result<Request> {
        let headers = request.headers_mut();
        for (name, value) in &self.headers {
            if !headers.contains_key(name) {
                headers.insert(name.clone(), value.clone());
            }
        }
        Ok(request)
    }
}

/// Ordered, immutable list of request transforms
#[derive(Clone, Default)]
pub struct Pipeline {
    stages: Vec<Arc<dyn RequestTransform>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stage
    #[must_use]
    pub fn then(mut self, stage: Arc<dyn RequestTransform>) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Run every stage in order
    pub async fn apply(&self, mut request: Request) -> Result<Request> {
        for stage in &self.stages {
            request = stage.transform(request).await?;
        }
        Ok(request)
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stages.len())
            .finish()
    }
}

/// Wires an authenticator and the default headers into an [`HttpClient`]
pub struct HttpClientFactory {
    authenticator: Arc<Authenticator>,
    client: Option<Client>,
    user_agent: String,
    timeout: Option<Duration>,
    default_headers: HashMap<String, String>,
}

impl HttpClientFactory {
    pub fn new(authenticator: impl Into<Arc<Authenticator>>) -> Self {
        Self {
            authenticator: authenticator.into(),
            client: None,
            user_agent: USER_AGENT.to_string(),
            timeout: None,
            default_headers: HashMap::new(),
        }
    }

    /// Use an existing transport instead of building one
    #[must_use]
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Override the user agent
    #[must_use]
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = agent.into();
        self
    }

    /// Request timeout for a transport built by this factory
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Extra header added to every request unless already set
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.insert(key.into(), value.into());
        self
    }

    /// Build the client
    pub fn factory(self) -> Result<HttpClient> {
        let client = match self.client {
            Some(client) => client,
            None => {
                let mut builder = Client::builder();
                if let Some(timeout) = self.timeout {
                    builder = builder.timeout(timeout);
                }
                builder.build()?
            }
        };

        let mut defaults = DefaultHeaders::new(&self.user_agent)?;
        for (key, value) in &self.default_headers {
            defaults = defaults.with_header(key, value)?;
        }

        let pipeline = Pipeline::new()
            .then(self.authenticator.clone())
            .then(Arc::new(defaults));

        Ok(HttpClient {
            client,
            pipeline,
            authenticator: self.authenticator,
        })
    }
}

/// Transport plus the request pipeline
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    pipeline: Pipeline,
    authenticator: Arc<Authenticator>,
}

impl HttpClient {
    /// Start a request bound to the underlying transport
    pub fn request(&self, method: Method, url: impl reqwest::IntoUrl) -> RequestBuilder {
        self.client.request(method, url)
    }

    /// Run the pipeline over `request` and send it
    pub async fn execute(&self, request: Request) -> Result<Response> {
        let request = self.pipeline.apply(request).await?;
        debug!("Sending {} {}", request.method(), request.url());
        Ok(self.client.execute(request).await?)
    }

    /// Build and send a request started with [`Self::request`]
    pub async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        self.execute(builder.build()?).await
    }

    /// Run the pipeline without sending
    pub async fn prepare(&self, request: Request) -> Result<Request> {
        self.pipeline.apply(request).await
    }

    pub fn authenticator(&self) -> &Arc<Authenticator> {
        &self.authenticator
    }

    /// Get the underlying reqwest client
    pub fn inner(&self) -> &Client {
        &self.client
    }
}

impl fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClient")
            .field("pipeline", &self.pipeline)
            .field("authenticator", &self.authenticator)
            .finish_non_exhaustive()
    }
}
