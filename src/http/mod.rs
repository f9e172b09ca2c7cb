//! HTTP client module
//!
//! Builds the outbound request pipeline used by generated clients.
//!
//! # Features
//!
//! - **Authentication**: the configured `Authenticator` runs first
//! - **Default Headers**: `User-Agent` and `Accept: application/json`, never overriding
//! - **Injectable Transport**: any `reqwest::Client`, timeouts passed through

mod client;

pub use client::{
    DefaultHeaders, HttpClient, HttpClientFactory, Pipeline, RequestTransform, USER_AGENT,
};
