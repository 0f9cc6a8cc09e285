// Copyright © 2025 Stephan Kunz

//! Outbound HTTP issuance for `Action` nodes.
//!
//! Unlike the storage layer, issuing the HTTP call itself is core (§4.C: the Bot
//! Interpreter "emits HTTP calls for action nodes"), so a real `reqwest`-backed
//! implementation is provided alongside the trait, not just the trait.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use super::error::Error;

/// A resolved HTTP request, after every template field has been evaluated against the
/// blackboard.
#[derive(Clone, Debug)]
pub struct HttpRequest {
    /// HTTP method, e.g. `"GET"`.
    pub method: String,
    /// Fully resolved URL.
    pub url: String,
    /// Resolved `(name, value)` header pairs.
    pub headers: Vec<(String, String)>,
    /// Resolved request body. Empty means "no body".
    pub body: Bytes,
    /// Per-action timeout. `None` means no explicit timeout is enforced.
    pub timeout: Option<Duration>,
}

/// The outcome of one outbound HTTP call.
#[derive(Clone, Debug)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: Vec<(String, String)>,
    /// Raw response body.
    pub body: Bytes,
}

/// Abstraction over the outbound HTTP transport, so the interpreter can be tested
/// against a fake without a real socket.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Issues `request`, returning the response or a transport-level failure.
    ///
    /// A non-2xx status is *not* an error at this layer — whether that counts as a
    /// failure is left to the action script, per §4.C's "configurable via the action
    /// script".
    async fn call(&self, request: HttpRequest) -> Result<HttpResponse, Error>;
}

/// Default [`HttpClient`], backed by `reqwest`.
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    /// Builds a client with `reqwest`'s default connector settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for ReqwestHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn call(&self, request: HttpRequest) -> Result<HttpResponse, Error> {
        let method = reqwest::Method::from_bytes(request.method.as_bytes())
            .map_err(|_| Error::InvalidMethod(request.method.clone().into()))?;
        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if !request.body.is_empty() {
            builder = builder.body(request.body.clone());
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await.map_err(|err| {
            if err.is_timeout() {
                Error::Timeout
            } else {
                Error::Transport(err.to_string().into())
            }
        })?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_str().unwrap_or_default().to_string()))
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|err| Error::Transport(err.to_string().into()))?;

        Ok(HttpResponse { status, headers, body })
    }
}
