//! In-process fetcher answering from a fixed route table.
//!
//! Useful for hosts that bundle their assets and for exercising the worker
//! without a network. Every call is recorded so callers can assert how many
//! requests actually left the cache.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, HeaderValue, StatusCode};
use tracing::{debug, trace};

use crate::{Fetcher, NetError, Request, Response};

/// What a route answers with.
#[derive(Debug, Clone)]
pub enum RouteAction {
    /// Respond with the given status, headers and body.
    Respond {
        status: StatusCode,
        headers: HeaderMap,
        body: Bytes,
    },
    /// Fail at the transport level.
    Fail(String),
}

/// Fetcher serving canned responses keyed by exact URL.
#[derive(Debug, Default)]
pub struct StaticFetcher {
    routes: HashMap<String, RouteAction>,
    calls: Mutex<Vec<String>>,
}

impl StaticFetcher {
    /// Create an empty fetcher. Unrouted URLs fail.
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `url` with a 200 and `body`.
    pub fn route(self, url: &str, body: impl Into<Bytes>) -> Self {
        self.route_with_status(url, StatusCode::OK, body)
    }

    /// Answer `url` with `status` and `body`.
    pub fn route_with_status(self, url: &str, status: StatusCode, body: impl Into<Bytes>) -> Self {
        self.route_with_headers(url, status, HeaderMap::new(), body)
    }

    /// Answer `url` with a 200, a content type and `body`.
    pub fn route_typed(self, url: &str, content_type: &'static str, body: impl Into<Bytes>) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(http::header::CONTENT_TYPE, HeaderValue::from_static(content_type));
        self.route_with_headers(url, StatusCode::OK, headers, body)
    }

    /// Answer `url` with `status`, `headers` and `body`.
    pub fn route_with_headers(
        mut self,
        url: &str,
        status: StatusCode,
        headers: HeaderMap,
        body: impl Into<Bytes>,
    ) -> Self {
        self.routes.insert(
            url.to_string(),
            RouteAction::Respond {
                status,
                headers,
                body: body.into(),
            },
        );
        self
    }

    /// Make `url` fail with a transport error.
    pub fn fail(mut self, url: &str, message: &str) -> Self {
        self.routes
            .insert(url.to_string(), RouteAction::Fail(message.to_string()));
        self
    }

    /// Number of requests made for `url`.
    pub fn calls(&self, url: &str) -> usize {
        self.log().iter().filter(|u| u.as_str() == url).count()
    }

    /// Total number of requests made.
    pub fn total_calls(&self) -> usize {
        self.log().len()
    }

    fn log(&self) -> std::sync::MutexGuard<'_, Vec<String>> {
        // A poisoned log is still a valid list of URLs.
        self.calls.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl Fetcher for StaticFetcher {
    async fn fetch(&self, request: &Request) -> Result<Response, NetError> {
        let url = request.url.as_str();
        trace!(url, "Static fetch");
        self.log().push(url.to_string());

        match self.routes.get(url) {
            Some(RouteAction::Respond {
                status,
                headers,
                body,
            }) => Ok(Response::from_parts(
                request.id,
                request.url.clone(),
                *status,
                headers.clone(),
                body.clone(),
            )),
            Some(RouteAction::Fail(message)) => {
                debug!(url, message = %message, "Static route configured to fail");
                Err(NetError::RequestFailed(message.clone()))
            }
            None => Err(NetError::RequestFailed(format!("no route for {url}"))),
        }
    }
}
