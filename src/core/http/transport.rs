use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::Method;
use serde_json::Value;
use tracing::debug;

use crate::core::sse::is_event_stream_content_type;
use crate::utils::url::{construct_api_url, normalize_base_url};

#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl HttpRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn json(status: u16, value: Value) -> Self {
        Self::new(status, value.to_string())
    }

    pub fn no_content() -> Self {
        Self::new(204, Vec::new())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// A failure below HTTP: nothing came back from the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportError(pub String);

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for TransportError {}

pub type EventByteStream = BoxStream<'static, Result<Vec<u8>, TransportError>>;

pub enum EventStreamResponse {
    Stream(EventByteStream),
    /// The server answered the subscribe call with something other than an
    /// event stream.
    Rejected(HttpResponse),
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;

    async fn open_event_stream(&self, path: &str) -> Result<EventStreamResponse, TransportError>;
}

/// Production transport: every request carries the cookie jar's credentials
/// and JSON content headers.
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: String,
    jar: Arc<Jar>,
}

impl ReqwestTransport {
    pub fn new(base_url: &str) -> Result<Self, TransportError> {
        Self::with_jar(base_url, Arc::new(Jar::default()))
    }

    pub fn with_jar(base_url: &str, jar: Arc<Jar>) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .cookie_provider(Arc::clone(&jar))
            .build()
            .map_err(|err| TransportError(err.to_string()))?;
        Ok(Self {
            client,
            base_url: normalize_base_url(base_url),
            jar,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Seeds the jar from a `name=value; name2=value2` cookie header.
    pub fn import_cookie_header(&self, header: &str) -> Result<(), TransportError> {
        let url = self.origin_url()?;
        for pair in header.split(';').map(str::trim).filter(|pair| !pair.is_empty()) {
            self.jar.add_cookie_str(pair, &url);
        }
        Ok(())
    }

    /// Cookie header currently held for the API origin, if any.
    pub fn export_cookie_header(&self) -> Option<String> {
        let url = self.origin_url().ok()?;
        self.jar
            .cookies(&url)
            .and_then(|value: HeaderValue| value.to_str().ok().map(str::to_string))
    }

    fn origin_url(&self) -> Result<reqwest::Url, TransportError> {
        reqwest::Url::parse(&construct_api_url(&self.base_url, ""))
            .map_err(|err| TransportError(format!("invalid API url '{}': {err}", self.base_url)))
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = construct_api_url(&self.base_url, &request.path);
        debug!(method = %request.method, url = %url, "Sending API request");

        let mut builder = self
            .client
            .request(request.method, url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json");
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = request.body {
            builder = builder.body(body.to_string());
        }

        let response = builder
            .send()
            .await
            .map_err(|err| TransportError(err.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|err| TransportError(err.to_string()))?;
        Ok(HttpResponse::new(status, body.to_vec()))
    }

    async fn open_event_stream(&self, path: &str) -> Result<EventStreamResponse, TransportError> {
        let url = construct_api_url(&self.base_url, path);
        debug!(url = %url, "Opening event stream");

        let response = self
            .client
            .get(url)
            .header(ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(|err| TransportError(err.to_string()))?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("")
            .to_string();

        if !response.status().is_success() || !is_event_stream_content_type(&content_type) {
            let body = response.bytes().await.unwrap_or_default();
            return Ok(EventStreamResponse::Rejected(HttpResponse::new(
                status,
                body.to_vec(),
            )));
        }

        let stream = response
            .bytes_stream()
            .map(|chunk| {
                chunk
                    .map(|bytes| bytes.to_vec())
                    .map_err(|err| TransportError(err.to_string()))
            })
            .boxed();
        Ok(EventStreamResponse::Stream(stream))
    }
}
