//! Injected HTTP transport
//!
//! Everything in this crate that touches the network goes through
//! [`HttpFetch`]. [`ReqwestTransport`] is the default implementation.

use crate::error::LinkError;
use crate::types::HttpMethod;
use crate::DEFAULT_USER_AGENT;
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, USER_AGENT};
use std::time::Duration;
use tracing::{error, warn};

/// Binary content type prefixes
const BINARY_PREFIXES: &[&str] = &[
    "image/",
    "audio/",
    "video/",
    "application/octet-stream",
    "application/pdf",
    "application/zip",
    "application/gzip",
    "font/",
];

/// Connect + first response byte timeout
const FIRST_BYTE_TIMEOUT: Duration = Duration::from_secs(10);

/// Body timeout (total)
const BODY_TIMEOUT: Duration = Duration::from_secs(30);

/// Per-request options
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub method: HttpMethod,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
    /// Overrides the transport's body timeout
    pub timeout: Option<Duration>,
}

impl RequestOptions {
    pub fn get() -> Self {
        Self::default()
    }

    /// POST with a JSON body
    pub fn post_json(body: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Post,
            body: Some(body.into()),
            ..Default::default()
        }
        .header("content-type", "application/json")
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Raw HTTP response
#[derive(Debug, Clone, Default)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// True if the body timed out and only partial content was read
    pub truncated: bool,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }

    /// Body decoded as UTF-8, replacing invalid sequences
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }
}

/// HTTP capability injected into providers and orchestrators
#[async_trait]
pub trait HttpFetch: Send + Sync {
    async fn fetch(&self, url: &str, options: &RequestOptions) -> Result<HttpResponse, LinkError>;
}

/// Default transport backed by reqwest
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    first_byte_timeout: Duration,
    body_timeout: Duration,
}

impl ReqwestTransport {
    /// Create a transport with the default User-Agent
    pub fn new() -> Result<Self, LinkError> {
        Self::with_user_agent(DEFAULT_USER_AGENT)
    }

    pub fn with_user_agent(user_agent: &str) -> Result<Self, LinkError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(user_agent)
                .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_USER_AGENT)),
        );
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html, application/xhtml+xml, text/plain, */*;q=0.8"),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(FIRST_BYTE_TIMEOUT)
            .build()
            .map_err(LinkError::ClientBuildError)?;

        Ok(Self {
            client,
            first_byte_timeout: FIRST_BYTE_TIMEOUT,
            body_timeout: BODY_TIMEOUT,
        })
    }

    /// Set the deadline for connecting and receiving response headers
    pub fn first_byte_timeout(mut self, timeout: Duration) -> Self {
        self.first_byte_timeout = timeout;
        self
    }

    /// Set the total body timeout
    pub fn body_timeout(mut self, timeout: Duration) -> Self {
        self.body_timeout = timeout;
        self
    }
}

#[async_trait]
impl HttpFetch for ReqwestTransport {
    async fn fetch(&self, url: &str, options: &RequestOptions) -> Result<HttpResponse, LinkError> {
        let method = match options.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
        };

        let mut request = self.client.request(method, url);
        for (name, value) in &options.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| LinkError::RequestError(e.to_string()))?;
            let value =
                HeaderValue::from_str(value).map_err(|e| LinkError::RequestError(e.to_string()))?;
            request = request.header(name, value);
        }
        if let Some(body) = &options.body {
            request = request.body(body.clone());
        }

        let response = match tokio::time::timeout(self.first_byte_timeout, request.send()).await {
            Ok(result) => result.map_err(LinkError::from_reqwest)?,
            Err(_) => {
                warn!(url = %url, "No response before first byte timeout");
                return Err(LinkError::Timeout);
            }
        };
        let status = response.status().as_u16();
        let headers = response.headers().clone();

        let timeout = options.timeout.unwrap_or(self.body_timeout);
        let (body, truncated) = read_body_with_timeout(response, timeout).await;

        Ok(HttpResponse {
            status,
            headers,
            body,
            truncated,
        })
    }
}

/// Check if content type indicates binary content
pub fn is_binary_content_type(content_type: &str) -> bool {
    let ct_lower = content_type.to_lowercase();
    BINARY_PREFIXES
        .iter()
        .any(|prefix| ct_lower.starts_with(prefix))
}

/// Read response body with timeout, returning partial content if timeout occurs
async fn read_body_with_timeout(response: reqwest::Response, timeout: Duration) -> (Bytes, bool) {
    let mut body = Vec::new();
    let mut stream = response.bytes_stream();
    let deadline = tokio::time::Instant::now() + timeout;

    loop {
        let chunk_future = stream.next();
        let timeout_future = tokio::time::sleep_until(deadline);

        tokio::select! {
            chunk = chunk_future => {
                match chunk {
                    Some(Ok(bytes)) => {
                        body.extend_from_slice(&bytes);
                    }
                    Some(Err(e)) => {
                        error!("Error reading body chunk: {}", e);
                        let has_content = !body.is_empty();
                        return (Bytes::from(body), has_content);
                    }
                    None => {
                        return (Bytes::from(body), false);
                    }
                }
            }
            _ = timeout_future => {
                warn!("Body timeout reached, returning partial content");
                return (Bytes::from(body), true);
            }
        }
    }
}
