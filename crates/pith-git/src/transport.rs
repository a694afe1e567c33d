//! HTTP transport used by ref negotiation.

use crate::{GitError, Result};
use std::io::Read;
use std::time::Duration;

/// A response whose body is consumed as a stream.
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Media type of the body, without parameters.
    pub content_type: Option<String>,
    /// Response body.
    pub body: Box<dyn Read + Send>,
}

impl std::fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpResponse")
            .field("status", &self.status)
            .field("content_type", &self.content_type)
            .finish_non_exhaustive()
    }
}

/// The two requests of a smart HTTP fetch.
pub trait Transport {
    /// Issues a GET request.
    fn get(&self, url: &str) -> Result<HttpResponse>;

    /// Issues a POST request with the given body.
    fn post(&self, url: &str, content_type: &str, body: Vec<u8>) -> Result<HttpResponse>;
}

/// Blocking HTTP transport backed by reqwest.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    /// Creates a transport. `timeout` of `None` waits on the peer indefinitely.
    pub fn new(user_agent: &str, timeout: Option<Duration>) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| GitError::Fetch(e.to_string()))?;
        Ok(Self { client })
    }

    fn into_response(response: reqwest::blocking::Response) -> HttpResponse {
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(media_type);

        HttpResponse {
            status: response.status().as_u16(),
            content_type,
            body: Box::new(response),
        }
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str) -> Result<HttpResponse> {
        tracing::debug!(url = %url, "GET");
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| GitError::Fetch(format!("GET {url}: {e}")))?;
        Ok(Self::into_response(response))
    }

    fn post(&self, url: &str, content_type: &str, body: Vec<u8>) -> Result<HttpResponse> {
        tracing::debug!(url = %url, bytes = body.len(), "POST");
        let response = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(body)
            .send()
            .map_err(|e| GitError::Fetch(format!("POST {url}: {e}")))?;
        Ok(Self::into_response(response))
    }
}

/// Strips parameters such as `; charset=utf-8` from a content type.
fn media_type(value: &str) -> String {
    value
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}
