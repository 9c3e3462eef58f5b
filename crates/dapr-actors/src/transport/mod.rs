//! # Transport
//!
//! The only capability the interactor needs from the network: deliver one
//! addressed request and hand back the status and body. `HttpTransport`
//! implements it on top of reqwest; tests plug in their own.

mod http;

pub use http::{HttpTransport, API_TOKEN_HEADER};

use bytes::Bytes;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Put,
    Delete,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HttpMethod::Get => "GET",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

/// A request addressed to the sidecar.
///
/// `path` holds unescaped segments; escaping is the transport's job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportRequest {
    pub method: HttpMethod,
    pub path: Vec<String>,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl TransportRequest {
    pub fn new(method: HttpMethod, path: Vec<String>) -> Self {
        Self {
            method,
            path,
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(header, _)| header.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Unescaped path, for logging and assertions
    pub fn path_string(&self) -> String {
        format!("/{}", self.path.join("/"))
    }

    /// First segment that a URL would collapse instead of sending as-is
    pub fn dot_segment(&self) -> Option<&str> {
        self.path
            .iter()
            .map(String::as_str)
            .find(|segment| is_dot_segment(segment))
    }
}

/// `.` and `..` cannot travel as path segments: URL normalization removes
/// them, even when percent-encoded, and the request lands on another resource.
pub fn is_dot_segment(segment: &str) -> bool {
    matches!(segment, "." | "..")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Bytes,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Failures below the status-code level: the exchange did not complete
#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("Invalid sidecar endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("{method} {path} failed")]
    Request {
        method: HttpMethod,
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Path {path} has a '.' or '..' segment and cannot be addressed")]
    UnroutablePath { path: String },

    #[error("Transport closed before a response arrived")]
    Closed,
}

pub type TransportFuture =
    Pin<Box<dyn Future<Output = Result<TransportResponse, ConnectionError>> + Send>>;

/// Sends requests to the sidecar.
///
/// Dropping the returned future abandons the exchange; the interactor relies
/// on this for cancellation.
#[cfg_attr(test, mockall::automock)]
pub trait Transport: Send + Sync {
    fn send(&self, request: TransportRequest) -> TransportFuture;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let request = TransportRequest::new(
            HttpMethod::Put,
            vec!["v1.0".to_string(), "actors".to_string()],
        )
        .with_header("Content-Type", "application/json")
        .with_body("[]");

        assert_eq!(request.path_string(), "/v1.0/actors");
        assert_eq!(request.header("content-type"), Some("application/json"));
        assert_eq!(request.header("X-DaprRemoting"), None);
        assert_eq!(request.body, Bytes::from_static(b"[]"));
        assert_eq!(request.method.to_string(), "PUT");
    }

    #[test]
    fn test_dot_segments() {
        let request = TransportRequest::new(
            HttpMethod::Get,
            vec!["v1.0".to_string(), "..".to_string(), "state".to_string()],
        );
        assert_eq!(request.dot_segment(), Some(".."));
        assert!(is_dot_segment("."));
        assert!(!is_dot_segment("..."));
        assert!(!is_dot_segment(".a"));
        assert_eq!(
            TransportRequest::new(HttpMethod::Get, vec!["v1.0".to_string()]).dot_segment(),
            None
        );
    }

    #[test]
    fn test_success_range() {
        assert!(TransportResponse::new(200, "").is_success());
        assert!(TransportResponse::new(204, "").is_success());
        assert!(!TransportResponse::new(199, "").is_success());
        assert!(!TransportResponse::new(406, "").is_success());
    }
}
