use reqwest::Method;
use tracing::{debug, error};
use url::Url;

use super::{ConnectionError, HttpMethod, Transport, TransportFuture, TransportRequest, TransportResponse};
use crate::config::SidecarConfig;

/// Header carrying the sidecar API token
pub const API_TOKEN_HEADER: &str = "dapr-api-token";

impl From<HttpMethod> for Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Delete => Method::DELETE,
        }
    }
}

/// Transport that talks to the sidecar's HTTP API
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: Url,
    api_token: Option<String>,
}

impl HttpTransport {
    /// Create a transport for the endpoint and token in `config`
    pub fn new(config: &SidecarConfig) -> Result<Self, ConnectionError> {
        Self::with_client(reqwest::Client::new(), config)
    }

    /// Create a transport sharing an existing reqwest client (and its pool)
    pub fn with_client(
        client: reqwest::Client,
        config: &SidecarConfig,
    ) -> Result<Self, ConnectionError> {
        let endpoint =
            Url::parse(&config.http_endpoint).map_err(|e| ConnectionError::InvalidEndpoint {
                endpoint: config.http_endpoint.clone(),
                reason: e.to_string(),
            })?;

        if endpoint.cannot_be_a_base() {
            return Err(ConnectionError::InvalidEndpoint {
                endpoint: config.http_endpoint.clone(),
                reason: "endpoint cannot carry a path".to_string(),
            });
        }

        Ok(Self {
            client,
            endpoint,
            api_token: config.api_token.clone(),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Full URL for a request path, escaping each segment.
    /// `.` and `..` segments are dropped by the URL; `send` refuses them.
    pub fn url_for(&self, path: &[String]) -> Url {
        let mut url = self.endpoint.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(path);
        }
        url
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: TransportRequest) -> TransportFuture {
        if request.dot_segment().is_some() {
            let path = request.path_string();
            return Box::pin(async move { Err(ConnectionError::UnroutablePath { path }) });
        }

        let client = self.client.clone();
        let url = self.url_for(&request.path);
        let api_token = self.api_token.clone();

        Box::pin(async move {
            let TransportRequest {
                method,
                path,
                headers,
                body,
            } = request;

            debug!("{} {}", method, url);

            let mut builder = client.request(method.into(), url);
            for (name, value) in &headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
            if let Some(token) = api_token {
                builder = builder.header(API_TOKEN_HEADER, token);
            }

            let request_failed = |e: reqwest::Error| {
                error!("Request to sidecar failed: {}", e);
                ConnectionError::Request {
                    method,
                    path: format!("/{}", path.join("/")),
                    source: Box::new(e),
                }
            };

            let response = builder.body(body).send().await.map_err(request_failed)?;
            let status = response.status().as_u16();
            let body = response.bytes().await.map_err(request_failed)?;

            Ok(TransportResponse { status, body })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(endpoint: &str) -> SidecarConfig {
        SidecarConfig {
            http_endpoint: endpoint.to_string(),
            ..SidecarConfig::default()
        }
    }

    #[test]
    fn test_url_escapes_segments() {
        let transport = HttpTransport::new(&config("http://localhost:3500")).unwrap();
        let path = vec![
            "v1.0".to_string(),
            "actors".to_string(),
            "DemoActor".to_string(),
            "a b/c".to_string(),
            "state".to_string(),
        ];

        assert_eq!(
            transport.url_for(&path).as_str(),
            "http://localhost:3500/v1.0/actors/DemoActor/a%20b%2Fc/state"
        );
    }

    #[tokio::test]
    async fn test_dot_segments_are_not_sent() {
        let transport = HttpTransport::new(&config("http://127.0.0.1:9")).unwrap();
        for segment in [".", ".."] {
            let request = TransportRequest::new(
                HttpMethod::Get,
                vec![
                    "v1.0".to_string(),
                    "actors".to_string(),
                    "DemoActor".to_string(),
                    "abc".to_string(),
                    "state".to_string(),
                    segment.to_string(),
                ],
            );
            let result = transport.send(request).await;
            assert!(matches!(
                result,
                Err(ConnectionError::UnroutablePath { path }) if path.ends_with(segment)
            ));
        }
    }

    #[test]
    fn test_endpoint_with_base_path() {
        let transport = HttpTransport::new(&config("http://sidecar:3500/proxy/")).unwrap();
        let url = transport.url_for(&["v1.0".to_string()]);
        assert_eq!(url.as_str(), "http://sidecar:3500/proxy/v1.0");
    }

    #[test]
    fn test_invalid_endpoint() {
        assert!(matches!(
            HttpTransport::new(&config("not a url")),
            Err(ConnectionError::InvalidEndpoint { .. })
        ));
        assert!(matches!(
            HttpTransport::new(&config("mailto:actors@example.com")),
            Err(ConnectionError::InvalidEndpoint { .. })
        ));
    }
}
