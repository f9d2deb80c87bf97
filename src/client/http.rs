//! HTTP transport capability and its reqwest-based implementation.
//!
//! The session only needs "send this, give me the body text or an error".
//! Connection handling, TLS and timeouts live behind [`HttpTransport`].

use crate::config::{KeywardConfig, ServerEndpoint};
use crate::KeywardError;
use reqwest::blocking::Client;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use reqwest::Method;
use std::time::Duration;

/// HTTP method used by the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    /// No body.
    Get,
    /// JSON body.
    Post,
}

impl HttpMethod {
    /// `GET` for an empty body, `POST` otherwise.
    pub fn for_body(body: &str) -> Self {
        if body.is_empty() {
            HttpMethod::Get
        } else {
            HttpMethod::Post
        }
    }

    /// Method name as sent on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

/// One outbound request.
#[derive(Debug, Clone)]
pub struct HttpRequest<'a> {
    /// Target host.
    pub host: &'a str,
    /// Target port.
    pub port: u16,
    /// Use TLS.
    pub secure: bool,
    /// Absolute path, starting with `/`.
    pub path: &'a str,
    /// Method.
    pub method: HttpMethod,
    /// Extra headers.
    pub headers: Vec<(&'static str, &'static str)>,
    /// Body text; empty for `GET`.
    pub body: &'a str,
}

impl<'a> HttpRequest<'a> {
    /// Build a request against `endpoint`. An empty body means `GET`; a
    /// non-empty one means `POST` with `Content-Type: application/json`.
    pub fn to(endpoint: &'a ServerEndpoint, path: &'a str, body: &'a str) -> Self {
        let method = HttpMethod::for_body(body);
        let headers = match method {
            HttpMethod::Get => Vec::new(),
            HttpMethod::Post => vec![("Content-Type", "application/json")],
        };
        Self {
            host: &endpoint.host,
            port: endpoint.port,
            secure: endpoint.secure,
            path,
            method,
            headers,
            body,
        }
    }

    /// Full URL of the request.
    pub fn url(&self) -> String {
        let scheme = if self.secure { "https" } else { "http" };
        format!("{}://{}:{}{}", scheme, self.host, self.port, self.path)
    }
}

/// Capability that delivers a request and returns the raw response body.
///
/// Any HTTP status is a response; only failures to connect, send or
/// receive are errors.
pub trait HttpTransport: Send + Sync {
    /// Send the request.
    fn send(&self, request: &HttpRequest<'_>) -> Result<String, KeywardError>;
}

/// Blocking reqwest transport.
pub struct ReqwestTransport {
    client: Client,
    user_agent: String,
    timeout: Duration,
}

impl ReqwestTransport {
    /// Create a transport from config.
    pub fn new(config: &KeywardConfig) -> Result<Self, KeywardError> {
        Self::with_timeout(config, config.request_timeout)
    }

    /// Create a transport with an explicit timeout.
    pub fn with_timeout(config: &KeywardConfig, timeout: Duration) -> Result<Self, KeywardError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| KeywardError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            user_agent: build_user_agent(config),
            timeout,
        })
    }

    /// Configured timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl HttpTransport for ReqwestTransport {
    fn send(&self, request: &HttpRequest<'_>) -> Result<String, KeywardError> {
        let method = match request.method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
        };

        let mut builder = self
            .client
            .request(method, request.url())
            .header(USER_AGENT, &self.user_agent);
        for (name, value) in &request.headers {
            builder = builder.header(*name, *value);
        }
        if request.method == HttpMethod::Post {
            if !request.headers.iter().any(|(name, _)| name.eq_ignore_ascii_case("content-type")) {
                builder = builder.header(CONTENT_TYPE, "application/json");
            }
            builder = builder.body(request.body.to_string());
        }

        let response = builder
            .send()
            .map_err(|e| KeywardError::Transport(format!("Request failed: {}", e)))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .map_err(|e| KeywardError::Transport(format!("Failed to read body: {}", e)))?;

        tracing::debug!(
            method = request.method.as_str(),
            path = request.path,
            status,
            bytes = body.len(),
            "received response"
        );
        Ok(body)
    }
}

/// Build a User-Agent string from config.
///
/// Format: `<product>/keyward-<version> <app>`
pub fn build_user_agent(config: &KeywardConfig) -> String {
    format!(
        "{}/keyward-{} {}",
        config.user_agent_product,
        env!("CARGO_PKG_VERSION"),
        config.app_name
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint() -> ServerEndpoint {
        ServerEndpoint::parse("https://auth.example.com").unwrap()
    }

    #[test]
    fn empty_body_is_get_without_content_type() {
        let ep = endpoint();
        let req = HttpRequest::to(&ep, "/api/health", "");
        assert_eq!(req.method, HttpMethod::Get);
        assert!(req.headers.is_empty());
    }

    #[test]
    fn body_is_post_with_json_content_type() {
        let ep = endpoint();
        let req = HttpRequest::to(&ep, "/api/validate", "{}");
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.headers, vec![("Content-Type", "application/json")]);
    }

    #[test]
    fn url_includes_scheme_and_port() {
        let ep = ServerEndpoint::parse("http://localhost:3000").unwrap();
        let req = HttpRequest::to(&ep, "/api/health", "");
        assert_eq!(req.url(), "http://localhost:3000/api/health");
    }

    #[test]
    fn ipv6_url_keeps_brackets() {
        let ep = ServerEndpoint::parse("http://[::1]:3000").unwrap();
        let req = HttpRequest::to(&ep, "/api/health", "");
        assert_eq!(req.url(), "http://[::1]:3000/api/health");
    }

    #[test]
    fn user_agent_format() {
        let config = KeywardConfig {
            app_name: "myapp/2.0.0",
            user_agent_product: "myproduct",
            ..KeywardConfig::default()
        };
        assert_eq!(
            build_user_agent(&config),
            format!("myproduct/keyward-{} myapp/2.0.0", env!("CARGO_PKG_VERSION"))
        );
    }

    #[test]
    fn transport_creation() {
        let transport = ReqwestTransport::new(&KeywardConfig::default()).unwrap();
        assert_eq!(transport.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn unreachable_host_is_transport_error() {
        let transport =
            ReqwestTransport::with_timeout(&KeywardConfig::default(), Duration::from_millis(500))
                .unwrap();
        let ep = ServerEndpoint::parse("http://127.0.0.1:1").unwrap();
        let result = transport.send(&HttpRequest::to(&ep, "/api/health", ""));
        assert!(matches!(result, Err(KeywardError::Transport(_))));
    }
}
