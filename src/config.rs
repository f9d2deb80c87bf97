//! Keyward configuration.

use crate::KeywardError;
use std::time::Duration;

/// Default request timeout for calls to the validation service.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default timeout for the public address lookup.
pub const DEFAULT_ADDRESS_LOOKUP_TIMEOUT: Duration = Duration::from_secs(10);

/// Functions inspected by the hook heuristic when nothing else is configured.
#[cfg(unix)]
pub const DEFAULT_GUARDED_FUNCTIONS: &[&str] = &["connect", "send", "recv", "clock_gettime"];

/// Functions inspected by the hook heuristic when nothing else is configured.
#[cfg(windows)]
pub const DEFAULT_GUARDED_FUNCTIONS: &[&str] = &["GetSystemTimeAsFileTime", "GetTickCount64"];

/// Functions inspected by the hook heuristic when nothing else is configured.
#[cfg(not(any(unix, windows)))]
pub const DEFAULT_GUARDED_FUNCTIONS: &[&str] = &[];

/// Configuration for a validation session.
///
/// Like the service URL itself, these values are meant to be compiled into
/// the product binary rather than read from the environment.
#[derive(Debug, Clone)]
pub struct KeywardConfig {
    /// Application name reported in the User-Agent (e.g., "myapp/1.2.0").
    pub app_name: &'static str,

    /// User-Agent product identifier (e.g., "myapp-loader").
    pub user_agent_product: &'static str,

    /// Base URL of the validation service, e.g. `https://auth.example.com`.
    /// A missing scheme means plain HTTP.
    pub server_url: &'static str,

    /// Path of the health endpoint, relative to the base URL.
    pub health_path: &'static str,

    /// Path of the key validation endpoint.
    pub validate_path: &'static str,

    /// Path of the messages endpoint.
    pub messages_path: &'static str,

    /// Timeout applied to connect, send and receive.
    pub request_timeout: Duration,

    /// Plain-text "what is my IP" service queried once per session.
    pub address_lookup_url: &'static str,

    /// Timeout for the address lookup.
    pub address_lookup_timeout: Duration,

    /// Namespace for the on-disk credential store. `None` keeps sealed
    /// credentials in memory only.
    pub credential_namespace: Option<&'static str>,

    /// System functions checked for entry hooks before every request.
    pub guarded_functions: &'static [&'static str],
}

impl Default for KeywardConfig {
    fn default() -> Self {
        Self {
            app_name: "keyward",
            user_agent_product: "keyward-client",
            server_url: "http://localhost:3000",
            health_path: "api/health",
            validate_path: "api/validate",
            messages_path: "api/messages",
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            address_lookup_url: "https://api.ipify.org/",
            address_lookup_timeout: DEFAULT_ADDRESS_LOOKUP_TIMEOUT,
            credential_namespace: None,
            guarded_functions: DEFAULT_GUARDED_FUNCTIONS,
        }
    }
}

impl KeywardConfig {
    /// Validate configuration for obvious errors.
    pub fn validate(&self) -> Result<(), KeywardError> {
        ServerEndpoint::parse(self.server_url)?;
        ServerEndpoint::parse(self.address_lookup_url)?;
        for (name, path) in [
            ("health_path", self.health_path),
            ("validate_path", self.validate_path),
            ("messages_path", self.messages_path),
        ] {
            if path.trim_matches('/').is_empty() {
                return Err(KeywardError::ConfigError(format!("{} cannot be empty", name)));
            }
        }
        if self.request_timeout.is_zero() {
            return Err(KeywardError::ConfigError(
                "request_timeout must be non-zero".to_string(),
            ));
        }
        if let Some(namespace) = self.credential_namespace {
            if namespace.is_empty() || namespace.contains(['/', '\\']) {
                return Err(KeywardError::ConfigError(format!(
                    "credential_namespace must be a plain directory name, got {:?}",
                    namespace
                )));
            }
        }
        Ok(())
    }
}

/// Where requests go: host, port, TLS flag and an optional base path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerEndpoint {
    /// Host name or address, without port. IPv6 literals keep their brackets.
    pub host: String,
    /// TCP port.
    pub port: u16,
    /// Whether to use TLS.
    pub secure: bool,
    /// Base path prefix without leading or trailing slash (may be empty).
    pub base_path: String,
}

impl ServerEndpoint {
    /// Parse a service URL.
    ///
    /// `https://` selects TLS on port 443, `http://` or no scheme selects
    /// plain HTTP on port 80; an explicit `:port` overrides either.
    pub fn parse(url: &str) -> Result<Self, KeywardError> {
        let url = url.trim();
        let (secure, rest) = if let Some(rest) = url.strip_prefix("https://") {
            (true, rest)
        } else if let Some(rest) = url.strip_prefix("http://") {
            (false, rest)
        } else {
            (false, url)
        };

        let (authority, base_path) = match rest.find('/') {
            Some(slash) => (&rest[..slash], rest[slash..].trim_matches('/')),
            None => (rest, ""),
        };

        // IPv6 literals keep their brackets so the host renders back into a URL.
        let (host, port_text) = if authority.starts_with('[') {
            let close = authority.find(']').ok_or_else(|| {
                KeywardError::ConfigError(format!("unterminated IPv6 host in url {:?}", url))
            })?;
            let (host, rest) = authority.split_at(close + 1);
            match rest.strip_prefix(':') {
                Some(port) => (host, Some(port)),
                None if rest.is_empty() => (host, None),
                None => {
                    return Err(KeywardError::ConfigError(format!(
                        "unexpected text after IPv6 host in url {:?}",
                        url
                    )))
                }
            }
        } else {
            match authority.rsplit_once(':') {
                Some((host, port)) => (host, Some(port)),
                None => (authority, None),
            }
        };

        let port = match port_text {
            Some(port) => port.parse::<u16>().map_err(|_| {
                KeywardError::ConfigError(format!("invalid port in url {:?}", url))
            })?,
            None => {
                if secure {
                    443
                } else {
                    80
                }
            }
        };

        if host.is_empty() || host == "[]" {
            return Err(KeywardError::ConfigError(format!(
                "url {:?} has no host",
                url
            )));
        }

        Ok(Self {
            host: host.to_string(),
            port,
            secure,
            base_path: base_path.to_string(),
        })
    }

    /// Build an absolute request path for an endpoint under the base path.
    pub fn path_for(&self, endpoint: &str) -> String {
        let endpoint = endpoint.trim_start_matches('/');
        if self.base_path.is_empty() {
            format!("/{}", endpoint)
        } else {
            format!("/{}/{}", self.base_path, endpoint)
        }
    }
}
