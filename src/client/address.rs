//! Public address lookup.

use crate::client::http::{HttpRequest, HttpTransport, ReqwestTransport};
use crate::config::{KeywardConfig, ServerEndpoint};
use crate::KeywardError;

/// Placeholder used when the public address cannot be determined.
pub const UNKNOWN_ADDRESS: &str = "Unknown";

/// Capability reporting the caller's externally observed address.
pub trait AddressSource: Send + Sync {
    /// The address, if it could be determined.
    fn public_address(&self) -> Option<String>;
}

/// Queries a plain-text "what is my IP" service.
pub struct HttpAddressSource {
    transport: Box<dyn HttpTransport>,
    endpoint: ServerEndpoint,
    path: String,
}

impl HttpAddressSource {
    /// Lookup against `config.address_lookup_url` with its own short timeout.
    pub fn new(config: &KeywardConfig) -> Result<Self, KeywardError> {
        let transport = ReqwestTransport::with_timeout(config, config.address_lookup_timeout)?;
        Self::with_transport(config.address_lookup_url, Box::new(transport))
    }

    /// Lookup against `url` through an arbitrary transport.
    pub fn with_transport(
        url: &str,
        transport: Box<dyn HttpTransport>,
    ) -> Result<Self, KeywardError> {
        let endpoint = ServerEndpoint::parse(url)?;
        let path = format!("/{}", endpoint.base_path);
        Ok(Self {
            transport,
            endpoint,
            path,
        })
    }
}

impl AddressSource for HttpAddressSource {
    fn public_address(&self) -> Option<String> {
        let request = HttpRequest::to(&self.endpoint, &self.path, "");
        match self.transport.send(&request) {
            Ok(body) => {
                let address = body.trim();
                (!address.is_empty()).then(|| address.to_string())
            }
            Err(e) => {
                tracing::debug!(error = %e, "public address lookup failed");
                None
            }
        }
    }
}

/// Fixed address, for tests and for callers that already know it.
#[derive(Debug, Clone)]
pub struct StaticAddress(pub String);

impl AddressSource for StaticAddress {
    fn public_address(&self) -> Option<String> {
        (!self.0.is_empty()).then(|| self.0.clone())
    }
}
