//! Validation session - the main public API for Keyward.
//!
//! A `ValidationSession` identifies the device once, then talks to the
//! validation service:
//! - Health checks
//! - Key validation with device binding and optional account credentials
//! - License metadata and server-pushed messages
//!
//! Every operation reports failure through a single last-error slot instead
//! of returning it, so callers check the boolean result and read
//! [`ValidationSession::last_error`] afterwards.

use crate::client::address::{AddressSource, HttpAddressSource, UNKNOWN_ADDRESS};
use crate::client::http::{HttpRequest, HttpTransport, ReqwestTransport};
use crate::clock::{Clock, SystemClock};
use crate::codec::credentials::SealedCredentials;
use crate::codec::obfuscate::derive_key;
use crate::config::{KeywardConfig, ServerEndpoint};
use crate::fingerprint::collect::{IdentifierSource, SystemIdentifiers};
use crate::fingerprint::compose::DeviceFingerprint;
use crate::guard::hook::{HookProbe, SymbolProbe};
use crate::guard::time::TimeGuard;
use crate::guard::TamperGuard;
use crate::protocol::extract::{extract_string, has_success_marker};
use crate::protocol::models::{parse_messages, LicenseInfo, Message, MessagesRequest, ValidateRequest};
use crate::store::file::{CredentialRecord, CredentialStore};
use crate::KeywardError;
use std::sync::Arc;
use zeroize::Zeroizing;

/// Reason reported when a rejection carries no `message`.
pub const DEFAULT_REJECTION: &str = "Invalid key";

/// Authentication state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationState {
    /// No key has been validated yet.
    Unauthenticated,
    /// A key was validated; terminal for the session's lifetime.
    Authenticated,
}

/// External collaborators a session is built from.
pub struct SessionParts {
    /// Delivers requests to the validation service.
    pub transport: Box<dyn HttpTransport>,
    /// Harvests raw hardware identifiers.
    pub identifiers: Box<dyn IdentifierSource>,
    /// Reports the public address.
    pub address: Box<dyn AddressSource>,
    /// Clock rollback checkpoint.
    pub time_guard: Arc<TimeGuard>,
    /// Hook heuristic.
    pub hook_probe: Box<dyn HookProbe>,
    /// Clock used to stamp stored records.
    pub clock: Arc<dyn Clock>,
    /// Optional on-disk store for sealed credentials.
    pub credential_store: Option<CredentialStore>,
}

impl SessionParts {
    /// Production collaborators: reqwest transport, OS identifier queries,
    /// HTTP address lookup, the process-wide time guard and symbol probing.
    pub fn system(config: &KeywardConfig) -> Result<Self, KeywardError> {
        Ok(Self {
            transport: Box::new(ReqwestTransport::new(config)?),
            identifiers: Box::new(SystemIdentifiers),
            address: Box::new(HttpAddressSource::new(config)?),
            time_guard: TimeGuard::shared(),
            hook_probe: Box::new(SymbolProbe),
            clock: Arc::new(SystemClock),
            credential_store: config
                .credential_namespace
                .map(CredentialStore::new)
                .transpose()?,
        })
    }
}

/// One client-side session against the validation service.
///
/// Operations are blocking and take `&mut self`; a session is driven from a
/// single thread of control.
pub struct ValidationSession {
    config: KeywardConfig,
    endpoint: ServerEndpoint,
    transport: Box<dyn HttpTransport>,
    guard: TamperGuard,
    clock: Arc<dyn Clock>,
    store: Option<CredentialStore>,
    fingerprint: DeviceFingerprint,
    address: String,
    credentials: Option<SealedCredentials>,
    state: ValidationState,
    last_validated_key: String,
    last_error: Option<KeywardError>,
    license_info: Option<LicenseInfo>,
    messages: Vec<Message>,
}

impl ValidationSession {
    /// Create a session with the system collaborators.
    ///
    /// Collects hardware identifiers and looks up the public address once.
    ///
    /// # Errors
    /// Returns an error if:
    /// - Configuration validation fails
    /// - HTTP client creation fails
    /// - The credential store directory cannot be created
    pub fn new(config: KeywardConfig) -> Result<Self, KeywardError> {
        config.validate()?;
        let parts = SessionParts::system(&config)?;
        Self::with_parts(config, parts)
    }

    /// Create a session from explicit collaborators.
    pub fn with_parts(config: KeywardConfig, parts: SessionParts) -> Result<Self, KeywardError> {
        config.validate()?;
        let endpoint = ServerEndpoint::parse(config.server_url)?;

        let fingerprint = DeviceFingerprint::compose(&parts.identifiers.collect());
        let address = parts
            .address
            .public_address()
            .unwrap_or_else(|| UNKNOWN_ADDRESS.to_string());
        tracing::info!(
            unknown_device = fingerprint.is_unknown(),
            server = %endpoint.host,
            "validation session created"
        );

        let guard = TamperGuard::new(parts.time_guard, parts.hook_probe, config.guarded_functions);

        let credentials = parts
            .credential_store
            .as_ref()
            .and_then(|store| load_credentials(store, &session_key_for(&fingerprint, &address)));

        Ok(Self {
            config,
            endpoint,
            transport: parts.transport,
            guard,
            clock: parts.clock,
            store: parts.credential_store,
            fingerprint,
            address,
            credentials,
            state: ValidationState::Unauthenticated,
            last_validated_key: String::new(),
            last_error: None,
            license_info: None,
            messages: Vec::new(),
        })
    }

    /// Check that the service is reachable and healthy.
    ///
    /// Does not change the validation state.
    pub fn check_server(&mut self) -> bool {
        self.last_error = None;

        let body = match self.guarded_send(self.config.health_path, "") {
            Ok(body) => body,
            Err(e) => return self.fail(e),
        };

        if body.trim().is_empty() {
            return self.fail(KeywardError::EmptyResponse);
        }
        if has_success_marker(&body) {
            return true;
        }

        match first_non_empty(&[
            extract_string(&body, "message"),
            extract_string(&body, "error"),
        ]) {
            Some(reason) => self.fail(KeywardError::ServerError(reason.to_string())),
            None => self.fail(KeywardError::MalformedResponse(
                "health check did not report success".to_string(),
            )),
        }
    }

    /// Validate a license key.
    ///
    /// On success the session becomes [`ValidationState::Authenticated`],
    /// license info is replaced, and messages are refreshed (failures of the
    /// latter are ignored).
    pub fn validate_key(&mut self, key: &str) -> bool {
        self.last_error = None;

        if key.is_empty() {
            return self.fail(KeywardError::MissingLicense);
        }
        if let Err(e) = self.guard.check() {
            return self.fail(e);
        }

        let body = match self.exchange_validation(key) {
            Ok(body) => body,
            Err(e) => return self.fail(e),
        };

        if body.trim().is_empty() {
            return self.fail(KeywardError::EmptyResponse);
        }

        if has_success_marker(&body) {
            self.state = ValidationState::Authenticated;
            self.last_validated_key = key.to_string();

            let info = LicenseInfo::from_response(&body);
            if !info.is_valid {
                tracing::debug!("validation response carried no data object");
            }
            self.license_info = Some(info);
            tracing::info!("license key validated");

            self.fetch_messages();
            return true;
        }

        let error = extract_string(&body, "error");
        if !error.is_empty() {
            return self.fail(KeywardError::ServerError(error.to_string()));
        }

        let reason = first_non_empty(&[extract_string(&body, "message")]).unwrap_or(DEFAULT_REJECTION);
        self.fail(KeywardError::ValidationRejected(reason.to_string()))
    }

    /// Refresh server-pushed messages for the validated key.
    ///
    /// Best-effort: the last error is cleared like for every operation, but
    /// a failure never sets it; the collection is simply left empty.
    pub fn fetch_messages(&mut self) {
        self.last_error = None;
        self.messages.clear();
        if self.state != ValidationState::Authenticated {
            return;
        }

        let payload = match serde_json::to_string(&MessagesRequest {
            key: &self.last_validated_key,
            hwid: self.fingerprint.as_str(),
        }) {
            Ok(json) => Zeroizing::new(json),
            Err(e) => {
                tracing::debug!(error = %e, "could not serialize messages request");
                return;
            }
        };

        let body = match self.guarded_send(self.config.messages_path, &payload) {
            Ok(body) => body,
            Err(e) => {
                tracing::debug!(error = %e, "message fetch failed");
                return;
            }
        };

        if !has_success_marker(&body) {
            tracing::debug!("message fetch did not report success");
            return;
        }
        match parse_messages(&body) {
            Some(messages) => self.messages = messages,
            None => tracing::debug!("message response carried no messages array"),
        }
    }

    /// Store account credentials, sealed under the session key.
    ///
    /// Passing an empty value for either clears the stored pair. When a
    /// credential store is configured the change is persisted.
    pub fn set_credentials(&mut self, account_id: &str, api_token: &str) -> bool {
        self.last_error = None;

        if account_id.is_empty() || api_token.is_empty() {
            self.credentials = None;
            if let Some(store) = &self.store {
                if let Err(e) = store.delete() {
                    return self.fail(e);
                }
            }
            return true;
        }

        let key = self.session_key();
        let sealed = match SealedCredentials::seal(account_id, api_token, &key) {
            Ok(sealed) => sealed,
            Err(e) => return self.fail(e),
        };
        drop(key);

        if let Some(store) = &self.store {
            let record = CredentialRecord::new(sealed.clone(), self.clock.as_ref());
            if let Err(e) = store.save(&record) {
                return self.fail(e);
            }
        }
        self.credentials = Some(sealed);
        true
    }

    /// Whether a complete credential pair is held.
    pub fn has_credentials(&self) -> bool {
        self.credentials
            .as_ref()
            .is_some_and(SealedCredentials::is_complete)
    }

    /// Current validation state.
    pub fn state(&self) -> ValidationState {
        self.state
    }

    /// Shorthand for `state() == Authenticated`.
    pub fn is_authenticated(&self) -> bool {
        self.state == ValidationState::Authenticated
    }

    /// The key of the last successful validation; empty before one.
    pub fn last_validated_key(&self) -> &str {
        &self.last_validated_key
    }

    /// Diagnostic text of the last failure; empty when the last operation
    /// succeeded.
    pub fn last_error(&self) -> String {
        self.last_error
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default()
    }

    /// The last failure, for callers that branch on its kind.
    pub fn last_error_kind(&self) -> Option<&KeywardError> {
        self.last_error.as_ref()
    }

    /// License info from the last successful validation.
    pub fn license_info(&self) -> Option<&LicenseInfo> {
        self.license_info.as_ref()
    }

    /// Messages from the last fetch.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// This device's fingerprint.
    pub fn fingerprint(&self) -> &DeviceFingerprint {
        &self.fingerprint
    }

    /// Public address observed at construction.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// The configuration this session was built with.
    pub fn config(&self) -> &KeywardConfig {
        &self.config
    }

    fn fail(&mut self, error: KeywardError) -> bool {
        match &error {
            KeywardError::TamperDetected(signal) => {
                tracing::warn!(%signal, "request aborted by tamper guard")
            }
            other => tracing::debug!(error = %other, "operation failed"),
        }
        self.last_error = Some(error);
        false
    }

    fn session_key(&self) -> Zeroizing<String> {
        session_key_for(&self.fingerprint, &self.address)
    }

    /// Build the validation payload, send it, and wipe the key material,
    /// plaintext credentials and payload before returning.
    fn exchange_validation(&self, key: &str) -> Result<String, KeywardError> {
        let session_key = self.session_key();
        let hwid = self.fingerprint.as_str();
        let ip = self.address.as_str();

        let serialize = |request: &ValidateRequest<'_>| {
            serde_json::to_string(request)
                .map(Zeroizing::new)
                .map_err(|e| KeywardError::Codec(format!("Failed to serialize request: {}", e)))
        };

        let sealed = self.credentials.as_ref().filter(|c| c.is_complete());
        let with_credentials = sealed.map(|c| {
            c.with_plaintext(&session_key, |plain| {
                serialize(&ValidateRequest {
                    key,
                    hwid,
                    ip,
                    account_id: Some(plain.account_id.as_str()),
                    api_token: Some(plain.api_token.as_str()),
                })
            })
        });

        let payload = match with_credentials {
            Some(Ok(payload)) => payload?,
            Some(Err(e)) => {
                tracing::warn!(error = %e, "stored credentials could not be unsealed, sending without them");
                serialize(&ValidateRequest {
                    key,
                    hwid,
                    ip,
                    account_id: None,
                    api_token: None,
                })?
            }
            None => serialize(&ValidateRequest {
                key,
                hwid,
                ip,
                account_id: None,
                api_token: None,
            })?,
        };
        drop(session_key);

        self.send(self.config.validate_path, &payload)
    }

    fn guarded_send(&self, endpoint: &str, body: &str) -> Result<String, KeywardError> {
        self.guard.check()?;
        self.send(endpoint, body)
    }

    fn send(&self, endpoint: &str, body: &str) -> Result<String, KeywardError> {
        let path = self.endpoint.path_for(endpoint);
        let request = HttpRequest::to(&self.endpoint, &path, body);
        tracing::debug!(method = request.method.as_str(), path = %path, "sending request");
        self.transport.send(&request)
    }
}

impl std::fmt::Debug for ValidationSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidationSession")
            .field("server", &self.endpoint.host)
            .field("fingerprint", &self.fingerprint)
            .field("state", &self.state)
            .field("has_credentials", &self.has_credentials())
            .field("last_error", &self.last_error)
            .finish()
    }
}

fn session_key_for(fingerprint: &DeviceFingerprint, address: &str) -> Zeroizing<String> {
    let seed = Zeroizing::new(format!("{}|{}", fingerprint, address));
    derive_key(&seed)
}

/// Load stored credentials sealed under `key`. Records that cannot be read,
/// or that were sealed on another device or from another address, are
/// dropped.
fn load_credentials(store: &CredentialStore, key: &str) -> Option<SealedCredentials> {
    let record = match store.load() {
        Ok(record) => record?,
        Err(e) => {
            tracing::warn!(error = %e, "ignoring unreadable credential store");
            return None;
        }
    };

    if record.credentials.sealed_under(key) {
        return Some(record.credentials);
    }

    tracing::warn!(
        saved_at = %record.saved_at.to_rfc3339(),
        "stored credentials were sealed under a different device key, discarding"
    );
    if let Err(e) = store.delete() {
        tracing::warn!(error = %e, "could not remove stale credential record");
    }
    None
}

fn first_non_empty<'a>(candidates: &[&'a str]) -> Option<&'a str> {
    candidates.iter().copied().find(|s| !s.is_empty())
}
