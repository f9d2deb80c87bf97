//! # Keyward
//!
//! **Device-bound license key validation client for Rust.**
//!
//! Keyward binds a license key to the machine it runs on and checks it
//! against a remote validation service over HTTP(S).
//!
//! ## Features
//!
//! - **Device fingerprint** composed from hardware identifiers, stable across runs
//! - **Sealed credentials** kept obfuscated in memory and on disk, unsealed only per request
//! - **Anti-tamper checks** for clock rollback and hooked system functions before any I/O
//! - **Lenient response reading** that tolerates loosely formed service replies
//! - **License metadata and server messages** exposed after a successful validation
//!
//! ## Quickstart
//!
//! ```no_run
//! use keyward::{KeywardConfig, ValidationSession};
//!
//! fn main() -> Result<(), keyward::KeywardError> {
//!     let config = KeywardConfig {
//!         app_name: "myapp/1.0.0",
//!         user_agent_product: "myapp",
//!         server_url: "https://auth.example.com",
//!         credential_namespace: Some("myapp"),
//!         ..KeywardConfig::default()
//!     };
//!
//!     let mut session = ValidationSession::new(config)?;
//!     if session.validate_key("LICENSE-KEY-HERE") {
//!         if let Some(info) = session.license_info() {
//!             println!("License valid for {}s", info.time_remaining_seconds);
//!         }
//!     } else {
//!         eprintln!("Validation failed: {}", session.last_error());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Threat Model
//!
//! Keyward raises the bar against casual tampering:
//! - **Clock rollback** to extend an expired license is detected per process
//! - **Inline hooks** on a few network and time functions are flagged heuristically
//! - **Credential scraping** from memory dumps or the data directory finds only sealed values
//!
//! None of this is a security boundary. The concealment key is derived from
//! values an attacker on the same machine can read, and client-side checks
//! can always be patched out of the binary.

#![deny(missing_docs)]
#![doc(html_root_url = "https://docs.rs/keyward/0.1.0")]

// Core modules
pub mod clock;
pub mod config;
pub mod errors;

// Device identity
pub mod fingerprint;

// Concealment
pub mod codec;

// Anti-tamper
pub mod guard;

// Protocol layer
pub mod protocol;

// Client layer
pub mod client;

// Persistence
pub mod store;

// Session (main public API)
pub mod session;

// Re-exports for public API
pub use clock::{Clock, SystemClock};
pub use config::KeywardConfig;
pub use errors::{KeywardError, TamperSignal};
pub use fingerprint::compose::DeviceFingerprint;
pub use protocol::models::{LicenseInfo, Message};
pub use session::{SessionParts, ValidationSession, ValidationState};

#[cfg(any(test, feature = "test-seams"))]
pub use clock::MockClock;
