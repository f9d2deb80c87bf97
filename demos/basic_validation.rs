//! Basic license validation example.
//!
//! This example demonstrates the core workflow for validating a license key
//! and handling common error cases.
//!
//! # Running
//!
//! ```bash
//! export LICENSE_KEY="your-license-key"
//! cargo run --example basic_validation
//! ```
//!
//! # Note
//!
//! In production, the service URL should be a compile-time constant embedded
//! in your binary, not loaded from environment variables. This keeps
//! attackers from pointing the client at a service of their own.

use keyward::{KeywardConfig, KeywardError, TamperSignal, ValidationSession};

const VALIDATION_SERVER: &str = "https://auth.example.com";

fn main() {
    // License key from user (this CAN come from environment/config)
    let license_key = std::env::var("LICENSE_KEY").unwrap_or_default();

    let config = KeywardConfig {
        app_name: "example-app/1.0.0",
        user_agent_product: "example-app",
        server_url: VALIDATION_SERVER,
        credential_namespace: Some("example-app"),
        ..KeywardConfig::default()
    };

    let mut session = match ValidationSession::new(config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    println!("Device: {}", session.fingerprint());

    if !session.check_server() {
        eprintln!("Server unavailable: {}", session.last_error());
        std::process::exit(1);
    }

    // Optional account credentials; sealed immediately and persisted sealed.
    if let (Ok(account), Ok(token)) = (
        std::env::var("ACCOUNT_ID"),
        std::env::var("API_TOKEN"),
    ) {
        if !session.set_credentials(&account, &token) {
            eprintln!("Could not store credentials: {}", session.last_error());
        }
    }

    if session.validate_key(&license_key) {
        println!("✓ License valid!");
        if let Some(info) = session.license_info() {
            println!("  Expires: {}", info.expires_at);
            println!("  Remaining: {} ({}s)", info.time_remaining, info.time_remaining_seconds);
        }
        for message in session.messages() {
            println!("  [{}] {}: {}", message.kind, message.title, message.content);
        }
        return;
    }

    match session.last_error_kind() {
        Some(KeywardError::MissingLicense) => {
            eprintln!("Set LICENSE_KEY to the key you were issued");
        }
        Some(KeywardError::TamperDetected(TamperSignal::ClockRollback { .. })) => {
            eprintln!("System clock moved backwards; refusing to validate");
        }
        Some(KeywardError::TamperDetected(signal)) => {
            eprintln!("SECURITY: {}", signal);
        }
        Some(KeywardError::EmptyResponse) | Some(KeywardError::Transport(_)) => {
            eprintln!("Network error: {}", session.last_error());
        }
        _ => {
            eprintln!("License invalid: {}", session.last_error());
        }
    }
    std::process::exit(1);
}
