//! Credential concealment: keyed obfuscation and sealed credential storage.

pub mod credentials;
pub mod obfuscate;
