//! Account credentials held only in sealed form.

use crate::codec::obfuscate::{derive_key, seal, unseal};
use crate::KeywardError;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// `{accountId, apiToken}` pair, both fields sealed under the session key.
///
/// XOR under a different hex key still yields printable text, so unsealing
/// alone cannot tell a wrong key apart. A digest of the sealing key is kept
/// alongside and checked first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedCredentials {
    account_id: String,
    api_token: String,
    key_check: String,
}

/// Digest of a sealing key. Never the key itself.
fn key_check(key: &str) -> String {
    let seed = zeroize::Zeroizing::new(format!("key-check|{}", key));
    derive_key(&seed).to_string()
}

/// Unsealed credentials. Wiped on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct PlainCredentials {
    /// Account identifier.
    pub account_id: String,
    /// API token.
    pub api_token: String,
}

impl std::fmt::Debug for PlainCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlainCredentials")
            .field("account_id", &"[REDACTED]")
            .field("api_token", &"[REDACTED]")
            .finish()
    }
}

impl SealedCredentials {
    /// Seal a plaintext pair.
    pub fn seal(account_id: &str, api_token: &str, key: &str) -> Result<Self, KeywardError> {
        Ok(Self {
            account_id: seal(account_id, key)?,
            api_token: seal(api_token, key)?,
            key_check: key_check(key),
        })
    }

    /// Whether these credentials were sealed under `key`.
    pub fn sealed_under(&self, key: &str) -> bool {
        self.key_check == key_check(key)
    }

    /// Whether both halves are present. Requests only carry credentials when
    /// this holds.
    pub fn is_complete(&self) -> bool {
        !self.account_id.is_empty() && !self.api_token.is_empty()
    }

    /// Unseal, hand the plaintext to `f`, and wipe it before returning.
    ///
    /// # Errors
    /// `Codec` if the credentials were sealed under a different key.
    pub fn with_plaintext<R>(
        &self,
        key: &str,
        f: impl FnOnce(&PlainCredentials) -> R,
    ) -> Result<R, KeywardError> {
        if !self.sealed_under(key) {
            return Err(KeywardError::Codec(
                "credentials were sealed under a different device key".to_string(),
            ));
        }
        let account_id = unseal(&self.account_id, key)?;
        let api_token = unseal(&self.api_token, key)?;
        let plain = PlainCredentials {
            account_id: account_id.to_string(),
            api_token: api_token.to_string(),
        };
        Ok(f(&plain))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::obfuscate::derive_key;

    #[test]
    fn sealed_fields_are_not_plaintext() {
        let key = derive_key("seed");
        let sealed = SealedCredentials::seal("acct-1", "tok-secret", &key).unwrap();
        let json = serde_json::to_string(&sealed).unwrap();
        assert!(!json.contains("acct-1"));
        assert!(!json.contains("tok-secret"));
    }

    #[test]
    fn plaintext_is_recovered_inside_scope() {
        let key = derive_key("seed");
        let sealed = SealedCredentials::seal("acct-1", "tok-secret", &key).unwrap();
        let joined = sealed
            .with_plaintext(&key, |plain| format!("{}:{}", plain.account_id, plain.api_token))
            .unwrap();
        assert_eq!(joined, "acct-1:tok-secret");
    }

    #[test]
    fn wrong_key_is_refused() {
        let key = derive_key("UUID:abc|203.0.113.7");
        let other = derive_key("UUID:abc|198.51.100.9");
        let sealed = SealedCredentials::seal("acct-1", "tok-1", &key).unwrap();

        assert!(sealed.sealed_under(&key));
        assert!(!sealed.sealed_under(&other));

        let mut called = false;
        let result = sealed.with_plaintext(&other, |_| called = true);
        assert!(matches!(result, Err(KeywardError::Codec(_))));
        assert!(!called);
    }

    #[test]
    fn key_check_does_not_reveal_key() {
        let key = derive_key("seed");
        let sealed = SealedCredentials::seal("acct", "tok", &key).unwrap();
        let json = serde_json::to_string(&sealed).unwrap();
        assert!(!json.contains(key.as_str()));
    }

    #[test]
    fn incomplete_pair_detected() {
        let key = derive_key("seed");
        assert!(!SealedCredentials::seal("", "tok", &key).unwrap().is_complete());
        assert!(!SealedCredentials::seal("acct", "", &key).unwrap().is_complete());
        assert!(SealedCredentials::seal("acct", "tok", &key).unwrap().is_complete());
    }

    #[test]
    fn debug_redacts_plaintext() {
        let plain = PlainCredentials {
            account_id: "acct".into(),
            api_token: "tok".into(),
        };
        let shown = format!("{:?}", plain);
        assert!(!shown.contains("tok\""));
        assert!(shown.contains("REDACTED"));
    }
}
