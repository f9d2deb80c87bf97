//! Keyed XOR obfuscation with base64 text encoding.
//!
//! **Not encryption.** This only keeps stored credentials from being
//! readable at a glance; anyone who can recompute the seed (fingerprint +
//! address) can reverse it. Swap in an AEAD behind [`seal`]/[`unseal`] if
//! real confidentiality is ever required.

use crate::KeywardError;
use base64::{engine::general_purpose::STANDARD, Engine};
use zeroize::Zeroizing;

/// Multipliers for the two rolling-hash lanes that make up a derived key.
const LANE_MULTIPLIERS: [u64; 2] = [31, 131];

/// Starting values for the two lanes.
const LANE_SEEDS: [u64; 2] = [5381, 0x9E37_79B9_7F4A_7C15];

/// Derive a short key string from arbitrary seed text.
///
/// Two multiplicative rolling hashes over the seed bytes, rendered as 32 hex
/// characters. The output is never empty, so it always satisfies the
/// non-empty key requirement of [`seal`].
pub fn derive_key(seed: &str) -> Zeroizing<String> {
    let mut lanes = LANE_SEEDS;
    for &byte in seed.as_bytes() {
        for (lane, multiplier) in lanes.iter_mut().zip(LANE_MULTIPLIERS) {
            *lane = lane.wrapping_mul(multiplier).wrapping_add(u64::from(byte));
        }
    }

    let mut bytes = Zeroizing::new([0u8; 16]);
    bytes[..8].copy_from_slice(&lanes[0].to_be_bytes());
    bytes[8..].copy_from_slice(&lanes[1].to_be_bytes());
    Zeroizing::new(hex::encode(&bytes[..]))
}

/// XOR `data` in place with `key` cycled to its length.
fn xor_cycle(data: &mut [u8], key: &[u8]) {
    for (byte, k) in data.iter_mut().zip(key.iter().cycle()) {
        *byte ^= k;
    }
}

/// Obfuscate `plaintext` under `key`.
///
/// Empty plaintext seals to an empty string.
///
/// # Errors
/// `Codec` if `key` is empty.
pub fn seal(plaintext: &str, key: &str) -> Result<String, KeywardError> {
    if key.is_empty() {
        return Err(KeywardError::Codec("seal key cannot be empty".to_string()));
    }
    if plaintext.is_empty() {
        return Ok(String::new());
    }

    let mut buf = Zeroizing::new(plaintext.as_bytes().to_vec());
    xor_cycle(&mut buf, key.as_bytes());
    Ok(STANDARD.encode(buf.as_slice()))
}

/// Reverse [`seal`].
///
/// A wrong key is not detected here: ASCII plaintext XOR-ed with two
/// different hex keys is still ASCII. Callers that need to know must keep
/// their own key check, as [`SealedCredentials`](super::credentials::SealedCredentials) does.
///
/// # Errors
/// `Codec` if `key` is empty, the text is not valid base64, or the
/// recovered bytes are not UTF-8.
pub fn unseal(sealed: &str, key: &str) -> Result<Zeroizing<String>, KeywardError> {
    if key.is_empty() {
        return Err(KeywardError::Codec("unseal key cannot be empty".to_string()));
    }

    let mut buf = STANDARD
        .decode(sealed)
        .map_err(|e| KeywardError::Codec(format!("sealed text is not base64: {}", e)))?;
    xor_cycle(&mut buf, key.as_bytes());

    String::from_utf8(buf).map(Zeroizing::new).map_err(|e| {
        let mut bytes = e.into_bytes();
        zeroize::Zeroize::zeroize(&mut bytes);
        KeywardError::Codec("unsealed bytes are not UTF-8".to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn derive_key_is_deterministic() {
        let a = derive_key("UUID:abc|203.0.113.7");
        let b = derive_key("UUID:abc|203.0.113.7");
        assert_eq!(*a, *b);
        assert_eq!(a.len(), 32);
    }

    #[test]
    fn derive_key_differs_by_seed() {
        assert_ne!(*derive_key("seed-a"), *derive_key("seed-b"));
    }

    #[test]
    fn derive_key_of_empty_seed_is_non_empty() {
        assert!(!derive_key("").is_empty());
    }

    #[test]
    fn seal_hides_plaintext() {
        let key = derive_key("device");
        let sealed = seal("acct-42", &key).unwrap();
        assert_ne!(sealed, "acct-42");
        assert!(STANDARD.decode(&sealed).is_ok());
    }

    #[test]
    fn seal_round_trip() {
        let key = derive_key("device");
        let sealed = seal("api-token-value", &key).unwrap();
        assert_eq!(unseal(&sealed, &key).unwrap().as_str(), "api-token-value");
    }

    #[test]
    fn empty_plaintext_seals_to_empty() {
        assert_eq!(seal("", "k").unwrap(), "");
        assert_eq!(unseal("", "k").unwrap().as_str(), "");
    }

    #[test]
    fn empty_key_rejected() {
        assert!(matches!(seal("x", ""), Err(KeywardError::Codec(_))));
        assert!(matches!(unseal("eA==", ""), Err(KeywardError::Codec(_))));
    }

    #[test]
    fn invalid_base64_rejected() {
        assert!(matches!(unseal("***", "k"), Err(KeywardError::Codec(_))));
    }

    #[test]
    fn known_vector() {
        // 'a' ^ 'k' = 0x0A, 'b' ^ 'k' = 0x09
        assert_eq!(seal("ab", "k").unwrap(), STANDARD.encode([0x0A, 0x09]));
    }

    proptest! {
        #[test]
        fn unseal_inverts_seal(plaintext in ".*", key in ".+") {
            let sealed = seal(&plaintext, &key).unwrap();
            let unsealed = unseal(&sealed, &key).unwrap();
            prop_assert_eq!(unsealed.as_str(), plaintext.as_str());
        }
    }
}
