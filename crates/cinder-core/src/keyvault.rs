//! Key derivation and authenticated encryption
//!
//! A session identity is the hex SHA-256 of its salt and entropy; the
//! vault key is the SHA-256 of that identity. Derivation is one-way and
//! deterministic for a given identity (service credentials depend on
//! that), but identities are never reused across sessions.
//!
//! Secret values are sealed with AES-256-GCM. Each blob is
//! self-contained: `[12-byte nonce][ciphertext + tag]`, nonce drawn
//! fresh from the OS RNG per encryption.

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::error::{Error, Result};

/// AES-256 key length in bytes.
pub const KEY_LEN: usize = 32;

/// AES-GCM nonce length (96 bits).
const NONCE_LEN: usize = 12;

/// Derive an opaque session identity from a salt and fresh entropy.
pub fn derive_session_id(salt: &[u8], entropy: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(entropy);
    hex::encode(hasher.finalize())
}

/// Derive the session's symmetric key from its identity.
///
/// Same identity, same key. The identity itself is high-entropy and
/// session-unique, so keys never repeat across sessions.
pub fn derive_key(session_id: &str) -> Zeroizing<[u8; KEY_LEN]> {
    let mut hasher = Sha256::new();
    hasher.update(session_id.as_bytes());
    let digest = hasher.finalize();

    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    key.copy_from_slice(&digest);
    key
}

/// Encrypt a plaintext under the session key.
pub fn encrypt(key: &[u8; KEY_LEN], plaintext: &[u8]) -> Result<Vec<u8>> {
    let cipher =
        Aes256Gcm::new_from_slice(key).map_err(|e| Error::Crypto(e.to_string()))?;
    let nonce = Aes256Gcm::generate_nonce(OsRng);

    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|e| Error::Crypto(format!("encrypt: {}", e)))?;

    let mut blob = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    blob.extend_from_slice(nonce.as_slice());
    blob.extend_from_slice(&ciphertext);
    Ok(blob)
}

/// Decrypt a blob produced by [`encrypt`].
///
/// Fails with [`Error::Crypto`] on a truncated blob or when the
/// authentication tag does not verify (wrong key, tampering, foreign
/// session). Never returns unauthenticated plaintext.
pub fn decrypt(key: &[u8; KEY_LEN], blob: &[u8]) -> Result<Vec<u8>> {
    if blob.len() < NONCE_LEN {
        return Err(Error::Crypto("blob too short to carry a nonce".to_string()));
    }

    let cipher =
        Aes256Gcm::new_from_slice(key).map_err(|e| Error::Crypto(e.to_string()))?;
    let (nonce, ciphertext) = blob.split_at(NONCE_LEN);

    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| Error::Crypto("authentication failed".to_string()))
}

/// Derive a printable, deterministic service credential.
///
/// One-way function of `(session_id, label)`: the same label yields the
/// same credential for the lifetime of the session, and an unrelated
/// one after regeneration. Truncated URL-safe base64, so the output is
/// always printable.
pub fn derive_credential(session_id: &str, label: &str, length: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(session_id.as_bytes());
    hasher.update(b":");
    hasher.update(label.as_bytes());

    let encoded = URL_SAFE_NO_PAD.encode(hasher.finalize());
    let length = length.min(encoded.len());
    encoded[..length].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let key = derive_key("some-session");
        let blob = encrypt(&key, b"the launch codes").unwrap();
        let plain = decrypt(&key, &blob).unwrap();
        assert_eq!(plain, b"the launch codes");
    }

    #[test]
    fn test_blobs_are_self_contained_and_unique() {
        let key = derive_key("some-session");
        let a = encrypt(&key, b"same plaintext").unwrap();
        let b = encrypt(&key, b"same plaintext").unwrap();
        // Fresh nonce per encryption
        assert_ne!(a, b);
        assert_eq!(decrypt(&key, &a).unwrap(), decrypt(&key, &b).unwrap());
    }

    #[test]
    fn test_foreign_key_fails_authentication() {
        let key_a = derive_key("session-a");
        let key_b = derive_key("session-b");
        let blob = encrypt(&key_a, b"secret").unwrap();

        let result = decrypt(&key_b, &blob);
        assert!(matches!(result, Err(Error::Crypto(_))));
    }

    #[test]
    fn test_tampered_blob_fails() {
        let key = derive_key("session");
        let mut blob = encrypt(&key, b"secret").unwrap();
        let last = blob.len() - 1;
        blob[last] ^= 0xff;

        assert!(matches!(decrypt(&key, &blob), Err(Error::Crypto(_))));
    }

    #[test]
    fn test_truncated_blob_fails() {
        let key = derive_key("session");
        assert!(matches!(decrypt(&key, &[0u8; 4]), Err(Error::Crypto(_))));
    }

    #[test]
    fn test_key_derivation_deterministic() {
        let a = derive_key("session-x");
        let b = derive_key("session-x");
        let c = derive_key("session-y");
        assert_eq!(*a, *b);
        assert_ne!(*a, *c);
    }

    #[test]
    fn test_session_id_depends_on_both_inputs() {
        let id = derive_session_id(b"salt", b"entropy");
        assert_eq!(id.len(), 64);
        assert_ne!(id, derive_session_id(b"salt", b"other"));
        assert_ne!(id, derive_session_id(b"other", b"entropy"));
    }

    #[test]
    fn test_credential_deterministic_within_session() {
        let a = derive_credential("session-1", "mail", 16);
        let b = derive_credential("session-1", "mail", 16);
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
    }

    #[test]
    fn test_credential_differs_across_sessions_and_labels() {
        let a = derive_credential("session-1", "mail", 24);
        let b = derive_credential("session-2", "mail", 24);
        let c = derive_credential("session-1", "bank", 24);
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_credential_length_capped_at_digest_encoding() {
        let long = derive_credential("session", "svc", 4096);
        // 32-byte digest -> 43 chars of unpadded base64
        assert_eq!(long.len(), 43);
    }
}
