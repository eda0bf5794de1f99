//! One-step key derivation with HMAC-SHA256.
//!
//! Two keys exist in the protocol:
//!
//! - The **session key**, `HMAC-SHA256(key = ECDH secret, msg = "voltage-session")`,
//!   used by both the authenticator and the AEAD cipher once connected.
//! - The **handshake key**, `SHA-256("voltage-handshake")`. It is a public
//!   constant: any party that knows the protocol can compute it. MACs under it
//!   detect corruption and version mismatch during the handshake; they do not
//!   authenticate the peer.

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::Result;
use crate::keys::SharedSecret;

/// Length of a derived key in bytes.
pub const KEY_LENGTH: usize = 32;

/// Context label for the post-handshake session key.
pub const SESSION_CONTEXT: &[u8] = b"voltage-session";

/// Seed hashed into the fixed handshake-authentication key.
pub const HANDSHAKE_SEED: &[u8] = b"voltage-handshake";

/// A 32-byte symmetric key. Wiped on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SessionKey([u8; KEY_LENGTH]);

impl SessionKey {
    /// Wraps raw key bytes.
    pub fn from_bytes(bytes: [u8; KEY_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Returns the raw key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LENGTH] {
        &self.0
    }
}

impl std::fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionKey([REDACTED])")
    }
}

/// Derives a purpose-bound key: `HMAC-SHA256(key = secret, msg = context)`.
pub fn derive(secret: &[u8], context: &[u8]) -> Result<SessionKey> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret)?;
    mac.update(context);

    let mut key = [0u8; KEY_LENGTH];
    key.copy_from_slice(&mac.finalize().into_bytes());
    Ok(SessionKey(key))
}

/// Derives the session key from an ECDH shared secret.
pub fn session_key(shared: &SharedSecret) -> Result<SessionKey> {
    derive(shared.as_bytes(), SESSION_CONTEXT)
}

/// Returns the fixed handshake-authentication key.
pub fn handshake_key() -> SessionKey {
    let mut key = [0u8; KEY_LENGTH];
    key.copy_from_slice(&Sha256::digest(HANDSHAKE_SEED));
    SessionKey(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::KeyPair;

    #[test]
    fn test_derive_is_deterministic() {
        let a = derive(b"secret", SESSION_CONTEXT).unwrap();
        let b = derive(b"secret", SESSION_CONTEXT).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_derive_separates_contexts() {
        let session = derive(b"secret", b"voltage-session").unwrap();
        let other = derive(b"secret", b"voltage-other").unwrap();
        assert_ne!(session, other);
    }

    #[test]
    fn test_derive_separates_secrets() {
        let a = derive(b"secret-a", SESSION_CONTEXT).unwrap();
        let b = derive(b"secret-b", SESSION_CONTEXT).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_derive_matches_rfc4231_case_2() {
        // RFC 4231 test case 2: key "Jefe", data "what do ya want for nothing?"
        let key = derive(b"Jefe", b"what do ya want for nothing?").unwrap();
        let expected: [u8; 32] = [
            0x5b, 0xdc, 0xc1, 0x46, 0xbf, 0x60, 0x75, 0x4e, 0x6a, 0x04, 0x24, 0x26, 0x08, 0x95,
            0x75, 0xc7, 0x5a, 0x00, 0x3f, 0x08, 0x9d, 0x27, 0x39, 0x83, 0x9d, 0xec, 0x58, 0xb9,
            0x64, 0xec, 0x38, 0x43,
        ];
        assert_eq!(key.as_bytes(), &expected);
    }

    #[test]
    fn test_handshake_key_is_sha256_of_seed() {
        let expected = Sha256::digest(b"voltage-handshake");
        assert_eq!(&handshake_key().as_bytes()[..], &expected[..]);
        assert_eq!(handshake_key(), handshake_key());
    }

    #[test]
    fn test_session_key_agreement() {
        let alice = KeyPair::generate().unwrap();
        let bob = KeyPair::generate().unwrap();

        let alice_key = session_key(&alice.diffie_hellman(&bob.public_key())).unwrap();
        let bob_key = session_key(&bob.diffie_hellman(&alice.public_key())).unwrap();

        assert_eq!(alice_key, bob_key);
        assert_ne!(alice_key, handshake_key());
    }

    #[test]
    fn test_session_key_debug_redacted() {
        assert_eq!(format!("{:?}", handshake_key()), "SessionKey([REDACTED])");
    }
}
