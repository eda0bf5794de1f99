//! AES-256-GCM payload encryption.
//!
//! Ciphertext layout: `nonce (12 bytes) ‖ ciphertext ‖ tag (16 bytes)`.
//! Every call to [`AeadCipher::encrypt`] draws a fresh random nonce from the
//! operating system. A failing random source is an error, never a fallback.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;

use crate::error::{ProtocolError, Result};
use crate::kdf::SessionKey;

/// AES-GCM nonce size in bytes.
pub const NONCE_SIZE: usize = 12;

/// AES-GCM tag size in bytes.
pub const TAG_SIZE: usize = 16;

/// Bytes added to every plaintext by [`AeadCipher::encrypt`].
pub const CIPHER_OVERHEAD: usize = NONCE_SIZE + TAG_SIZE;

/// Authenticated encryption under one session key.
#[derive(Clone)]
pub struct AeadCipher {
    cipher: Aes256Gcm,
}

impl AeadCipher {
    /// Creates a cipher keyed with `key`.
    pub fn new(key: &SessionKey) -> Self {
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()));
        Self { cipher }
    }

    /// Encrypts `plaintext` under a fresh random nonce.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let mut nonce = [0u8; NONCE_SIZE];
        OsRng
            .try_fill_bytes(&mut nonce)
            .map_err(|e| ProtocolError::Encryption(format!("nonce generation failed: {}", e)))?;

        let sealed = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|e| ProtocolError::Encryption(e.to_string()))?;

        let mut output = Vec::with_capacity(NONCE_SIZE + sealed.len());
        output.extend_from_slice(&nonce);
        output.extend_from_slice(&sealed);
        Ok(output)
    }

    /// Decrypts `nonce ‖ ciphertext ‖ tag`.
    ///
    /// Short input and a bad tag both yield [`ProtocolError::Decryption`].
    pub fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>> {
        if data.len() < NONCE_SIZE {
            return Err(ProtocolError::Decryption);
        }

        let (nonce, sealed) = data.split_at(NONCE_SIZE);
        self.cipher
            .decrypt(Nonce::from_slice(nonce), sealed)
            .map_err(|_| ProtocolError::Decryption)
    }
}

impl std::fmt::Debug for AeadCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AeadCipher([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn cipher(seed: u8) -> AeadCipher {
        AeadCipher::new(&SessionKey::from_bytes([seed; 32]))
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let cipher = cipher(1);
        let plaintext = b"Hello, secure world!";

        let sealed = cipher.encrypt(plaintext).unwrap();
        assert_eq!(sealed.len(), plaintext.len() + CIPHER_OVERHEAD);
        assert_eq!(cipher.decrypt(&sealed).unwrap(), plaintext);
    }

    #[test]
    fn test_empty_plaintext() {
        let cipher = cipher(1);
        let sealed = cipher.encrypt(&[]).unwrap();
        assert_eq!(sealed.len(), CIPHER_OVERHEAD);
        assert!(cipher.decrypt(&sealed).unwrap().is_empty());
    }

    #[test]
    fn test_nonces_are_fresh() {
        let cipher = cipher(1);
        let nonces: HashSet<Vec<u8>> = (0..64)
            .map(|_| cipher.encrypt(b"same").unwrap()[..NONCE_SIZE].to_vec())
            .collect();
        assert_eq!(nonces.len(), 64);
    }

    #[test]
    fn test_same_plaintext_different_ciphertext() {
        let cipher = cipher(1);
        assert_ne!(cipher.encrypt(b"same").unwrap(), cipher.encrypt(b"same").unwrap());
    }

    #[test]
    fn test_wrong_key_fails() {
        let sealed = cipher(1).encrypt(b"secret").unwrap();
        assert!(matches!(cipher(2).decrypt(&sealed), Err(ProtocolError::Decryption)));
    }

    #[test]
    fn test_tampering_fails() {
        let cipher = cipher(1);
        let sealed = cipher.encrypt(b"secret message").unwrap();

        for i in 0..sealed.len() {
            let mut tampered = sealed.clone();
            tampered[i] ^= 0x01;
            assert!(
                matches!(cipher.decrypt(&tampered), Err(ProtocolError::Decryption)),
                "flipping byte {} must fail",
                i
            );
        }
    }

    #[test]
    fn test_short_input_is_generic_failure() {
        let cipher = cipher(1);
        let short = cipher.decrypt(&[0u8; NONCE_SIZE - 1]).unwrap_err();
        let no_tag = cipher.decrypt(&[0u8; NONCE_SIZE + 3]).unwrap_err();
        let bad_tag = cipher.decrypt(&[0u8; NONCE_SIZE + TAG_SIZE + 4]).unwrap_err();

        assert_eq!(short.to_string(), bad_tag.to_string());
        assert_eq!(no_tag.to_string(), bad_tag.to_string());
    }
}
