//! P-256 key pairs and ECDH key agreement.
//!
//! This module provides key pair generation from the operating system's
//! random source, SEC1 public key parsing, shared-secret derivation, and
//! human-readable key fingerprints.

use p256::ecdh::diffie_hellman;
use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::{PublicKey, SecretKey};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::error::{ProtocolError, Result};

/// Length of a private key (a P-256 scalar) in bytes.
pub const PRIVATE_KEY_LENGTH: usize = 32;

/// Length of an uncompressed SEC1 public key in bytes.
pub const PUBLIC_KEY_LENGTH: usize = 65;

/// Length of an ECDH shared secret in bytes.
pub const SHARED_SECRET_LENGTH: usize = 32;

/// Number of key-hash bytes shown in a fingerprint.
pub const FINGERPRINT_LENGTH: usize = 16;

/// SEC1 tag byte of an uncompressed point.
const UNCOMPRESSED_TAG: u8 = 0x04;

/// Scalars at or above the group order are redrawn; this bounds the loop.
const MAX_KEYGEN_ATTEMPTS: usize = 8;

/// Formats the fingerprint of a public key.
///
/// The public key is hashed with SHA-256 and the first 16 bytes are shown as
/// groups of 4 hex characters separated by colons, for example:
/// `a1b2:c3d4:e5f6:7890:1234:5678:9abc:def0`
pub fn fingerprint(public_key: &[u8]) -> String {
    let hash = Sha256::digest(public_key);
    hash[..FINGERPRINT_LENGTH]
        .chunks(2)
        .map(|chunk| format!("{:02x}{:02x}", chunk[0], chunk[1]))
        .collect::<Vec<_>>()
        .join(":")
}

/// A local P-256 key pair.
///
/// The private scalar never leaves this struct except through
/// [`KeyPair::private_key_bytes`], which exists to persist a stable identity.
#[derive(Clone)]
pub struct KeyPair {
    secret: SecretKey,
    public: PublicKey,
}

impl KeyPair {
    /// Generates a new random key pair.
    ///
    /// Fails only if the operating system's random source fails.
    pub fn generate() -> Result<Self> {
        let mut bytes = Zeroizing::new([0u8; PRIVATE_KEY_LENGTH]);

        for _ in 0..MAX_KEYGEN_ATTEMPTS {
            OsRng
                .try_fill_bytes(&mut bytes[..])
                .map_err(|e| ProtocolError::Key(format!("random source failure: {}", e)))?;

            if let Ok(secret) = SecretKey::from_slice(&bytes[..]) {
                return Ok(Self::from_secret(secret));
            }
        }

        Err(ProtocolError::Key(
            "random source produced no valid scalar".to_string(),
        ))
    }

    /// Creates a key pair from a 32-byte big-endian private scalar.
    ///
    /// The public key is derived from the private key.
    pub fn from_private_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != PRIVATE_KEY_LENGTH {
            return Err(ProtocolError::Key(format!(
                "invalid private key length: expected {}, got {}",
                PRIVATE_KEY_LENGTH,
                bytes.len()
            )));
        }

        let secret = SecretKey::from_slice(bytes)
            .map_err(|_| ProtocolError::Key("private key is not a valid P-256 scalar".to_string()))?;
        Ok(Self::from_secret(secret))
    }

    fn from_secret(secret: SecretKey) -> Self {
        let public = secret.public_key();
        Self { secret, public }
    }

    /// Returns the private scalar bytes.
    ///
    /// **Security Warning**: The private key should be kept confidential.
    /// Only use this method for secure storage. The buffer is wiped on drop.
    pub fn private_key_bytes(&self) -> Zeroizing<[u8; PRIVATE_KEY_LENGTH]> {
        let mut out = Zeroizing::new([0u8; PRIVATE_KEY_LENGTH]);
        out.copy_from_slice(&self.secret.to_bytes());
        out
    }

    /// Returns the public key as a 65-byte uncompressed SEC1 point.
    pub fn public_key_bytes(&self) -> Vec<u8> {
        self.public.to_encoded_point(false).as_bytes().to_vec()
    }

    /// Returns the public half as a [`PeerPublicKey`].
    pub fn public_key(&self) -> PeerPublicKey {
        PeerPublicKey(self.public)
    }

    /// Generates a human-readable fingerprint of the public key.
    pub fn fingerprint(&self) -> String {
        fingerprint(&self.public_key_bytes())
    }

    /// Performs ECDH with a peer's public key.
    ///
    /// Deterministic: `a.diffie_hellman(&b.public_key())` equals
    /// `b.diffie_hellman(&a.public_key())`.
    pub fn diffie_hellman(&self, peer: &PeerPublicKey) -> SharedSecret {
        let shared = diffie_hellman(self.secret.to_nonzero_scalar(), peer.0.as_affine());
        let mut bytes = [0u8; SHARED_SECRET_LENGTH];
        bytes.copy_from_slice(shared.raw_secret_bytes());
        SharedSecret(bytes)
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("fingerprint", &self.fingerprint())
            .field("private_key", &"[REDACTED]")
            .finish()
    }
}

/// A remote peer's validated public key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerPublicKey(PublicKey);

impl PeerPublicKey {
    /// Parses an uncompressed SEC1 point.
    ///
    /// Rejects compressed encodings, wrong lengths, points not on P-256 and
    /// the identity point.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != PUBLIC_KEY_LENGTH {
            return Err(ProtocolError::Key(format!(
                "invalid public key length: expected {}, got {}",
                PUBLIC_KEY_LENGTH,
                bytes.len()
            )));
        }

        if bytes[0] != UNCOMPRESSED_TAG {
            return Err(ProtocolError::Key(format!(
                "public key is not an uncompressed point: tag {:#04x}",
                bytes[0]
            )));
        }

        let public = PublicKey::from_sec1_bytes(bytes)
            .map_err(|_| ProtocolError::Key("public key is not a point on P-256".to_string()))?;
        Ok(Self(public))
    }

    /// Returns the key as a 65-byte uncompressed SEC1 point.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.to_encoded_point(false).as_bytes().to_vec()
    }

    /// Generates a human-readable fingerprint of this key.
    pub fn fingerprint(&self) -> String {
        fingerprint(&self.to_bytes())
    }
}

/// Raw ECDH output. Wiped on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SharedSecret([u8; SHARED_SECRET_LENGTH]);

impl SharedSecret {
    /// Returns the raw secret bytes.
    pub fn as_bytes(&self) -> &[u8; SHARED_SECRET_LENGTH] {
        &self.0
    }
}

impl std::fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SharedSecret([REDACTED])")
    }
}
