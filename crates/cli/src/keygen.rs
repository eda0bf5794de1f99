//! Identity key generation.

use std::path::Path;

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::Serialize;
use voltage_protocol::KeyPair;

use crate::config::Config;

/// Printable form of a generated identity.
#[derive(Clone, Serialize, PartialEq, Eq)]
pub struct Identity {
    /// The 32-byte private scalar encoded as base64.
    pub private_key: String,

    /// The 65-byte uncompressed public key encoded as base64.
    pub public_key: String,

    /// Fingerprint of the public key.
    pub fingerprint: String,
}

impl Identity {
    /// Creates the printable form of a key pair.
    pub fn from_keys(keys: &KeyPair) -> Self {
        Self {
            private_key: BASE64.encode(keys.private_key_bytes().as_slice()),
            public_key: BASE64.encode(keys.public_key_bytes()),
            fingerprint: keys.fingerprint(),
        }
    }
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity")
            .field("public_key", &self.public_key)
            .field("fingerprint", &self.fingerprint)
            .finish_non_exhaustive()
    }
}

/// Generates a new identity key pair.
pub fn generate() -> Result<KeyPair> {
    KeyPair::generate().context("Failed to generate key pair")
}

/// Writes `keys` into the `[channel]` section of the config file at `path`,
/// keeping every other setting.
pub fn store(path: &Path, keys: &KeyPair) -> Result<()> {
    let mut config = Config::load(path)?;
    config.channel.set_private_key(keys);
    config.save(path)?;

    tracing::info!(fingerprint = %keys.fingerprint(), "Stored identity in {:?}", path);
    Ok(())
}
