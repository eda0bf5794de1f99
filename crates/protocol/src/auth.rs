//! HMAC-SHA256 message authentication.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::Result;
use crate::kdf::{self, SessionKey};
use crate::message::{WireMessage, MAC_SIZE};

type HmacSha256 = Hmac<Sha256>;

/// Computes and verifies message MACs under one key.
///
/// The MAC covers `version ‖ type ‖ timestamp (8 bytes BE) ‖ payload`.
/// The keyed HMAC state is built once and cloned per message.
#[derive(Clone)]
pub struct Authenticator {
    keyed: HmacSha256,
}

impl Authenticator {
    /// Creates an authenticator keyed with `key`.
    pub fn new(key: &SessionKey) -> Result<Self> {
        let keyed = HmacSha256::new_from_slice(key.as_bytes())?;
        Ok(Self { keyed })
    }

    /// Creates the authenticator for handshake messages, keyed with the
    /// fixed public handshake key.
    pub fn for_handshake() -> Result<Self> {
        Self::new(&kdf::handshake_key())
    }

    fn digest(&self, message: &WireMessage) -> HmacSha256 {
        let mut mac = self.keyed.clone();
        mac.update(&[message.version, message.msg_type]);
        mac.update(&message.timestamp.to_be_bytes());
        mac.update(&message.payload);
        mac
    }

    /// Computes the MAC of a message, ignoring any MAC it already carries.
    pub fn mac(&self, message: &WireMessage) -> [u8; MAC_SIZE] {
        let mut tag = [0u8; MAC_SIZE];
        tag.copy_from_slice(&self.digest(message).finalize().into_bytes());
        tag
    }

    /// Fills in the message's MAC.
    pub fn sign(&self, message: &mut WireMessage) {
        message.mac = Some(self.mac(message));
    }

    /// Verifies the message's MAC in constant time.
    ///
    /// A message without a MAC never verifies.
    pub fn verify(&self, message: &WireMessage) -> bool {
        match &message.mac {
            Some(tag) => self.digest(message).verify_slice(tag).is_ok(),
            None => false,
        }
    }
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Authenticator([REDACTED])")
    }
}
