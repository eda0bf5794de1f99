//! Ephemeral ECDH handshake.
//!
//! Two messages turn two P-256 key pairs into one shared session key:
//!
//! ```text
//! initiator                                   responder
//!   Handshake { payload: pubkey_i, mac_h } ->
//!                                          <- Ack { payload: pubkey_r, mac_h }
//! session_key = HMAC-SHA256(ECDH(priv, peer_pub), "voltage-session")
//! ```
//!
//! `mac_h` is computed with the fixed handshake key (see [`crate::kdf`]), so it
//! only detects corruption and protocol mismatch. It does not prove who sent
//! the key.
//!
//! A machine that fails a step moves to [`HandshakePhase::Failed`] and refuses
//! further steps. Retrying must start from a fresh key pair.

use tracing::debug;

use crate::auth::Authenticator;
use crate::error::{ProtocolError, Result};
use crate::kdf::{self, SessionKey};
use crate::keys::{KeyPair, PeerPublicKey};
use crate::message::{MessageType, WireMessage};

/// State of the handshake process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakePhase {
    /// Initiator: ready to send the key offer
    Init,
    /// Initiator: key offer sent, waiting for the Ack
    AwaitingAck,
    /// Responder: waiting for the key offer
    AwaitingPeerKey,
    /// Session key derived
    Established,
    /// A step failed; this machine can no longer be used
    Failed,
}

/// Role in the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Sends the first message
    Initiator,
    /// Answers the first message
    Responder,
}

/// Result of a successful handshake.
#[derive(Debug)]
pub struct Established {
    /// The derived session key.
    pub session_key: SessionKey,
    /// The peer's public key, as received.
    pub peer_public: PeerPublicKey,
}

/// The handshake state machine.
///
/// ## Usage
///
/// ```
/// use voltage_protocol::handshake::Handshake;
/// use voltage_protocol::KeyPair;
///
/// let alice = KeyPair::generate()?;
/// let bob = KeyPair::generate()?;
///
/// let mut initiator = Handshake::initiator()?;
/// let mut responder = Handshake::responder()?;
///
/// let offer = initiator.initiate(&alice)?;
/// let (bob_session, ack) = responder.respond(&bob, &offer)?;
/// let alice_session = initiator.complete(&alice, &ack)?;
///
/// assert_eq!(alice_session.session_key, bob_session.session_key);
/// # Ok::<(), voltage_protocol::ProtocolError>(())
/// ```
#[derive(Debug)]
pub struct Handshake {
    role: Role,
    phase: HandshakePhase,
    authenticator: Authenticator,
}

impl Handshake {
    /// Creates a machine for the side that sends the first message.
    pub fn initiator() -> Result<Self> {
        Ok(Self {
            role: Role::Initiator,
            phase: HandshakePhase::Init,
            authenticator: Authenticator::for_handshake()?,
        })
    }

    /// Creates a machine for the side that answers the first message.
    pub fn responder() -> Result<Self> {
        Ok(Self {
            role: Role::Responder,
            phase: HandshakePhase::AwaitingPeerKey,
            authenticator: Authenticator::for_handshake()?,
        })
    }

    /// Returns the current phase.
    pub fn phase(&self) -> HandshakePhase {
        self.phase
    }

    /// Returns the role.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Returns whether the session key has been derived.
    pub fn is_established(&self) -> bool {
        self.phase == HandshakePhase::Established
    }

    fn require(&self, role: Role, phase: HandshakePhase, step: &str) -> Result<()> {
        if self.role != role || self.phase != phase {
            return Err(ProtocolError::InvalidState(format!(
                "cannot {} as {:?} in phase {:?}",
                step, self.role, self.phase
            )));
        }
        Ok(())
    }

    /// Initiator step 1: builds the key offer.
    pub fn initiate(&mut self, keys: &KeyPair) -> Result<WireMessage> {
        self.require(Role::Initiator, HandshakePhase::Init, "initiate")?;

        let offer = self.key_message(MessageType::Handshake, keys);
        self.phase = HandshakePhase::AwaitingAck;
        debug!(fingerprint = %keys.fingerprint(), "handshake offer created");

        Ok(offer)
    }

    /// Responder step 2: accepts the key offer and builds the Ack.
    ///
    /// The session key is derived before the Ack is returned.
    pub fn respond(
        &mut self,
        keys: &KeyPair,
        offer: &WireMessage,
    ) -> Result<(Established, WireMessage)> {
        self.require(Role::Responder, HandshakePhase::AwaitingPeerKey, "respond")?;

        let established = self.accept(keys, offer, MessageType::Handshake)?;
        let ack = self.key_message(MessageType::Ack, keys);
        debug!(peer = %established.peer_public.fingerprint(), "handshake offer accepted");

        Ok((established, ack))
    }

    /// Initiator step 3: accepts the Ack.
    pub fn complete(&mut self, keys: &KeyPair, ack: &WireMessage) -> Result<Established> {
        self.require(Role::Initiator, HandshakePhase::AwaitingAck, "complete")?;

        let established = self.accept(keys, ack, MessageType::Ack)?;
        debug!(peer = %established.peer_public.fingerprint(), "handshake ack accepted");

        Ok(established)
    }

    fn key_message(&self, msg_type: MessageType, keys: &KeyPair) -> WireMessage {
        let mut message = WireMessage::new(msg_type, keys.public_key_bytes());
        self.authenticator.sign(&mut message);
        message
    }

    /// Validates a peer key message and derives the session key, moving to
    /// `Established` on success and `Failed` on any error.
    fn accept(
        &mut self,
        keys: &KeyPair,
        message: &WireMessage,
        expected: MessageType,
    ) -> Result<Established> {
        match self.derive(keys, message, expected) {
            Ok(established) => {
                self.phase = HandshakePhase::Established;
                Ok(established)
            }
            Err(e) => {
                debug!(error = %e, role = ?self.role, "handshake step failed");
                self.phase = HandshakePhase::Failed;
                Err(e)
            }
        }
    }

    fn derive(
        &self,
        keys: &KeyPair,
        message: &WireMessage,
        expected: MessageType,
    ) -> Result<Established> {
        if message.msg_type != expected.as_byte() {
            return Err(ProtocolError::UnexpectedMessage {
                expected,
                got: message.msg_type,
            });
        }

        if !self.authenticator.verify(message) {
            return Err(ProtocolError::Authentication);
        }

        let peer_public = PeerPublicKey::from_bytes(&message.payload)?;
        let shared = keys.diffie_hellman(&peer_public);
        let session_key = kdf::session_key(&shared)?;

        Ok(Established {
            session_key,
            peer_public,
        })
    }
}
