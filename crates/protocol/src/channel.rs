//! The secure channel: handshake orchestration plus authenticated encryption.
//!
//! A [`SecureChannel`] owns one key pair and walks through an explicit
//! lifecycle:
//!
//! ```text
//! Idle ──start_handshake──> Handshaking ──complete_handshake──> Established
//!   └───────────────process_handshake───────────────────────────────┘
//! any failed handshake step ──> Failed      close() ──> Closed
//! ```
//!
//! Only `Established` reports [`ChannelState::Connected`]. `Failed` and
//! `Closed` are terminal: a new handshake needs a new channel, and with it
//! fresh ephemeral key material.
//!
//! Received messages older than a fixed 300 second tolerance are rejected.
//! There is no replay cache: a captured message replayed inside that window is
//! accepted.

use tracing::{debug, info, warn};

use crate::auth::Authenticator;
use crate::cipher::AeadCipher;
use crate::compression::{CompressionKind, Compressor, NoCompression, MAX_DECOMPRESSED_SIZE};
use crate::error::{ProtocolError, Result};
use crate::handshake::{Established, Handshake, Role};
use crate::keys::{KeyPair, PeerPublicKey};
use crate::message::{unix_now, MessageType, WireMessage, MAX_PAYLOAD_SIZE, PROTOCOL_VERSION};

/// Maximum accepted message age. Future-dated messages are not rejected.
pub const SKEW_TOLERANCE_SECS: i64 = 300;

/// Payload carried by heartbeat messages.
pub const HEARTBEAT_PAYLOAD: &[u8] = b"ping";

/// Channel construction options.
#[derive(Clone, Default)]
pub struct ChannelConfig {
    /// Compress payloads with LZ4 before encryption. Both peers must agree.
    pub enable_compression: bool,
    /// 32-byte P-256 private scalar for a stable identity. A fresh key pair
    /// is generated when absent.
    pub private_key: Option<Vec<u8>>,
}

impl ChannelConfig {
    /// Creates a configuration with compression disabled and a generated key.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables compression.
    pub fn with_compression(mut self, enabled: bool) -> Self {
        self.enable_compression = enabled;
        self
    }

    /// Uses a fixed private key.
    pub fn with_private_key(mut self, private_key: Vec<u8>) -> Self {
        self.private_key = Some(private_key);
        self
    }

    /// Returns the compression strategy this configuration selects.
    pub fn compression(&self) -> CompressionKind {
        if self.enable_compression {
            CompressionKind::Lz4
        } else {
            CompressionKind::None
        }
    }
}

impl std::fmt::Debug for ChannelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelConfig")
            .field("enable_compression", &self.enable_compression)
            .field(
                "private_key",
                &self.private_key.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// Externally visible connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// No session key is installed.
    Disconnected,
    /// A session key is installed; encrypt and decrypt are available.
    Connected,
}

/// Keys installed by a successful handshake.
struct Session {
    authenticator: Authenticator,
    cipher: AeadCipher,
    peer_public: PeerPublicKey,
}

impl Session {
    fn new(established: Established) -> Result<Self> {
        Ok(Self {
            authenticator: Authenticator::new(&established.session_key)?,
            cipher: AeadCipher::new(&established.session_key),
            peer_public: established.peer_public,
        })
    }
}

enum Lifecycle {
    Idle,
    Handshaking(Handshake),
    Established(Session),
    Failed,
    Closed,
}

impl Lifecycle {
    fn describe(&self) -> &'static str {
        match self {
            Lifecycle::Idle => "idle",
            Lifecycle::Handshaking(_) => "handshaking",
            Lifecycle::Established(_) => "established",
            Lifecycle::Failed => "failed",
            Lifecycle::Closed => "closed",
        }
    }
}

/// A point-to-point secure channel.
///
/// The channel produces and consumes [`WireMessage`]s; moving them between
/// peers is the caller's job.
///
/// ## Usage
///
/// ```
/// use voltage_protocol::{ChannelConfig, SecureChannel};
///
/// let mut alice = SecureChannel::new(&ChannelConfig::new())?;
/// let mut bob = SecureChannel::new(&ChannelConfig::new())?;
///
/// let offer = alice.start_handshake()?;
/// let ack = bob.process_handshake(&offer)?;
/// alice.complete_handshake(&ack)?;
///
/// let message = alice.encrypt(b"hello")?;
/// assert_eq!(bob.decrypt(&message)?, b"hello");
/// # Ok::<(), voltage_protocol::ProtocolError>(())
/// ```
pub struct SecureChannel {
    keys: KeyPair,
    compression: CompressionKind,
    compressor: Box<dyn Compressor>,
    lifecycle: Lifecycle,
}

impl SecureChannel {
    /// Creates a channel from configuration.
    ///
    /// Uses the configured private key if present, otherwise generates a key pair.
    pub fn new(config: &ChannelConfig) -> Result<Self> {
        let keys = match &config.private_key {
            Some(bytes) => KeyPair::from_private_bytes(bytes)?,
            None => KeyPair::generate()?,
        };
        Ok(Self::with_keys(keys, config.compression()))
    }

    /// Creates a channel around an existing key pair.
    pub fn with_keys(keys: KeyPair, compression: CompressionKind) -> Self {
        debug!(
            fingerprint = %keys.fingerprint(),
            compression = ?compression,
            "secure channel created"
        );
        Self {
            keys,
            compression,
            compressor: compression.build(),
            lifecycle: Lifecycle::Idle,
        }
    }

    /// Returns this channel's public key as an uncompressed SEC1 point.
    pub fn public_key_bytes(&self) -> Vec<u8> {
        self.keys.public_key_bytes()
    }

    /// Returns the fingerprint of this channel's public key.
    pub fn fingerprint(&self) -> String {
        self.keys.fingerprint()
    }

    /// Returns the fingerprint of the peer's public key once connected.
    pub fn peer_fingerprint(&self) -> Option<String> {
        match &self.lifecycle {
            Lifecycle::Established(session) => Some(session.peer_public.fingerprint()),
            _ => None,
        }
    }

    /// Returns the configured compression strategy.
    pub fn compression(&self) -> CompressionKind {
        self.compression
    }

    /// Returns the connection state.
    pub fn state(&self) -> ChannelState {
        match self.lifecycle {
            Lifecycle::Established(_) => ChannelState::Connected,
            _ => ChannelState::Disconnected,
        }
    }

    /// Returns whether a session is established.
    pub fn is_connected(&self) -> bool {
        self.state() == ChannelState::Connected
    }

    fn session(&self) -> Result<&Session> {
        match &self.lifecycle {
            Lifecycle::Established(session) => Ok(session),
            _ => Err(ProtocolError::NotConnected),
        }
    }

    fn refuse(&self, step: &str) -> ProtocolError {
        let reason = match self.lifecycle {
            Lifecycle::Failed => "a previous handshake step failed; use a new channel",
            Lifecycle::Closed => "the channel is closed",
            Lifecycle::Established(_) => "a session is already established",
            _ => "it is not allowed in this state",
        };
        ProtocolError::InvalidState(format!(
            "cannot {} while {}: {}",
            step,
            self.lifecycle.describe(),
            reason
        ))
    }

    fn install(&mut self, established: Established) -> Result<()> {
        let session = Session::new(established)?;
        info!(
            local = %self.keys.fingerprint(),
            peer = %session.peer_public.fingerprint(),
            "secure session established"
        );
        self.lifecycle = Lifecycle::Established(session);
        Ok(())
    }

    /// Initiator step 1: returns the key offer to send to the peer.
    pub fn start_handshake(&mut self) -> Result<WireMessage> {
        if !matches!(self.lifecycle, Lifecycle::Idle) {
            return Err(self.refuse("start a handshake"));
        }

        let mut handshake = Handshake::initiator()?;
        let offer = handshake.initiate(&self.keys)?;
        self.lifecycle = Lifecycle::Handshaking(handshake);
        Ok(offer)
    }

    /// Responder step: accepts the peer's key offer, installs the session
    /// key, and returns the Ack to send back.
    pub fn process_handshake(&mut self, offer: &WireMessage) -> Result<WireMessage> {
        if !matches!(self.lifecycle, Lifecycle::Idle) {
            return Err(self.refuse("process a handshake"));
        }

        // Any early return below leaves the channel failed
        self.lifecycle = Lifecycle::Failed;

        let mut handshake = Handshake::responder()?;
        let (established, ack) = handshake.respond(&self.keys, offer).map_err(|e| {
            warn!(error = %e, "rejected handshake offer");
            e
        })?;
        self.install(established)?;
        Ok(ack)
    }

    /// Initiator step 3: accepts the peer's Ack and installs the session key.
    pub fn complete_handshake(&mut self, ack: &WireMessage) -> Result<()> {
        let mut handshake = match std::mem::replace(&mut self.lifecycle, Lifecycle::Failed) {
            Lifecycle::Handshaking(handshake) if handshake.role() == Role::Initiator => handshake,
            other => {
                self.lifecycle = other;
                return Err(self.refuse("complete a handshake"));
            }
        };

        let established = handshake.complete(&self.keys, ack).map_err(|e| {
            warn!(error = %e, "rejected handshake ack");
            e
        })?;
        self.install(established)
    }

    /// Encrypts an application payload into a Data message stamped with the
    /// local clock.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<WireMessage> {
        self.encrypt_at(plaintext, unix_now())
    }

    /// Encrypts an application payload into a Data message with an explicit
    /// timestamp.
    ///
    /// Plaintexts larger than a peer will decompress are refused up front.
    pub fn encrypt_at(&self, plaintext: &[u8], timestamp: i64) -> Result<WireMessage> {
        let session = self.session()?;

        if plaintext.len() > MAX_DECOMPRESSED_SIZE {
            return Err(ProtocolError::Format(format!(
                "plaintext too large: {} bytes exceeds maximum of {} bytes",
                plaintext.len(),
                MAX_DECOMPRESSED_SIZE
            )));
        }

        let compressed = self.compressor.compress(plaintext)?;
        let sealed = session.cipher.encrypt(&compressed)?;
        if sealed.len() > MAX_PAYLOAD_SIZE {
            return Err(ProtocolError::Format(format!(
                "payload too large: {} bytes exceeds maximum of {} bytes",
                sealed.len(),
                MAX_PAYLOAD_SIZE
            )));
        }

        let mut message = WireMessage::with_timestamp(MessageType::Data, sealed, timestamp);
        session.authenticator.sign(&mut message);
        Ok(message)
    }

    /// Authenticates and decrypts a Data message against the local clock.
    pub fn decrypt(&self, message: &WireMessage) -> Result<Vec<u8>> {
        self.decrypt_at(message, unix_now())
    }

    /// Authenticates and decrypts a Data message, judging its age against `now`.
    ///
    /// Checks run in order: MAC, version, type, clock skew, AEAD, decompression.
    pub fn decrypt_at(&self, message: &WireMessage, now: i64) -> Result<Vec<u8>> {
        let session = self.session()?;
        check_message(session, message, MessageType::Data, now)?;

        let plaintext = session.cipher.decrypt(&message.payload).map_err(|e| {
            warn!("rejected data message: payload failed to decrypt");
            e
        })?;
        self.compressor.decompress(&plaintext)
    }

    /// Builds a heartbeat.
    ///
    /// The heartbeat is MAC'd only when connected. Before that it carries no
    /// MAC and proves nothing about its sender.
    pub fn create_heartbeat(&self) -> WireMessage {
        let mut message = WireMessage::new(MessageType::Heartbeat, HEARTBEAT_PAYLOAD.to_vec());
        if let Lifecycle::Established(session) = &self.lifecycle {
            session.authenticator.sign(&mut message);
        }
        message
    }

    /// Checks a received heartbeat: type, MAC, version and clock skew.
    pub fn check_heartbeat(&self, message: &WireMessage) -> Result<()> {
        self.check_heartbeat_at(message, unix_now())
    }

    /// Checks a received heartbeat against an explicit clock.
    pub fn check_heartbeat_at(&self, message: &WireMessage, now: i64) -> Result<()> {
        let session = self.session()?;
        check_message(session, message, MessageType::Heartbeat, now)
    }

    /// Closes the channel.
    ///
    /// The session is dropped: the AES key schedule is wiped, while the keyed
    /// HMAC state is freed without wiping. The compression strategy is
    /// released. The channel cannot be reconnected.
    pub fn close(&mut self) {
        if !matches!(self.lifecycle, Lifecycle::Closed) {
            info!(fingerprint = %self.keys.fingerprint(), "secure channel closed");
        }
        self.lifecycle = Lifecycle::Closed;
        self.compressor = Box::new(NoCompression);
    }
}

impl std::fmt::Debug for SecureChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureChannel")
            .field("fingerprint", &self.keys.fingerprint())
            .field("compression", &self.compression)
            .field("lifecycle", &self.lifecycle.describe())
            .finish()
    }
}

/// Runs the integrity checks shared by every received session message.
fn check_message(
    session: &Session,
    message: &WireMessage,
    expected: MessageType,
    now: i64,
) -> Result<()> {
    if !session.authenticator.verify(message) {
        warn!(msg_type = message.msg_type, "rejected message: MAC mismatch");
        return Err(ProtocolError::Authentication);
    }

    if message.version != PROTOCOL_VERSION {
        return Err(ProtocolError::UnsupportedVersion(message.version));
    }

    if message.msg_type != expected.as_byte() {
        return Err(ProtocolError::UnexpectedMessage {
            expected,
            got: message.msg_type,
        });
    }

    let age = message.age_seconds(now);
    if age > SKEW_TOLERANCE_SECS {
        warn!(age, "rejected message: timestamp outside tolerance");
        return Err(ProtocolError::Timestamp {
            age,
            tolerance: SKEW_TOLERANCE_SECS,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connected_pair(compression: bool) -> (SecureChannel, SecureChannel) {
        let config = ChannelConfig::new().with_compression(compression);
        let mut alice = SecureChannel::new(&config).unwrap();
        let mut bob = SecureChannel::new(&config).unwrap();

        let offer = alice.start_handshake().unwrap();
        let ack = bob.process_handshake(&offer).unwrap();
        alice.complete_handshake(&ack).unwrap();
        (alice, bob)
    }

    #[test]
    fn test_new_channel_is_disconnected() {
        let channel = SecureChannel::new(&ChannelConfig::new()).unwrap();
        assert_eq!(channel.state(), ChannelState::Disconnected);
        assert!(!channel.is_connected());
        assert!(channel.peer_fingerprint().is_none());
        assert_eq!(channel.public_key_bytes().len(), 65);
    }

    #[test]
    fn test_configured_private_key_gives_stable_identity() {
        let keys = KeyPair::generate().unwrap();
        let config = ChannelConfig::new().with_private_key(keys.private_key_bytes().to_vec());

        let first = SecureChannel::new(&config).unwrap();
        let second = SecureChannel::new(&config).unwrap();
        assert_eq!(first.public_key_bytes(), keys.public_key_bytes());
        assert_eq!(first.fingerprint(), second.fingerprint());
    }

    #[test]
    fn test_invalid_private_key_rejected() {
        let config = ChannelConfig::new().with_private_key(vec![0u8; 32]);
        assert!(matches!(
            SecureChannel::new(&config),
            Err(ProtocolError::Key(_))
        ));
    }

    #[test]
    fn test_handshake_connects_both_sides() {
        let (alice, bob) = connected_pair(false);
        assert!(alice.is_connected());
        assert!(bob.is_connected());
        assert_eq!(alice.peer_fingerprint(), Some(bob.fingerprint()));
        assert_eq!(bob.peer_fingerprint(), Some(alice.fingerprint()));
    }

    #[test]
    fn test_initiator_not_connected_until_complete() {
        let mut alice = SecureChannel::new(&ChannelConfig::new()).unwrap();
        alice.start_handshake().unwrap();
        assert!(!alice.is_connected());
        assert!(matches!(alice.encrypt(b"x"), Err(ProtocolError::NotConnected)));
    }

    #[test]
    fn test_roundtrip_both_directions() {
        let (alice, bob) = connected_pair(false);

        let to_bob = alice.encrypt(b"hello bob").unwrap();
        assert_eq!(bob.decrypt(&to_bob).unwrap(), b"hello bob");

        let to_alice = bob.encrypt(b"hello alice").unwrap();
        assert_eq!(alice.decrypt(&to_alice).unwrap(), b"hello alice");
    }

    #[test]
    fn test_roundtrip_with_compression() {
        let (alice, bob) = connected_pair(true);
        assert_eq!(alice.compression(), CompressionKind::Lz4);

        let plaintext = vec![b'a'; 8192];
        let message = alice.encrypt(&plaintext).unwrap();
        assert!(message.payload.len() < plaintext.len());
        assert_eq!(bob.decrypt(&message).unwrap(), plaintext);
    }

    #[test]
    fn test_encrypted_message_shape() {
        let (alice, _) = connected_pair(false);
        let message = alice.encrypt(b"hello").unwrap();

        assert_eq!(message.kind(), Some(MessageType::Data));
        assert!(message.is_valid());
        assert_eq!(message.payload.len(), 5 + crate::cipher::CIPHER_OVERHEAD);
    }

    #[test]
    fn test_operations_before_handshake() {
        let channel = SecureChannel::new(&ChannelConfig::new()).unwrap();
        let (alice, _) = connected_pair(false);
        let message = alice.encrypt(b"hello").unwrap();

        assert!(matches!(channel.encrypt(b"x"), Err(ProtocolError::NotConnected)));
        assert!(matches!(channel.decrypt(&message), Err(ProtocolError::NotConnected)));
        assert!(matches!(
            channel.check_heartbeat(&message),
            Err(ProtocolError::NotConnected)
        ));
    }

    #[test]
    fn test_message_from_other_session_rejected() {
        let (alice, _) = connected_pair(false);
        let (_, carol) = connected_pair(false);

        let message = alice.encrypt(b"hello").unwrap();
        assert!(matches!(
            carol.decrypt(&message),
            Err(ProtocolError::Authentication)
        ));
    }

    #[test]
    fn test_skew_window() {
        let (alice, bob) = connected_pair(false);
        let now = 1_700_000_000;

        let fresh = alice.encrypt_at(b"fresh", now - 100).unwrap();
        assert_eq!(bob.decrypt_at(&fresh, now).unwrap(), b"fresh");

        let edge = alice.encrypt_at(b"edge", now - SKEW_TOLERANCE_SECS).unwrap();
        assert!(bob.decrypt_at(&edge, now).is_ok());

        let stale = alice.encrypt_at(b"stale", now - 400).unwrap();
        assert!(matches!(
            bob.decrypt_at(&stale, now),
            Err(ProtocolError::Timestamp { age: 400, tolerance: 300 })
        ));

        // A peer clock running ahead is not a staleness problem
        let future = alice.encrypt_at(b"future", now + 400).unwrap();
        assert_eq!(bob.decrypt_at(&future, now).unwrap(), b"future");
    }

    #[test]
    fn test_oversized_plaintext_refused_before_compression() {
        let (alice, bob) = connected_pair(true);

        // Compresses to a few kilobytes but would exceed the peer's limit
        let huge = vec![0u8; MAX_DECOMPRESSED_SIZE + 1];
        assert!(matches!(alice.encrypt(&huge), Err(ProtocolError::Format(_))));

        let largest = vec![0u8; MAX_DECOMPRESSED_SIZE];
        let message = alice.encrypt(&largest).unwrap();
        assert_eq!(bob.decrypt(&message).unwrap().len(), MAX_DECOMPRESSED_SIZE);
    }

    #[test]
    fn test_replay_inside_window_is_accepted() {
        let (alice, bob) = connected_pair(false);
        let message = alice.encrypt(b"again").unwrap();

        assert_eq!(bob.decrypt(&message).unwrap(), b"again");
        assert_eq!(bob.decrypt(&message).unwrap(), b"again");
    }

    #[test]
    fn test_non_data_message_rejected_by_decrypt() {
        let (alice, bob) = connected_pair(false);
        let heartbeat = alice.create_heartbeat();

        assert!(matches!(
            bob.decrypt(&heartbeat),
            Err(ProtocolError::UnexpectedMessage {
                expected: MessageType::Data,
                got: 0x03
            })
        ));
    }

    #[test]
    fn test_failed_decrypt_keeps_connection() {
        let (alice, bob) = connected_pair(false);
        let mut message = alice.encrypt(b"hello").unwrap();
        message.payload[20] ^= 0x01;

        assert!(bob.decrypt(&message).is_err());
        assert!(bob.is_connected());
        assert_eq!(bob.decrypt(&alice.encrypt(b"next").unwrap()).unwrap(), b"next");
    }

    #[test]
    fn test_heartbeat_before_session_is_unsigned() {
        let channel = SecureChannel::new(&ChannelConfig::new()).unwrap();
        let heartbeat = channel.create_heartbeat();

        assert_eq!(heartbeat.kind(), Some(MessageType::Heartbeat));
        assert_eq!(heartbeat.payload, HEARTBEAT_PAYLOAD);
        assert!(!heartbeat.is_signed());
    }

    #[test]
    fn test_heartbeat_after_session_is_signed() {
        let (alice, bob) = connected_pair(false);
        let heartbeat = alice.create_heartbeat();

        assert!(heartbeat.is_signed());
        assert!(bob.check_heartbeat(&heartbeat).is_ok());
    }

    #[test]
    fn test_unsigned_heartbeat_rejected_by_peer() {
        let (_, bob) = connected_pair(false);
        let stranger = SecureChannel::new(&ChannelConfig::new()).unwrap();

        assert!(matches!(
            bob.check_heartbeat(&stranger.create_heartbeat()),
            Err(ProtocolError::Authentication)
        ));
    }

    #[test]
    fn test_stale_heartbeat_rejected() {
        let (alice, bob) = connected_pair(false);
        let heartbeat = alice.create_heartbeat();
        let later = heartbeat.timestamp + 1_000;

        assert!(matches!(
            bob.check_heartbeat_at(&heartbeat, later),
            Err(ProtocolError::Timestamp { .. })
        ));
    }

    #[test]
    fn test_close_disconnects() {
        let (mut alice, bob) = connected_pair(true);
        alice.close();

        assert_eq!(alice.state(), ChannelState::Disconnected);
        assert!(matches!(alice.encrypt(b"x"), Err(ProtocolError::NotConnected)));
        assert!(bob.is_connected());

        // Closing twice is harmless
        alice.close();
        assert!(matches!(
            alice.start_handshake(),
            Err(ProtocolError::InvalidState(_))
        ));
    }

    #[test]
    fn test_failed_handshake_leaves_channel_disconnected() {
        let mut alice = SecureChannel::new(&ChannelConfig::new()).unwrap();
        let mut bob = SecureChannel::new(&ChannelConfig::new()).unwrap();

        let mut offer = alice.start_handshake().unwrap();
        offer.payload[1] ^= 0xFF;

        assert!(matches!(
            bob.process_handshake(&offer),
            Err(ProtocolError::Authentication)
        ));
        assert!(!bob.is_connected());

        // The same channel refuses a second attempt
        let good = SecureChannel::new(&ChannelConfig::new())
            .unwrap()
            .start_handshake()
            .unwrap();
        let err = bob.process_handshake(&good).unwrap_err();
        assert!(err.to_string().contains("new channel"));
    }

    #[test]
    fn test_failed_completion_leaves_initiator_failed() {
        let mut alice = SecureChannel::new(&ChannelConfig::new()).unwrap();
        let mut bob = SecureChannel::new(&ChannelConfig::new()).unwrap();

        let offer = alice.start_handshake().unwrap();
        let mut ack = bob.process_handshake(&offer).unwrap();
        ack.msg_type = MessageType::Data.as_byte();

        assert!(matches!(
            alice.complete_handshake(&ack),
            Err(ProtocolError::UnexpectedMessage { .. })
        ));
        assert!(!alice.is_connected());
        assert!(matches!(
            alice.complete_handshake(&ack),
            Err(ProtocolError::InvalidState(_))
        ));
    }

    #[test]
    fn test_handshake_steps_out_of_order() {
        let mut alice = SecureChannel::new(&ChannelConfig::new()).unwrap();
        let mut bob = SecureChannel::new(&ChannelConfig::new()).unwrap();

        let offer = alice.start_handshake().unwrap();
        // Completing without having started
        assert!(matches!(
            bob.complete_handshake(&offer),
            Err(ProtocolError::InvalidState(_))
        ));
        // Starting twice
        assert!(matches!(
            alice.start_handshake(),
            Err(ProtocolError::InvalidState(_))
        ));
        // An initiator cannot also respond
        assert!(matches!(
            alice.process_handshake(&offer),
            Err(ProtocolError::InvalidState(_))
        ));

        // The refused calls did not disturb either side
        let ack = bob.process_handshake(&offer).unwrap();
        alice.complete_handshake(&ack).unwrap();
        assert!(alice.is_connected() && bob.is_connected());
    }

    #[test]
    fn test_handshake_after_connect_rejected() {
        let (mut alice, mut bob) = connected_pair(false);
        let offer = SecureChannel::new(&ChannelConfig::new())
            .unwrap()
            .start_handshake()
            .unwrap();

        assert!(matches!(
            bob.process_handshake(&offer),
            Err(ProtocolError::InvalidState(_))
        ));
        assert!(matches!(
            alice.start_handshake(),
            Err(ProtocolError::InvalidState(_))
        ));
        assert!(alice.is_connected() && bob.is_connected());
    }

    #[test]
    fn test_debug_does_not_leak_keys() {
        let config = ChannelConfig::new().with_private_key(vec![7u8; 32]);
        let debug = format!("{:?}", config);
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains("7, 7"));

        let channel = SecureChannel::new(&config).unwrap();
        assert!(format!("{:?}", channel).contains("idle"));
    }

    #[test]
    fn test_channel_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SecureChannel>();
    }
}
