//! # Voltage Protocol Library
//!
//! This crate provides the wire format, cryptographic primitives and
//! session logic for Voltage point-to-point secure channels.
//!
//! ## Overview
//!
//! Two peers each hold a P-256 key pair. They exchange public keys in a
//! two-message handshake, derive a shared session key, and then exchange
//! encrypted, authenticated, timestamped messages:
//!
//! - **Wire Format**: Fixed 14-byte header, payload, 32-byte MAC trailer
//! - **Key Exchange**: P-256 ECDH producing a 32-byte shared secret
//! - **Key Derivation**: HMAC-SHA256 with a fixed context label
//! - **Transport Encryption**: AES-256-GCM with a random nonce per message
//! - **Compression**: Optional LZ4, applied before encryption
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │          Application Payload            │  opaque bytes
//! ├─────────────────────────────────────────┤
//! │             Compression                 │  none or LZ4
//! ├─────────────────────────────────────────┤
//! │           AEAD Encryption               │  AES-256-GCM
//! ├─────────────────────────────────────────┤
//! │      Wire Message + HMAC-SHA256         │  header ‖ payload ‖ mac
//! ├─────────────────────────────────────────┤
//! │        Transport (caller-owned)         │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Example Usage
//!
//! ```rust
//! use voltage_protocol::{ChannelConfig, SecureChannel, WireMessage};
//!
//! let mut client = SecureChannel::new(&ChannelConfig::new().with_compression(true))?;
//! let mut server = SecureChannel::new(&ChannelConfig::new().with_compression(true))?;
//!
//! // Handshake: offer, ack
//! let offer = client.start_handshake()?;
//! let ack = server.process_handshake(&WireMessage::decode(&offer.encode())?)?;
//! client.complete_handshake(&WireMessage::decode(&ack.encode())?)?;
//!
//! // Transport
//! let bytes = client.encrypt(b"hello over the wire")?.encode();
//! let plaintext = server.decrypt(&WireMessage::decode(&bytes)?)?;
//! assert_eq!(plaintext, b"hello over the wire");
//! # Ok::<(), voltage_protocol::ProtocolError>(())
//! ```
//!
//! ## Modules
//!
//! - [`message`]: Wire message type and binary codec
//! - [`keys`]: P-256 key pairs and ECDH
//! - [`kdf`]: Session and handshake key derivation
//! - [`auth`]: HMAC-SHA256 message authentication
//! - [`cipher`]: AES-256-GCM payload encryption
//! - [`compression`]: Compression strategies
//! - [`handshake`]: Handshake state machine
//! - [`channel`]: The secure channel
//! - [`error`]: Error types

pub mod auth;
pub mod channel;
pub mod cipher;
pub mod compression;
pub mod error;
pub mod handshake;
pub mod kdf;
pub mod keys;
pub mod message;

pub use auth::Authenticator;
pub use channel::{
    ChannelConfig, ChannelState, SecureChannel, HEARTBEAT_PAYLOAD, SKEW_TOLERANCE_SECS,
};
pub use cipher::{AeadCipher, CIPHER_OVERHEAD, NONCE_SIZE, TAG_SIZE};
pub use compression::{CompressionKind, Compressor, Lz4Compressor, NoCompression};
pub use error::{ErrorKind, ProtocolError, Result};
pub use handshake::{Handshake, HandshakePhase, Role};
pub use kdf::SessionKey;
pub use keys::{fingerprint, KeyPair, PeerPublicKey, SharedSecret, PUBLIC_KEY_LENGTH};
pub use message::{
    unix_now, MessageType, WireMessage, HEADER_SIZE, MAC_SIZE, MAX_PAYLOAD_SIZE,
    MIN_MESSAGE_SIZE, PROTOCOL_VERSION,
};
