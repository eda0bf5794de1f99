//! Wire message definition and binary codec.
//!
//! # Wire Format
//!
//! Every message is laid out as (all integers big-endian):
//! - 1 byte: protocol version
//! - 1 byte: message type
//! - 8 bytes: timestamp (signed seconds since the Unix epoch)
//! - 4 bytes: payload length
//! - N bytes: payload
//! - 32 bytes: HMAC-SHA256 over version, type, timestamp and payload
//!
//! Decoding never panics and never reads past the input, whatever the bytes.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::{ProtocolError, Result};

/// Current protocol version.
pub const PROTOCOL_VERSION: u8 = 1;

/// Size of the MAC trailer in bytes.
pub const MAC_SIZE: usize = 32;

/// Header size: 1 (version) + 1 (type) + 8 (timestamp) + 4 (length) = 14 bytes.
pub const HEADER_SIZE: usize = 14;

/// Smallest possible encoded message: a header, no payload, and a MAC.
pub const MIN_MESSAGE_SIZE: usize = HEADER_SIZE + MAC_SIZE;

/// Maximum payload size accepted by the decoder (16 MB).
pub const MAX_PAYLOAD_SIZE: usize = 16 * 1024 * 1024;

/// Kind of a protocol message, as carried in the type byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum MessageType {
    /// Initiator's key offer.
    Handshake = 0x01,
    /// Encrypted application data.
    Data = 0x02,
    /// Keepalive.
    Heartbeat = 0x03,
    /// Error notification.
    Error = 0x04,
    /// Responder's key answer.
    Ack = 0x05,
}

impl MessageType {
    /// Returns the wire byte for this type.
    #[inline]
    pub fn as_byte(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for MessageType {
    type Error = ProtocolError;

    fn try_from(byte: u8) -> Result<Self> {
        match byte {
            0x01 => Ok(MessageType::Handshake),
            0x02 => Ok(MessageType::Data),
            0x03 => Ok(MessageType::Heartbeat),
            0x04 => Ok(MessageType::Error),
            0x05 => Ok(MessageType::Ack),
            other => Err(ProtocolError::Format(format!(
                "unknown message type: {:#04x}",
                other
            ))),
        }
    }
}

/// Current wall-clock time in seconds since the Unix epoch.
pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// A single protocol message.
///
/// The type byte is kept raw so that a message with an unknown type still
/// decodes; use [`WireMessage::kind`] for the typed view and
/// [`WireMessage::is_valid`] for the structural check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireMessage {
    /// Protocol version.
    pub version: u8,
    /// Raw message type byte.
    pub msg_type: u8,
    /// Producer's clock, seconds since the Unix epoch.
    pub timestamp: i64,
    /// Opaque payload bytes.
    pub payload: Vec<u8>,
    /// HMAC-SHA256 tag; `None` until the message has been signed.
    pub mac: Option<[u8; MAC_SIZE]>,
}

impl WireMessage {
    /// Creates an unsigned message stamped with the current time.
    pub fn new(msg_type: MessageType, payload: Vec<u8>) -> Self {
        Self::with_timestamp(msg_type, payload, unix_now())
    }

    /// Creates an unsigned message with an explicit timestamp.
    pub fn with_timestamp(msg_type: MessageType, payload: Vec<u8>, timestamp: i64) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            msg_type: msg_type.as_byte(),
            timestamp,
            payload,
            mac: None,
        }
    }

    /// Returns the typed message kind, or `None` for an unknown type byte.
    pub fn kind(&self) -> Option<MessageType> {
        MessageType::try_from(self.msg_type).ok()
    }

    /// Returns true if the message carries a MAC.
    pub fn is_signed(&self) -> bool {
        self.mac.is_some()
    }

    /// Structural validity check.
    ///
    /// True iff the version is supported, the type is one of the five known
    /// values and a 32-byte MAC is present. The MAC is not verified here.
    pub fn is_valid(&self) -> bool {
        self.version == PROTOCOL_VERSION && self.kind().is_some() && self.mac.is_some()
    }

    /// Age of the message relative to `now`, in seconds.
    ///
    /// Negative when the producer's clock is ahead of ours.
    pub fn age_seconds(&self, now: i64) -> i64 {
        now.saturating_sub(self.timestamp)
    }

    /// Age of the message relative to the local clock.
    pub fn age(&self) -> i64 {
        self.age_seconds(unix_now())
    }

    /// Total encoded size of this message in bytes.
    pub fn encoded_len(&self) -> usize {
        HEADER_SIZE + self.payload.len() + MAC_SIZE
    }

    /// Returns the bytes covered by the MAC: version, type, timestamp and payload.
    pub fn authenticated_bytes(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(10 + self.payload.len());
        data.push(self.version);
        data.push(self.msg_type);
        data.extend_from_slice(&self.timestamp.to_be_bytes());
        data.extend_from_slice(&self.payload);
        data
    }

    /// Encode the message into bytes.
    ///
    /// An unsigned message is written with an all-zero MAC.
    pub fn encode(&self) -> Vec<u8> {
        let mut output = Vec::with_capacity(self.encoded_len());

        output.push(self.version);
        output.push(self.msg_type);
        output.extend_from_slice(&self.timestamp.to_be_bytes());
        output.extend_from_slice(&(self.payload.len() as u32).to_be_bytes());
        output.extend_from_slice(&self.payload);
        output.extend_from_slice(&self.mac.unwrap_or([0u8; MAC_SIZE]));

        output
    }

    /// Decode a message from bytes.
    ///
    /// Bytes after the MAC are ignored; use [`WireMessage::decode_prefix`]
    /// to learn how many bytes were consumed.
    pub fn decode(data: &[u8]) -> Result<Self> {
        Self::decode_prefix(data).map(|(message, _)| message)
    }

    /// Decode a message from the front of `data`.
    ///
    /// Returns the decoded message and the number of bytes consumed.
    pub fn decode_prefix(data: &[u8]) -> Result<(Self, usize)> {
        if data.len() < MIN_MESSAGE_SIZE {
            return Err(ProtocolError::Format(format!(
                "insufficient data for message: need at least {} bytes, have {}",
                MIN_MESSAGE_SIZE,
                data.len()
            )));
        }

        let payload_len = read_payload_len(data)?;

        let total = HEADER_SIZE + payload_len + MAC_SIZE;
        if data.len() < total {
            return Err(ProtocolError::Format(format!(
                "insufficient data for payload: need {} bytes, have {}",
                total,
                data.len()
            )));
        }

        let mut timestamp = [0u8; 8];
        timestamp.copy_from_slice(&data[2..10]);

        let payload_end = HEADER_SIZE + payload_len;
        let mut mac = [0u8; MAC_SIZE];
        mac.copy_from_slice(&data[payload_end..total]);

        let message = Self {
            version: data[0],
            msg_type: data[1],
            timestamp: i64::from_be_bytes(timestamp),
            payload: data[HEADER_SIZE..payload_end].to_vec(),
            mac: Some(mac),
        };

        Ok((message, total))
    }

    /// Try to decode a message, returning `None` if more data is needed.
    ///
    /// Useful for stream transports that receive partial messages. Only a
    /// header declaring an oversized payload is an error.
    pub fn try_decode(data: &[u8]) -> Result<Option<(Self, usize)>> {
        if data.len() < HEADER_SIZE {
            return Ok(None);
        }

        let payload_len = read_payload_len(data)?;
        if data.len() < HEADER_SIZE + payload_len + MAC_SIZE {
            return Ok(None);
        }

        Self::decode_prefix(data).map(Some)
    }
}

/// Reads and bounds-checks the payload length field. `data` must hold a full header.
fn read_payload_len(data: &[u8]) -> Result<usize> {
    let mut len_bytes = [0u8; 4];
    len_bytes.copy_from_slice(&data[10..HEADER_SIZE]);
    let payload_len = u32::from_be_bytes(len_bytes) as usize;

    if payload_len > MAX_PAYLOAD_SIZE {
        return Err(ProtocolError::Format(format!(
            "payload too large: {} bytes exceeds maximum of {} bytes",
            payload_len, MAX_PAYLOAD_SIZE
        )));
    }

    Ok(payload_len)
}
