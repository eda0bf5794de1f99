//! Wire message inspection.

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::Serialize;
use voltage_protocol::{unix_now, WireMessage, MAC_SIZE};

/// Decoded view of an encoded wire message.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Inspection {
    pub version: u8,
    pub msg_type: u8,
    /// Name of the message type, if the byte is known.
    pub type_name: Option<String>,
    pub timestamp: i64,
    /// Seconds between the timestamp and the local clock.
    pub age_seconds: i64,
    pub payload_len: usize,
    /// Payload as base64.
    pub payload: String,
    /// MAC as lowercase hex.
    pub mac: String,
    /// Whether the MAC is non-zero.
    pub signed: bool,
    /// Whether version and type are recognized.
    pub valid: bool,
}

impl Inspection {
    /// Builds the view of a decoded message, judging its age against `now`.
    pub fn of(message: &WireMessage, now: i64) -> Self {
        let mac = message.mac.map(hex::encode).unwrap_or_default();

        Self {
            version: message.version,
            msg_type: message.msg_type,
            type_name: message.kind().map(|kind| format!("{:?}", kind)),
            timestamp: message.timestamp,
            age_seconds: message.age_seconds(now),
            payload_len: message.payload.len(),
            payload: BASE64.encode(&message.payload),
            mac,
            signed: message.mac.is_some_and(|tag| tag != [0u8; MAC_SIZE]),
            valid: message.is_valid(),
        }
    }
}

/// Decodes a base64-encoded wire message.
pub fn inspect(encoded: &str) -> Result<Inspection> {
    let bytes = BASE64
        .decode(encoded.trim())
        .context("Input is not valid base64")?;
    let message = WireMessage::decode(&bytes).context("Input is not a valid wire message")?;
    Ok(Inspection::of(&message, unix_now()))
}

impl std::fmt::Display for Inspection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let type_name = self.type_name.as_deref().unwrap_or("Unknown");
        writeln!(f, "Version:    {}", self.version)?;
        writeln!(f, "Type:       {} ({:#04x})", type_name, self.msg_type)?;
        writeln!(f, "Timestamp:  {} (age {}s)", self.timestamp, self.age_seconds)?;
        writeln!(f, "Payload:    {} bytes", self.payload_len)?;
        writeln!(f, "MAC:        {}", self.mac)?;
        writeln!(f, "Signed:     {}", if self.signed { "yes" } else { "no" })?;
        write!(f, "Valid:      {}", if self.valid { "yes" } else { "no" })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voltage_protocol::{Authenticator, MessageType};

    #[test]
    fn test_inspect_signed_message() {
        let mut message = WireMessage::with_timestamp(MessageType::Handshake, vec![4; 65], 100);
        Authenticator::for_handshake().unwrap().sign(&mut message);

        let inspection = Inspection::of(&message, 160);
        assert_eq!(inspection.type_name.as_deref(), Some("Handshake"));
        assert_eq!(inspection.age_seconds, 60);
        assert_eq!(inspection.payload_len, 65);
        assert_eq!(inspection.mac.len(), 64);
        assert!(inspection.signed);
        assert!(inspection.valid);
    }

    #[test]
    fn test_inspect_mac_is_lowercase_hex_of_tag() {
        let mut message = WireMessage::with_timestamp(MessageType::Data, b"x".to_vec(), 1);
        let mut tag = [0u8; MAC_SIZE];
        tag[0] = 0xAB;
        tag[MAC_SIZE - 1] = 0x0F;
        message.mac = Some(tag);

        let inspection = Inspection::of(&message, 1);
        assert!(inspection.mac.starts_with("ab00"));
        assert!(inspection.mac.ends_with("000f"));
        assert_eq!(hex::decode(&inspection.mac).unwrap(), tag);
    }

    #[test]
    fn test_inspect_unknown_type() {
        let mut message = WireMessage::new(MessageType::Data, b"x".to_vec());
        message.msg_type = 0x7F;

        let inspection = inspect(&BASE64.encode(message.encode())).unwrap();
        assert!(inspection.type_name.is_none());
        assert!(!inspection.valid);
        assert!(!inspection.signed);
        assert!(inspection.to_string().contains("Unknown (0x7f)"));
    }

    #[test]
    fn test_inspect_rejects_bad_input() {
        assert!(inspect("%%%").is_err());

        let short = BASE64.encode([1u8; 10]);
        let err = inspect(&short).unwrap_err();
        assert!(format!("{:#}", err).contains("insufficient data"));
    }

    #[test]
    fn test_inspection_serializes_to_json() {
        let message = WireMessage::with_timestamp(MessageType::Heartbeat, b"ping".to_vec(), 5);
        let json = serde_json::to_value(Inspection::of(&message, 5)).unwrap();

        assert_eq!(json["msg_type"], 3);
        assert_eq!(json["payload"], "cGluZw==");
        assert_eq!(json["signed"], false);
    }
}
