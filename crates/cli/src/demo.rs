//! In-memory demonstration of a secure channel.
//!
//! Two channels are wired back to back. Every message travels through the
//! binary codec, so the demo exercises the same path a real transport would.

use std::collections::HashSet;

use anyhow::{bail, Context, Result};
use serde::Serialize;
use tracing::{debug, info};
use voltage_protocol::{ChannelConfig, SecureChannel, WireMessage, NONCE_SIZE};

/// Outcome of a demo run.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DemoReport {
    /// Fingerprint of the initiating channel.
    pub initiator: String,
    /// Fingerprint of the responding channel.
    pub responder: String,
    /// Compression strategy both channels used.
    pub compression: String,
    /// Number of data messages exchanged.
    pub messages: usize,
    /// Plaintext bytes sent.
    pub plaintext_bytes: usize,
    /// Encoded bytes that crossed the in-memory wire, handshake included.
    pub wire_bytes: usize,
    /// Number of distinct nonces observed.
    pub unique_nonces: usize,
}

/// Moves a message across the in-memory wire.
fn transmit(message: &WireMessage, wire_bytes: &mut usize) -> Result<WireMessage> {
    let bytes = message.encode();
    *wire_bytes += bytes.len();
    WireMessage::decode(&bytes).context("Failed to decode message from the wire")
}

/// Runs a handshake between a channel built from `config` and a fresh peer,
/// then exchanges `messages` data messages in alternating directions.
///
/// Fails if any message does not round-trip or a nonce repeats.
pub fn run(config: &ChannelConfig, messages: usize) -> Result<DemoReport> {
    let mut initiator = SecureChannel::new(config).context("Failed to create initiator")?;
    let peer_config = ChannelConfig::new().with_compression(config.enable_compression);
    let mut responder = SecureChannel::new(&peer_config).context("Failed to create responder")?;

    let mut wire_bytes = 0;

    let offer = initiator.start_handshake()?;
    let ack = responder.process_handshake(&transmit(&offer, &mut wire_bytes)?)?;
    initiator.complete_handshake(&transmit(&ack, &mut wire_bytes)?)?;
    info!(
        initiator = %initiator.fingerprint(),
        responder = %responder.fingerprint(),
        "Demo handshake complete"
    );

    let mut nonces = HashSet::new();
    let mut plaintext_bytes = 0;

    for i in 0..messages {
        let (sender, receiver) = if i % 2 == 0 {
            (&initiator, &responder)
        } else {
            (&responder, &initiator)
        };

        let text = format!("demo message {} of {}", i + 1, messages);
        plaintext_bytes += text.len();

        let message = transmit(&sender.encrypt(text.as_bytes())?, &mut wire_bytes)?;
        if let Some(nonce) = message.payload.get(..NONCE_SIZE) {
            nonces.insert(nonce.to_vec());
        }

        let received = receiver
            .decrypt(&message)
            .with_context(|| format!("Message {} failed to decrypt", i + 1))?;
        if received != text.as_bytes() {
            bail!("Message {} did not round-trip", i + 1);
        }
        debug!(index = i + 1, "Demo message verified");
    }

    if nonces.len() != messages {
        bail!(
            "Nonce reuse detected: {} distinct nonces for {} messages",
            nonces.len(),
            messages
        );
    }

    let heartbeat = transmit(&initiator.create_heartbeat(), &mut wire_bytes)?;
    responder
        .check_heartbeat(&heartbeat)
        .context("Heartbeat was rejected")?;

    let report = DemoReport {
        initiator: initiator.fingerprint(),
        responder: responder.fingerprint(),
        compression: format!("{:?}", initiator.compression()).to_lowercase(),
        messages,
        plaintext_bytes,
        wire_bytes,
        unique_nonces: nonces.len(),
    };

    initiator.close();
    responder.close();
    Ok(report)
}
