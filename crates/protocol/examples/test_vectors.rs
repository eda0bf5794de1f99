//! Generate deterministic test vectors for interop testing.
//!
//! Run with: cargo run --package voltage-protocol --example test_vectors
//!
//! Everything printed is derived from fixed private keys and timestamps, so
//! another implementation can reproduce each value byte for byte. AEAD
//! ciphertexts are not included because their nonces are random.

use voltage_protocol::kdf;
use voltage_protocol::{
    Authenticator, KeyPair, MessageType, WireMessage, HEARTBEAT_PAYLOAD,
};

fn main() -> voltage_protocol::Result<()> {
    let alice = KeyPair::from_private_bytes(&[0x11; 32])?;
    let bob = KeyPair::from_private_bytes(&[0x22; 32])?;

    // Test vector 1: Public keys
    print_test_vector("alice_public_key", &alice.public_key_bytes());
    print_test_vector("bob_public_key", &bob.public_key_bytes());

    // Test vector 2: ECDH shared secret and derived session key
    let shared = alice.diffie_hellman(&bob.public_key());
    print_test_vector("shared_secret", shared.as_bytes());
    let session_key = kdf::session_key(&shared)?;
    print_test_vector("session_key", session_key.as_bytes());

    // Test vector 3: Handshake key
    print_test_vector("handshake_key", kdf::handshake_key().as_bytes());

    // Test vector 4: Handshake offer, signed with the handshake key
    let mut offer =
        WireMessage::with_timestamp(MessageType::Handshake, alice.public_key_bytes(), 1704067200);
    Authenticator::for_handshake()?.sign(&mut offer);
    print_test_vector("handshake_offer", &offer.encode());

    // Test vector 5: Heartbeat, signed with the session key
    let mut heartbeat =
        WireMessage::with_timestamp(MessageType::Heartbeat, HEARTBEAT_PAYLOAD.to_vec(), 1704067200);
    Authenticator::new(&session_key)?.sign(&mut heartbeat);
    print_test_vector("heartbeat", &heartbeat.encode());

    Ok(())
}

fn print_test_vector(name: &str, bytes: &[u8]) {
    print!("export const {} = new Uint8Array([", name);
    for (i, b) in bytes.iter().enumerate() {
        if i > 0 {
            print!(", ");
        }
        print!("{}", b);
    }
    println!("]);");
}
