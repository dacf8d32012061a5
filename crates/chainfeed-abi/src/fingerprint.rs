//! Event and function selectors.
//!
//! The fingerprint of an EVM event is the keccak256 hash of its canonical
//! signature, e.g. `keccak256("Transfer(address,address,uint256)")`. For a raw
//! log `topics[0]` already is the fingerprint.

use tiny_keccak::{Hasher, Keccak};

fn keccak256(input: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    let mut output = [0u8; 32];
    hasher.update(input);
    hasher.finalize(&mut output);
    output
}

/// `0x`-prefixed lowercase keccak256 of an event signature.
pub fn keccak256_signature(signature: &str) -> String {
    format!("0x{}", hex::encode(keccak256(signature.as_bytes())))
}

/// First four bytes of keccak256 of a function signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Normalise `topics[0]` into a lookup key. `None` unless it is a 32-byte
/// hex hash.
pub fn from_topic(topic: &str) -> Option<String> {
    let hex = topic.strip_prefix("0x").unwrap_or(topic);
    if hex.len() == 64 && hex.chars().all(|c| c.is_ascii_hexdigit()) {
        Some(format!("0x{}", hex.to_ascii_lowercase()))
    } else {
        None
    }
}
