//! # Domain Services
//!
//! Pure hashing and derivation helpers. No I/O, no state.

use crate::domain::entities::BlockHeader;
use crate::domain::value_objects::{Address, Hash};
use sha2::Sha256;
use sha3::{Digest, Keccak256};

/// Computes keccak256 hash of data.
#[must_use]
pub fn keccak256(data: &[u8]) -> Hash {
    Hash::new(Keccak256::digest(data).into())
}

/// First four bytes of `keccak256(signature)`.
#[must_use]
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash.0[0], hash.0[1], hash.0[2], hash.0[3]]
}

/// Header hash: SHA-256 over the canonical header encoding.
#[must_use]
pub fn header_hash(header: &BlockHeader) -> Hash {
    Hash::new(Sha256::digest(header.encode()).into())
}

/// Account address of a named host module: the first 20 bytes of
/// `sha256(name)`.
#[must_use]
pub fn module_address(name: &str) -> Address {
    let hash = Sha256::digest(name.as_bytes());
    let mut addr = [0u8; 20];
    addr.copy_from_slice(&hash[..20]);
    Address::new(addr)
}

/// Computes the contract address for a creation message.
///
/// Address = keccak256(rlp(\[sender, nonce\]))\[12:\]
#[must_use]
pub fn compute_contract_address(sender: Address, nonce: u64) -> Address {
    let mut payload = Vec::with_capacity(30);
    payload.push(0x94);
    payload.extend_from_slice(sender.as_bytes());

    match nonce {
        0 => payload.push(0x80),
        1..=127 => payload.extend_from_slice(&nonce.to_be_bytes()[7..]),
        _ => {
            let be = nonce.to_be_bytes();
            let start = be.iter().position(|&b| b != 0).unwrap_or(7);
            payload.push(0x80 + (8 - start) as u8);
            payload.extend_from_slice(&be[start..]);
        }
    }

    // [sender, nonce] is at most 30 bytes, always a short list.
    let mut encoded = Vec::with_capacity(payload.len() + 1);
    encoded.push(0xc0 + payload.len() as u8);
    encoded.extend_from_slice(&payload);

    let hash = Keccak256::digest(&encoded);
    let mut addr = [0u8; 20];
    addr.copy_from_slice(&hash[12..32]);
    Address::new(addr)
}
