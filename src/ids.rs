//! Identity types for the group metadata index.
//!
//! - `PublicKey`: 32-byte Ed25519 public key, compared and keyed by raw bytes
//! - `MemberDevice`: the immutable (member, device) binding
//! - `EntryHash`: content-addressed identifier of one log entry

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::IndexError;

/// Size of every public key handled by the index. Any event carrying a key
/// of a different length is a decoding failure.
pub const KEY_SIZE: usize = 32;

// ---------------------------------------------------------------------------
// PublicKey
// ---------------------------------------------------------------------------

/// Raw 32-byte Ed25519 public key.
///
/// Curve validity and signatures are checked by the log layer before entries
/// reach the index; here only the size is enforced.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublicKey(pub [u8; KEY_SIZE]);

impl PublicKey {
    /// Decode from a byte slice, enforcing the key size.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, IndexError> {
        if bytes.len() != KEY_SIZE {
            return Err(IndexError::Deserialization(format!(
                "invalid public key size, expected {} got {}",
                KEY_SIZE,
                bytes.len()
            )));
        }
        let mut pk = [0u8; KEY_SIZE];
        pk.copy_from_slice(bytes);
        Ok(PublicKey(pk))
    }

    /// Create from a fixed-size array.
    pub fn from_array(bytes: [u8; KEY_SIZE]) -> Self {
        PublicKey(bytes)
    }

    /// Return the raw bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }

    /// Hex-encode for display and log output.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl Ord for PublicKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

impl PartialOrd for PublicKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({}..)", &self.to_hex()[..8])
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

// ---------------------------------------------------------------------------
// MemberDevice
// ---------------------------------------------------------------------------

/// One participant binding: a device key bound to exactly one member key.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct MemberDevice {
    pub member: PublicKey,
    pub device: PublicKey,
}

impl MemberDevice {
    pub fn new(member: PublicKey, device: PublicKey) -> Self {
        MemberDevice { member, device }
    }
}

// ---------------------------------------------------------------------------
// EntryHash
// ---------------------------------------------------------------------------

/// Content-addressed identifier of a single log entry, stable across peers.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryHash(pub [u8; 32]);

impl EntryHash {
    /// Hash an entry payload.
    pub fn of(payload: &[u8]) -> Self {
        EntryHash(*blake3::hash(payload).as_bytes())
    }

    /// Return the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Hex-encode for display and log output.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl Ord for EntryHash {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

impl PartialOrd for EntryHash {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Debug for EntryHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntryHash({}..)", &self.to_hex()[..12])
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
