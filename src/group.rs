//! Group descriptor: the cryptographic namespace an index is bound to.

use serde::{Deserialize, Serialize};

use crate::ids::PublicKey;

/// The three group flavors of the protocol.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum GroupType {
    /// Single-owner group holding the account's own metadata.
    Account,
    /// Pairwise group shared with one contact.
    Contact,
    /// Multi-party group with an admin set.
    MultiMember,
}

/// Immutable descriptor of one group. An index is bound to exactly one group
/// at construction and keeps it for its whole lifetime.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Group {
    pub public_key: PublicKey,
    /// Symmetric seed material for the group, opaque to the index.
    pub secret: Vec<u8>,
    /// Signature over the seed, opaque to the index.
    pub secret_sig: Vec<u8>,
    pub group_type: GroupType,
}

impl Group {
    pub fn new(public_key: PublicKey, group_type: GroupType) -> Self {
        Group {
            public_key,
            secret: Vec::new(),
            secret_sig: Vec::new(),
            group_type,
        }
    }
}
