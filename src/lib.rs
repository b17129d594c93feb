//! Group metadata index: deterministic replay of an append-only,
//! content-addressed metadata log into the authoritative in-memory state of
//! one cryptographically secured peer group.
//!
//! The index folds member/device bindings, the admin set, the contact
//! lifecycle, the roster of joined groups, service tokens and verified
//! credentials out of the log, then reconciles alias-key disclosures in a
//! post-replay pass. Replication, signatures, transport and key storage live
//! outside this crate; the index consumes them through the `ReplicatedLog`
//! and `SecretStore` seams.
//!
//! # Module structure
//! - `ids` - public keys, member/device bindings, entry hashes
//! - `group` - group descriptor and type
//! - `events` - event taxonomy, wire envelope, decoder
//! - `log` - log-layer seam and in-memory log
//! - `secret_store` - secret-store seam
//! - `members`, `contacts`, `roster`, `tokens` - per-concern registries
//! - `index` - replay engine, post-actions, query surface

pub mod contacts;
pub mod crypto;
pub mod error;
pub mod events;
pub mod group;
pub mod ids;
pub mod index;
pub mod log;
pub mod members;
pub mod roster;
pub mod secret_store;
pub mod tokens;

pub use contacts::{ContactRecord, ContactState};
pub use error::{IndexError, Result};
pub use events::{EventType, MetadataEvent, ServiceToken, ShareableContact};
pub use group::{Group, GroupType};
pub use ids::{EntryHash, MemberDevice, PublicKey, KEY_SIZE};
pub use index::MetadataIndex;
pub use crate::log::{LogEntry, MemoryLog, ReplicatedLog};
pub use roster::{GroupJoinState, RosterEntry};
pub use secret_store::SecretStore;
