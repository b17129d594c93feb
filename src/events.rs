//! Metadata event taxonomy, wire envelope, and decoder.
//!
//! Every log entry payload is a two-layer encoding:
//! - Outer envelope: bincode-serialized `EventEnvelope` (deterministic, compact)
//! - Inner payload: CBOR-serialized typed event via ciborium
//!
//! The decoder is pure: it never touches index state. Signature and
//! key-derivation checks happen in the log layer before entries get here;
//! the decoder enforces structural validity and enum membership only.

use serde::{Deserialize, Serialize};

use crate::error::{IndexError, Result};
use crate::group::Group;

// ---------------------------------------------------------------------------
// EventType
// ---------------------------------------------------------------------------

/// Tag naming the kind of a metadata event.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventType {
    AccountContactBlocked,
    AccountContactRequestDisabled,
    AccountContactRequestEnabled,
    AccountContactRequestIncomingAccepted,
    AccountContactRequestIncomingDiscarded,
    AccountContactRequestIncomingReceived,
    AccountContactRequestOutgoingEnqueued,
    AccountContactRequestOutgoingSent,
    AccountContactRequestReferenceReset,
    AccountContactUnblocked,
    AccountGroupJoined,
    AccountGroupLeft,
    AccountServiceTokenAdded,
    AccountServiceTokenRemoved,
    AccountVerifiedCredentialRegistered,
    ContactAliasKeyAdded,
    GroupDeviceChainKeyAdded,
    GroupMemberDeviceAdded,
    GroupMetadataPayloadSent,
    MultiMemberGroupAdminRoleGranted,
    MultiMemberGroupInitialMemberAnnounced,
}

impl EventType {
    /// String name for log output.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::AccountContactBlocked => "AccountContactBlocked",
            EventType::AccountContactRequestDisabled => "AccountContactRequestDisabled",
            EventType::AccountContactRequestEnabled => "AccountContactRequestEnabled",
            EventType::AccountContactRequestIncomingAccepted => {
                "AccountContactRequestIncomingAccepted"
            }
            EventType::AccountContactRequestIncomingDiscarded => {
                "AccountContactRequestIncomingDiscarded"
            }
            EventType::AccountContactRequestIncomingReceived => {
                "AccountContactRequestIncomingReceived"
            }
            EventType::AccountContactRequestOutgoingEnqueued => {
                "AccountContactRequestOutgoingEnqueued"
            }
            EventType::AccountContactRequestOutgoingSent => "AccountContactRequestOutgoingSent",
            EventType::AccountContactRequestReferenceReset => "AccountContactRequestReferenceReset",
            EventType::AccountContactUnblocked => "AccountContactUnblocked",
            EventType::AccountGroupJoined => "AccountGroupJoined",
            EventType::AccountGroupLeft => "AccountGroupLeft",
            EventType::AccountServiceTokenAdded => "AccountServiceTokenAdded",
            EventType::AccountServiceTokenRemoved => "AccountServiceTokenRemoved",
            EventType::AccountVerifiedCredentialRegistered => {
                "AccountVerifiedCredentialRegistered"
            }
            EventType::ContactAliasKeyAdded => "ContactAliasKeyAdded",
            EventType::GroupDeviceChainKeyAdded => "GroupDeviceChainKeyAdded",
            EventType::GroupMemberDeviceAdded => "GroupMemberDeviceAdded",
            EventType::GroupMetadataPayloadSent => "GroupMetadataPayloadSent",
            EventType::MultiMemberGroupAdminRoleGranted => "MultiMemberGroupAdminRoleGranted",
            EventType::MultiMemberGroupInitialMemberAnnounced => {
                "MultiMemberGroupInitialMemberAnnounced"
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Shared payload structs
// ---------------------------------------------------------------------------

/// The contact advertisement a user shares: public key, rendezvous seed, and
/// opaque metadata. Seed and metadata are optional on the wire.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ShareableContact {
    pub pk: Vec<u8>,
    pub public_rendezvous_seed: Option<Vec<u8>>,
    pub metadata: Option<Vec<u8>>,
}

impl ShareableContact {
    pub fn new(pk: Vec<u8>) -> Self {
        ShareableContact {
            pk,
            public_rendezvous_seed: None,
            metadata: None,
        }
    }
}

/// Bearer credential for a third-party service, keyed by a derived token id.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ServiceToken {
    pub token: Vec<u8>,
    pub authentication_url: String,
    pub supported_services: Vec<String>,
    pub expiration: i64,
}

impl ServiceToken {
    /// Stable identifier derived from the token bytes.
    pub fn token_id(&self) -> String {
        hex::encode(blake3::hash(&self.token).as_bytes())
    }
}

// ---------------------------------------------------------------------------
// Typed events
// ---------------------------------------------------------------------------

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct GroupMemberDeviceAdded {
    pub member_pk: Vec<u8>,
    pub device_pk: Vec<u8>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct GroupDeviceChainKeyAdded {
    /// Sending device.
    pub device_pk: Vec<u8>,
    /// Member the chain key is destined for.
    pub dest_member_pk: Vec<u8>,
    /// Chain key encrypted to the destination, opaque to the index.
    pub payload: Vec<u8>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ContactAliasKeyAdded {
    /// Sending device.
    pub device_pk: Vec<u8>,
    /// Disclosed alias public key.
    pub alias_pk: Vec<u8>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct MultiMemberGroupInitialMemberAnnounced {
    pub member_pk: Vec<u8>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct MultiMemberGroupAdminRoleGranted {
    pub grantee_member_pk: Vec<u8>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct AccountGroupJoined {
    pub group: Group,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct AccountGroupLeft {
    pub group_pk: Vec<u8>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct AccountContactRequestEnabled {}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct AccountContactRequestDisabled {}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct AccountContactRequestReferenceReset {
    pub public_rendezvous_seed: Vec<u8>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct AccountContactRequestOutgoingEnqueued {
    pub contact: ShareableContact,
    /// This account's own metadata, staged for the eventual request.
    pub own_metadata: Vec<u8>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct AccountContactRequestOutgoingSent {
    pub contact_pk: Vec<u8>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct AccountContactRequestIncomingReceived {
    pub contact_pk: Vec<u8>,
    pub contact_rendezvous_seed: Option<Vec<u8>>,
    pub contact_metadata: Option<Vec<u8>>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct AccountContactRequestIncomingDiscarded {
    pub contact_pk: Vec<u8>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct AccountContactRequestIncomingAccepted {
    pub contact_pk: Vec<u8>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct AccountContactBlocked {
    pub contact_pk: Vec<u8>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct AccountContactUnblocked {
    pub contact_pk: Vec<u8>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct AccountServiceTokenAdded {
    pub service_token: ServiceToken,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct AccountServiceTokenRemoved {
    pub token_id: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct GroupMetadataPayloadSent {
    /// Application payload, opaque to the index.
    pub message: Vec<u8>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct AccountVerifiedCredentialRegistered {
    pub signed_identity_public_key: Vec<u8>,
    pub verified_credential_url: String,
    pub registration_date: i64,
    pub expiration_date: i64,
}

// ---------------------------------------------------------------------------
// MetadataEvent sum type
// ---------------------------------------------------------------------------

/// One decoded metadata event of a known kind.
///
/// The replay engine dispatches with an exhaustive match on this type, so an
/// unknown tag fails decoding instead of silently skipping an event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MetadataEvent {
    ContactBlocked(AccountContactBlocked),
    ContactRequestDisabled(AccountContactRequestDisabled),
    ContactRequestEnabled(AccountContactRequestEnabled),
    ContactRequestIncomingAccepted(AccountContactRequestIncomingAccepted),
    ContactRequestIncomingDiscarded(AccountContactRequestIncomingDiscarded),
    ContactRequestIncomingReceived(AccountContactRequestIncomingReceived),
    ContactRequestOutgoingEnqueued(AccountContactRequestOutgoingEnqueued),
    ContactRequestOutgoingSent(AccountContactRequestOutgoingSent),
    ContactRequestReferenceReset(AccountContactRequestReferenceReset),
    ContactUnblocked(AccountContactUnblocked),
    GroupJoined(AccountGroupJoined),
    GroupLeft(AccountGroupLeft),
    ServiceTokenAdded(AccountServiceTokenAdded),
    ServiceTokenRemoved(AccountServiceTokenRemoved),
    VerifiedCredentialRegistered(AccountVerifiedCredentialRegistered),
    ContactAliasKeyAdded(ContactAliasKeyAdded),
    DeviceChainKeyAdded(GroupDeviceChainKeyAdded),
    MemberDeviceAdded(GroupMemberDeviceAdded),
    MetadataPayloadSent(GroupMetadataPayloadSent),
    AdminRoleGranted(MultiMemberGroupAdminRoleGranted),
    InitialMemberAnnounced(MultiMemberGroupInitialMemberAnnounced),
}

impl MetadataEvent {
    /// The tag this event is sealed under.
    pub fn event_type(&self) -> EventType {
        match self {
            MetadataEvent::ContactBlocked(_) => EventType::AccountContactBlocked,
            MetadataEvent::ContactRequestDisabled(_) => EventType::AccountContactRequestDisabled,
            MetadataEvent::ContactRequestEnabled(_) => EventType::AccountContactRequestEnabled,
            MetadataEvent::ContactRequestIncomingAccepted(_) => {
                EventType::AccountContactRequestIncomingAccepted
            }
            MetadataEvent::ContactRequestIncomingDiscarded(_) => {
                EventType::AccountContactRequestIncomingDiscarded
            }
            MetadataEvent::ContactRequestIncomingReceived(_) => {
                EventType::AccountContactRequestIncomingReceived
            }
            MetadataEvent::ContactRequestOutgoingEnqueued(_) => {
                EventType::AccountContactRequestOutgoingEnqueued
            }
            MetadataEvent::ContactRequestOutgoingSent(_) => {
                EventType::AccountContactRequestOutgoingSent
            }
            MetadataEvent::ContactRequestReferenceReset(_) => {
                EventType::AccountContactRequestReferenceReset
            }
            MetadataEvent::ContactUnblocked(_) => EventType::AccountContactUnblocked,
            MetadataEvent::GroupJoined(_) => EventType::AccountGroupJoined,
            MetadataEvent::GroupLeft(_) => EventType::AccountGroupLeft,
            MetadataEvent::ServiceTokenAdded(_) => EventType::AccountServiceTokenAdded,
            MetadataEvent::ServiceTokenRemoved(_) => EventType::AccountServiceTokenRemoved,
            MetadataEvent::VerifiedCredentialRegistered(_) => {
                EventType::AccountVerifiedCredentialRegistered
            }
            MetadataEvent::ContactAliasKeyAdded(_) => EventType::ContactAliasKeyAdded,
            MetadataEvent::DeviceChainKeyAdded(_) => EventType::GroupDeviceChainKeyAdded,
            MetadataEvent::MemberDeviceAdded(_) => EventType::GroupMemberDeviceAdded,
            MetadataEvent::MetadataPayloadSent(_) => EventType::GroupMetadataPayloadSent,
            MetadataEvent::AdminRoleGranted(_) => EventType::MultiMemberGroupAdminRoleGranted,
            MetadataEvent::InitialMemberAnnounced(_) => {
                EventType::MultiMemberGroupInitialMemberAnnounced
            }
        }
    }

    /// Encode to the wire form appended to the log.
    pub fn seal(&self) -> Result<Vec<u8>> {
        let payload = match self {
            MetadataEvent::ContactBlocked(e) => cbor_encode(e)?,
            MetadataEvent::ContactRequestDisabled(e) => cbor_encode(e)?,
            MetadataEvent::ContactRequestEnabled(e) => cbor_encode(e)?,
            MetadataEvent::ContactRequestIncomingAccepted(e) => cbor_encode(e)?,
            MetadataEvent::ContactRequestIncomingDiscarded(e) => cbor_encode(e)?,
            MetadataEvent::ContactRequestIncomingReceived(e) => cbor_encode(e)?,
            MetadataEvent::ContactRequestOutgoingEnqueued(e) => cbor_encode(e)?,
            MetadataEvent::ContactRequestOutgoingSent(e) => cbor_encode(e)?,
            MetadataEvent::ContactRequestReferenceReset(e) => cbor_encode(e)?,
            MetadataEvent::ContactUnblocked(e) => cbor_encode(e)?,
            MetadataEvent::GroupJoined(e) => cbor_encode(e)?,
            MetadataEvent::GroupLeft(e) => cbor_encode(e)?,
            MetadataEvent::ServiceTokenAdded(e) => cbor_encode(e)?,
            MetadataEvent::ServiceTokenRemoved(e) => cbor_encode(e)?,
            MetadataEvent::VerifiedCredentialRegistered(e) => cbor_encode(e)?,
            MetadataEvent::ContactAliasKeyAdded(e) => cbor_encode(e)?,
            MetadataEvent::DeviceChainKeyAdded(e) => cbor_encode(e)?,
            MetadataEvent::MemberDeviceAdded(e) => cbor_encode(e)?,
            MetadataEvent::MetadataPayloadSent(e) => cbor_encode(e)?,
            MetadataEvent::AdminRoleGranted(e) => cbor_encode(e)?,
            MetadataEvent::InitialMemberAnnounced(e) => cbor_encode(e)?,
        };

        let envelope = EventEnvelope {
            event_type: self.event_type(),
            payload,
        };
        bincode::serialize(&envelope).map_err(|e| IndexError::Serialization(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Envelope and decoder
// ---------------------------------------------------------------------------

/// Outer wire envelope of one log entry payload.
#[derive(Serialize, Deserialize, Clone, Debug)]
struct EventEnvelope {
    event_type: EventType,
    payload: Vec<u8>,
}

/// Decode one log entry payload into its tag and typed event.
///
/// A malformed envelope is a `Deserialization` error; a payload that does not
/// match its tag's concrete type is `InvalidInput`.
pub fn open_metadata_entry(payload: &[u8]) -> Result<(EventType, MetadataEvent)> {
    let envelope: EventEnvelope =
        bincode::deserialize(payload).map_err(|e| IndexError::Deserialization(e.to_string()))?;

    let event = match envelope.event_type {
        EventType::AccountContactBlocked => {
            MetadataEvent::ContactBlocked(cbor_decode(&envelope.payload)?)
        }
        EventType::AccountContactRequestDisabled => {
            MetadataEvent::ContactRequestDisabled(cbor_decode(&envelope.payload)?)
        }
        EventType::AccountContactRequestEnabled => {
            MetadataEvent::ContactRequestEnabled(cbor_decode(&envelope.payload)?)
        }
        EventType::AccountContactRequestIncomingAccepted => {
            MetadataEvent::ContactRequestIncomingAccepted(cbor_decode(&envelope.payload)?)
        }
        EventType::AccountContactRequestIncomingDiscarded => {
            MetadataEvent::ContactRequestIncomingDiscarded(cbor_decode(&envelope.payload)?)
        }
        EventType::AccountContactRequestIncomingReceived => {
            MetadataEvent::ContactRequestIncomingReceived(cbor_decode(&envelope.payload)?)
        }
        EventType::AccountContactRequestOutgoingEnqueued => {
            MetadataEvent::ContactRequestOutgoingEnqueued(cbor_decode(&envelope.payload)?)
        }
        EventType::AccountContactRequestOutgoingSent => {
            MetadataEvent::ContactRequestOutgoingSent(cbor_decode(&envelope.payload)?)
        }
        EventType::AccountContactRequestReferenceReset => {
            MetadataEvent::ContactRequestReferenceReset(cbor_decode(&envelope.payload)?)
        }
        EventType::AccountContactUnblocked => {
            MetadataEvent::ContactUnblocked(cbor_decode(&envelope.payload)?)
        }
        EventType::AccountGroupJoined => MetadataEvent::GroupJoined(cbor_decode(&envelope.payload)?),
        EventType::AccountGroupLeft => MetadataEvent::GroupLeft(cbor_decode(&envelope.payload)?),
        EventType::AccountServiceTokenAdded => {
            MetadataEvent::ServiceTokenAdded(cbor_decode(&envelope.payload)?)
        }
        EventType::AccountServiceTokenRemoved => {
            MetadataEvent::ServiceTokenRemoved(cbor_decode(&envelope.payload)?)
        }
        EventType::AccountVerifiedCredentialRegistered => {
            MetadataEvent::VerifiedCredentialRegistered(cbor_decode(&envelope.payload)?)
        }
        EventType::ContactAliasKeyAdded => {
            MetadataEvent::ContactAliasKeyAdded(cbor_decode(&envelope.payload)?)
        }
        EventType::GroupDeviceChainKeyAdded => {
            MetadataEvent::DeviceChainKeyAdded(cbor_decode(&envelope.payload)?)
        }
        EventType::GroupMemberDeviceAdded => {
            MetadataEvent::MemberDeviceAdded(cbor_decode(&envelope.payload)?)
        }
        EventType::GroupMetadataPayloadSent => {
            MetadataEvent::MetadataPayloadSent(cbor_decode(&envelope.payload)?)
        }
        EventType::MultiMemberGroupAdminRoleGranted => {
            MetadataEvent::AdminRoleGranted(cbor_decode(&envelope.payload)?)
        }
        EventType::MultiMemberGroupInitialMemberAnnounced => {
            MetadataEvent::InitialMemberAnnounced(cbor_decode(&envelope.payload)?)
        }
    };

    Ok((envelope.event_type, event))
}

// ---------------------------------------------------------------------------
// CBOR helpers
// ---------------------------------------------------------------------------

fn cbor_encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf).map_err(|e| IndexError::Serialization(e.to_string()))?;
    Ok(buf)
}

fn cbor_decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    ciborium::from_reader(bytes).map_err(|e| IndexError::InvalidInput(e.to_string()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
