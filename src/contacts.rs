//! Contact state machine: per-contact lifecycle records, the reverse index
//! by derived group key, and the account-level contact-request knobs.
//!
//! Every contact event follows one rule: the first write to a contact PK
//! fixes its `state`; later events only fill optional fields that are still
//! absent. Replay runs newest first, so "first write" means the newest event
//! in log order. All of this state is rebuilt from scratch on each replay.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{IndexError, Result};
use crate::events::{
    AccountContactBlocked, AccountContactRequestDisabled, AccountContactRequestEnabled,
    AccountContactRequestIncomingAccepted, AccountContactRequestIncomingDiscarded,
    AccountContactRequestIncomingReceived, AccountContactRequestOutgoingEnqueued,
    AccountContactRequestOutgoingSent, AccountContactRequestReferenceReset,
    AccountContactUnblocked, ShareableContact,
};
use crate::group::{Group, GroupType};
use crate::ids::PublicKey;
use crate::secret_store::SecretStore;

// ---------------------------------------------------------------------------
// Contact records
// ---------------------------------------------------------------------------

/// Lifecycle state of one contact. `Removed` and `Blocked` are terminal
/// logical states; records are never deleted.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum ContactState {
    ToRequest,
    Added,
    Received,
    Discarded,
    Blocked,
    Removed,
}

/// Snapshot of one contact: lifecycle state plus the shareable struct.
/// Owns its bytes, so query results are independent copies.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactRecord {
    pub state: ContactState,
    pub contact: ShareableContact,
}

// ---------------------------------------------------------------------------
// ContactRegistry
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default)]
pub struct ContactRegistry {
    contacts: BTreeMap<PublicKey, ContactRecord>,
    /// Derived pairwise-group PK -> contact PK, filled on record creation.
    by_group: BTreeMap<PublicKey, PublicKey>,
    /// Own metadata staged per contact by outgoing enqueue events.
    request_metadata: BTreeMap<PublicKey, Vec<u8>>,
    request_enabled: Option<bool>,
    request_seed: Option<Vec<u8>>,
}

impl ContactRegistry {
    pub fn new() -> Self {
        ContactRegistry::default()
    }

    // -----------------------------------------------------------------------
    // Apply functions
    // -----------------------------------------------------------------------

    pub fn apply_outgoing_enqueued(
        &mut self,
        event: &AccountContactRequestOutgoingEnqueued,
        group: &Group,
        secret_store: &dyn SecretStore,
    ) -> Result<()> {
        let contact_pk = PublicKey::from_bytes(&event.contact.pk)?;

        if self.contacts.contains_key(&contact_pk) {
            self.fill_absent_fields(&contact_pk, &event.contact);
            return Ok(());
        }

        let unstaged = self
            .request_metadata
            .get(&contact_pk)
            .map_or(true, |data| data.is_empty());
        if unstaged {
            self.request_metadata
                .insert(contact_pk, event.own_metadata.clone());
        }

        self.insert_record(
            contact_pk,
            ContactState::ToRequest,
            event.contact.clone(),
            group,
            secret_store,
        )
    }

    pub fn apply_outgoing_sent(
        &mut self,
        event: &AccountContactRequestOutgoingSent,
        group: &Group,
        secret_store: &dyn SecretStore,
    ) -> Result<()> {
        self.apply_bare_contact_event(&event.contact_pk, ContactState::Added, group, secret_store)
    }

    pub fn apply_incoming_received(
        &mut self,
        event: &AccountContactRequestIncomingReceived,
        group: &Group,
        secret_store: &dyn SecretStore,
    ) -> Result<()> {
        let contact_pk = PublicKey::from_bytes(&event.contact_pk)?;
        let contact = ShareableContact {
            pk: event.contact_pk.clone(),
            public_rendezvous_seed: event.contact_rendezvous_seed.clone(),
            metadata: event.contact_metadata.clone(),
        };

        if self.contacts.contains_key(&contact_pk) {
            self.fill_absent_fields(&contact_pk, &contact);
            return Ok(());
        }

        self.insert_record(contact_pk, ContactState::Received, contact, group, secret_store)
    }

    pub fn apply_incoming_discarded(
        &mut self,
        event: &AccountContactRequestIncomingDiscarded,
        group: &Group,
        secret_store: &dyn SecretStore,
    ) -> Result<()> {
        self.apply_bare_contact_event(
            &event.contact_pk,
            ContactState::Discarded,
            group,
            secret_store,
        )
    }

    pub fn apply_incoming_accepted(
        &mut self,
        event: &AccountContactRequestIncomingAccepted,
        group: &Group,
        secret_store: &dyn SecretStore,
    ) -> Result<()> {
        self.apply_bare_contact_event(&event.contact_pk, ContactState::Added, group, secret_store)
    }

    pub fn apply_contact_blocked(
        &mut self,
        event: &AccountContactBlocked,
        group: &Group,
        secret_store: &dyn SecretStore,
    ) -> Result<()> {
        self.apply_bare_contact_event(&event.contact_pk, ContactState::Blocked, group, secret_store)
    }

    pub fn apply_contact_unblocked(
        &mut self,
        event: &AccountContactUnblocked,
        group: &Group,
        secret_store: &dyn SecretStore,
    ) -> Result<()> {
        self.apply_bare_contact_event(&event.contact_pk, ContactState::Removed, group, secret_store)
    }

    pub fn apply_request_enabled(&mut self, _event: &AccountContactRequestEnabled) -> Result<()> {
        if self.request_enabled.is_none() {
            self.request_enabled = Some(true);
        }
        Ok(())
    }

    pub fn apply_request_disabled(&mut self, _event: &AccountContactRequestDisabled) -> Result<()> {
        if self.request_enabled.is_none() {
            self.request_enabled = Some(false);
        }
        Ok(())
    }

    pub fn apply_reference_reset(
        &mut self,
        event: &AccountContactRequestReferenceReset,
    ) -> Result<()> {
        if self.request_seed.is_none() {
            self.request_seed = Some(event.public_rendezvous_seed.clone());
        }
        Ok(())
    }

    /// Events that carry only a contact PK: existing records are left
    /// untouched entirely (there are no optional fields to fill).
    fn apply_bare_contact_event(
        &mut self,
        contact_pk_bytes: &[u8],
        induced: ContactState,
        group: &Group,
        secret_store: &dyn SecretStore,
    ) -> Result<()> {
        let contact_pk = PublicKey::from_bytes(contact_pk_bytes)?;

        if self.contacts.contains_key(&contact_pk) {
            return Ok(());
        }

        self.insert_record(
            contact_pk,
            induced,
            ShareableContact::new(contact_pk_bytes.to_vec()),
            group,
            secret_store,
        )
    }

    /// Create the record, then resolve the contact's derived group through
    /// the secret store and register the reverse mapping. The record stays
    /// in place even when registration fails; the caller decides what to do
    /// with the error.
    fn insert_record(
        &mut self,
        contact_pk: PublicKey,
        state: ContactState,
        contact: ShareableContact,
        group: &Group,
        secret_store: &dyn SecretStore,
    ) -> Result<()> {
        self.contacts
            .insert(contact_pk, ContactRecord { state, contact });

        if group.group_type != GroupType::Account {
            return Err(IndexError::GroupInvalidType);
        }

        let derived = secret_store.group_for_contact(&contact_pk)?;
        self.by_group.insert(derived.public_key, contact_pk);

        Ok(())
    }

    fn fill_absent_fields(&mut self, contact_pk: &PublicKey, incoming: &ShareableContact) {
        if let Some(record) = self.contacts.get_mut(contact_pk) {
            if record.contact.metadata.is_none() {
                record.contact.metadata = incoming.metadata.clone();
            }
            if record.contact.public_rendezvous_seed.is_none() {
                record.contact.public_rendezvous_seed = incoming.public_rendezvous_seed.clone();
            }
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// All contact records, deep-copied, ordered by contact PK.
    pub fn list(&self) -> Vec<ContactRecord> {
        self.contacts.values().cloned().collect()
    }

    pub fn get(&self, contact_pk: &PublicKey) -> Result<ContactRecord> {
        self.contacts
            .get(contact_pk)
            .cloned()
            .ok_or(IndexError::MissingMapKey)
    }

    /// Reverse lookup: resolve the contact owning a derived pairwise group.
    pub fn get_by_group(&self, group_pk: &PublicKey) -> Result<ContactRecord> {
        let contact_pk = self.by_group.get(group_pk).ok_or(IndexError::MissingMapKey)?;
        self.get(contact_pk)
    }

    pub fn request_enabled(&self) -> bool {
        self.request_enabled == Some(true)
    }

    pub fn request_seed(&self) -> Option<Vec<u8>> {
        self.request_seed.clone()
    }

    pub fn own_metadata_for(&self, contact_pk: &PublicKey) -> Option<Vec<u8>> {
        self.request_metadata.get(contact_pk).cloned()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
