//! The metadata index: a deterministic fold of the replicated metadata log
//! into queryable in-memory state.
//!
//! `update_index` holds the single write lease for a full replay: it resets
//! the per-replay structures, walks the log newest first, dispatches each
//! decoded event with an exhaustive match, then runs the post-actions. Query
//! methods take the shared read lease and return owned copies.
//!
//! Error policy: decode and handler failures during a replay are logged and
//! swallowed so one corrupt entry cannot brick the whole group view. Only
//! post-action failures abort, because they mean the state is inconsistent
//! after every primary fact was folded.

use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use crate::contacts::{ContactRecord, ContactRegistry};
use crate::error::{IndexError, Result};
use crate::events::{
    open_metadata_entry, AccountVerifiedCredentialRegistered, ContactAliasKeyAdded, MetadataEvent,
    ServiceToken,
};
use crate::group::{Group, GroupType};
use crate::ids::{EntryHash, MemberDevice, PublicKey, KEY_SIZE};
use crate::log::ReplicatedLog;
use crate::members::MemberRegistry;
use crate::roster::{GroupJoinState, GroupRoster, RosterEntry};
use crate::secret_store::SecretStore;
use crate::tokens::TokenRegistry;

// ---------------------------------------------------------------------------
// Inner state
// ---------------------------------------------------------------------------

/// Everything behind the lock. Apply paths run on `&mut` access only, so no
/// handler can ever reacquire the lock.
#[derive(Default)]
struct IndexState {
    members: MemberRegistry,
    contacts: ContactRegistry,
    roster: GroupRoster,
    tokens: TokenRegistry,
    /// Append-only within a replay, in dispatch (newest-first) order.
    verified_credentials: Vec<AccountVerifiedCredentialRegistered>,
    /// Entry hashes folded during the current replay.
    handled: HashSet<EntryHash>,
    /// Alias disclosures staged for the post-action.
    staged_alias_events: Vec<ContactAliasKeyAdded>,
    own_alias_key_sent: bool,
    other_alias_key: Option<PublicKey>,
}

impl IndexState {
    /// Clear the structures rebuilt by every replay. The member, device,
    /// admin and sent-secret maps accumulate across replays, as do the alias
    /// outputs.
    fn reset_replay_state(&mut self) {
        self.contacts = ContactRegistry::new();
        self.roster = GroupRoster::new();
        self.tokens = TokenRegistry::new();
        self.verified_credentials.clear();
        self.handled.clear();
    }

    fn dispatch(
        &mut self,
        event: &MetadataEvent,
        group: &Group,
        own: &MemberDevice,
        secret_store: &dyn SecretStore,
    ) -> Result<()> {
        match event {
            MetadataEvent::MemberDeviceAdded(e) => self.members.apply_member_device_added(e),
            MetadataEvent::DeviceChainKeyAdded(e) => {
                self.members.apply_chain_key_added(e, &own.device)
            }
            MetadataEvent::InitialMemberAnnounced(e) => {
                self.members.apply_initial_member_announced(e)
            }
            MetadataEvent::AdminRoleGranted(e) => self.members.apply_admin_role_granted(e),
            MetadataEvent::ContactRequestOutgoingEnqueued(e) => {
                self.contacts.apply_outgoing_enqueued(e, group, secret_store)
            }
            MetadataEvent::ContactRequestOutgoingSent(e) => {
                self.contacts.apply_outgoing_sent(e, group, secret_store)
            }
            MetadataEvent::ContactRequestIncomingReceived(e) => {
                self.contacts.apply_incoming_received(e, group, secret_store)
            }
            MetadataEvent::ContactRequestIncomingDiscarded(e) => {
                self.contacts.apply_incoming_discarded(e, group, secret_store)
            }
            MetadataEvent::ContactRequestIncomingAccepted(e) => {
                self.contacts.apply_incoming_accepted(e, group, secret_store)
            }
            MetadataEvent::ContactBlocked(e) => {
                self.contacts.apply_contact_blocked(e, group, secret_store)
            }
            MetadataEvent::ContactUnblocked(e) => {
                self.contacts.apply_contact_unblocked(e, group, secret_store)
            }
            MetadataEvent::ContactRequestEnabled(e) => self.contacts.apply_request_enabled(e),
            MetadataEvent::ContactRequestDisabled(e) => self.contacts.apply_request_disabled(e),
            MetadataEvent::ContactRequestReferenceReset(e) => {
                self.contacts.apply_reference_reset(e)
            }
            MetadataEvent::GroupJoined(e) => self.roster.apply_group_joined(e),
            MetadataEvent::GroupLeft(e) => self.roster.apply_group_left(e),
            MetadataEvent::ServiceTokenAdded(e) => self.tokens.apply_token_added(e),
            MetadataEvent::ServiceTokenRemoved(e) => self.tokens.apply_token_removed(e),
            MetadataEvent::VerifiedCredentialRegistered(e) => {
                self.verified_credentials.push(e.clone());
                Ok(())
            }
            MetadataEvent::ContactAliasKeyAdded(e) => {
                self.staged_alias_events.push(e.clone());
                Ok(())
            }
            MetadataEvent::MetadataPayloadSent(_) => Ok(()),
        }
    }

    /// Post-action: classify the staged alias disclosures now that every
    /// member/device binding is known. Runs under the write lease already
    /// held by the replay, so lookups go straight to the inner registry.
    fn post_handler_sent_aliases(&mut self, own: &MemberDevice) -> Result<()> {
        let staged = std::mem::take(&mut self.staged_alias_events);

        for event in &staged {
            let member = PublicKey::from_bytes(&event.device_pk)
                .and_then(|device| self.members.member_by_device(&device))
                .map_err(|_| IndexError::Internal("couldn't get member for device".into()))?;

            if member == own.member {
                self.own_alias_key_sent = true;
                continue;
            }

            if event.alias_pk.len() != KEY_SIZE {
                return Err(IndexError::InvalidInput(format!(
                    "invalid alias key size, expected {} got {}",
                    KEY_SIZE,
                    event.alias_pk.len()
                )));
            }

            self.other_alias_key = Some(PublicKey::from_bytes(&event.alias_pk)?);
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MetadataIndex
// ---------------------------------------------------------------------------

/// Authoritative in-memory view of one group's metadata log.
pub struct MetadataIndex {
    group: Group,
    own_member_device: MemberDevice,
    secret_store: Arc<dyn SecretStore>,
    state: RwLock<IndexState>,
}

impl MetadataIndex {
    pub fn new(
        group: Group,
        own_member_device: MemberDevice,
        secret_store: Arc<dyn SecretStore>,
    ) -> Self {
        MetadataIndex {
            group,
            own_member_device,
            secret_store,
            state: RwLock::new(IndexState::default()),
        }
    }

    /// The group this index is bound to.
    pub fn group(&self) -> &Group {
        &self.group
    }

    /// The local participant's binding.
    pub fn own_member_device(&self) -> &MemberDevice {
        &self.own_member_device
    }

    // -----------------------------------------------------------------------
    // Replay
    // -----------------------------------------------------------------------

    /// Fold the full log snapshot into the index, newest entry first.
    pub fn update_index(&self, log: &dyn ReplicatedLog) -> Result<()> {
        let mut state = self.state.write().unwrap();

        state.reset_replay_state();

        let entries = log.entries();
        for entry in entries.iter().rev() {
            if self.group.group_type != GroupType::Account && state.handled.contains(&entry.hash) {
                continue;
            }

            let (event_type, event) = match open_metadata_entry(&entry.payload) {
                Ok(decoded) => decoded,
                Err(err) => {
                    log::error!(
                        "unable to open metadata entry {}: {}",
                        entry.hash.to_hex(),
                        err
                    );
                    continue;
                }
            };

            if let Err(err) = state.dispatch(
                &event,
                &self.group,
                &self.own_member_device,
                self.secret_store.as_ref(),
            ) {
                log::error!("unable to handle {} event: {}", event_type.as_str(), err);
            }

            state.handled.insert(entry.hash);
        }

        if let Err(err) = state.post_handler_sent_aliases(&self.own_member_device) {
            return Err(IndexError::Internal(err.to_string()));
        }

        Ok(())
    }

    // -----------------------------------------------------------------------
    // Queries (shared read lease, owned results)
    // -----------------------------------------------------------------------

    pub fn list_contacts(&self) -> Vec<ContactRecord> {
        self.state.read().unwrap().contacts.list()
    }

    pub fn get_contact(&self, contact_pk: &PublicKey) -> Result<ContactRecord> {
        self.state.read().unwrap().contacts.get(contact_pk)
    }

    /// Resolve the contact owning a derived pairwise group.
    pub fn contact_by_group(&self, group_pk: &PublicKey) -> Result<ContactRecord> {
        self.state.read().unwrap().contacts.get_by_group(group_pk)
    }

    pub fn list_members(&self) -> Vec<PublicKey> {
        self.state.read().unwrap().members.members()
    }

    pub fn list_devices(&self) -> Vec<PublicKey> {
        self.state.read().unwrap().members.devices()
    }

    pub fn list_admins(&self) -> Vec<PublicKey> {
        self.state.read().unwrap().members.admins()
    }

    pub fn member_count(&self) -> usize {
        self.state.read().unwrap().members.member_count()
    }

    pub fn device_count(&self) -> usize {
        self.state.read().unwrap().members.device_count()
    }

    pub fn member_of(&self, device: &PublicKey) -> Result<PublicKey> {
        self.state.read().unwrap().members.member_by_device(device)
    }

    pub fn devices_of(&self, member: &PublicKey) -> Result<Vec<PublicKey>> {
        self.state.read().unwrap().members.devices_for_member(member)
    }

    /// Devices of every member other than the local one. Order unspecified.
    pub fn other_members_devices(&self) -> Vec<PublicKey> {
        self.state
            .read()
            .unwrap()
            .members
            .other_members_devices(&self.own_member_device.member)
    }

    pub fn are_secrets_already_sent(&self, dest_member: &PublicKey) -> bool {
        self.state
            .read()
            .unwrap()
            .members
            .secrets_already_sent(dest_member)
    }

    pub fn list_service_tokens(&self) -> Vec<ServiceToken> {
        self.state.read().unwrap().tokens.list()
    }

    pub fn list_verified_credentials(&self) -> Vec<AccountVerifiedCredentialRegistered> {
        self.state.read().unwrap().verified_credentials.clone()
    }

    pub fn contact_requests_enabled(&self) -> bool {
        self.state.read().unwrap().contacts.request_enabled()
    }

    pub fn contact_requests_seed(&self) -> Option<Vec<u8>> {
        self.state.read().unwrap().contacts.request_seed()
    }

    pub fn contact_request_own_metadata(&self, contact_pk: &PublicKey) -> Option<Vec<u8>> {
        self.state
            .read()
            .unwrap()
            .contacts
            .own_metadata_for(contact_pk)
    }

    pub fn own_alias_key_sent(&self) -> bool {
        self.state.read().unwrap().own_alias_key_sent
    }

    pub fn other_alias_key(&self) -> Option<PublicKey> {
        self.state.read().unwrap().other_alias_key
    }

    pub fn group_join_status(&self, group_pk: &PublicKey) -> Option<GroupJoinState> {
        self.state.read().unwrap().roster.status(group_pk)
    }

    pub fn list_groups(&self) -> Vec<(PublicKey, RosterEntry)> {
        self.state.read().unwrap().roster.list()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
