//! Member/device registry: device keys bound to member keys, the admin set,
//! and the set of members this device already sent its chain key to.
//!
//! This state is monotonic: it accumulates across replays and is never reset
//! by the replay engine.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{IndexError, Result};
use crate::events::{
    GroupDeviceChainKeyAdded, GroupMemberDeviceAdded, MultiMemberGroupAdminRoleGranted,
    MultiMemberGroupInitialMemberAnnounced,
};
use crate::ids::{MemberDevice, PublicKey};

#[derive(Clone, Debug, Default)]
pub struct MemberRegistry {
    /// memberPK -> bindings announced for that member.
    members: BTreeMap<PublicKey, Vec<MemberDevice>>,
    /// devicePK -> its binding. A device belongs to at most one member.
    devices: BTreeMap<PublicKey, MemberDevice>,
    admins: BTreeSet<PublicKey>,
    /// Destination members this device already disclosed its chain key to.
    sent_secrets: BTreeSet<PublicKey>,
}

impl MemberRegistry {
    pub fn new() -> Self {
        MemberRegistry::default()
    }

    // -----------------------------------------------------------------------
    // Apply functions, called from the replay engine under its write lease
    // -----------------------------------------------------------------------

    /// Register a (member, device) binding. Re-announcements of a known
    /// device are no-ops.
    pub fn apply_member_device_added(&mut self, event: &GroupMemberDeviceAdded) -> Result<()> {
        let member = PublicKey::from_bytes(&event.member_pk)?;
        let device = PublicKey::from_bytes(&event.device_pk)?;

        if self.devices.contains_key(&device) {
            return Ok(());
        }

        let binding = MemberDevice::new(member, device);
        self.devices.insert(device, binding);
        self.members.entry(member).or_default().push(binding);

        Ok(())
    }

    /// Track chain keys sent by the own device.
    pub fn apply_chain_key_added(
        &mut self,
        event: &GroupDeviceChainKeyAdded,
        own_device: &PublicKey,
    ) -> Result<()> {
        let dest_member = PublicKey::from_bytes(&event.dest_member_pk)?;
        let sender = PublicKey::from_bytes(&event.device_pk)?;

        if sender == *own_device {
            self.sent_secrets.insert(dest_member);
        }

        Ok(())
    }

    /// Admit the announced initial member as admin. A second announcement of
    /// the same member is an impossible condition.
    pub fn apply_initial_member_announced(
        &mut self,
        event: &MultiMemberGroupInitialMemberAnnounced,
    ) -> Result<()> {
        let member = PublicKey::from_bytes(&event.member_pk)?;

        if self.admins.contains(&member) {
            return Err(IndexError::Internal(format!(
                "member {} already admitted as admin",
                member
            )));
        }

        self.admins.insert(member);
        Ok(())
    }

    /// Grant the admin role to a further member. Duplicate grants are no-ops.
    pub fn apply_admin_role_granted(
        &mut self,
        event: &MultiMemberGroupAdminRoleGranted,
    ) -> Result<()> {
        let member = PublicKey::from_bytes(&event.grantee_member_pk)?;
        self.admins.insert(member);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Resolve the member a device is bound to.
    pub fn member_by_device(&self, device: &PublicKey) -> Result<PublicKey> {
        self.devices
            .get(device)
            .map(|binding| binding.member)
            .ok_or(IndexError::MissingInput)
    }

    /// All devices announced for a member.
    pub fn devices_for_member(&self, member: &PublicKey) -> Result<Vec<PublicKey>> {
        let bindings = self
            .members
            .get(member)
            .ok_or_else(|| IndexError::InvalidInput(format!("unknown member {}", member)))?;
        Ok(bindings.iter().map(|binding| binding.device).collect())
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    pub fn members(&self) -> Vec<PublicKey> {
        self.members.keys().copied().collect()
    }

    pub fn devices(&self) -> Vec<PublicKey> {
        self.devices.keys().copied().collect()
    }

    pub fn admins(&self) -> Vec<PublicKey> {
        self.admins.iter().copied().collect()
    }

    /// Every device key whose member differs from `own_member`.
    pub fn other_members_devices(&self, own_member: &PublicKey) -> Vec<PublicKey> {
        self.members
            .iter()
            .filter(|(member, _)| *member != own_member)
            .flat_map(|(_, bindings)| bindings.iter().map(|binding| binding.device))
            .collect()
    }

    pub fn secrets_already_sent(&self, dest_member: &PublicKey) -> bool {
        self.sent_secrets.contains(dest_member)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::generate_keypair;

    fn device_added(member: &PublicKey, device: &PublicKey) -> GroupMemberDeviceAdded {
        GroupMemberDeviceAdded {
            member_pk: member.as_bytes().to_vec(),
            device_pk: device.as_bytes().to_vec(),
        }
    }

    #[test]
    fn test_member_device_added() {
        let mut registry = MemberRegistry::new();
        let (member, _) = generate_keypair();
        let (device, _) = generate_keypair();

        registry
            .apply_member_device_added(&device_added(&member, &device))
            .unwrap();

        assert_eq!(registry.member_count(), 1);
        assert_eq!(registry.device_count(), 1);
        assert_eq!(registry.member_by_device(&device).unwrap(), member);
        assert_eq!(registry.devices_for_member(&member).unwrap(), vec![device]);
    }

    #[test]
    fn test_duplicate_device_ignored() {
        let mut registry = MemberRegistry::new();
        let (member_a, _) = generate_keypair();
        let (member_b, _) = generate_keypair();
        let (device, _) = generate_keypair();

        registry
            .apply_member_device_added(&device_added(&member_a, &device))
            .unwrap();
        // Same device re-announced under another member: ignored.
        registry
            .apply_member_device_added(&device_added(&member_b, &device))
            .unwrap();

        assert_eq!(registry.device_count(), 1);
        assert_eq!(registry.member_by_device(&device).unwrap(), member_a);
        assert!(registry.devices_for_member(&member_b).is_err());
    }

    #[test]
    fn test_bad_key_size_rejected() {
        let mut registry = MemberRegistry::new();
        let event = GroupMemberDeviceAdded {
            member_pk: vec![1u8; 16],
            device_pk: vec![2u8; 32],
        };
        let err = registry.apply_member_device_added(&event).unwrap_err();
        assert!(matches!(err, IndexError::Deserialization(_)));
        assert_eq!(registry.member_count(), 0);
    }

    #[test]
    fn test_unknown_lookups() {
        let registry = MemberRegistry::new();
        let (pk, _) = generate_keypair();

        assert!(matches!(
            registry.member_by_device(&pk).unwrap_err(),
            IndexError::MissingInput
        ));
        assert!(matches!(
            registry.devices_for_member(&pk).unwrap_err(),
            IndexError::InvalidInput(_)
        ));
    }

    #[test]
    fn test_chain_key_tracks_own_device_only() {
        let mut registry = MemberRegistry::new();
        let (own_device, _) = generate_keypair();
        let (other_device, _) = generate_keypair();
        let (dest_a, _) = generate_keypair();
        let (dest_b, _) = generate_keypair();

        let own_event = GroupDeviceChainKeyAdded {
            device_pk: own_device.as_bytes().to_vec(),
            dest_member_pk: dest_a.as_bytes().to_vec(),
            payload: vec![0xAA],
        };
        let foreign_event = GroupDeviceChainKeyAdded {
            device_pk: other_device.as_bytes().to_vec(),
            dest_member_pk: dest_b.as_bytes().to_vec(),
            payload: vec![0xBB],
        };

        registry.apply_chain_key_added(&own_event, &own_device).unwrap();
        registry
            .apply_chain_key_added(&foreign_event, &own_device)
            .unwrap();

        assert!(registry.secrets_already_sent(&dest_a));
        assert!(!registry.secrets_already_sent(&dest_b));
    }

    #[test]
    fn test_initial_member_duplicate_is_internal_error() {
        let mut registry = MemberRegistry::new();
        let (member, _) = generate_keypair();
        let event = MultiMemberGroupInitialMemberAnnounced {
            member_pk: member.as_bytes().to_vec(),
        };

        registry.apply_initial_member_announced(&event).unwrap();
        let err = registry.apply_initial_member_announced(&event).unwrap_err();
        assert!(matches!(err, IndexError::Internal(_)));
        assert_eq!(registry.admins().len(), 1);
    }

    #[test]
    fn test_admin_grant_accepts_duplicates() {
        let mut registry = MemberRegistry::new();
        let (initial, _) = generate_keypair();
        let (grantee, _) = generate_keypair();

        registry
            .apply_initial_member_announced(&MultiMemberGroupInitialMemberAnnounced {
                member_pk: initial.as_bytes().to_vec(),
            })
            .unwrap();

        let grant = MultiMemberGroupAdminRoleGranted {
            grantee_member_pk: grantee.as_bytes().to_vec(),
        };
        registry.apply_admin_role_granted(&grant).unwrap();
        registry.apply_admin_role_granted(&grant).unwrap();

        let admins = registry.admins();
        assert_eq!(admins.len(), 2);
        assert!(admins.contains(&initial));
        assert!(admins.contains(&grantee));
    }

    #[test]
    fn test_other_members_devices() {
        let mut registry = MemberRegistry::new();
        let (own_member, _) = generate_keypair();
        let (own_device, _) = generate_keypair();
        let (other_member, _) = generate_keypair();
        let (other_device_1, _) = generate_keypair();
        let (other_device_2, _) = generate_keypair();

        registry
            .apply_member_device_added(&device_added(&own_member, &own_device))
            .unwrap();
        registry
            .apply_member_device_added(&device_added(&other_member, &other_device_1))
            .unwrap();
        registry
            .apply_member_device_added(&device_added(&other_member, &other_device_2))
            .unwrap();

        let mut devices = registry.other_members_devices(&own_member);
        devices.sort();
        let mut expected = vec![other_device_1, other_device_2];
        expected.sort();
        assert_eq!(devices, expected);
    }
}
