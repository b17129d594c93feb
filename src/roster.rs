//! Roster of other groups this account participates in, folded from join and
//! leave events. Rebuilt from scratch on each replay.

use std::collections::BTreeMap;

use crate::error::Result;
use crate::events::{AccountGroupJoined, AccountGroupLeft};
use crate::group::Group;
use crate::ids::PublicKey;

/// Joined/left status of one group.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum GroupJoinState {
    Joined,
    Left,
}

/// One roster record. Leave events carry no descriptor, so `group` is only
/// present for joins.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RosterEntry {
    pub state: GroupJoinState,
    pub group: Option<Group>,
}

#[derive(Clone, Debug, Default)]
pub struct GroupRoster {
    groups: BTreeMap<PublicKey, RosterEntry>,
}

impl GroupRoster {
    pub fn new() -> Self {
        GroupRoster::default()
    }

    /// First write wins per group PK: an existing record of either state
    /// makes this a no-op.
    pub fn apply_group_joined(&mut self, event: &AccountGroupJoined) -> Result<()> {
        let group_pk = event.group.public_key;

        if self.groups.contains_key(&group_pk) {
            return Ok(());
        }

        self.groups.insert(
            group_pk,
            RosterEntry {
                state: GroupJoinState::Joined,
                group: Some(event.group.clone()),
            },
        );

        Ok(())
    }

    pub fn apply_group_left(&mut self, event: &AccountGroupLeft) -> Result<()> {
        let group_pk = PublicKey::from_bytes(&event.group_pk)?;

        if self.groups.contains_key(&group_pk) {
            return Ok(());
        }

        self.groups.insert(
            group_pk,
            RosterEntry {
                state: GroupJoinState::Left,
                group: None,
            },
        );

        Ok(())
    }

    pub fn status(&self, group_pk: &PublicKey) -> Option<GroupJoinState> {
        self.groups.get(group_pk).map(|entry| entry.state)
    }

    pub fn list(&self) -> Vec<(PublicKey, RosterEntry)> {
        self.groups
            .iter()
            .map(|(pk, entry)| (*pk, entry.clone()))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
