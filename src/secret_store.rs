//! Secret-store seam: resolves a contact's public key to the pairwise group
//! derived for that contact. Key material never crosses this boundary.

use crate::error::Result;
use crate::group::Group;
use crate::ids::PublicKey;

/// The one external call the index makes while folding the log.
///
/// Implementations are expected to return promptly; the index holds its
/// write lease across this call.
pub trait SecretStore: Send + Sync {
    fn group_for_contact(&self, contact_pk: &PublicKey) -> Result<Group>;
}
