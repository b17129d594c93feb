//! Service-token registry. Removal writes a tombstone under the token id so
//! listing skips it and a later re-add is suppressed by first-write-wins.

use std::collections::BTreeMap;

use crate::error::Result;
use crate::events::{AccountServiceTokenAdded, AccountServiceTokenRemoved, ServiceToken};

#[derive(Clone, Debug, Default)]
pub struct TokenRegistry {
    tokens: BTreeMap<String, Option<ServiceToken>>,
}

impl TokenRegistry {
    pub fn new() -> Self {
        TokenRegistry::default()
    }

    /// Store the token unless its id is already present, tombstone included.
    pub fn apply_token_added(&mut self, event: &AccountServiceTokenAdded) -> Result<()> {
        let token_id = event.service_token.token_id();

        if self.tokens.contains_key(&token_id) {
            return Ok(());
        }

        self.tokens.insert(token_id, Some(event.service_token.clone()));
        Ok(())
    }

    pub fn apply_token_removed(&mut self, event: &AccountServiceTokenRemoved) -> Result<()> {
        self.tokens.insert(event.token_id.clone(), None);
        Ok(())
    }

    /// All live tokens; tombstones are skipped.
    pub fn list(&self) -> Vec<ServiceToken> {
        self.tokens.values().filter_map(|t| t.clone()).collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
