//! Action hashing.
//!
//! `action_hash = keccak256(msgpack(action) ++ nonce_be8 ++ vault ++ [expiry])`
//!
//! - vault: `0x00` when absent, `0x01 ++ 20 address bytes` when present
//! - expiry: omitted entirely when absent, `0x00 ++ expires_be8` when present
//!
//! The expiry marker is always zero; presence is signalled by the section
//! existing at all. Vault always precedes expiry.

use alloy::primitives::{keccak256, Address, B256};
use tracing::debug;

use crate::encoding::encode_action;
use crate::error::SigningResult;
use crate::value::ActionMap;

const VAULT_ABSENT: u8 = 0x00;
const VAULT_PRESENT: u8 = 0x01;
const EXPIRY_MARKER: u8 = 0x00;

/// Inputs to the action hash.
#[derive(Debug, Clone, Copy)]
pub struct HashInput<'a> {
    pub action: &'a ActionMap,
    pub nonce: u64,
    /// None = trading for the signer itself
    pub vault_address: Option<Address>,
    pub expires_after: Option<i64>,
}

impl<'a> HashInput<'a> {
    pub fn new(action: &'a ActionMap, nonce: u64) -> Self {
        Self {
            action,
            nonce,
            vault_address: None,
            expires_after: None,
        }
    }

    pub fn with_vault(mut self, vault_address: Option<Address>) -> Self {
        self.vault_address = vault_address;
        self
    }

    pub fn with_expires_after(mut self, expires_after: Option<i64>) -> Self {
        self.expires_after = expires_after;
        self
    }

    /// The exact byte string that gets hashed.
    ///
    /// # Errors
    /// Returns `SigningError::Encoding` if the action cannot be encoded.
    pub fn preimage(&self) -> SigningResult<Vec<u8>> {
        let mut data = encode_action(self.action)?;

        data.extend_from_slice(&self.nonce.to_be_bytes());

        match &self.vault_address {
            None => data.push(VAULT_ABSENT),
            Some(addr) => {
                data.push(VAULT_PRESENT);
                data.extend_from_slice(addr.as_slice());
            }
        }

        if let Some(expires) = self.expires_after {
            data.push(EXPIRY_MARKER);
            data.extend_from_slice(&expires.to_be_bytes());
        }

        Ok(data)
    }

    /// Keccak-256 of [`preimage`](Self::preimage).
    pub fn action_hash(&self) -> SigningResult<B256> {
        let hash = keccak256(self.preimage()?);
        debug!(
            nonce = self.nonce,
            vault = ?self.vault_address,
            expires_after = ?self.expires_after,
            action_hash = %hash,
            "Computed action hash"
        );
        Ok(hash)
    }
}

/// Hash an action together with its session metadata.
pub fn action_hash(
    action: &ActionMap,
    vault_address: Option<Address>,
    nonce: u64,
    expires_after: Option<i64>,
) -> SigningResult<B256> {
    HashInput::new(action, nonce)
        .with_vault(vault_address)
        .with_expires_after(expires_after)
        .action_hash()
}
