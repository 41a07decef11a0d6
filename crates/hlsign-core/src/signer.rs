//! Signing entry points.
//!
//! Exchange (L1) actions use the 2-stage process:
//! 1. Calculate `action_hash` from action + nonce + vault_address + expires_after
//! 2. Sign the phantom `Agent` carrying that hash using EIP-712
//!
//! User-signed actions sign their own fields directly under the
//! `HyperliquidSignTransaction` domain. Multi-sig envelopes hash the inner
//! action like an L1 action and sign the hash as a user-signed
//! `SendMultiSig` struct.
//!
//! All functions are synchronous and keep no state between calls.

use std::sync::Arc;

use alloy::primitives::{Address, B256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;
use tracing::debug;

use crate::envelope::{
    user_signed_envelope, PhantomAgent, TypedEnvelope, DEFAULT_SIGNATURE_CHAIN_ID,
};
use crate::error::SigningResult;
use crate::hashing::action_hash;
use crate::keys::KeyManager;
use crate::sign_types::{SignTypeTable, UserSignedKind};
use crate::signature::Signature;
use crate::typed_hash::signing_hash;
use crate::value::ActionMap;

/// `hyperliquidChain` values.
pub const MAINNET_CHAIN: &str = "Mainnet";
pub const TESTNET_CHAIN: &str = "Testnet";

/// Sign a prehashed digest.
pub fn sign_hash(signer: &PrivateKeySigner, hash: &B256) -> SigningResult<Signature> {
    let sig = signer.sign_hash_sync(hash)?;
    Ok(Signature::from_primitive(&sig))
}

/// Hash and sign a typed envelope.
pub fn sign_envelope(
    signer: &PrivateKeySigner,
    envelope: &TypedEnvelope,
) -> SigningResult<Signature> {
    let hash = signing_hash(envelope)?;
    sign_hash(signer, &hash)
}

/// Sign an exchange (L1) action.
///
/// # Errors
/// Returns `SigningError` if the action cannot be encoded or the curve
/// operation fails.
pub fn sign_exchange_action(
    signer: &PrivateKeySigner,
    action: &ActionMap,
    vault_address: Option<Address>,
    nonce: u64,
    expires_after: Option<i64>,
    is_mainnet: bool,
) -> SigningResult<Signature> {
    let hash = action_hash(action, vault_address, nonce, expires_after)?;
    let agent = PhantomAgent::new(hash, is_mainnet);
    debug!(
        action_type = action.get_str("type").unwrap_or(""),
        source = agent.source,
        connection_id = %agent.connection_id,
        "Signing exchange action"
    );
    sign_envelope(signer, &agent.envelope())
}

/// Sign a user-signed action.
///
/// Stamps `signatureChainId` and `hyperliquidChain` into `action` first; the
/// request body must carry both.
pub fn sign_user_action(
    signer: &PrivateKeySigner,
    action: &mut ActionMap,
    table: SignTypeTable,
    primary_type: &str,
    is_mainnet: bool,
) -> SigningResult<Signature> {
    stamp_user_action(action, is_mainnet);
    let envelope = user_signed_envelope(action, table, primary_type)?;
    debug!(primary_type, is_mainnet, "Signing user action");
    sign_envelope(signer, &envelope)
}

/// Set `signatureChainId` and `hyperliquidChain`, replacing existing values.
pub fn stamp_user_action(action: &mut ActionMap, is_mainnet: bool) {
    action.insert("signatureChainId", DEFAULT_SIGNATURE_CHAIN_ID);
    action.insert("hyperliquidChain", chain_name(is_mainnet));
}

/// [`sign_user_action`] with the table and primary type of a registered kind.
pub fn sign_user_kind(
    signer: &PrivateKeySigner,
    action: &mut ActionMap,
    kind: UserSignedKind,
    is_mainnet: bool,
) -> SigningResult<Signature> {
    sign_user_action(signer, action, kind.table(), kind.primary_type(), is_mainnet)
}

/// Sign a `multiSig` envelope action as its outer signer.
///
/// The action without its `type` key is hashed like an L1 action; the hash is
/// then signed as `HyperliquidTransaction:SendMultiSig { multiSigActionHash, nonce }`.
pub fn sign_multi_sig_action(
    signer: &PrivateKeySigner,
    action: &ActionMap,
    is_mainnet: bool,
    vault_address: Option<Address>,
    nonce: u64,
    expires_after: Option<i64>,
) -> SigningResult<Signature> {
    let hash = action_hash(&action.without("type"), vault_address, nonce, expires_after)?;
    debug!(multi_sig_action_hash = %hash, "Signing multi-sig envelope");

    let mut envelope = ActionMap::new()
        .with("multiSigActionHash", hash.to_string())
        .with("nonce", nonce);
    sign_user_kind(signer, &mut envelope, UserSignedKind::SendMultiSig, is_mainnet)
}

fn chain_name(is_mainnet: bool) -> &'static str {
    if is_mainnet {
        MAINNET_CHAIN
    } else {
        TESTNET_CHAIN
    }
}

/// Bundles a loaded key with the network flag for repeated signing.
#[derive(Debug, Clone)]
pub struct Signer {
    key_manager: Arc<KeyManager>,
    is_mainnet: bool,
}

impl Signer {
    pub fn new(key_manager: Arc<KeyManager>, is_mainnet: bool) -> Self {
        Self {
            key_manager,
            is_mainnet,
        }
    }

    pub fn address(&self) -> Address {
        self.key_manager.address()
    }

    pub fn is_mainnet(&self) -> bool {
        self.is_mainnet
    }

    pub fn sign_exchange_action(
        &self,
        action: &ActionMap,
        vault_address: Option<Address>,
        nonce: u64,
        expires_after: Option<i64>,
    ) -> SigningResult<Signature> {
        sign_exchange_action(
            self.key_manager.signer(),
            action,
            vault_address,
            nonce,
            expires_after,
            self.is_mainnet,
        )
    }

    pub fn sign_user_action(
        &self,
        action: &mut ActionMap,
        kind: UserSignedKind,
    ) -> SigningResult<Signature> {
        sign_user_kind(self.key_manager.signer(), action, kind, self.is_mainnet)
    }

    pub fn sign_multi_sig_action(
        &self,
        action: &ActionMap,
        vault_address: Option<Address>,
        nonce: u64,
        expires_after: Option<i64>,
    ) -> SigningResult<Signature> {
        sign_multi_sig_action(
            self.key_manager.signer(),
            action,
            self.is_mainnet,
            vault_address,
            nonce,
            expires_after,
        )
    }
}
