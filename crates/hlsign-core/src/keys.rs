//! Private key loading.
//!
//! Security notes:
//! - Secret bytes only live in `Zeroizing` buffers while being parsed.
//! - Only the `PrivateKeySigner` is retained.
//! - Never log private key material.

use std::path::PathBuf;

use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use thiserror::Error;
use tracing::info;
use zeroize::Zeroizing;

/// Source of the private key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySource {
    /// Load from environment variable (development).
    EnvVar { var_name: String },
    /// Load from file (production, recommend 0600 permissions).
    File { path: PathBuf },
}

/// Holds the signing key for the process.
pub struct KeyManager {
    signer: PrivateKeySigner,
}

impl KeyManager {
    /// Load the key from `source` and optionally verify its address.
    ///
    /// # Errors
    /// Returns `KeyError` if:
    /// - Environment variable not found
    /// - File read fails
    /// - Hex decoding fails
    /// - Private key is invalid
    /// - Address mismatch
    pub fn load(source: &KeySource, expected_address: Option<Address>) -> Result<Self, KeyError> {
        let secret: Zeroizing<String> = match source {
            KeySource::EnvVar { var_name } => Zeroizing::new(
                std::env::var(var_name).map_err(|_| KeyError::EnvVarNotFound(var_name.clone()))?,
            ),
            KeySource::File { path } => Zeroizing::new(std::fs::read_to_string(path)?),
        };

        let manager = Self::from_hex(&secret, expected_address)?;
        info!(address = %manager.address(), "Loaded signing key");
        Ok(manager)
    }

    /// Parse a hex key (`0x` prefix and surrounding whitespace allowed).
    pub fn from_hex(hex_str: &str, expected_address: Option<Address>) -> Result<Self, KeyError> {
        let trimmed = hex_str.trim();
        let trimmed = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        let secret_bytes = Zeroizing::new(hex::decode(trimmed)?);
        Self::from_bytes(&secret_bytes, expected_address)
    }

    pub fn from_bytes(
        secret_bytes: &[u8],
        expected_address: Option<Address>,
    ) -> Result<Self, KeyError> {
        let signer = PrivateKeySigner::from_slice(secret_bytes)
            .map_err(|e| KeyError::InvalidKey(e.to_string()))?;

        if let Some(expected) = expected_address {
            if signer.address() != expected {
                return Err(KeyError::AddressMismatch {
                    expected,
                    actual: signer.address(),
                });
            }
        }

        Ok(Self { signer })
    }

    pub fn signer(&self) -> &PrivateKeySigner {
        &self.signer
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }
}

impl std::fmt::Debug for KeyManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyManager")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}

/// Key management errors.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("Failed to decode hex: {0}")]
    HexDecode(#[from] hex::FromHexError),

    #[error("Invalid private key: {0}")]
    InvalidKey(String),

    #[error("Address mismatch: expected {expected}, got {actual}")]
    AddressMismatch { expected: Address, actual: Address },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    // Well-known Hardhat/Anvil test key #0
    const TEST_PRIVATE_KEY: &str =
        "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const TEST_ADDRESS: Address = address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");

    #[test]
    fn test_from_hex_accepts_prefix_and_whitespace() {
        let km = KeyManager::from_hex(&format!("  {TEST_PRIVATE_KEY}\n"), None).unwrap();
        assert_eq!(km.address(), TEST_ADDRESS);

        let km = KeyManager::from_hex(&TEST_PRIVATE_KEY[2..], Some(TEST_ADDRESS)).unwrap();
        assert_eq!(km.signer().address(), TEST_ADDRESS);
    }

    #[test]
    fn test_address_mismatch() {
        let err = KeyManager::from_hex(TEST_PRIVATE_KEY, Some(Address::ZERO)).unwrap_err();
        assert!(matches!(err, KeyError::AddressMismatch { .. }), "got {err:?}");
    }

    #[test]
    fn test_invalid_keys() {
        assert!(matches!(
            KeyManager::from_hex("0xnothex", None),
            Err(KeyError::HexDecode(_))
        ));
        assert!(matches!(
            KeyManager::from_bytes(&[0u8; 32], None),
            Err(KeyError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_load_from_env_and_file() {
        let var = "HLSIGN_TEST_KEY_LOAD";
        std::env::set_var(var, TEST_PRIVATE_KEY);
        let km = KeyManager::load(
            &KeySource::EnvVar {
                var_name: var.to_string(),
            },
            Some(TEST_ADDRESS),
        )
        .unwrap();
        assert_eq!(km.address(), TEST_ADDRESS);
        std::env::remove_var(var);

        let missing = KeyManager::load(
            &KeySource::EnvVar {
                var_name: "HLSIGN_TEST_KEY_UNSET".to_string(),
            },
            None,
        );
        assert!(matches!(missing, Err(KeyError::EnvVarNotFound(_))));

        let path = std::env::temp_dir().join(format!("hlsign-key-{}.txt", std::process::id()));
        std::fs::write(&path, format!("{TEST_PRIVATE_KEY}\n")).unwrap();
        let km = KeyManager::load(&KeySource::File { path: path.clone() }, None).unwrap();
        assert_eq!(km.address(), TEST_ADDRESS);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_debug_hides_key() {
        let km = KeyManager::from_hex(TEST_PRIVATE_KEY, None).unwrap();
        let dbg = format!("{km:?}");
        assert!(!dbg.contains("ac0974"));
    }
}
