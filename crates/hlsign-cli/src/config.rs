//! CLI configuration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use alloy::primitives::Address;
use hlsign_core::wire::parse_address;
use hlsign_core::{AssetLookup, KeySource};
use serde::{Deserialize, Serialize};

use crate::error::{CliError, CliResult};

/// Environment variable naming the config file.
pub const CONFIG_ENV_VAR: &str = "HLSIGN_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";
/// Key variable used when the config names no key source.
pub const DEFAULT_KEY_ENV_VAR: &str = "HLSIGN_PRIVATE_KEY";

/// Which exchange deployment signatures are produced for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Mainnet,
    Testnet,
}

/// Where the private key is read from: `{ env = "VAR" }` or `{ file = "path" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyConfig {
    Env(String),
    File(PathBuf),
}

impl Default for KeyConfig {
    fn default() -> Self {
        Self::Env(DEFAULT_KEY_ENV_VAR.to_string())
    }
}

impl KeyConfig {
    pub fn to_source(&self) -> KeySource {
        match self {
            Self::Env(var_name) => KeySource::EnvVar {
                var_name: var_name.clone(),
            },
            Self::File(path) => KeySource::File { path: path.clone() },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CliConfig {
    #[serde(default)]
    pub network: Network,

    #[serde(default)]
    pub key: KeyConfig,

    /// Refuse to sign if the loaded key has a different address.
    #[serde(default)]
    pub expected_address: Option<String>,

    /// Vault or sub-account to trade for.
    #[serde(default)]
    pub vault_address: Option<String>,

    /// When set, requests expire `expires_after_ms` after their nonce.
    #[serde(default)]
    pub expires_after_ms: Option<u64>,

    /// Coin -> asset id.
    #[serde(default)]
    pub assets: BTreeMap<String, u32>,
}

impl CliConfig {
    /// Resolve the config path (argument > `HLSIGN_CONFIG` > default) and load it.
    ///
    /// A missing file yields the defaults.
    pub fn load(path: Option<String>) -> CliResult<Self> {
        let config_path = path
            .or_else(|| std::env::var(CONFIG_ENV_VAR).ok())
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

        if Path::new(&config_path).exists() {
            tracing::info!(config_path = %config_path, "Loading configuration");
            Self::from_file(&config_path)
        } else {
            tracing::warn!(path = %config_path, "Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load from a specific file.
    pub fn from_file(path: &str) -> CliResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| CliError::Config(format!("Failed to read config: {e}")))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> CliResult<Self> {
        toml::from_str(content).map_err(|e| CliError::Config(format!("Failed to parse config: {e}")))
    }

    pub fn is_mainnet(&self) -> bool {
        self.network == Network::Mainnet
    }

    pub fn expected_address(&self) -> CliResult<Option<Address>> {
        parse_optional("expected_address", self.expected_address.as_deref())
    }

    pub fn vault_address(&self) -> CliResult<Option<Address>> {
        parse_optional("vault_address", self.vault_address.as_deref())
    }

    /// `expiresAfter` for a request with this nonce.
    pub fn expires_after(&self, nonce: u64) -> CliResult<Option<i64>> {
        self.expires_after_ms
            .map(|offset| {
                nonce
                    .checked_add(offset)
                    .and_then(|t| i64::try_from(t).ok())
                    .ok_or_else(|| CliError::Config(format!("expires_after_ms {offset} overflows")))
            })
            .transpose()
    }

    pub fn asset_lookup(&self) -> AssetLookup {
        AssetLookup::new(self.assets.iter().map(|(coin, id)| (coin.as_str(), *id)))
    }
}

fn parse_optional(field: &str, value: Option<&str>) -> CliResult<Option<Address>> {
    value
        .map(|v| parse_address(v).map_err(|e| CliError::Config(format!("{field}: {e}"))))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let config = CliConfig::from_toml(
            r#"
            network = "testnet"
            key = { file = "/run/secrets/hl_key" }
            expected_address = "0x14dC79964da2C08b23698B3D3cc7Ca32193d9955"
            vault_address = "0x1719884eb866cb12b2287399b15f7db5e7d775ea"
            expires_after_ms = 60000

            [assets]
            BTC = 0
            ETH = 1
            "PURR/USDC" = 10000
            "#,
        )
        .unwrap();

        assert!(!config.is_mainnet());
        assert_eq!(
            config.key.to_source(),
            KeySource::File {
                path: PathBuf::from("/run/secrets/hl_key")
            }
        );
        assert!(config.expected_address().unwrap().is_some());
        assert_eq!(
            config.vault_address().unwrap().unwrap().to_string().to_lowercase(),
            "0x1719884eb866cb12b2287399b15f7db5e7d775ea"
        );
        assert_eq!(config.expires_after(1_000).unwrap(), Some(61_000));

        let assets = config.asset_lookup();
        assert_eq!(assets.len(), 3);
        assert_eq!(assets.asset("PURR/USDC").unwrap(), 10_000);
    }

    #[test]
    fn test_defaults() {
        let config = CliConfig::from_toml("").unwrap();
        assert!(config.is_mainnet());
        assert_eq!(config.key, KeyConfig::Env(DEFAULT_KEY_ENV_VAR.to_string()));
        assert_eq!(config.vault_address().unwrap(), None);
        assert_eq!(config.expires_after(5).unwrap(), None);
        assert!(config.asset_lookup().is_empty());
    }

    #[test]
    fn test_env_key_source() {
        let config = CliConfig::from_toml(r#"key = { env = "MY_KEY" }"#).unwrap();
        assert_eq!(
            config.key.to_source(),
            KeySource::EnvVar {
                var_name: "MY_KEY".to_string()
            }
        );
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            CliConfig::from_toml(r#"network = "devnet""#),
            Err(CliError::Config(_))
        ));

        let config = CliConfig::from_toml(r#"vault_address = "0x1234""#).unwrap();
        assert!(matches!(config.vault_address(), Err(CliError::Config(_))));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = CliConfig::load(Some("/nonexistent/hlsign.toml".to_string())).unwrap();
        assert_eq!(config, CliConfig::default());
    }
}
