//! Command implementations.
//!
//! Each command returns the JSON it prints so it can be tested without a
//! terminal.

use std::io::Read;
use std::path::Path;

use hlsign_core::actions::{normalize_user_action_addresses, order_action};
use hlsign_core::order::order_request_to_wire;
use hlsign_core::signer::stamp_user_action;
use hlsign_core::{
    action_hash, user_signed_envelope, ActionMap, BuilderInfo, Cloid, ExchangeRequest, Grouping,
    OrderRequest, OrderType, PhantomAgent, Signer, Tif, UserSignedKind,
};
use serde_json::{json, Value as JsonValue};
use tracing::info;

use crate::config::CliConfig;
use crate::error::{CliError, CliResult};

/// Read an action object from a JSON file, or stdin when `path` is `-`.
///
/// Key order of the file is kept.
pub fn read_action(path: &Path) -> CliResult<ActionMap> {
    let content = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(path)?
    };
    parse_action(&content)
}

pub fn parse_action(content: &str) -> CliResult<ActionMap> {
    let value: JsonValue = serde_json::from_str(content)
        .map_err(|e| CliError::Input(format!("action is not valid JSON: {e}")))?;
    Ok(ActionMap::try_from(value)?)
}

const MULTI_SIG_TYPE: &str = "multiSig";

/// User-signed kind of an action, from its `type` tag.
///
/// `multiSig` actions are excluded: they are signed through their envelope.
pub fn user_signed_kind(action: &ActionMap) -> Option<UserSignedKind> {
    action
        .get_str("type")
        .and_then(UserSignedKind::from_action_type)
        .filter(|kind| *kind != UserSignedKind::SendMultiSig)
}

fn is_multi_sig(action: &ActionMap) -> bool {
    action.get_str("type") == Some(MULTI_SIG_TYPE)
}

/// The nonce a user-signed action carries in its `nonce` or `time` field.
fn embedded_nonce(action: &ActionMap) -> CliResult<u64> {
    action
        .get("nonce")
        .or_else(|| action.get("time"))
        .and_then(|v| v.as_u64())
        .ok_or_else(|| CliError::Input("user-signed action needs a `nonce` or `time`".to_string()))
}

pub fn address(signer: &Signer) -> JsonValue {
    json!({ "address": signer.address().to_string() })
}

/// Action hash and phantom agent of an exchange action, without signing.
pub fn hash(config: &CliConfig, action: &ActionMap, nonce: u64) -> CliResult<JsonValue> {
    let vault = config.vault_address()?;
    let expires_after = config.expires_after(nonce)?;
    let hash = action_hash(action, vault, nonce, expires_after)?;
    let agent = PhantomAgent::new(hash, config.is_mainnet());
    Ok(json!({
        "actionHash": hash.to_string(),
        "source": agent.source,
        "connectionId": agent.connection_id.to_string(),
    }))
}

/// Sign an exchange (L1) action.
pub fn sign_l1(
    signer: &Signer,
    config: &CliConfig,
    action: ActionMap,
    nonce: u64,
) -> CliResult<ExchangeRequest> {
    if let Some(kind) = user_signed_kind(&action) {
        return Err(CliError::Input(format!(
            "{} is user-signed, use sign-user",
            kind.action_type()
        )));
    }
    if is_multi_sig(&action) {
        return Err(CliError::Input("use sign-multisig for multiSig actions".to_string()));
    }
    let vault = config.vault_address()?;
    let expires_after = config.expires_after(nonce)?;
    let signature = signer.sign_exchange_action(&action, vault, nonce, expires_after)?;
    info!(
        action_type = action.get_str("type").unwrap_or(""),
        nonce, "Signed exchange action"
    );
    Ok(ExchangeRequest::new(action, nonce, signature)
        .with_vault_address(vault)
        .with_expires_after(expires_after))
}

/// Sign a user-signed action; the nonce is taken from the action itself.
///
/// Addresses in the action are lowercased before signing.
pub fn sign_user(
    signer: &Signer,
    config: &CliConfig,
    mut action: ActionMap,
) -> CliResult<ExchangeRequest> {
    let kind = user_signed_kind(&action).ok_or_else(|| {
        CliError::Input(format!(
            "{:?} is not a user-signed action type",
            action.get_str("type").unwrap_or("")
        ))
    })?;
    let nonce = embedded_nonce(&action)?;
    normalize_user_action_addresses(&mut action, kind)?;
    let signature = signer.sign_user_action(&mut action, kind)?;
    info!(action_type = kind.action_type(), nonce, "Signed user action");
    Ok(ExchangeRequest::new(action, nonce, signature).with_vault_address(config.vault_address()?))
}

/// Sign a `multiSig` envelope action as its outer signer.
pub fn sign_multi_sig(
    signer: &Signer,
    config: &CliConfig,
    action: ActionMap,
    nonce: u64,
) -> CliResult<ExchangeRequest> {
    if !is_multi_sig(&action) {
        return Err(CliError::Input("expected a multiSig action".to_string()));
    }
    let vault = config.vault_address()?;
    let expires_after = config.expires_after(nonce)?;
    let signature = signer.sign_multi_sig_action(&action, vault, nonce, expires_after)?;
    info!(nonce, "Signed multi-sig action");
    Ok(ExchangeRequest::new(action, nonce, signature)
        .with_vault_address(vault)
        .with_expires_after(expires_after))
}

/// `eth_signTypedData_v4` payload a wallet would be asked to sign.
pub fn typed_data(config: &CliConfig, mut action: ActionMap, nonce: u64) -> CliResult<JsonValue> {
    let vault = config.vault_address()?;
    let expires_after = config.expires_after(nonce)?;
    let envelope = if let Some(kind) = user_signed_kind(&action) {
        normalize_user_action_addresses(&mut action, kind)?;
        stamp_user_action(&mut action, config.is_mainnet());
        user_signed_envelope(&action, kind.table(), kind.primary_type())?
    } else if is_multi_sig(&action) {
        let hash = action_hash(&action.without("type"), vault, nonce, expires_after)?;
        let mut outer = ActionMap::new()
            .with("multiSigActionHash", hash.to_string())
            .with("nonce", nonce);
        stamp_user_action(&mut outer, config.is_mainnet());
        let kind = UserSignedKind::SendMultiSig;
        user_signed_envelope(&outer, kind.table(), kind.primary_type())?
    } else {
        let hash = action_hash(&action, vault, nonce, expires_after)?;
        PhantomAgent::new(hash, config.is_mainnet()).envelope()
    };
    Ok(envelope.to_json())
}

/// Parameters of the `order` command.
#[derive(Debug, Clone)]
pub struct OrderParams {
    pub coin: String,
    pub is_buy: bool,
    pub sz: f64,
    pub limit_px: f64,
    pub tif: Tif,
    pub reduce_only: bool,
    pub cloid: Option<Cloid>,
    pub builder: Option<BuilderInfo>,
}

/// Build a single limit order from the configured assets and sign it.
pub fn order(
    signer: &Signer,
    config: &CliConfig,
    params: OrderParams,
    nonce: u64,
) -> CliResult<ExchangeRequest> {
    let request = OrderRequest {
        coin: params.coin,
        is_buy: params.is_buy,
        sz: params.sz,
        limit_px: params.limit_px,
        order_type: OrderType::limit(params.tif),
        reduce_only: params.reduce_only,
        cloid: params.cloid,
    };
    let wire = order_request_to_wire(&request, &config.asset_lookup())?;
    let action = order_action(&[wire], Grouping::Na, params.builder.as_ref())?;
    sign_l1(signer, config, action, nonce)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use hlsign_core::KeyManager;

    const TEST_PRIVATE_KEY: &str =
        "0x0123456789012345678901234567890123456789012345678901234567890123";

    fn signer(is_mainnet: bool) -> Signer {
        let km = KeyManager::from_hex(TEST_PRIVATE_KEY, None).unwrap();
        Signer::new(Arc::new(km), is_mainnet)
    }

    fn testnet_config() -> CliConfig {
        CliConfig::from_toml(
            r#"
            network = "testnet"
            [assets]
            ETH = 1
            "#,
        )
        .unwrap()
    }

    #[test]
    fn test_parse_action_keeps_order() {
        let action = parse_action(r#"{"type":"dummy","z":1,"a":2}"#).unwrap();
        assert_eq!(action.keys().collect::<Vec<_>>(), vec!["type", "z", "a"]);
        assert!(parse_action("[1,2]").is_err());
        assert!(parse_action("{").is_err());

        let action = parse_action(r#"{"type":"CSignerAction","jailSelf":null}"#).unwrap();
        assert_eq!(action.get("jailSelf"), Some(&hlsign_core::ActionValue::Nil));
    }

    #[test]
    fn test_sign_l1_matches_reference() {
        let config = CliConfig::default();
        let action = parse_action(r#"{"type":"dummy","num":100000000000}"#).unwrap();
        let request = sign_l1(&signer(true), &config, action, 0).unwrap();
        assert_eq!(
            request.signature.r,
            "0x53749d5b30552aeb2fca34b530185976545bb22d0b3ce6f62e31be961a59298"
        );
        let body = serde_json::to_value(&request).unwrap();
        assert!(body["vaultAddress"].is_null());
        assert!(body.get("expiresAfter").is_none());
    }

    #[test]
    fn test_sign_l1_rejects_user_action() {
        let action =
            parse_action(r#"{"type":"usdSend","destination":"0x0","amount":"1","time":1}"#)
                .unwrap();
        assert!(matches!(
            sign_l1(&signer(true), &CliConfig::default(), action, 1),
            Err(CliError::Input(_))
        ));
    }

    #[test]
    fn test_sign_user_uses_embedded_time() {
        let action = parse_action(
            r#"{"type":"usdSend","destination":"0x5e9ee1089755c3435139848e47e6635505d5a13a","amount":"1","time":1687816341423}"#,
        )
        .unwrap();
        let request = sign_user(&signer(false), &testnet_config(), action).unwrap();
        assert_eq!(request.nonce, 1_687_816_341_423);
        assert_eq!(
            request.signature.r,
            "0x637b37dd731507cdd24f46532ca8ba6eec616952c56218baeff04144e4a77073"
        );
        assert_eq!(request.action.get_str("hyperliquidChain"), Some("Testnet"));
    }

    #[test]
    fn test_sign_user_lowercases_addresses() {
        let mixed = parse_action(
            r#"{"type":"usdSend","destination":"0x5E9EE1089755C3435139848E47E6635505D5A13A","amount":"1","time":1687816341423}"#,
        )
        .unwrap();
        let request = sign_user(&signer(false), &testnet_config(), mixed).unwrap();
        assert_eq!(
            request.action.get_str("destination"),
            Some("0x5e9ee1089755c3435139848e47e6635505d5a13a")
        );
        assert_eq!(
            request.signature.r,
            "0x637b37dd731507cdd24f46532ca8ba6eec616952c56218baeff04144e4a77073"
        );

        let bad = parse_action(
            r#"{"type":"approveBuilderFee","maxFeeRate":"0.001%","builder":"0xnothex","nonce":1}"#,
        )
        .unwrap();
        assert!(matches!(
            sign_user(&signer(false), &testnet_config(), bad),
            Err(CliError::Signing(hlsign_core::SigningError::InvalidAddress { .. }))
        ));
    }

    #[test]
    fn test_sign_user_requires_nonce() {
        let action = parse_action(r#"{"type":"approveAgent","agentAddress":"0x0"}"#).unwrap();
        assert!(matches!(
            sign_user(&signer(false), &testnet_config(), action),
            Err(CliError::Input(_))
        ));
    }

    #[test]
    fn test_hash_reports_connection_id() {
        let action = parse_action(
            r#"{"type":"order","orders":[{"a":4,"b":true,"p":"1670.1","s":"0.0147","r":false,"t":{"limit":{"tif":"Ioc"}}}],"grouping":"na"}"#,
        )
        .unwrap();
        let out = hash(&CliConfig::default(), &action, 1_677_777_606_040).unwrap();
        assert_eq!(
            out["connectionId"],
            "0x0fcbeda5ae3c4950a548021552a4fea2226858c4453571bf3f24ba017eac2908"
        );
        assert_eq!(out["source"], "a");
    }

    #[test]
    fn test_typed_data_for_both_families() {
        let config = testnet_config();
        let user = parse_action(
            r#"{"type":"usdSend","destination":"0x5e9ee1089755c3435139848e47e6635505d5a13a","amount":"1","time":1}"#,
        )
        .unwrap();
        let out = typed_data(&config, user, 0).unwrap();
        assert_eq!(out["primaryType"], "HyperliquidTransaction:UsdSend");
        assert_eq!(out["message"]["hyperliquidChain"], "Testnet");

        let l1 = parse_action(r#"{"type":"noop"}"#).unwrap();
        let out = typed_data(&config, l1, 5).unwrap();
        assert_eq!(out["primaryType"], "Agent");
        assert_eq!(out["message"]["source"], "b");

        let multi_sig = parse_action(
            r#"{"type":"multiSig","signatureChainId":"0x66eee","signatures":[],"payload":{"multiSigUser":"0x0000000000000000000000000000000000000001","outerSigner":"0x0000000000000000000000000000000000000002","action":{"type":"noop"}}}"#,
        )
        .unwrap();
        assert!(user_signed_kind(&multi_sig).is_none());
        let out = typed_data(&config, multi_sig, 5).unwrap();
        assert_eq!(out["primaryType"], "HyperliquidTransaction:SendMultiSig");
        assert_eq!(out["message"]["nonce"], 5);
    }

    #[test]
    fn test_order_resolves_configured_asset() {
        let config = testnet_config();
        let params = OrderParams {
            coin: "ETH".to_string(),
            is_buy: true,
            sz: 100.0,
            limit_px: 100.0,
            tif: Tif::Gtc,
            reduce_only: false,
            cloid: None,
            builder: None,
        };
        let request = order(&signer(false), &config, params.clone(), 0).unwrap();
        assert_eq!(
            request.signature.r,
            "0x82b2ba28e76b3d761093aaded1b1cdad4960b3af30212b343fb2e6cdfa4e3d54"
        );

        let unknown = OrderParams {
            coin: "DOGE".to_string(),
            ..params
        };
        assert!(matches!(
            order(&signer(false), &config, unknown, 0),
            Err(CliError::Signing(hlsign_core::SigningError::UnknownAsset { .. }))
        ));
    }
}
