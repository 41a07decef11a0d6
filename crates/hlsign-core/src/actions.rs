//! Action builders.
//!
//! Each builder only assembles the ordered key/value action; signing is a
//! separate step. Key order follows what the exchange's reference clients
//! send, which matters for exchange (L1) actions because their msgpack bytes
//! are hashed. Addresses that end up inside a signed message are lowercased.
//!
//! Exchange actions are signed with [`sign_exchange_action`], user-signed ones
//! with [`sign_user_kind`] and the matching [`UserSignedKind`].
//!
//! [`sign_exchange_action`]: crate::signer::sign_exchange_action
//! [`sign_user_kind`]: crate::signer::sign_user_kind
//! [`UserSignedKind`]: crate::sign_types::UserSignedKind

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::SigningResult;
use crate::order::{BuilderInfo, CancelByCloidWire, CancelWire, Grouping, ModifyWire, OrderWire};
use crate::sign_types::UserSignedKind;
use crate::signature::Signature;
use crate::value::{ActionMap, ActionValue};
use crate::wire::{float_to_wire, normalize_address};

// =============================================================================
// Exchange (L1) actions
// =============================================================================

/// `{"type": "order", "orders": [...], "grouping": "na", ["builder": {...}]}`
pub fn order_action(
    orders: &[OrderWire],
    grouping: Grouping,
    builder: Option<&BuilderInfo>,
) -> SigningResult<ActionMap> {
    let mut action = ActionMap::with_type("order")
        .with("orders", ActionValue::from_serialize(orders)?)
        .with("grouping", grouping.as_str());
    if let Some(builder) = builder {
        action.insert("builder", ActionValue::from_serialize(builder)?);
    }
    Ok(action)
}

pub fn cancel_action(cancels: &[CancelWire]) -> SigningResult<ActionMap> {
    Ok(ActionMap::with_type("cancel").with("cancels", ActionValue::from_serialize(cancels)?))
}

pub fn cancel_by_cloid_action(cancels: &[CancelByCloidWire]) -> SigningResult<ActionMap> {
    Ok(ActionMap::with_type("cancelByCloid")
        .with("cancels", ActionValue::from_serialize(cancels)?))
}

pub fn batch_modify_action(modifies: &[ModifyWire]) -> SigningResult<ActionMap> {
    Ok(ActionMap::with_type("batchModify")
        .with("modifies", ActionValue::from_serialize(modifies)?))
}

/// Dead man's switch. `None` clears a scheduled cancel.
pub fn schedule_cancel_action(time: Option<u64>) -> ActionMap {
    let mut action = ActionMap::with_type("scheduleCancel");
    if let Some(time) = time {
        action.insert("time", time);
    }
    action
}

pub fn update_leverage_action(asset: u32, is_cross: bool, leverage: u32) -> ActionMap {
    ActionMap::with_type("updateLeverage")
        .with("asset", asset)
        .with("isCross", is_cross)
        .with("leverage", leverage)
}

/// `ntli` is the USD amount scaled by 10^6 (see [`float_to_usd_int`]).
///
/// [`float_to_usd_int`]: crate::wire::float_to_usd_int
pub fn update_isolated_margin_action(asset: u32, is_buy: bool, ntli: i64) -> ActionMap {
    ActionMap::with_type("updateIsolatedMargin")
        .with("asset", asset)
        .with("isBuy", is_buy)
        .with("ntli", ntli)
}

/// Invalidates a nonce without doing anything else.
pub fn noop_action() -> ActionMap {
    ActionMap::with_type("noop")
}

/// TWAP order wire format: `{a, b, s, r, m, t}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TwapWire {
    #[serde(rename = "a")]
    pub asset: u32,
    #[serde(rename = "b")]
    pub is_buy: bool,
    #[serde(rename = "s")]
    pub sz: String,
    #[serde(rename = "r")]
    pub reduce_only: bool,
    /// Duration in minutes
    #[serde(rename = "m")]
    pub minutes: u32,
    #[serde(rename = "t")]
    pub randomize: bool,
}

pub fn twap_order_action(
    asset: u32,
    is_buy: bool,
    sz: f64,
    reduce_only: bool,
    minutes: u32,
    randomize: bool,
) -> SigningResult<ActionMap> {
    let twap = TwapWire {
        asset,
        is_buy,
        sz: float_to_wire(sz)?,
        reduce_only,
        minutes,
        randomize,
    };
    Ok(ActionMap::with_type("twapOrder").with("twap", ActionValue::from_serialize(&twap)?))
}

pub fn twap_cancel_action(asset: u32, twap_id: u64) -> ActionMap {
    ActionMap::with_type("twapCancel")
        .with("a", asset)
        .with("t", twap_id)
}

pub fn create_sub_account_action(name: &str) -> ActionMap {
    ActionMap::with_type("createSubAccount").with("name", name)
}

pub fn set_referrer_action(code: &str) -> ActionMap {
    ActionMap::with_type("setReferrer").with("code", code)
}

/// `usd` is in micro-USD.
pub fn sub_account_transfer_action(
    sub_account_user: &str,
    is_deposit: bool,
    usd: u64,
) -> SigningResult<ActionMap> {
    Ok(ActionMap::with_type("subAccountTransfer")
        .with("subAccountUser", normalize_address(sub_account_user)?)
        .with("isDeposit", is_deposit)
        .with("usd", usd))
}

pub fn sub_account_spot_transfer_action(
    sub_account_user: &str,
    is_deposit: bool,
    token: &str,
    amount: &str,
) -> SigningResult<ActionMap> {
    Ok(ActionMap::with_type("subAccountSpotTransfer")
        .with("subAccountUser", normalize_address(sub_account_user)?)
        .with("isDeposit", is_deposit)
        .with("token", token)
        .with("amount", amount))
}

pub fn vault_transfer_action(
    vault_address: &str,
    is_deposit: bool,
    usd: u64,
) -> SigningResult<ActionMap> {
    Ok(ActionMap::with_type("vaultTransfer")
        .with("vaultAddress", normalize_address(vault_address)?)
        .with("isDeposit", is_deposit)
        .with("usd", usd))
}

pub fn agent_enable_dex_abstraction_action() -> ActionMap {
    ActionMap::with_type("agentEnableDexAbstraction")
}

pub fn use_big_blocks_action(enable: bool) -> ActionMap {
    ActionMap::with_type("evmUserModify").with("usingBigBlocks", enable)
}

/// Outer `multiSig` action wrapping `inner`, signed with
/// [`sign_multi_sig_action`](crate::signer::sign_multi_sig_action).
///
/// `signatures` are the authorised users' signatures over the inner action.
pub fn multi_sig_action(
    multi_sig_user: &str,
    outer_signer: &str,
    inner: ActionMap,
    signatures: &[Signature],
) -> SigningResult<ActionMap> {
    let payload = ActionMap::new()
        .with("multiSigUser", normalize_address(multi_sig_user)?)
        .with("outerSigner", normalize_address(outer_signer)?)
        .with("action", inner);
    Ok(ActionMap::with_type("multiSig")
        .with("signatureChainId", crate::envelope::DEFAULT_SIGNATURE_CHAIN_ID)
        .with("signatures", ActionValue::from_serialize(signatures)?)
        .with("payload", payload))
}

// =============================================================================
// Deployment and validator actions
// =============================================================================

fn spot_deploy(variant: &str, body: ActionMap) -> ActionMap {
    ActionMap::with_type("spotDeploy").with(variant, body)
}

fn spot_deploy_token(variant: &str, token: u32) -> ActionMap {
    spot_deploy(variant, ActionMap::new().with("token", token))
}

pub fn spot_deploy_register_token_action(
    token_name: &str,
    sz_decimals: u32,
    wei_decimals: u32,
    max_gas: u64,
    full_name: &str,
) -> ActionMap {
    let spec = ActionMap::new()
        .with("name", token_name)
        .with("szDecimals", sz_decimals)
        .with("weiDecimals", wei_decimals);
    spot_deploy(
        "registerToken2",
        ActionMap::new()
            .with("spec", spec)
            .with("maxGas", max_gas)
            .with("fullName", full_name),
    )
}

/// Initial balances: `[user, wei]` pairs and `[token, wei]` pairs for
/// holders of an existing token.
pub fn spot_deploy_user_genesis_action(
    token: u32,
    user_and_wei: &[(&str, &str)],
    existing_token_and_wei: &[(u32, &str)],
) -> SigningResult<ActionMap> {
    let users = user_and_wei
        .iter()
        .map(|(user, wei)| -> SigningResult<ActionValue> {
            Ok(vec![normalize_address(user)?, wei.to_string()].into())
        })
        .collect::<SigningResult<Vec<_>>>()?;
    let existing: Vec<ActionValue> = existing_token_and_wei
        .iter()
        .map(|(token, wei)| ActionValue::Seq(vec![(*token).into(), (*wei).into()]))
        .collect();
    Ok(spot_deploy(
        "userGenesis",
        ActionMap::new()
            .with("token", token)
            .with("userAndWei", users)
            .with("existingTokenAndWei", existing),
    ))
}

pub fn spot_deploy_genesis_action(
    token: u32,
    max_supply: &str,
    no_hyperliquidity: bool,
) -> ActionMap {
    let mut genesis = ActionMap::new()
        .with("token", token)
        .with("maxSupply", max_supply);
    if no_hyperliquidity {
        genesis.insert("noHyperliquidity", true);
    }
    spot_deploy("genesis", genesis)
}

pub fn spot_deploy_register_spot_action(base_token: u32, quote_token: u32) -> ActionMap {
    spot_deploy(
        "registerSpot",
        ActionMap::new().with("tokens", vec![base_token, quote_token]),
    )
}

pub fn spot_deploy_register_hyperliquidity_action(
    spot: u32,
    start_px: f64,
    order_sz: f64,
    n_orders: u32,
    n_seeded_levels: Option<u32>,
) -> SigningResult<ActionMap> {
    let mut body = ActionMap::new()
        .with("spot", spot)
        .with("startPx", float_to_wire(start_px)?)
        .with("orderSz", float_to_wire(order_sz)?)
        .with("nOrders", n_orders);
    if let Some(levels) = n_seeded_levels {
        body.insert("nSeededLevels", levels);
    }
    Ok(spot_deploy("registerHyperliquidity", body))
}

/// `share` is a percentage string such as `"100%"`.
pub fn spot_deploy_set_deployer_trading_fee_share_action(token: u32, share: &str) -> ActionMap {
    spot_deploy(
        "setDeployerTradingFeeShare",
        ActionMap::new().with("token", token).with("share", share),
    )
}

pub fn spot_deploy_enable_freeze_privilege_action(token: u32) -> ActionMap {
    spot_deploy_token("enableFreezePrivilege", token)
}

pub fn spot_deploy_freeze_user_action(
    token: u32,
    user: &str,
    freeze: bool,
) -> SigningResult<ActionMap> {
    Ok(spot_deploy(
        "freezeUser",
        ActionMap::new()
            .with("token", token)
            .with("user", normalize_address(user)?)
            .with("freeze", freeze),
    ))
}

pub fn spot_deploy_revoke_freeze_privilege_action(token: u32) -> ActionMap {
    spot_deploy_token("revokeFreezePrivilege", token)
}

pub fn spot_deploy_enable_quote_token_action(token: u32) -> ActionMap {
    spot_deploy_token("enableQuoteToken", token)
}

/// `assetRequest` of a perp deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PerpAssetRequest {
    pub coin: String,
    pub sz_decimals: u32,
    pub oracle_px: String,
    pub margin_table_id: u32,
    pub only_isolated: bool,
}

/// Schema of a new perp dex, sent along with its first asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PerpDexSchema {
    pub full_name: String,
    pub collateral_token: u32,
    pub oracle_updater: Option<String>,
}

/// Register an asset on a builder-deployed perp dex.
///
/// Absent `max_gas` and `schema` are sent as `null`.
pub fn perp_deploy_register_asset_action(
    dex: &str,
    max_gas: Option<u64>,
    asset: &PerpAssetRequest,
    schema: Option<&PerpDexSchema>,
) -> SigningResult<ActionMap> {
    let asset_request = ActionMap::new()
        .with("coin", asset.coin.as_str())
        .with("szDecimals", asset.sz_decimals)
        .with("oraclePx", asset.oracle_px.as_str())
        .with("marginTableId", asset.margin_table_id)
        .with("onlyIsolated", asset.only_isolated);
    let schema = match schema {
        Some(schema) => {
            let oracle_updater = schema
                .oracle_updater
                .as_deref()
                .map(normalize_address)
                .transpose()?;
            Some(
                ActionMap::new()
                    .with("fullName", schema.full_name.as_str())
                    .with("collateralToken", schema.collateral_token)
                    .with("oracleUpdater", oracle_updater),
            )
        }
        None => None,
    };
    let body = ActionMap::new()
        .with("maxGas", max_gas)
        .with("assetRequest", asset_request)
        .with("dex", dex)
        .with("schema", schema);
    Ok(ActionMap::with_type("perpDeploy").with("registerAsset", body))
}

fn sorted_pairs(prices: &BTreeMap<String, String>) -> ActionValue {
    prices
        .iter()
        .map(|(coin, px)| ActionValue::from(vec![coin.as_str(), px.as_str()]))
        .collect::<Vec<_>>()
        .into()
}

/// Oracle, mark and external prices for a perp dex, each sent as
/// `[coin, px]` pairs sorted by coin.
pub fn perp_deploy_set_oracle_action(
    dex: &str,
    oracle_pxs: &BTreeMap<String, String>,
    all_mark_pxs: &[BTreeMap<String, String>],
    external_perp_pxs: &BTreeMap<String, String>,
) -> ActionMap {
    let mark_pxs: Vec<ActionValue> = all_mark_pxs.iter().map(sorted_pairs).collect();
    let body = ActionMap::new()
        .with("dex", dex)
        .with("oraclePxs", sorted_pairs(oracle_pxs))
        .with("markPxs", mark_pxs)
        .with("externalPerpPxs", sorted_pairs(external_perp_pxs));
    ActionMap::with_type("perpDeploy").with("setOracle", body)
}

pub fn c_signer_jail_self_action() -> ActionMap {
    ActionMap::with_type("CSignerAction").with("jailSelf", ActionValue::Nil)
}

pub fn c_signer_unjail_self_action() -> ActionMap {
    ActionMap::with_type("CSignerAction").with("unjailSelf", ActionValue::Nil)
}

/// Profile of a validator being registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorProfile {
    pub node_ip: String,
    pub name: String,
    pub description: String,
    pub delegations_disabled: bool,
    pub commission_bps: u32,
    pub signer: String,
}

pub fn c_validator_register_action(
    profile: &ValidatorProfile,
    unjailed: bool,
    initial_wei: u64,
) -> SigningResult<ActionMap> {
    let profile = ActionMap::new()
        .with("node_ip", ActionMap::new().with("Ip", profile.node_ip.as_str()))
        .with("name", profile.name.as_str())
        .with("description", profile.description.as_str())
        .with("delegations_disabled", profile.delegations_disabled)
        .with("commission_bps", profile.commission_bps)
        .with("signer", normalize_address(&profile.signer)?);
    let register = ActionMap::new()
        .with("profile", profile)
        .with("unjailed", unjailed)
        .with("initial_wei", initial_wei);
    Ok(ActionMap::with_type("CValidatorAction").with("register", register))
}

/// Profile fields to change; `None` leaves a field as is and is sent as `null`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidatorProfileChange {
    pub node_ip: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub unjailed: bool,
    pub disable_delegations: Option<bool>,
    pub commission_bps: Option<u32>,
    pub signer: Option<String>,
}

pub fn c_validator_change_profile_action(
    change: &ValidatorProfileChange,
) -> SigningResult<ActionMap> {
    let node_ip = change
        .node_ip
        .as_deref()
        .map(|ip| ActionMap::new().with("Ip", ip));
    let signer = change
        .signer
        .as_deref()
        .map(normalize_address)
        .transpose()?;
    let profile = ActionMap::new()
        .with("node_ip", node_ip)
        .with("name", change.name.as_deref())
        .with("description", change.description.as_deref())
        .with("unjailed", change.unjailed)
        .with("disable_delegations", change.disable_delegations)
        .with("commission_bps", change.commission_bps)
        .with("signer", signer);
    Ok(ActionMap::with_type("CValidatorAction").with("changeProfile", profile))
}

pub fn c_validator_unregister_action() -> ActionMap {
    ActionMap::with_type("CValidatorAction").with("unregister", ActionValue::Nil)
}

// =============================================================================
// User-signed actions
// =============================================================================

fn user_action(kind: UserSignedKind) -> ActionMap {
    ActionMap::with_type(kind.action_type())
}

/// String-typed fields that hold an address.
const ADDRESS_STRING_FIELDS: &[&str] = &["destination", "fromSubAccount"];

/// Lowercase the addresses of a user-signed action that was not built here,
/// e.g. one read from JSON.
///
/// Covers the fields `kind` declares as `address` plus destination and
/// sub-account fields. Empty strings are left as is.
pub fn normalize_user_action_addresses(
    action: &mut ActionMap,
    kind: UserSignedKind,
) -> SigningResult<()> {
    let fields = kind
        .table()
        .iter()
        .filter(|field| field.ty == "address")
        .map(|field| field.name)
        .chain(ADDRESS_STRING_FIELDS.iter().copied());
    for name in fields {
        let Some(value) = action.get_str(name).filter(|v| !v.is_empty()) else {
            continue;
        };
        let normalized = normalize_address(value)?;
        action.insert(name, normalized);
    }
    Ok(())
}

pub fn usd_send_action(destination: &str, amount: &str, time: u64) -> ActionMap {
    user_action(UserSignedKind::UsdSend)
        .with("destination", destination)
        .with("amount", amount)
        .with("time", time)
}

pub fn spot_send_action(destination: &str, token: &str, amount: &str, time: u64) -> ActionMap {
    user_action(UserSignedKind::SpotSend)
        .with("destination", destination)
        .with("token", token)
        .with("amount", amount)
        .with("time", time)
}

pub fn withdraw_action(destination: &str, amount: &str, time: u64) -> ActionMap {
    user_action(UserSignedKind::Withdraw)
        .with("destination", destination)
        .with("amount", amount)
        .with("time", time)
}

/// Perp <-> spot transfer. A vault/sub-account is named inside `amount`
/// because this action never carries a `vaultAddress`.
pub fn usd_class_transfer_action(
    amount: &str,
    to_perp: bool,
    nonce: u64,
    vault_address: Option<&str>,
) -> SigningResult<ActionMap> {
    let amount = match vault_address {
        Some(vault) => format!("{amount} subaccount:{}", normalize_address(vault)?),
        None => amount.to_string(),
    };
    Ok(user_action(UserSignedKind::UsdClassTransfer)
        .with("amount", amount)
        .with("toPerp", to_perp)
        .with("nonce", nonce))
}

/// Transfer between perp dexes, spot, users and sub-accounts.
pub fn send_asset_action(
    destination: &str,
    source_dex: &str,
    destination_dex: &str,
    token: &str,
    amount: &str,
    from_sub_account: Option<&str>,
    nonce: u64,
) -> SigningResult<ActionMap> {
    let from_sub_account = match from_sub_account {
        Some(addr) => normalize_address(addr)?,
        None => String::new(),
    };
    Ok(user_action(UserSignedKind::SendAsset)
        .with("destination", destination)
        .with("sourceDex", source_dex)
        .with("destinationDex", destination_dex)
        .with("token", token)
        .with("amount", amount)
        .with("fromSubAccount", from_sub_account)
        .with("nonce", nonce))
}

pub fn token_delegate_action(
    validator: &str,
    wei: u64,
    is_undelegate: bool,
    nonce: u64,
) -> SigningResult<ActionMap> {
    Ok(user_action(UserSignedKind::TokenDelegate)
        .with("validator", normalize_address(validator)?)
        .with("wei", wei)
        .with("isUndelegate", is_undelegate)
        .with("nonce", nonce))
}

/// Approve an API wallet.
///
/// An unnamed agent is signed with an empty name, which
/// [`ExchangeRequest::new`](crate::request::ExchangeRequest::new) drops from
/// the posted body.
pub fn approve_agent_action(
    agent_address: &str,
    agent_name: Option<&str>,
    nonce: u64,
) -> SigningResult<ActionMap> {
    Ok(user_action(UserSignedKind::ApproveAgent)
        .with("agentAddress", normalize_address(agent_address)?)
        .with("agentName", agent_name.unwrap_or_default())
        .with("nonce", nonce))
}

/// `max_fee_rate` is a percentage string such as `"0.001%"`.
pub fn approve_builder_fee_action(
    builder: &str,
    max_fee_rate: &str,
    nonce: u64,
) -> SigningResult<ActionMap> {
    Ok(user_action(UserSignedKind::ApproveBuilderFee)
        .with("maxFeeRate", max_fee_rate)
        .with("builder", normalize_address(builder)?)
        .with("nonce", nonce))
}

pub fn user_dex_abstraction_action(
    user: &str,
    enabled: bool,
    nonce: u64,
) -> SigningResult<ActionMap> {
    Ok(user_action(UserSignedKind::UserDexAbstraction)
        .with("user", normalize_address(user)?)
        .with("enabled", enabled)
        .with("nonce", nonce))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MultiSigSigners {
    authorized_users: Vec<String>,
    threshold: u32,
}

/// Convert the signer's account into a multi-sig user.
///
/// Authorised users are lowercased and sorted; `signers` is their compact
/// JSON encoding `{"authorizedUsers":[...],"threshold":n}`.
pub fn convert_to_multi_sig_user_action(
    authorized_users: &[&str],
    threshold: u32,
    nonce: u64,
) -> SigningResult<ActionMap> {
    let mut users = authorized_users
        .iter()
        .map(|u| normalize_address(u))
        .collect::<SigningResult<Vec<_>>>()?;
    users.sort();

    let signers = serde_json::to_string(&MultiSigSigners {
        authorized_users: users,
        threshold,
    })?;
    Ok(user_action(UserSignedKind::ConvertToMultiSigUser)
        .with("signers", signers)
        .with("nonce", nonce))
}
