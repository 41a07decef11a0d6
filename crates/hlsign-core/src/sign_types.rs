//! EIP-712 field tables for user-signed actions.
//!
//! Each table is a compatibility contract with the exchange: field order and
//! type strings must match byte for byte. A swapped pair produces a valid but
//! wrong signature that the exchange rejects.

/// One declared field of an EIP-712 struct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignField {
    pub name: &'static str,
    pub ty: &'static str,
}

const fn field(name: &'static str, ty: &'static str) -> SignField {
    SignField { name, ty }
}

/// Ordered field list of one struct type.
pub type SignTypeTable = &'static [SignField];

pub const EIP712_DOMAIN_TYPE: &str = "EIP712Domain";

pub const EIP712_DOMAIN_FIELDS: SignTypeTable = &[
    field("name", "string"),
    field("version", "string"),
    field("chainId", "uint256"),
    field("verifyingContract", "address"),
];

pub const AGENT_PRIMARY_TYPE: &str = "Agent";

pub const AGENT_SIGN_TYPES: SignTypeTable =
    &[field("source", "string"), field("connectionId", "bytes32")];

pub const USD_SEND_SIGN_TYPES: SignTypeTable = &[
    field("hyperliquidChain", "string"),
    field("destination", "string"),
    field("amount", "string"),
    field("time", "uint64"),
];

pub const SPOT_SEND_SIGN_TYPES: SignTypeTable = &[
    field("hyperliquidChain", "string"),
    field("destination", "string"),
    field("token", "string"),
    field("amount", "string"),
    field("time", "uint64"),
];

pub const WITHDRAW_SIGN_TYPES: SignTypeTable = &[
    field("hyperliquidChain", "string"),
    field("destination", "string"),
    field("amount", "string"),
    field("time", "uint64"),
];

pub const USD_CLASS_TRANSFER_SIGN_TYPES: SignTypeTable = &[
    field("hyperliquidChain", "string"),
    field("amount", "string"),
    field("toPerp", "bool"),
    field("nonce", "uint64"),
];

pub const SEND_ASSET_SIGN_TYPES: SignTypeTable = &[
    field("hyperliquidChain", "string"),
    field("destination", "string"),
    field("sourceDex", "string"),
    field("destinationDex", "string"),
    field("token", "string"),
    field("amount", "string"),
    field("fromSubAccount", "string"),
    field("nonce", "uint64"),
];

// wei before isUndelegate
pub const TOKEN_DELEGATE_SIGN_TYPES: SignTypeTable = &[
    field("hyperliquidChain", "string"),
    field("validator", "address"),
    field("wei", "uint64"),
    field("isUndelegate", "bool"),
    field("nonce", "uint64"),
];

pub const APPROVE_AGENT_SIGN_TYPES: SignTypeTable = &[
    field("hyperliquidChain", "string"),
    field("agentAddress", "address"),
    field("agentName", "string"),
    field("nonce", "uint64"),
];

pub const APPROVE_BUILDER_FEE_SIGN_TYPES: SignTypeTable = &[
    field("hyperliquidChain", "string"),
    field("maxFeeRate", "string"),
    field("builder", "address"),
    field("nonce", "uint64"),
];

pub const USER_DEX_ABSTRACTION_SIGN_TYPES: SignTypeTable = &[
    field("hyperliquidChain", "string"),
    field("user", "address"),
    field("enabled", "bool"),
    field("nonce", "uint64"),
];

pub const CONVERT_TO_MULTI_SIG_USER_SIGN_TYPES: SignTypeTable = &[
    field("hyperliquidChain", "string"),
    field("signers", "string"),
    field("nonce", "uint64"),
];

pub const MULTI_SIG_ENVELOPE_SIGN_TYPES: SignTypeTable = &[
    field("hyperliquidChain", "string"),
    field("multiSigActionHash", "bytes32"),
    field("nonce", "uint64"),
];

/// User-signed action kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UserSignedKind {
    UsdSend,
    SpotSend,
    Withdraw,
    UsdClassTransfer,
    SendAsset,
    TokenDelegate,
    ApproveAgent,
    ApproveBuilderFee,
    UserDexAbstraction,
    ConvertToMultiSigUser,
    SendMultiSig,
}

impl UserSignedKind {
    pub const ALL: [UserSignedKind; 11] = [
        Self::UsdSend,
        Self::SpotSend,
        Self::Withdraw,
        Self::UsdClassTransfer,
        Self::SendAsset,
        Self::TokenDelegate,
        Self::ApproveAgent,
        Self::ApproveBuilderFee,
        Self::UserDexAbstraction,
        Self::ConvertToMultiSigUser,
        Self::SendMultiSig,
    ];

    pub fn table(self) -> SignTypeTable {
        match self {
            Self::UsdSend => USD_SEND_SIGN_TYPES,
            Self::SpotSend => SPOT_SEND_SIGN_TYPES,
            Self::Withdraw => WITHDRAW_SIGN_TYPES,
            Self::UsdClassTransfer => USD_CLASS_TRANSFER_SIGN_TYPES,
            Self::SendAsset => SEND_ASSET_SIGN_TYPES,
            Self::TokenDelegate => TOKEN_DELEGATE_SIGN_TYPES,
            Self::ApproveAgent => APPROVE_AGENT_SIGN_TYPES,
            Self::ApproveBuilderFee => APPROVE_BUILDER_FEE_SIGN_TYPES,
            Self::UserDexAbstraction => USER_DEX_ABSTRACTION_SIGN_TYPES,
            Self::ConvertToMultiSigUser => CONVERT_TO_MULTI_SIG_USER_SIGN_TYPES,
            Self::SendMultiSig => MULTI_SIG_ENVELOPE_SIGN_TYPES,
        }
    }

    /// EIP-712 primary type name.
    pub fn primary_type(self) -> &'static str {
        match self {
            Self::UsdSend => "HyperliquidTransaction:UsdSend",
            Self::SpotSend => "HyperliquidTransaction:SpotSend",
            Self::Withdraw => "HyperliquidTransaction:Withdraw",
            Self::UsdClassTransfer => "HyperliquidTransaction:UsdClassTransfer",
            Self::SendAsset => "HyperliquidTransaction:SendAsset",
            Self::TokenDelegate => "HyperliquidTransaction:TokenDelegate",
            Self::ApproveAgent => "HyperliquidTransaction:ApproveAgent",
            Self::ApproveBuilderFee => "HyperliquidTransaction:ApproveBuilderFee",
            Self::UserDexAbstraction => "HyperliquidTransaction:UserDexAbstraction",
            Self::ConvertToMultiSigUser => "HyperliquidTransaction:ConvertToMultiSigUser",
            Self::SendMultiSig => "HyperliquidTransaction:SendMultiSig",
        }
    }

    /// Value of the action's `type` key.
    pub fn action_type(self) -> &'static str {
        match self {
            Self::UsdSend => "usdSend",
            Self::SpotSend => "spotSend",
            Self::Withdraw => "withdraw3",
            Self::UsdClassTransfer => "usdClassTransfer",
            Self::SendAsset => "sendAsset",
            Self::TokenDelegate => "tokenDelegate",
            Self::ApproveAgent => "approveAgent",
            Self::ApproveBuilderFee => "approveBuilderFee",
            Self::UserDexAbstraction => "userDexAbstraction",
            Self::ConvertToMultiSigUser => "convertToMultiSigUser",
            Self::SendMultiSig => "multiSig",
        }
    }

    /// Look up a kind by its action `type` tag.
    pub fn from_action_type(action_type: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.action_type() == action_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(table: SignTypeTable) -> Vec<&'static str> {
        table.iter().map(|f| f.name).collect()
    }

    #[test]
    fn test_token_delegate_field_order() {
        assert_eq!(
            names(TOKEN_DELEGATE_SIGN_TYPES),
            vec!["hyperliquidChain", "validator", "wei", "isUndelegate", "nonce"]
        );
        assert_eq!(TOKEN_DELEGATE_SIGN_TYPES[2].ty, "uint64");
        assert_eq!(TOKEN_DELEGATE_SIGN_TYPES[3].ty, "bool");
    }

    #[test]
    fn test_every_table_starts_with_chain() {
        for kind in UserSignedKind::ALL {
            let table = kind.table();
            assert_eq!(
                table[0],
                SignField {
                    name: "hyperliquidChain",
                    ty: "string"
                },
                "{kind:?}"
            );
            assert!(
                !table.iter().any(|f| f.name == "signatureChainId"),
                "{kind:?} must not sign the domain chain id"
            );
            assert!(kind.primary_type().starts_with("HyperliquidTransaction:"));
        }
    }

    #[test]
    fn test_action_type_lookup() {
        assert_eq!(
            UserSignedKind::from_action_type("withdraw3"),
            Some(UserSignedKind::Withdraw)
        );
        assert_eq!(
            UserSignedKind::from_action_type("tokenDelegate"),
            Some(UserSignedKind::TokenDelegate)
        );
        assert_eq!(UserSignedKind::from_action_type("order"), None);
    }
}
