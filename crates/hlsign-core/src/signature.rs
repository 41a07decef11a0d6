//! Wire representation of ECDSA signatures.
//!
//! R and S are rendered as minimal big-integer hex (`0x` + digits with leading
//! zeros stripped, at least one digit kept), never as fixed 64-digit strings.
//! V is always 27 or 28.

use std::fmt;

use alloy::primitives::{Address, PrimitiveSignature, B256, U256};
use serde::{Deserialize, Serialize};

use crate::error::{SigningError, SigningResult};

/// Ethereum recovery id offset.
const V_OFFSET: u8 = 27;

/// Signature as sent to the exchange: `{"r": "0x..", "s": "0x..", "v": 27}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub r: String,
    pub s: String,
    pub v: u8,
}

impl Signature {
    pub fn from_primitive(sig: &PrimitiveSignature) -> Self {
        Self {
            r: format_scalar(sig.r()),
            s: format_scalar(sig.s()),
            v: V_OFFSET + u8::from(sig.v()),
        }
    }

    /// Split a 65-byte `r ++ s ++ v` signature, normalizing V to 27/28.
    pub fn from_bytes(bytes: &[u8; 65]) -> Self {
        let r = U256::from_be_slice(&bytes[0..32]);
        let s = U256::from_be_slice(&bytes[32..64]);
        let v = bytes[64];
        Self {
            r: format_scalar(r),
            s: format_scalar(s),
            v: if v < V_OFFSET { v + V_OFFSET } else { v },
        }
    }

    /// Parse R and S back into 256-bit integers.
    ///
    /// # Errors
    /// Returns `SigningError::InvalidSignature` for malformed hex or a V that
    /// is not 0, 1, 27 or 28.
    pub fn to_primitive(&self) -> SigningResult<PrimitiveSignature> {
        let r = parse_scalar(&self.r)?;
        let s = parse_scalar(&self.s)?;
        let parity = match self.v {
            0 | 27 => false,
            1 | 28 => true,
            v => {
                return Err(SigningError::InvalidSignature(format!(
                    "unexpected recovery id {v}"
                )))
            }
        };
        Ok(PrimitiveSignature::new(r, s, parity))
    }

    /// 65-byte `r ++ s ++ v` form.
    pub fn to_bytes(&self) -> SigningResult<[u8; 65]> {
        let sig = self.to_primitive()?;
        let mut out = [0u8; 65];
        out[0..32].copy_from_slice(&sig.r().to_be_bytes::<32>());
        out[32..64].copy_from_slice(&sig.s().to_be_bytes::<32>());
        out[64] = V_OFFSET + u8::from(sig.v());
        Ok(out)
    }

    /// Recover the signing address from the prehashed message.
    pub fn recover_address(&self, hash: &B256) -> SigningResult<Address> {
        self.to_primitive()?
            .recover_address_from_prehash(hash)
            .map_err(|e| SigningError::InvalidSignature(e.to_string()))
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r={} s={} v={}", self.r, self.s, self.v)
    }
}

fn format_scalar(value: U256) -> String {
    format!("0x{value:x}")
}

fn parse_scalar(input: &str) -> SigningResult<U256> {
    let digits = input
        .strip_prefix("0x")
        .filter(|d| !d.is_empty() && d.len() <= 64)
        .ok_or_else(|| SigningError::InvalidSignature(format!("malformed scalar {input:?}")))?;
    U256::from_str_radix(digits, 16)
        .map_err(|e| SigningError::InvalidSignature(format!("malformed scalar {input:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leading_zeros_are_stripped() {
        let mut bytes = [0u8; 65];
        bytes[2] = 0x0a; // r = 0x0a << (29 * 8)
        bytes[63] = 0x05;
        bytes[64] = 0;

        let sig = Signature::from_bytes(&bytes);
        assert_eq!(sig.r, format!("0xa{}", "0".repeat(58)));
        assert_eq!(sig.s, "0x5");
        assert_eq!(sig.v, 27);

        // round-trips to the same integers
        let back = sig.to_bytes().unwrap();
        assert_eq!(back[..64], bytes[..64]);
        assert_eq!(back[64], 27);
    }

    #[test]
    fn test_zero_scalar_keeps_one_digit() {
        let sig = Signature::from_bytes(&[0u8; 65]);
        assert_eq!(sig.r, "0x0");
        assert_eq!(sig.s, "0x0");
    }

    #[test]
    fn test_v_normalization() {
        let mut bytes = [0u8; 65];
        bytes[64] = 1;
        assert_eq!(Signature::from_bytes(&bytes).v, 28);
        bytes[64] = 27;
        assert_eq!(Signature::from_bytes(&bytes).v, 27);
        bytes[64] = 28;
        assert_eq!(Signature::from_bytes(&bytes).v, 28);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        let bad = |r: &str, v: u8| Signature {
            r: r.to_string(),
            s: "0x1".to_string(),
            v,
        };
        assert!(bad("0x", 27).to_primitive().is_err());
        assert!(bad("1234", 27).to_primitive().is_err());
        assert!(bad("0xgg", 27).to_primitive().is_err());
        assert!(bad(&format!("0x1{}", "0".repeat(64)), 27).to_primitive().is_err());
        assert!(bad("0x1", 29).to_primitive().is_err());
        assert!(bad("0x1", 1).to_primitive().is_ok());
    }

    #[test]
    fn test_json_shape() {
        let sig = Signature {
            r: "0xabc".to_string(),
            s: "0x1".to_string(),
            v: 28,
        };
        let json = serde_json::to_string(&sig).unwrap();
        assert_eq!(json, r#"{"r":"0xabc","s":"0x1","v":28}"#);
        let back: Signature = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sig);
    }
}
