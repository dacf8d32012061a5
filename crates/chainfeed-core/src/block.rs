//! Block numbers in the JSON-RPC hex encoding.
//!
//! Every block number on the wire is a `0x`-prefixed hex string. Arithmetic
//! happens on the parsed integer, which is re-encoded on the way out.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::error::IngestError;

/// A block height.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockNumber(pub u64);

impl BlockNumber {
    /// The `0x0` origin sentinel.
    pub const ZERO: BlockNumber = BlockNumber(0);

    pub fn new(n: u64) -> Self {
        Self(n)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// The block immediately after this one.
    pub fn next(&self) -> Result<Self, IngestError> {
        self.0
            .checked_add(1)
            .map(Self)
            .ok_or_else(|| IngestError::InvalidBlockNumber(format!("{self} overflows")))
    }

    /// `0x`-prefixed lowercase hex, as sent to `eth_getLogs`.
    pub fn to_hex(&self) -> String {
        format!("0x{:x}", self.0)
    }

    /// Parse a hex string with or without the `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self, IngestError> {
        let digits = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s);
        if digits.is_empty() {
            return Err(IngestError::InvalidBlockNumber(s.to_string()));
        }
        u64::from_str_radix(digits, 16)
            .map(Self)
            .map_err(|_| IngestError::InvalidBlockNumber(s.to_string()))
    }
}

impl fmt::Display for BlockNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

impl FromStr for BlockNumber {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl From<u64> for BlockNumber {
    fn from(n: u64) -> Self {
        Self(n)
    }
}

impl Serialize for BlockNumber {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for BlockNumber {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        from_json(&value).map_err(serde::de::Error::custom)
    }
}

/// Interpret a JSON value as a block number: hex strings and non-negative
/// integers are accepted, anything else is rejected.
pub fn from_json(value: &Value) -> Result<BlockNumber, IngestError> {
    match value {
        Value::String(s) => BlockNumber::from_hex(s),
        Value::Number(n) => n
            .as_u64()
            .map(BlockNumber)
            .ok_or_else(|| IngestError::InvalidBlockNumber(n.to_string())),
        other => Err(IngestError::InvalidBlockNumber(format!(
            "unsupported block number type: {other}"
        ))),
    }
}

/// Return the hex-encoded successor of a hex-string or integer block number.
pub fn next_block(value: &Value) -> Result<String, IngestError> {
    Ok(from_json(value)?.next()?.to_hex())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn next_block_from_hex_string() {
        assert_eq!(next_block(&json!("0x0")).unwrap(), "0x1");
        assert_eq!(next_block(&json!("0x41736a")).unwrap(), "0x41736b");
        assert_eq!(next_block(&json!("0xff")).unwrap(), "0x100");
    }

    #[test]
    fn next_block_from_integer() {
        assert_eq!(next_block(&json!(0)).unwrap(), "0x1");
        assert_eq!(next_block(&json!(255)).unwrap(), "0x100");
    }

    #[test]
    fn next_block_rejects_other_types() {
        assert!(next_block(&json!(null)).is_err());
        assert!(next_block(&json!(true)).is_err());
        assert!(next_block(&json!(["0x1"])).is_err());
        assert!(next_block(&json!(-4)).is_err());
        assert!(next_block(&json!("0xzz")).is_err());
        assert!(next_block(&json!("0x")).is_err());
    }

    #[test]
    fn overflow_is_an_error() {
        assert!(BlockNumber(u64::MAX).next().is_err());
    }

    #[test]
    fn serde_uses_hex() {
        let n = BlockNumber(1234);
        assert_eq!(serde_json::to_value(n).unwrap(), json!("0x4d2"));
        let back: BlockNumber = serde_json::from_value(json!("0x4d2")).unwrap();
        assert_eq!(back, n);
        let from_int: BlockNumber = serde_json::from_value(json!(7)).unwrap();
        assert_eq!(from_int, BlockNumber(7));
    }

    #[test]
    fn ordering_is_numeric() {
        assert!(BlockNumber::from_hex("0x10").unwrap() > BlockNumber::from_hex("0x9").unwrap());
    }
}
