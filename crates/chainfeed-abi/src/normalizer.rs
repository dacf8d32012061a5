//! Converts alloy `DynSolValue` into `NormalizedValue`.

use alloy_core::dyn_abi::DynSolValue;
use chainfeed_core::NormalizedValue;

/// Convert a decoded `DynSolValue` into a `NormalizedValue`.
///
/// Integers that fit in 128 bits stay numeric; wider values become decimal
/// strings.
pub fn normalize(val: DynSolValue) -> NormalizedValue {
    match val {
        DynSolValue::Bool(b) => NormalizedValue::Bool(b),

        DynSolValue::Int(i, _bits) => match i128::try_from(i) {
            Ok(v) => NormalizedValue::Int(v),
            Err(_) => NormalizedValue::BigInt(i.to_string()),
        },

        DynSolValue::Uint(u, _bits) => match u128::try_from(u) {
            Ok(v) => NormalizedValue::Uint(v),
            Err(_) => NormalizedValue::BigUint(u.to_string()),
        },

        DynSolValue::FixedBytes(word, size) => {
            NormalizedValue::Bytes(word[..size.min(32)].to_vec())
        }

        DynSolValue::Bytes(b) => NormalizedValue::Bytes(b),

        DynSolValue::String(s) => NormalizedValue::Str(s),

        // lowercase hex so addresses compare as plain strings
        DynSolValue::Address(a) => NormalizedValue::Address(format!("{a:#x}")),

        DynSolValue::Array(vals) | DynSolValue::FixedArray(vals) => {
            NormalizedValue::Array(vals.into_iter().map(normalize).collect())
        }

        DynSolValue::Tuple(fields) => NormalizedValue::Tuple(
            fields
                .into_iter()
                .enumerate()
                .map(|(i, v)| (i.to_string(), normalize(v)))
                .collect(),
        ),

        DynSolValue::Function(f) => NormalizedValue::Bytes(f.to_vec()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Address, B256, U256};

    #[test]
    fn small_uint256_stays_numeric() {
        let v = normalize(DynSolValue::Uint(U256::from(42u64), 256));
        assert_eq!(v, NormalizedValue::Uint(42));
    }

    #[test]
    fn huge_uint256_becomes_string() {
        let v = normalize(DynSolValue::Uint(U256::MAX, 256));
        assert!(matches!(v, NormalizedValue::BigUint(s) if s.starts_with("11579208923731619542")));
    }

    #[test]
    fn address_is_lowercase_hex() {
        let addr: Address = "0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045".parse().unwrap();
        assert_eq!(
            normalize(DynSolValue::Address(addr)),
            NormalizedValue::Address("0xd8da6bf26964af9d7eed9e03e53415d37aa96045".into())
        );
    }

    #[test]
    fn fixed_bytes_truncated_to_size() {
        let v = normalize(DynSolValue::FixedBytes(B256::repeat_byte(0xab), 4));
        assert_eq!(v, NormalizedValue::Bytes(vec![0xab; 4]));
    }
}
