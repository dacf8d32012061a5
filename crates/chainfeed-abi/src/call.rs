//! Calldata encoding and return-data decoding for read-only contract calls.

use alloy_core::dyn_abi::{DynSolType, DynSolValue};

use crate::error::DecodeError;
use crate::fingerprint;

/// `0x`-prefixed calldata for `signature` applied to `args`.
pub fn encode_call(signature: &str, args: Vec<DynSolValue>) -> String {
    let mut data = fingerprint::selector(signature).to_vec();
    data.extend(DynSolValue::Tuple(args).abi_encode_params());
    format!("0x{}", hex::encode(data))
}

/// Decode `eth_call` return data as a tuple of `outputs`.
pub fn decode_output(outputs: Vec<DynSolType>, hex_data: &str) -> Result<Vec<DynSolValue>, DecodeError> {
    let hex = hex_data.strip_prefix("0x").unwrap_or(hex_data);
    let bytes = hex::decode(hex)
        .map_err(|e| DecodeError::InvalidRawLog { reason: format!("invalid return data hex: {e}") })?;
    let expected = outputs.len();
    match DynSolType::Tuple(outputs).abi_decode_params(&bytes) {
        Ok(DynSolValue::Tuple(vals)) if vals.len() == expected => Ok(vals),
        Ok(other) => Err(DecodeError::AbiDecodeFailed {
            reason: format!("unexpected return shape: {other:?}"),
        }),
        Err(e) => Err(DecodeError::AbiDecodeFailed { reason: e.to_string() }),
    }
}
