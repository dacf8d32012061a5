//! chainfeed-abi: interface descriptors and EVM log decoding.
//!
//! Descriptors (JSON ABI documents) are merged into a shared [`DecodeTable`]
//! keyed by event fingerprint (`topics[0]`). Raw logs are decoded against it
//! into [`chainfeed_core::DecodedEvent`]s with normalized values.

pub mod call;
pub mod descriptor;
pub mod error;
pub mod fingerprint;
pub mod normalizer;
pub mod table;

pub use descriptor::{EventLayout, FieldLayout, InterfaceDescriptor};
pub use error::DecodeError;
pub use table::DecodeTable;

pub use alloy_core::dyn_abi::{DynSolType, DynSolValue};
