//! Interface descriptors: JSON ABI documents reduced to event layouts.

use alloy_core::dyn_abi::{DynSolType, Specifier};
use alloy_json_abi::{Event, JsonAbi};
use serde_json::Value;

use crate::error::DecodeError;
use crate::fingerprint;

/// One event parameter with its resolved ABI type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldLayout {
    /// Parameter name; positional (`"0"`, `"1"`, …) when the ABI leaves it blank.
    pub name: String,
    pub ty: DynSolType,
    pub indexed: bool,
}

/// The decode shape of one non-anonymous event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventLayout {
    pub name: String,
    /// Canonical signature, e.g. `Tagged(address,string,uint256)`.
    pub signature: String,
    /// keccak256 of `signature`, `0x`-prefixed lowercase.
    pub fingerprint: String,
    pub fields: Vec<FieldLayout>,
}

impl EventLayout {
    pub fn from_event(event: &Event) -> Result<Self, DecodeError> {
        let signature = event.signature();
        let fields = event
            .inputs
            .iter()
            .enumerate()
            .map(|(i, param)| {
                let ty = param.resolve().map_err(|e| DecodeError::InvalidDescriptor {
                    reason: format!("{signature}: parameter {i}: {e}"),
                })?;
                let name = if param.name.is_empty() { i.to_string() } else { param.name.clone() };
                Ok(FieldLayout { name, ty, indexed: param.indexed })
            })
            .collect::<Result<Vec<_>, DecodeError>>()?;

        Ok(Self {
            name: event.name.clone(),
            fingerprint: fingerprint::keccak256_signature(&signature),
            signature,
            fields,
        })
    }

    /// Number of topics after `topics[0]` a matching log carries.
    pub fn indexed_count(&self) -> usize {
        self.fields.iter().filter(|f| f.indexed).count()
    }

    pub fn indexed_fields(&self) -> impl Iterator<Item = &FieldLayout> {
        self.fields.iter().filter(|f| f.indexed)
    }

    pub fn data_fields(&self) -> impl Iterator<Item = &FieldLayout> {
        self.fields.iter().filter(|f| !f.indexed)
    }
}

/// A parsed interface descriptor.
#[derive(Debug, Clone)]
pub struct InterfaceDescriptor {
    pub abi: JsonAbi,
}

impl InterfaceDescriptor {
    /// Parse descriptor bytes.
    ///
    /// Accepts a bare ABI array or a build artifact object carrying an
    /// `abi` member.
    pub fn parse(bytes: &[u8]) -> Result<Self, DecodeError> {
        let doc: Value = serde_json::from_slice(bytes)
            .map_err(|e| DecodeError::InvalidDescriptor { reason: e.to_string() })?;
        let abi_value = match doc {
            Value::Object(mut obj) => obj.remove("abi").ok_or_else(|| {
                DecodeError::InvalidDescriptor { reason: "object has no `abi` member".into() }
            })?,
            other => other,
        };
        let abi: JsonAbi = serde_json::from_value(abi_value)
            .map_err(|e| DecodeError::InvalidDescriptor { reason: e.to_string() })?;
        Ok(Self { abi })
    }

    /// Layouts of every non-anonymous event in the descriptor.
    pub fn event_layouts(&self) -> Result<Vec<EventLayout>, DecodeError> {
        self.abi
            .events()
            .filter(|e| !e.anonymous)
            .map(EventLayout::from_event)
            .collect()
    }
}
