//! The process-wide decode table.
//!
//! Maps event fingerprints to layouts. Append-only: descriptors are merged in
//! during startup and nothing is ever removed, so pollers only ever read it.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use alloy_core::dyn_abi::{DynSolType, DynSolValue};
use chainfeed_core::{DecodedEvent, NormalizedValue, RawLogEntry};

use crate::descriptor::{EventLayout, FieldLayout, InterfaceDescriptor};
use crate::error::DecodeError;
use crate::{fingerprint, normalizer};

/// Thread-safe, cheap-to-clone handle to the shared decode table.
#[derive(Clone, Default)]
pub struct DecodeTable {
    inner: Arc<RwLock<HashMap<String, Vec<Arc<EventLayout>>>>>,
}

impl DecodeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge every event of `descriptor` into the table. Returns how many
    /// layouts were new.
    pub fn register(&self, descriptor: &InterfaceDescriptor) -> Result<usize, DecodeError> {
        let layouts = descriptor.event_layouts()?;
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        let mut added = 0;
        for layout in layouts {
            let slot = inner.entry(layout.fingerprint.clone()).or_default();
            if slot.iter().any(|l| **l == layout) {
                continue;
            }
            slot.push(Arc::new(layout));
            added += 1;
        }
        Ok(added)
    }

    /// Parse raw descriptor bytes and register them.
    pub fn register_bytes(&self, bytes: &[u8]) -> Result<usize, DecodeError> {
        self.register(&InterfaceDescriptor::parse(bytes)?)
    }

    /// Number of distinct layouts registered.
    pub fn len(&self) -> usize {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, fingerprint: &str) -> bool {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        fingerprint::from_topic(fingerprint).is_some_and(|fp| inner.contains_key(&fp))
    }

    /// Decode `raw` against the registered layouts.
    ///
    /// `Ok(None)` when no layout matches the log's selector. An error means a
    /// selector matched but the log could not be decoded against it.
    pub fn decode(&self, raw: &RawLogEntry) -> Result<Option<DecodedEvent>, DecodeError> {
        let Some(fp) = raw.selector().and_then(fingerprint::from_topic) else {
            return Ok(None);
        };
        let candidates = {
            let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
            match inner.get(&fp) {
                Some(layouts) => layouts.clone(),
                None => return Ok(None),
            }
        };

        let topic_count = raw.topics.len() - 1;
        let Some(layout) = candidates.iter().find(|l| l.indexed_count() == topic_count) else {
            return Err(DecodeError::TopicCountMismatch {
                event: candidates[0].signature.clone(),
                expected: candidates[0].indexed_count(),
                got: topic_count,
            });
        };

        decode_with(layout, raw).map(Some)
    }
}

fn decode_with(layout: &EventLayout, raw: &RawLogEntry) -> Result<DecodedEvent, DecodeError> {
    let mut event = DecodedEvent { name: layout.name.clone(), fields: Default::default() };

    for (field, topic) in layout.indexed_fields().zip(raw.topics.iter().skip(1)) {
        let value = decode_topic(topic, field)?;
        event.fields.insert(field.name.clone(), value);
    }

    let data_fields: Vec<&FieldLayout> = layout.data_fields().collect();
    if !data_fields.is_empty() {
        let data = decode_hex(&raw.data, "data")?;
        let tuple = DynSolType::Tuple(data_fields.iter().map(|f| f.ty.clone()).collect());
        let decoded = tuple
            .abi_decode_params(&data)
            .map_err(|e| DecodeError::AbiDecodeFailed { reason: format!("{}: {e}", layout.signature) })?;
        let values = match decoded {
            DynSolValue::Tuple(vals) => vals,
            other => vec![other],
        };
        if values.len() < data_fields.len() {
            return Err(DecodeError::MissingField {
                field: data_fields[values.len()].name.clone(),
            });
        }
        for (field, val) in data_fields.iter().zip(values) {
            event.fields.insert(field.name.clone(), normalizer::normalize(val));
        }
    }

    Ok(event)
}

/// Decode one indexed topic.
///
/// Value types are ABI-encoded into the 32-byte topic directly. Reference
/// types (string, bytes, arrays, tuples) are stored as the keccak256 of their
/// encoding; the value is unrecoverable so the raw hash comes back as bytes.
fn decode_topic(topic: &str, field: &FieldLayout) -> Result<NormalizedValue, DecodeError> {
    let bytes = decode_hex(topic, "topic")?;
    if bytes.len() != 32 {
        return Err(DecodeError::InvalidRawLog {
            reason: format!("topic for `{}` is {} bytes, expected 32", field.name, bytes.len()),
        });
    }

    if matches!(
        field.ty,
        DynSolType::String
            | DynSolType::Bytes
            | DynSolType::Array(_)
            | DynSolType::FixedArray(..)
            | DynSolType::Tuple(_)
    ) {
        return Ok(NormalizedValue::Bytes(bytes));
    }

    field
        .ty
        .abi_decode(&bytes)
        .map(normalizer::normalize)
        .map_err(|e| DecodeError::AbiDecodeFailed { reason: format!("topic `{}`: {e}", field.name) })
}

fn decode_hex(s: &str, what: &str) -> Result<Vec<u8>, DecodeError> {
    let hex = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(hex).map_err(|e| DecodeError::InvalidRawLog { reason: format!("invalid {what} hex: {e}") })
}
