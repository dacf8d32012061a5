//! Tracked event types.
//!
//! Decoded events arrive as a name plus a field map. Only the event types
//! listed in [`TrackedEvent`] become jobs; every other decoded event is
//! skipped by the dispatcher. The wire shape of a tracked event is
//! `{ "name": ..., "fields": { ... } }`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::IngestError;
use crate::types::{DecodedEvent, NormalizedValue};

/// Fields left over after the typed fields of an event have been extracted.
pub type ExtraFields = BTreeMap<String, NormalizedValue>;

/// `Tagger.Tagged`: a tag was attached to a subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tagged {
    pub tagger: NormalizedValue,
    pub tag: NormalizedValue,
    pub target: NormalizedValue,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: ExtraFields,
}

/// `Auctioneer.SuccessfulBidRange`: a bid over a range of time periods won.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuccessfulBidRange {
    pub scope: NormalizedValue,
    pub time_period_start: NormalizedValue,
    pub range: NormalizedValue,
    pub lun_amount: NormalizedValue,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: ExtraFields,
}

/// One variant per tracked event name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", content = "fields")]
pub enum TrackedEvent {
    Tagged(Tagged),
    SuccessfulBidRange(SuccessfulBidRange),
}

impl TrackedEvent {
    /// The event name, as it appears in the interface descriptor.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Tagged(_) => "Tagged",
            Self::SuccessfulBidRange(_) => "SuccessfulBidRange",
        }
    }

    /// Convert a decoded event into a tracked event.
    ///
    /// Returns `Ok(None)` if the event is not a tracked type, and an error
    /// if it is tracked but lacks a required field.
    pub fn from_decoded(decoded: DecodedEvent) -> Result<Option<Self>, IngestError> {
        let DecodedEvent { name, mut fields } = decoded;
        let event = match name.as_str() {
            "Tagged" => Self::Tagged(Tagged {
                tagger: take(&mut fields, &name, "tagger")?,
                tag: take(&mut fields, &name, "tag")?,
                target: take(&mut fields, &name, "target")?,
                extra: fields,
            }),
            "SuccessfulBidRange" => Self::SuccessfulBidRange(SuccessfulBidRange {
                scope: take(&mut fields, &name, "scope")?,
                time_period_start: take(&mut fields, &name, "timePeriodStart")?,
                range: take(&mut fields, &name, "range")?,
                lun_amount: take(&mut fields, &name, "lunAmount")?,
                extra: fields,
            }),
            _ => return Ok(None),
        };
        Ok(Some(event))
    }
}

fn take(
    fields: &mut BTreeMap<String, NormalizedValue>,
    event: &str,
    field: &str,
) -> Result<NormalizedValue, IngestError> {
    fields
        .remove(field)
        .ok_or_else(|| IngestError::Decode(format!("{event} event is missing field '{field}'")))
}
