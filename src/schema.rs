// 📐 Shape Layer - wire schema detection & normalization
// The register has published two incompatible JSON shapes over its lifetime:
//
//   legacy array shape:  [ { "serial-number": 6, "hash": "...", "entry": { ... } } ]
//   current map shape:   { "GB": { "entry-number": "6", "item-hash": "...", ... } }
//
// Shape is resolved once at this boundary; everything downstream sees only
// the normalized ExternalRecord sequence.

use crate::error::SyncError;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

// ============================================================================
// WIRE TYPES
// ============================================================================

/// Wrapper object from the legacy array shape. Entry fields live one level
/// down under `entry`; `serial-number` and `hash` are provenance only.
#[derive(Debug, Clone, Deserialize)]
pub struct EntryWrapper {
    #[serde(rename = "serial-number", default)]
    pub serial_number: Option<i64>,

    #[serde(default)]
    pub hash: Option<String>,

    pub entry: EntryFields,
}

/// The record fields shared by both shapes.
#[derive(Debug, Clone, Deserialize)]
pub struct EntryFields {
    pub country: String,

    pub name: String,

    #[serde(rename = "start-date", default)]
    pub start_date: Option<String>,

    #[serde(rename = "end-date", default)]
    pub end_date: Option<String>,
}

/// Entry from the current map shape: same record fields at top level, plus
/// its own provenance trio.
#[derive(Debug, Clone, Deserialize)]
pub struct RecordEntry {
    #[serde(rename = "entry-number", default)]
    pub entry_number: Option<String>,

    #[serde(rename = "item-hash", default)]
    pub item_hash: Option<String>,

    #[serde(rename = "entry-timestamp", default)]
    pub entry_timestamp: Option<String>,

    pub country: String,

    pub name: String,

    #[serde(rename = "start-date", default)]
    pub start_date: Option<String>,

    #[serde(rename = "end-date", default)]
    pub end_date: Option<String>,
}

/// A parsed feed, tagged by wire shape.
#[derive(Debug)]
pub enum RegisterFeed {
    /// Legacy array-of-wrappers shape.
    Entries(Vec<EntryWrapper>),

    /// Current code-to-entry map shape. BTreeMap keeps runs deterministic.
    Records(BTreeMap<String, RecordEntry>),
}

// ============================================================================
// NORMALIZED RECORD
// ============================================================================

/// One feed entry, normalized across shapes. Dates stay raw strings here;
/// the mapper owns calendar parsing.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalRecord {
    pub country: String,
    pub name: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,

    /// Carried for logging, never persisted or compared.
    pub provenance: Provenance,
}

/// Feed-side identifiers for one entry: the array shape's serial-number and
/// hash, or the map shape's entry-number, item-hash and entry-timestamp.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Provenance {
    pub entry_id: Option<String>,
    pub item_hash: Option<String>,
    pub entry_timestamp: Option<String>,
}

// ============================================================================
// PARSING & NORMALIZATION
// ============================================================================

/// Parse raw feed bytes and resolve the wire shape.
///
/// Detection follows the top-level JSON value: an array is the legacy
/// shape, an object is the map shape, anything else is malformed.
pub fn parse_feed(bytes: &[u8]) -> Result<RegisterFeed, SyncError> {
    let value: Value = serde_json::from_slice(bytes)
        .map_err(|error| SyncError::malformed(format!("invalid JSON: {error}")))?;

    match value {
        Value::Array(_) => {
            let entries: Vec<EntryWrapper> = serde_json::from_value(value)
                .map_err(|error| SyncError::malformed(format!("bad array-shape feed: {error}")))?;
            Ok(RegisterFeed::Entries(entries))
        }
        Value::Object(_) => {
            let records: BTreeMap<String, RecordEntry> = serde_json::from_value(value)
                .map_err(|error| SyncError::malformed(format!("bad map-shape feed: {error}")))?;
            Ok(RegisterFeed::Records(records))
        }
        other => Err(SyncError::malformed(format!(
            "expected array or object at top level, got {}",
            json_type_name(&other)
        ))),
    }
}

impl RegisterFeed {
    /// Flatten either shape into the canonical record sequence.
    /// Array shape preserves feed order; map shape iterates in key order.
    pub fn normalize(self) -> Vec<ExternalRecord> {
        match self {
            RegisterFeed::Entries(entries) => entries
                .into_iter()
                .map(|wrapper| ExternalRecord {
                    country: wrapper.entry.country,
                    name: wrapper.entry.name,
                    start_date: wrapper.entry.start_date,
                    end_date: wrapper.entry.end_date,
                    provenance: Provenance {
                        entry_id: wrapper.serial_number.map(|n| n.to_string()),
                        item_hash: wrapper.hash,
                        entry_timestamp: None,
                    },
                })
                .collect(),
            RegisterFeed::Records(records) => records
                .into_values()
                .map(|entry| ExternalRecord {
                    country: entry.country,
                    name: entry.name,
                    start_date: entry.start_date,
                    end_date: entry.end_date,
                    provenance: Provenance {
                        entry_id: entry.entry_number,
                        item_hash: entry.item_hash,
                        entry_timestamp: entry.entry_timestamp,
                    },
                })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            RegisterFeed::Entries(entries) => entries.len(),
            RegisterFeed::Records(records) => records.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ============================================================================
// TESTS
// ============================================================================
