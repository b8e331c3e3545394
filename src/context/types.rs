//! Wire types for cumulative context

use crate::graph::CardId;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// One ancestor's contribution as seen by a descendant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AncestorEntry {
    /// The ancestor's card type
    #[serde(rename = "type")]
    pub card_type: String,
    /// The ancestor's output at the recorded version
    #[serde(default)]
    pub output: Value,
    /// Milliseconds-since-epoch logical clock; anything unusable reads as 0
    #[serde(default, deserialize_with = "lenient_version")]
    pub version: i64,
}

impl AncestorEntry {
    /// Create an entry
    pub fn new(card_type: impl Into<String>, output: Value, version: i64) -> Self {
        Self {
            card_type: card_type.into(),
            output,
            version,
        }
    }
}

/// Versions arrive from stored blobs and may be missing, fractional, or
/// garbage; an unusable version is 0 rather than a decode failure.
fn lenient_version<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value
        .as_i64()
        .or_else(|| value.as_f64().map(|f| f as i64))
        .unwrap_or(0))
}

/// Cumulative context: every upstream ancestor's latest known output,
/// keyed by ancestor card id
///
/// A `BTreeMap` so serialization is canonical (stable key order).
pub type ContextMap = BTreeMap<CardId, AncestorEntry>;

/// The stored form of a cumulative context
///
/// `blob` is the inline context object when `compressed` is false, or a
/// base64-encoded gzip of the context JSON when true. This is the only
/// persisted shape; consumers must go through [`decode`](crate::context::decode)
/// before interpreting it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextWrapper {
    /// Whether `blob` is compressed
    pub compressed: bool,
    /// Inline object or base64 string, per `compressed`
    #[serde(default)]
    pub blob: Value,
}

impl Default for ContextWrapper {
    fn default() -> Self {
        Self {
            compressed: false,
            blob: Value::Null,
        }
    }
}
