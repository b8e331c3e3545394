//! Card representation in the task flow

use crate::context::ContextWrapper;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Identifies a card within its flow
///
/// Transparent string newtype; callers pick the format. `Ord` so that
/// context maps keyed by card id serialize with stable key order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(String);

impl CardId {
    /// Create a CardId from a string
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CardId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CardId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for CardId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A typed card in the task flow
///
/// Cards own their output; everything a card knows about its ancestors lives
/// in `cumulative_context`, which is mutated only by the propagation protocol
/// and always stored in wrapper form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Card {
    /// Unique identifier
    pub id: CardId,
    /// Type tag used to select the card's handler (e.g. "problem", "survey")
    pub card_type: String,
    /// The card's own output, opaque to the engine
    #[serde(default)]
    pub output: Value,
    /// Last-modified timestamp; the card's version is derived from it
    pub updated_at: Option<DateTime<Utc>>,
    /// Denormalized cache of each direct parent's last-known output
    #[serde(default)]
    pub direct_inputs: HashMap<CardId, Value>,
    /// Merged, versioned view of every upstream ancestor's output
    #[serde(default)]
    pub cumulative_context: ContextWrapper,
    /// Handler-managed extras set via `CardUpdate::fields`, opaque to the engine
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub fields: Map<String, Value>,
    /// Sticky record of the last handler failure, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl Card {
    /// Create a new card with an empty output and empty context
    pub fn new(id: impl Into<CardId>, card_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            card_type: card_type.into(),
            output: Value::Null,
            updated_at: None,
            direct_inputs: HashMap::new(),
            cumulative_context: ContextWrapper::default(),
            fields: Map::new(),
            last_error: None,
        }
    }

    /// Set the output
    pub fn with_output(mut self, output: Value) -> Self {
        self.output = output;
        self
    }

    /// Set the last-modified timestamp
    pub fn with_updated_at(mut self, at: DateTime<Utc>) -> Self {
        self.updated_at = Some(at);
        self
    }

    /// The card's version: milliseconds since epoch of `updated_at`,
    /// or 0 when the card has never been stamped
    pub fn version(&self) -> i64 {
        self.updated_at.map(|t| t.timestamp_millis()).unwrap_or(0)
    }

    /// Like [`version`](Self::version), but an unstamped card reads as "now"
    ///
    /// Used when the card contributes an ancestor entry, so a fresh card's
    /// contribution is not treated as infinitely old by downstream merges.
    pub fn version_or_now(&self) -> i64 {
        self.updated_at
            .map(|t| t.timestamp_millis())
            .unwrap_or_else(|| Utc::now().timestamp_millis())
    }

    /// Stamp the card as modified now
    pub fn touch(&mut self) {
        self.updated_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn version_defaults_to_zero_when_unstamped() {
        let card = Card::new("a", "problem");
        assert_eq!(card.version(), 0);
    }

    #[test]
    fn version_is_millis_of_updated_at() {
        let at = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        let card = Card::new("a", "problem").with_updated_at(at);
        assert_eq!(card.version(), 1_700_000_000_123);
    }

    #[test]
    fn version_or_now_is_current_for_unstamped_card() {
        let before = Utc::now().timestamp_millis();
        let card = Card::new("a", "problem");
        let v = card.version_or_now();
        let after = Utc::now().timestamp_millis();
        assert!(v >= before && v <= after);
    }
}
