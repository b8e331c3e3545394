//! Version merge for cumulative contexts
//!
//! This is the single merge implementation in the crate; the builder and the
//! propagation protocol both route through it.

use super::types::ContextMap;
use serde_json::Value;

/// Whether an output counts as a tombstone
///
/// Null and zero-key non-array objects are empty. Empty arrays are a real
/// contribution, not a tombstone.
pub fn is_empty_output(output: &Value) -> bool {
    match output {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Merge `incoming` into `existing` by per-entry version
///
/// Returns a new map; neither input is mutated. For each incoming entry:
/// - an empty output is a tombstone: it deletes the existing entry when its
///   version is at least the existing one, and is otherwise ignored;
/// - a non-empty output replaces the existing entry only when strictly
///   newer. Equal versions keep the existing entry (first seen at a version
///   wins — a policy, not a law; flip here if the tie-break ever changes).
///
/// Entries present only in `existing` always carry over unchanged. A missing
/// existing entry compares as version -1, so any incoming version wins.
pub fn merge_by_version(existing: &ContextMap, incoming: &ContextMap) -> ContextMap {
    let mut merged = existing.clone();

    for (key, entry) in incoming {
        let existing_version = merged.get(key).map(|e| e.version);

        if is_empty_output(&entry.output) {
            if let Some(existing_version) = existing_version {
                if entry.version >= existing_version {
                    merged.remove(key);
                }
            }
        } else {
            let replace = match existing_version {
                None => true,
                Some(existing_version) => entry.version > existing_version,
            };
            if replace {
                merged.insert(key.clone(), entry.clone());
            }
        }
    }

    merged
}
