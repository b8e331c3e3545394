//! Context builder: full reconstruction of a card's cumulative context

use super::codec::decode;
use super::merge::merge_by_version;
use super::types::{AncestorEntry, ContextMap};
use crate::graph::{CardId, Flow};

/// Rebuild a card's entire cumulative context from its incoming edges
///
/// For each parent, in stable edge order: first absorb everything the parent
/// itself knows, then overlay the parent's own direct entry. The overlay must
/// come second so the parent's current state wins over whatever stale entry
/// for itself its stored context might carry.
///
/// Idempotent: with no intervening graph change, two calls yield equal maps.
pub fn rebuild_context(flow: &Flow, id: &CardId) -> ContextMap {
    let mut acc = ContextMap::new();

    for edge in flow.parents_of(id) {
        let Some(parent) = flow.card(&edge.source) else {
            continue;
        };

        acc = merge_by_version(&acc, &decode(Some(&parent.cumulative_context)));

        let mut direct = ContextMap::new();
        direct.insert(
            parent.id.clone(),
            AncestorEntry::new(
                parent.card_type.clone(),
                parent.output.clone(),
                parent.version_or_now(),
            ),
        );
        acc = merge_by_version(&acc, &direct);
    }

    acc
}
