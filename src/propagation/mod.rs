//! Propagation protocol: what happens when outputs or topology change
//!
//! Each event runs to completion against one owned `Flow` before the next is
//! accepted. Children are processed sequentially in stable edge order, and
//! the only suspension point is the handler call at the capability boundary.
//!
//! Output changes propagate one hop per event: a cascade through a chain is
//! one `on_output_changed` per level, driven by the caller. Edge and card
//! removal fall back to a full context rebuild — subtracting one ancestor
//! incrementally is unsafe because its contribution may have been folded
//! transitively into other ancestors' stored contexts.

use crate::context::{decode, encode, merge_by_version, rebuild_context, AncestorEntry, ContextMap};
use crate::graph::{CardId, Edge, EdgeId, Flow, FlowError, FlowResult};
use crate::handler::{HandlerRegistry, ParentOutput};
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Orchestrates propagation events over a flow
///
/// Holds the handler registry; all graph state stays in the `Flow` each
/// operation receives.
pub struct Propagator {
    registry: HandlerRegistry,
}

impl Default for Propagator {
    fn default() -> Self {
        Self::new(HandlerRegistry::new())
    }
}

impl Propagator {
    /// Create a propagator over the given registry
    pub fn new(registry: HandlerRegistry) -> Self {
        Self { registry }
    }

    /// The handler registry in use
    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Handle `OutputChanged`: regenerate a card's output and push it one
    /// hop to every direct child
    ///
    /// Handler failure is recorded as the card's sticky `last_error`; the
    /// card keeps its previous output and version, children are not touched,
    /// and the call still returns `Ok`.
    pub async fn on_output_changed(&self, flow: &mut Flow, id: &CardId) -> FlowResult<()> {
        let result = {
            let card = flow
                .card(id)
                .ok_or_else(|| FlowError::CardNotFound(id.to_string()))?;
            let handler = self.registry.resolve(&card.card_type);
            handler.generate_output(card).await
        };

        let output = match result {
            Ok(value) => normalize_output(value),
            Err(e) => {
                warn!(card = %id, error = %e, "output generation failed; update aborted");
                if let Some(card) = flow.card_mut(id) {
                    card.last_error = Some(e.to_string());
                }
                return Ok(());
            }
        };

        if let Some(card) = flow.card_mut(id) {
            card.output = output;
            card.last_error = None;
            card.touch();
        }

        let children: Vec<CardId> = flow
            .children_of(id)
            .iter()
            .map(|e| e.target.clone())
            .collect();
        for child in &children {
            propagate_to_child(flow, id, child);
        }
        debug!(card = %id, children = children.len(), "output propagated");
        Ok(())
    }

    /// Handle `EdgeAdded`: connect two existing cards and immediately push
    /// the source's current output to the target
    ///
    /// Rejects missing endpoints and duplicate source/target pairs without
    /// mutating anything. The source's output is not regenerated; the hop
    /// uses its current output and version.
    pub fn on_edge_added(
        &self,
        flow: &mut Flow,
        source: &CardId,
        target: &CardId,
    ) -> FlowResult<EdgeId> {
        let edge_id = flow.add_edge(Edge::new(source.clone(), target.clone()))?;
        propagate_to_child(flow, source, target);
        debug!(%source, %target, "edge added and propagated");
        Ok(edge_id)
    }

    /// Handle `EdgeRemoved`: disconnect and fully rebuild the target's
    /// context
    pub fn on_edge_removed(&self, flow: &mut Flow, edge_id: &EdgeId) -> FlowResult<()> {
        let edge = flow
            .remove_edge(edge_id)
            .ok_or_else(|| FlowError::EdgeNotFound(edge_id.to_string()))?;

        if let Some(target) = flow.card_mut(&edge.target) {
            target.direct_inputs.remove(&edge.source);
        }
        rebuild_and_store(flow, &edge.target);
        debug!(source = %edge.source, target = %edge.target, "edge removed; target context rebuilt");
        Ok(())
    }

    /// Handle `CardRemoved`: drop the card and incident edges, then clean
    /// every former child
    ///
    /// Each former child loses its direct input from the removed card and
    /// gets a full context rebuild, so the removed ancestor — and only it —
    /// disappears from every descendant view reachable through rebuilds.
    pub fn on_card_removed(&self, flow: &mut Flow, id: &CardId) -> FlowResult<()> {
        let (_card, children) = flow
            .remove_card(id)
            .ok_or_else(|| FlowError::CardNotFound(id.to_string()))?;

        for child in &children {
            if let Some(card) = flow.card_mut(child) {
                card.direct_inputs.remove(id);
            }
            rebuild_and_store(flow, child);
        }
        debug!(card = %id, children = children.len(), "card removed; children rebuilt");
        Ok(())
    }

    /// Rebuild a card's cumulative context from scratch and store it
    pub fn rebuild(&self, flow: &mut Flow, id: &CardId) -> FlowResult<ContextMap> {
        if flow.card(id).is_none() {
            return Err(FlowError::CardNotFound(id.to_string()));
        }
        let ctx = rebuild_context(flow, id);
        if let Some(card) = flow.card_mut(id) {
            card.cumulative_context = encode(&ctx);
        }
        Ok(ctx)
    }

    /// Run a card's `process_input` against its direct parents' outputs
    ///
    /// Applies the handler's update and reports whether the card's output
    /// actually changed, so the caller knows to trigger the next hop.
    /// Handler failure records the sticky `last_error` and reports no change.
    pub async fn trigger_processing(&self, flow: &mut Flow, id: &CardId) -> FlowResult<bool> {
        let parent_outputs = direct_parent_outputs(flow, id);
        let result = {
            let card = flow
                .card(id)
                .ok_or_else(|| FlowError::CardNotFound(id.to_string()))?;
            let handler = self.registry.resolve(&card.card_type);
            handler.process_input(card, &parent_outputs).await
        };

        match result {
            Ok(update) => {
                let mut changed = false;
                if let Some(card) = flow.card_mut(id) {
                    if !update.fields.is_empty() {
                        card.fields.extend(update.fields);
                        card.last_error = None;
                        card.touch();
                    }
                    if let Some(output) = update.output {
                        changed = card.output != output;
                        card.output = output;
                        card.last_error = None;
                        card.touch();
                    }
                }
                Ok(changed)
            }
            Err(e) => {
                warn!(card = %id, error = %e, "input processing failed");
                if let Some(card) = flow.card_mut(id) {
                    card.last_error = Some(e.to_string());
                }
                Ok(false)
            }
        }
    }
}

/// Assemble the direct parents' outputs for a handler's `process_input`
pub fn direct_parent_outputs(flow: &Flow, id: &CardId) -> HashMap<CardId, ParentOutput> {
    flow.parents_of(id)
        .iter()
        .filter_map(|edge| {
            flow.card(&edge.source).map(|parent| {
                (
                    parent.id.clone(),
                    ParentOutput {
                        card_type: parent.card_type.clone(),
                        output: parent.output.clone(),
                    },
                )
            })
        })
        .collect()
}

/// One propagation hop: refresh the child's direct input from the source and
/// fold the source's knowledge into the child's stored context
///
/// The merge absorbs the source's own cumulative context first, then overlays
/// the source's direct entry, so ancestors the source has already folded in
/// travel with its output. The child's own children are deliberately not
/// visited.
fn propagate_to_child(flow: &mut Flow, source: &CardId, child: &CardId) {
    let Some(parent) = flow.card(source) else {
        return;
    };
    let parent_ctx = decode(Some(&parent.cumulative_context));
    let entry = AncestorEntry::new(
        parent.card_type.clone(),
        parent.output.clone(),
        parent.version_or_now(),
    );
    let parent_output = parent.output.clone();

    let Some(card) = flow.card_mut(child) else {
        warn!(%child, "propagation target missing; hop skipped");
        return;
    };
    card.direct_inputs.insert(source.clone(), parent_output);

    let mut incoming = ContextMap::new();
    incoming.insert(source.clone(), entry);
    let merged = merge_by_version(&decode(Some(&card.cumulative_context)), &parent_ctx);
    let merged = merge_by_version(&merged, &incoming);
    card.cumulative_context = encode(&merged);
    card.touch();
}

/// Full rebuild of one card's context, written back to the card
fn rebuild_and_store(flow: &mut Flow, id: &CardId) {
    let ctx = rebuild_context(flow, id);
    if let Some(card) = flow.card_mut(id) {
        card.cumulative_context = encode(&ctx);
        card.touch();
    }
}

/// A handler returning nothing means "empty output", not "no output"
fn normalize_output(value: Option<Value>) -> Value {
    match value {
        None | Some(Value::Null) => Value::Object(Map::new()),
        Some(value) => value,
    }
}
