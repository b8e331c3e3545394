//! Transport-independent API layer.
//!
//! `CardflowApi` is the single entry point for all consumer-facing
//! operations. Hosts (canvas UI, agent tooling, direct embedding) call
//! `CardflowApi` methods — they never reach into the `Propagator` or
//! `FlowEngine` directly.
//!
//! Each call clones the flow out of the engine, runs the propagation event
//! to completion, and writes the flow back. Under the engine's single-owner
//! model this is equivalent to mutating in place, and it means a failed
//! topology operation leaves the stored flow untouched.

use std::sync::Arc;

use crate::context::{self, ContextMap, ContextWrapper};
use crate::graph::{CardId, EdgeId, Flow, FlowEngine, FlowError, FlowId, FlowResult};
use crate::propagation::Propagator;

/// Single entry point for all consumer-facing operations.
#[derive(Clone)]
pub struct CardflowApi {
    engine: Arc<FlowEngine>,
    propagator: Arc<Propagator>,
}

impl CardflowApi {
    /// Create a new API instance.
    pub fn new(engine: Arc<FlowEngine>, propagator: Arc<Propagator>) -> Self {
        Self { engine, propagator }
    }

    /// The underlying flow engine.
    pub fn engine(&self) -> &FlowEngine {
        &self.engine
    }

    // --- Propagation events ---

    /// Recompute a card's output and push it one hop to its children.
    pub async fn on_output_changed(&self, flow_id: &FlowId, card_id: &CardId) -> FlowResult<()> {
        let mut flow = self.take_flow(flow_id)?;
        self.propagator.on_output_changed(&mut flow, card_id).await?;
        self.engine.upsert_flow(flow);
        Ok(())
    }

    /// Connect two cards and immediately propagate across the new edge.
    pub fn on_edge_added(
        &self,
        flow_id: &FlowId,
        source: &CardId,
        target: &CardId,
    ) -> FlowResult<EdgeId> {
        let mut flow = self.take_flow(flow_id)?;
        let edge_id = self.propagator.on_edge_added(&mut flow, source, target)?;
        self.engine.upsert_flow(flow);
        Ok(edge_id)
    }

    /// Disconnect an edge and rebuild the target's context.
    pub fn on_edge_removed(&self, flow_id: &FlowId, edge_id: &EdgeId) -> FlowResult<()> {
        let mut flow = self.take_flow(flow_id)?;
        self.propagator.on_edge_removed(&mut flow, edge_id)?;
        self.engine.upsert_flow(flow);
        Ok(())
    }

    /// Remove a card, its edges, and its trace from every former child.
    pub fn on_card_removed(&self, flow_id: &FlowId, card_id: &CardId) -> FlowResult<()> {
        let mut flow = self.take_flow(flow_id)?;
        self.propagator.on_card_removed(&mut flow, card_id)?;
        self.engine.upsert_flow(flow);
        Ok(())
    }

    /// Rebuild a card's cumulative context from scratch.
    pub fn rebuild_context(&self, flow_id: &FlowId, card_id: &CardId) -> FlowResult<ContextMap> {
        let mut flow = self.take_flow(flow_id)?;
        let ctx = self.propagator.rebuild(&mut flow, card_id)?;
        self.engine.upsert_flow(flow);
        Ok(ctx)
    }

    /// Run a card's `process_input`; returns whether its output changed.
    pub async fn trigger_processing(
        &self,
        flow_id: &FlowId,
        card_id: &CardId,
    ) -> FlowResult<bool> {
        let mut flow = self.take_flow(flow_id)?;
        let changed = self.propagator.trigger_processing(&mut flow, card_id).await?;
        self.engine.upsert_flow(flow);
        Ok(changed)
    }

    // --- Codec passthrough ---

    /// Encode a context into its storage form.
    pub fn encode(&self, ctx: &ContextMap) -> ContextWrapper {
        context::encode(ctx)
    }

    /// Decode a stored context; corrupt input degrades to an empty map.
    pub fn decode(&self, wrapper: Option<&ContextWrapper>) -> ContextMap {
        context::decode(wrapper)
    }

    fn take_flow(&self, id: &FlowId) -> FlowResult<Flow> {
        self.engine
            .get_flow(id)
            .ok_or_else(|| FlowError::FlowNotFound(id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Card;
    use crate::handler::HandlerRegistry;
    use serde_json::json;

    fn api_with_flow() -> (CardflowApi, FlowId) {
        let engine = Arc::new(FlowEngine::new());
        let mut flow = Flow::new("test");
        flow.add_card(Card::new("a", "data").with_output(json!({"rows": 1})));
        flow.add_card(Card::new("b", "analysis"));
        let flow_id = engine.upsert_flow(flow);
        let propagator = Arc::new(Propagator::new(HandlerRegistry::new()));
        (CardflowApi::new(engine, propagator), flow_id)
    }

    #[test]
    fn edge_added_persists_through_engine() {
        let (api, flow_id) = api_with_flow();

        api.on_edge_added(&flow_id, &"a".into(), &"b".into()).unwrap();

        let flow = api.engine().get_flow(&flow_id).unwrap();
        assert_eq!(flow.edge_count(), 1);
        let b = flow.card(&"b".into()).unwrap();
        assert_eq!(b.direct_inputs[&CardId::from("a")], json!({"rows": 1}));
    }

    #[test]
    fn rejected_operation_leaves_stored_flow_untouched() {
        let (api, flow_id) = api_with_flow();

        api.on_edge_added(&flow_id, &"a".into(), &"b".into()).unwrap();
        let before = api.engine().get_flow(&flow_id).unwrap();

        let result = api.on_edge_added(&flow_id, &"a".into(), &"b".into());
        assert!(result.is_err());

        let after = api.engine().get_flow(&flow_id).unwrap();
        assert_eq!(before.edge_count(), after.edge_count());
        assert_eq!(before.metadata.updated_at, after.metadata.updated_at);
    }

    #[test]
    fn unknown_flow_is_rejected() {
        let (api, _) = api_with_flow();
        let missing = FlowId::from_string("flow:absent");
        let result = api.rebuild_context(&missing, &"a".into());
        assert!(matches!(result, Err(FlowError::FlowNotFound(_))));
    }
}
