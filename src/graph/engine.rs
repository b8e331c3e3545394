//! FlowEngine: concurrent store of the flows this process owns

use super::flow::{Flow, FlowId};
use dashmap::DashMap;
use thiserror::Error;

/// Errors that can occur in cardflow operations
#[derive(Debug, Error)]
pub enum FlowError {
    #[error("Flow not found: {0}")]
    FlowNotFound(FlowId),

    #[error("Card not found: {0}")]
    CardNotFound(String),

    #[error("Edge not found: {0}")]
    EdgeNotFound(String),

    #[error("Duplicate edge: {src} -> {target}")]
    DuplicateEdge { src: String, target: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for cardflow operations
pub type FlowResult<T> = Result<T, FlowError>;

/// Store of whole flows, keyed by id
///
/// Propagation never mutates a flow in place here: the API layer takes an
/// owned copy out, runs the event against it, and puts the result back with
/// [`upsert_flow`](FlowEngine::upsert_flow). That keeps each event atomic
/// from the store's point of view — a rejected event writes nothing back.
#[derive(Debug, Default)]
pub struct FlowEngine {
    flows: DashMap<FlowId, Flow>,
}

impl FlowEngine {
    /// Create an empty engine
    pub fn new() -> Self {
        Self {
            flows: DashMap::new(),
        }
    }

    /// Store a flow, replacing any previous flow under the same id
    pub fn upsert_flow(&self, flow: Flow) -> FlowId {
        let id = flow.id.clone();
        self.flows.insert(id.clone(), flow);
        id
    }

    /// An owned copy of the flow, if it exists
    pub fn get_flow(&self, id: &FlowId) -> Option<Flow> {
        self.flows.get(id).map(|r| r.clone())
    }

    /// Drop a flow from the store, returning it
    pub fn remove_flow(&self, id: &FlowId) -> Option<Flow> {
        self.flows.remove(id).map(|(_, flow)| flow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Card;

    #[test]
    fn upsert_replaces_the_flow_under_the_same_id() {
        let engine = FlowEngine::new();
        let id = FlowId::from_string("flow:research");

        engine.upsert_flow(Flow::with_id(id.clone(), "first"));
        let mut second = Flow::with_id(id.clone(), "second");
        second.add_card(Card::new("a", "problem"));
        engine.upsert_flow(second);

        let stored = engine.get_flow(&id).unwrap();
        assert_eq!(stored.name, "second");
        assert_eq!(stored.card_count(), 1);
    }

    #[test]
    fn get_flow_hands_out_an_owned_copy() {
        let engine = FlowEngine::new();
        let id = engine.upsert_flow(Flow::new("research"));

        let mut copy = engine.get_flow(&id).unwrap();
        copy.add_card(Card::new("a", "problem"));

        // Mutating the copy never leaks into the store
        assert_eq!(engine.get_flow(&id).unwrap().card_count(), 0);
    }

    #[test]
    fn removed_flow_is_gone() {
        let engine = FlowEngine::new();
        let id = engine.upsert_flow(Flow::new("research"));

        let removed = engine.remove_flow(&id);
        assert_eq!(removed.unwrap().name, "research");
        assert!(engine.get_flow(&id).is_none());
        assert!(engine.remove_flow(&id).is_none());
    }
}
