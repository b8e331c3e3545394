//! Flow: the owned card-and-edge store for one task flow

use super::card::{Card, CardId};
use super::edge::{Edge, EdgeId};
use super::engine::{FlowError, FlowResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Identifies a flow held by the engine
///
/// Transparent string newtype: a fresh one is a random UUID, but any
/// caller-supplied string works as well.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlowId(String);

impl FlowId {
    /// Create a new random FlowId (UUID-based)
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create a FlowId from a string (semantic ID)
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for FlowId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for FlowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for FlowId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for FlowId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Metadata about a flow
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlowMetadata {
    /// When the flow was created
    pub created_at: Option<DateTime<Utc>>,
    /// When the flow was last updated
    pub updated_at: Option<DateTime<Utc>>,
}

/// One task flow: a DAG of typed cards
///
/// Cards and edges are exclusively owned here; no other component keeps a
/// copy that could diverge. Edges live in a `Vec` so the order callers see
/// from [`parents_of`](Flow::parents_of) and [`children_of`](Flow::children_of)
/// is insertion order, which keeps merge tie-breaks deterministic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flow {
    /// Unique identifier
    pub id: FlowId,
    /// Human-readable name
    pub name: String,
    /// Cards in this flow
    pub cards: HashMap<CardId, Card>,
    /// Edges in this flow, in insertion order
    pub edges: Vec<Edge>,
    /// Flow metadata
    pub metadata: FlowMetadata,
}

impl Flow {
    /// Create a new flow with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: FlowId::new(),
            name: name.into(),
            cards: HashMap::new(),
            edges: Vec::new(),
            metadata: FlowMetadata {
                created_at: Some(Utc::now()),
                ..Default::default()
            },
        }
    }

    /// Create a new flow with a specific ID and name
    pub fn with_id(id: FlowId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            cards: HashMap::new(),
            edges: Vec::new(),
            metadata: FlowMetadata {
                created_at: Some(Utc::now()),
                ..Default::default()
            },
        }
    }

    /// Add a card to the flow
    pub fn add_card(&mut self, card: Card) -> CardId {
        let id = card.id.clone();
        self.cards.insert(id.clone(), card);
        self.touch();
        id
    }

    /// Get a card by ID
    pub fn card(&self, id: &CardId) -> Option<&Card> {
        self.cards.get(id)
    }

    /// Get a mutable reference to a card
    pub fn card_mut(&mut self, id: &CardId) -> Option<&mut Card> {
        self.cards.get_mut(id)
    }

    /// Add an edge, validating topology
    ///
    /// Rejects the edge when either endpoint is missing or when an edge with
    /// the same source/target pair already exists. No mutation on rejection.
    pub fn add_edge(&mut self, edge: Edge) -> FlowResult<EdgeId> {
        if !self.cards.contains_key(&edge.source) {
            return Err(FlowError::CardNotFound(edge.source.to_string()));
        }
        if !self.cards.contains_key(&edge.target) {
            return Err(FlowError::CardNotFound(edge.target.to_string()));
        }
        if self
            .edges
            .iter()
            .any(|e| e.source == edge.source && e.target == edge.target)
        {
            return Err(FlowError::DuplicateEdge {
                src: edge.source.to_string(),
                target: edge.target.to_string(),
            });
        }
        let id = edge.id;
        self.edges.push(edge);
        self.touch();
        Ok(id)
    }

    /// Remove an edge by ID, returning it if it existed
    pub fn remove_edge(&mut self, id: &EdgeId) -> Option<Edge> {
        let idx = self.edges.iter().position(|e| e.id == *id)?;
        let edge = self.edges.remove(idx);
        self.touch();
        Some(edge)
    }

    /// Remove a card and all incident edges
    ///
    /// Returns the removed card together with the ids of its former direct
    /// children, which the caller must clean up.
    pub fn remove_card(&mut self, id: &CardId) -> Option<(Card, Vec<CardId>)> {
        let card = self.cards.remove(id)?;
        let children: Vec<CardId> = self
            .edges
            .iter()
            .filter(|e| e.source == *id)
            .map(|e| e.target.clone())
            .collect();
        self.edges.retain(|e| e.source != *id && e.target != *id);
        self.touch();
        Some((card, children))
    }

    /// Edges whose target is the given card, in insertion order
    pub fn parents_of(&self, id: &CardId) -> Vec<&Edge> {
        self.edges.iter().filter(|e| e.target == *id).collect()
    }

    /// Edges whose source is the given card, in insertion order
    pub fn children_of(&self, id: &CardId) -> Vec<&Edge> {
        self.edges.iter().filter(|e| e.source == *id).collect()
    }

    /// Find an edge by ID
    pub fn edge(&self, id: &EdgeId) -> Option<&Edge> {
        self.edges.iter().find(|e| e.id == *id)
    }

    /// Get the number of cards
    pub fn card_count(&self) -> usize {
        self.cards.len()
    }

    /// Get the number of edges
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Update the last modified timestamp
    fn touch(&mut self) {
        self.metadata.updated_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_edge_rejects_missing_endpoint() {
        let mut flow = Flow::new("test");
        flow.add_card(Card::new("a", "problem"));

        let result = flow.add_edge(Edge::new("a", "b"));
        assert!(matches!(result, Err(FlowError::CardNotFound(_))));
        assert_eq!(flow.edge_count(), 0);
    }

    #[test]
    fn add_edge_rejects_duplicate_pair() {
        let mut flow = Flow::new("test");
        flow.add_card(Card::new("a", "problem"));
        flow.add_card(Card::new("b", "analysis"));

        flow.add_edge(Edge::new("a", "b")).unwrap();
        let result = flow.add_edge(Edge::new("a", "b"));
        assert!(matches!(result, Err(FlowError::DuplicateEdge { .. })));
        assert_eq!(flow.edge_count(), 1);
    }

    #[test]
    fn parents_preserve_insertion_order() {
        let mut flow = Flow::new("test");
        flow.add_card(Card::new("a", "data"));
        flow.add_card(Card::new("b", "data"));
        flow.add_card(Card::new("c", "analysis"));

        flow.add_edge(Edge::new("b", "c")).unwrap();
        flow.add_edge(Edge::new("a", "c")).unwrap();

        let parents: Vec<&str> = flow
            .parents_of(&"c".into())
            .iter()
            .map(|e| e.source.as_str())
            .collect();
        assert_eq!(parents, vec!["b", "a"]);
    }

    #[test]
    fn remove_card_drops_incident_edges_and_reports_children() {
        let mut flow = Flow::new("test");
        flow.add_card(Card::new("a", "data"));
        flow.add_card(Card::new("b", "analysis"));
        flow.add_card(Card::new("c", "report"));

        flow.add_edge(Edge::new("a", "b")).unwrap();
        flow.add_edge(Edge::new("b", "c")).unwrap();

        let (_, children) = flow.remove_card(&"b".into()).unwrap();
        assert_eq!(children, vec![CardId::from("c")]);
        assert_eq!(flow.edge_count(), 0);
        assert_eq!(flow.card_count(), 2);
    }
}
