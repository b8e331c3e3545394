//! Card handler trait — the capability boundary for per-type logic
//!
//! The engine never computes a card's own output; it asks the handler
//! registered for the card's type. Handlers may perform network I/O, so both
//! operations are async — this is the only suspension point in propagation.

use crate::graph::{Card, CardId};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use thiserror::Error;

/// Errors a handler can report
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("Handler failed: {0}")]
    Failed(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// A direct parent's output as handed to `process_input`
#[derive(Debug, Clone, PartialEq)]
pub struct ParentOutput {
    /// The parent's card type
    pub card_type: String,
    /// The parent's current output
    pub output: Value,
}

/// Partial update a handler returns from `process_input`
#[derive(Debug, Clone, Default)]
pub struct CardUpdate {
    /// New output for the card, if the handler recomputed it
    pub output: Option<Value>,
    /// Extra card fields to set; merged key-by-key onto the card's `fields`
    pub fields: Map<String, Value>,
}

/// Per-type card logic
///
/// # Example
///
/// ```ignore
/// struct SurveyHandler;
///
/// #[async_trait]
/// impl CardHandler for SurveyHandler {
///     fn card_type(&self) -> &str { "survey" }
///
///     async fn generate_output(&self, card: &Card) -> Result<Option<Value>, HandlerError> {
///         // Summarize collected responses
///         Ok(Some(json!({ "responses": 12 })))
///     }
/// }
/// ```
#[async_trait]
pub trait CardHandler: Send + Sync {
    /// The card type this handler serves
    fn card_type(&self) -> &str;

    /// (Re)compute the card's own output
    ///
    /// `None` and `Value::Null` both normalize to `{}` when applied.
    async fn generate_output(&self, card: &Card) -> Result<Option<Value>, HandlerError>;

    /// React to the direct parents' outputs
    ///
    /// The default implementation returns an empty update.
    async fn process_input(
        &self,
        card: &Card,
        parent_outputs: &HashMap<CardId, ParentOutput>,
    ) -> Result<CardUpdate, HandlerError> {
        let _ = (card, parent_outputs);
        Ok(CardUpdate::default())
    }
}

/// Registry of card handlers keyed by card type
///
/// Unknown types resolve to the fallback handler so propagation never stalls
/// on a card the host application forgot to register.
pub struct HandlerRegistry {
    handlers: HashMap<String, Box<dyn CardHandler>>,
    fallback: Box<dyn CardHandler>,
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HandlerRegistry {
    /// Create a registry with the default fallback handler
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            fallback: Box::new(super::default::DefaultHandler),
        }
    }

    /// Register a handler under its declared card type
    pub fn register<H: CardHandler + 'static>(&mut self, handler: H) {
        self.handlers
            .insert(handler.card_type().to_string(), Box::new(handler));
    }

    /// Replace the fallback used for unregistered types
    pub fn with_fallback<H: CardHandler + 'static>(mut self, handler: H) -> Self {
        self.fallback = Box::new(handler);
        self
    }

    /// Resolve the handler for a card type, falling back for unknown types
    pub fn resolve(&self, card_type: &str) -> &dyn CardHandler {
        self.handlers
            .get(card_type)
            .map(|h| h.as_ref())
            .unwrap_or(self.fallback.as_ref())
    }

    /// Whether a dedicated (non-fallback) handler exists for a type
    pub fn has(&self, card_type: &str) -> bool {
        self.handlers.contains_key(card_type)
    }

    /// Number of registered handlers (excluding the fallback)
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Check if the registry has no dedicated handlers
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
