//! Fallback handler for card types with no registered logic

use super::traits::{CardHandler, HandlerError};
use crate::graph::Card;
use async_trait::async_trait;
use serde_json::Value;

/// Echo handler: a card with no registered type logic keeps its own output
///
/// This keeps propagation flowing through cards the host application has not
/// (or not yet) given real behavior.
pub struct DefaultHandler;

#[async_trait]
impl CardHandler for DefaultHandler {
    fn card_type(&self) -> &str {
        "default"
    }

    async fn generate_output(&self, card: &Card) -> Result<Option<Value>, HandlerError> {
        Ok(Some(card.output.clone()))
    }
}
