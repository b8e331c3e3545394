//! Core graph data structures

mod card;
mod edge;
mod engine;
mod flow;


pub use card::{Card, CardId};
pub use edge::{Edge, EdgeId};
pub use engine::{FlowEngine, FlowError, FlowResult};
pub use flow::{Flow, FlowId, FlowMetadata};
