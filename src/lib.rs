//! Cardflow: Cumulative Context Propagation Engine
//!
//! Maintains a DAG of typed "cards" where every card sees a merged,
//! versioned view of every upstream ancestor's output — the cumulative
//! context — and keeps those views consistent as outputs change and as
//! edges and cards come and go.
//!
//! # Core Concepts
//!
//! - **Cards**: typed nodes owning an opaque JSON output and a version
//!   derived from their last-modified timestamp
//! - **Cumulative context**: per-card map of every ancestor's latest known
//!   output, merged by version with tombstone semantics
//! - **Propagation**: one-hop events (output changed, edge added/removed,
//!   card removed) that keep descendant views consistent
//!
//! Per-type card logic lives outside the engine, behind the [`CardHandler`]
//! capability trait.
//!
//! # Example
//!
//! ```
//! use cardflow::{Flow, FlowEngine};
//!
//! let engine = FlowEngine::new();
//! engine.upsert_flow(Flow::new("research"));
//! ```

mod api;
mod graph;
pub mod context;
pub mod handler;
pub mod propagation;

pub use api::CardflowApi;
pub use context::{
    decode, encode, merge_by_version, rebuild_context, AncestorEntry, ContextMap, ContextWrapper,
    COMPRESSION_THRESHOLD,
};
pub use graph::{Card, CardId, Edge, EdgeId, Flow, FlowEngine, FlowError, FlowId, FlowResult};
pub use handler::{CardHandler, CardUpdate, DefaultHandler, HandlerError, HandlerRegistry, ParentOutput};
pub use propagation::Propagator;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
