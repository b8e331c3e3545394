//! Capability boundary: per-type card logic behind a registry

mod default;
mod traits;

pub use default::DefaultHandler;
pub use traits::{CardHandler, CardUpdate, HandlerError, HandlerRegistry, ParentOutput};
