//! Cumulative context: wire types, codec, merge, and full rebuild

mod builder;
mod codec;
mod merge;
mod types;

pub use builder::rebuild_context;
pub use codec::{decode, encode, encode_with_threshold, COMPRESSION_THRESHOLD};
pub use merge::{is_empty_output, merge_by_version};
pub use types::{AncestorEntry, ContextMap, ContextWrapper};
