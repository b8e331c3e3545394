//! Codec: size-gated storage form for cumulative context
//!
//! Contexts small enough to store inline are stored inline; anything over
//! the threshold is gzipped and base64-encoded. Decoding never fails: a
//! corrupt blob degrades to an empty context so propagation keeps running.

use super::types::{ContextMap, ContextWrapper};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde_json::Value;
use std::io::{Read, Write};
use tracing::warn;

/// Serialized contexts at most this many bytes are stored inline
pub const COMPRESSION_THRESHOLD: usize = 200 * 1024;

/// Encode a context into its storage form using the default threshold
pub fn encode(ctx: &ContextMap) -> ContextWrapper {
    encode_with_threshold(ctx, COMPRESSION_THRESHOLD)
}

/// Encode a context into its storage form
///
/// The inline branch stores a structural clone, never a shared reference,
/// so later mutation of the source cannot corrupt stored state. If
/// compression fails the context is stored inline regardless of size.
pub fn encode_with_threshold(ctx: &ContextMap, threshold: usize) -> ContextWrapper {
    let json = match serde_json::to_string(ctx) {
        Ok(json) => json,
        Err(e) => {
            warn!(error = %e, "context serialization failed; storing empty context");
            return ContextWrapper::default();
        }
    };

    if json.len() > threshold {
        match gzip_base64(&json) {
            Ok(blob) => {
                return ContextWrapper {
                    compressed: true,
                    blob: Value::String(blob),
                }
            }
            Err(e) => {
                warn!(error = %e, "context compression failed; storing inline");
            }
        }
    }

    ContextWrapper {
        compressed: false,
        blob: serde_json::from_str(&json).unwrap_or(Value::Null),
    }
}

/// Decode a stored context back into a map
///
/// Always returns a fresh map the caller owns. An absent wrapper, a null
/// blob, or any base64/gzip/JSON failure yields an empty map — corrupt
/// context degrades to "no ancestor knowledge" rather than an error.
pub fn decode(wrapper: Option<&ContextWrapper>) -> ContextMap {
    let Some(wrapper) = wrapper else {
        return ContextMap::new();
    };
    if wrapper.blob.is_null() {
        return ContextMap::new();
    }

    if wrapper.compressed {
        let Value::String(blob) = &wrapper.blob else {
            warn!("compressed context blob is not a string; treating as empty");
            return ContextMap::new();
        };
        match gunzip_base64(blob) {
            Ok(json) => match serde_json::from_str(&json) {
                Ok(ctx) => ctx,
                Err(e) => {
                    warn!(error = %e, "decompressed context is not valid JSON; treating as empty");
                    ContextMap::new()
                }
            },
            Err(e) => {
                warn!(error = %e, "context decompression failed; treating as empty");
                ContextMap::new()
            }
        }
    } else {
        match serde_json::from_value(wrapper.blob.clone()) {
            Ok(ctx) => ctx,
            Err(e) => {
                warn!(error = %e, "inline context blob is malformed; treating as empty");
                ContextMap::new()
            }
        }
    }
}

fn gzip_base64(json: &str) -> std::io::Result<String> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(json.as_bytes())?;
    let bytes = encoder.finish()?;
    Ok(BASE64.encode(bytes))
}

fn gunzip_base64(blob: &str) -> std::io::Result<String> {
    let bytes = BASE64
        .decode(blob)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    let mut json = String::new();
    GzDecoder::new(bytes.as_slice()).read_to_string(&mut json)?;
    Ok(json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::AncestorEntry;
    use crate::graph::CardId;
    use serde_json::json;

    fn small_ctx() -> ContextMap {
        let mut ctx = ContextMap::new();
        ctx.insert(
            "a".into(),
            AncestorEntry::new("problem", json!({"statement": "why"}), 100),
        );
        ctx
    }

    #[test]
    fn small_context_stays_inline() {
        let wrapper = encode(&small_ctx());
        assert!(!wrapper.compressed);
        assert!(wrapper.blob.is_object());
    }

    #[test]
    fn large_context_is_compressed() {
        let mut ctx = ContextMap::new();
        ctx.insert(
            "a".into(),
            AncestorEntry::new("data", json!({"rows": "x".repeat(COMPRESSION_THRESHOLD)}), 1),
        );
        let wrapper = encode(&ctx);
        assert!(wrapper.compressed);
        assert!(wrapper.blob.is_string());
        assert_eq!(decode(Some(&wrapper)), ctx);
    }

    #[test]
    fn decode_of_none_is_empty() {
        assert!(decode(None).is_empty());
        assert!(decode(Some(&ContextWrapper::default())).is_empty());
    }

    #[test]
    fn corrupt_base64_degrades_to_empty() {
        let wrapper = ContextWrapper {
            compressed: true,
            blob: Value::String("not base64!!!".to_string()),
        };
        assert!(decode(Some(&wrapper)).is_empty());
    }

    #[test]
    fn corrupt_gzip_degrades_to_empty() {
        let wrapper = ContextWrapper {
            compressed: true,
            blob: Value::String(BASE64.encode(b"plainly not gzip")),
        };
        assert!(decode(Some(&wrapper)).is_empty());
    }

    #[test]
    fn malformed_inline_blob_degrades_to_empty() {
        let wrapper = ContextWrapper {
            compressed: false,
            blob: json!({"a": "not an ancestor entry"}),
        };
        assert!(decode(Some(&wrapper)).is_empty());
    }

    #[test]
    fn inline_decode_returns_a_fresh_clone() {
        let ctx = small_ctx();
        let wrapper = encode(&ctx);
        let mut first = decode(Some(&wrapper));
        first.remove(&CardId::from("a"));
        let second = decode(Some(&wrapper));
        assert_eq!(second, ctx);
    }
}
