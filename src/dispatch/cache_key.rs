//! Cache-key synthesis.
//!
//! The key partitions the shared response cache per (protocol, host,
//! path, filtered query). The byte layout is an internal contract: each
//! field is length-prefixed (u32 little-endian) before concatenation, so
//! no two distinct tuples can collide by concatenation alone, and the
//! whole buffer is base64-encoded behind a leading `/`. Consumers treat
//! the result as opaque.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Synthesize the cache key for one request. Pure: equal inputs yield
/// byte-identical keys.
pub fn make_cache_key(
    protocol: &str,
    host: &str,
    path: Option<&str>,
    query: Option<&str>,
) -> Vec<u8> {
    let fields = [protocol, host, path.unwrap_or(""), query.unwrap_or("")];

    let mut buf = Vec::with_capacity(fields.iter().map(|f| f.len() + 4).sum());
    for field in fields {
        buf.extend_from_slice(&(field.len() as u32).to_le_bytes());
        buf.extend_from_slice(field.as_bytes());
    }

    let mut key = Vec::with_capacity(1 + buf.len() * 4 / 3 + 4);
    key.push(b'/');
    key.extend_from_slice(STANDARD.encode(&buf).as_bytes());
    key
}
