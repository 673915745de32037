//! Snapshot payload compression using DEFLATE via `miniz_oxide`.
//!
//! When the `FLAG_COMPRESSED` bit is set in the artifact header the
//! payload is DEFLATE-compressed.  Compression is applied only to payloads
//! above a minimum size and only when the output is actually smaller
//! (noisy frames often are not).

use log::warn;
use miniz_oxide::deflate::compress_to_vec;
use miniz_oxide::inflate::decompress_to_vec_with_limit;

/// Minimum payload size worth compressing.
const COMPRESS_THRESHOLD: usize = 128;

/// DEFLATE compression level (1-10, higher = better ratio, slower).
const COMPRESSION_LEVEL: u8 = 6;

/// Upper bound on an inflated payload.  Guards against decompression
/// bombs when reading untrusted artifacts.
pub const MAX_INFLATED_LEN: usize = 256 * 1024 * 1024;

/// Compress a payload.  `None` means "store it uncompressed".
pub fn compress(input: &[u8]) -> Option<Vec<u8>> {
    if input.len() < COMPRESS_THRESHOLD {
        return None;
    }

    let compressed = compress_to_vec(input, COMPRESSION_LEVEL);

    if compressed.len() >= input.len() {
        return None;
    }

    Some(compressed)
}

/// Inflate a payload, or `None` if it is corrupt or too large.
pub fn decompress(input: &[u8]) -> Option<Vec<u8>> {
    match decompress_to_vec_with_limit(input, MAX_INFLATED_LEN) {
        Ok(data) => Some(data),
        Err(e) => {
            warn!("snapshot: DEFLATE error: {:?}", e.status);
            None
        }
    }
}

// ── Tests ────────────────────────────────────────────────────
