//! Optional zstd compression of payload plaintext.
//!
//! Compression runs before encryption and is kept only when it makes the
//! data strictly smaller.

use std::io::Read;

use register_ledger_core::Compression;

use crate::error::{PayloadError, Result};

/// Compress `data` if that shrinks it.
///
/// Returns the bytes to encrypt together with the compression actually used.
/// Inputs shorter than `min_size` are never compressed.
pub fn maybe_compress(data: &[u8], level: i32, min_size: usize) -> Result<(Vec<u8>, Compression)> {
    if data.len() < min_size {
        return Ok((data.to_vec(), Compression::None));
    }

    let compressed =
        zstd::encode_all(data, level).map_err(|e| PayloadError::CompressionError(e.to_string()))?;

    if compressed.len() < data.len() {
        Ok((compressed, Compression::Zstd))
    } else {
        Ok((data.to_vec(), Compression::None))
    }
}

/// Undo [`maybe_compress`], producing at most `limit` bytes.
///
/// Inflation stops one byte past `limit`; any body longer than `limit` is an
/// error.
pub fn decompress(data: Vec<u8>, compression: Compression, limit: u64) -> Result<Vec<u8>> {
    let body = match compression {
        Compression::None => data,
        Compression::Zstd => {
            let mut out = Vec::new();
            zstd::stream::read::Decoder::new(data.as_slice())
                .and_then(|decoder| decoder.take(limit.saturating_add(1)).read_to_end(&mut out))
                .map_err(|e| PayloadError::CompressionError(e.to_string()))?;
            out
        }
    };
    if body.len() as u64 > limit {
        return Err(PayloadError::CompressionError(format!(
            "body exceeds declared size of {limit} bytes"
        )));
    }
    Ok(body)
}
