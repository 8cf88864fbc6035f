//! Gzip framing for encoded tiles.

use std::io::{Read, Write};

use bytes::Bytes;
use flate2::read::GzDecoder;
use flate2::{Compression, GzBuilder};

use crate::error::EncodeResult;

/// Gzip `data` at the default level.
///
/// The header carries no timestamp or file name, so equal input always
/// yields equal output.
pub fn gzip(data: &[u8]) -> EncodeResult<Bytes> {
    let mut encoder = GzBuilder::new()
        .mtime(0)
        .write(Vec::with_capacity(data.len() / 2 + 64), Compression::default());
    encoder.write_all(data)?;
    Ok(Bytes::from(encoder.finish()?))
}

/// Inverse of [`gzip`].
pub fn gunzip(data: &[u8]) -> EncodeResult<Vec<u8>> {
    let mut decoder = GzDecoder::new(data);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    Ok(out)
}
