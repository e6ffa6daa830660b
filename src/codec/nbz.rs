//! NBZ audio: a bzip2 stream, usually behind a 4-byte length prefix.
//!
//! ## Layout
//! ```text
//! [0x00] decoded length (u32 BE)   optional
//! [0x04] "BZh" ...                 bzip2 stream
//! ```

use std::io::Read;

use byteorder::{BigEndian, ByteOrder};
use bzip2::read::BzDecoder;
use log::warn;

use super::{CodecError, NbzDecode};

const BZIP2_MAGIC: &[u8] = b"BZh";
const PREFIX_SIZE: usize = 4;

/// Built-in NBZ decoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct Nbz;

/// Split the optional length prefix from the bzip2 stream.
fn split_prefix(input: &[u8]) -> Result<(Option<u32>, &[u8]), CodecError> {
    if input.starts_with(BZIP2_MAGIC) {
        return Ok((None, input));
    }
    match input.get(PREFIX_SIZE..) {
        Some(stream) if stream.starts_with(BZIP2_MAGIC) => {
            Ok((Some(BigEndian::read_u32(&input[..PREFIX_SIZE])), stream))
        }
        _ => Err(CodecError::Malformed("no bzip2 stream header".into())),
    }
}

impl NbzDecode for Nbz {
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>, CodecError> {
        let (prefix, stream) = split_prefix(input)?;

        let mut out = Vec::with_capacity(prefix.unwrap_or(0).min(1 << 26) as usize);
        BzDecoder::new(stream).read_to_end(&mut out)?;

        if let Some(len) = prefix {
            if len as usize != out.len() {
                warn!(
                    "nbz length prefix says {} bytes but the stream decoded to {}",
                    len,
                    out.len()
                );
            }
        }
        Ok(out)
    }
}
