//! LZSS with a 256-byte ring buffer.
//!
//! ## Stream layout
//! ```text
//! repeat (MSB-first bits):
//!   1  literal(8)                 -> emit literal
//!   0  offset(8)  count(4)        -> copy count+2 bytes from ring[offset..]
//! ```
//! The ring starts zeroed with the write position at `256 - 17`. Every
//! emitted byte is also written into the ring.

use log::debug;

use super::bits::BitReader;
use super::{CodecError, LzssDecode};

const RING_SIZE: usize = 256;
const RING_START: usize = RING_SIZE - 17;
const MIN_MATCH: u32 = 2;

/// A back-reference costs 13 bits and yields at most 17 bytes, which
/// bounds how far a stream can expand.
const MAX_EXPANSION: usize = 11;

/// Built-in LZSS decoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct Lzss;

impl LzssDecode for Lzss {
    fn decode(&self, input: &[u8], expected_len: usize) -> Result<Vec<u8>, CodecError> {
        let mut ring = [0u8; RING_SIZE];
        let mut ring_pos = RING_START;
        let capacity = expected_len.min(input.len().saturating_mul(MAX_EXPANSION));
        let mut out = Vec::with_capacity(capacity);
        let mut bits = BitReader::new(input);

        'stream: while out.len() < expected_len {
            let Some(flag) = bits.read_bits(1) else {
                break;
            };

            if flag == 1 {
                let Some(byte) = bits.read_u8() else {
                    break;
                };
                ring[ring_pos] = byte;
                ring_pos = (ring_pos + 1) % RING_SIZE;
                out.push(byte);
                continue;
            }

            let (Some(offset), Some(count)) = (bits.read_bits(8), bits.read_bits(4)) else {
                break;
            };
            for i in 0..count + MIN_MATCH {
                if out.len() >= expected_len {
                    break 'stream;
                }
                let byte = ring[(offset + i) as usize % RING_SIZE];
                ring[ring_pos] = byte;
                ring_pos = (ring_pos + 1) % RING_SIZE;
                out.push(byte);
            }
        }

        if expected_len != usize::MAX && out.len() < expected_len {
            debug!(
                "lzss input exhausted after {} of {} bytes",
                out.len(),
                expected_len
            );
        }
        Ok(out)
    }
}
