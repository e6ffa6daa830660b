//! Decompression of stored entry bytes.
//!
//! The archive format names three codecs. Each one sits behind a small
//! trait so callers can substitute their own implementation; [`Codecs`]
//! bundles one of each and dispatches on [`Compression`].
//!
//! | Kind   | Trait          | Built-in           | Output |
//! |--------|----------------|--------------------|--------|
//! | `Spb`  | [`SpbDecode`]  | [`spb::Spb`]       | 24-bit BMP file |
//! | `Lzss` | [`LzssDecode`] | [`lzss::Lzss`]     | raw bytes |
//! | `Nbz`  | [`NbzDecode`]  | [`nbz::Nbz`]       | raw bytes (usually WAV) |
//!
//! Decoders only read their input slice and allocate their own output.

mod bits;
pub mod bmp;
pub mod lzss;
pub mod nbz;
pub mod spb;

use log::warn;
use thiserror::Error;

use crate::nsa::Compression;

pub use spb::{PlaneOrder, ScanOrder, SpbOptions};

/// How far a declared SPB size may stray from the length of the BMP file
/// built from the decoded image.
pub const SPB_SIZE_SLACK: usize = 8;

/// Failure reported by an individual decoder.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The input is too short to hold the codec's own header.
    #[error("input too short: needed {needed} bytes, got {available}")]
    Truncated { needed: usize, available: usize },

    /// An image header declares dimensions outside the accepted range.
    #[error("implausible image size {width}x{height}")]
    Implausible { width: u32, height: u32 },

    /// The input does not look like this codec's format.
    #[error("malformed stream: {0}")]
    Malformed(String),

    /// The underlying decompressor failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure of a dispatched decompression, before entry context is added.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("declared size {declared} does not match decoded size {actual}")]
    SizeMismatch { declared: u32, actual: usize },

    #[error("{codec} decoder failed: {source}")]
    Codec {
        codec: Compression,
        #[source]
        source: CodecError,
    },
}

/// A decoded image: top-down rows of `B, G, R` triples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// Image decoder for [`Compression::Spb`].
pub trait SpbDecode: Send + Sync {
    fn decode(&self, input: &[u8]) -> Result<DecodedImage, CodecError>;
}

/// Dictionary decoder for [`Compression::Lzss`].
pub trait LzssDecode: Send + Sync {
    /// Decode at most `expected_len` bytes.
    fn decode(&self, input: &[u8], expected_len: usize) -> Result<Vec<u8>, CodecError>;
}

/// Audio decoder for [`Compression::Nbz`].
pub trait NbzDecode: Send + Sync {
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>, CodecError>;
}

/// One decoder per compression kind.
pub struct Codecs {
    spb: Box<dyn SpbDecode>,
    lzss: Box<dyn LzssDecode>,
    nbz: Box<dyn NbzDecode>,
}

impl Default for Codecs {
    fn default() -> Self {
        Self::new(SpbOptions::default())
    }
}

impl Codecs {
    /// The built-in decoders, with the given SPB pixel layout.
    pub fn new(spb_options: SpbOptions) -> Self {
        Self {
            spb: Box::new(spb::Spb::new(spb_options)),
            lzss: Box::new(lzss::Lzss),
            nbz: Box::new(nbz::Nbz),
        }
    }

    pub fn with_spb(mut self, decoder: impl SpbDecode + 'static) -> Self {
        self.spb = Box::new(decoder);
        self
    }

    pub fn with_lzss(mut self, decoder: impl LzssDecode + 'static) -> Self {
        self.lzss = Box::new(decoder);
        self
    }

    pub fn with_nbz(mut self, decoder: impl NbzDecode + 'static) -> Self {
        self.nbz = Box::new(decoder);
        self
    }

    /// Decompress `input` according to `compression`.
    ///
    /// When `expected` is present the output length must equal it, except
    /// that SPB images may differ by up to [`SPB_SIZE_SLACK`] bytes. For
    /// LZSS it also bounds the output; without it LZSS decodes until the
    /// input runs out.
    pub fn decompress(
        &self,
        compression: Compression,
        input: &[u8],
        expected: Option<u32>,
    ) -> Result<Vec<u8>, DecodeError> {
        let failed = |source| DecodeError::Codec {
            codec: compression,
            source,
        };

        let output = match compression {
            Compression::None => input.to_vec(),
            Compression::Spb => {
                let image = self.spb.decode(input).map_err(failed)?;
                bmp::encode(&image)
            }
            Compression::Lzss => {
                let expected_len = expected.map_or(usize::MAX, |n| n as usize);
                self.lzss.decode(input, expected_len).map_err(failed)?
            }
            Compression::Nbz => self.nbz.decode(input).map_err(failed)?,
        };

        if let Some(declared) = expected {
            let slack = match compression {
                Compression::Spb => SPB_SIZE_SLACK,
                Compression::None | Compression::Lzss | Compression::Nbz => 0,
            };
            let diff = (declared as usize).abs_diff(output.len());
            if diff > slack {
                return Err(DecodeError::SizeMismatch {
                    declared,
                    actual: output.len(),
                });
            }
            if diff > 0 {
                warn!(
                    "{} output is {} bytes, declared {}; within tolerance",
                    compression,
                    output.len(),
                    declared
                );
            }
        }

        Ok(output)
    }
}
