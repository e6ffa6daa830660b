//! # runsa
//!
//! A reader for NScripter `.nsa` archives.
//!
//! An `.nsa` file packs many named game assets (images, audio, scripts)
//! into one blob: a small big-endian header, a variable-length directory
//! and a single shared data block. This library parses the directory
//! from an in-memory buffer, validates every entry against the data
//! block and extracts entries on demand, decoding the SPB, LZSS and NBZ
//! compression kinds.
//!
//! ## Features
//!
//! - Pad-byte detection for the two header layouts found in the wild
//! - Shift-JIS file names
//! - Built-in SPB (to BMP), LZSS and NBZ (bzip2) decoders, replaceable
//!   through the [`codec`] traits
//! - Lock-free parallel extraction from a shared [`Archive`]
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use runsa::{Archive, Extractor};
//!
//! fn main() -> anyhow::Result<()> {
//!     let data = std::fs::read("arc.nsa")?;
//!     let archive = Arc::new(Archive::parse(data)?);
//!
//!     let extractor = Extractor::new(archive);
//!     for entry in extractor.list_files() {
//!         println!("{} ({})", entry.file_name, entry.compression);
//!     }
//!
//!     let script = extractor.extract_by_name("0.txt")?;
//!     println!("{} bytes", script.len());
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod codec;
pub mod io;
pub mod nsa;

pub use cli::Cli;
pub use codec::{CodecError, Codecs, DecodeError, DecodedImage, PlaneOrder, ScanOrder, SpbOptions};
pub use io::{Volume, discover_volumes};
pub use nsa::{
    Archive, ArchiveHeader, Compression, DirectoryEntry, ExtractError, Extractor, NotFound,
    PadMode, ParseError, ParseOptions, extract, parse,
};
