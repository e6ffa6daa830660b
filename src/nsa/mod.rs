//! NSA archive parsing and extraction.
//!
//! This module provides functionality for reading NScripter `.nsa`
//! archives that are already loaded into memory.
//!
//! ## Architecture
//!
//! The module is organized into these components:
//!
//! - [`cursor`]: Bounds-checked big-endian reads over the raw bytes
//! - [`structures`]: Header, directory entry and option types
//! - [`parser`]: Header and directory parsing
//! - [`archive`]: The validated, immutable [`Archive`]
//! - [`extractor`]: Entry extraction and decompression
//!
//! ## NSA Format Overview
//!
//! ```text
//! [optional 1-byte pad]
//! object_count          : u16 BE
//! data_base_offset      : u32 BE
//! repeat object_count times:
//!   file_name           : null-terminated, '\' separated
//!   compression_flag    : u8   (0=none, 1=SPB, 2=LZSS, 4=NBZ)
//!   rel_offset          : u32 BE
//!   stored_size         : u32 BE
//!   expanded_size       : u32 BE (0 = unknown for SPB/NBZ)
//! data block from data_base_offset to the end of the file
//! ```
//!
//! There is no magic number and nothing marks whether the pad byte is
//! present; see [`PadMode`].
//!
//! ## Limitations
//!
//! - No archive creation
//! - No streaming: the whole archive must be in memory
//! - Malformed archives are rejected, never repaired

pub mod archive;
pub mod cursor;
pub mod error;
pub mod extractor;
pub mod parser;
pub mod structures;

#[cfg(test)]
pub(crate) mod testutil;

pub use archive::{Archive, parse};
pub use error::{ExtractError, NotFound, ParseError};
pub use extractor::{Extractor, extract};
pub use parser::NsaParser;
pub use structures::*;
