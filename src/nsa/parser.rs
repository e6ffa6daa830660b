//! Low-level NSA archive parser.
//!
//! This module decodes the header and walks the directory of an archive
//! that is already resident in memory.
//!
//! ## Parsing Strategy
//!
//! NSA archives are read front to back:
//! 1. Decide whether a pad byte precedes the header (see [`PadMode`])
//! 2. Read the entry count and the absolute offset of the data block
//! 3. Read `object_count` variable-length directory records, validating
//!    each record's flag and data range as soon as it is read
//!
//! Nothing is decompressed here; see [`Extractor`](super::Extractor).

use encoding_rs::SHIFT_JIS;
use log::{debug, warn};

use super::cursor::ByteCursor;
use super::error::ParseError;
use super::structures::*;

/// Parser over a complete archive buffer.
///
/// Typically used through [`Archive::parse_with`](super::Archive::parse_with)
/// rather than directly.
pub struct NsaParser<'a> {
    data: &'a [u8],
    options: ParseOptions,
}

impl<'a> NsaParser<'a> {
    pub fn new(data: &'a [u8], options: ParseOptions) -> Self {
        Self { data, options }
    }

    /// Parse the header, resolving the pad byte according to the options.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::TruncatedInput`] if the buffer cannot hold a
    /// header at all, and [`ParseError::InvalidHeader`] if the data block
    /// would start past the end of the buffer.
    pub fn parse_header(&self) -> Result<ArchiveHeader, ParseError> {
        let header = match self.options.pad {
            PadMode::Present => self.read_header(true)?,
            PadMode::Absent => self.read_header(false)?,
            PadMode::Auto => self.detect_layout()?,
        };

        if header.data_base_offset as u64 > self.data.len() as u64 {
            return Err(ParseError::InvalidHeader(format!(
                "data block offset {} lies past the archive end at {}",
                header.data_base_offset,
                self.data.len()
            )));
        }

        debug!(
            "header: objects={} base=0x{:08X} pad={}",
            header.object_count, header.data_base_offset, header.pad_present
        );
        Ok(header)
    }

    /// Choose between the padded and unpadded readings of the header.
    ///
    /// A reading is plausible when its whole directory parses and ends at
    /// or before its data block. The padded reading wins unless only the
    /// unpadded one ends exactly where its data block starts. When neither
    /// is plausible the unpadded header is returned so that directory
    /// parsing reports the real fault.
    fn detect_layout(&self) -> Result<ArchiveHeader, ParseError> {
        let candidate = |pad_present| {
            let header = self.read_header(pad_present).ok()?;
            let end = self.plausible_directory_end(&header)?;
            Some((header, end == header.data_base_offset as usize))
        };

        let header = match (candidate(true), candidate(false)) {
            (Some((_, false)), Some((plain, true))) => plain,
            (Some((padded, _)), _) => {
                debug!("pad byte detected before the entry count");
                padded
            }
            (None, Some((plain, _))) => plain,
            (None, None) => self.read_header(false)?,
        };
        Ok(header)
    }

    /// Read the header fields assuming the given layout.
    fn read_header(&self, pad_present: bool) -> Result<ArchiveHeader, ParseError> {
        let mut cursor = ByteCursor::at(self.data, pad_present as usize);

        let mut object_count = cursor.read_u16()?;
        if self.options.count_fallback && object_count == 0 {
            object_count = cursor.read_u16()?;
        }
        let data_base_offset = cursor.read_u32()?;

        Ok(ArchiveHeader {
            pad_present,
            object_count,
            data_base_offset,
            directory_offset: cursor.position(),
        })
    }

    /// Where the directory of `header` ends, if it parses completely and
    /// stays clear of the data block.
    fn plausible_directory_end(&self, header: &ArchiveHeader) -> Option<usize> {
        let base = header.data_base_offset as u64;
        let directory_min =
            header.directory_offset as u64 + header.object_count as u64 * MIN_ENTRY_SIZE as u64;
        if base == 0 || base > self.data.len() as u64 || base < directory_min {
            return None;
        }

        let (_, end) = self.walk_directory(header).ok()?;
        (end as u64 <= base).then_some(end)
    }

    /// Read every directory record that follows `header`.
    ///
    /// # Errors
    ///
    /// Cursor failures propagate as [`ParseError::TruncatedInput`] or
    /// [`ParseError::UnterminatedString`]. An unknown compression flag is
    /// [`ParseError::InvalidDirectory`], and a record whose data range ends
    /// past the buffer is [`ParseError::EntryOutOfBounds`].
    pub fn parse_directory(
        &self,
        header: &ArchiveHeader,
    ) -> Result<Vec<DirectoryEntry>, ParseError> {
        let (entries, end) = self.walk_directory(header)?;

        for entry in &entries {
            if entry.file_name.contains(char::REPLACEMENT_CHARACTER) {
                warn!("entry #{} name {:?} is not valid Shift-JIS", entry.index, entry.file_name);
            }
            debug!(
                "  #{:04} {} flag={} off=0x{:08X} stored=0x{:08X} expanded={:?}",
                entry.index,
                entry.file_name,
                entry.compression.as_flag(),
                entry.rel_offset,
                entry.stored_size,
                entry.expanded_size
            );
        }

        if end as u64 > header.data_base_offset as u64 {
            warn!(
                "directory ends at {} but the data block starts at {}",
                end, header.data_base_offset
            );
        }

        Ok(entries)
    }

    /// Parse all records, returning them with the offset just past the last.
    fn walk_directory(
        &self,
        header: &ArchiveHeader,
    ) -> Result<(Vec<DirectoryEntry>, usize), ParseError> {
        let mut cursor = ByteCursor::at(self.data, header.directory_offset);
        let mut entries = Vec::with_capacity(header.object_count as usize);

        for index in 0..header.object_count as usize {
            entries.push(self.parse_entry(&mut cursor, header, index)?);
        }

        Ok((entries, cursor.position()))
    }

    fn parse_entry(
        &self,
        cursor: &mut ByteCursor<'a>,
        header: &ArchiveHeader,
        index: usize,
    ) -> Result<DirectoryEntry, ParseError> {
        let file_name = decode_name(cursor.read_cstr()?);

        let flag = cursor.read_u8()?;
        let compression =
            Compression::from_flag(flag).ok_or_else(|| ParseError::InvalidDirectory {
                index,
                name: file_name.clone(),
                reason: format!("unknown compression flag {flag}"),
            })?;

        let rel_offset = cursor.read_u32()?;
        let stored_size = cursor.read_u32()?;
        let raw_expanded = cursor.read_u32()?;
        let expanded_size = if raw_expanded == 0 && compression.zero_size_is_undeclared() {
            None
        } else {
            Some(raw_expanded)
        };

        let entry = DirectoryEntry {
            index,
            file_name,
            compression,
            rel_offset,
            stored_size,
            expanded_size,
        };

        let (_, end) = entry.span(header.data_base_offset);
        if end > self.data.len() as u64 {
            return Err(ParseError::EntryOutOfBounds {
                index,
                name: entry.file_name,
                end,
                len: self.data.len(),
            });
        }

        Ok(entry)
    }
}

/// Decode a stored name. Names are Shift-JIS, of which ASCII is a subset;
/// invalid sequences become U+FFFD.
fn decode_name(raw: &[u8]) -> String {
    let (name, _, _) = SHIFT_JIS.decode(raw);
    name.into_owned()
}
