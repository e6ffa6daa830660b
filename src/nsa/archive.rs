use std::sync::Arc;

use super::error::{NotFound, ParseError};
use super::parser::NsaParser;
use super::structures::{ArchiveHeader, DirectoryEntry, ParseOptions};

/// A fully validated NSA archive.
///
/// Built once by a single parse pass and immutable afterwards. The archive
/// shares its byte buffer read-only, so it can be wrapped in an [`Arc`] and
/// extracted from on many threads at once.
#[derive(Debug, Clone)]
pub struct Archive {
    header: ArchiveHeader,
    entries: Vec<DirectoryEntry>,
    data: Arc<[u8]>,
}

impl Archive {
    /// Parse `data` with default options (pad byte auto-detected).
    pub fn parse(data: impl Into<Arc<[u8]>>) -> Result<Self, ParseError> {
        Self::parse_with(data, &ParseOptions::default())
    }

    /// Parse `data` with explicit options.
    ///
    /// Either every invariant holds and an archive is returned, or nothing
    /// is constructed.
    pub fn parse_with(
        data: impl Into<Arc<[u8]>>,
        options: &ParseOptions,
    ) -> Result<Self, ParseError> {
        let data = data.into();
        let parser = NsaParser::new(&data, *options);
        let header = parser.parse_header()?;
        let entries = parser.parse_directory(&header)?;
        Self::from_parts(header, entries, data)
    }

    /// Check the joint invariants and assemble the archive.
    fn from_parts(
        header: ArchiveHeader,
        entries: Vec<DirectoryEntry>,
        data: Arc<[u8]>,
    ) -> Result<Self, ParseError> {
        if entries.len() != header.object_count as usize {
            return Err(ParseError::InvalidDirectory {
                index: entries.len(),
                name: String::new(),
                reason: format!(
                    "header declares {} entries but {} were read",
                    header.object_count,
                    entries.len()
                ),
            });
        }

        for entry in &entries {
            let (_, end) = entry.span(header.data_base_offset);
            if end > data.len() as u64 {
                return Err(ParseError::EntryOutOfBounds {
                    index: entry.index,
                    name: entry.file_name.clone(),
                    end,
                    len: data.len(),
                });
            }
        }

        Ok(Self {
            header,
            entries,
            data,
        })
    }

    pub fn header(&self) -> &ArchiveHeader {
        &self.header
    }

    /// All entries in directory order.
    pub fn entries(&self) -> &[DirectoryEntry] {
        &self.entries
    }

    pub fn entry(&self, index: usize) -> Option<&DirectoryEntry> {
        self.entries.get(index)
    }

    /// Find the first entry named `name`, in directory order.
    ///
    /// Archives may contain duplicate names; later duplicates are only
    /// reachable through [`find_all`](Self::find_all) or by index.
    pub fn find(&self, name: &str) -> Result<&DirectoryEntry, NotFound> {
        self.entries
            .iter()
            .find(|e| e.matches_name(name))
            .ok_or_else(|| NotFound(name.to_owned()))
    }

    /// Every entry named `name`, in directory order.
    pub fn find_all<'a, 'n>(
        &'a self,
        name: &'n str,
    ) -> impl Iterator<Item = &'a DirectoryEntry> + use<'a, 'n> {
        self.entries.iter().filter(move |e| e.matches_name(name))
    }

    /// The complete archive buffer.
    pub fn data(&self) -> &Arc<[u8]> {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Parse an archive with default options.
pub fn parse(data: impl Into<Arc<[u8]>>) -> Result<Archive, ParseError> {
    Archive::parse(data)
}
