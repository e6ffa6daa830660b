use std::fmt;
use std::path::PathBuf;

/// Size of the unpadded header: `u16` count + `u32` data offset.
pub const HEADER_SIZE: usize = 6;

/// Smallest possible directory record: empty name terminator, flag and
/// three `u32` fields.
pub const MIN_ENTRY_SIZE: usize = 1 + 1 + 4 + 4 + 4;

/// Conventional file name of the primary archive volume.
pub const PRIMARY_VOLUME: &str = "arc.nsa";

/// How each entry's stored bytes are encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Compression {
    /// Stored verbatim.
    None,
    /// Delta/run-coded image decoded to a 24-bit bitmap.
    Spb,
    /// 256-byte sliding window dictionary coding.
    Lzss,
    /// bzip2-compressed audio.
    Nbz,
}

impl Compression {
    /// Map a directory flag byte to a compression kind.
    ///
    /// Returns [`None`] for flags the format does not define.
    pub fn from_flag(flag: u8) -> Option<Self> {
        match flag {
            0 => Some(Compression::None),
            1 => Some(Compression::Spb),
            2 => Some(Compression::Lzss),
            4 => Some(Compression::Nbz),
            _ => None,
        }
    }

    pub fn as_flag(&self) -> u8 {
        match self {
            Compression::None => 0,
            Compression::Spb => 1,
            Compression::Lzss => 2,
            Compression::Nbz => 4,
        }
    }

    /// Whether a raw expanded size of `0` means "not declared".
    pub fn zero_size_is_undeclared(&self) -> bool {
        !matches!(self, Compression::Lzss)
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Compression::None => "none",
            Compression::Spb => "spb",
            Compression::Lzss => "lzss",
            Compression::Nbz => "nbz",
        };
        f.write_str(name)
    }
}

/// Whether a pad byte precedes the entry count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PadMode {
    /// Prefer the padded layout when it yields a consistent header.
    #[default]
    Auto,
    /// Always skip one leading byte.
    Present,
    /// Never skip; the count is at offset 0.
    Absent,
}

/// Options controlling how an archive header is interpreted.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParseOptions {
    pub pad: PadMode,
    /// When the first count read is zero, read the following `u16` as the
    /// count instead.
    pub count_fallback: bool,
}

/// Parsed archive header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveHeader {
    pub pad_present: bool,
    pub object_count: u16,
    /// Absolute offset of the data block.
    pub data_base_offset: u32,
    /// Offset of the first directory record.
    pub directory_offset: usize,
}

/// One record of the archive directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    /// Position in directory order.
    pub index: usize,
    /// Name as stored, with `\` separators left untouched.
    pub file_name: String,
    pub compression: Compression,
    /// Offset of the stored bytes relative to the data block.
    pub rel_offset: u32,
    pub stored_size: u32,
    /// Declared decompressed length, if the archive states one.
    pub expanded_size: Option<u32>,
}

impl DirectoryEntry {
    /// Absolute `[start, end)` range of the stored bytes.
    ///
    /// Computed in 64 bits so that it cannot overflow.
    pub fn span(&self, data_base_offset: u32) -> (u64, u64) {
        let start = data_base_offset as u64 + self.rel_offset as u64;
        (start, start + self.stored_size as u64)
    }

    /// The entry name as a relative path for the host filesystem.
    ///
    /// Both `\` and `/` are treated as separators. Empty, `.` and `..`
    /// components are dropped so the result never escapes its root.
    pub fn host_path(&self) -> PathBuf {
        self.file_name
            .split(['\\', '/'])
            .filter(|c| !c.is_empty() && *c != "." && *c != "..")
            .collect()
    }

    /// Whether this entry answers to `name`, treating `\` and `/` alike.
    pub fn matches_name(&self, name: &str) -> bool {
        self.file_name.len() == name.len()
            && self
                .file_name
                .chars()
                .zip(name.chars())
                .all(|(a, b)| a == b || (is_separator(a) && is_separator(b)))
    }

    /// Lower-cased extension of the file name, without the dot.
    pub fn extension(&self) -> Option<String> {
        self.host_path()
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
    }
}

fn is_separator(c: char) -> bool {
    c == '\\' || c == '/'
}
