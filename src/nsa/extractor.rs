use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use log::debug;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::codec::Codecs;

use super::archive::Archive;
use super::error::ExtractError;
use super::structures::DirectoryEntry;

/// NSA entry extractor.
///
/// Cheap to clone; clones share the archive, the byte source and the
/// decoders, so entries can be extracted from many threads at once.
#[derive(Clone)]
pub struct Extractor {
    archive: Arc<Archive>,
    source: Arc<[u8]>,
    codecs: Arc<Codecs>,
}

impl Extractor {
    /// Extract from the archive's own buffer with the built-in decoders.
    pub fn new(archive: Arc<Archive>) -> Self {
        let source = archive.data().clone();
        Self {
            archive,
            source,
            codecs: Arc::new(Codecs::default()),
        }
    }

    pub fn with_codecs(mut self, codecs: Codecs) -> Self {
        self.codecs = Arc::new(codecs);
        self
    }

    /// Read entry data from `source` instead of the buffer the archive was
    /// parsed from. Every extraction re-checks entry bounds against it.
    pub fn with_source(mut self, source: impl Into<Arc<[u8]>>) -> Self {
        self.source = source.into();
        self
    }

    pub fn archive(&self) -> &Archive {
        &self.archive
    }

    /// List all entries in directory order.
    pub fn list_files(&self) -> &[DirectoryEntry] {
        self.archive.entries()
    }

    /// Borrow the entry's stored (still compressed) bytes.
    pub fn stored_bytes(&self, entry: &DirectoryEntry) -> Result<&[u8], ExtractError> {
        stored_slice(&self.source, self.archive.header().data_base_offset, entry)
    }

    /// Extract and decompress an entry into memory.
    pub fn extract_to_memory(&self, entry: &DirectoryEntry) -> Result<Vec<u8>, ExtractError> {
        let stored = self.stored_bytes(entry)?;
        decode_entry(&self.codecs, entry, stored)
    }

    /// Extract the first entry named `name`.
    pub fn extract_by_name(&self, name: &str) -> Result<Vec<u8>, ExtractError> {
        let entry = self.archive.find(name)?;
        self.extract_to_memory(entry)
    }

    /// Decompress on the blocking pool so large images do not stall the
    /// async runtime.
    async fn extract_blocking(&self, entry: &DirectoryEntry) -> Result<Vec<u8>> {
        let this = self.clone();
        let entry = entry.clone();
        Ok(tokio::task::spawn_blocking(move || this.extract_to_memory(&entry)).await??)
    }

    /// Extract file to disk, returning the number of bytes written
    pub async fn extract_to_file(
        &self,
        entry: &DirectoryEntry,
        output_path: &Path,
    ) -> Result<usize> {
        let data = self.extract_blocking(entry).await?;
        write_file(output_path, &data).await?;
        Ok(data.len())
    }

    /// Write the stored bytes to disk without decompressing them
    pub async fn copy_to_file(&self, entry: &DirectoryEntry, output_path: &Path) -> Result<usize> {
        let data = self.stored_bytes(entry)?;
        write_file(output_path, data).await?;
        Ok(data.len())
    }

    /// Extract file to stdout
    pub async fn extract_to_stdout(&self, entry: &DirectoryEntry) -> Result<()> {
        let data = self.extract_blocking(entry).await?;

        let mut stdout = tokio::io::stdout();
        stdout.write_all(&data).await?;
        stdout.flush().await?;

        Ok(())
    }
}

/// Extract one entry from the archive's own buffer with the built-in
/// decoders.
pub fn extract(archive: &Archive, entry: &DirectoryEntry) -> Result<Vec<u8>, ExtractError> {
    let stored = stored_slice(archive.data(), archive.header().data_base_offset, entry)?;
    decode_entry(&Codecs::default(), entry, stored)
}

/// Slice an entry's region out of `source`, checking it still fits.
fn stored_slice<'a>(
    source: &'a [u8],
    data_base_offset: u32,
    entry: &DirectoryEntry,
) -> Result<&'a [u8], ExtractError> {
    let (start, end) = entry.span(data_base_offset);
    if end > source.len() as u64 {
        return Err(ExtractError::OutOfBounds {
            index: entry.index,
            name: entry.file_name.clone(),
            end,
            len: source.len(),
        });
    }
    Ok(&source[start as usize..end as usize])
}

fn decode_entry(
    codecs: &Codecs,
    entry: &DirectoryEntry,
    stored: &[u8],
) -> Result<Vec<u8>, ExtractError> {
    let data = codecs
        .decompress(entry.compression, stored, entry.expanded_size)
        .map_err(|e| ExtractError::from_decode(entry.index, &entry.file_name, e))?;
    debug!(
        "extracted #{} {} ({}): {} -> {} bytes",
        entry.index,
        entry.file_name,
        entry.compression,
        stored.len(),
        data.len()
    );
    Ok(data)
}

async fn write_file(output_path: &Path, data: &[u8]) -> Result<()> {
    // Create parent directories if needed
    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }

    let mut file = fs::File::create(output_path).await?;
    file.write_all(data).await?;
    file.flush().await?;

    Ok(())
}
