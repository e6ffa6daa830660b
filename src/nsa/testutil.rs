//! Hand-assembled archives for unit tests.

struct PendingEntry {
    name: Vec<u8>,
    flag: u8,
    data: Option<Vec<u8>>,
    rel_offset: u32,
    stored_size: u32,
    expanded_size: u32,
}

/// Builds an archive buffer with a correct header and data block.
///
/// Entries added with [`entry`](Self::entry) get their data appended to the
/// data block in order; [`raw_entry`](Self::raw_entry) writes the directory
/// fields verbatim and appends nothing.
#[derive(Default)]
pub(crate) struct ArchiveBuilder {
    pad: bool,
    entries: Vec<PendingEntry>,
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn padded(mut self) -> Self {
        self.pad = true;
        self
    }

    pub fn entry(self, name: &str, flag: u8, data: &[u8], expanded_size: u32) -> Self {
        self.raw_name_entry(name.as_bytes(), flag, data, expanded_size)
    }

    pub fn raw_name_entry(
        mut self,
        name: &[u8],
        flag: u8,
        data: &[u8],
        expanded_size: u32,
    ) -> Self {
        self.entries.push(PendingEntry {
            name: name.to_vec(),
            flag,
            data: Some(data.to_vec()),
            rel_offset: 0,
            stored_size: data.len() as u32,
            expanded_size,
        });
        self
    }

    pub fn raw_entry(
        mut self,
        name: &str,
        flag: u8,
        rel_offset: u32,
        stored_size: u32,
        expanded_size: u32,
    ) -> Self {
        self.entries.push(PendingEntry {
            name: name.as_bytes().to_vec(),
            flag,
            data: None,
            rel_offset,
            stored_size,
            expanded_size,
        });
        self
    }

    pub fn build(self) -> Vec<u8> {
        let header_len = 6 + self.pad as usize;
        let directory_len: usize = self.entries.iter().map(|e| e.name.len() + 14).sum();
        let base = (header_len + directory_len) as u32;

        let mut out = Vec::new();
        if self.pad {
            out.push(0);
        }
        out.extend_from_slice(&(self.entries.len() as u16).to_be_bytes());
        out.extend_from_slice(&base.to_be_bytes());

        let mut block = Vec::new();
        for e in &self.entries {
            let rel_offset = match &e.data {
                Some(data) => {
                    let rel = block.len() as u32;
                    block.extend_from_slice(data);
                    rel
                }
                None => e.rel_offset,
            };
            out.extend_from_slice(&e.name);
            out.push(0);
            out.push(e.flag);
            out.extend_from_slice(&rel_offset.to_be_bytes());
            out.extend_from_slice(&e.stored_size.to_be_bytes());
            out.extend_from_slice(&e.expanded_size.to_be_bytes());
        }
        out.extend_from_slice(&block);
        out
    }
}
