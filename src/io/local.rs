use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use log::debug;
use tokio::fs;

use crate::nsa::{Archive, PRIMARY_VOLUME, ParseOptions};

/// A parsed archive loaded from a local file
pub struct Volume {
    pub path: PathBuf,
    pub archive: Arc<Archive>,
}

impl Volume {
    /// Read the whole file into memory and parse it.
    pub async fn open(path: &Path, options: &ParseOptions) -> Result<Self> {
        let data = fs::read(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        let size = data.len();
        let archive = Archive::parse_with(data, options)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        debug!(
            "loaded {} ({} bytes, {} entries)",
            path.display(),
            size,
            archive.len()
        );

        Ok(Self {
            path: path.to_path_buf(),
            archive: Arc::new(archive),
        })
    }

    /// File name of the volume, for messages.
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Resolve the volumes to process.
///
/// A file is used as-is. A directory is searched for `arc.nsa` followed by
/// the numbered volumes `arc0.nsa` .. `arc{max_volumes - 1}.nsa`, in that
/// order.
pub async fn discover_volumes(input: &Path, max_volumes: usize) -> Result<Vec<PathBuf>> {
    let meta = fs::metadata(input)
        .await
        .with_context(|| format!("cannot access {}", input.display()))?;
    if meta.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }

    let candidates = std::iter::once(PathBuf::from(PRIMARY_VOLUME))
        .chain((0..max_volumes).map(|n| PathBuf::from(format!("arc{n}.nsa"))));

    let mut volumes = Vec::new();
    for name in candidates {
        let path = input.join(name);
        if fs::try_exists(&path).await? {
            volumes.push(path);
        }
    }

    if volumes.is_empty() {
        bail!(
            "no NSA volumes found in {} (expected {} or arc0.nsa, ...)",
            input.display(),
            PRIMARY_VOLUME
        );
    }
    Ok(volumes)
}
