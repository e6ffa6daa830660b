//! Main entry point for the runsa CLI application.
//!
//! This binary lists and extracts the contents of NScripter `.nsa`
//! archives, either a single file or every volume found in a game
//! directory.

use anyhow::{Result, bail};
use clap::Parser;
use env_logger::Env;
use log::{error, info};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::task::JoinSet;

use runsa::{
    Cli, Codecs, Compression, DirectoryEntry, ExtractError, Extractor, Volume, discover_volumes,
};

/// Application entry point.
///
/// Parses command-line arguments, resolves the volumes to read and runs
/// list or extract mode over each of them in turn.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.hexdump.is_some() { "info" } else { "warn" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter)).init();

    let failed = run(&cli).await?;
    if failed > 0 {
        bail!("{} entries or volumes failed", failed);
    }
    Ok(())
}

/// Process every volume in turn.
///
/// A volume that cannot be read or parsed is reported and skipped. Returns
/// the number of failed volumes and entries.
async fn run(cli: &Cli) -> Result<usize> {
    let volumes = discover_volumes(&cli.input, cli.max_volumes).await?;
    let options = cli.parse_options();

    let mut failed = 0usize;
    for path in &volumes {
        let volume = match Volume::open(path, &options).await {
            Ok(volume) => volume,
            Err(e) => {
                eprintln!("{}: {:#}", path.display(), e);
                failed += 1;
                continue;
            }
        };
        if volumes.len() > 1 && !cli.is_quiet() {
            println!("Archive: {}", volume.path.display());
        }
        match process_volume(&volume, cli).await {
            Ok(n) => failed += n,
            Err(e) => {
                eprintln!("{}: {:#}", volume.name(), e);
                failed += 1;
            }
        }
    }

    Ok(failed)
}

/// Process one archive volume based on CLI options.
///
/// Returns the number of entries that failed to extract.
async fn process_volume(volume: &Volume, cli: &Cli) -> Result<usize> {
    let extractor = Extractor::new(volume.archive.clone())
        .with_codecs(Codecs::new(cli.spb_options()));

    let selected: Vec<DirectoryEntry> = extractor
        .list_files()
        .iter()
        .filter(|e| is_selected(e, cli))
        .cloned()
        .collect();

    if let Some(n) = cli.hexdump {
        for entry in &selected {
            let stored = extractor.stored_bytes(entry)?;
            info!(
                "#{} {}: {}",
                entry.index,
                entry.file_name,
                hex_preview(&stored[..stored.len().min(n)])
            );
        }
    }

    // List mode: display archive contents and return
    if cli.list || cli.verbose {
        list_files(&extractor, &selected, cli.verbose);
        return Ok(0);
    }

    if cli.pipe {
        return pipe_files(&extractor, &selected).await;
    }

    extract_files(&extractor, selected, cli).await
}

/// Decide whether an entry takes part in this run.
///
/// Positional names match the full archive path or the base name exactly;
/// names with wildcards are glob matched against the full path. Both
/// separators are accepted in patterns.
fn is_selected(entry: &DirectoryEntry, cli: &Cli) -> bool {
    if cli.only_index.is_some_and(|i| i != entry.index) {
        return false;
    }

    let name = normalize_separators(&entry.file_name);
    let basename = name.rsplit('/').next().unwrap_or(name.as_str());

    if !cli.files.is_empty() {
        let matches = cli.files.iter().any(|f| {
            let f = normalize_separators(f);
            if has_glob_chars(&f) {
                glob_match(&f, &name)
            } else {
                name == f || basename == f
            }
        });
        if !matches {
            return false;
        }
    }

    !cli.exclude.iter().any(|x| {
        let x = normalize_separators(x);
        name.contains(&x) || glob_match(&x, &name)
    })
}

/// List files in the archive.
///
/// The verbose format shows the compression kind, absolute data offset
/// and both sizes, followed by a totals line.
fn list_files(extractor: &Extractor, entries: &[DirectoryEntry], verbose: bool) {
    if !verbose {
        for entry in entries {
            println!("{}", entry.file_name);
        }
        return;
    }

    let base = extractor.archive().header().data_base_offset;
    println!(
        "{:>5}  {:>4}  {:>10}  {:>10}  {:>10}  Name",
        "Index", "Kind", "Offset", "Stored", "Expanded"
    );
    println!("{}", "-".repeat(70));

    let mut total_stored = 0u64;
    let mut total_expanded = 0u64;
    for entry in entries {
        let (offset, _) = entry.span(base);
        let expanded = match entry.expanded_size {
            Some(size) => {
                total_expanded += u64::from(size);
                size.to_string()
            }
            None => "-".to_string(),
        };
        total_stored += u64::from(entry.stored_size);
        println!(
            "{:>5}  {:>4}  {:>10}  {:>10}  {:>10}  {}",
            entry.index,
            entry.compression,
            offset,
            entry.stored_size,
            expanded,
            entry.file_name
        );
    }

    println!("{}", "-".repeat(70));
    println!(
        "{:>5}  {:>4}  {:>10}  {:>10}  {:>10}  {} files ({} stored)",
        "",
        "",
        "",
        total_stored,
        total_expanded,
        entries.len(),
        format_size(total_stored)
    );
}

/// Write each entry to stdout in directory order.
///
/// A marker line precedes each file when more than one is selected.
async fn pipe_files(extractor: &Extractor, entries: &[DirectoryEntry]) -> Result<usize> {
    use tokio::io::AsyncWriteExt;

    let mut failed = 0;
    for entry in entries {
        if entries.len() > 1 {
            let mut stdout = tokio::io::stdout();
            stdout
                .write_all(format!("--- {} ---\n", entry.file_name).as_bytes())
                .await?;
        }
        if let Err(e) = extractor.extract_to_stdout(entry).await {
            error!("{}: {:#}", entry.file_name, e);
            failed += 1;
        }
    }
    Ok(failed)
}

/// Extract the selected entries in parallel.
///
/// Existing files are skipped unless `-o` is given. A failure is reported
/// and counted but does not stop the other entries; with
/// `--save-skips-dir` the failed entry's stored bytes are kept.
async fn extract_files(
    extractor: &Extractor,
    entries: Vec<DirectoryEntry>,
    cli: &Cli,
) -> Result<usize> {
    let mut tasks = JoinSet::new();

    for (entry, output_path) in plan_outputs(entries, cli) {
        // Handle existing files based on overwrite options
        if output_path.exists() {
            if cli.never_overwrite {
                if !cli.is_quiet() {
                    eprintln!("Skipping: {} (file exists)", entry.file_name);
                }
                continue;
            }
            if !cli.overwrite {
                if !cli.is_quiet() {
                    eprintln!("Skipping: {} (use -o to overwrite)", entry.file_name);
                }
                continue;
            }
        }

        let extractor = extractor.clone();
        let raw = cli.raw;
        tasks.spawn(async move {
            let written = if raw {
                extractor.copy_to_file(&entry, &output_path).await
            } else {
                extractor.extract_to_file(&entry, &output_path).await
            };
            (entry, output_path, written)
        });
    }

    let mut failed = 0;
    while let Some(joined) = tasks.join_next().await {
        let (entry, output_path, written) = joined?;
        match written {
            Ok(size) => {
                if !cli.is_quiet() {
                    println!(
                        "  extracting: {} -> {} ({})",
                        entry.file_name,
                        output_path.display(),
                        format_size(size as u64)
                    );
                }
            }
            Err(e) => {
                if !cli.is_very_quiet() {
                    eprintln!("  failed: {}: {:#}", entry.file_name, e);
                }
                failed += 1;

                let Some(dir) = cli.save_skips_dir.as_deref().filter(|_| !cli.raw) else {
                    continue;
                };
                let skip_path = skip_path(&entry, dir, &e);
                match extractor.copy_to_file(&entry, &skip_path).await {
                    Ok(_) => {
                        if !cli.is_quiet() {
                            eprintln!("  kept stored bytes: {}", skip_path.display());
                        }
                    }
                    Err(e) => eprintln!("  could not keep {}: {:#}", entry.file_name, e),
                }
            }
        }
    }

    Ok(failed)
}

/// Pair each entry with its output path.
///
/// Only the first entry in directory order is kept for each path, so
/// duplicate names extract the same entry that a name lookup returns.
fn plan_outputs(entries: Vec<DirectoryEntry>, cli: &Cli) -> Vec<(DirectoryEntry, PathBuf)> {
    let mut seen = HashSet::new();
    entries
        .into_iter()
        .filter_map(|entry| {
            let path = output_path(&entry, cli);
            if seen.insert(path.clone()) {
                return Some((entry, path));
            }
            if !cli.is_quiet() {
                eprintln!(
                    "Skipping: {} (#{} duplicates an earlier entry)",
                    entry.file_name, entry.index
                );
            }
            None
        })
        .collect()
}

/// Where the stored bytes of a failed entry are kept:
/// `<dir>/<parent>/<stem>.skip-<reason>.bin`.
fn skip_path(entry: &DirectoryEntry, dir: &Path, error: &anyhow::Error) -> PathBuf {
    let relative = entry.host_path();
    let stem = relative
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| format!("entry{}", entry.index));
    let name = format!("{}.skip-{}.bin", stem, skip_reason(error));
    dir.join(relative.with_file_name(name))
}

fn skip_reason(error: &anyhow::Error) -> String {
    match error.downcast_ref::<ExtractError>() {
        Some(ExtractError::SizeMismatch { .. }) => "size-mismatch".to_string(),
        Some(ExtractError::CodecFailure { codec, .. }) => format!("{}-error", codec),
        Some(ExtractError::OutOfBounds { .. }) => "out-of-bounds".to_string(),
        Some(ExtractError::NotFound(_)) => "not-found".to_string(),
        None => "io-error".to_string(),
    }
}

/// Where an entry is written on disk.
///
/// Decoded NBZ audio is a WAV file, so it gets a `.wav` extension.
fn output_path(entry: &DirectoryEntry, cli: &Cli) -> PathBuf {
    let relative = if cli.junk_paths {
        entry
            .host_path()
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| entry.host_path())
    } else {
        entry.host_path()
    };

    let mut path = cli.extract_dir.join(relative);
    if entry.compression == Compression::Nbz && !cli.raw {
        path.set_extension("wav");
    }
    path
}

fn normalize_separators(name: &str) -> String {
    name.replace('\\', "/")
}

/// Check if a pattern contains glob wildcard characters.
fn has_glob_chars(pattern: &str) -> bool {
    pattern.contains('*') || pattern.contains('?')
}

/// Simple glob pattern matching supporting `*` and `?` wildcards.
///
/// - `*` matches zero or more characters
/// - `?` matches exactly one character
fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern_chars: Vec<char> = pattern.chars().collect();
    let text_chars: Vec<char> = text.chars().collect();

    fn do_match(pattern: &[char], text: &[char]) -> bool {
        match (pattern.first(), text.first()) {
            (None, None) => true,
            (Some('*'), _) => {
                do_match(&pattern[1..], text) || (!text.is_empty() && do_match(pattern, &text[1..]))
            }
            (Some('?'), Some(_)) => do_match(&pattern[1..], &text[1..]),
            (Some(p), Some(t)) if *p == *t => do_match(&pattern[1..], &text[1..]),
            _ => false,
        }
    }

    do_match(&pattern_chars, &text_chars)
}

fn hex_preview(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Format a byte size into a human-readable string.
fn format_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{} bytes", size)
    }
}
