use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::codec::{PlaneOrder, ScanOrder, SpbOptions};
use crate::nsa::{PadMode, ParseOptions};

#[derive(Parser, Debug)]
#[command(name = "runsa")]
#[command(version)]
#[command(about = "Extract files from NScripter .nsa archives", long_about = None)]
#[command(after_help = "Examples:\n  \
  runsa game/                    extract every volume found in game/ into arc/\n  \
  runsa -l arc.nsa               list the files in arc.nsa\n  \
  runsa arc.nsa '*.txt' -d out   extract only the text files into out/\n  \
  runsa -p arc.nsa 0.txt | more  send the script to more")]
pub struct Cli {
    /// Archive file, or a directory holding arc.nsa / arc0.nsa ...
    #[arg(value_name = "INPUT", default_value = ".")]
    pub input: PathBuf,

    /// Files to extract (default: all)
    #[arg(value_name = "FILES")]
    pub files: Vec<String>,

    /// List files (short format)
    #[arg(short = 'l')]
    pub list: bool,

    /// List verbosely with flags, offsets and sizes
    #[arg(short = 'v')]
    pub verbose: bool,

    /// Extract files to pipe, no messages
    #[arg(short = 'p')]
    pub pipe: bool,

    /// Extract files into exdir
    #[arg(short = 'd', value_name = "DIR", default_value = "arc")]
    pub extract_dir: PathBuf,

    /// Exclude files that follow
    #[arg(short = 'x', value_name = "FILE", num_args = 1..)]
    pub exclude: Vec<String>,

    /// Never overwrite existing files
    #[arg(short = 'n')]
    pub never_overwrite: bool,

    /// Overwrite files WITHOUT prompting
    #[arg(short = 'o')]
    pub overwrite: bool,

    /// Junk paths (do not make directories)
    #[arg(short = 'j')]
    pub junk_paths: bool,

    /// Quiet mode (-qq => quieter)
    #[arg(short = 'q', action = clap::ArgAction::Count)]
    pub quiet: u8,

    /// Whether a pad byte precedes the entry count
    #[arg(long, value_enum, default_value_t = PadArg::Auto)]
    pub pad: PadArg,

    /// Read the next u16 as the entry count when the first one is zero
    #[arg(long)]
    pub count_fallback: bool,

    /// Highest numbered volume to look for (arc0.nsa .. arc{N-1}.nsa)
    #[arg(long, value_name = "N", default_value_t = 100)]
    pub max_volumes: usize,

    /// Process only the entry at this directory index
    #[arg(long, value_name = "N")]
    pub only_index: Option<usize>,

    /// Log the first N stored bytes of each processed entry
    #[arg(long, value_name = "N")]
    pub hexdump: Option<usize>,

    /// Write stored bytes without decompressing them
    #[arg(long)]
    pub raw: bool,

    /// Keep the stored bytes of entries that fail to extract in this directory
    #[arg(long, value_name = "DIR")]
    pub save_skips_dir: Option<PathBuf>,

    /// Pixel scan order for SPB images
    #[arg(long, value_enum, default_value_t = ScanArg::Zigzag)]
    pub spb_scan: ScanArg,

    /// Channel order of SPB planes
    #[arg(long, value_enum, default_value_t = PlaneArg::Bgr)]
    pub spb_plane: PlaneArg,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PadArg {
    Auto,
    Present,
    Absent,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanArg {
    Zigzag,
    Linear,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaneArg {
    Bgr,
    Rgb,
}

impl Cli {
    pub fn is_quiet(&self) -> bool {
        self.quiet > 0 || self.pipe
    }

    pub fn is_very_quiet(&self) -> bool {
        self.quiet > 1
    }

    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            pad: match self.pad {
                PadArg::Auto => PadMode::Auto,
                PadArg::Present => PadMode::Present,
                PadArg::Absent => PadMode::Absent,
            },
            count_fallback: self.count_fallback,
        }
    }

    pub fn spb_options(&self) -> SpbOptions {
        SpbOptions {
            scan: match self.spb_scan {
                ScanArg::Zigzag => ScanOrder::Zigzag,
                ScanArg::Linear => ScanOrder::Linear,
            },
            planes: match self.spb_plane {
                PlaneArg::Bgr => PlaneOrder::Bgr,
                PlaneArg::Rgb => PlaneOrder::Rgb,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cli = Cli::try_parse_from(["runsa"]).unwrap();
        assert_eq!(cli.input, PathBuf::from("."));
        assert_eq!(cli.extract_dir, PathBuf::from("arc"));
        assert_eq!(cli.max_volumes, 100);
        assert_eq!(cli.parse_options().pad, PadMode::Auto);
        assert!(!cli.parse_options().count_fallback);
        assert_eq!(cli.spb_options().scan, ScanOrder::Zigzag);
        assert_eq!(cli.spb_options().planes, PlaneOrder::Bgr);
        assert!(!cli.is_quiet());
    }

    #[test]
    fn options_map_onto_library_types() {
        let cli = Cli::try_parse_from([
            "runsa",
            "arc.nsa",
            "*.txt",
            "--pad",
            "absent",
            "--count-fallback",
            "--spb-scan",
            "linear",
            "--spb-plane",
            "rgb",
            "--only-index",
            "3",
            "-qq",
        ])
        .unwrap();
        assert_eq!(cli.files, ["*.txt"]);
        assert_eq!(cli.parse_options().pad, PadMode::Absent);
        assert!(cli.parse_options().count_fallback);
        assert_eq!(cli.spb_options().scan, ScanOrder::Linear);
        assert_eq!(cli.spb_options().planes, PlaneOrder::Rgb);
        assert_eq!(cli.only_index, Some(3));
        assert!(cli.is_very_quiet());
    }

    #[test]
    fn pipe_implies_quiet() {
        let cli = Cli::try_parse_from(["runsa", "-p", "arc.nsa"]).unwrap();
        assert!(cli.is_quiet());
    }
}
