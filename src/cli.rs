//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{ArgGroup, Parser};

/// Download serialized chapters and assemble each into a PDF.
///
/// Pass a series URL to download every chapter, or a chapter URL to download
/// just that one. Files land under `<output-dir>/<series>/Images` and
/// `<output-dir>/<series>/Chapters`.
#[derive(Parser, Debug)]
#[command(name = "omegadl")]
#[command(author, version, about)]
#[command(group(ArgGroup::new("source").required(true).args(["series_url", "chapter_url"])))]
pub struct Args {
    /// Series page URL; every listed chapter is downloaded
    #[arg(short = 's', long)]
    pub series_url: Option<String>,

    /// Single chapter page URL
    #[arg(short = 'c', long)]
    pub chapter_url: Option<String>,

    /// Series directory name (derived from the URL when omitted)
    #[arg(long)]
    pub series_name: Option<String>,

    /// Chapter designation for --chapter-url (parsed from the URL when omitted)
    #[arg(long, requires = "chapter_url")]
    pub chapter_num: Option<String>,

    /// Re-download pages and rebuild documents that already exist
    #[arg(short = 'f', long)]
    pub force: bool,

    /// Concurrent page downloads per chapter (1-100) [default: 6]
    #[arg(short = 'w', long, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub workers: Option<u8>,

    /// Retries after a transient failure (0-10) [default: 3]
    #[arg(short = 'r', long, value_parser = clap::value_parser!(u8).range(0..=10))]
    pub max_retries: Option<u8>,

    /// Output root directory [default: .]
    #[arg(short = 'o', long)]
    pub output_dir: Option<PathBuf>,

    /// Increase output verbosity (-v adds the per-page report and debug logs, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Config file path [default: $XDG_CONFIG_HOME/omegadl/config.toml]
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}
