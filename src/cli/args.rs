use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "archsynth")]
#[command(
    about = "Synthesizes a target architecture from gathered migration analysis",
    long_about = None
)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build module recommendations and a migration order from analysis facts
    Synthesize {
        /// Directory holding the upstream analysis documents
        output_root: PathBuf,

        /// Increase verbosity level (can be repeated: -v, -vv, -vvv)
        /// -v: Stage progress
        /// -vv: Clustering and correlation detail
        /// -vvv: Everything
        #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
        verbosity: u8,

        /// Configuration file (defaults to .archsynth.toml in the output root)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Which report files to write
        #[arg(short, long, value_enum, default_value = "all")]
        format: OutputFormat,

        /// Directory for the report files (defaults to <OUTPUT_ROOT>/analysis)
        #[arg(long = "output-dir")]
        output_dir: Option<PathBuf>,

        /// Disable colored console output
        #[arg(long)]
        plain: bool,
    },

    /// Write a default .archsynth.toml in the current directory
    Init {
        /// Overwrite an existing configuration file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum OutputFormat {
    Json,
    Markdown,
    All,
}

impl OutputFormat {
    pub fn writes_json(self) -> bool {
        matches!(self, Self::Json | Self::All)
    }

    pub fn writes_markdown(self) -> bool {
        matches!(self, Self::Markdown | Self::All)
    }
}
