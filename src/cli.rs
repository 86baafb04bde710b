use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "asfclip")]
#[command(
    author,
    version,
    about = "Seek into ASF files and extract a decoded audio clip or key frame"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Probe an ASF file and display its header information
    Probe {
        /// File to probe
        #[arg(required = true)]
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Resolve the data-region offset for a presentation time
    Seek {
        /// ASF file
        #[arg(required = true)]
        file: PathBuf,

        /// Stream number to seek in
        #[arg(short, long)]
        stream: u16,

        /// Presentation time in seconds
        #[arg(short, long)]
        time: f64,

        /// Resolve for reverse playback
        #[arg(long)]
        reverse: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Extract a decoded audio clip or video key frame at a presentation time
    Extract {
        /// ASF file
        #[arg(required = true)]
        file: PathBuf,

        /// Stream number to decode
        #[arg(short, long)]
        stream: u16,

        /// Presentation time in seconds
        #[arg(short, long)]
        time: f64,

        /// Scan backwards from the seek point
        #[arg(long)]
        reverse: bool,

        /// Decode with the passthrough transform regardless of config
        #[arg(long)]
        passthrough: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
