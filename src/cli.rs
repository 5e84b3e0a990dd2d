use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "pianoroll", about = "Terminal piano roll note editor")]
pub struct Cli {
    /// Editor config file (.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub grid: GridArgs,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Grid settings, overriding the config file.
#[derive(clap::Args, Debug, Default)]
pub struct GridArgs {
    /// Time signature, e.g. 3/4
    #[arg(long, global = true)]
    pub time_sig: Option<String>,

    /// Number of measures (may be fractional)
    #[arg(long, global = true)]
    pub measures: Option<String>,

    /// Quantize division, e.g. 1/8, 1/12 or 0 for free placement
    #[arg(long, global = true)]
    pub quantize: Option<String>,

    /// Default note length as a fraction of a whole note, e.g. 1/4
    #[arg(long, global = true)]
    pub length: Option<String>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print the derived grid geometry and exit
    Geometry,
}
