use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// FOMOD Wizard - Evaluate conditional mod installer descriptors
#[derive(Parser)]
#[command(name = "fomod-wizard")]
#[command(about = "Validate, convert and evaluate FOMOD installer descriptors")]
#[command(version)]
pub struct Cli {
    /// Installed-file snapshot used for file conditions.
    ///
    /// One path per line, relative to the game's data root. Without a
    /// snapshot every file condition is treated as satisfied.
    #[arg(long, global = true)]
    pub installed_files: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate a descriptor (JSON or ModuleConfig.xml)
    Validate {
        /// Path to the descriptor
        descriptor: PathBuf,
    },
    /// Convert a ModuleConfig.xml into descriptor JSON
    Convert {
        /// Path to ModuleConfig.xml
        module_config: PathBuf,

        /// Write JSON here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the default selections a fresh wizard starts with
    Defaults {
        /// Path to the descriptor
        descriptor: PathBuf,

        /// Write JSON here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Evaluate a descriptor against selections and print the full report
    Inspect {
        /// Path to the descriptor
        descriptor: PathBuf,

        /// Saved selections (defaults are used when omitted)
        #[arg(short, long)]
        selections: Option<PathBuf>,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        <Self as clap::Parser>::parse()
    }
}
