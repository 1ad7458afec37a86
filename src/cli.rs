use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cardscan")]
#[command(about = "Extracts name, quantity and price from trading-card screenshots", long_about = None)]
#[command(version)]
pub(crate) struct Cli {
    /// Path to config.json (default: next to the executable)
    #[arg(long, global = true)]
    pub(crate) config: Option<PathBuf>,

    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Process every card image in a directory and save the results.
    Scan {
        /// Directory of card images (overrides input_dir)
        #[arg(short, long)]
        input: Option<PathBuf>,
        /// Reference name list (overrides catalog_path)
        #[arg(long)]
        catalog: Option<PathBuf>,
        /// Output file for complete records
        #[arg(long)]
        complete: Option<PathBuf>,
        /// Output file for incomplete records
        #[arg(long)]
        incomplete: Option<PathBuf>,
    },

    /// Parse recognized text lines from a file (one per line) into a record.
    Parse {
        file: PathBuf,
        /// Treat the card as special edition (as if the marker was detected)
        #[arg(long)]
        special_edition: bool,
        /// Reference name list (overrides catalog_path)
        #[arg(long)]
        catalog: Option<PathBuf>,
    },

    /// Trim full screenshots to the card grid.
    Crop {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Report whether a card image carries the special-edition marker.
    Detect { file: PathBuf },
}
