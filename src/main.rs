//! cardscan
//!
//! Extracts card name, quantity and price from pre-cropped trading-card
//! screenshots with Tesseract, corrects names against a reference list, and
//! saves complete and incomplete records as JSON.

mod batch;
mod card;
mod cli;
mod config;
mod logging;
mod ocr;
mod paths;
mod store;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use tracing::{error, info};

use card::{parse_card, CardText, ParseRules, ReferenceCatalog};
use cli::{Cli, Command};
use config::CardscanConfig;
use ocr::{detect_special_edition, TesseractEngine};
use store::ResultStore;

fn main() {
    let cli = Cli::parse();

    if let Err(e) = paths::ensure_directories() {
        eprintln!("Warning: Failed to create logs directory: {}", e);
    }
    logging::init();

    config::init_config(cli.config.as_deref());

    if let Err(e) = run(cli.command, config::get_config()) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run(command: Command, config: &CardscanConfig) -> Result<()> {
    match command {
        Command::Scan {
            input,
            catalog,
            complete,
            incomplete,
        } => {
            let input = input.unwrap_or_else(|| config.input_dir.clone());
            let catalog = load_catalog(catalog.as_deref(), config)?;
            let engine = TesseractEngine::new(&config.recognition)
                .context("Text recognition engine is not available")?;

            let mut store = ResultStore::new(
                complete.unwrap_or_else(|| config.store.complete_path.clone()),
                incomplete.unwrap_or_else(|| config.store.incomplete_path.clone()),
            );
            store.load();

            batch::run_batch(&input, &engine, &catalog, config, &mut store)?;
        }
        Command::Parse {
            file,
            special_edition,
            catalog,
        } => {
            let catalog = load_catalog(catalog.as_deref(), config)?;
            let rules = ParseRules::new(&config.parsing)?;
            let text = read_text_lines(&file)?;
            let source = file
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();

            let record = parse_card(&text, special_edition, &catalog, &rules, &source);
            if let Some(reason) = record.error_reason() {
                info!("Incomplete: {}", reason);
            }
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Command::Crop { input, output } => {
            batch::crop_directory(&input, &output, &config.screenshot_crop)?;
        }
        Command::Detect { file } => {
            let card = image::open(&file)
                .with_context(|| format!("Failed to load image: {}", file.display()))?
                .to_rgba8();
            let found = detect_special_edition(&card, &config.marker);
            println!(
                "{}: {}",
                file.display(),
                if found { "special edition" } else { "regular" }
            );
        }
    }
    Ok(())
}

fn load_catalog(override_path: Option<&Path>, config: &CardscanConfig) -> Result<ReferenceCatalog> {
    let path = override_path.unwrap_or(&config.catalog_path);
    ReferenceCatalog::load(path)
}

/// Reads a text file as one recognized line per file line, dropping blanks.
fn read_text_lines(path: &Path) -> Result<CardText> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let lines = contents
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect();
    Ok(CardText::Combined(lines))
}
