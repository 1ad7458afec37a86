pub mod engine;
pub mod lines;
pub mod marker;
pub mod region;
pub mod setup;

pub use engine::{TesseractEngine, TextRecognizer};
pub use lines::{normalize_lines, LinePolicy};
pub use marker::detect_special_edition;
pub use region::{crop_screenshot, extract_regions, CardRegions};

use anyhow::Result;
use image::RgbaImage;
use tracing::debug;

use crate::card::{parse_card, CardRecord, CardText, ErrorReason, ParseRules, ReferenceCatalog};
use crate::config::{CardscanConfig, RecognitionConfig, RecognitionMode};

/// Runs recognition over the card regions and normalizes each pass into lines.
pub fn recognize_card(
    engine: &dyn TextRecognizer,
    regions: &CardRegions,
    config: &RecognitionConfig,
) -> Result<CardText> {
    let name_policy = LinePolicy::from_config(config.name_policy, config.confidence_threshold);

    let text = match config.mode {
        RecognitionMode::Combined => {
            let observations = engine.recognize(&regions.name, None)?;
            CardText::Combined(normalize_lines(&observations, name_policy))
        }
        RecognitionMode::Regions => {
            let name = engine.recognize(&regions.name, None)?;
            let quantity = engine.recognize(&regions.quantity, None)?;
            let price = engine.recognize(&regions.price, Some(&config.price_allowlist))?;
            CardText::Regions {
                name: normalize_lines(&name, name_policy),
                quantity: normalize_lines(&quantity, LinePolicy::All),
                price: normalize_lines(&price, LinePolicy::All),
            }
        }
    };

    debug!("Recognized text: {:?}", text);
    Ok(text)
}

/// Classifies one card image.
///
/// Never fails: a recognition error is recorded as `OcrUnavailable`.
pub fn process_card(
    card: &RgbaImage,
    source_image: &str,
    engine: &dyn TextRecognizer,
    catalog: &ReferenceCatalog,
    rules: &ParseRules,
    config: &CardscanConfig,
) -> CardRecord {
    let regions = extract_regions(card, &config.regions);
    let special_edition = detect_special_edition(card, &config.marker);
    if special_edition {
        debug!("{}: special-edition marker detected", source_image);
    }

    match recognize_card(engine, &regions, &config.recognition) {
        Ok(text) => parse_card(&text, special_edition, catalog, rules, source_image),
        Err(e) => {
            tracing::warn!("Recognition failed for {}: {}", source_image, e);
            CardRecord::unreadable(source_image, ErrorReason::OcrUnavailable)
        }
    }
}
