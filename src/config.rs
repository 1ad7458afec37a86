//! Configuration for the card extraction pipeline.
//!
//! Loads settings from config.json at startup. Provides region geometry,
//! marker detection thresholds, recognition settings and parsing tokens.
//! Every field has a default, so a partial config.json is valid.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Global configuration instance, initialized once at startup.
static CONFIG: OnceLock<CardscanConfig> = OnceLock::new();

/// Cut fractions for trimming a full inventory screenshot down to the card grid.
/// Each value is the fraction of the image removed from that edge.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenshotCrop {
    pub top: f32,
    pub bottom: f32,
    pub left: f32,
    pub right: f32,
}

impl Default for ScreenshotCrop {
    fn default() -> Self {
        Self {
            top: 0.185,
            bottom: 0.035,
            left: 0.27,
            right: 0.015,
        }
    }
}

/// Proportional geometry of the text regions inside one card image.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionGeometry {
    /// Height of the name band, measured from the bottom edge (fraction of card height)
    pub name_band: f32,
    /// Height of the quantity-and-price band, measured from the bottom edge
    pub band_height: f32,
    /// Width of the quantity region, measured from the left edge
    pub quantity_left: f32,
    /// Left edge of the price region (fraction of card width)
    pub price_left_start: f32,
}

impl Default for RegionGeometry {
    fn default() -> Self {
        Self {
            name_band: 0.37,
            band_height: 0.18,
            quantity_left: 0.5,
            price_left_start: 0.4,
        }
    }
}

/// Thresholds for the orange-yellow special-edition marker.
///
/// Hue uses the 0..180 scale, saturation and value 0..255.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerConfig {
    pub hue_min: u8,
    pub hue_max: u8,
    pub saturation_min: u8,
    pub value_min: u8,
    /// Smallest accepted component area in pixels (rejects noise specks)
    pub min_area: u32,
    /// Largest accepted component area in pixels (rejects large orange artwork)
    pub max_area: u32,
    /// A component must start left of this fraction of the card width
    pub max_left_fraction: f32,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            hue_min: 5,
            hue_max: 25,
            saturation_min: 100,
            value_min: 100,
            min_area: 100,
            max_area: 5000,
            max_left_fraction: 0.5,
        }
    }
}

/// How recognized observations are turned into lines.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinePolicyKind {
    /// Keep every observation in recognition order
    All,
    /// Keep confident observations as separate lines
    Confident,
    /// Keep confident observations joined into one line
    ConfidentJoined,
}

/// Whether the card is recognized in one pass or one pass per region.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecognitionMode {
    /// One pass over the whole name band (which contains the quantity and price band)
    Combined,
    /// Separate passes over the name, quantity and price regions
    Regions,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionConfig {
    pub mode: RecognitionMode,
    /// Observations below this confidence (0.0-1.0) are dropped by confident policies
    pub confidence_threshold: f32,
    /// Policy for name-region observations
    pub name_policy: LinePolicyKind,
    /// Character allow-list for the price region pass
    pub price_allowlist: String,
    /// Explicit path to the tesseract executable
    pub tesseract_path: Option<PathBuf>,
    /// Explicit tessdata directory
    pub tessdata_dir: Option<PathBuf>,
    pub language: String,
    /// Tesseract page segmentation mode
    pub psm: u8,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            mode: RecognitionMode::Regions,
            confidence_threshold: 0.4,
            name_policy: LinePolicyKind::Confident,
            price_allowlist: "G0123456789.,-".to_string(),
            tesseract_path: None,
            tessdata_dir: None,
            language: "eng".to_string(),
            psm: 6,
        }
    }
}

/// A rarity/variant token that may appear on its own line above the name.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MarkerToken {
    pub text: String,
    /// Whether this token denotes a special edition ("ST")
    pub special_edition: bool,
}

impl MarkerToken {
    fn new(text: &str, special_edition: bool) -> Self {
        Self {
            text: text.to_string(),
            special_edition,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ParsingConfig {
    pub marker_tokens: Vec<MarkerToken>,
    /// Case-insensitive substrings identifying the quantity line
    pub quantity_tokens: Vec<String>,
    /// Leading glyph on price lines
    pub currency_glyph: char,
    /// OCR confusions fixed on price lines after the currency glyph: (seen, meant)
    pub price_confusions: Vec<(char, char)>,
    /// Prepended to special-edition names
    pub special_edition_prefix: String,
    /// Price line offset from the scan start when no quantity marker was found
    pub price_fallback_offset: usize,
}

impl Default for ParsingConfig {
    fn default() -> Self {
        Self {
            marker_tokens: vec![
                MarkerToken::new("ST", true),
                MarkerToken::new("R", false),
                MarkerToken::new("U", false),
            ],
            quantity_tokens: ["wt", "wt:", "wt.", "wt;"]
                .iter()
                .map(|t| t.to_string())
                .collect(),
            currency_glyph: 'G',
            price_confusions: vec![('O', '0'), ('s', '5')],
            special_edition_prefix: "StatTrack ".to_string(),
            price_fallback_offset: 2,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub complete_path: PathBuf,
    pub incomplete_path: PathBuf,
    /// Checkpoint after this many processed images
    pub checkpoint_interval: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            complete_path: PathBuf::from("all_card_data.json"),
            incomplete_path: PathBuf::from("incomplete_card_data.json"),
            checkpoint_interval: 100,
        }
    }
}

/// Complete cardscan configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CardscanConfig {
    pub screenshot_crop: ScreenshotCrop,
    pub regions: RegionGeometry,
    pub marker: MarkerConfig,
    pub recognition: RecognitionConfig,
    pub parsing: ParsingConfig,
    pub store: StoreConfig,
    pub catalog_path: PathBuf,
    pub input_dir: PathBuf,
}

impl CardscanConfig {
    /// Applies the defaults that cannot be expressed by `Default` on `PathBuf`.
    fn with_path_defaults(mut self) -> Self {
        if self.catalog_path.as_os_str().is_empty() {
            self.catalog_path = PathBuf::from("correct_names.txt");
        }
        if self.input_dir.as_os_str().is_empty() {
            self.input_dir = PathBuf::from("ready_screenshots");
        }
        self
    }
}

/// Loads configuration from `path`, or from config.json next to the executable,
/// or from the working directory. Falls back to defaults on any failure.
pub fn load_config(path: Option<&Path>) -> CardscanConfig {
    let config_path = match path {
        Some(p) => p.to_path_buf(),
        None => {
            let beside_exe = crate::paths::get_exe_dir().join("config.json");
            if beside_exe.exists() {
                beside_exe
            } else {
                PathBuf::from("config.json")
            }
        }
    };

    info!("Looking for config at: {}", config_path.display());

    let config = if config_path.exists() {
        match fs::read_to_string(&config_path) {
            Ok(contents) => match serde_json::from_str::<CardscanConfig>(&contents) {
                Ok(config) => {
                    info!("Config loaded from {}", config_path.display());
                    config
                }
                Err(e) => {
                    warn!("Failed to parse {}: {}. Using defaults.", config_path.display(), e);
                    CardscanConfig::default()
                }
            },
            Err(e) => {
                warn!("Failed to read {}: {}. Using defaults.", config_path.display(), e);
                CardscanConfig::default()
            }
        }
    } else {
        info!("{} not found. Using default config.", config_path.display());
        CardscanConfig::default()
    };

    config.with_path_defaults()
}

/// Initializes the global configuration. Call once at startup.
pub fn init_config(path: Option<&Path>) {
    let _ = CONFIG.set(load_config(path));
}

/// Returns a reference to the global configuration.
/// Panics if called before init_config().
pub fn get_config() -> &'static CardscanConfig {
    CONFIG
        .get()
        .expect("Config not initialized. Call init_config() first.")
}
