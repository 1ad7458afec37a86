use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{info, warn};

use crate::config::RecognitionConfig;
use crate::paths::get_tesseract_dir;

#[cfg(windows)]
const EXECUTABLE_NAME: &str = "tesseract.exe";
#[cfg(not(windows))]
const EXECUTABLE_NAME: &str = "tesseract";

#[cfg(windows)]
const COMMON_INSTALL_DIRS: &[&str] = &[
    r"C:\Program Files\Tesseract-OCR",
    r"C:\Program Files (x86)\Tesseract-OCR",
];
#[cfg(not(windows))]
const COMMON_INSTALL_DIRS: &[&str] = &["/usr/bin", "/usr/local/bin", "/opt/homebrew/bin"];

#[derive(Debug, Clone)]
pub struct TesseractPaths {
    pub executable: PathBuf,
    /// `None` lets Tesseract use its compiled-in data directory
    pub tessdata: Option<PathBuf>,
}

impl TesseractPaths {
    /// Finds the Tesseract executable and language data.
    ///
    /// Search order for the executable: configured path, the per-user tool
    /// directory, `PATH`, then common install locations.
    pub fn locate(config: &RecognitionConfig) -> Result<Self> {
        let executable = find_tesseract_executable(config.tesseract_path.as_deref())?;
        let tessdata = find_tessdata_dir(config.tessdata_dir.as_deref(), &config.language);

        info!("Using Tesseract at: {}", executable.display());
        match &tessdata {
            Some(dir) => info!("Using tessdata at: {}", dir.display()),
            None => info!("Using Tesseract's default tessdata"),
        }

        Ok(Self {
            executable,
            tessdata,
        })
    }
}

fn responds_to_version(executable: &Path) -> bool {
    Command::new(executable)
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Finds the Tesseract executable, checking the configured path and our local dir first, then system
pub fn find_tesseract_executable(configured: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = configured {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        warn!(
            "Configured Tesseract path {} does not exist, searching elsewhere",
            path.display()
        );
    }

    let local_exe = get_tesseract_dir().join(EXECUTABLE_NAME);
    if local_exe.exists() {
        return Ok(local_exe);
    }

    // Check PATH
    let on_path = PathBuf::from(EXECUTABLE_NAME);
    if responds_to_version(&on_path) {
        return Ok(on_path);
    }

    // Check common paths
    for dir in COMMON_INSTALL_DIRS {
        let p = Path::new(dir).join(EXECUTABLE_NAME);
        if p.exists() {
            return Ok(p);
        }
    }

    Err(anyhow!(
        "Tesseract not found. Install Tesseract-OCR, add it to PATH, \
         or set recognition.tesseract_path in config.json"
    ))
}

/// Finds a tessdata directory holding `<language>.traineddata`.
///
/// Returns `None` when no candidate has the data; Tesseract then falls back
/// to its own default location.
pub fn find_tessdata_dir(configured: Option<&Path>, language: &str) -> Option<PathBuf> {
    let data_file = format!("{}.traineddata", language);
    let mut candidates: Vec<PathBuf> = Vec::new();

    if let Some(dir) = configured {
        candidates.push(dir.to_path_buf());
    }
    candidates.push(get_tesseract_dir().join("tessdata"));
    for dir in COMMON_INSTALL_DIRS {
        candidates.push(Path::new(dir).join("tessdata"));
    }

    // Check TESSDATA_PREFIX environment variable
    if let Ok(prefix) = std::env::var("TESSDATA_PREFIX") {
        let p = PathBuf::from(&prefix);
        candidates.push(p.join("tessdata"));
        candidates.push(p);
    }

    candidates
        .into_iter()
        .find(|dir| dir.join(&data_file).exists())
}
