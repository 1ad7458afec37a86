//! Sequential batch processing of a directory of card images.
//!
//! Images are processed one at a time in file-name order. Each one yields
//! exactly one record, even when it cannot be decoded. The store is
//! checkpointed on a fixed cadence and once more at the end.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{error, info, warn};

use crate::card::{CardRecord, ErrorReason, ParseRules, ReferenceCatalog};
use crate::config::{CardscanConfig, ScreenshotCrop};
use crate::ocr::{crop_screenshot, process_card, TextRecognizer};
use crate::store::ResultStore;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// Counts from one batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BatchSummary {
    pub processed: usize,
    pub complete: usize,
    pub incomplete: usize,
}

pub fn is_card_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| IMAGE_EXTENSIONS.iter().any(|x| x.eq_ignore_ascii_case(e)))
}

/// Lists card images in `dir`, sorted by file name.
pub fn list_card_images(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read input directory: {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && is_card_image(p))
        .collect();
    paths.sort();
    Ok(paths)
}

/// Loads and classifies one card image file.
pub fn process_card_file(
    path: &Path,
    engine: &dyn TextRecognizer,
    catalog: &ReferenceCatalog,
    rules: &ParseRules,
    config: &CardscanConfig,
) -> CardRecord {
    let image_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());

    match image::open(path) {
        Ok(img) => process_card(&img.to_rgba8(), &image_name, engine, catalog, rules, config),
        Err(e) => {
            warn!("Failed to load image {}: {}", path.display(), e);
            CardRecord::unreadable(&image_name, ErrorReason::OcrUnavailable)
        }
    }
}

/// Processes every card image in `input_dir` into the store.
pub fn run_batch(
    input_dir: &Path,
    engine: &dyn TextRecognizer,
    catalog: &ReferenceCatalog,
    config: &CardscanConfig,
    store: &mut ResultStore,
) -> Result<BatchSummary> {
    let rules = ParseRules::new(&config.parsing)?;
    let images = list_card_images(input_dir)?;
    let total = images.len();
    let interval = config.store.checkpoint_interval.max(1);

    if images.is_empty() {
        info!("No images found in {}", input_dir.display());
        store.checkpoint().context("Final checkpoint failed")?;
        return Ok(BatchSummary::default());
    }

    info!("Processing {} images...", total);
    let start = Instant::now();
    let mut summary = BatchSummary::default();

    for (idx, path) in images.iter().enumerate() {
        let n = idx + 1;
        info!("Processing image {}/{}: {}", n, total, path.display());

        let record = process_card_file(path, engine, catalog, &rules, config);
        match record.error_reason() {
            None => {
                summary.complete += 1;
                info!(
                    "Complete: {} x{} @ {}",
                    record.name(),
                    record.count(),
                    record.price()
                );
            }
            Some(reason) => {
                summary.incomplete += 1;
                info!("Incomplete ({}): {:?}", reason, record.name());
            }
        }
        store.append(record);
        summary.processed = n;

        if n % interval == 0 && n != total {
            match store.checkpoint() {
                Ok(()) => info!(
                    "Checkpoint: {}/{} images in {:.2}s",
                    n,
                    total,
                    start.elapsed().as_secs_f64()
                ),
                Err(e) => error!("Checkpoint failed after {} images: {:#}", n, e),
            }
        }
    }

    store.checkpoint().context("Final checkpoint failed")?;

    info!(
        "Finished {} images in {:.2}s: {} complete, {} incomplete",
        total,
        start.elapsed().as_secs_f64(),
        summary.complete,
        summary.incomplete
    );
    info!("Complete records saved to: {}", store.complete_path().display());
    info!("Incomplete records saved to: {}", store.incomplete_path().display());

    Ok(summary)
}

/// Crops every screenshot in `input_dir` to the card grid, writing
/// `img0.png`, `img1.png`, ... into `output_dir`. Returns the number written.
pub fn crop_directory(input_dir: &Path, output_dir: &Path, cut: &ScreenshotCrop) -> Result<usize> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory: {}", output_dir.display()))?;

    let mut written = 0;
    for path in list_card_images(input_dir)? {
        let img = image::open(&path)
            .with_context(|| format!("Failed to load screenshot: {}", path.display()))?
            .to_rgba8();
        let out = output_dir.join(format!("img{}.png", written));
        crop_screenshot(&img, cut)
            .save(&out)
            .with_context(|| format!("Failed to save {}", out.display()))?;
        written += 1;
    }

    info!("Cropped {} screenshots into {}", written, output_dir.display());
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RecognitionMode;
    use crate::ocr::testing::ScriptedEngine;
    use crate::ocr::engine::Observation;
    use image::{Rgba, RgbaImage};
    use std::cell::RefCell;
    use tempfile::tempdir;

    /// Records how many complete records are on disk each time recognition starts.
    struct SavedCountEngine {
        inner: ScriptedEngine,
        complete_path: PathBuf,
        saved: RefCell<Vec<Option<usize>>>,
    }

    impl TextRecognizer for SavedCountEngine {
        fn recognize(&self, img: &RgbaImage, allowlist: Option<&str>) -> Result<Vec<Observation>> {
            let saved = std::fs::read_to_string(&self.complete_path)
                .ok()
                .map(|json| serde_json::from_str::<Vec<CardRecord>>(&json).unwrap().len());
            self.saved.borrow_mut().push(saved);
            self.inner.recognize(img, allowlist)
        }
    }

    fn write_card(dir: &Path, name: &str) {
        RgbaImage::from_pixel(80, 120, Rgba([20, 20, 20, 255]))
            .save(dir.join(name))
            .unwrap();
    }

    fn combined_config() -> CardscanConfig {
        let mut config = CardscanConfig::default();
        config.recognition.mode = RecognitionMode::Combined;
        config
    }

    #[test]
    fn test_is_card_image() {
        assert!(is_card_image(Path::new("a.png")));
        assert!(is_card_image(Path::new("a.JPG")));
        assert!(is_card_image(Path::new("dir/a.jpeg")));
        assert!(!is_card_image(Path::new("a.gif")));
        assert!(!is_card_image(Path::new("png")));
    }

    #[test]
    fn test_list_card_images_sorted_and_filtered() {
        let dir = tempdir().unwrap();
        write_card(dir.path(), "card_2.png");
        write_card(dir.path(), "card_1.png");
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();
        std::fs::create_dir(dir.path().join("sub.png")).unwrap();

        let images = list_card_images(dir.path()).unwrap();
        let names: Vec<_> = images
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["card_1.png", "card_2.png"]);
    }

    #[test]
    fn test_run_batch_classifies_and_checkpoints() {
        let input = tempdir().unwrap();
        let output = tempdir().unwrap();
        write_card(input.path(), "card_0.png");
        write_card(input.path(), "card_1.png");
        write_card(input.path(), "card_2.png");
        // Undecodable file still produces a record
        std::fs::write(input.path().join("card_3.png"), b"not an image").unwrap();

        let engine = ScriptedEngine::new(vec![
            vec![("Karambit", 0.9), ("2 WT.", 0.9), ("G500", 0.9)],
            vec![("Karambit", 0.9), ("G500", 0.9)],
            vec![("AWP Asiimov", 0.9), ("1 WT.", 0.9), ("G80.5", 0.9)],
        ]);
        let mut config = combined_config();
        config.store.checkpoint_interval = 2;
        let mut store = ResultStore::new(
            output.path().join("all.json"),
            output.path().join("incomplete.json"),
        );

        let summary = run_batch(
            input.path(),
            &engine,
            &ReferenceCatalog::default(),
            &config,
            &mut store,
        )
        .unwrap();

        assert_eq!(
            summary,
            BatchSummary {
                processed: 4,
                complete: 2,
                incomplete: 2
            }
        );
        assert_eq!(store.complete()[0].source_image(), "card_0.png");
        assert_eq!(store.complete()[1].source_image(), "card_2.png");
        assert_eq!(
            store.incomplete()[0].error_reason(),
            Some(ErrorReason::QuantityMarkerMissing)
        );
        assert_eq!(
            store.incomplete()[1].error_reason(),
            Some(ErrorReason::OcrUnavailable)
        );

        let saved: Vec<CardRecord> =
            serde_json::from_str(&std::fs::read_to_string(output.path().join("all.json")).unwrap())
                .unwrap();
        assert_eq!(saved.len(), 2);
    }

    #[test]
    fn test_crop_directory_numbers_outputs() {
        let input = tempdir().unwrap();
        let output = tempdir().unwrap();
        RgbaImage::from_pixel(200, 100, Rgba([0, 0, 0, 255]))
            .save(input.path().join("b.png"))
            .unwrap();
        RgbaImage::from_pixel(200, 100, Rgba([0, 0, 0, 255]))
            .save(input.path().join("a.PNG"))
            .unwrap();

        let out_dir = output.path().join("processed");
        let cut = ScreenshotCrop {
            top: 0.25,
            bottom: 0.25,
            left: 0.5,
            right: 0.0,
        };
        let written = crop_directory(input.path(), &out_dir, &cut).unwrap();

        assert_eq!(written, 2);
        let first = image::open(out_dir.join("img0.png")).unwrap();
        assert_eq!((first.width(), first.height()), (100, 50));
        assert!(out_dir.join("img1.png").exists());
    }

    #[test]
    fn test_run_batch_checkpoints_every_interval() {
        let input = tempdir().unwrap();
        let output = tempdir().unwrap();
        for i in 0..5 {
            write_card(input.path(), &format!("card_{}.png", i));
        }
        let card = vec![("Karambit", 0.9), ("2 WT.", 0.9), ("G500", 0.9)];
        let engine = SavedCountEngine {
            inner: ScriptedEngine::new(vec![card; 5]),
            complete_path: output.path().join("all.json"),
            saved: RefCell::new(Vec::new()),
        };
        let mut config = combined_config();
        config.store.checkpoint_interval = 2;
        let mut store = ResultStore::new(
            output.path().join("all.json"),
            output.path().join("incomplete.json"),
        );

        run_batch(
            input.path(),
            &engine,
            &ReferenceCatalog::default(),
            &config,
            &mut store,
        )
        .unwrap();

        // Files appear after the 2nd and 4th records, before the next card is read
        assert_eq!(
            *engine.saved.borrow(),
            vec![None, None, Some(2), Some(2), Some(4)]
        );
        let saved: Vec<CardRecord> =
            serde_json::from_str(&std::fs::read_to_string(output.path().join("all.json")).unwrap())
                .unwrap();
        assert_eq!(saved.len(), 5);
    }

    #[test]
    fn test_run_batch_empty_dir_still_writes_files() {
        let input = tempdir().unwrap();
        let output = tempdir().unwrap();
        let mut store = ResultStore::new(output.path().join("all.json"), output.path().join("b.json"));

        let summary = run_batch(
            input.path(),
            &ScriptedEngine::new(vec![]),
            &ReferenceCatalog::default(),
            &CardscanConfig::default(),
            &mut store,
        )
        .unwrap();

        assert_eq!(summary, BatchSummary::default());
        assert_eq!(std::fs::read_to_string(output.path().join("all.json")).unwrap(), "[]");
        assert_eq!(std::fs::read_to_string(output.path().join("b.json")).unwrap(), "[]");
    }

    #[test]
    fn test_run_batch_missing_dir_fails() {
        let output = tempdir().unwrap();
        let mut store = ResultStore::new(output.path().join("a.json"), output.path().join("b.json"));
        let result = run_batch(
            &output.path().join("nope"),
            &ScriptedEngine::new(vec![]),
            &ReferenceCatalog::default(),
            &CardscanConfig::default(),
            &mut store,
        );
        assert!(result.is_err());
    }
}
