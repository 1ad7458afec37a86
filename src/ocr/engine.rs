use anyhow::{anyhow, Result};
use image::RgbaImage;
use std::path::PathBuf;
use std::process::Command;
use tempfile::NamedTempFile;

use super::setup::TesseractPaths;
use crate::config::RecognitionConfig;

/// One recognized piece of text with its confidence (0.0-1.0).
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub text: String,
    pub confidence: f32,
}

/// A text-recognition engine: image region in, ordered observations out.
pub trait TextRecognizer {
    /// Recognizes text in `img`. With an allow-list, only those characters
    /// may appear in the output.
    fn recognize(&self, img: &RgbaImage, allowlist: Option<&str>) -> Result<Vec<Observation>>;
}

/// Runs the Tesseract CLI on each region.
pub struct TesseractEngine {
    executable: PathBuf,
    tessdata: Option<PathBuf>,
    language: String,
    psm: u8,
}

impl TesseractEngine {
    /// Locates Tesseract and prepares the engine. Fails if no executable is found.
    pub fn new(config: &RecognitionConfig) -> Result<Self> {
        let paths = TesseractPaths::locate(config)?;
        Ok(Self {
            executable: paths.executable,
            tessdata: paths.tessdata,
            language: config.language.clone(),
            psm: config.psm,
        })
    }
}

impl TextRecognizer for TesseractEngine {
    fn recognize(&self, img: &RgbaImage, allowlist: Option<&str>) -> Result<Vec<Observation>> {
        // Save image to temporary file
        let temp_input = NamedTempFile::with_suffix(".png")?;
        img.save(temp_input.path())?;

        // Create temporary output file (Tesseract adds .tsv extension)
        let temp_output = NamedTempFile::new()?;
        let output_base = temp_output.path().to_string_lossy().to_string();

        let mut command = Command::new(&self.executable);
        command
            .arg(temp_input.path())
            .arg(&output_base)
            .arg("-l")
            .arg(&self.language)
            .arg("--psm")
            .arg(self.psm.to_string());
        if let Some(tessdata) = &self.tessdata {
            command.arg("--tessdata-dir").arg(tessdata);
        }
        if let Some(allowlist) = allowlist {
            command
                .arg("-c")
                .arg(format!("tessedit_char_whitelist={}", allowlist));
        }
        // Output TSV format for per-word confidences
        let output = command.arg("tsv").output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("Tesseract failed: {}", stderr));
        }

        let tsv_path = format!("{}.tsv", output_base);
        let tsv_content = std::fs::read_to_string(&tsv_path)
            .map_err(|e| anyhow!("Failed to read Tesseract output: {}", e))?;
        let _ = std::fs::remove_file(&tsv_path);

        Ok(parse_tsv_output(&tsv_content))
    }
}

/// Accumulates the words of one TSV line.
#[derive(Default)]
struct LineBuilder {
    key: Option<(i32, i32, i32)>,
    words: Vec<String>,
    conf_sum: f32,
}

impl LineBuilder {
    fn flush(&mut self, out: &mut Vec<Observation>) {
        if !self.words.is_empty() {
            out.push(Observation {
                text: self.words.join(" "),
                confidence: self.conf_sum / self.words.len() as f32 / 100.0,
            });
        }
        self.words.clear();
        self.conf_sum = 0.0;
    }
}

/// Parses Tesseract TSV output into one observation per text line.
///
/// Line confidence is the mean word confidence scaled to 0.0-1.0.
fn parse_tsv_output(tsv: &str) -> Vec<Observation> {
    let mut observations = Vec::new();
    let mut current = LineBuilder::default();

    for line in tsv.lines().skip(1) {
        // Skip header
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 12 {
            continue;
        }

        // TSV fields: level, page_num, block_num, par_num, line_num, word_num,
        //             left, top, width, height, conf, text
        let level: i32 = fields[0].parse().unwrap_or(-1);
        let block: i32 = fields[2].parse().unwrap_or(-1);
        let par: i32 = fields[3].parse().unwrap_or(-1);
        let line_num: i32 = fields[4].parse().unwrap_or(-1);
        let conf: f32 = fields[10].parse().unwrap_or(-1.0);
        let text = fields[11].trim();

        // Level 5 = word
        if level != 5 || text.is_empty() || conf < 0.0 {
            continue;
        }

        let key = (block, par, line_num);
        if current.key != Some(key) {
            current.flush(&mut observations);
            current.key = Some(key);
        }
        current.words.push(text.to_string());
        current.conf_sum += conf;
    }

    current.flush(&mut observations);
    observations
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext";

    fn word(block: i32, line: i32, conf: f32, text: &str) -> String {
        format!("5\t1\t{}\t1\t{}\t1\t0\t0\t10\t10\t{}\t{}", block, line, conf, text)
    }

    #[test]
    fn test_parse_tsv_groups_words_by_line() {
        let tsv = [
            HEADER.to_string(),
            "1\t1\t0\t0\t0\t0\t0\t0\t100\t100\t-1\t".to_string(),
            word(1, 1, 90.0, "ST"),
            word(1, 2, 80.0, "M4A1-S"),
            word(1, 2, 60.0, "Hyper"),
            word(1, 2, 70.0, "Beast"),
            word(2, 1, 95.0, "15"),
            word(2, 1, 85.0, "WT."),
        ]
        .join("\n");

        let observations = parse_tsv_output(&tsv);
        assert_eq!(observations.len(), 3);
        assert_eq!(observations[0].text, "ST");
        assert!((observations[0].confidence - 0.9).abs() < 1e-6);
        assert_eq!(observations[1].text, "M4A1-S Hyper Beast");
        assert!((observations[1].confidence - 0.7).abs() < 1e-6);
        // Same line number in a new block is a new line
        assert_eq!(observations[2].text, "15 WT.");
    }

    #[test]
    fn test_parse_tsv_skips_empty_and_unscored() {
        let tsv = [
            HEADER.to_string(),
            word(1, 1, -1.0, "ghost"),
            word(1, 1, 50.0, " "),
            "garbage line".to_string(),
        ]
        .join("\n");
        assert!(parse_tsv_output(&tsv).is_empty());
    }
}
