//! JSON result store for classified cards.
//!
//! Keeps complete and incomplete records in two ordered lists, reloads any
//! lists left by earlier runs, and rewrites both files in full on each
//! checkpoint. Files are replaced atomically (write to a temp file in the
//! same directory, then rename), so a crash mid-write leaves the previous
//! checkpoint intact.

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{info, warn};

use crate::card::CardRecord;

pub struct ResultStore {
    complete_path: PathBuf,
    incomplete_path: PathBuf,
    complete: Vec<CardRecord>,
    incomplete: Vec<CardRecord>,
}

impl ResultStore {
    pub fn new(complete_path: impl Into<PathBuf>, incomplete_path: impl Into<PathBuf>) -> Self {
        Self {
            complete_path: complete_path.into(),
            incomplete_path: incomplete_path.into(),
            complete: Vec::new(),
            incomplete: Vec::new(),
        }
    }

    /// Appends records persisted by earlier runs.
    ///
    /// Missing or empty files contribute nothing. Unreadable or corrupt files
    /// are logged and treated as empty.
    pub fn load(&mut self) {
        let complete = read_records(&self.complete_path);
        let incomplete = read_records(&self.incomplete_path);
        info!(
            "Loaded {} complete and {} incomplete records from previous runs",
            complete.len(),
            incomplete.len()
        );
        self.complete.extend(complete);
        self.incomplete.extend(incomplete);
    }

    pub fn append(&mut self, record: CardRecord) {
        if record.is_complete() {
            self.complete.push(record);
        } else {
            self.incomplete.push(record);
        }
    }

    /// Rewrites both files with the full in-memory lists.
    pub fn checkpoint(&self) -> Result<()> {
        write_records(&self.complete_path, &self.complete)?;
        write_records(&self.incomplete_path, &self.incomplete)?;
        Ok(())
    }

    pub fn complete(&self) -> &[CardRecord] {
        &self.complete
    }

    pub fn incomplete(&self) -> &[CardRecord] {
        &self.incomplete
    }

    pub fn complete_path(&self) -> &Path {
        &self.complete_path
    }

    pub fn incomplete_path(&self) -> &Path {
        &self.incomplete_path
    }
}

fn read_records(path: &Path) -> Vec<CardRecord> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
        Err(e) => {
            warn!("Failed to read {}: {}. Starting with an empty list.", path.display(), e);
            return Vec::new();
        }
    };

    if contents.trim().is_empty() {
        return Vec::new();
    }

    match serde_json::from_str(&contents) {
        Ok(records) => records,
        Err(e) => {
            warn!("Failed to parse {}: {}. Starting with an empty list.", path.display(), e);
            Vec::new()
        }
    }
}

/// Serializes records as a 4-space indented JSON array, no trailing newline.
fn to_json(records: &[CardRecord]) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    records
        .serialize(&mut serializer)
        .context("Failed to serialize records to JSON")?;
    Ok(buf)
}

fn write_records(path: &Path, records: &[CardRecord]) -> Result<()> {
    let json = to_json(records)?;

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;

    let mut temp = NamedTempFile::new_in(&dir)
        .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;
    temp.write_all(&json).context("Failed to write JSON data")?;
    temp.as_file().sync_all().context("Failed to sync JSON data")?;
    temp.persist(path)
        .with_context(|| format!("Failed to replace {}", path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::{CardRecord, ErrorReason};
    use tempfile::tempdir;

    fn complete(name: &str, image: &str) -> CardRecord {
        CardRecord::new(name.to_string(), 2, 12.5, false, None, image)
    }

    fn store_in(dir: &Path) -> ResultStore {
        ResultStore::new(dir.join("all.json"), dir.join("incomplete.json"))
    }

    #[test]
    fn test_append_routes_by_completeness() {
        let dir = tempdir().unwrap();
        let mut store = store_in(dir.path());

        store.append(complete("Karambit", "a.png"));
        store.append(CardRecord::unreadable("b.png", ErrorReason::OcrUnavailable));
        store.append(complete("AWP Asiimov", "c.png"));

        assert_eq!(store.complete().len(), 2);
        assert_eq!(store.complete()[1].source_image(), "c.png");
        assert_eq!(store.incomplete().len(), 1);
    }

    #[test]
    fn test_checkpoint_format() {
        let dir = tempdir().unwrap();
        let mut store = store_in(dir.path());
        store.append(complete("Karambit", "a.png"));
        store.checkpoint().unwrap();

        let content = std::fs::read_to_string(store.complete_path()).unwrap();
        assert_eq!(
            content,
            "[\n    {\n        \"Name\": \"Karambit\",\n        \"Count(WT)\": 2,\n        \"Price\": 12.5,\n        \"image_name\": \"a.png\"\n    }\n]"
        );
        assert_eq!(std::fs::read_to_string(store.incomplete_path()).unwrap(), "[]");
    }

    #[test]
    fn test_reload_then_checkpoint_is_byte_identical() {
        let dir = tempdir().unwrap();
        let mut store = store_in(dir.path());
        store.append(complete("Нож | Градиент", "a.png"));
        store.append(CardRecord::new("Glock-18".to_string(), 0, 3.0, false, Some(ErrorReason::QuantityInvalid), "b.png"));
        store.append(complete("StatTrack AK-47 Redline", "c.png"));
        store.checkpoint().unwrap();

        let before_complete = std::fs::read(store.complete_path()).unwrap();
        let before_incomplete = std::fs::read(store.incomplete_path()).unwrap();

        let mut reloaded = store_in(dir.path());
        reloaded.load();
        reloaded.checkpoint().unwrap();

        assert_eq!(std::fs::read(reloaded.complete_path()).unwrap(), before_complete);
        assert_eq!(std::fs::read(reloaded.incomplete_path()).unwrap(), before_incomplete);
    }

    #[test]
    fn test_reload_keeps_long_prices_exact() {
        let dir = tempdir().unwrap();
        let mut store = store_in(dir.path());
        for (i, price) in [993094591.768306788, 123456789.987654321, 0.1 + 0.2]
            .into_iter()
            .enumerate()
        {
            let image = format!("card_{}.png", i);
            store.append(CardRecord::new("Karambit".to_string(), 1, price, false, None, &image));
        }
        store.checkpoint().unwrap();
        let first = std::fs::read(store.complete_path()).unwrap();

        let mut reloaded = store_in(dir.path());
        reloaded.load();
        assert_eq!(reloaded.complete()[0].price(), 993094591.768306788);
        reloaded.checkpoint().unwrap();

        assert_eq!(std::fs::read(reloaded.complete_path()).unwrap(), first);
    }

    #[test]
    fn test_load_accumulates_history() {
        let dir = tempdir().unwrap();
        let mut first = store_in(dir.path());
        first.append(complete("Karambit", "a.png"));
        first.checkpoint().unwrap();

        let mut second = store_in(dir.path());
        second.load();
        second.append(complete("Karambit", "a.png"));
        second.checkpoint().unwrap();

        let mut third = store_in(dir.path());
        third.load();
        // No deduplication across runs
        assert_eq!(third.complete().len(), 2);
    }

    #[test]
    fn test_corrupt_file_treated_as_empty() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("all.json"), "[{ broken").unwrap();
        std::fs::write(dir.path().join("incomplete.json"), "").unwrap();

        let mut store = store_in(dir.path());
        store.load();
        assert!(store.complete().is_empty());
        assert!(store.incomplete().is_empty());
    }

    #[test]
    fn test_checkpoint_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("json").join("out");
        let store = ResultStore::new(nested.join("all.json"), nested.join("incomplete.json"));
        store.checkpoint().unwrap();
        assert!(nested.join("all.json").exists());
    }
}
