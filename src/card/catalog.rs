//! Reference catalog of canonical card names and fuzzy name correction.

use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, info};

/// Known canonical names, loaded once per run.
///
/// Stored sorted, so when several entries are equally close to a candidate
/// the lexicographically smallest one wins.
#[derive(Debug, Clone, Default)]
pub struct ReferenceCatalog {
    names: BTreeSet<String>,
}

impl ReferenceCatalog {
    /// Loads a newline-delimited catalog. Each line may carry trailing
    /// comma-separated metadata; the name is the first field.
    ///
    /// A missing file yields an empty catalog (correction disabled).
    /// Any other read failure is returned as an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!(
                "Catalog {} not found. Name correction disabled.",
                path.display()
            );
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog: {}", path.display()))?;
        let catalog = Self::parse(&contents);

        info!("Loaded {} catalog names from {}", catalog.len(), path.display());
        Ok(catalog)
    }

    pub fn parse(contents: &str) -> Self {
        Self::from_names(contents.lines().filter_map(|line| {
            let name = line.split(',').next().unwrap_or("").trim();
            (!name.is_empty()).then(|| name.to_string())
        }))
    }

    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Maps a noisy candidate onto the closest catalog entry.
    ///
    /// Returns the candidate unchanged when the catalog is empty or when the
    /// best distance exceeds half the candidate's length.
    pub fn correct(&self, candidate: &str) -> String {
        let Some((best, distance)) = self.closest(candidate) else {
            return candidate.to_string();
        };

        if distance > candidate.chars().count() / 2 {
            debug!(
                "No reliable correction for '{}' (closest '{}' at distance {})",
                candidate, best, distance
            );
            return candidate.to_string();
        }

        if best != candidate {
            debug!("Corrected '{}' -> '{}' (distance {})", candidate, best, distance);
        }
        best.to_string()
    }

    fn closest(&self, candidate: &str) -> Option<(&str, usize)> {
        let lowered = candidate.to_lowercase();
        let mut best: Option<(&str, usize)> = None;

        for name in &self.names {
            let distance = levenshtein(&lowered, &name.to_lowercase());
            // Strict comparison keeps the first (smallest) name on ties
            if best.is_none_or(|(_, d)| distance < d) {
                best = Some((name.as_str(), distance));
            }
        }

        best
    }
}

/// Levenshtein distance over Unicode scalar values.
///
/// O(n·m) time, O(min(n, m)) space: only one row of the table is kept,
/// sized by the shorter string.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (long, short) = if a.len() >= b.len() { (a, b) } else { (b, a) };

    if short.is_empty() {
        return long.len();
    }

    let mut row: Vec<usize> = (0..=short.len()).collect();

    for (i, lc) in long.iter().enumerate() {
        let mut diagonal = row[0];
        row[0] = i + 1;

        for (j, sc) in short.iter().enumerate() {
            let above = row[j + 1];
            let substitution = diagonal + usize::from(lc != sc);
            row[j + 1] = substitution.min(above + 1).min(row[j] + 1);
            diagonal = above;
        }
    }

    row[short.len()]
}
