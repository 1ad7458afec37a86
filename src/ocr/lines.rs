//! Turns recognition observations into ordered text lines.

use super::engine::Observation;
use crate::config::LinePolicyKind;

/// How observations for one region are kept.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LinePolicy {
    /// Every observation, in recognition order
    All,
    /// Observations with confidence >= threshold, one line each
    Confident { threshold: f32 },
    /// Observations with confidence >= threshold, joined into a single line
    ConfidentJoined { threshold: f32 },
}

impl LinePolicy {
    pub fn from_config(kind: LinePolicyKind, threshold: f32) -> Self {
        match kind {
            LinePolicyKind::All => LinePolicy::All,
            LinePolicyKind::Confident => LinePolicy::Confident { threshold },
            LinePolicyKind::ConfidentJoined => LinePolicy::ConfidentJoined { threshold },
        }
    }
}

/// Normalizes observations into trimmed, non-empty lines.
///
/// Never fails: no observations (or none passing the policy) gives an empty list.
pub fn normalize_lines(observations: &[Observation], policy: LinePolicy) -> Vec<String> {
    let threshold = match policy {
        LinePolicy::All => None,
        LinePolicy::Confident { threshold } | LinePolicy::ConfidentJoined { threshold } => {
            Some(threshold)
        }
    };

    let kept = observations
        .iter()
        .filter(|o| threshold.is_none_or(|t| o.confidence >= t))
        .map(|o| o.text.trim())
        .filter(|t| !t.is_empty());

    match policy {
        LinePolicy::ConfidentJoined { .. } => {
            let joined = kept.collect::<Vec<_>>().join(" ");
            if joined.is_empty() {
                Vec::new()
            } else {
                vec![joined]
            }
        }
        _ => kept.map(str::to_string).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(items: &[(&str, f32)]) -> Vec<Observation> {
        items
            .iter()
            .map(|(text, confidence)| Observation {
                text: text.to_string(),
                confidence: *confidence,
            })
            .collect()
    }

    #[test]
    fn test_all_keeps_order_and_low_confidence() {
        let observations = obs(&[(" G15.5 ", 0.2), ("G2", 0.9)]);
        assert_eq!(normalize_lines(&observations, LinePolicy::All), vec!["G15.5", "G2"]);
    }

    #[test]
    fn test_confident_filters() {
        let observations = obs(&[("ST", 0.95), ("~~", 0.1), ("Karambit", 0.4), ("2 WT.", 0.39)]);
        let lines = normalize_lines(&observations, LinePolicy::Confident { threshold: 0.4 });
        assert_eq!(lines, vec!["ST", "Karambit"]);
    }

    #[test]
    fn test_confident_joined() {
        let observations = obs(&[("AWP", 0.8), ("noise", 0.1), ("Dragon Lore", 0.7)]);
        let lines = normalize_lines(&observations, LinePolicy::ConfidentJoined { threshold: 0.4 });
        assert_eq!(lines, vec!["AWP Dragon Lore"]);
    }

    #[test]
    fn test_empty_input() {
        assert!(normalize_lines(&[], LinePolicy::All).is_empty());
        assert!(normalize_lines(&[], LinePolicy::ConfidentJoined { threshold: 0.4 }).is_empty());
        let blank = obs(&[("   ", 0.9)]);
        assert!(normalize_lines(&blank, LinePolicy::Confident { threshold: 0.4 }).is_empty());
    }
}
