//! Card records and the fixed vocabulary of incompleteness reasons.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Why a record was classified incomplete.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorReason {
    NameEmpty,
    QuantityMarkerMissing,
    QuantityInvalid,
    PriceInvalid,
    ParsingError,
    OcrUnavailable,
}

impl ErrorReason {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorReason::NameEmpty => "NameEmpty",
            ErrorReason::QuantityMarkerMissing => "QuantityMarkerMissing",
            ErrorReason::QuantityInvalid => "QuantityInvalid",
            ErrorReason::PriceInvalid => "PriceInvalid",
            ErrorReason::ParsingError => "ParsingError",
            ErrorReason::OcrUnavailable => "OcrUnavailable",
        }
    }
}

impl fmt::Display for ErrorReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ErrorReason {
    type Err = String;

    /// Accepts the reason names as well as the human-readable messages
    /// written by older result files.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let reason = match s {
            "NameEmpty" | "Name is empty" => ErrorReason::NameEmpty,
            "QuantityMarkerMissing" | "Count(WT) or wt marker not found" => {
                ErrorReason::QuantityMarkerMissing
            }
            "QuantityInvalid" | "Invalid Count(WT)" => ErrorReason::QuantityInvalid,
            "PriceInvalid" | "Invalid Price" => ErrorReason::PriceInvalid,
            "OcrUnavailable" | "OCR failed" => ErrorReason::OcrUnavailable,
            "ParsingError" => ErrorReason::ParsingError,
            other if other.starts_with("Parsing error") => ErrorReason::ParsingError,
            other => return Err(format!("unknown error reason: {}", other)),
        };
        Ok(reason)
    }
}

impl Serialize for ErrorReason {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ErrorReason {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Completeness {
    Complete,
    Incomplete,
}

/// One parsed card.
///
/// Fields are private: a record is produced by the classifier (or loaded
/// from a previous run) and never edited afterwards. Completeness is derived
/// from the presence of an error reason.
///
/// Serialized field order is `Name`, `Count(WT)`, `Price`, `error`, `image_name`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CardRecord {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Count(WT)")]
    count: u32,
    #[serde(rename = "Price")]
    price: f64,
    /// Not persisted; the name prefix carries it in output files
    #[serde(skip)]
    special_edition: bool,
    #[serde(rename = "error", default, skip_serializing_if = "Option::is_none")]
    error_reason: Option<ErrorReason>,
    #[serde(rename = "image_name")]
    source_image: String,
}

impl CardRecord {
    pub(crate) fn new(
        name: String,
        count: u32,
        price: f64,
        special_edition: bool,
        error_reason: Option<ErrorReason>,
        source_image: &str,
    ) -> Self {
        Self {
            name,
            count,
            price,
            special_edition,
            error_reason,
            source_image: source_image.to_string(),
        }
    }

    /// An incomplete record with no extracted fields.
    pub fn unreadable(source_image: &str, reason: ErrorReason) -> Self {
        Self::new(String::new(), 0, 0.0, false, Some(reason), source_image)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn price(&self) -> f64 {
        self.price
    }

    pub fn special_edition(&self) -> bool {
        self.special_edition
    }

    pub fn error_reason(&self) -> Option<ErrorReason> {
        self.error_reason
    }

    pub fn source_image(&self) -> &str {
        &self.source_image
    }

    pub fn completeness(&self) -> Completeness {
        match self.error_reason {
            None => Completeness::Complete,
            Some(_) => Completeness::Incomplete,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.completeness() == Completeness::Complete
    }
}
