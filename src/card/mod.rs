//! Card records, the reference catalog, and heuristic field parsing.

pub mod catalog;
pub mod parser;
pub mod record;

pub use catalog::ReferenceCatalog;
pub use parser::{parse_card, CardText, ParseRules};
pub use record::{CardRecord, ErrorReason};
