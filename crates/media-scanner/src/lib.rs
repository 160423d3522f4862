//! Discovery and reconciliation of local videos into the library index.
//!
//! Two discovery modes feed the same pipeline: a recursive directory walk
//! and a query against an external media catalog. Each accepted candidate
//! is enriched with a thumbnail and technical metadata, then the whole pass
//! lands in the index as one batched, merge-on-conflict upsert.
//!
//! The scanner holds no persistent state of its own; a pass is idempotent
//! and an asset that failed enrichment simply gets another chance on the
//! next pass.

mod catalog;
mod error;
mod probe;
mod scanner;
mod walk;

pub use catalog::{CatalogEntry, MediaCatalog};
pub use error::ScanError;
pub use probe::{extract, FfprobeProbe, MediaProbe, ProbeError, TechnicalMetadata};
pub use scanner::{
    mime_type_for, ScanCancelToken, ScanConfig, VideoScanner, MIN_VIDEO_SIZE, VIDEO_EXTENSIONS,
};

/// Whether a locator is a `scheme://` content URI rather than a plain
/// filesystem path. Dispatch is by prefix sniffing only; URI locators skip
/// filesystem existence checks and go straight to the decoder.
pub fn is_content_uri(locator: &str) -> bool {
    match locator.split_once("://") {
        Some((scheme, _)) => {
            !scheme.is_empty()
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => false,
    }
}
