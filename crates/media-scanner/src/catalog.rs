//! The system media catalog boundary.
//!
//! A catalog is an external pre-indexed registry queried instead of a raw
//! filesystem walk. The scanner only consumes rows; whatever backs them is
//! someone else's problem. Catalog timestamps are epoch seconds and get the
//! x1000 conversion on ingest.

use anyhow::Result;

/// Transient descriptor read from the catalog before enrichment.
/// Coarse metadata, when the catalog has it, wins over re-extraction.
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    /// Plain path or `scheme://` content URI.
    pub path: String,
    pub display_name: String,
    pub size: u64,
    pub duration_ms: Option<i64>,
    pub width: Option<i64>,
    pub height: Option<i64>,
    pub mime_type: Option<String>,
    /// Epoch seconds.
    pub date_added_s: i64,
    /// Epoch seconds.
    pub date_modified_s: i64,
}

pub trait MediaCatalog: Send + Sync {
    /// All video-type entries of at least `min_size` bytes, sorted by
    /// discovery recency descending.
    fn video_entries(&self, min_size: u64) -> Result<Vec<CatalogEntry>>;
}
