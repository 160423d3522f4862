//! The scan orchestrator: discover, filter, enrich, reconcile.

use crate::catalog::{CatalogEntry, MediaCatalog};
use crate::error::ScanError;
use crate::probe::{extract, FfprobeProbe, MediaProbe};
use crate::{is_content_uri, walk};
use rayon::prelude::*;
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::UNIX_EPOCH;
use thumb_cache::ThumbnailCache;
use tracing::{debug, info, warn};
use video_index::{now_ms, VideoLibrary, VideoRecord};

/// Container extensions accepted by the directory walk.
pub const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "mkv", "avi", "mov", "wmv", "flv", "webm", "m4v", "3gp", "ts", "m2ts",
];

/// Floor below which a video-extension file is treated as a non-content
/// artifact (thumbnails, temp files) and skipped.
pub const MIN_VIDEO_SIZE: u64 = 1024 * 1024;

/// MIME type for a (lowercased) container extension.
pub fn mime_type_for(extension: &str) -> &'static str {
    match extension {
        "mp4" => "video/mp4",
        "mkv" => "video/x-matroska",
        "avi" => "video/x-msvideo",
        "mov" => "video/quicktime",
        "wmv" => "video/x-ms-wmv",
        "flv" => "video/x-flv",
        "webm" => "video/webm",
        "m4v" => "video/x-m4v",
        "3gp" => "video/3gpp",
        "ts" | "m2ts" => "video/mp2t",
        _ => "video/*",
    }
}

#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub min_file_size: u64,
    pub extensions: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            min_file_size: MIN_VIDEO_SIZE,
            extensions: VIDEO_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        }
    }
}

/// Coarse-grained cancellation: checked between per-asset iterations, both
/// during the walk and during enrichment.
#[derive(Debug, Clone, Default)]
pub struct ScanCancelToken {
    cancelled: Arc<AtomicBool>,
}

impl ScanCancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Stateless orchestrator over the index, the thumbnail cache and the
/// metadata probe. Clone is cheap; everything behind it is shared.
#[derive(Clone)]
pub struct VideoScanner {
    library: Arc<VideoLibrary>,
    thumbnails: Arc<ThumbnailCache>,
    probe: Arc<dyn MediaProbe>,
    config: ScanConfig,
}

impl VideoScanner {
    pub fn new(library: Arc<VideoLibrary>, thumbnails: Arc<ThumbnailCache>) -> Self {
        Self::with_parts(
            library,
            thumbnails,
            Arc::new(FfprobeProbe::default()),
            ScanConfig::default(),
        )
    }

    pub fn with_parts(
        library: Arc<VideoLibrary>,
        thumbnails: Arc<ThumbnailCache>,
        probe: Arc<dyn MediaProbe>,
        config: ScanConfig,
    ) -> Self {
        Self {
            library,
            thumbnails,
            probe,
            config,
        }
    }

    /// Walk `root` recursively and reconcile every accepted file into the
    /// index. Returns the number of records processed.
    pub async fn scan_directory(
        &self,
        root: impl AsRef<Path>,
        cancel: Option<ScanCancelToken>,
    ) -> Result<usize, ScanError> {
        let this = self.clone();
        let root = root.as_ref().to_path_buf();
        tokio::task::spawn_blocking(move || this.scan_directory_blocking(&root, cancel.as_ref()))
            .await
            .map_err(|e| ScanError::Worker(e.to_string()))?
    }

    /// Query the media catalog and reconcile its entries into the index.
    /// Returns the number of records processed; a failed catalog query is
    /// an empty pass, not an error.
    pub async fn scan_catalog(
        &self,
        catalog: Arc<dyn MediaCatalog>,
        cancel: Option<ScanCancelToken>,
    ) -> Result<usize, ScanError> {
        let this = self.clone();
        tokio::task::spawn_blocking(move || {
            this.scan_catalog_blocking(catalog.as_ref(), cancel.as_ref())
        })
        .await
        .map_err(|e| ScanError::Worker(e.to_string()))?
    }

    /// Synchronous body of [`VideoScanner::scan_directory`].
    pub fn scan_directory_blocking(
        &self,
        root: &Path,
        cancel: Option<&ScanCancelToken>,
    ) -> Result<usize, ScanError> {
        info!(root = %root.display(), "directory scan started");

        let files = walk::walk_files(root, cancel)?;
        let candidates: Vec<Candidate> = files
            .into_iter()
            .filter_map(|(path, md)| self.accept_file(path, md))
            .collect();

        let records = self.enrich_all(candidates, cancel)?;
        let count = self.library.upsert_batch(&records)?;
        info!(root = %root.display(), count, "directory scan complete");
        Ok(count)
    }

    /// Synchronous body of [`VideoScanner::scan_catalog`].
    pub fn scan_catalog_blocking(
        &self,
        catalog: &dyn MediaCatalog,
        cancel: Option<&ScanCancelToken>,
    ) -> Result<usize, ScanError> {
        let entries = match catalog.video_entries(self.config.min_file_size) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "catalog query failed, empty pass");
                return Ok(0);
            }
        };
        info!(entries = entries.len(), "catalog scan started");

        let candidates: Vec<Candidate> = entries
            .into_iter()
            .filter_map(|entry| {
                // The floor is passed to the catalog as a hint, but not
                // every impl honors it; enforce it here.
                if entry.size < self.config.min_file_size {
                    debug!(path = entry.path, size = entry.size, "catalog entry below size floor, skipping");
                    return None;
                }
                // The catalog can lag the filesystem; drop ghosts.
                if !is_content_uri(&entry.path) && !Path::new(&entry.path).exists() {
                    debug!(path = entry.path, "catalog entry no longer on disk, skipping");
                    return None;
                }
                Some(Candidate::from_catalog(entry))
            })
            .collect();

        let records = self.enrich_all(candidates, cancel)?;
        let count = self.library.upsert_batch(&records)?;
        info!(count, "catalog scan complete");
        Ok(count)
    }

    fn accept_file(&self, path: PathBuf, md: Metadata) -> Option<Candidate> {
        if md.len() < self.config.min_file_size {
            return None;
        }
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        if !self.config.extensions.iter().any(|e| e == &ext) {
            return None;
        }
        Some(Candidate::from_file(path, md))
    }

    /// Per-asset enrichment is independent work; fan it out. A failed
    /// thumbnail or probe never drops the record.
    ///
    /// A token tripping mid-pass fails the whole batch: records enriched
    /// before the trip are discarded along with the rest, so a cancelled
    /// scan never reaches the index.
    fn enrich_all(
        &self,
        candidates: Vec<Candidate>,
        cancel: Option<&ScanCancelToken>,
    ) -> Result<Vec<VideoRecord>, ScanError> {
        let records: Vec<Option<VideoRecord>> = candidates
            .into_par_iter()
            .map(|candidate| {
                if let Some(token) = cancel {
                    if token.is_cancelled() {
                        return None;
                    }
                }
                Some(self.enrich(candidate))
            })
            .collect();

        if let Some(token) = cancel {
            if token.is_cancelled() {
                return Err(ScanError::Cancelled);
            }
        }
        Ok(records.into_iter().flatten().collect())
    }

    fn enrich(&self, candidate: Candidate) -> VideoRecord {
        let thumbnail_path = self
            .thumbnails
            .get_or_create(&candidate.path)
            .map(|p| p.to_string_lossy().into_owned());

        // The catalog never carries bitrate or frame rate, so every asset
        // is probed; catalog-supplied coarse fields win over probed ones.
        let probed = extract(self.probe.as_ref(), &candidate.path);

        let ext = Path::new(&candidate.path)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        VideoRecord {
            id: 0,
            file_name: candidate.file_name,
            folder_path: candidate.folder_path,
            file_size: candidate.size,
            mime_type: candidate
                .mime_type
                .unwrap_or_else(|| mime_type_for(&ext).to_string()),
            duration_ms: candidate.duration_ms.unwrap_or(probed.duration_ms),
            width: candidate.width.unwrap_or(probed.width),
            height: candidate.height.unwrap_or(probed.height),
            bitrate: probed.bitrate,
            frame_rate: probed.frame_rate,
            thumbnail_path,
            added_time: candidate.added_ms.unwrap_or_else(now_ms),
            modified_time: candidate.modified_ms.unwrap_or(0),
            file_path: candidate.path,
            ..Default::default()
        }
    }
}

/// A discovered asset before enrichment, from either discovery mode.
struct Candidate {
    path: String,
    file_name: String,
    folder_path: String,
    size: i64,
    mime_type: Option<String>,
    duration_ms: Option<i64>,
    width: Option<i64>,
    height: Option<i64>,
    added_ms: Option<i64>,
    modified_ms: Option<i64>,
}

impl Candidate {
    fn from_file(path: PathBuf, md: Metadata) -> Self {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let folder_path = path
            .parent()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default();
        let modified_ms = md
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_millis() as i64);

        Self {
            path: path.to_string_lossy().into_owned(),
            file_name,
            folder_path,
            size: md.len() as i64,
            mime_type: None,
            duration_ms: None,
            width: None,
            height: None,
            added_ms: None,
            modified_ms,
        }
    }

    fn from_catalog(entry: CatalogEntry) -> Self {
        let folder_path = if is_content_uri(&entry.path) {
            String::new()
        } else {
            Path::new(&entry.path)
                .parent()
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_default()
        };

        Self {
            folder_path,
            file_name: entry.display_name,
            size: entry.size as i64,
            mime_type: entry.mime_type,
            duration_ms: entry.duration_ms,
            width: entry.width,
            height: entry.height,
            // Catalog timestamps are epoch seconds.
            added_ms: Some(entry.date_added_s * 1000),
            modified_ms: Some(entry.date_modified_s * 1000),
            path: entry.path,
        }
    }
}
