//! The on-disk artifact store.

use crate::frame::{encode_jpeg, scale_frame, FrameError, FrameSource};
use crate::{identity_key, FfmpegFrameSource, ThumbnailConfig};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no platform cache directory")]
    NoCacheDir,
}

/// Disk cache of `<hex-digest>.jpg` artifacts. Cheap to share behind an
/// `Arc`; all operations take `&self`.
pub struct ThumbnailCache {
    cache_dir: PathBuf,
    config: ThumbnailConfig,
    frames: Arc<dyn FrameSource>,
}

impl ThumbnailCache {
    /// Cache under the platform cache dir (`<cache dir>/vidvault/thumbnails`),
    /// capturing frames through `ffmpeg`.
    pub fn new() -> Result<Self, CacheError> {
        let base = dirs::cache_dir().ok_or(CacheError::NoCacheDir)?;
        Self::with_dir(base.join("vidvault").join("thumbnails"))
    }

    /// Cache rooted at an explicit directory, `ffmpeg` capture.
    pub fn with_dir(cache_dir: impl Into<PathBuf>) -> Result<Self, CacheError> {
        Self::with_frame_source(
            cache_dir,
            ThumbnailConfig::default(),
            Arc::new(FfmpegFrameSource::default()),
        )
    }

    /// Fully injected constructor; the one tests use.
    pub fn with_frame_source(
        cache_dir: impl Into<PathBuf>,
        config: ThumbnailConfig,
        frames: Arc<dyn FrameSource>,
    ) -> Result<Self, CacheError> {
        let cache_dir = cache_dir.into();
        fs::create_dir_all(&cache_dir)?;
        Ok(Self {
            cache_dir,
            config,
            frames,
        })
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Where the artifact for `locator` lives (whether or not it exists yet).
    pub fn artifact_path(&self, locator: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.jpg", identity_key(locator)))
    }

    /// Return the artifact for `locator`, generating it on a miss.
    ///
    /// A hit costs one existence check and never touches the decoder. Any
    /// capture, scale, encode or write failure yields `None`; the failure is
    /// logged here and the asset stays indexable without a preview.
    pub fn get_or_create(&self, locator: &str) -> Option<PathBuf> {
        let path = self.artifact_path(locator);
        if path.exists() {
            return Some(path);
        }

        match self.generate(locator, &path) {
            Ok(()) => {
                debug!(locator, artifact = %path.display(), "thumbnail generated");
                Some(path)
            }
            Err(e) => {
                warn!(locator, error = %e, "thumbnail generation failed");
                None
            }
        }
    }

    fn generate(&self, locator: &str, path: &Path) -> Result<(), FrameError> {
        let frame = self.frames.capture(locator, self.config.capture_offset)?;
        let scaled = scale_frame(frame, self.config.target_width, self.config.target_height);
        let bytes = encode_jpeg(&scaled, self.config.jpeg_quality)?;

        // Write-then-rename keeps readers from ever seeing a partial
        // artifact and makes concurrent generation last-write-wins.
        let mut tmp = tempfile::NamedTempFile::new_in(&self.cache_dir)?;
        tmp.write_all(&bytes)?;
        tmp.persist(path).map_err(|e| FrameError::Io(e.error))?;
        Ok(())
    }

    /// Remove the artifact for `locator`. Returns true when it is absent
    /// afterwards, whether or not it existed.
    pub fn delete(&self, locator: &str) -> bool {
        match fs::remove_file(self.artifact_path(locator)) {
            Ok(()) => true,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
            Err(e) => {
                warn!(locator, error = %e, "failed to delete thumbnail");
                false
            }
        }
    }

    /// Remove every artifact. Returns the number of files removed.
    pub fn clear_all(&self) -> usize {
        let entries = match fs::read_dir(&self.cache_dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "failed to read thumbnail directory");
                return 0;
            }
        };
        entries
            .flatten()
            .filter(|e| e.path().is_file())
            .filter(|e| fs::remove_file(e.path()).is_ok())
            .count()
    }

    /// Total bytes of all artifacts on disk.
    pub fn total_size(&self) -> u64 {
        let entries = match fs::read_dir(&self.cache_dir) {
            Ok(entries) => entries,
            Err(_) => return 0,
        };
        entries
            .flatten()
            .filter_map(|e| e.metadata().ok())
            .filter(|m| m.is_file())
            .map(|m| m.len())
            .sum()
    }
}
