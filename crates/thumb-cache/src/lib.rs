//! Content-addressed disk cache of video preview thumbnails.
//!
//! Artifacts are JPEG files named `<hex-digest>.jpg` under a dedicated cache
//! directory, keyed by a deterministic hash of the asset's locator string.
//! Generation is lazy: the first request for a key captures a frame near the
//! one-second mark, fits it into 320x180, and writes the encoded result
//! atomically. A key that already has an artifact is a hit and costs one
//! existence check.
//!
//! Concurrent misses for the same key may both generate; the atomic rename
//! makes that a harmless last-write-wins since both outputs are
//! content-equivalent.

pub mod cache;
pub mod frame;

pub use cache::{CacheError, ThumbnailCache};
pub use frame::{FfmpegFrameSource, FrameError, FrameSource};

use sha2::{Digest, Sha256};
use std::time::Duration;

/// Thumbnail generation parameters. The defaults are the wire contract:
/// 320x180 aspect-preserving fit, JPEG quality 85, frame taken near the
/// one-second mark.
#[derive(Debug, Clone)]
pub struct ThumbnailConfig {
    pub target_width: u32,
    pub target_height: u32,
    pub jpeg_quality: u8,
    pub capture_offset: Duration,
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            target_width: 320,
            target_height: 180,
            jpeg_quality: 85,
            capture_offset: Duration::from_secs(1),
        }
    }
}

/// Deterministic identity key for an asset locator (plain path or
/// `scheme://` URI).
///
/// SHA-256 truncated to 128 bits, hex-encoded: fixed-length, filesystem-safe
/// and stable across runs and processes. The truncation keeps MD5-class
/// collision odds, which is an accepted trade-off for a cache key that is
/// not a security boundary.
pub fn identity_key(locator: &str) -> String {
    let digest = Sha256::digest(locator.as_bytes());
    hex::encode(&digest[..16])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn identity_key_is_deterministic() {
        let a = identity_key("/videos/movie.mp4");
        let b = identity_key("/videos/movie.mp4");
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn identity_key_differs_per_locator() {
        assert_ne!(
            identity_key("/videos/movie.mp4"),
            identity_key("/videos/movie2.mp4")
        );
        assert_ne!(
            identity_key("content://media/external/video/1"),
            identity_key("content://media/external/video/2")
        );
    }

    #[test]
    fn no_collisions_across_ten_thousand_paths() {
        let mut seen = HashSet::new();
        for i in 0..10_000 {
            assert!(seen.insert(identity_key(&format!("/videos/dir_{}/clip_{i}.mp4", i % 37))));
        }
        assert_eq!(seen.len(), 10_000);
    }
}
