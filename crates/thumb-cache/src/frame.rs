//! Frame capture, scaling and JPEG encoding.
//!
//! `FrameSource` is the seam between the cache and the decoder: production
//! shells out to `ffmpeg`, tests substitute a counting stub. The subprocess
//! is the scoped decoder handle — it either produced a frame or it is gone
//! by the time `capture` returns.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;
use std::process::Command;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("decoder failed for {locator}: {detail}")]
    Decode { locator: String, detail: String },

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

/// Produces one representative frame for an asset locator.
pub trait FrameSource: Send + Sync {
    /// Decode a single frame near `offset` into the asset. Snapping to the
    /// closest sync point instead of the exact timestamp is acceptable.
    fn capture(&self, locator: &str, offset: Duration) -> Result<DynamicImage, FrameError>;
}

/// Frame capture via the `ffmpeg` binary.
///
/// Seeking with `-ss` before the input lands on the nearest keyframe at or
/// before the requested offset, which is the fast path and all a preview
/// needs. The frame comes back as PNG on stdout so nothing touches disk.
#[derive(Debug, Clone)]
pub struct FfmpegFrameSource {
    binary: String,
}

impl Default for FfmpegFrameSource {
    fn default() -> Self {
        Self {
            binary: "ffmpeg".to_string(),
        }
    }
}

impl FfmpegFrameSource {
    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl FrameSource for FfmpegFrameSource {
    fn capture(&self, locator: &str, offset: Duration) -> Result<DynamicImage, FrameError> {
        let offset_s = format!("{:.3}", offset.as_secs_f64());
        let output = Command::new(&self.binary)
            .args([
                "-v", "error", "-ss", &offset_s, "-i", locator, "-frames:v", "1", "-f",
                "image2pipe", "-vcodec", "png", "-",
            ])
            .output()?;

        if !output.status.success() {
            return Err(FrameError::Decode {
                locator: locator.to_string(),
                detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        if output.stdout.is_empty() {
            return Err(FrameError::Decode {
                locator: locator.to_string(),
                detail: "no frame produced".to_string(),
            });
        }

        Ok(image::load_from_memory(&output.stdout)?)
    }
}

/// Dimensions after an aspect-preserving fit into `target`:
/// scale = min(target_w / src_w, target_h / src_h), applied in both
/// directions (small sources are scaled up to the preview size).
pub(crate) fn fit_dimensions(
    src_w: u32,
    src_h: u32,
    target_w: u32,
    target_h: u32,
) -> (u32, u32) {
    let scale = f64::min(
        target_w as f64 / src_w.max(1) as f64,
        target_h as f64 / src_h.max(1) as f64,
    );
    let w = ((src_w as f64 * scale).round() as u32).max(1);
    let h = ((src_h as f64 * scale).round() as u32).max(1);
    (w, h)
}

pub(crate) fn scale_frame(frame: DynamicImage, target_w: u32, target_h: u32) -> DynamicImage {
    let (w, h) = fit_dimensions(frame.width(), frame.height(), target_w, target_h);
    if (w, h) == (frame.width(), frame.height()) {
        return frame;
    }
    frame.resize_exact(w, h, FilterType::Lanczos3)
}

pub(crate) fn encode_jpeg(frame: &DynamicImage, quality: u8) -> Result<Vec<u8>, FrameError> {
    let rgb = frame.to_rgb8();
    let mut buf = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buf, quality);
    encoder.encode_image(&rgb)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_shrinks_wide_sources_to_target() {
        assert_eq!(fit_dimensions(1920, 1080, 320, 180), (320, 180));
        assert_eq!(fit_dimensions(1280, 720, 320, 180), (320, 180));
    }

    #[test]
    fn fit_preserves_aspect_of_narrow_sources() {
        // 4:3 source: height is the limiting side.
        assert_eq!(fit_dimensions(640, 480, 320, 180), (240, 180));
        // Vertical video.
        assert_eq!(fit_dimensions(1080, 1920, 320, 180), (101, 180));
    }

    #[test]
    fn fit_upscales_small_sources() {
        assert_eq!(fit_dimensions(160, 90, 320, 180), (320, 180));
    }

    #[test]
    fn encoded_jpeg_decodes_back_at_fitted_size() {
        let frame = DynamicImage::new_rgb8(1920, 1080);
        let scaled = scale_frame(frame, 320, 180);
        let bytes = encode_jpeg(&scaled, 85).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (320, 180));
    }
}
