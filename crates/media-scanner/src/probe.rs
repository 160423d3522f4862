//! Technical metadata extraction.
//!
//! `MediaProbe` is the decoder boundary; the production impl shells out to
//! `ffprobe` and parses its JSON. [`extract`] is what the scan pipeline
//! calls: it collapses every failure into the all-zero metadata value so
//! "unknown" is a typed state and a bad container never aborts a pass.

use serde_json::Value;
use std::process::Command;
use thiserror::Error;
use tracing::warn;

/// Container-level technical metadata. 0 / 0.0 means unknown.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TechnicalMetadata {
    pub duration_ms: i64,
    pub width: i64,
    pub height: i64,
    pub bitrate: i64,
    pub frame_rate: f64,
}

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("probe failed for {locator}: {detail}")]
    Probe { locator: String, detail: String },

    #[error("unparseable probe output: {0}")]
    Parse(#[from] serde_json::Error),
}

pub trait MediaProbe: Send + Sync {
    fn probe(&self, locator: &str) -> Result<TechnicalMetadata, ProbeError>;
}

/// Best-effort extraction: any failure degrades to the unknown sentinel and
/// the asset stays indexable with incomplete metadata.
pub fn extract(probe: &dyn MediaProbe, locator: &str) -> TechnicalMetadata {
    match probe.probe(locator) {
        Ok(meta) => meta,
        Err(e) => {
            warn!(locator, error = %e, "metadata extraction failed");
            TechnicalMetadata::default()
        }
    }
}

/// Metadata via the `ffprobe` binary. The child process is the decoder
/// handle; `output()` reaps it on every path out of here.
#[derive(Debug, Clone)]
pub struct FfprobeProbe {
    binary: String,
}

impl Default for FfprobeProbe {
    fn default() -> Self {
        Self {
            binary: "ffprobe".to_string(),
        }
    }
}

impl FfprobeProbe {
    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl MediaProbe for FfprobeProbe {
    fn probe(&self, locator: &str) -> Result<TechnicalMetadata, ProbeError> {
        let output = Command::new(&self.binary)
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
                locator,
            ])
            .output()?;

        if !output.status.success() {
            return Err(ProbeError::Probe {
                locator: locator.to_string(),
                detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let json: Value = serde_json::from_slice(&output.stdout)?;
        Ok(parse_probe_output(&json))
    }
}

fn parse_probe_output(json: &Value) -> TechnicalMetadata {
    let mut meta = TechnicalMetadata::default();

    let format = &json["format"];
    if let Some(seconds) = field_f64(&format["duration"]) {
        meta.duration_ms = (seconds * 1000.0).round() as i64;
    }
    if let Some(bitrate) = field_f64(&format["bit_rate"]) {
        meta.bitrate = bitrate.round() as i64;
    }

    let video_stream = json["streams"]
        .as_array()
        .and_then(|streams| streams.iter().find(|s| s["codec_type"] == "video"));
    if let Some(stream) = video_stream {
        meta.width = stream["width"].as_i64().unwrap_or(0);
        meta.height = stream["height"].as_i64().unwrap_or(0);
        meta.frame_rate = fraction(&stream["avg_frame_rate"])
            .or_else(|| fraction(&stream["r_frame_rate"]))
            .unwrap_or(0.0);
    }

    meta
}

/// ffprobe reports numbers as JSON strings in `format` but as numbers in
/// stream fields; accept both.
fn field_f64(value: &Value) -> Option<f64> {
    value
        .as_f64()
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
}

/// Frame rates come as "num/den" fractions, e.g. "30000/1001".
fn fraction(value: &Value) -> Option<f64> {
    let s = value.as_str()?;
    let (num, den) = s.split_once('/')?;
    let num: f64 = num.trim().parse().ok()?;
    let den: f64 = den.trim().parse().ok()?;
    if den == 0.0 || num == 0.0 {
        return None;
    }
    Some(num / den)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_a_typical_probe_report() {
        let report = json!({
            "format": { "duration": "125.433000", "bit_rate": "4521000" },
            "streams": [
                { "codec_type": "audio", "bit_rate": "128000" },
                {
                    "codec_type": "video",
                    "width": 1920,
                    "height": 1080,
                    "avg_frame_rate": "30000/1001",
                    "r_frame_rate": "30000/1001"
                }
            ]
        });

        let meta = parse_probe_output(&report);
        assert_eq!(meta.duration_ms, 125_433);
        assert_eq!(meta.bitrate, 4_521_000);
        assert_eq!(meta.width, 1920);
        assert_eq!(meta.height, 1080);
        assert!((meta.frame_rate - 29.97).abs() < 0.01);
    }

    #[test]
    fn missing_fields_stay_at_unknown() {
        let meta = parse_probe_output(&json!({}));
        assert_eq!(meta, TechnicalMetadata::default());

        // Audio-only container: no video stream to read.
        let meta = parse_probe_output(&json!({
            "format": { "duration": "10.0" },
            "streams": [ { "codec_type": "audio" } ]
        }));
        assert_eq!(meta.duration_ms, 10_000);
        assert_eq!(meta.width, 0);
        assert_eq!(meta.frame_rate, 0.0);
    }

    #[test]
    fn zero_fraction_is_unknown() {
        let meta = parse_probe_output(&json!({
            "streams": [ { "codec_type": "video", "width": 640, "height": 480,
                           "avg_frame_rate": "0/0", "r_frame_rate": "25/1" } ]
        }));
        assert_eq!(meta.frame_rate, 25.0);
    }

    struct BrokenProbe;

    impl MediaProbe for BrokenProbe {
        fn probe(&self, locator: &str) -> Result<TechnicalMetadata, ProbeError> {
            Err(ProbeError::Probe {
                locator: locator.to_string(),
                detail: "corrupt header".to_string(),
            })
        }
    }

    #[test]
    fn extract_collapses_failure_to_unknown() {
        let meta = extract(&BrokenProbe, "/videos/bad.mp4");
        assert_eq!(meta, TechnicalMetadata::default());
    }
}
