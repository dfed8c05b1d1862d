//! Encoding session configuration
//!
//! [`EncodingConfig`] is a pure value object validated once at session open.
//! Validation is the single authoritative gate: a session can never reach the
//! open state with an unusable parameter set.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Highest CRF value accepted by the libx264-style quality scale.
const MAX_CRF: u8 = 51;

/// Quality setting for the encoded output.
///
/// `Lossless` maps to CRF 0; `Crf(n)` is the usual rate-factor scale where
/// lower means better quality.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    /// Mathematically lossless output (CRF 0)
    #[default]
    Lossless,
    /// Constant rate factor, 0-51
    Crf(u8),
}

impl Quality {
    /// The CRF value passed to the encoder.
    pub fn crf(&self) -> u8 {
        match self {
            Quality::Lossless => 0,
            Quality::Crf(value) => *value,
        }
    }
}

/// Configuration for one encoding session
///
/// Uses `#[serde(default)]` to allow partial config; unset fields fall back
/// to the defaults below. Width, height and the output path have no useful
/// defaults and are rejected by [`EncodingConfig::validate`] when missing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodingConfig {
    /// Path of the encoded output file
    pub output_path: PathBuf,

    /// Frame width in pixels; frozen for the whole session
    pub width: u32,

    /// Frame height in pixels; frozen for the whole session
    pub height: u32,

    /// Frames per second of the input stream
    pub frame_rate: f64,

    /// Codec identifier understood by the external encoder (e.g. "libx264")
    pub codec: String,

    /// Output quality (lossless or CRF)
    pub quality: Quality,

    /// Speed/quality tradeoff preset (e.g. "veryslow", "fast")
    pub preset: String,

    /// Encoder executable: a resolved path or a PATH-resolved command name
    pub encoder_path: PathBuf,

    /// Bound on how long closing a session waits for the encoder to exit
    /// after end-of-stream, in milliseconds
    pub finish_timeout_ms: u64,
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            output_path: PathBuf::new(),
            width: 0,
            height: 0,
            frame_rate: 30.0,
            codec: "libx264".to_string(),
            quality: Quality::Lossless,
            preset: "veryslow".to_string(),
            encoder_path: PathBuf::from("ffmpeg"),
            finish_timeout_ms: 60_000,
        }
    }
}

impl EncodingConfig {
    /// Validate the parameter set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] when the output path is empty, a
    /// dimension is zero, the frame rate is not a positive finite number,
    /// the CRF is outside the encoder's accepted range, or the codec,
    /// preset or encoder path is empty.
    pub fn validate(&self) -> Result<()> {
        if self.output_path.as_os_str().is_empty() {
            return Err(Error::InvalidConfig("output path is empty".to_string()));
        }
        if self.width == 0 || self.height == 0 {
            return Err(Error::InvalidConfig(format!(
                "frame dimensions must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        if !self.frame_rate.is_finite() || self.frame_rate <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "frame rate must be a positive number, got {}",
                self.frame_rate
            )));
        }
        if self.quality.crf() > MAX_CRF {
            return Err(Error::InvalidConfig(format!(
                "crf {} is outside the accepted range 0-{}",
                self.quality.crf(),
                MAX_CRF
            )));
        }
        if self.codec.is_empty() {
            return Err(Error::InvalidConfig("codec is empty".to_string()));
        }
        if self.preset.is_empty() {
            return Err(Error::InvalidConfig("preset is empty".to_string()));
        }
        if self.encoder_path.as_os_str().is_empty() {
            return Err(Error::InvalidConfig("encoder path is empty".to_string()));
        }
        Ok(())
    }

    /// Size of one tightly-packed RGB24 frame, in bytes.
    pub fn frame_size(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }

    /// Frame size formatted for the encoder command line, e.g. "640x480".
    pub fn size_arg(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }
}
