//! Raw frame payloads
//!
//! A [`FrameBuffer`] is one image serialized for transport: `width*height*3`
//! bytes of tightly-packed row-major RGB24, validated at construction so the
//! write path never has to re-check pixel arithmetic.

use bytes::Bytes;

use crate::error::{Error, Result};

/// One validated, immutable RGB24 frame.
///
/// The payload is a [`Bytes`] block, so cloning the buffer never copies the
/// pixels and the transport holds a stable view for the duration of the
/// write.
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    data: Bytes,
    width: u32,
    height: u32,
}

impl FrameBuffer {
    /// Build a frame from raw pixel bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShapeMismatch`] if `pixels` is not exactly
    /// `width * height * 3` bytes long.
    pub fn from_rgb(pixels: impl Into<Bytes>, width: u32, height: u32) -> Result<Self> {
        let data = pixels.into();
        let expected = width as usize * height as usize * 3;
        if data.len() != expected {
            return Err(Error::ShapeMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Build a single-color frame. Used for test patterns.
    pub fn solid(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let pixel_count = width as usize * height as usize;
        let mut data = Vec::with_capacity(pixel_count * 3);
        for _ in 0..pixel_count {
            data.extend_from_slice(&rgb);
        }
        Self {
            data: Bytes::from(data),
            width,
            height,
        }
    }

    /// Frame width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Frame height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True for a zero-pixel frame (never constructible via `from_rgb` with
    /// positive dimensions).
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The raw payload, tightly packed row-major RGB24.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}
