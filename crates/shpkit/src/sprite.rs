//! End-to-end sprite encoding: RGBA frames in, SHP bytes out.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use rayon::prelude::*;

use crate::lcw::lcw_encode;
use crate::quantizer::PaletteQuantizer;
use crate::shp::write_shp;
use crate::{Result, ShpError};

/// One decoded animation frame of RGBA pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbaFrame {
    width: u16,
    height: u16,
    pixels: Vec<u8>,
}

impl RgbaFrame {
    /// Wraps RGBA pixel data (4 bytes per pixel, row-major).
    ///
    /// Both dimensions must be non-zero and fit the 16-bit SHP header fields.
    pub fn new(width: usize, height: usize, pixels: Vec<u8>) -> Result<Self> {
        let (w, h) = match (u16::try_from(width), u16::try_from(height)) {
            (Ok(w), Ok(h)) if w > 0 && h > 0 => (w, h),
            _ => return Err(ShpError::InvalidDimensions { width, height }),
        };

        let expected = width * height * 4;
        if pixels.len() != expected {
            return Err(ShpError::BufferSizeMismatch {
                expected,
                actual: pixels.len(),
            });
        }

        Ok(Self {
            width: w,
            height: h,
            pixels,
        })
    }

    #[inline]
    pub fn width(&self) -> u16 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u16 {
        self.height
    }

    #[inline]
    pub fn dimensions(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    #[inline]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}

/// Common size of all frames, or the first frame that differs.
fn frame_size(frames: &[RgbaFrame]) -> Result<(u16, u16)> {
    let first = frames
        .first()
        .ok_or(ShpError::InvalidDimensions {
            width: 0,
            height: 0,
        })?;
    let (expected_width, expected_height) = first.dimensions();

    for (frame, f) in frames.iter().enumerate().skip(1) {
        if f.dimensions() != (expected_width, expected_height) {
            return Err(ShpError::InvalidFrameSize {
                frame,
                width: f.width,
                height: f.height,
                expected_width,
                expected_height,
            });
        }
    }
    Ok((expected_width, expected_height))
}

/// Quantizes and LCW-compresses each frame. Frames are processed in parallel.
fn compress_frames(frames: &[RgbaFrame], quantizer: &PaletteQuantizer) -> Result<Vec<Vec<u8>>> {
    let compressed = frames
        .par_iter()
        .map(|frame| {
            let indexed = quantizer.quantize(&frame.pixels)?;
            Ok(lcw_encode(&indexed))
        })
        .collect::<Result<Vec<_>>>()?;

    if log::log_enabled!(log::Level::Debug) {
        for (i, data) in compressed.iter().enumerate() {
            log::debug!("frame {}: {} bytes compressed", i, data.len());
        }
        log::debug!("quantizer resolved {} distinct colors", quantizer.cached_colors());
    }
    Ok(compressed)
}

/// Encodes `frames` into a complete SHP file in memory.
///
/// All frames must have the dimensions of the first one; a mismatch fails with
/// [`ShpError::InvalidFrameSize`] before any pixel is quantized.
pub fn encode_sprite(frames: &[RgbaFrame], quantizer: &PaletteQuantizer) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    write_sprite(&mut out, frames, quantizer)?;
    Ok(out)
}

/// Encodes `frames` and writes the SHP container to `w`.
pub fn write_sprite<W: Write>(
    w: &mut W,
    frames: &[RgbaFrame],
    quantizer: &PaletteQuantizer,
) -> Result<()> {
    let (width, height) = frame_size(frames)?;
    let compressed = compress_frames(frames, quantizer)?;
    write_shp(w, &compressed, width, height)
}

/// Encodes `frames` and writes the SHP container to a file at `path`.
///
/// The file is only created once every frame has been compressed.
pub fn write_sprite_file(
    path: impl AsRef<Path>,
    frames: &[RgbaFrame],
    quantizer: &PaletteQuantizer,
) -> Result<()> {
    let (width, height) = frame_size(frames)?;
    let compressed = compress_frames(frames, quantizer)?;

    let mut writer = BufWriter::new(File::create(path.as_ref())?);
    write_shp(&mut writer, &compressed, width, height)?;
    writer.flush()?;
    Ok(())
}
