//! 256-entry RGB palettes and the candidate colors offered to the quantizer.

use std::path::Path;

use crate::{Result, ShpError, PALETTE_SIZE};

/// Size in bytes of a raw palette file: 256 RGB triples.
pub const PALETTE_BYTES: usize = PALETTE_SIZE * 3;

/// Largest channel value in a 6-bit VGA palette.
const VGA_CHANNEL_MAX: u8 = 63;

/// Color type for palette entries (RGB).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    #[inline]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Packs the color as `0xRRGGBB`.
    #[inline]
    pub const fn packed(self) -> u32 {
        ((self.r as u32) << 16) | ((self.g as u32) << 8) | self.b as u32
    }
}

/// A palette entry offered to the quantizer as a match target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexedColor {
    pub index: u8,
    pub color: Rgb,
}

impl IndexedColor {
    #[inline]
    pub const fn new(index: u8, color: Rgb) -> Self {
        Self { index, color }
    }
}

/// An ordered table of 256 RGB colors.
///
/// Index 0 is the "empty" slot of the sprite convention and is loaded as black.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    colors: [Rgb; PALETTE_SIZE],
}

impl Palette {
    /// Builds a palette from 256 colors.
    pub fn new(colors: [Rgb; PALETTE_SIZE]) -> Self {
        Self { colors }
    }

    /// Parses a 6-bit VGA palette (768 bytes, channels 0..=63).
    ///
    /// Each channel is scaled by 4 to the 8-bit range. Entry 0 is always black.
    pub fn from_pal_bytes(data: &[u8]) -> Result<Self> {
        check_len(data)?;

        // entry 0 is never read
        let invalid = data[3..].iter().position(|&c| c > VGA_CHANNEL_MAX);
        if let Some(pos) = invalid.map(|p| p + 3) {
            return Err(ShpError::InvalidPalette(format!(
                "channel {} of entry {} is {}, 6-bit palettes stop at {}",
                pos % 3,
                pos / 3,
                data[pos],
                VGA_CHANNEL_MAX
            )));
        }

        let mut colors = [Rgb::default(); PALETTE_SIZE];
        for (color, rgb) in colors.iter_mut().zip(data.chunks_exact(3)).skip(1) {
            *color = Rgb::new(rgb[0] << 2, rgb[1] << 2, rgb[2] << 2);
        }
        Ok(Self { colors })
    }

    /// Parses 768 bytes of 8-bit RGB triples without scaling.
    pub fn from_rgb_bytes(data: &[u8]) -> Result<Self> {
        check_len(data)?;

        let mut colors = [Rgb::default(); PALETTE_SIZE];
        for (color, rgb) in colors.iter_mut().zip(data.chunks_exact(3)) {
            *color = Rgb::new(rgb[0], rgb[1], rgb[2]);
        }
        Ok(Self { colors })
    }

    /// Reads a 6-bit `.pal` file from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read(path.as_ref())?;
        log::debug!("loaded palette '{}'", path.as_ref().display());
        Self::from_pal_bytes(&data)
    }

    /// Color at `index`.
    #[inline]
    pub fn color(&self, index: u8) -> Rgb {
        self.colors[index as usize]
    }

    /// All 256 colors in index order.
    #[inline]
    pub fn colors(&self) -> &[Rgb; PALETTE_SIZE] {
        &self.colors
    }

    /// Every entry whose index is not listed in `exclude`, in ascending index order.
    ///
    /// The excluded slots (typically team colors that are remapped at runtime)
    /// stay in the palette for decoding; they are only withheld from matching.
    pub fn candidates(&self, exclude: &[u8]) -> Vec<IndexedColor> {
        let mut excluded = [false; PALETTE_SIZE];
        for &index in exclude {
            if excluded[index as usize] {
                log::warn!("palette index {index} excluded more than once");
            }
            excluded[index as usize] = true;
        }

        self.colors
            .iter()
            .enumerate()
            .filter(|(index, _)| !excluded[*index])
            .map(|(index, &color)| IndexedColor::new(index as u8, color))
            .collect()
    }

    /// Converts indexed pixels back to RGBA.
    ///
    /// Pixels equal to `transparent_index` get alpha 0; all others are opaque.
    pub fn expand(&self, indices: &[u8], transparent_index: u8) -> Vec<u8> {
        let mut rgba = Vec::with_capacity(indices.len() * 4);
        for &index in indices {
            let c = self.color(index);
            let alpha = if index == transparent_index { 0 } else { 255 };
            rgba.extend_from_slice(&[c.r, c.g, c.b, alpha]);
        }
        rgba
    }
}

impl Default for Palette {
    /// An all-black palette.
    fn default() -> Self {
        Self {
            colors: [Rgb::default(); PALETTE_SIZE],
        }
    }
}

fn check_len(data: &[u8]) -> Result<()> {
    if data.len() != PALETTE_BYTES {
        return Err(ShpError::InvalidPalette(format!(
            "expected {} bytes but found {}",
            PALETTE_BYTES,
            data.len()
        )));
    }
    Ok(())
}
