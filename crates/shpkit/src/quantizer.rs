//! Nearest-palette-color quantization in CIE L*a*b* space.

use std::sync::atomic::{AtomicU16, AtomicUsize, Ordering};

use crate::color::{Lab, XyzMode};
use crate::palette::{IndexedColor, Rgb};
use crate::{Result, ShpError};

/// One slot per 24-bit RGB value.
const CACHE_SIZE: usize = 1 << 24;

/// Marks a cache slot that has not been resolved yet. Real entries are 0..=255.
const EMPTY_SLOT: u16 = u16::MAX;

/// Options for the palette quantizer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuantizerOptions {
    /// Pixels with alpha at or below this value become `transparent_index`.
    pub alpha_threshold: u8,

    /// Index written for transparent pixels.
    pub transparent_index: u8,

    /// XYZ derivation used for both pixels and candidates.
    pub xyz_mode: XyzMode,
}

impl Default for QuantizerOptions {
    fn default() -> Self {
        Self {
            alpha_threshold: 128,
            transparent_index: 0,
            xyz_mode: XyzMode::Standard,
        }
    }
}

/// Maps RGBA pixels to the perceptually closest candidate palette entry.
///
/// Each distinct RGB value is resolved once with a linear scan over the
/// candidates and memoized in a dense 2^24 table. The table is made of atomics:
/// resolving a color is deterministic, so two threads racing on the same slot
/// store the same value and `quantize` can run concurrently through `&self`.
pub struct PaletteQuantizer {
    candidates: Vec<(u8, Lab)>,
    options: QuantizerOptions,
    cache: Box<[AtomicU16]>,
    resolved: AtomicUsize,
}

impl PaletteQuantizer {
    /// Creates a quantizer over `candidates`, in the given order.
    ///
    /// Earlier candidates win ties. Returns [`ShpError::EmptyCandidateSet`] when
    /// there is nothing to match against.
    pub fn new<I>(candidates: I, options: &QuantizerOptions) -> Result<Self>
    where
        I: IntoIterator<Item = IndexedColor>,
    {
        let candidates: Vec<(u8, Lab)> = candidates
            .into_iter()
            .map(|ic| {
                let c = ic.color;
                (ic.index, Lab::from_rgb_with(c.r, c.g, c.b, options.xyz_mode))
            })
            .collect();

        if candidates.is_empty() {
            return Err(ShpError::EmptyCandidateSet);
        }

        log::debug!(
            "quantizer: {} candidates, alpha threshold {}, transparent index {}",
            candidates.len(),
            options.alpha_threshold,
            options.transparent_index
        );

        let cache: Box<[AtomicU16]> = (0..CACHE_SIZE)
            .map(|_| AtomicU16::new(EMPTY_SLOT))
            .collect();

        Ok(Self {
            candidates,
            options: options.clone(),
            cache,
            resolved: AtomicUsize::new(0),
        })
    }

    /// The options this quantizer was built with.
    #[inline]
    pub fn options(&self) -> &QuantizerOptions {
        &self.options
    }

    /// Number of candidate colors.
    #[inline]
    pub fn candidate_count(&self) -> usize {
        self.candidates.len()
    }

    /// Number of distinct RGB values resolved so far.
    pub fn cached_colors(&self) -> usize {
        self.resolved.load(Ordering::Relaxed)
    }

    /// Palette index for a single RGBA pixel.
    #[inline]
    pub fn index_of(&self, r: u8, g: u8, b: u8, a: u8) -> u8 {
        if a <= self.options.alpha_threshold {
            return self.options.transparent_index;
        }

        let slot = &self.cache[Rgb::new(r, g, b).packed() as usize];
        let cached = slot.load(Ordering::Relaxed);
        if cached != EMPTY_SLOT {
            return cached as u8;
        }

        let best = self.nearest(r, g, b);
        if slot
            .compare_exchange(EMPTY_SLOT, best as u16, Ordering::Relaxed, Ordering::Relaxed)
            .is_ok()
        {
            self.resolved.fetch_add(1, Ordering::Relaxed);
        }
        best
    }

    /// Quantizes a buffer of RGBA pixels (4 bytes per pixel) to palette indices.
    pub fn quantize(&self, rgba: &[u8]) -> Result<Vec<u8>> {
        let mut indexed = vec![0u8; rgba.len() / 4];
        self.quantize_into(rgba, &mut indexed)?;
        Ok(indexed)
    }

    /// Quantizes into a caller-provided buffer of one byte per pixel.
    pub fn quantize_into(&self, rgba: &[u8], out: &mut [u8]) -> Result<()> {
        let expected = out.len() * 4;
        if rgba.len() != expected {
            return Err(ShpError::BufferSizeMismatch {
                expected,
                actual: rgba.len(),
            });
        }

        for (dst, px) in out.iter_mut().zip(rgba.chunks_exact(4)) {
            *dst = self.index_of(px[0], px[1], px[2], px[3]);
        }
        Ok(())
    }

    /// Linear scan for the first candidate with the smallest ΔE.
    fn nearest(&self, r: u8, g: u8, b: u8) -> u8 {
        let lab = Lab::from_rgb_with(r, g, b, self.options.xyz_mode);

        let mut best_index = self.candidates[0].0;
        let mut best_delta = f64::MAX;
        for (index, candidate) in &self.candidates {
            let delta = lab.delta_e(candidate);
            if delta < best_delta {
                best_delta = delta;
                best_index = *index;
            }
        }
        best_index
    }
}

impl std::fmt::Debug for PaletteQuantizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaletteQuantizer")
            .field("candidates", &self.candidates.len())
            .field("options", &self.options)
            .field("cached_colors", &self.cached_colors())
            .finish()
    }
}
