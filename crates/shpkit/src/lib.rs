//! # shpkit
//!
//! A Rust library for building legacy SHP sprite files from true-color frames.
//!
//! ## Features
//!
//! - **Quantizer**: Maps RGBA pixels onto a fixed 256-color palette using CIE L*a*b*
//!   distance, with a dense per-color cache shared safely between threads
//! - **LCW codec**: Decoder for all five LCW instruction forms and a conforming
//!   literal/fill encoder
//! - **Container**: Byte-exact SHP writer and a reader for inspecting existing files
//!
//! ## Quick Start
//!
//! ### Encoding frames to SHP
//!
//! ```ignore
//! use shpkit::{encode_sprite, Palette, PaletteQuantizer, QuantizerOptions, RgbaFrame};
//!
//! let palette = Palette::load("temperat.pal")?;
//! let quantizer = PaletteQuantizer::new(palette.candidates(&[0]), &QuantizerOptions::default())?;
//! let frame = RgbaFrame::new(2, 1, vec![255u8, 0, 0, 255, 0, 255, 0, 255])?;
//! let shp = encode_sprite(&[frame], &quantizer)?;
//! ```
//!
//! ### Reading an SHP file
//!
//! ```ignore
//! use shpkit::ShpFile;
//!
//! let data = std::fs::read("unit.shp")?;
//! let shp = ShpFile::parse(&data)?;
//! let indices = shp.decode_frame(0)?;
//! // indices contains width * height palette indices
//! ```

use thiserror::Error;

pub mod color;
pub mod lcw;
pub mod palette;
pub mod quantizer;
pub mod shp;
pub mod sprite;

pub use color::{delta_e, Lab, XyzMode};
pub use lcw::{lcw_decode, lcw_decode_to_vec, lcw_encode};
pub use palette::{IndexedColor, Palette, Rgb};
pub use quantizer::{PaletteQuantizer, QuantizerOptions};
pub use shp::{write_shp, write_shp_to_vec, FrameDescriptor, FrameFormat, ShpFile, ShpHeader};
pub use sprite::{encode_sprite, write_sprite, write_sprite_file, RgbaFrame};

/// Errors that can occur while quantizing, compressing or laying out sprites.
#[derive(Debug, Error)]
pub enum ShpError {
    /// A frame does not share the dimensions of the first frame
    #[error("invalid frame size: frame {frame} is {width}x{height}, expected {expected_width}x{expected_height}")]
    InvalidFrameSize {
        frame: usize,
        width: u16,
        height: u16,
        expected_width: u16,
        expected_height: u16,
    },

    /// The quantizer has no colors to choose from
    #[error("quantizer needs at least one candidate color")]
    EmptyCandidateSet,

    /// LCW data references bytes that do not exist or ends without a terminator
    #[error("corrupt LCW stream: {0}")]
    CorruptStream(String),

    /// Invalid image dimensions (zero, or too large for a 16-bit field)
    #[error("invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    /// Buffer size doesn't match expected size for dimensions
    #[error("buffer size mismatch: expected {expected} bytes, got {actual}")]
    BufferSizeMismatch { expected: usize, actual: usize },

    /// Palette data is not a 256-entry palette
    #[error("invalid palette: {0}")]
    InvalidPalette(String),

    /// SHP header or frame table cannot be parsed
    #[error("invalid SHP data: {0}")]
    InvalidContainer(String),

    /// Frame stored in a format this crate does not decode
    #[error("unsupported frame format 0x{0:02x}")]
    UnsupportedFormat(u8),

    /// Too many frames, or frame data past the 24-bit offset limit
    #[error("sprite does not fit the SHP offset table")]
    ContainerTooLarge,

    /// The destination could not be written
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result type for SHP operations.
pub type Result<T> = core::result::Result<T, ShpError>;

/// Largest palette: every SHP frame stores one byte per pixel.
pub(crate) const PALETTE_SIZE: usize = 256;
