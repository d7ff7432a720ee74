//! shpkit - Convert image frames to SHP sprites and back
//!
//! A command-line tool for building legacy indexed-color sprite files.

use clap::{Parser, Subcommand};
use shpkit::{
    write_sprite_file, FrameFormat, Palette, PaletteQuantizer, QuantizerOptions, RgbaFrame,
    ShpError, ShpFile, XyzMode,
};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "shpkit")]
#[command(version)]
#[command(about = "Convert image frames to SHP sprites and back", long_about = None)]
struct Cli {
    /// Print debug diagnostics (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a series of images (one per frame) to an SHP file
    Encode {
        /// Input image files (PNG, BMP), in frame order
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Palette file (768-byte 6-bit PAL)
        #[arg(short, long)]
        palette: PathBuf,

        /// Comma separated palette indices reserved for team colors
        #[arg(short, long, value_delimiter = ',')]
        team_colors: Vec<u8>,

        /// Output SHP file (default: first input with .shp appended)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Pixels with alpha at or below this value become transparent
        #[arg(long, default_value = "128")]
        alpha_threshold: u8,

        /// Palette index written for transparent pixels
        #[arg(long, default_value = "0")]
        transparent_index: u8,

        /// Match colors the way older SHP tools did
        #[arg(long)]
        legacy_xyz: bool,
    },

    /// Extract every frame of an SHP file as PNG
    Decode {
        /// Input SHP file
        input: PathBuf,

        /// Palette file (768-byte 6-bit PAL)
        #[arg(short, long)]
        palette: PathBuf,

        /// Directory for the PNG frames (default: next to the input)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Palette index rendered as transparent
        #[arg(long, default_value = "0")]
        transparent_index: u8,
    },

    /// Print the header and frame table of an SHP file
    Info {
        /// Input SHP file
        input: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut logger = env_logger::Builder::from_default_env();
    if cli.verbose {
        logger.filter_level(log::LevelFilter::Debug);
    }
    logger.init();

    match cli.command {
        Commands::Encode {
            inputs,
            palette,
            team_colors,
            output,
            alpha_threshold,
            transparent_index,
            legacy_xyz,
        } => {
            let pal = load_palette(&palette)?;

            let mut excluded = team_colors;
            if !excluded.contains(&transparent_index) {
                excluded.push(transparent_index);
            }
            let options = QuantizerOptions {
                alpha_threshold,
                transparent_index,
                xyz_mode: if legacy_xyz {
                    XyzMode::Legacy
                } else {
                    XyzMode::Standard
                },
            };
            let quantizer = PaletteQuantizer::new(pal.candidates(&excluded), &options)?;

            let frames = inputs
                .iter()
                .map(|path| load_frame(path))
                .collect::<Result<Vec<_>, _>>()?;

            let output_path = output.unwrap_or_else(|| {
                let mut name = inputs[0].as_os_str().to_owned();
                name.push(".shp");
                PathBuf::from(name)
            });

            eprintln!(
                "Encoding {} frames ({}x{}) with {} palette colors, transparent index {}",
                frames.len(),
                frames[0].width(),
                frames[0].height(),
                quantizer.candidate_count(),
                quantizer.options().transparent_index
            );

            write_sprite_file(&output_path, &frames, &quantizer).map_err(|e| match e {
                ShpError::InvalidFrameSize {
                    frame,
                    width,
                    height,
                    expected_width,
                    expected_height,
                } => format!(
                    "All input files must be of the same size. The first was {}x{} but '{}' is {}x{}",
                    expected_width,
                    expected_height,
                    inputs[frame].display(),
                    width,
                    height
                ),
                e => format!("Failed to write '{}': {}", output_path.display(), e),
            })?;

            let written = fs::metadata(&output_path)?.len();
            eprintln!("Written {} bytes to '{}'", written, output_path.display());
        }

        Commands::Decode {
            input,
            palette,
            output_dir,
            transparent_index,
        } => {
            let pal = load_palette(&palette)?;
            let data = read_file(&input)?;
            let shp = ShpFile::parse(&data)?;

            let dir = output_dir.unwrap_or_else(|| {
                input
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_default()
            });
            fs::create_dir_all(&dir)?;
            let stem = input
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "frame".to_string());

            eprintln!(
                "Decoding {} frames ({}x{})",
                shp.frame_count(),
                shp.width(),
                shp.height()
            );

            for i in 0..shp.frame_count() {
                let indices = match shp.decode_frame(i) {
                    Ok(indices) => indices,
                    Err(ShpError::UnsupportedFormat(tag)) => {
                        log::warn!("skipping frame {i}: format 0x{tag:02x} is not supported");
                        continue;
                    }
                    Err(e) => return Err(e.into()),
                };

                let rgba = pal.expand(&indices, transparent_index);
                let (width, height) = (shp.width() as u32, shp.height() as u32);
                let img = image::RgbaImage::from_raw(width, height, rgba)
                    .ok_or("Failed to create image from decoded data")?;

                let path = dir.join(format!("{stem}-{i:03}.png"));
                img.save(&path)
                    .map_err(|e| format!("Failed to write '{}': {}", path.display(), e))?;
                log::debug!("frame {} -> '{}'", i, path.display());
            }
        }

        Commands::Info { input } => {
            let data = read_file(&input)?;
            let shp = ShpFile::parse(&data)?;

            println!("{}", input.display());
            println!("  frames: {}", shp.frame_count());
            println!("  size:   {}x{}", shp.width(), shp.height());
            for i in 0..shp.frame_count() {
                let descriptor = shp.descriptor(i)?;
                let format = match descriptor.frame_format() {
                    Some(FrameFormat::Lcw) => "lcw".to_string(),
                    Some(FrameFormat::XorPrevious) => "xor-prev".to_string(),
                    Some(FrameFormat::XorReference) => "xor-ref".to_string(),
                    Some(FrameFormat::Null) => "null".to_string(),
                    None => format!("0x{:02x}", descriptor.format),
                };
                println!(
                    "  {:>4}  offset {:>8}  {:>8}  {:>6} bytes",
                    i,
                    descriptor.offset,
                    format,
                    shp.frame_data(i)?.len()
                );
            }
        }
    }

    Ok(())
}

fn read_file(path: &Path) -> Result<Vec<u8>, String> {
    fs::read(path).map_err(|e| format!("Failed to read '{}': {}", path.display(), e))
}

fn load_palette(path: &Path) -> Result<Palette, String> {
    Palette::load(path)
        .map_err(|e| format!("Failed to load palette '{}': {}", path.display(), e))
}

fn load_frame(path: &Path) -> Result<RgbaFrame, String> {
    let img =
        image::open(path).map_err(|e| format!("Failed to open '{}': {}", path.display(), e))?;
    let rgba_img = img.to_rgba8();
    let (width, height) = rgba_img.dimensions();
    log::debug!("loaded '{}' ({}x{})", path.display(), width, height);

    RgbaFrame::new(width as usize, height as usize, rgba_img.into_raw())
        .map_err(|e| format!("'{}': {}", path.display(), e))
}
