#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use shpkit::{
    encode_sprite, IndexedColor, PaletteQuantizer, QuantizerOptions, Rgb, RgbaFrame, ShpFile,
};

#[derive(Arbitrary, Debug)]
struct FuzzInput {
    width: u8,
    height: u8,
    palette: Vec<(u8, u8, u8)>,
    pixels: Vec<u8>,
}

fuzz_target!(|input: FuzzInput| {
    // Skip invalid dimensions
    let width = (input.width as usize).clamp(1, 64);
    let height = (input.height as usize).clamp(1, 64);

    // Ensure we have enough pixels (RGBA = 4 bytes per pixel)
    let expected_size = width * height * 4;
    if input.pixels.len() < expected_size {
        return;
    }

    let candidates: Vec<IndexedColor> = input
        .palette
        .iter()
        .take(255)
        .enumerate()
        .map(|(i, &(r, g, b))| IndexedColor::new(i as u8 + 1, Rgb::new(r, g, b)))
        .collect();
    let Ok(quantizer) = PaletteQuantizer::new(candidates, &QuantizerOptions::default()) else {
        return;
    };

    let pixels = input.pixels[..expected_size].to_vec();
    let frame = RgbaFrame::new(width, height, pixels).expect("dimensions are clamped");
    let expected = quantizer.quantize(frame.pixels()).expect("buffer size matches");

    let shp_bytes = encode_sprite(&[frame], &quantizer).expect("encoding should succeed");
    let shp = ShpFile::parse(&shp_bytes).expect("own output should parse");
    let decoded = shp.decode_frame(0).expect("own frame should decode");

    assert_eq!(decoded, expected);
});
