use criterion::{criterion_group, criterion_main, Criterion};
use shpkit::{IndexedColor, PaletteQuantizer, QuantizerOptions, Rgb};
use std::hint::black_box;

fn generate_palette() -> Vec<IndexedColor> {
    (1..=255u8)
        .map(|i| {
            let r = i.wrapping_mul(37);
            let g = i.wrapping_mul(91);
            let b = i.wrapping_mul(173);
            IndexedColor::new(i, Rgb::new(r, g, b))
        })
        .collect()
}

fn generate_gradient_rgba(width: usize, height: usize) -> Vec<u8> {
    let mut pixels = Vec::with_capacity(width * height * 4);
    for y in 0..height {
        for x in 0..width {
            let r = ((x * 255) / width.max(1)) as u8;
            let g = ((y * 255) / height.max(1)) as u8;
            let b = 128;
            pixels.push(r);
            pixels.push(g);
            pixels.push(b);
            pixels.push(255); // Alpha
        }
    }
    pixels
}

fn bench_quantize_cold(c: &mut Criterion) {
    let rgba = generate_gradient_rgba(64, 64);
    let palette = generate_palette();
    let opts = QuantizerOptions::default();

    c.bench_function("quantize_gradient_64x64_cold", |b| {
        b.iter(|| {
            let quantizer = PaletteQuantizer::new(palette.iter().copied(), &opts).unwrap();
            quantizer.quantize(black_box(&rgba))
        })
    });
}

fn bench_quantize_warm(c: &mut Criterion) {
    let rgba = generate_gradient_rgba(200, 200);
    let quantizer =
        PaletteQuantizer::new(generate_palette(), &QuantizerOptions::default()).unwrap();
    let _ = quantizer.quantize(&rgba);

    c.bench_function("quantize_gradient_200x200_warm", |b| {
        b.iter(|| {
            let result = quantizer.quantize(black_box(&rgba));
            assert!(result.is_ok());
            result
        })
    });
}

criterion_group!(benches, bench_quantize_cold, bench_quantize_warm);
criterion_main!(benches);
