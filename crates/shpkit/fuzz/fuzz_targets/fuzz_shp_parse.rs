#![no_main]

use libfuzzer_sys::fuzz_target;
use shpkit::ShpFile;

fuzz_target!(|data: &[u8]| {
    let Ok(shp) = ShpFile::parse(data) else {
        return;
    };

    // Limit work on huge claimed dimensions
    if shp.header().frame_len() > 1 << 20 {
        return;
    }

    for i in 0..shp.frame_count() {
        if let Ok(pixels) = shp.decode_frame(i) {
            assert_eq!(pixels.len(), shp.header().frame_len());
        }
    }
});
