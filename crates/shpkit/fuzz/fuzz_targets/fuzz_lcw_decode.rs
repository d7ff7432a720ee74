#![no_main]

use libfuzzer_sys::fuzz_target;
use shpkit::lcw_decode;

fuzz_target!(|data: &[u8]| {
    // First two bytes pick the output size, the rest is the stream
    if data.len() < 2 {
        return;
    }
    let len = u16::from_le_bytes([data[0], data[1]]) as usize;
    let mut dest = vec![0u8; len];

    // Should never panic, only return errors
    if let Ok(written) = lcw_decode(&data[2..], &mut dest) {
        assert!(written <= len);
    }
});
