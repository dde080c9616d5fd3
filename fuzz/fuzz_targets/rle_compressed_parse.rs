//! Fuzz target for compressed COCO RLE strings.

#![no_main]

use coco_records::record::Rle;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(rle) = Rle::from_compressed(text) {
        let _ = rle.decode(16, 16);
    }
});
