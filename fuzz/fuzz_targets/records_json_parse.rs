//! Fuzz target for records JSON parsing.
//!
//! Parsed records are also run through validation and COCO conversion,
//! which must reject bad input with an error rather than panic.

#![no_main]

use coco_records::coco::fuzz_records_to_coco;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    let _ = fuzz_records_to_coco(data);
});
