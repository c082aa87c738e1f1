#![no_main]

use libfuzzer_sys::fuzz_target;
use savestream::container::{decode, length};

// Arbitrary bytes must never panic the decoder; corrupt containers fail
// with an error.
fuzz_target!(|data: &[u8]| {
    let _ = length(data);
    if let Ok(decoder) = decode(data) {
        for state in decoder {
            if state.is_err() {
                break;
            }
        }
    }
});
