//! Fuzz target for loose object decoding.

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok((_, size, payload)) = pith_storage::decode(data) {
        assert_eq!(size, payload.len());
    }
});
