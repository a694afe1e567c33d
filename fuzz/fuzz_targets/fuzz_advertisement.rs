//! Fuzz target for ref advertisement parsing.

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(refs) = pith_git::parse_advertisement(data) {
        let _ = refs.head();
        let _ = refs.head_branch();
    }
});
