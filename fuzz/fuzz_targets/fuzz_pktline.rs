//! Fuzz target for pkt-line reading.

#![no_main]

use libfuzzer_sys::fuzz_target;
use std::io::Cursor;

fuzz_target!(|data: &[u8]| {
    let mut reader = pith_git::PktLineReader::new(Cursor::new(data));

    // Bounded so crafted input cannot keep the loop alive.
    for _ in 0..100 {
        match reader.read() {
            Ok(Some(_)) => continue,
            Ok(None) | Err(_) => break,
        }
    }
});
