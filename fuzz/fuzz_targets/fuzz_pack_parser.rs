//! Fuzz target for pack decoding.
//!
//! Unpacks arbitrary bytes into an in-memory store; errors are fine, panics are not.

#![no_main]

use libfuzzer_sys::fuzz_target;
use pith_storage::MemoryStore;

fuzz_target!(|data: &[u8]| {
    let store = MemoryStore::new();
    let mut parser = pith_git::PackParser::new(data);
    let _ = parser.unpack(&store);
});
