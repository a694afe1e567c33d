//! Fuzz target for delta application.
//!
//! Applies an arbitrary instruction stream to an arbitrary base. A successful
//! result must have exactly the size the delta declares.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input {
    base: Vec<u8>,
    delta: Vec<u8>,
}

fuzz_target!(|input: Input| {
    if let Ok(target) = pith_git::delta::apply(&input.base, &input.delta) {
        let (header, _) = pith_git::delta::parse(&input.delta).unwrap();
        assert_eq!(header.target_size, target.len());
    }
});
