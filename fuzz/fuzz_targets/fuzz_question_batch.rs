//! Fuzz target for inbound question batch parsing.
//!
//! Arbitrary bytes must never panic the parser or the normalizer; both
//! return Ok or Err only.

#![no_main]

use libfuzzer_sys::fuzz_target;
use testlock_core::wire::{normalize_questions, parse_questions};

fuzz_target!(|data: &[u8]| {
    let Ok(raw) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(batch) = parse_questions(raw) {
        let _ = normalize_questions(batch);
    }
});
