//! Fuzz target for host-frame message decoding.

#![no_main]

use libfuzzer_sys::fuzz_target;
use testlock_core::wire::HostMessage;

fuzz_target!(|data: &[u8]| {
    let _ = serde_json::from_slice::<HostMessage>(data);
});
