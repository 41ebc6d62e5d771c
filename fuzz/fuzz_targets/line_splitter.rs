//! Fuzz target for output formatting: every framed line must fit.

#![no_main]

use libfuzzer_sys::fuzz_target;
use slirc_bot::encode;
use slirc_bot::util::MAX_LINE_LEN;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        let address = "bot@example.net";
        for line in encode::format("bot", address, "#fuzz", text, false) {
            assert!(1 + "bot".len() + 1 + address.len() + 1 + line.len() + 2 <= MAX_LINE_LEN);
        }
    }
});
