//! Fuzz target for line parsing and command detection.

#![no_main]

use libfuzzer_sys::fuzz_target;
use std::str;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = str::from_utf8(data) {
        if input.len() > 1024 {
            return;
        }

        // Parsing never panics; only empty input is an error.
        if let Ok(mut msg) = slirc_bot::Message::parse(input) {
            let _ = msg.parse_command(&["!", "!!", "."]);
        }
    }
});
