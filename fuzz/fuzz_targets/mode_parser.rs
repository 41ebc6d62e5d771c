//! Fuzz target for MODE parameter parsing and registry application.

#![no_main]

use libfuzzer_sys::fuzz_target;
use slirc_bot::{parse_mode_change, ModeClasses, Registry};

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        let pieces: Vec<&str> = input.split(' ').take(32).collect();

        let classes = ModeClasses::default();
        let _ = parse_mode_change(&classes, &pieces);

        let mut registry = Registry::new();
        let _ = registry.apply_mode("#fuzz", &pieces);
    }
});
