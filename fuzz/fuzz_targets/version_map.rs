#![no_main]

use cctprof::version_map::VersionMap;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        // Parsing and classifying must never panic
        if let Ok(map) = VersionMap::parse(text) {
            for address in [0, 0x1000, u64::MAX] {
                let _ = map.classify(address);
            }
        }
    }
});
