#![no_main]

use cctprof::attribution::{attribute, AttributionMode, DEFAULT_MARKER_FRAME};
use cctprof::ingest::{IngestOptions, ProfileDatabase};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        let options = IngestOptions {
            call_site_nodes: data.len() % 2 == 0,
            ..IngestOptions::default()
        };
        // Malformed documents are errors, never panics
        if let Ok(db) = ProfileDatabase::from_xml("fuzz", text, &options) {
            if let Some(metric) = db.tables.metrics.select("(E)") {
                let _ = attribute(&db, AttributionMode::Callpair, DEFAULT_MARKER_FRAME, metric);
            }
        }
    }
});
