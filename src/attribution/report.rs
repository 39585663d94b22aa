//! Ranked attribution reports
//!
//! Three renderings of the same rows:
//!
//! - **text**: one space-separated line per entry, addresses without their
//!   `0x` prefix, plus a trailing `unaccounted <value>` line for the modes
//!   that track it
//! - **json**: a single pretty-printed object with run counters and entries
//! - **csv**: a header row and one row per entry

use super::engine::{Attribution, RankedEntry};
use super::mode::{AttributionMode, GroupKey};
use crate::cct::Address;
use anyhow::Result;
use clap::ValueEnum;
use serde::Serialize;
use serde_json::{Map, Value};
use std::io::Write;

/// Report encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Csv,
}

/// Label printed when an address has no known name
pub const UNNAMED: &str = "<unknown>";

/// Render a metric value, keeping a fractional part on integral values
/// (`4` prints as `4.0`)
pub fn format_value(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}

/// Column names of a mode's report rows
pub fn columns(mode: AttributionMode) -> &'static [&'static str] {
    match mode {
        AttributionMode::Function => &["address", "name", "value"],
        AttributionMode::Loop => &["address", "label", "value"],
        AttributionMode::Callpair => &["caller", "caller_name", "callee", "callee_name", "value"],
        AttributionMode::Callsite => &["site", "callee", "callee_name", "value"],
        AttributionMode::Address => &["address", "value"],
    }
}

fn name_of<'a>(attribution: &'a Attribution, address: &Address) -> &'a str {
    attribution.label_of(address).unwrap_or(UNNAMED)
}

/// Text cells of one row, value excluded
fn cells(attribution: &Attribution, entry: &RankedEntry) -> Vec<String> {
    match &entry.key {
        GroupKey::Function(address) | GroupKey::Loop(address) => vec![
            address.stripped().to_string(),
            name_of(attribution, address).to_string(),
        ],
        GroupKey::CallPair { caller, callee } => vec![
            caller.stripped().to_string(),
            name_of(attribution, caller).to_string(),
            callee.stripped().to_string(),
            name_of(attribution, callee).to_string(),
        ],
        GroupKey::CallSite { site, callee } => vec![
            site.stripped().to_string(),
            callee.stripped().to_string(),
            name_of(attribution, callee).to_string(),
        ],
        GroupKey::Address(address) => vec![address.stripped().to_string()],
    }
}

pub fn write_text<W: Write>(
    attribution: &Attribution,
    top_k: Option<usize>,
    out: &mut W,
) -> Result<()> {
    for entry in attribution.ranked(top_k) {
        let mut line = cells(attribution, &entry);
        line.push(format_value(entry.value));
        writeln!(out, "{}", line.join(" "))?;
    }
    if attribution.mode.tracks_unaccounted() {
        writeln!(out, "unaccounted {}", format_value(attribution.unaccounted))?;
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct JsonReport {
    mode: AttributionMode,
    databases: usize,
    markers: usize,
    skipped: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    unaccounted: Option<f64>,
    entries: Vec<Map<String, Value>>,
}

pub fn write_json<W: Write>(
    attribution: &Attribution,
    top_k: Option<usize>,
    out: &mut W,
) -> Result<()> {
    let names = columns(attribution.mode);
    let entries = attribution
        .ranked(top_k)
        .iter()
        .map(|entry| {
            let mut row: Map<String, Value> = names
                .iter()
                .zip(cells(attribution, entry))
                .map(|(name, cell)| (name.to_string(), Value::String(cell)))
                .collect();
            row.insert("value".to_string(), Value::from(entry.value));
            row
        })
        .collect();

    let report = JsonReport {
        mode: attribution.mode,
        databases: attribution.databases,
        markers: attribution.markers,
        skipped: attribution.skipped,
        unaccounted: attribution
            .mode
            .tracks_unaccounted()
            .then_some(attribution.unaccounted),
        entries,
    };
    serde_json::to_writer_pretty(&mut *out, &report)?;
    writeln!(out)?;
    Ok(())
}

/// Quote a CSV field holding a comma, quote or newline
pub(crate) fn escape_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

pub fn write_csv<W: Write>(
    attribution: &Attribution,
    top_k: Option<usize>,
    out: &mut W,
) -> Result<()> {
    writeln!(out, "{}", columns(attribution.mode).join(","))?;
    for entry in attribution.ranked(top_k) {
        let mut row: Vec<String> = cells(attribution, &entry)
            .iter()
            .map(|cell| escape_field(cell))
            .collect();
        row.push(format_value(entry.value));
        writeln!(out, "{}", row.join(","))?;
    }
    if attribution.mode.tracks_unaccounted() {
        // label in the first column, key columns left empty
        let mut row = vec![String::new(); columns(attribution.mode).len()];
        row[0] = "unaccounted".to_string();
        if let Some(last) = row.last_mut() {
            *last = format_value(attribution.unaccounted);
        }
        writeln!(out, "{}", row.join(","))?;
    }
    Ok(())
}

/// Write `attribution` in the requested format
pub fn write_report<W: Write>(
    attribution: &Attribution,
    format: OutputFormat,
    top_k: Option<usize>,
    out: &mut W,
) -> Result<()> {
    match format {
        OutputFormat::Text => write_text(attribution, top_k, out),
        OutputFormat::Json => write_json(attribution, top_k, out),
        OutputFormat::Csv => write_csv(attribution, top_k, out),
    }
}
