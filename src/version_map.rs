//! Address-range version classification
//!
//! A version map describes the code regions a binary rewriter produced:
//!
//! ```text
//! 2                     <- number of intervals
//! 1000 10 20 v1         <- relocated start (hex), original address, size (hex), version
//! 2000 -1 20 v2         <- negative original address: index into the string table
//! 1                     <- number of strings
//! foo                   <- string table
//! ```
//!
//! A statement sample at a relocated address falls into the last interval
//! starting at or below it. Inside that interval it is classified as
//! ("original", version) when the original address is positive, or
//! (string, version) for the string-table encoding. Everything else is
//! ("other", "other").
//!
//! # Example
//!
//! ```
//! use cctprof::version_map::VersionMap;
//!
//! let map = VersionMap::parse("2\n1000 10 20 v1\n2000 -1 20 v2\n1\nfoo\n").unwrap();
//! assert_eq!(map.classify(0x1005), ("original", "v1"));
//! assert_eq!(map.classify(0x2005), ("foo", "v2"));
//! assert_eq!(map.classify(0x3000), ("other", "other"));
//! ```

use crate::attribution::{escape_field, format_value, OutputFormat};
use crate::cct::{MetricId, NodeKind};
use crate::ingest::ProfileDatabase;
use anyhow::Result;
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Category of addresses outside every interval
pub const OTHER: &str = "other";

/// Category of unmodified code inside an interval
pub const ORIGINAL: &str = "original";

#[derive(Error, Debug)]
pub enum VersionMapError {
    #[error("failed to read version map {path}: {source}", path = .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("line {line}: missing {expected}")]
    MissingLine { line: usize, expected: &'static str },

    #[error("line {line}: invalid count '{value}'")]
    InvalidCount { line: usize, value: String },

    #[error("line {line}: expected 4 fields, found {found}")]
    FieldCount { line: usize, found: usize },

    #[error("line {line}: invalid {field} '{value}'")]
    InvalidField {
        line: usize,
        field: &'static str,
        value: String,
    },

    #[error("line {line}: interval start is below the previous interval")]
    Unsorted { line: usize },

    #[error("line {line}: string index {index} out of range ({strings} strings)")]
    StringIndexOutOfRange {
        line: usize,
        index: i64,
        strings: usize,
    },
}

/// Where the code of an interval came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    /// Unmodified code at this original address
    Original,
    /// Rewriter-generated code described by a string-table entry
    String(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Interval {
    start: u64,
    size: u64,
    origin: Origin,
    version: String,
}

impl Interval {
    fn contains(&self, address: u64) -> bool {
        address >= self.start && address - self.start < self.size
    }
}

/// Sorted relocated-address intervals plus the auxiliary string table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionMap {
    intervals: Vec<Interval>,
    strings: Vec<String>,
}

fn parse_hex(field: &str) -> Option<u64> {
    let digits = field
        .strip_prefix("0x")
        .or_else(|| field.strip_prefix("0X"))
        .unwrap_or(field);
    u64::from_str_radix(digits, 16).ok()
}

/// Lines with their 1-based numbers, carriage returns removed
struct Lines<'a> {
    inner: std::iter::Enumerate<std::str::Split<'a, char>>,
    last: usize,
}

impl<'a> Lines<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            inner: text.split('\n').enumerate(),
            last: 0,
        }
    }

    fn next_line(&mut self, expected: &'static str) -> Result<(usize, &'a str), VersionMapError> {
        match self.inner.next() {
            Some((index, line)) => {
                self.last = index + 1;
                Ok((index + 1, line.strip_suffix('\r').unwrap_or(line)))
            }
            None => Err(VersionMapError::MissingLine {
                line: self.last + 1,
                expected,
            }),
        }
    }

    fn count(&mut self, expected: &'static str) -> Result<usize, VersionMapError> {
        let (line, text) = self.next_line(expected)?;
        text.trim()
            .parse()
            .map_err(|_| VersionMapError::InvalidCount {
                line,
                value: text.to_string(),
            })
    }
}

impl VersionMap {
    /// Parse version map text
    pub fn parse(text: &str) -> Result<Self, VersionMapError> {
        let mut lines = Lines::new(text);

        let count = lines.count("interval count")?;
        let mut raw: Vec<(usize, u64, i64, u64, String)> = Vec::new();
        for _ in 0..count {
            let (line, text) = lines.next_line("interval")?;
            let fields: Vec<&str> = text.split_whitespace().collect();
            if fields.len() < 4 {
                return Err(VersionMapError::FieldCount {
                    line,
                    found: fields.len(),
                });
            }
            let invalid = |field: &'static str, value: &str| VersionMapError::InvalidField {
                line,
                field,
                value: value.to_string(),
            };

            let start = parse_hex(fields[0]).ok_or_else(|| invalid("relocated address", fields[0]))?;
            let original: i64 = if fields[1].starts_with('-') {
                fields[1]
                    .parse()
                    .map_err(|_| invalid("original address", fields[1]))?
            } else {
                parse_hex(fields[1])
                    .and_then(|value| i64::try_from(value).ok())
                    .ok_or_else(|| invalid("original address", fields[1]))?
            };
            let size = parse_hex(fields[2]).ok_or_else(|| invalid("size", fields[2]))?;

            if let Some((_, previous, _, _, _)) = raw.last() {
                if start < *previous {
                    return Err(VersionMapError::Unsorted { line });
                }
            }
            raw.push((line, start, original, size, fields[3].to_string()));
        }

        let count = lines.count("string count")?;
        let mut strings = Vec::new();
        for _ in 0..count {
            let (_, text) = lines.next_line("string")?;
            strings.push(text.to_string());
        }

        let intervals = raw
            .into_iter()
            .map(|(line, start, original, size, version)| {
                let origin = if original > 0 {
                    Origin::Original
                } else {
                    let index = -1 - original;
                    // An original of 0 names the last string, counting from the end
                    let slot = if index < 0 {
                        strings.len().checked_sub(1)
                    } else {
                        usize::try_from(index).ok()
                    };
                    match slot {
                        Some(i) if i < strings.len() => Origin::String(i),
                        _ => {
                            return Err(VersionMapError::StringIndexOutOfRange {
                                line,
                                index,
                                strings: strings.len(),
                            })
                        }
                    }
                };
                Ok(Interval {
                    start,
                    size,
                    origin,
                    version,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { intervals, strings })
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, VersionMapError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| VersionMapError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let map = Self::parse(&text)?;
        info!(
            "Loaded version map {}: {} intervals, {} strings",
            path.display(),
            map.intervals.len(),
            map.strings.len()
        );
        Ok(map)
    }

    /// (label, version) of a relocated address
    pub fn classify(&self, address: u64) -> (&str, &str) {
        let index = self.intervals.partition_point(|interval| interval.start <= address);
        if index == 0 {
            return (OTHER, OTHER);
        }
        let interval = &self.intervals[index - 1];
        if !interval.contains(address) {
            return (OTHER, OTHER);
        }
        let label = match interval.origin {
            Origin::Original => ORIGINAL,
            Origin::String(i) => self.strings[i].as_str(),
        };
        (label, interval.version.as_str())
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    pub fn strings(&self) -> &[String] {
        &self.strings
    }

    /// Version labels in map order
    pub fn versions(&self) -> impl Iterator<Item = &str> {
        self.intervals.iter().map(|interval| interval.version.as_str())
    }
}

/// One line of a profile: a category, its cost and its share of the total
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileRow {
    pub label: String,
    pub value: f64,
    pub percent: f64,
}

/// Statement cost of one database split by rewritten region and version
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VersionReport {
    /// Sum of the metric over every classified statement
    pub total: f64,
    /// Statements that contributed to the total
    pub samples: usize,
    /// Cost per string-table label, then `other`, then `original`
    pub instrumentation: Vec<ProfileRow>,
    /// Cost per version, descending, without zero entries
    pub versions: Vec<ProfileRow>,
}

/// Running sums in first-seen key order
struct Tally {
    rows: Vec<(String, f64)>,
    index: HashMap<String, usize>,
}

impl Tally {
    fn new<'a>(keys: impl IntoIterator<Item = &'a str>) -> Self {
        let mut tally = Self {
            rows: Vec::new(),
            index: HashMap::new(),
        };
        for key in keys {
            tally.slot(key);
        }
        tally
    }

    fn slot(&mut self, key: &str) -> &mut f64 {
        let next = self.rows.len();
        let index = *self.index.entry(key.to_string()).or_insert(next);
        if index == next {
            self.rows.push((key.to_string(), 0.0));
        }
        &mut self.rows[index].1
    }

    fn into_rows(self, total: f64) -> Vec<ProfileRow> {
        self.rows
            .into_iter()
            .map(|(label, value)| ProfileRow {
                percent: percent(value, total),
                label,
                value,
            })
            .collect()
    }
}

fn percent(value: f64, total: f64) -> f64 {
    if total == 0.0 {
        0.0
    } else {
        value * 100.0 / total
    }
}

/// Classify every statement sample of `db` carrying `metric`
pub fn version_report(db: &ProfileDatabase, map: &VersionMap, metric: MetricId) -> VersionReport {
    let mut samples = Vec::new();
    for (_, node) in db.tree.records() {
        if node.kind() != NodeKind::Statement {
            continue;
        }
        let Some(value) = node.metric(metric) else {
            continue;
        };
        match node.address().to_u64() {
            Some(address) => samples.push((address, value)),
            None => debug!(
                "Statement {} has unreadable address '{}', skipped",
                node.id(),
                node.address()
            ),
        }
    }

    let mut regions = Tally::new(map.strings().iter().map(String::as_str).chain([OTHER, ORIGINAL]));
    let mut versions = Tally::new(map.versions().chain([OTHER]));
    let mut total = 0.0;
    for &(address, value) in &samples {
        let (label, version) = map.classify(address);
        *regions.slot(label) += value;
        *versions.slot(version) += value;
        total += value;
    }

    let mut version_rows = versions.into_rows(total);
    version_rows.sort_by(|a, b| {
        b.value
            .total_cmp(&a.value)
            .then_with(|| b.label.cmp(&a.label))
    });
    if let Some(first_zero) = version_rows.iter().position(|row| row.value == 0.0) {
        version_rows.truncate(first_zero);
    }

    VersionReport {
        total,
        samples: samples.len(),
        instrumentation: regions.into_rows(total),
        versions: version_rows,
    }
}

fn write_rows<W: Write>(rows: &[ProfileRow], out: &mut W) -> Result<()> {
    for row in rows {
        writeln!(
            out,
            "{} {} {}",
            row.label,
            format_value(row.value),
            format_value(row.percent)
        )?;
    }
    Ok(())
}

/// Write a version report in the requested format
pub fn write_version_report<W: Write>(
    report: &VersionReport,
    format: OutputFormat,
    out: &mut W,
) -> Result<()> {
    match format {
        OutputFormat::Text => {
            writeln!(out, "Total metric {}", format_value(report.total))?;
            writeln!(out, "Instrumentation Profile:")?;
            write_rows(&report.instrumentation, out)?;
            writeln!(out, "Version Profile:")?;
            write_rows(&report.versions, out)?;
        }
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, report)?;
            writeln!(out)?;
        }
        OutputFormat::Csv => {
            writeln!(out, "profile,label,value,percent")?;
            let sections = [
                ("instrumentation", &report.instrumentation),
                ("version", &report.versions),
            ];
            for (section, rows) in sections {
                for row in rows {
                    writeln!(
                        out,
                        "{},{},{},{}",
                        section,
                        escape_field(&row.label),
                        format_value(row.value),
                        format_value(row.percent)
                    )?;
                }
            }
        }
    }
    Ok(())
}
