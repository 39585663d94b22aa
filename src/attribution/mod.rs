//! Bottom-up cost attribution of instrumentation markers
//!
//! Binary instrumentation shows up in a profile as synthetic frames named
//! after the instrumentation routine. For every such marker node the engine
//! reads the cost recorded under it, finds the program entity it belongs to
//! and sums the cost per entity:
//!
//! | mode       | grouping key                                     |
//! |------------|--------------------------------------------------|
//! | `function` | enclosing procedure                              |
//! | `loop`     | enclosing loop (markers outside loops dropped)   |
//! | `callpair` | (caller of the enclosing procedure, procedure)   |
//! | `callsite` | (call site of the enclosing procedure, procedure)|
//! | `address`  | call site of the marker                          |
//!
//! Markers whose caller or call site cannot be resolved are summed into an
//! `unaccounted` total in the last three modes; nothing is reported as an
//! error for them.
//!
//! # Example
//!
//! ```no_run
//! use cctprof::attribution::{attribute_databases, write_report, AttributionMode, OutputFormat};
//! use cctprof::config::AnalyzerConfig;
//! use std::path::PathBuf;
//!
//! let config = AnalyzerConfig::default();
//! let dbs = vec![PathBuf::from("hpctoolkit-app-database")];
//! let attribution = attribute_databases(&dbs, AttributionMode::Function, &config)?;
//! write_report(&attribution, OutputFormat::Text, Some(10), &mut std::io::stdout())?;
//! # Ok::<(), anyhow::Error>(())
//! ```

mod engine;
mod merge;
mod mode;
mod report;

pub use engine::{attribute, Attribution, RankedEntry, DEFAULT_MARKER_FRAME};
pub use merge::{attribute_database, attribute_databases, open_database};
pub use mode::{AttributionMode, GroupKey};
pub use report::{
    columns, format_value, write_csv, write_json, write_report, write_text, OutputFormat, UNNAMED,
};
pub(crate) use report::escape_field;
