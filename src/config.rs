// Analyzer configuration: defaults, optional TOML file, CLI overrides

use crate::attribution::DEFAULT_MARKER_FRAME;
use crate::ingest::{IngestOptions, DEFAULT_DOCUMENT};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Tunables shared by every subcommand
///
/// Every field has a default, so a config file only needs the keys it
/// changes.
///
/// # Example
/// ```
/// use cctprof::config::AnalyzerConfig;
///
/// let config = AnalyzerConfig::from_toml_str("top_k = 10\njobs = 2\n").unwrap();
/// assert_eq!(config.top_k, Some(10));
/// assert_eq!(config.marker_frame, "dyninst_instrumentation_op");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalyzerConfig {
    /// Frame name identifying instrumentation marker nodes
    pub marker_frame: String,

    /// Substring tagging the exclusive metric in the metric table
    pub exclusive_tag: String,

    /// Document read from a database directory
    pub document_name: String,

    /// Materialize call-site elements as tree nodes
    pub call_site_nodes: bool,

    /// Maximum number of ranked entries (unlimited if unset)
    pub top_k: Option<usize>,

    /// Worker threads for multi-database runs (rayon default if unset)
    pub jobs: Option<usize>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            marker_frame: DEFAULT_MARKER_FRAME.to_string(),
            exclusive_tag: "(E)".to_string(),
            document_name: DEFAULT_DOCUMENT.to_string(),
            call_site_nodes: false,
            top_k: None,
            jobs: None,
        }
    }
}

impl AnalyzerConfig {
    /// Load and validate a TOML config file
    pub fn from_toml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).with_context(|| {
            format!("Failed to read config file: {}", path.as_ref().display())
        })?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Invalid config file: {}", path.as_ref().display()))
    }

    /// Parse and validate TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("Failed to parse TOML config")?;
        config.validate().map_err(anyhow::Error::msg)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.marker_frame.is_empty() {
            return Err("marker_frame must not be empty".to_string());
        }

        if self.exclusive_tag.is_empty() {
            return Err("exclusive_tag must not be empty".to_string());
        }

        if self.document_name.is_empty() {
            return Err("document_name must not be empty".to_string());
        }

        if self.jobs == Some(0) {
            return Err("jobs must be >= 1".to_string());
        }

        Ok(())
    }

    pub fn ingest_options(&self) -> IngestOptions {
        IngestOptions {
            document_name: self.document_name.clone(),
            call_site_nodes: self.call_site_nodes,
        }
    }
}
