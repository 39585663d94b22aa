//! HPCToolkit database ingestion
//!
//! Reads `experiment.xml` from a profile database directory and produces the
//! flat lookup tables plus the calling-context tree.
//!
//! Ingestion runs in two passes over the parsed document:
//!
//! 1. **Tables** - `LoadModuleTable`, `FileTable`, `ProcedureTable` and
//!    `MetricTable` become id -> name maps (procedures also name -> address).
//! 2. **Tree** - `SecCallPathProfileData` is walked depth-first; procedure,
//!    loop and statement elements become nodes, call sites and unnamed merged
//!    procedures are passed through, metric elements annotate the current node.
//!
//! Any missing section, unknown table reference or malformed attribute aborts
//! the load.
//!
//! # Example
//!
//! ```
//! use cctprof::ingest::{IngestOptions, ProfileDatabase};
//!
//! let xml = r#"<HPCToolkitExperiment>
//!   <SecHeader>
//!     <MetricTable><Metric i="0" n="CPUTIME (usec) (E)"/></MetricTable>
//!     <LoadModuleTable><LoadModule i="1" n="/bin/app"/></LoadModuleTable>
//!     <FileTable><File i="2" n="app.c"/></FileTable>
//!     <ProcedureTable><Procedure i="3" n="main" v="0x400000"/></ProcedureTable>
//!   </SecHeader>
//!   <SecCallPathProfileData>
//!     <PF i="10" n="3" f="2" lm="1" l="1">
//!       <S i="11" l="4"><M n="0" v="2.5"/></S>
//!     </PF>
//!   </SecCallPathProfileData>
//! </HPCToolkitExperiment>"#;
//!
//! let db = ProfileDatabase::from_xml("inline", xml, &IngestOptions::default()).unwrap();
//! assert_eq!(db.tree.len(), 2);
//! ```

mod builder;
mod document;
mod error;
mod tables;

pub use builder::CALL_PATH_SECTION;
pub use document::{Document, Element, ElementRef};
pub use error::{IngestError, TableKind};
pub use tables::{MetricEntry, MetricTable, NameTable, ProfileTables};

use crate::cct::CallingContextTree;
use builder::TreeBuilder;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Default document name inside a database directory
pub const DEFAULT_DOCUMENT: &str = "experiment.xml";

/// Knobs for one ingestion pass
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Document looked up when a database path is a directory
    pub document_name: String,
    /// Turn call-site elements into `CallSite` nodes instead of passing
    /// their children through
    pub call_site_nodes: bool,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            document_name: DEFAULT_DOCUMENT.to_string(),
            call_site_nodes: false,
        }
    }
}

/// One loaded profile database: its tables and calling-context tree
#[derive(Debug)]
pub struct ProfileDatabase {
    /// Where the database was loaded from (for diagnostics)
    pub source: PathBuf,
    pub tables: ProfileTables,
    pub tree: CallingContextTree,
}

impl ProfileDatabase {
    /// Load a database directory (or a document path directly)
    pub fn open<P: AsRef<Path>>(path: P, options: &IngestOptions) -> Result<Self, IngestError> {
        let path = path.as_ref();
        let document_path = if path.is_dir() {
            path.join(&options.document_name)
        } else {
            path.to_path_buf()
        };

        let text = fs::read_to_string(&document_path).map_err(|source| IngestError::Io {
            path: document_path.clone(),
            source,
        })?;

        let db = Self::from_xml(path, &text, options)?;
        info!(
            "Loaded {}: {} nodes, {} procedures, {} metrics",
            path.display(),
            db.tree.len(),
            db.tables.procedures.len(),
            db.tables.metrics.len()
        );
        Ok(db)
    }

    /// Ingest document text
    pub fn from_xml<P: AsRef<Path>>(
        source: P,
        text: &str,
        options: &IngestOptions,
    ) -> Result<Self, IngestError> {
        let document = Document::parse(text)?;
        let tables = ProfileTables::from_document(&document)?;
        let tree = TreeBuilder::new(&document, &tables, options).build()?;
        Ok(Self {
            source: source.as_ref().to_path_buf(),
            tables,
            tree,
        })
    }
}
