use crate::cct::TreeError;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Flat lookup tables of a profile database
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    LoadModule,
    File,
    Procedure,
    Metric,
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TableKind::LoadModule => "load module",
            TableKind::File => "file",
            TableKind::Procedure => "procedure",
            TableKind::Metric => "metric",
        };
        f.write_str(name)
    }
}

/// Fatal ingestion errors; there is no partial-tree recovery
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed experiment document: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("malformed experiment document: {0}")]
    Malformed(String),

    #[error("missing required section <{0}>")]
    MissingSection(&'static str),

    #[error("<{element}> element is missing attribute '{attribute}'")]
    MissingAttribute {
        element: String,
        attribute: &'static str,
    },

    #[error("<{element}> element has invalid {attribute} '{value}'")]
    InvalidAttribute {
        element: String,
        attribute: &'static str,
        value: String,
    },

    #[error("unknown {table} id '{id}'")]
    UnknownReference { table: TableKind, id: String },

    #[error("unexpected <{0}> element in call-path section")]
    UnexpectedElement(String),

    #[error(transparent)]
    Tree(#[from] TreeError),
}
