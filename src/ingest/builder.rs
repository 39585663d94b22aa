// Call-path section -> CallingContextTree
//
// Walks the section depth-first with an explicit stack, carrying the current
// parent node and current callpath for each pending element:
//
//   PF / Pr  -> procedure node named after the procedure table entry
//   Pr ""    -> passthrough: children go to the current parent, same callpath
//   C        -> passthrough (or a CallSite node when call-site nodes are on)
//   L        -> "Loop@<file basename>:<line>"
//   S        -> "line <line>", file inherited from the last PF/Pr/L entered
//   M        -> metric on the current node, never a node itself

use super::document::{Document, Element, ElementRef};
use super::error::IngestError;
use super::tables::ProfileTables;
use super::IngestOptions;
use crate::cct::{Address, CallingContextTree, Callpath, NodeFacts, NodeKind, NodeRef};
use std::sync::Arc;
use tracing::{debug, warn};

pub const CALL_PATH_SECTION: &str = "SecCallPathProfileData";

/// Where children of the element being processed are attached
#[derive(Clone)]
struct Cursor {
    parent: Option<NodeRef>,
    callpath: Option<Callpath>,
}

/// Single-use builder; all cursor state lives here, scoped to one document
pub(crate) struct TreeBuilder<'a> {
    document: &'a Document,
    tables: &'a ProfileTables,
    options: &'a IngestOptions,
    tree: CallingContextTree,
    current_file: Option<Arc<str>>,
}

impl<'a> TreeBuilder<'a> {
    pub(crate) fn new(
        document: &'a Document,
        tables: &'a ProfileTables,
        options: &'a IngestOptions,
    ) -> Self {
        Self {
            document,
            tables,
            options,
            tree: CallingContextTree::new(),
            current_file: None,
        }
    }

    pub(crate) fn build(mut self) -> Result<CallingContextTree, IngestError> {
        let section = self.document.section(CALL_PATH_SECTION)?;

        let top_level = Cursor {
            parent: None,
            callpath: None,
        };
        let mut pending: Vec<(ElementRef, Cursor)> = Vec::new();
        for &child in self.document.element(section).children().iter().rev() {
            let tag = self.document.element(child).tag();
            if tag == "PF" {
                pending.push((child, top_level.clone()));
            } else {
                warn!("Skipping top-level <{}> element in call-path section", tag);
            }
        }

        while let Some((element, cursor)) = pending.pop() {
            if let Some(next) = self.visit(element, &cursor)? {
                let children = self.document.element(element).children();
                pending.extend(children.iter().rev().map(|&child| (child, next.clone())));
            }
        }

        debug!(
            "Built calling-context tree: {} nodes, {} roots",
            self.tree.len(),
            self.tree.roots().len()
        );
        Ok(self.tree)
    }

    /// Process one element; returns the cursor for its children, or None
    /// when the element has no children to walk (metrics)
    fn visit(&mut self, element: ElementRef, cursor: &Cursor) -> Result<Option<Cursor>, IngestError> {
        let document = self.document;
        let element = document.element(element);

        match element.tag() {
            "M" => {
                self.attach_metric(element, cursor)?;
                Ok(None)
            }
            "PF" | "Pr" => self.visit_procedure(element, cursor),
            "L" => {
                let file = self.tables.source_files.resolve(element.require("f")?)?;
                self.current_file = Some(Arc::clone(&file));
                let line = parse_line(element)?;
                let name = format!("Loop@{}:{}", basename(&file), line);
                let facts = NodeFacts {
                    kind: NodeKind::Loop,
                    file: Some(file),
                    line: Some(line),
                    module: None,
                    address: optional_address(element),
                };
                self.create(element, name, facts, cursor).map(Some)
            }
            "S" => {
                let line = parse_line(element)?;
                let facts = NodeFacts {
                    kind: NodeKind::Statement,
                    file: self.current_file.clone(),
                    line: Some(line),
                    module: None,
                    address: optional_address(element),
                };
                self.create(element, format!("line {}", line), facts, cursor)
                    .map(Some)
            }
            "C" if self.options.call_site_nodes => {
                let address = optional_address(element);
                let facts = NodeFacts {
                    kind: NodeKind::CallSite,
                    file: None,
                    line: optional_line(element)?,
                    module: None,
                    address,
                };
                let name = format!("callsite@{}", facts.address);
                self.create(element, name, facts, cursor).map(Some)
            }
            "C" => Ok(Some(cursor.clone())),
            other => Err(IngestError::UnexpectedElement(other.to_string())),
        }
    }

    fn visit_procedure(
        &mut self,
        element: &Element,
        cursor: &Cursor,
    ) -> Result<Option<Cursor>, IngestError> {
        let name = self.tables.procedures.resolve(element.require("n")?)?;
        let file = self.tables.source_files.resolve(element.require("f")?)?;
        let module = self.tables.load_modules.resolve(element.require("lm")?)?;
        self.current_file = Some(Arc::clone(&file));

        let kind = if element.tag() == "PF" {
            NodeKind::Procedure
        } else {
            NodeKind::ProcedureMerge
        };
        if kind == NodeKind::ProcedureMerge && name.is_empty() {
            return Ok(Some(cursor.clone()));
        }

        let facts = NodeFacts {
            kind,
            file: Some(file),
            line: optional_line(element)?,
            module: Some(module),
            address: self.tables.procedure_address(&name),
        };
        self.create(element, name, facts, cursor).map(Some)
    }

    fn create(
        &mut self,
        element: &Element,
        name: impl Into<Arc<str>>,
        facts: NodeFacts,
        cursor: &Cursor,
    ) -> Result<Cursor, IngestError> {
        let id = parse_id(element)?;
        let callpath = Callpath::extend(cursor.callpath.as_ref(), name);
        let node = self
            .tree
            .attach(id, callpath.clone(), cursor.parent, facts)?;
        Ok(Cursor {
            parent: Some(node),
            callpath: Some(callpath),
        })
    }

    fn attach_metric(&mut self, element: &Element, cursor: &Cursor) -> Result<(), IngestError> {
        let node = cursor.parent.ok_or_else(|| {
            IngestError::Malformed("metric element outside of any node".to_string())
        })?;
        let metric = self.tables.metrics.resolve(element.require("n")?)?;
        let raw = element.require("v")?;
        let value: f64 = raw.trim().parse().map_err(|_| IngestError::InvalidAttribute {
            element: element.tag().to_string(),
            attribute: "v",
            value: raw.to_string(),
        })?;
        self.tree.set_metric(node, metric, value);
        Ok(())
    }
}

fn parse_id(element: &Element) -> Result<u64, IngestError> {
    let raw = element.require("i")?;
    raw.trim().parse().map_err(|_| IngestError::InvalidAttribute {
        element: element.tag().to_string(),
        attribute: "i",
        value: raw.to_string(),
    })
}

fn parse_line(element: &Element) -> Result<u32, IngestError> {
    optional_line(element)?.ok_or_else(|| IngestError::MissingAttribute {
        element: element.tag().to_string(),
        attribute: "l",
    })
}

fn optional_line(element: &Element) -> Result<Option<u32>, IngestError> {
    element
        .attr("l")
        .map(|raw| {
            raw.trim().parse().map_err(|_| IngestError::InvalidAttribute {
                element: element.tag().to_string(),
                attribute: "l",
                value: raw.to_string(),
            })
        })
        .transpose()
}

fn optional_address(element: &Element) -> Address {
    element
        .attr("v")
        .or_else(|| element.attr("a"))
        .map(Address::new)
        .unwrap_or_default()
}

fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}
