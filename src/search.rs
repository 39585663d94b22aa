//! Ancestor and descendant searches over a calling-context tree
//!
//! Upward searches start at a node's parent and walk parent-to-parent:
//!
//! - [`enclosing_procedure`]: first `Procedure` frame. Reaching a root first
//!   is a structural violation.
//! - [`enclosing_call_site`]: first `CallSite` node, or the unknown address
//!   when a root is reached (call sites are optional in a callpath).
//! - [`enclosing_loop`]: first `Loop` or `Procedure`; stopping at a procedure
//!   means "no enclosing loop".
//!
//! The downward search, [`descendant_metric`], follows first children from a
//! marker node until a node carries the wanted metric.

use crate::cct::{Address, CallingContextTree, MetricId, NodeKind, NodeRef};
use thiserror::Error;

/// The tree does not have the shape an attribution search relies on
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StructuralViolation {
    #[error("node {node}: reached a root without an enclosing procedure")]
    NoEnclosingProcedure { node: u64 },

    #[error("node {node}: reached a root without an enclosing loop or procedure")]
    NoEnclosingScope { node: u64 },

    #[error("marker node {node}: no metric {metric} on its first-child chain")]
    NoMetricDescendant { node: u64, metric: usize },
}

/// Result of [`enclosing_procedure`]
#[derive(Debug, Clone, PartialEq)]
pub struct ProcedureHit {
    /// Starting address of the procedure, unknown ("0") if none recorded
    pub address: Address,
    pub node: NodeRef,
}

/// Nearest enclosing procedure frame of `node`
pub fn enclosing_procedure(
    tree: &CallingContextTree,
    node: NodeRef,
) -> Result<ProcedureHit, StructuralViolation> {
    let violation = || StructuralViolation::NoEnclosingProcedure {
        node: tree.node(node).id(),
    };

    let mut current = tree.node(node).parent().ok_or_else(violation)?;
    loop {
        let candidate = tree.node(current);
        if candidate.kind() == NodeKind::Procedure {
            return Ok(ProcedureHit {
                address: candidate.address().clone(),
                node: current,
            });
        }
        current = candidate.parent().ok_or_else(violation)?;
    }
}

/// Address of the nearest enclosing call site of `node`, unknown if none
pub fn enclosing_call_site(tree: &CallingContextTree, node: NodeRef) -> Address {
    let mut current = tree.node(node).parent();
    while let Some(candidate) = current {
        let candidate = tree.node(candidate);
        if candidate.kind() == NodeKind::CallSite {
            return candidate.address().clone();
        }
        current = candidate.parent();
    }
    Address::unknown()
}

/// Nearest enclosing loop of `node`, or None when the nearest scope is a
/// procedure frame
pub fn enclosing_loop(
    tree: &CallingContextTree,
    node: NodeRef,
) -> Result<Option<NodeRef>, StructuralViolation> {
    let violation = || StructuralViolation::NoEnclosingScope {
        node: tree.node(node).id(),
    };

    let mut current = tree.node(node).parent().ok_or_else(violation)?;
    loop {
        let candidate = tree.node(current);
        match candidate.kind() {
            NodeKind::Loop => return Ok(Some(current)),
            NodeKind::Procedure => return Ok(None),
            _ => current = candidate.parent().ok_or_else(violation)?,
        }
    }
}

/// Value of `metric` on the nearest first-child descendant carrying it
///
/// The search never reads `node` itself. A chain that ends without the
/// metric is a structural violation.
pub fn descendant_metric(
    tree: &CallingContextTree,
    node: NodeRef,
    metric: MetricId,
) -> Result<f64, StructuralViolation> {
    let violation = || StructuralViolation::NoMetricDescendant {
        node: tree.node(node).id(),
        metric: metric.0,
    };

    let mut current = *tree.node(node).children().first().ok_or_else(violation)?;
    loop {
        let candidate = tree.node(current);
        if let Some(value) = candidate.metric(metric) {
            return Ok(value);
        }
        current = *candidate.children().first().ok_or_else(violation)?;
    }
}
