// CCT nodes and the arena that owns them

use super::callpath::Callpath;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised while linking nodes into a tree
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TreeError {
    #[error("duplicate node id {0}")]
    DuplicateNodeId(u64),

    #[error("node {id}: callpath has {actual} entries, expected {expected}")]
    CallpathMismatch {
        id: u64,
        expected: usize,
        actual: usize,
    },
}

/// Starting address as written in the profile ("0x4005d0"), "0" when unknown
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    const UNKNOWN: &'static str = "0";

    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The "no address" sentinel
    pub fn unknown() -> Self {
        Self(Self::UNKNOWN.to_string())
    }

    pub fn is_unknown(&self) -> bool {
        self.0 == Self::UNKNOWN
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Address with the two-character "0x" prefix removed, as printed in reports
    pub fn stripped(&self) -> &str {
        self.0.get(2..).unwrap_or("")
    }

    /// Numeric value of a hex address, with or without the "0x" prefix
    pub fn to_u64(&self) -> Option<u64> {
        let digits = self
            .0
            .strip_prefix("0x")
            .or_else(|| self.0.strip_prefix("0X"))
            .unwrap_or(&self.0);
        u64::from_str_radix(digits, 16).ok()
    }
}

impl Default for Address {
    fn default() -> Self {
        Self::unknown()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Index of a metric in a database's metric table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MetricId(pub usize);

/// Structural kind of a CCT node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// Procedure frame (`PF`)
    Procedure,
    /// Merged (inlined) procedure (`Pr`)
    ProcedureMerge,
    /// Loop (`L`)
    Loop,
    /// Statement (`S`)
    Statement,
    /// Call site (`C`)
    CallSite,
}

impl NodeKind {
    /// Element tag used for this kind in experiment.xml
    pub fn tag(self) -> &'static str {
        match self {
            NodeKind::Procedure => "PF",
            NodeKind::ProcedureMerge => "Pr",
            NodeKind::Loop => "L",
            NodeKind::Statement => "S",
            NodeKind::CallSite => "C",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "PF" => Some(NodeKind::Procedure),
            "Pr" => Some(NodeKind::ProcedureMerge),
            "L" => Some(NodeKind::Loop),
            "S" => Some(NodeKind::Statement),
            "C" => Some(NodeKind::CallSite),
            _ => None,
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Classification attributes fixed at construction
#[derive(Debug, Clone, PartialEq)]
pub struct NodeFacts {
    pub kind: NodeKind,
    pub file: Option<Arc<str>>,
    pub line: Option<u32>,
    pub module: Option<Arc<str>>,
    pub address: Address,
}

impl NodeFacts {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            file: None,
            line: None,
            module: None,
            address: Address::unknown(),
        }
    }
}

/// Handle to a node inside one `CallingContextTree`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeRef(usize);

impl NodeRef {
    pub fn index(self) -> usize {
        self.0
    }
}

/// One calling-context tree node
#[derive(Debug)]
pub struct CctNode {
    id: u64,
    callpath: Callpath,
    parent: Option<NodeRef>,
    children: Vec<NodeRef>,
    metrics: Vec<(MetricId, f64)>,
    facts: NodeFacts,
}

impl CctNode {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Display name (last callpath entry)
    pub fn name(&self) -> &str {
        self.callpath.leaf()
    }

    pub fn callpath(&self) -> &Callpath {
        &self.callpath
    }

    pub fn depth(&self) -> usize {
        self.callpath.len() - 1
    }

    pub fn parent(&self) -> Option<NodeRef> {
        self.parent
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn children(&self) -> &[NodeRef] {
        &self.children
    }

    pub fn kind(&self) -> NodeKind {
        self.facts.kind
    }

    pub fn facts(&self) -> &NodeFacts {
        &self.facts
    }

    pub fn address(&self) -> &Address {
        &self.facts.address
    }

    pub fn metric(&self, id: MetricId) -> Option<f64> {
        self.metrics
            .iter()
            .find(|(metric, _)| *metric == id)
            .map(|(_, value)| *value)
    }

    pub fn metrics(&self) -> &[(MetricId, f64)] {
        &self.metrics
    }

    pub fn has_metrics(&self) -> bool {
        !self.metrics.is_empty()
    }
}

/// Arena-backed calling-context forest
///
/// Nodes are stored in creation order, which for the ingestion builder is
/// document order. That order doubles as the flat node-record list the
/// aggregation engine iterates.
#[derive(Debug, Default)]
pub struct CallingContextTree {
    nodes: Vec<CctNode>,
    roots: Vec<NodeRef>,
    index: HashMap<u64, NodeRef>,
}

impl CallingContextTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a node and link it below `parent` (or as a new root)
    ///
    /// This is the only way to add a child, so every non-root node has
    /// exactly one parent. The callpath must be one entry longer than the
    /// parent's (or a single entry for roots).
    pub fn attach(
        &mut self,
        id: u64,
        callpath: Callpath,
        parent: Option<NodeRef>,
        facts: NodeFacts,
    ) -> Result<NodeRef, TreeError> {
        if self.index.contains_key(&id) {
            return Err(TreeError::DuplicateNodeId(id));
        }

        let expected = parent.map_or(1, |p| self.nodes[p.0].callpath.len() + 1);
        if callpath.len() != expected {
            return Err(TreeError::CallpathMismatch {
                id,
                expected,
                actual: callpath.len(),
            });
        }

        let node_ref = NodeRef(self.nodes.len());
        self.nodes.push(CctNode {
            id,
            callpath,
            parent,
            children: Vec::new(),
            metrics: Vec::new(),
            facts,
        });
        match parent {
            Some(p) => self.nodes[p.0].children.push(node_ref),
            None => self.roots.push(node_ref),
        }
        self.index.insert(id, node_ref);

        Ok(node_ref)
    }

    /// Set a metric value on a node (last write wins)
    pub fn set_metric(&mut self, node: NodeRef, metric: MetricId, value: f64) {
        let metrics = &mut self.nodes[node.0].metrics;
        match metrics.iter_mut().find(|(id, _)| *id == metric) {
            Some(slot) => slot.1 = value,
            None => metrics.push((metric, value)),
        }
    }

    pub fn node(&self, node: NodeRef) -> &CctNode {
        &self.nodes[node.0]
    }

    /// Look up a node by its profile id
    pub fn find(&self, id: u64) -> Option<NodeRef> {
        self.index.get(&id).copied()
    }

    pub fn roots(&self) -> &[NodeRef] {
        &self.roots
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes in creation order
    pub fn records(&self) -> impl Iterator<Item = (NodeRef, &CctNode)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (NodeRef(index), node))
    }
}
