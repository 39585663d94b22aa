// Calling-context tree model
//
// A CCT node is one distinct call path from program entry, annotated with the
// directly-measured metrics of that path. Nodes live in an arena owned by
// `CallingContextTree`; links are `NodeRef` handles, each non-root node has
// exactly one parent, and classification facts are fixed at construction.

mod callpath;
mod node;
mod traverse;

pub use callpath::Callpath;
pub use node::{
    Address, CallingContextTree, CctNode, MetricId, NodeFacts, NodeKind, NodeRef, TreeError,
};
pub use traverse::{BreadthFirst, PostOrder, PreOrder};
