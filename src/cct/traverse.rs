// Depth-first and breadth-first walks over a CallingContextTree
//
// All walks keep an explicit stack or queue, so tree depth never turns into
// call-stack depth. Each call starts a fresh walk.

use super::node::{CallingContextTree, CctNode, NodeRef};
use std::collections::VecDeque;

/// Pre-order depth-first walk (node before its children)
pub struct PreOrder<'a> {
    tree: &'a CallingContextTree,
    stack: Vec<NodeRef>,
    // children of nodes at this depth are not pushed
    limit: Option<usize>,
}

impl<'a> Iterator for PreOrder<'a> {
    type Item = (NodeRef, &'a CctNode);

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.stack.pop()?;
        let node = self.tree.node(current);
        if self.limit.map_or(true, |limit| node.depth() < limit) {
            self.stack.extend(node.children().iter().rev().copied());
        }
        Some((current, node))
    }
}

/// Post-order depth-first walk (children before their node)
pub struct PostOrder<'a> {
    tree: &'a CallingContextTree,
    // (node, children already pushed)
    stack: Vec<(NodeRef, bool)>,
}

impl<'a> Iterator for PostOrder<'a> {
    type Item = (NodeRef, &'a CctNode);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((current, expanded)) = self.stack.pop() {
            let node = self.tree.node(current);
            if expanded || node.children().is_empty() {
                return Some((current, node));
            }
            self.stack.push((current, true));
            self.stack
                .extend(node.children().iter().rev().map(|&child| (child, false)));
        }
        None
    }
}

/// Level-by-level walk
pub struct BreadthFirst<'a> {
    tree: &'a CallingContextTree,
    queue: VecDeque<NodeRef>,
}

impl<'a> Iterator for BreadthFirst<'a> {
    type Item = (NodeRef, &'a CctNode);

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.queue.pop_front()?;
        let node = self.tree.node(current);
        self.queue.extend(node.children().iter().copied());
        Some((current, node))
    }
}

impl CallingContextTree {
    /// Pre-order walk of the subtree rooted at `start`
    pub fn pre_order(&self, start: NodeRef) -> PreOrder<'_> {
        PreOrder {
            tree: self,
            stack: vec![start],
            limit: None,
        }
    }

    /// Pre-order walk of every root in order
    pub fn pre_order_forest(&self) -> PreOrder<'_> {
        PreOrder {
            tree: self,
            stack: self.roots().iter().rev().copied().collect(),
            limit: None,
        }
    }

    /// Pre-order walk of every root that never descends below `max_depth`
    pub fn pre_order_forest_to(&self, max_depth: usize) -> PreOrder<'_> {
        PreOrder {
            limit: Some(max_depth),
            ..self.pre_order_forest()
        }
    }

    /// Post-order walk of the subtree rooted at `start`
    pub fn post_order(&self, start: NodeRef) -> PostOrder<'_> {
        PostOrder {
            tree: self,
            stack: vec![(start, false)],
        }
    }

    /// Post-order walk of every root in order
    pub fn post_order_forest(&self) -> PostOrder<'_> {
        PostOrder {
            tree: self,
            stack: self.roots().iter().rev().map(|&r| (r, false)).collect(),
        }
    }

    /// Breadth-first walk of the subtree rooted at `start`
    pub fn breadth_first(&self, start: NodeRef) -> BreadthFirst<'_> {
        BreadthFirst {
            tree: self,
            queue: VecDeque::from([start]),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::cct::{CallingContextTree, Callpath, NodeFacts, NodeKind, NodeRef};

    //        a
    //      / | \
    //     b  e  f
    //    / \     \
    //   c   d     g
    //             |
    //             h
    fn sample_tree() -> (CallingContextTree, NodeRef) {
        fn add(tree: &mut CallingContextTree, id: u64, name: &str, parent: Option<NodeRef>) -> NodeRef {
            let path = Callpath::extend(parent.map(|p| tree.node(p).callpath()), name);
            tree.attach(id, path, parent, NodeFacts::new(NodeKind::Procedure))
                .unwrap()
        }

        let mut tree = CallingContextTree::new();
        let a = add(&mut tree, 1, "a", None);
        let b = add(&mut tree, 2, "b", Some(a));
        add(&mut tree, 3, "c", Some(b));
        add(&mut tree, 4, "d", Some(b));
        add(&mut tree, 5, "e", Some(a));
        let f = add(&mut tree, 6, "f", Some(a));
        let g = add(&mut tree, 7, "g", Some(f));
        add(&mut tree, 8, "h", Some(g));
        (tree, a)
    }

    fn names<'a>(iter: impl Iterator<Item = (NodeRef, &'a crate::cct::CctNode)>) -> String {
        iter.map(|(_, n)| n.name().to_string()).collect::<Vec<_>>().join("")
    }

    #[test]
    fn test_pre_order() {
        let (tree, root) = sample_tree();
        assert_eq!(names(tree.pre_order(root)), "abcdefgh");
    }

    #[test]
    fn test_post_order() {
        let (tree, root) = sample_tree();
        assert_eq!(names(tree.post_order(root)), "cdbehgfa");
    }

    #[test]
    fn test_breadth_first_visits_every_level() {
        let (tree, root) = sample_tree();
        assert_eq!(names(tree.breadth_first(root)), "abefcdgh");
    }

    #[test]
    fn test_walks_are_restartable() {
        let (tree, root) = sample_tree();
        let first: Vec<_> = tree.pre_order(root).map(|(r, _)| r).collect();
        let second: Vec<_> = tree.pre_order(root).map(|(r, _)| r).collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), tree.len());
    }

    #[test]
    fn test_forest_walks_cover_all_roots() {
        let (mut tree, _) = sample_tree();
        tree.attach(100, Callpath::root("z"), None, NodeFacts::new(NodeKind::Procedure))
            .unwrap();
        assert_eq!(names(tree.pre_order_forest()), "abcdefghz");
        assert_eq!(names(tree.post_order_forest()), "cdbehgfaz");
    }

    #[test]
    fn test_bounded_pre_order_stops_at_depth() {
        let (tree, _) = sample_tree();
        assert_eq!(names(tree.pre_order_forest_to(0)), "a");
        assert_eq!(names(tree.pre_order_forest_to(1)), "abef");
        assert_eq!(names(tree.pre_order_forest_to(2)), "abcdefg");
        assert_eq!(names(tree.pre_order_forest_to(10)), "abcdefgh");
    }

    #[test]
    fn test_bounded_pre_order_prunes_deep_chain() {
        let mut tree = CallingContextTree::new();
        let mut path = Callpath::root("n");
        let mut parent = tree
            .attach(0, path.clone(), None, NodeFacts::new(NodeKind::Procedure))
            .unwrap();
        for id in 1..10_000u64 {
            path = path.child("n");
            parent = tree
                .attach(id, path.clone(), Some(parent), NodeFacts::new(NodeKind::Loop))
                .unwrap();
        }
        let visited: Vec<usize> = tree.pre_order_forest_to(3).map(|(_, n)| n.depth()).collect();
        assert_eq!(visited, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_walk_of_leaf_yields_only_leaf() {
        let (tree, _) = sample_tree();
        let leaf = tree.find(8).unwrap();
        assert_eq!(names(tree.pre_order(leaf)), "h");
        assert_eq!(names(tree.post_order(leaf)), "h");
        assert_eq!(names(tree.breadth_first(leaf)), "h");
    }

    #[test]
    fn test_deep_chain_walks_without_recursion() {
        let mut tree = CallingContextTree::new();
        let mut path = Callpath::root("n");
        let mut parent = tree
            .attach(0, path.clone(), None, NodeFacts::new(NodeKind::Procedure))
            .unwrap();
        for id in 1..100_000u64 {
            path = path.child("n");
            parent = tree
                .attach(id, path.clone(), Some(parent), NodeFacts::new(NodeKind::Loop))
                .unwrap();
        }
        let root = tree.roots()[0];
        assert_eq!(tree.pre_order(root).count(), 100_000);
        assert_eq!(tree.post_order(root).count(), 100_000);
    }
}
