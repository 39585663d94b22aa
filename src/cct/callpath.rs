// Immutable root-first callpaths with shared prefixes
//
// Every CCT node carries the display names from its root down to itself.
// Siblings share their parent's prefix, so a path costs one segment per node
// instead of one full copy per node.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

#[derive(Debug)]
struct Segment {
    name: Arc<str>,
    parent: Option<Arc<Segment>>,
    len: usize,
}

impl Drop for Segment {
    // Long chains are released iteratively so that dropping a deep tree
    // cannot overflow the stack.
    fn drop(&mut self) {
        let mut next = self.parent.take();
        while let Some(link) = next {
            match Arc::try_unwrap(link) {
                Ok(mut segment) => next = segment.parent.take(),
                Err(_) => break,
            }
        }
    }
}

/// Ordered sequence of display names from a root to one node
#[derive(Debug, Clone)]
pub struct Callpath {
    tail: Arc<Segment>,
}

impl Callpath {
    /// Start a new path at a root
    pub fn root(name: impl Into<Arc<str>>) -> Self {
        Self {
            tail: Arc::new(Segment {
                name: name.into(),
                parent: None,
                len: 1,
            }),
        }
    }

    /// Path of a child named `name` below this path
    pub fn child(&self, name: impl Into<Arc<str>>) -> Self {
        Self {
            tail: Arc::new(Segment {
                name: name.into(),
                parent: Some(Arc::clone(&self.tail)),
                len: self.tail.len + 1,
            }),
        }
    }

    /// Extend an optional parent path (None starts a root path)
    pub fn extend(parent: Option<&Callpath>, name: impl Into<Arc<str>>) -> Self {
        match parent {
            Some(path) => path.child(name),
            None => Self::root(name),
        }
    }

    /// Number of names in the path (depth + 1)
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.tail.len
    }

    /// Last name in the path, the node's own display name
    pub fn leaf(&self) -> &str {
        &self.tail.name
    }

    /// Names root-first
    pub fn names(&self) -> Vec<&str> {
        let mut names = Vec::with_capacity(self.len());
        let mut cursor = Some(&self.tail);
        while let Some(segment) = cursor {
            names.push(&*segment.name);
            cursor = segment.parent.as_ref();
        }
        names.reverse();
        names
    }

    /// True if both paths are the same shared path object
    pub fn ptr_eq(&self, other: &Callpath) -> bool {
        Arc::ptr_eq(&self.tail, &other.tail)
    }
}

impl PartialEq for Callpath {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || (self.len() == other.len() && self.names() == other.names())
    }
}

impl Eq for Callpath {}

impl PartialOrd for Callpath {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Callpath {
    fn cmp(&self, other: &Self) -> Ordering {
        self.names().cmp(&other.names())
    }
}

impl fmt::Display for Callpath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.names().join(" > "))
    }
}
