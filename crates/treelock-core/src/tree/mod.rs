//! Immutable m-ary tree shape
//!
//! Nodes live in a flat arena addressed by [`NodeId`]. Parent and child
//! links are arena indices, so the shape can be shared read-only (for
//! example behind an `Arc`) without any synchronization. Lock state is kept
//! elsewhere; see [`LockEngine`](crate::engine::LockEngine).

mod iter;

pub use iter::{Ancestors, Subtree};

use crate::error::TreeError;
use crate::types::NodeId;
use std::collections::HashMap;

/// Static tree built once from an ordered list of names and an arity.
#[derive(Debug, Clone)]
pub struct Tree {
    arity: usize,
    names: Vec<String>,
    parents: Vec<Option<NodeId>>,
    children: Vec<Vec<NodeId>>,
    depths: Vec<usize>,
    index: HashMap<String, NodeId>,
}

impl Tree {
    /// Build a tree where node `i >= 1` is a child of node `(i - 1) / arity`.
    ///
    /// # Errors
    /// - [`TreeError::InvalidArity`] if `arity < 1`
    /// - [`TreeError::EmptyTree`] if `names` is empty
    /// - [`TreeError::DuplicateName`] on the first repeated name
    pub fn build<I, S>(names: I, arity: usize) -> Result<Self, TreeError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if arity < 1 {
            return Err(TreeError::InvalidArity(arity));
        }

        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            return Err(TreeError::EmptyTree);
        }

        let len = names.len();
        let mut index = HashMap::with_capacity(len);
        let mut parents = Vec::with_capacity(len);
        let mut children = vec![Vec::new(); len];
        let mut depths = Vec::with_capacity(len);

        for (i, name) in names.iter().enumerate() {
            if index.insert(name.clone(), NodeId(i)).is_some() {
                return Err(TreeError::DuplicateName(name.clone()));
            }

            if i == 0 {
                parents.push(None);
                depths.push(0);
            } else {
                // Parents always precede their children in construction order.
                let parent = (i - 1) / arity;
                parents.push(Some(NodeId(parent)));
                children[parent].push(NodeId(i));
                depths.push(depths[parent] + 1);
            }
        }

        let tree = Self {
            arity,
            names,
            parents,
            children,
            depths,
            index,
        };

        tracing::info!(
            nodes = tree.len(),
            arity,
            height = tree.height(),
            "built lock tree"
        );

        Ok(tree)
    }

    /// Resolve a node by name
    ///
    /// # Errors
    /// Returns [`TreeError::UnknownNode`] if no node carries `name`.
    pub fn lookup(&self, name: &str) -> Result<NodeId, TreeError> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| TreeError::UnknownNode(name.to_string()))
    }

    /// Strict ancestors of `node`, nearest first, ending at the root
    #[inline]
    #[must_use]
    pub fn ancestors_of(&self, node: NodeId) -> Ancestors<'_> {
        Ancestors::new(self, node)
    }

    /// Strict descendants of `node` (pre-order, explicit stack)
    #[inline]
    #[must_use]
    pub fn subtree_of(&self, node: NodeId) -> Subtree<'_> {
        Subtree::new(self, node)
    }

    /// Number of nodes
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Always false for a built tree; kept for API symmetry with `len`
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// The root node
    #[inline]
    #[must_use]
    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Arity the tree was generated with
    #[inline]
    #[must_use]
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Name of a node
    ///
    /// # Panics
    /// Panics if `node` does not belong to this tree.
    #[inline]
    #[must_use]
    pub fn name(&self, node: NodeId) -> &str {
        &self.names[node.0]
    }

    /// Parent of a node (`None` for the root)
    #[inline]
    #[must_use]
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.parents[node.0]
    }

    /// Children of a node, in construction order
    #[inline]
    #[must_use]
    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.children[node.0]
    }

    /// Distance from the root (root has depth 0)
    #[inline]
    #[must_use]
    pub fn depth(&self, node: NodeId) -> usize {
        self.depths[node.0]
    }

    /// Depth of the deepest node
    #[must_use]
    pub fn height(&self) -> usize {
        // The last node in construction order is always among the deepest.
        self.depths.last().copied().unwrap_or(0)
    }

    /// Whether `node` is a valid handle for this tree
    #[inline]
    #[must_use]
    pub fn contains(&self, node: NodeId) -> bool {
        node.0 < self.len()
    }

    /// True if `ancestor` lies strictly above `node`
    #[must_use]
    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        if self.depth(ancestor) >= self.depth(node) {
            return false;
        }
        self.ancestors_of(node)
            .take_while(|a| self.depth(*a) >= self.depth(ancestor))
            .any(|a| a == ancestor)
    }

    /// All node handles in construction order
    pub fn nodes(&self) -> impl ExactSizeIterator<Item = NodeId> + '_ {
        (0..self.len()).map(NodeId)
    }
}
