//! Core types and data structures for the R-Tree.
//!
//! This module defines the fundamental types used throughout the R-Tree:
//! - Error types and result types
//! - Node handles, branches and nodes
//! - Statistics structures

use std::io;

use thiserror::Error;

use crate::coordinate::Coordinate;
use crate::rect::Rect;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur while saving or loading an R-Tree
#[derive(Debug, Error)]
pub enum RTreeError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Incompatible file format: {0}")]
    IncompatibleFormat(String),
}

impl From<bincode::error::EncodeError> for RTreeError {
    fn from(err: bincode::error::EncodeError) -> Self {
        match err {
            bincode::error::EncodeError::Io { inner, .. } => RTreeError::Io(inner),
            other => RTreeError::Serialization(other.to_string()),
        }
    }
}

impl From<bincode::error::DecodeError> for RTreeError {
    fn from(err: bincode::error::DecodeError) -> Self {
        match err {
            bincode::error::DecodeError::Io { inner, .. } => RTreeError::Io(inner),
            other => RTreeError::Serialization(other.to_string()),
        }
    }
}

/// Result type for R-Tree persistence operations
pub type RTreeResult<T> = Result<T, RTreeError>;

// ============================================================================
// Node Types
// ============================================================================

/// Handle of a node inside the tree's node arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct NodeId(pub(crate) usize);

impl NodeId {
    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0
    }
}

/// What a branch points at: a child node in an internal node, or a stored
/// value in a leaf.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum BranchKind<T> {
    Child(NodeId),
    Leaf(T),
}

/// A bounding rectangle plus the child or value it bounds
#[derive(Debug, Clone)]
pub(crate) struct Branch<T, C, const D: usize> {
    pub rect: Rect<C, D>,
    pub kind: BranchKind<T>,
}

impl<T, C, const D: usize> Branch<T, C, D> {
    pub fn leaf(rect: Rect<C, D>, data: T) -> Self {
        Branch {
            rect,
            kind: BranchKind::Leaf(data),
        }
    }

    pub fn child(rect: Rect<C, D>, child: NodeId) -> Self {
        Branch {
            rect,
            kind: BranchKind::Child(child),
        }
    }

    /// Child handle of an internal branch.
    ///
    /// Panics if called on a leaf branch, which means the tree's levels are
    /// corrupt.
    #[inline]
    pub fn child_id(&self) -> NodeId {
        match self.kind {
            BranchKind::Child(id) => id,
            BranchKind::Leaf(_) => unreachable!("leaf branch found in an internal node"),
        }
    }
}

/// A tree node. Level 0 nodes are leaves; levels grow toward the root.
#[derive(Debug, Clone)]
pub(crate) struct Node<T, C, const D: usize> {
    pub level: u32,
    pub branches: Vec<Branch<T, C, D>>,
}

impl<T, C: Coordinate, const D: usize> Node<T, C, D> {
    pub fn new(level: u32, capacity: usize) -> Self {
        Node {
            level,
            branches: Vec::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.level == 0
    }

    #[inline]
    pub fn is_internal(&self) -> bool {
        self.level > 0
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.branches.len()
    }

    /// Minimum bounding rectangle of every branch in this node.
    ///
    /// The node must not be empty.
    pub fn cover(&self) -> Rect<C, D> {
        debug_assert!(!self.branches.is_empty(), "cover of an empty node");
        let mut cover = self.branches[0].rect;
        for branch in &self.branches[1..] {
            cover.expand(&branch.rect);
        }
        cover
    }

    /// Removes the branch at `index` by moving the last branch into its slot.
    #[inline]
    pub fn disconnect_branch(&mut self, index: usize) -> Branch<T, C, D> {
        self.branches.swap_remove(index)
    }
}

// ============================================================================
// Statistics
// ============================================================================

/// Structural statistics of an R-Tree
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RTreeStats {
    /// Number of stored values
    pub total_entries: u64,
    /// Number of live nodes
    pub total_nodes: u64,
    pub leaf_nodes: u64,
    pub internal_nodes: u64,
    /// Number of levels, a lone leaf root counts as 1
    pub tree_height: u32,
    /// Arena slots waiting to be reused
    pub free_slots: u64,
}
