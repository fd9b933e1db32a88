//! Generic in-memory R-Tree.
//!
//! This module provides a Guttman R-Tree over `D`-dimensional rectangles:
//! - Arena-allocated nodes addressed by index, with slot reuse
//! - Quadratic split on overflow
//! - Deletion with condensation and deferred reinsertion
//! - Range search via callback or visitor, and a lazy forward iterator
//! - Best-first nearest neighbour search
//! - Header-validated binary save/load

pub mod rtree_constants;
pub mod rtree_types;
pub mod persistence;
mod rtree_impl;
mod rtree_iter;
mod rtree_nearest;
mod rtree_search;
mod rtree_split;

pub use persistence::{FileHeader, IntegrityReport};
pub use rtree_constants::{ITERATOR_STACK_DEPTH, MAGIC, MAX_LOAD_LEVEL, VERSION};
pub use rtree_impl::RTree;
pub use rtree_iter::Iter;
pub use rtree_search::{SearchOutcome, SearchVisitor};
pub use rtree_types::{RTreeError, RTreeResult, RTreeStats};
