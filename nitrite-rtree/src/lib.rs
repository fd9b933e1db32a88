//! # Nitrite R-Tree - Generic N-Dimensional Spatial Index
//!
//! This crate provides an in-memory R-Tree that stores arbitrary values keyed
//! by `D`-dimensional axis-aligned bounding rectangles.
//!
//! ## Features
//!
//! - **Generic**: Value type, coordinate type, dimensionality and node fan-out
//!   are all type parameters, checked at compile time
//! - **Guttman Quadratic Split**: Classic overflow handling
//! - **Condensing Deletion**: Underfull nodes are dissolved and their entries
//!   reinserted at their original level
//! - **Range Search**: Callback, visitor, collecting and lazy iterator forms
//! - **Nearest Neighbours**: Best-first search with custom termination,
//!   filtering and distance functions
//! - **Persistence**: Header-validated binary save/load
//!
//! ## Quick Start
//!
//! ```rust
//! use nitrite_rtree::{Rect, RTree};
//!
//! let mut tree: RTree<&str> = RTree::new();
//! tree.insert([0.0, 0.0], [1.0, 1.0], "a");
//! tree.insert([5.0, 5.0], [6.0, 6.0], "b");
//! tree.insert([2.0, 2.0], [3.0, 3.0], "c");
//!
//! // Range search
//! let mut hits = tree.find_intersecting(&Rect::new([0.0, 0.0], [3.0, 3.0]));
//! hits.sort();
//! assert_eq!(hits, vec!["a", "c"]);
//!
//! // Nearest neighbour
//! let nearest = tree.nearest_k([3.5, 3.5], 1);
//! assert_eq!(nearest[0].1, "c");
//! ```
//!
//! ## Custom Parameters
//!
//! ```rust
//! use nitrite_rtree::{RTree, RTreeConfig, VolumeMetric};
//!
//! // 3-D integer coordinates, nodes of 4..=16 branches
//! let config = RTreeConfig::new().volume_metric(VolumeMetric::Rectangular);
//! let mut tree: RTree<u64, i32, 3, 16, 4> = RTree::with_config(config);
//! tree.insert([0, 0, 0], [10, 10, 10], 7);
//! assert_eq!(tree.count(), 1);
//! ```
//!
//! ## Persistence
//!
//! ```rust,no_run
//! use nitrite_rtree::RTree;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut tree: RTree<u32> = RTree::new();
//! tree.insert([0.0, 0.0], [1.0, 1.0], 1);
//! tree.save("tree.bin")?;
//!
//! let mut restored: RTree<u32> = RTree::new();
//! restored.load("tree.bin")?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod coordinate;
pub mod rect;
pub mod rtree;

// Re-export core types
pub use config::{RTreeConfig, VolumeMetric};
pub use coordinate::{AreaNum, Coordinate};
pub use rect::{unit_sphere_volume, Rect};

// Re-export tree types
pub use rtree::{
    FileHeader, IntegrityReport, Iter, RTree, RTreeError, RTreeResult, RTreeStats, SearchOutcome,
    SearchVisitor,
};
