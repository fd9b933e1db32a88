//! Persistence and integrity checking for the R-Tree.
//!
//! This module provides:
//! - Header-validated binary save/load
//! - Integrity checking of the structural invariants

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::mem::size_of;
use std::path::Path;

use log::{info, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::coordinate::Coordinate;
use crate::rect::Rect;

use super::rtree_constants::{MAGIC, MAX_LOAD_LEVEL, VERSION};
use super::rtree_impl::RTree;
use super::rtree_types::{Branch, BranchKind, Node, NodeId, RTreeError, RTreeResult};

// ============================================================================
// File Header
// ============================================================================

/// Header written in front of every saved tree.
///
/// A file can only be loaded into a tree whose type parameters produce the
/// exact same header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileHeader {
    pub magic: u32,
    pub version: u32,
    pub data_size: u32,
    pub coord_size: u32,
    pub area_size: u32,
    pub dims: u32,
    pub max_nodes: u32,
    pub min_nodes: u32,
}

impl FileHeader {
    /// Header describing `RTree<T, C, D, MAX, MIN>`.
    pub fn for_tree<T, C: Coordinate, const D: usize, const MAX: usize, const MIN: usize>() -> Self {
        Self {
            magic: MAGIC,
            version: VERSION,
            data_size: size_of::<T>() as u32,
            coord_size: size_of::<C>() as u32,
            area_size: size_of::<C::Area>() as u32,
            dims: D as u32,
            max_nodes: MAX as u32,
            min_nodes: MIN as u32,
        }
    }

    pub fn validate(&self, expected: &FileHeader) -> RTreeResult<()> {
        if self.magic != MAGIC {
            return Err(RTreeError::IncompatibleFormat(
                "Invalid file format (bad magic)".into(),
            ));
        }
        if self.version != VERSION {
            return Err(RTreeError::IncompatibleFormat(format!(
                "Unsupported file format version {}",
                self.version
            )));
        }
        if self != expected {
            return Err(RTreeError::IncompatibleFormat(format!(
                "Tree parameters differ (file: {:?}, expected: {:?})",
                self, expected
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Save / Load
// ============================================================================

impl<T, C, const D: usize, const MAX: usize, const MIN: usize> RTree<T, C, D, MAX, MIN>
where
    C: Coordinate + Serialize + DeserializeOwned,
    T: Serialize + DeserializeOwned,
{
    /// Writes the tree to `path`, replacing any existing file.
    pub fn save(&self, path: impl AsRef<Path>) -> RTreeResult<()> {
        let file = File::create(path.as_ref())?;
        let mut writer = BufWriter::new(file);
        self.save_to(&mut writer)?;
        writer.flush()?;
        info!("Saved R-Tree with {} entries to {:?}", self.count(), path.as_ref());
        Ok(())
    }

    /// Writes the header followed by every node in pre-order.
    pub fn save_to<W: Write>(&self, writer: &mut W) -> RTreeResult<()> {
        let header = FileHeader::for_tree::<T, C, D, MAX, MIN>();
        encode(&header, writer)?;
        self.save_node(self.root, writer)
    }

    fn save_node<W: Write>(&self, node_id: NodeId, writer: &mut W) -> RTreeResult<()> {
        let node = self.node(node_id);
        encode((node.level, node.len() as u32), writer)?;

        for branch in &node.branches {
            encode(&branch.rect.min[..], writer)?;
            encode(&branch.rect.max[..], writer)?;
            match &branch.kind {
                BranchKind::Child(child) => self.save_node(*child, writer)?,
                BranchKind::Leaf(data) => encode(data, writer)?,
            }
        }
        Ok(())
    }

    /// Replaces the contents of this tree with the tree stored at `path`.
    ///
    /// On any error the current contents are left as they were.
    pub fn load(&mut self, path: impl AsRef<Path>) -> RTreeResult<()> {
        let file = File::open(path.as_ref())?;
        let mut reader = BufReader::new(file);
        self.load_from(&mut reader)?;
        info!("Loaded R-Tree with {} entries from {:?}", self.count(), path.as_ref());
        Ok(())
    }

    pub fn load_from<R: Read>(&mut self, reader: &mut R) -> RTreeResult<()> {
        let header: FileHeader = decode(reader)?;
        if let Err(err) = header.validate(&FileHeader::for_tree::<T, C, D, MAX, MIN>()) {
            warn!("Refusing to load R-Tree: {}", err);
            return Err(err);
        }

        let mut loaded = RTree {
            nodes: Vec::new(),
            free: Vec::new(),
            root: NodeId(0),
            config: self.config,
        };
        loaded.root = loaded.load_node(reader, None, true)?;

        *self = loaded;
        Ok(())
    }

    fn load_node<R: Read>(
        &mut self,
        reader: &mut R,
        expected_level: Option<u32>,
        is_root: bool,
    ) -> RTreeResult<NodeId> {
        let (level, count): (u32, u32) = decode(reader)?;
        let count = count as usize;

        match expected_level {
            Some(expected) if level != expected => {
                return Err(RTreeError::Serialization(format!(
                    "Node at level {} found where level {} was expected",
                    level, expected
                )));
            }
            None if level > MAX_LOAD_LEVEL => {
                return Err(RTreeError::Serialization(format!(
                    "Root level {} exceeds the supported maximum {}",
                    level, MAX_LOAD_LEVEL
                )));
            }
            _ => {}
        }
        if count > MAX || (!is_root && count < MIN) {
            return Err(RTreeError::Serialization(format!(
                "Node with {} branches violates the fill factor",
                count
            )));
        }
        if is_root && level > 0 && count < 2 {
            return Err(RTreeError::Serialization(format!(
                "Internal root with {} branch(es)",
                count
            )));
        }

        let mut node = Node::new(level, MAX);
        for _ in 0..count {
            let min = decode_corner::<C, D, R>(reader)?;
            let max = decode_corner::<C, D, R>(reader)?;
            let rect = Rect { min, max };
            if !rect.is_valid() {
                return Err(RTreeError::Serialization(format!("Invalid rectangle {:?}", rect)));
            }

            let branch = if level > 0 {
                let child = self.load_node(reader, Some(level - 1), false)?;
                let cover = self.node(child).cover();
                if cover != rect {
                    return Err(RTreeError::Serialization(format!(
                        "Branch rect {:?} does not match the cover {:?} of its child",
                        rect, cover
                    )));
                }
                Branch::child(rect, child)
            } else {
                Branch::leaf(rect, decode(reader)?)
            };
            node.branches.push(branch);
        }

        self.nodes.push(node);
        Ok(NodeId(self.nodes.len() - 1))
    }
}

fn encode<E: Serialize, W: Write>(value: E, writer: &mut W) -> RTreeResult<()> {
    bincode::serde::encode_into_std_write(value, writer, bincode::config::legacy())?;
    Ok(())
}

fn decode<V: DeserializeOwned, R: Read>(reader: &mut R) -> RTreeResult<V> {
    Ok(bincode::serde::decode_from_std_read(reader, bincode::config::legacy())?)
}

fn decode_corner<C, const D: usize, R>(reader: &mut R) -> RTreeResult<[C; D]>
where
    C: DeserializeOwned,
    R: Read,
{
    let values: Vec<C> = decode(reader)?;
    let len = values.len();
    <[C; D]>::try_from(values).map_err(|_| {
        RTreeError::Serialization(format!("Expected {} coordinates, found {}", D, len))
    })
}

// ============================================================================
// Integrity Checking
// ============================================================================

/// Result of [`RTree::check_integrity`]
#[derive(Debug, Clone)]
pub struct IntegrityReport {
    /// Total nodes reachable from the root
    pub nodes_checked: u64,
    pub entries_checked: u64,
    /// Arena slots neither reachable nor on the free list
    pub leaked_nodes: Vec<usize>,
    /// Summary of findings
    pub is_valid: bool,
    /// Detailed error messages
    pub errors: Vec<String>,
}

impl IntegrityReport {
    pub fn new() -> Self {
        Self {
            nodes_checked: 0,
            entries_checked: 0,
            leaked_nodes: Vec::new(),
            is_valid: true,
            errors: Vec::new(),
        }
    }

    fn error(&mut self, message: String) {
        self.is_valid = false;
        self.errors.push(message);
    }
}

impl Default for IntegrityReport {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, C, const D: usize, const MAX: usize, const MIN: usize> RTree<T, C, D, MAX, MIN>
where
    C: Coordinate,
{
    /// Re-derives the structural invariants from scratch:
    /// - every internal branch rect equals the cover of its child
    /// - every non-root node holds between `MIN` and `MAX` branches
    /// - every leaf is at level 0 and levels drop by one per step (balance)
    /// - no node is reachable twice and no arena slot is leaked
    pub fn check_integrity(&self) -> IntegrityReport {
        let mut report = IntegrityReport::new();
        let mut seen = vec![false; self.nodes.len()];

        let root = self.root_node();
        if root.len() > MAX {
            report.error(format!("Root holds {} branches (max {})", root.len(), MAX));
        }
        if root.is_internal() && root.len() < 2 {
            report.error(format!("Internal root holds only {} branch(es)", root.len()));
        }

        self.check_node(self.root, root.level, true, &mut seen, &mut report);

        for id in &self.free {
            if seen[id.index()] {
                report.error(format!("Node {} is both reachable and free", id.index()));
            }
            seen[id.index()] = true;
        }
        report.leaked_nodes = seen
            .iter()
            .enumerate()
            .filter(|(_, reached)| !**reached)
            .map(|(index, _)| index)
            .collect();
        if !report.leaked_nodes.is_empty() {
            report.error(format!("{} arena slots leaked", report.leaked_nodes.len()));
        }

        report
    }

    fn check_node(
        &self,
        node_id: NodeId,
        expected_level: u32,
        is_root: bool,
        seen: &mut [bool],
        report: &mut IntegrityReport,
    ) {
        if seen[node_id.index()] {
            report.error(format!("Node {} reachable more than once", node_id.index()));
            return;
        }
        seen[node_id.index()] = true;
        report.nodes_checked += 1;

        let node = self.node(node_id);
        if node.level != expected_level {
            report.error(format!(
                "Node {} at level {}, expected {}",
                node_id.index(),
                node.level,
                expected_level
            ));
            return;
        }
        if !is_root && (node.len() < MIN || node.len() > MAX) {
            report.error(format!(
                "Node {} holds {} branches (allowed {}..={})",
                node_id.index(),
                node.len(),
                MIN,
                MAX
            ));
        }

        for branch in &node.branches {
            match (&branch.kind, node.is_leaf()) {
                (BranchKind::Leaf(_), true) => report.entries_checked += 1,
                (BranchKind::Child(child), false) => {
                    let child_node = self.node(*child);
                    if child_node.branches.is_empty() {
                        report.error(format!("Node {} is empty", child.index()));
                    } else if child_node.cover() != branch.rect {
                        report.error(format!(
                            "Branch rect {:?} does not match the cover {:?} of node {}",
                            branch.rect,
                            child_node.cover(),
                            child.index()
                        ));
                    }
                    self.check_node(*child, expected_level - 1, false, seen, report);
                }
                (_, true) => report.error(format!("Leaf {} holds a child branch", node_id.index())),
                (_, false) => {
                    report.error(format!("Internal node {} holds a value", node_id.index()))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    type SmallTree = RTree<u32, f64, 2, 4, 2>;

    fn populated(count: u32) -> SmallTree {
        let mut tree = SmallTree::new();
        for i in 0..count {
            let x = (i % 13) as f64;
            let y = (i / 13) as f64;
            tree.insert([x, y], [x + 0.5, y + 0.25], i);
        }
        tree
    }

    fn sorted_ids(tree: &SmallTree) -> Vec<u32> {
        let mut ids: Vec<u32> = tree.iter().map(|(_, id)| *id).collect();
        ids.sort();
        ids
    }

    #[test]
    fn test_save_and_load_in_memory() {
        let tree = populated(120);
        let mut buffer = Vec::new();
        tree.save_to(&mut buffer).unwrap();

        let mut restored = SmallTree::new();
        restored.load_from(&mut Cursor::new(buffer)).unwrap();

        assert_eq!(restored.count(), 120);
        assert_eq!(restored.height(), tree.height());
        assert_eq!(sorted_ids(&restored), sorted_ids(&tree));
        assert!(restored.check_integrity().is_valid);
    }

    #[test]
    fn test_load_rejects_other_parameters() {
        let tree = populated(10);
        let mut buffer = Vec::new();
        tree.save_to(&mut buffer).unwrap();

        let mut other: RTree<u32, f64, 2, 8, 4> = RTree::new();
        other.insert([0.0, 0.0], [1.0, 1.0], 42);
        let err = other.load_from(&mut Cursor::new(buffer)).unwrap_err();

        assert!(matches!(err, RTreeError::IncompatibleFormat(_)));
        // Untouched on failure
        assert_eq!(other.count(), 1);
    }

    #[test]
    fn test_load_rejects_bad_magic() {
        let mut header = FileHeader::for_tree::<u32, f64, 2, 4, 2>();
        header.magic = 0xDEADBEEF;
        let mut buffer = Vec::new();
        encode(&header, &mut buffer).unwrap();

        let mut tree = populated(3);
        let err = tree.load_from(&mut Cursor::new(buffer)).unwrap_err();
        assert!(err.to_string().contains("bad magic"));
        assert_eq!(tree.count(), 3);
    }

    #[test]
    fn test_load_truncated_stream_fails_cleanly() {
        let tree = populated(50);
        let mut buffer = Vec::new();
        tree.save_to(&mut buffer).unwrap();
        buffer.truncate(buffer.len() / 2);

        let mut target = populated(5);
        assert!(target.load_from(&mut Cursor::new(buffer)).is_err());
        assert_eq!(target.count(), 5);
    }

    fn header_only() -> Vec<u8> {
        let mut buffer = Vec::new();
        encode(FileHeader::for_tree::<u32, f64, 2, 4, 2>(), &mut buffer).unwrap();
        buffer
    }

    #[test]
    fn test_load_rejects_empty_internal_root() {
        let mut buffer = header_only();
        encode((1u32, 0u32), &mut buffer).unwrap();

        let mut tree = populated(3);
        let err = tree.load_from(&mut Cursor::new(buffer)).unwrap_err();
        assert!(matches!(err, RTreeError::Serialization(_)));
        assert_eq!(tree.count(), 3);

        // Still usable after the refused load
        tree.insert([0.0, 0.0], [1.0, 1.0], 99);
        assert!(tree.check_integrity().is_valid);
    }

    #[test]
    fn test_load_rejects_internal_root_with_one_child() {
        let mut buffer = header_only();
        encode((1u32, 1u32), &mut buffer).unwrap();
        encode(&[0.0f64, 0.0][..], &mut buffer).unwrap();
        encode(&[2.0f64, 2.0][..], &mut buffer).unwrap();
        encode((0u32, 2u32), &mut buffer).unwrap();
        for (corner, id) in [(0.0f64, 1u32), (1.0, 2)] {
            encode(&[corner, corner][..], &mut buffer).unwrap();
            encode(&[corner + 1.0, corner + 1.0][..], &mut buffer).unwrap();
            encode(id, &mut buffer).unwrap();
        }

        let mut tree = SmallTree::new();
        let err = tree.load_from(&mut Cursor::new(buffer)).unwrap_err();
        assert!(err.to_string().contains("Internal root"));
        assert!(tree.is_empty());
    }

    #[test]
    fn test_load_rejects_stale_branch_rect() {
        let mut buffer = header_only();
        encode((1u32, 2u32), &mut buffer).unwrap();
        for (x, stored_max) in [(0.0f64, 5.0f64), (10.0, 11.0)] {
            encode(&[x, 0.0][..], &mut buffer).unwrap();
            encode(&[stored_max, 1.0][..], &mut buffer).unwrap();
            encode((0u32, 2u32), &mut buffer).unwrap();
            for id in 0..2u32 {
                encode(&[x, 0.0][..], &mut buffer).unwrap();
                encode(&[x + 1.0, 1.0][..], &mut buffer).unwrap();
                encode(id, &mut buffer).unwrap();
            }
        }

        let mut tree = SmallTree::new();
        let err = tree.load_from(&mut Cursor::new(buffer)).unwrap_err();
        assert!(err.to_string().contains("does not match the cover"));
    }

    #[test]
    fn test_load_rejects_excessive_root_level() {
        let mut buffer = header_only();
        encode((MAX_LOAD_LEVEL + 1, 2u32), &mut buffer).unwrap();

        let mut tree = SmallTree::new();
        let err = tree.load_from(&mut Cursor::new(buffer)).unwrap_err();
        assert!(err.to_string().contains("exceeds the supported maximum"));
    }

    #[test]
    fn test_header_for_tree() {
        let header = FileHeader::for_tree::<u64, i32, 3, 16, 8>();
        assert_eq!(header.magic, MAGIC);
        assert_eq!(header.data_size, 8);
        assert_eq!(header.coord_size, 4);
        assert_eq!(header.area_size, 8);
        assert_eq!(header.dims, 3);
        assert!(header.validate(&header.clone()).is_ok());
    }

    #[test]
    fn test_integrity_detects_stale_cover() {
        let mut tree = populated(30);
        assert!(tree.check_integrity().is_valid);

        let root = tree.root;
        tree.node_mut(root).branches[0].rect.max[0] += 1.0;
        let report = tree.check_integrity();
        assert!(!report.is_valid);
        assert!(report.errors.iter().any(|e| e.contains("does not match the cover")));
    }

    #[test]
    fn test_integrity_detects_underfull_node() {
        let mut tree = populated(30);
        let root = tree.root;
        let child = tree.node(root).branches[0].child_id();
        tree.node_mut(child).branches.truncate(1);

        let report = tree.check_integrity();
        assert!(!report.is_valid);
        assert!(report.errors.iter().any(|e| e.contains("holds 1 branches")));
    }

    #[test]
    fn test_integrity_of_empty_tree() {
        let report = SmallTree::new().check_integrity();
        assert!(report.is_valid);
        assert_eq!(report.nodes_checked, 1);
        assert_eq!(report.entries_checked, 0);
    }
}
