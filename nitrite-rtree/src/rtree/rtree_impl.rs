//! RTree implementation: arena, insertion and deletion.

use log::{debug, trace};

use crate::config::RTreeConfig;
use crate::coordinate::Coordinate;
use crate::rect::Rect;

use super::rtree_types::{Branch, BranchKind, Node, NodeId, RTreeStats};

/// Outcome of inserting into a subtree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum InsertOutcome {
    NoSplit,
    /// The node overflowed and was split; the handle is the new sibling
    Split(NodeId),
}

/// A balanced tree of `D`-dimensional bounding rectangles.
///
/// Each entry is a `(Rect, T)` pair. Nodes hold between `MIN` and `MAX`
/// branches (the root may hold fewer), every leaf sits at the same depth, and
/// every internal branch's rectangle is exactly the bounding rectangle of its
/// child's branches.
///
/// The tree is not internally synchronized. Mutation requires `&mut self`, so
/// searches and iterators cannot observe a half-finished update.
///
/// # Examples
///
/// ```rust
/// use nitrite_rtree::RTree;
///
/// let mut tree: RTree<u32> = RTree::new();
/// tree.insert([0.0, 0.0], [1.0, 1.0], 1);
/// tree.insert([5.0, 5.0], [6.0, 6.0], 2);
/// tree.insert([2.0, 2.0], [3.0, 3.0], 3);
///
/// let mut found = Vec::new();
/// let count = tree.search([0.0, 0.0], [3.0, 3.0], |id| {
///     found.push(*id);
///     true
/// });
/// assert_eq!(count, 2);
///
/// // `remove` returns true when the entry was NOT found
/// assert!(!tree.remove([5.0, 5.0], [6.0, 6.0], &2));
/// assert!(tree.remove([5.0, 5.0], [6.0, 6.0], &2));
/// assert_eq!(tree.count(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct RTree<T, C = f64, const D: usize = 2, const MAX: usize = 8, const MIN: usize = 4> {
    pub(super) nodes: Vec<Node<T, C, D>>,
    /// Arena slots released by condensation, reused before growing the arena
    pub(super) free: Vec<NodeId>,
    pub(super) root: NodeId,
    pub(super) config: RTreeConfig,
}

impl<T, C, const D: usize, const MAX: usize, const MIN: usize> RTree<T, C, D, MAX, MIN>
where
    C: Coordinate,
{
    const PARAMETERS_OK: () = assert!(
        D > 0 && MIN > 0 && MAX > MIN && 2 * MIN <= MAX + 1,
        "R-Tree parameters require D > 0, MAX > MIN > 0 and 2 * MIN <= MAX + 1"
    );

    /// Creates an empty tree with the default configuration.
    pub fn new() -> Self {
        Self::with_config(RTreeConfig::default())
    }

    /// Creates an empty tree with a custom configuration.
    pub fn with_config(config: RTreeConfig) -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::PARAMETERS_OK;

        RTree {
            nodes: vec![Node::new(0, MAX)],
            free: Vec::new(),
            root: NodeId(0),
            config,
        }
    }

    pub fn config(&self) -> &RTreeConfig {
        &self.config
    }

    /// Inserts an entry covering `min..=max`.
    ///
    /// Always succeeds; the tree grows by one level when the root splits.
    pub fn insert(&mut self, min: [C; D], max: [C; D], data: T) {
        self.insert_rect(Rect::new(min, max), data);
    }

    /// Inserts an entry with a prebuilt rectangle.
    pub fn insert_rect(&mut self, rect: Rect<C, D>, data: T) {
        debug_assert!(rect.is_valid(), "invalid rectangle {:?}", rect);
        self.insert_branch(Branch::leaf(rect, data), 0);
    }

    /// Counts the stored entries by walking the whole tree.
    pub fn count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self.root];
        while let Some(node_id) = stack.pop() {
            let node = self.node(node_id);
            if node.is_leaf() {
                count += node.len();
            } else {
                stack.extend(node.branches.iter().map(Branch::child_id));
            }
        }
        count
    }

    pub fn is_empty(&self) -> bool {
        self.root_node().branches.is_empty()
    }

    /// Number of levels in the tree; an empty or single-leaf tree has height 1.
    pub fn height(&self) -> usize {
        self.root_node().level as usize + 1
    }

    /// Drops every entry and resets the tree to a single empty leaf.
    pub fn remove_all(&mut self) {
        self.nodes.clear();
        self.free.clear();
        self.nodes.push(Node::new(0, MAX));
        self.root = NodeId(0);
        debug!("R-Tree cleared");
    }

    /// Structural statistics gathered by a full traversal.
    pub fn stats(&self) -> RTreeStats {
        let mut stats = RTreeStats {
            tree_height: self.height() as u32,
            free_slots: self.free.len() as u64,
            ..Default::default()
        };

        let mut stack = vec![self.root];
        while let Some(node_id) = stack.pop() {
            let node = self.node(node_id);
            stats.total_nodes += 1;
            if node.is_leaf() {
                stats.leaf_nodes += 1;
                stats.total_entries += node.len() as u64;
            } else {
                stats.internal_nodes += 1;
                stack.extend(node.branches.iter().map(Branch::child_id));
            }
        }
        stats
    }

    // ------------------------------------------------------------------------
    // Arena
    // ------------------------------------------------------------------------

    #[inline]
    pub(super) fn node(&self, id: NodeId) -> &Node<T, C, D> {
        &self.nodes[id.index()]
    }

    #[inline]
    pub(super) fn node_mut(&mut self, id: NodeId) -> &mut Node<T, C, D> {
        &mut self.nodes[id.index()]
    }

    #[inline]
    pub(super) fn root_node(&self) -> &Node<T, C, D> {
        self.node(self.root)
    }

    /// Allocates an empty node, reusing a freed slot if there is one.
    pub(super) fn allocate_node(&mut self, level: u32) -> NodeId {
        if let Some(id) = self.free.pop() {
            let node = self.node_mut(id);
            debug_assert!(node.branches.is_empty());
            node.level = level;
            return id;
        }

        self.nodes.push(Node::new(level, MAX));
        NodeId(self.nodes.len() - 1)
    }

    /// Returns a node's slot to the free list. Its branches must already
    /// have been moved out or be unwanted.
    pub(super) fn free_node(&mut self, id: NodeId) {
        debug_assert_ne!(id, self.root, "freeing the root");
        self.node_mut(id).branches.clear();
        self.free.push(id);
    }

    // ------------------------------------------------------------------------
    // Insertion
    // ------------------------------------------------------------------------

    /// Inserts `branch` into a node at `level`, growing a new root if the
    /// old one splits. Level 0 inserts data; higher levels re-attach
    /// subtrees during condensation.
    pub(super) fn insert_branch(&mut self, branch: Branch<T, C, D>, level: u32) {
        debug_assert!(level <= self.root_node().level);

        if let InsertOutcome::Split(sibling) = self.insert_rect_rec(branch, self.root, level) {
            let old_root = self.root;
            let new_level = self.node(old_root).level + 1;
            let old_cover = self.node(old_root).cover();
            let sibling_cover = self.node(sibling).cover();

            let new_root = self.allocate_node(new_level);
            let root = self.node_mut(new_root);
            root.branches.push(Branch::child(old_cover, old_root));
            root.branches.push(Branch::child(sibling_cover, sibling));
            self.root = new_root;

            debug!("Root split, tree height is now {}", new_level + 1);
        }
    }

    fn insert_rect_rec(
        &mut self,
        branch: Branch<T, C, D>,
        node_id: NodeId,
        level: u32,
    ) -> InsertOutcome {
        let node_level = self.node(node_id).level;
        debug_assert!(node_level >= level, "insertion level below the leaves");

        if node_level == level {
            return self.add_branch(branch, node_id);
        }

        let rect = branch.rect;
        let index = self.pick_branch(&rect, node_id);
        let child_id = self.node(node_id).branches[index].child_id();

        match self.insert_rect_rec(branch, child_id, level) {
            InsertOutcome::NoSplit => {
                self.node_mut(node_id).branches[index].rect.expand(&rect);
                InsertOutcome::NoSplit
            }
            InsertOutcome::Split(sibling) => {
                // The child shrank, its old rect may be too large now
                let child_cover = self.node(child_id).cover();
                self.node_mut(node_id).branches[index].rect = child_cover;

                let sibling_cover = self.node(sibling).cover();
                self.add_branch(Branch::child(sibling_cover, sibling), node_id)
            }
        }
    }

    /// Picks the child needing the smallest volume increase to cover `rect`,
    /// preferring the smaller child on ties.
    fn pick_branch(&self, rect: &Rect<C, D>, node_id: NodeId) -> usize {
        let metric = self.config.metric();
        let node = self.node(node_id);
        debug_assert!(!node.branches.is_empty(), "descending into an empty node");

        let mut best_index = 0;
        let mut best: Option<(C::Area, C::Area)> = None;

        for (index, branch) in node.branches.iter().enumerate() {
            let area = branch.rect.volume_by(metric);
            let increase = rect.combine(&branch.rect).volume_by(metric) - area;

            let better = match best {
                None => true,
                Some((best_increase, best_area)) => {
                    increase < best_increase || (increase == best_increase && area < best_area)
                }
            };
            if better {
                best = Some((increase, area));
                best_index = index;
            }
        }
        best_index
    }

    /// Appends `branch` to the node, splitting it if it is already full.
    fn add_branch(&mut self, branch: Branch<T, C, D>, node_id: NodeId) -> InsertOutcome {
        if self.node(node_id).len() < MAX {
            self.node_mut(node_id).branches.push(branch);
            InsertOutcome::NoSplit
        } else {
            InsertOutcome::Split(self.split_node(node_id, branch))
        }
    }
}

impl<T, C, const D: usize, const MAX: usize, const MIN: usize> RTree<T, C, D, MAX, MIN>
where
    C: Coordinate,
    T: PartialEq,
{
    /// Removes the entry whose rectangle overlaps `min..=max` and whose
    /// value equals `data`.
    ///
    /// Returns `false` when the entry was removed and `true` when it was not
    /// found. A miss leaves the tree untouched.
    pub fn remove(&mut self, min: [C; D], max: [C; D], data: &T) -> bool {
        self.remove_rect(&Rect::new(min, max), data)
    }

    /// [`RTree::remove`] with a prebuilt rectangle. Same inverted result.
    pub fn remove_rect(&mut self, rect: &Rect<C, D>, data: &T) -> bool {
        debug_assert!(rect.is_valid(), "invalid rectangle {:?}", rect);

        let mut orphans = Vec::new();
        if !self.remove_rect_rec(rect, data, self.root, &mut orphans) {
            return true;
        }

        if !orphans.is_empty() {
            debug!("Condensing tree, reinserting {} underfull nodes", orphans.len());
        }
        while let Some(orphan) = orphans.pop() {
            let node = self.node_mut(orphan);
            let level = node.level;
            let branches = std::mem::take(&mut node.branches);
            trace!("Reinserting {} branches at level {}", branches.len(), level);

            for branch in branches {
                self.insert_branch(branch, level);
            }
            self.free_node(orphan);
        }

        // Keep the height minimal
        while self.root_node().is_internal() && self.root_node().len() == 1 {
            let old_root = self.root;
            self.root = self.root_node().branches[0].child_id();
            self.node_mut(old_root).branches.clear();
            self.free.push(old_root);
            debug!("Root collapsed, tree height is now {}", self.height());
        }

        false
    }

    /// Returns true if the entry was found and disconnected. Underfull
    /// children are detached and queued in `orphans` for reinsertion.
    fn remove_rect_rec(
        &mut self,
        rect: &Rect<C, D>,
        data: &T,
        node_id: NodeId,
        orphans: &mut Vec<NodeId>,
    ) -> bool {
        if self.node(node_id).is_leaf() {
            let position = self.node(node_id).branches.iter().position(|branch| {
                matches!(&branch.kind, BranchKind::Leaf(value) if value == data)
            });
            return match position {
                Some(index) => {
                    self.node_mut(node_id).disconnect_branch(index);
                    true
                }
                None => false,
            };
        }

        for index in 0..self.node(node_id).len() {
            let branch = &self.node(node_id).branches[index];
            if !rect.overlaps(&branch.rect) {
                continue;
            }

            let child_id = branch.child_id();
            if self.remove_rect_rec(rect, data, child_id, orphans) {
                if self.node(child_id).len() >= MIN {
                    let cover = self.node(child_id).cover();
                    self.node_mut(node_id).branches[index].rect = cover;
                } else {
                    orphans.push(child_id);
                    self.node_mut(node_id).disconnect_branch(index);
                }
                return true;
            }
        }
        false
    }
}

impl<T, C, const D: usize, const MAX: usize, const MIN: usize> Default for RTree<T, C, D, MAX, MIN>
where
    C: Coordinate,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, C, const D: usize, const MAX: usize, const MIN: usize> Extend<(Rect<C, D>, T)>
    for RTree<T, C, D, MAX, MIN>
where
    C: Coordinate,
{
    fn extend<I: IntoIterator<Item = (Rect<C, D>, T)>>(&mut self, entries: I) {
        for (rect, data) in entries {
            self.insert_rect(rect, data);
        }
    }
}

impl<T, C, const D: usize, const MAX: usize, const MIN: usize> FromIterator<(Rect<C, D>, T)>
    for RTree<T, C, D, MAX, MIN>
where
    C: Coordinate,
{
    fn from_iter<I: IntoIterator<Item = (Rect<C, D>, T)>>(entries: I) -> Self {
        let mut tree = Self::new();
        tree.extend(entries);
        tree
    }
}
