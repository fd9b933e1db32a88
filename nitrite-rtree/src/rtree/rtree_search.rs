//! Range search.
//!
//! Both entry points share one branch-and-bound traversal: internal branches
//! are only followed when their rectangle overlaps the query, and every
//! overlapping leaf entry is reported and counted.

use crate::coordinate::Coordinate;
use crate::rect::Rect;

use super::rtree_impl::RTree;
use super::rtree_types::{BranchKind, NodeId};

/// Statically dispatched search callback.
///
/// Implement this on a struct to have the traversal specialized for it at
/// compile time. Closures `FnMut(&T) -> bool` implement it as well.
pub trait SearchVisitor<T> {
    /// Called for every matching entry. Return `false` to stop the search.
    fn visit(&mut self, data: &T) -> bool;
}

impl<T, F> SearchVisitor<T> for F
where
    F: FnMut(&T) -> bool,
{
    #[inline]
    fn visit(&mut self, data: &T) -> bool {
        self(data)
    }
}

/// Result of [`RTree::search_detailed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOutcome {
    /// Number of matches reported, including the one that stopped the search
    pub found: usize,
    /// `true` if the whole tree was scanned, `false` if the callback stopped it
    pub completed: bool,
}

impl<T, C, const D: usize, const MAX: usize, const MIN: usize> RTree<T, C, D, MAX, MIN>
where
    C: Coordinate,
{
    /// Calls `callback` for every entry whose rectangle overlaps
    /// `min..=max` and returns the number of matches.
    ///
    /// The callback returns `false` to stop early. Matches come in no
    /// particular order. The tree cannot be mutated from inside the callback.
    pub fn search<F>(&self, min: [C; D], max: [C; D], mut callback: F) -> usize
    where
        F: FnMut(&T) -> bool,
    {
        self.search_detailed(&Rect::new(min, max), &mut callback).found
    }

    /// Same traversal as [`RTree::search`], driven by a [`SearchVisitor`].
    pub fn search_with<V>(&self, rect: &Rect<C, D>, visitor: &mut V) -> usize
    where
        V: SearchVisitor<T>,
    {
        self.search_detailed(rect, visitor).found
    }

    /// Search that also reports whether the traversal ran to completion.
    pub fn search_detailed<V>(&self, rect: &Rect<C, D>, visitor: &mut V) -> SearchOutcome
    where
        V: SearchVisitor<T>,
    {
        debug_assert!(rect.is_valid(), "invalid rectangle {:?}", rect);

        let mut found = 0;
        let completed = self.search_rec(self.root, rect, visitor, &mut found);
        SearchOutcome { found, completed }
    }

    /// Returns false once the visitor asks to stop.
    fn search_rec<V>(
        &self,
        node_id: NodeId,
        rect: &Rect<C, D>,
        visitor: &mut V,
        found: &mut usize,
    ) -> bool
    where
        V: SearchVisitor<T>,
    {
        for branch in &self.node(node_id).branches {
            if !rect.overlaps(&branch.rect) {
                continue;
            }
            match &branch.kind {
                BranchKind::Child(child) => {
                    if !self.search_rec(*child, rect, visitor, found) {
                        return false;
                    }
                }
                BranchKind::Leaf(data) => {
                    *found += 1;
                    if !visitor.visit(data) {
                        return false;
                    }
                }
            }
        }
        true
    }

    /// Collects every value whose rectangle overlaps `rect`.
    pub fn find_intersecting(&self, rect: &Rect<C, D>) -> Vec<T>
    where
        T: Clone,
    {
        let mut results = Vec::new();
        self.search_with(rect, &mut |data: &T| {
            results.push(data.clone());
            true
        });
        results
    }

    /// Collects every value whose rectangle lies entirely inside `rect`.
    pub fn find_contained(&self, rect: &Rect<C, D>) -> Vec<T>
    where
        T: Clone,
    {
        let mut results = Vec::new();
        self.find_contained_rec(self.root, rect, &mut results);
        results
    }

    fn find_contained_rec(&self, node_id: NodeId, rect: &Rect<C, D>, results: &mut Vec<T>)
    where
        T: Clone,
    {
        for branch in &self.node(node_id).branches {
            match &branch.kind {
                // A contained entry may sit in a child that only partially
                // overlaps the query
                BranchKind::Child(child) if rect.overlaps(&branch.rect) => {
                    self.find_contained_rec(*child, rect, results);
                }
                BranchKind::Leaf(data) if rect.contains(&branch.rect) => {
                    results.push(data.clone());
                }
                _ => {}
            }
        }
    }
}
