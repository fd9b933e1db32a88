//! Best-first nearest neighbour search.
//!
//! A priority queue holds branches keyed by their distance from the query
//! point: the exact distance of a stored value for leaf branches, and the
//! `MinDist` lower bound of the rectangle for internal branches. Popping the
//! smallest key each round returns values in non-decreasing distance order,
//! and a subtree is only expanded once nothing closer is left.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::coordinate::Coordinate;
use crate::rect::Rect;

use super::rtree_impl::RTree;
use super::rtree_types::{BranchKind, NodeId};

#[derive(Debug, Clone, Copy)]
enum Target {
    /// Branch `index` of leaf `node`
    Value { node: NodeId, index: usize },
    Subtree(NodeId),
}

#[derive(Debug, Clone, Copy)]
struct QueueEntry<A> {
    key: A,
    target: Target,
}

impl<A: PartialOrd> PartialEq for QueueEntry<A> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<A: PartialOrd> Eq for QueueEntry<A> {}

impl<A: PartialOrd> PartialOrd for QueueEntry<A> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Reversed so that `BinaryHeap` pops the smallest key first.
impl<A: PartialOrd> Ord for QueueEntry<A> {
    fn cmp(&self, other: &Self) -> Ordering {
        other.key.partial_cmp(&self.key).unwrap_or(Ordering::Equal)
    }
}

impl<T, C, const D: usize, const MAX: usize, const MIN: usize> RTree<T, C, D, MAX, MIN>
where
    C: Coordinate,
{
    /// Visits stored values in order of increasing distance from `point`.
    ///
    /// * `terminate(results, key)` is asked before each queue entry is
    ///   consumed, with the results so far and the entry's key; returning
    ///   `true` ends the search. Stop after `k` results for k-nearest, or
    ///   once `key` exceeds a radius for a range query.
    /// * `filter(data)` decides whether a reached value is added to the
    ///   results.
    /// * `distance(point, data)` is the exact distance to a stored value. It
    ///   must be on the same scale as the Euclidean [`Rect::min_dist`] and
    ///   never smaller than the `min_dist` of the value's rectangle, or
    ///   pruning stops being exact.
    ///
    /// Results come back in the order they were consumed, with no
    /// deduplication.
    pub fn nearest_neighbors<Term, Filt, Dist>(
        &self,
        point: [C; D],
        mut terminate: Term,
        mut filter: Filt,
        mut distance: Dist,
    ) -> Vec<(C::Area, T)>
    where
        T: Clone,
        Term: FnMut(&[(C::Area, T)], C::Area) -> bool,
        Filt: FnMut(&T) -> bool,
        Dist: FnMut(&[C; D], &T) -> C::Area,
    {
        self.best_first(
            &point,
            &mut terminate,
            &mut filter,
            &mut |p: &[C; D], _: &Rect<C, D>, data: &T| distance(p, data),
        )
    }

    /// The `k` entries nearest to `point`, measured to their rectangles.
    pub fn nearest_k(&self, point: [C; D], k: usize) -> Vec<(C::Area, T)>
    where
        T: Clone,
    {
        if k == 0 {
            return Vec::new();
        }
        self.best_first(
            &point,
            &mut |results: &[(C::Area, T)], _: C::Area| results.len() >= k,
            &mut |_: &T| true,
            &mut |p: &[C; D], rect: &Rect<C, D>, _: &T| rect.min_dist(p),
        )
    }

    /// Every entry whose rectangle lies within `radius` of `point`, nearest
    /// first.
    pub fn within_distance(&self, point: [C; D], radius: C::Area) -> Vec<(C::Area, T)>
    where
        T: Clone,
    {
        self.best_first(
            &point,
            &mut |_: &[(C::Area, T)], key: C::Area| key > radius,
            &mut |_: &T| true,
            &mut |p: &[C; D], rect: &Rect<C, D>, _: &T| rect.min_dist(p),
        )
    }

    fn best_first(
        &self,
        point: &[C; D],
        terminate: &mut dyn FnMut(&[(C::Area, T)], C::Area) -> bool,
        filter: &mut dyn FnMut(&T) -> bool,
        leaf_distance: &mut dyn FnMut(&[C; D], &Rect<C, D>, &T) -> C::Area,
    ) -> Vec<(C::Area, T)>
    where
        T: Clone,
    {
        let mut queue = BinaryHeap::new();
        let mut results = Vec::new();

        self.enqueue_branches(self.root, point, leaf_distance, &mut queue);

        while let Some(entry) = queue.pop() {
            if terminate(&results, entry.key) {
                break;
            }

            match entry.target {
                Target::Value { node, index } => {
                    if let BranchKind::Leaf(data) = &self.node(node).branches[index].kind {
                        if filter(data) {
                            results.push((entry.key, data.clone()));
                        }
                    }
                }
                Target::Subtree(child) => {
                    self.enqueue_branches(child, point, leaf_distance, &mut queue);
                }
            }
        }
        results
    }

    fn enqueue_branches(
        &self,
        node_id: NodeId,
        point: &[C; D],
        leaf_distance: &mut dyn FnMut(&[C; D], &Rect<C, D>, &T) -> C::Area,
        queue: &mut BinaryHeap<QueueEntry<C::Area>>,
    ) {
        for (index, branch) in self.node(node_id).branches.iter().enumerate() {
            let entry = match &branch.kind {
                BranchKind::Leaf(data) => QueueEntry {
                    key: leaf_distance(point, &branch.rect, data),
                    target: Target::Value {
                        node: node_id,
                        index,
                    },
                },
                BranchKind::Child(child) => QueueEntry {
                    key: branch.rect.min_dist(point),
                    target: Target::Subtree(*child),
                },
            };
            queue.push(entry);
        }
    }
}
