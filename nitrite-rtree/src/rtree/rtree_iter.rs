//! Lazy depth-first iterator over the entries overlapping a query rectangle.

use std::iter::FusedIterator;

use smallvec::SmallVec;

use crate::coordinate::Coordinate;
use crate::rect::Rect;

use super::rtree_constants::ITERATOR_STACK_DEPTH;
use super::rtree_impl::RTree;
use super::rtree_types::{BranchKind, NodeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct StackFrame {
    node: NodeId,
    /// Next branch of `node` to look at. On the top frame of a live
    /// iterator this is the leaf entry `next` returns.
    branch: usize,
}

/// Forward-only iterator returned by [`RTree::iter`] and [`RTree::iter_in`].
///
/// Yields `(&Rect, &T)` for each leaf entry overlapping the query rectangle,
/// one step of the traversal at a time. The iterator always rests on its
/// next match, so it turns null as soon as no match is left. It borrows the
/// tree, so the tree cannot change while the iterator is alive.
pub struct Iter<'a, T, C, const D: usize, const MAX: usize, const MIN: usize> {
    tree: &'a RTree<T, C, D, MAX, MIN>,
    query: Option<Rect<C, D>>,
    stack: SmallVec<[StackFrame; ITERATOR_STACK_DEPTH]>,
}

impl<'a, T, C, const D: usize, const MAX: usize, const MIN: usize> Iter<'a, T, C, D, MAX, MIN>
where
    C: Coordinate,
{
    fn new(tree: &'a RTree<T, C, D, MAX, MIN>, query: Option<Rect<C, D>>) -> Self {
        let mut stack = SmallVec::new();
        stack.push(StackFrame {
            node: tree.root,
            branch: 0,
        });
        let mut iter = Iter { tree, query, stack };
        iter.settle();
        iter
    }

    /// True when no match is left to return.
    pub fn is_null(&self) -> bool {
        self.stack.is_empty()
    }

    /// Moves forward until the top frame points at a matching leaf entry,
    /// or the stack is empty.
    fn settle(&mut self) {
        let tree = self.tree;

        while let Some(frame) = self.stack.last_mut() {
            let node = tree.node(frame.node);
            if frame.branch >= node.len() {
                self.stack.pop();
                continue;
            }

            let branch = &node.branches[frame.branch];
            if let Some(query) = &self.query {
                if !query.overlaps(&branch.rect) {
                    frame.branch += 1;
                    continue;
                }
            }

            match &branch.kind {
                BranchKind::Child(child) => {
                    frame.branch += 1;
                    self.stack.push(StackFrame {
                        node: *child,
                        branch: 0,
                    });
                }
                BranchKind::Leaf(_) => return,
            }
        }
    }
}

impl<'a, T, C, const D: usize, const MAX: usize, const MIN: usize> Iterator
    for Iter<'a, T, C, D, MAX, MIN>
where
    C: Coordinate,
{
    type Item = (&'a Rect<C, D>, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        let tree = self.tree;
        let frame = self.stack.last_mut()?;

        let branch = &tree.node(frame.node).branches[frame.branch];
        frame.branch += 1;
        self.settle();

        match &branch.kind {
            BranchKind::Leaf(data) => Some((&branch.rect, data)),
            BranchKind::Child(_) => unreachable!("iterator resting on an internal branch"),
        }
    }
}

impl<'a, T, C, const D: usize, const MAX: usize, const MIN: usize> FusedIterator
    for Iter<'a, T, C, D, MAX, MIN>
where
    C: Coordinate,
{
}

/// Null iterators are all equal; live iterators are equal when they walk the
/// same tree and are paused at the same position.
impl<'a, T, C, const D: usize, const MAX: usize, const MIN: usize> PartialEq
    for Iter<'a, T, C, D, MAX, MIN>
where
    C: Coordinate,
{
    fn eq(&self, other: &Self) -> bool {
        if self.is_null() || other.is_null() {
            return self.is_null() && other.is_null();
        }
        std::ptr::eq(self.tree, other.tree) && self.query == other.query && self.stack == other.stack
    }
}

impl<T, C, const D: usize, const MAX: usize, const MIN: usize> RTree<T, C, D, MAX, MIN>
where
    C: Coordinate,
{
    /// Iterates over every entry.
    pub fn iter(&self) -> Iter<'_, T, C, D, MAX, MIN> {
        Iter::new(self, None)
    }

    /// Iterates over the entries overlapping `rect`.
    pub fn iter_in(&self, rect: Rect<C, D>) -> Iter<'_, T, C, D, MAX, MIN> {
        debug_assert!(rect.is_valid(), "invalid rectangle {:?}", rect);
        Iter::new(self, Some(rect))
    }
}

impl<'a, T, C, const D: usize, const MAX: usize, const MIN: usize> IntoIterator
    for &'a RTree<T, C, D, MAX, MIN>
where
    C: Coordinate,
{
    type Item = (&'a Rect<C, D>, &'a T);
    type IntoIter = Iter<'a, T, C, D, MAX, MIN>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
