//! Quadratic node split.
//!
//! When a full node receives one more branch, its `MAX + 1` branches are
//! divided into two groups: the two seeds that would waste the most volume
//! together start the groups, then the remaining branches are assigned one
//! at a time, most strongly attracted first. Each group ends with at least
//! `MIN` branches.

use log::trace;

use crate::config::VolumeMetric;
use crate::coordinate::{AreaNum, Coordinate};
use crate::rect::Rect;

use super::rtree_impl::RTree;
use super::rtree_types::{Branch, NodeId};

/// Scratch state for one split.
struct PartitionVars<'a, C: Coordinate, const D: usize> {
    rects: &'a [Rect<C, D>],
    areas: Vec<C::Area>,
    /// Group of each branch, `None` while unassigned
    partition: Vec<Option<usize>>,
    min_fill: usize,
    count: [usize; 2],
    cover: [Option<Rect<C, D>>; 2],
    area: [C::Area; 2],
    metric: VolumeMetric,
}

impl<'a, C: Coordinate, const D: usize> PartitionVars<'a, C, D> {
    fn new(rects: &'a [Rect<C, D>], min_fill: usize, metric: VolumeMetric) -> Self {
        PartitionVars {
            rects,
            areas: rects.iter().map(|rect| rect.volume_by(metric)).collect(),
            partition: vec![None; rects.len()],
            min_fill,
            count: [0; 2],
            cover: [None; 2],
            area: [C::Area::ZERO; 2],
            metric,
        }
    }

    /// Computes the group (0 or 1) of every rectangle.
    fn partition(rects: &'a [Rect<C, D>], min_fill: usize, metric: VolumeMetric) -> Vec<usize> {
        debug_assert!(rects.len() >= 2 * min_fill);

        let mut vars = Self::new(rects, min_fill, metric);
        vars.pick_seeds();
        vars.choose_partition();

        vars.partition
            .into_iter()
            .map(|group| group.unwrap_or_default())
            .collect()
    }

    fn total(&self) -> usize {
        self.rects.len()
    }

    /// Picks the pair whose bounding rectangle wastes the most volume.
    fn pick_seeds(&mut self) {
        let mut seeds = (0, 1);
        let mut worst: Option<C::Area> = None;

        for i in 0..self.total() - 1 {
            for j in i + 1..self.total() {
                let combined = self.rects[i].combine(&self.rects[j]);
                let waste = combined.volume_by(self.metric) - self.areas[i] - self.areas[j];
                if worst.map_or(true, |worst| waste > worst) {
                    worst = Some(waste);
                    seeds = (i, j);
                }
            }
        }

        self.classify(seeds.0, 0);
        self.classify(seeds.1, 1);
    }

    fn choose_partition(&mut self) {
        let total = self.total();

        while self.count[0] + self.count[1] < total
            && self.count[0] < total - self.min_fill
            && self.count[1] < total - self.min_fill
        {
            let mut biggest_diff = C::Area::ZERO - C::Area::ONE;
            let mut chosen = None;
            let mut better_group = 0;

            for index in 0..total {
                if self.partition[index].is_some() {
                    continue;
                }

                let growth0 = self.growth(0, index);
                let growth1 = self.growth(1, index);
                let (group, diff) = if growth1 - growth0 >= C::Area::ZERO {
                    (0, growth1 - growth0)
                } else {
                    (1, growth0 - growth1)
                };
                // Overflowed volumes give inf - inf
                let diff = if diff.is_nan() { C::Area::ZERO } else { diff };

                if chosen.is_none() || diff > biggest_diff {
                    biggest_diff = diff;
                    chosen = Some(index);
                    better_group = group;
                } else if diff == biggest_diff && self.count[group] < self.count[better_group] {
                    chosen = Some(index);
                    better_group = group;
                }
            }

            match chosen {
                Some(index) => self.classify(index, better_group),
                None => break,
            }
        }

        // One group is too full to take more; the rest go to the other one
        if self.count[0] + self.count[1] < total {
            let group = if self.count[0] >= total - self.min_fill { 1 } else { 0 };
            for index in 0..total {
                if self.partition[index].is_none() {
                    self.classify(index, group);
                }
            }
        }

        debug_assert_eq!(self.count[0] + self.count[1], total);
        debug_assert!(self.count[0] >= self.min_fill && self.count[1] >= self.min_fill);
    }

    /// Volume increase of `group` if it took the rectangle at `index`.
    fn growth(&self, group: usize, index: usize) -> C::Area {
        match &self.cover[group] {
            Some(cover) => cover.combine(&self.rects[index]).volume_by(self.metric) - self.area[group],
            None => self.areas[index],
        }
    }

    fn classify(&mut self, index: usize, group: usize) {
        debug_assert!(self.partition[index].is_none(), "branch {} assigned twice", index);
        self.partition[index] = Some(group);

        let cover = match &self.cover[group] {
            Some(cover) => cover.combine(&self.rects[index]),
            None => self.rects[index],
        };
        self.area[group] = cover.volume_by(self.metric);
        self.cover[group] = Some(cover);
        self.count[group] += 1;
    }
}

impl<T, C, const D: usize, const MAX: usize, const MIN: usize> RTree<T, C, D, MAX, MIN>
where
    C: Coordinate,
{
    /// Splits a full node that must also take `branch`.
    ///
    /// The node keeps one group, the other moves into a freshly allocated
    /// sibling at the same level, whose handle is returned.
    pub(super) fn split_node(&mut self, node_id: NodeId, branch: Branch<T, C, D>) -> NodeId {
        let level = self.node(node_id).level;

        let mut buffer = std::mem::take(&mut self.node_mut(node_id).branches);
        debug_assert_eq!(buffer.len(), MAX, "splitting a node that is not full");
        buffer.push(branch);

        let rects: Vec<Rect<C, D>> = buffer.iter().map(|branch| branch.rect).collect();
        let partition = PartitionVars::partition(&rects, MIN, self.config.metric());

        let sibling_id = self.allocate_node(level);
        self.node_mut(node_id).branches.reserve(MAX);
        for (branch, group) in buffer.into_iter().zip(partition) {
            let target = if group == 0 { node_id } else { sibling_id };
            self.node_mut(target).branches.push(branch);
        }

        trace!(
            "Split node at level {} into {} + {} branches",
            level,
            self.node(node_id).len(),
            self.node(sibling_id).len()
        );
        sibling_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn groups(rects: &[Rect<f64, 2>], min_fill: usize) -> Vec<usize> {
        PartitionVars::partition(rects, min_fill, VolumeMetric::Spherical)
    }

    #[test]
    fn test_split_separates_clusters() {
        let rects = vec![
            Rect::new([0.0, 0.0], [1.0, 1.0]),
            Rect::new([100.0, 100.0], [101.0, 101.0]),
            Rect::new([0.5, 0.5], [1.5, 1.5]),
            Rect::new([100.5, 100.5], [101.5, 101.5]),
            Rect::new([1.0, 0.0], [2.0, 1.0]),
        ];
        let partition = groups(&rects, 2);

        assert_eq!(partition[0], partition[2]);
        assert_eq!(partition[0], partition[4]);
        assert_eq!(partition[1], partition[3]);
        assert_ne!(partition[0], partition[1]);
    }

    #[test]
    fn test_split_respects_min_fill() {
        // One outlier would attract nothing, yet its group must reach min_fill
        let mut rects: Vec<Rect<f64, 2>> = (0..8)
            .map(|i| Rect::from_point([i as f64 * 0.01, 0.0]))
            .collect();
        rects.push(Rect::from_point([1000.0, 1000.0]));

        for min_fill in 1..=4 {
            let partition = groups(&rects, min_fill);
            let in_first = partition.iter().filter(|group| **group == 0).count();
            let in_second = partition.len() - in_first;
            assert!(in_first >= min_fill, "min_fill {}: {:?}", min_fill, partition);
            assert!(in_second >= min_fill, "min_fill {}: {:?}", min_fill, partition);
        }
    }

    #[test]
    fn test_pick_seeds_chooses_most_wasteful_pair() {
        let rects = vec![
            Rect::new([0.0, 0.0], [1.0, 1.0]),
            Rect::new([2.0, 2.0], [3.0, 3.0]),
            Rect::new([50.0, 50.0], [51.0, 51.0]),
        ];
        let mut vars = PartitionVars::new(&rects, 1, VolumeMetric::Rectangular);
        vars.pick_seeds();
        assert_eq!(vars.partition[0], Some(0));
        assert_eq!(vars.partition[2], Some(1));
        assert_eq!(vars.partition[1], None);
    }

    #[test]
    fn test_identical_rects_still_split_evenly_enough() {
        let rects = vec![Rect::new([1.0, 1.0], [2.0, 2.0]); 9];
        let partition = groups(&rects, 4);
        let in_first = partition.iter().filter(|group| **group == 0).count();
        assert!((4..=5).contains(&in_first));
    }

    #[test]
    fn test_overflowing_f32_volumes_still_partition() {
        // Combined extents overflow f32, so growths turn into inf and diffs into NaN
        let rects: Vec<Rect<f32, 2>> = (0..9)
            .map(|i| {
                let v = i as f32 * 1e19;
                Rect::new([v, v], [v + 1e19, v + 1e19])
            })
            .collect();

        for min_fill in 1..=4 {
            let partition = PartitionVars::partition(&rects, min_fill, VolumeMetric::Spherical);
            let in_first = partition.iter().filter(|group| **group == 0).count();
            let in_second = partition.len() - in_first;
            assert!(in_first >= min_fill && in_second >= min_fill, "{:?}", partition);
        }
    }

    #[test]
    fn test_tree_with_huge_f32_extents_stays_valid() {
        let mut tree: RTree<u32, f32, 2, 4, 2> = RTree::new();
        for i in 0..40u32 {
            let x = (i % 8) as f32 * 1e19;
            let y = (i / 8) as f32 * 1e19;
            tree.insert([x, y], [x + 1e19, y + 1e19], i);
        }

        assert_eq!(tree.count(), 40);
        let report = tree.check_integrity();
        assert!(report.is_valid, "{:?}", report.errors);
    }

    #[test]
    fn test_split_node_keeps_level_and_branches() {
        let mut tree: RTree<u32, f64, 2, 4, 2> = RTree::new();
        for i in 0..4 {
            tree.insert([i as f64, 0.0], [i as f64, 1.0], i);
        }
        let root = tree.root;
        let sibling = tree.split_node(root, Branch::leaf(Rect::new([9.0, 0.0], [9.0, 1.0]), 9));

        assert_eq!(tree.node(sibling).level, 0);
        assert_eq!(tree.node(root).len() + tree.node(sibling).len(), 5);
        assert!(tree.node(root).len() >= 2);
        assert!(tree.node(sibling).len() >= 2);
    }
}
