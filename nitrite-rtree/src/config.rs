//! Runtime configuration for an [`RTree`](crate::RTree).
//!
//! Structural parameters (dimension count, node capacity, minimum fill) are
//! const generics of the tree itself. What remains configurable at runtime
//! is the volume heuristic used to rank insertion and split candidates.

/// Heuristic used to estimate "how much area" a rectangle costs.
///
/// Both metrics only rank candidates during `PickBranch` and node splits;
/// they never affect which entries a query returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VolumeMetric {
    /// Volume of the bounding hypersphere. Better splits, a bit more CPU.
    #[default]
    Spherical,
    /// Plain product of the extents.
    Rectangular,
}

/// Configuration for an R-Tree instance.
///
/// # Example
///
/// ```rust
/// use nitrite_rtree::{RTree, RTreeConfig, VolumeMetric};
///
/// let config = RTreeConfig::new().volume_metric(VolumeMetric::Rectangular);
/// let tree: RTree<u64> = RTree::with_config(config);
/// assert!(tree.is_empty());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RTreeConfig {
    volume_metric: VolumeMetric,
}

impl RTreeConfig {
    /// Creates a configuration with default values (spherical volume).
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the volume heuristic.
    pub fn volume_metric(mut self, metric: VolumeMetric) -> Self {
        self.volume_metric = metric;
        self
    }

    /// Returns the configured volume heuristic.
    pub fn metric(&self) -> VolumeMetric {
        self.volume_metric
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_spherical() {
        assert_eq!(RTreeConfig::new().metric(), VolumeMetric::Spherical);
    }

    #[test]
    fn test_builder_overrides_metric() {
        let config = RTreeConfig::new().volume_metric(VolumeMetric::Rectangular);
        assert_eq!(config.metric(), VolumeMetric::Rectangular);
    }
}
