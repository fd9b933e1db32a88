use crate::config::VolumeMetric;
use crate::coordinate::{AreaNum, Coordinate};

/// Volumes of the unit hypersphere for dimensions 0 through 20.
const UNIT_SPHERE_VOLUMES: [f64; 21] = [
    0.000000, 2.000000, 3.141593, // dimension 0, 1, 2
    4.188790, 4.934802, 5.263789, // dimension 3, 4, 5
    5.167713, 4.724766, 4.058712, // dimension 6, 7, 8
    3.298509, 2.550164, 1.884104, // dimension 9, 10, 11
    1.335263, 0.910629, 0.599265, // dimension 12, 13, 14
    0.381443, 0.235331, 0.140981, // dimension 15, 16, 17
    0.082146, 0.046622, 0.025807, // dimension 18, 19, 20
];

/// Volume of the unit hypersphere in `dims` dimensions.
///
/// Dimensions past the table use the recurrence `V(n) = 2π / n * V(n - 2)`.
pub fn unit_sphere_volume(dims: usize) -> f64 {
    if dims < UNIT_SPHERE_VOLUMES.len() {
        return UNIT_SPHERE_VOLUMES[dims];
    }
    let mut n = if dims % 2 == 0 { 20 } else { 19 };
    let mut volume = UNIT_SPHERE_VOLUMES[n];
    while n < dims {
        n += 2;
        volume *= 2.0 * std::f64::consts::PI / n as f64;
    }
    volume
}

/// An axis-aligned bounding rectangle in `D` dimensions.
///
/// `Rect` is the key type of the R-Tree: every branch stores one, and the
/// rectangle of an internal branch is the minimum bounding rectangle (MBR)
/// of everything below it.
///
/// # Examples
///
/// ```rust
/// use nitrite_rtree::Rect;
///
/// let a = Rect::new([0.0, 0.0], [1.0, 1.0]);
/// let b = Rect::new([1.0, 1.0], [2.0, 3.0]);
///
/// // Touching boundaries overlap
/// assert!(a.overlaps(&b));
/// assert_eq!(a.combine(&b), Rect::new([0.0, 0.0], [2.0, 3.0]));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect<C, const D: usize> {
    /// Lower corner, one value per axis
    pub min: [C; D],
    /// Upper corner, one value per axis
    pub max: [C; D],
}

impl<C: Coordinate, const D: usize> Rect<C, D> {
    /// Creates a rectangle from its two corners.
    ///
    /// `min[i] <= max[i]` must hold on every axis; this is only checked in
    /// debug builds.
    pub fn new(min: [C; D], max: [C; D]) -> Self {
        let rect = Rect { min, max };
        debug_assert!(rect.is_valid(), "invalid rectangle {:?}", rect);
        rect
    }

    /// Creates a degenerate rectangle covering a single point.
    pub fn from_point(point: [C; D]) -> Self {
        Rect {
            min: point,
            max: point,
        }
    }

    /// The whole coordinate space.
    pub fn full_space() -> Self {
        Rect {
            min: [C::MIN_VALUE; D],
            max: [C::MAX_VALUE; D],
        }
    }

    pub fn is_valid(&self) -> bool {
        (0..D).all(|i| self.min[i] <= self.max[i])
    }

    /// Returns true if the rectangles intersect on every axis.
    /// Shared boundaries count as an intersection.
    #[inline]
    pub fn overlaps(&self, other: &Rect<C, D>) -> bool {
        for i in 0..D {
            if self.min[i] > other.max[i] || other.min[i] > self.max[i] {
                return false;
            }
        }
        true
    }

    /// Returns true if `other` lies entirely inside this rectangle.
    #[inline]
    pub fn contains(&self, other: &Rect<C, D>) -> bool {
        (0..D).all(|i| self.min[i] <= other.min[i] && other.max[i] <= self.max[i])
    }

    pub fn contains_point(&self, point: &[C; D]) -> bool {
        (0..D).all(|i| self.min[i] <= point[i] && point[i] <= self.max[i])
    }

    /// Minimum bounding rectangle of `self` and `other`.
    #[inline]
    pub fn combine(&self, other: &Rect<C, D>) -> Rect<C, D> {
        let mut combined = *self;
        combined.expand(other);
        combined
    }

    /// Grows this rectangle in place so that it also covers `other`.
    #[inline]
    pub fn expand(&mut self, other: &Rect<C, D>) {
        for i in 0..D {
            if other.min[i] < self.min[i] {
                self.min[i] = other.min[i];
            }
            if other.max[i] > self.max[i] {
                self.max[i] = other.max[i];
            }
        }
    }

    /// Product of the extents along every axis.
    pub fn volume(&self) -> C::Area {
        let mut volume = C::Area::ONE;
        for i in 0..D {
            volume = volume * (self.max[i].to_area() - self.min[i].to_area());
        }
        debug_assert!(volume >= C::Area::ZERO || volume.is_nan());
        volume
    }

    /// Volume of the hypersphere enclosing this rectangle.
    ///
    /// More expensive than [`Rect::volume`] but yields better splits,
    /// which is why it is the default [`VolumeMetric`].
    pub fn spherical_volume(&self) -> C::Area {
        let half = C::Area::from_f64(0.5);
        let mut sum_of_squares = C::Area::ZERO;
        for i in 0..D {
            let half_extent = (self.max[i].to_area() - self.min[i].to_area()) * half;
            sum_of_squares = sum_of_squares + half_extent * half_extent;
        }

        let radius = sum_of_squares.sqrt();
        let unit = C::Area::from_f64(unit_sphere_volume(D));
        match D {
            2 => radius * radius * unit,
            3 => radius * radius * radius * unit,
            _ => radius.powi(D as i32) * unit,
        }
    }

    /// Volume of this rectangle under the given heuristic.
    #[inline]
    pub fn volume_by(&self, metric: VolumeMetric) -> C::Area {
        match metric {
            VolumeMetric::Spherical => self.spherical_volume(),
            VolumeMetric::Rectangular => self.volume(),
        }
    }

    /// Euclidean distance from `point` to the nearest point of this
    /// rectangle; zero if the point lies inside.
    ///
    /// Never overestimates the distance to anything stored inside the
    /// rectangle, which makes it usable as a pruning bound.
    pub fn min_dist(&self, point: &[C; D]) -> C::Area {
        let mut sum_of_squares = C::Area::ZERO;
        for i in 0..D {
            let p = point[i].to_area();
            let delta = if point[i] < self.min[i] {
                self.min[i].to_area() - p
            } else if point[i] > self.max[i] {
                p - self.max[i].to_area()
            } else {
                C::Area::ZERO
            };
            sum_of_squares = sum_of_squares + delta * delta;
        }
        sum_of_squares.sqrt()
    }
}

impl<C: Coordinate + std::fmt::Display, const D: usize> std::fmt::Display for Rect<C, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Rect(")?;
        for (i, (lo, hi)) in self.min.iter().zip(self.max.iter()).enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}..{}", lo, hi)?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn test_overlap_on_every_axis() {
        let a = Rect::new([0.0, 0.0], [2.0, 2.0]);
        assert!(a.overlaps(&Rect::new([1.0, 1.0], [3.0, 3.0])));
        assert!(a.overlaps(&Rect::new([2.0, 2.0], [3.0, 3.0])));
        // Overlaps on x only
        assert!(!a.overlaps(&Rect::new([1.0, 5.0], [3.0, 6.0])));
        assert!(!a.overlaps(&Rect::new([2.5, 0.0], [3.0, 1.0])));
    }

    #[test]
    fn test_contains() {
        let outer = Rect::new([0, 0, 0], [10, 10, 10]);
        assert!(outer.contains(&Rect::new([0, 1, 2], [10, 9, 8])));
        assert!(!outer.contains(&Rect::new([-1, 1, 2], [5, 5, 5])));
        assert!(outer.contains_point(&[10, 0, 5]));
        assert!(!outer.contains_point(&[11, 0, 5]));
    }

    #[test]
    fn test_combine_and_expand() {
        let a = Rect::new([0.0, 5.0], [1.0, 6.0]);
        let b = Rect::new([-2.0, 1.0], [0.5, 3.0]);
        let c = a.combine(&b);
        assert_eq!(c, Rect::new([-2.0, 1.0], [1.0, 6.0]));

        let mut d = b;
        d.expand(&a);
        assert_eq!(c, d);
    }

    #[test]
    fn test_rectangular_volume() {
        assert_eq!(Rect::new([0.0, 0.0], [2.0, 3.0]).volume(), 6.0);
        assert_eq!(Rect::new([0, 0, 0], [2, 3, 4]).volume(), 24.0);
        assert_eq!(Rect::from_point([1.0, 1.0]).volume(), 0.0);
    }

    #[test]
    fn test_spherical_volume() {
        // 2x2 square: circumscribed circle has radius sqrt(2), area 2π
        let square = Rect::new([0.0, 0.0], [2.0, 2.0]);
        assert!(approx(square.spherical_volume(), 2.0 * std::f64::consts::PI));

        // 2x2x2 cube: radius sqrt(3)
        let cube = Rect::new([0.0, 0.0, 0.0], [2.0, 2.0, 2.0]);
        let r = 3.0f64.sqrt();
        assert!(approx(cube.spherical_volume(), r * r * r * 4.188790));

        // Generic branch, 4 dimensions
        let tesseract = Rect::new([0.0; 4], [2.0; 4]);
        assert!(approx(tesseract.spherical_volume(), 2.0f64.powi(4) * 4.934802));
    }

    #[test]
    fn test_unit_sphere_volume_past_table() {
        assert!(approx(unit_sphere_volume(2), 3.141593));
        let v22 = unit_sphere_volume(20) * 2.0 * std::f64::consts::PI / 22.0;
        assert!(approx(unit_sphere_volume(22), v22));
        assert!(unit_sphere_volume(21) > 0.0);
    }

    #[test]
    fn test_min_dist() {
        let rect = Rect::new([1.0, 1.0], [3.0, 2.0]);
        assert_eq!(rect.min_dist(&[2.0, 1.5]), 0.0);
        assert_eq!(rect.min_dist(&[0.0, 1.5]), 1.0);
        assert!(approx(rect.min_dist(&[0.0, 0.0]), 2.0f64.sqrt()));
        assert_eq!(rect.min_dist(&[6.0, 6.0]), 5.0);
    }

    #[test]
    fn test_integral_min_dist() {
        let rect = Rect::new([0i32, 0], [1, 1]);
        assert_eq!(rect.min_dist(&[4, 5]), 5.0);
    }

    #[test]
    fn test_volume_by_metric() {
        let rect = Rect::new([0.0f32, 0.0], [1.0, 1.0]);
        assert_eq!(rect.volume_by(VolumeMetric::Rectangular), 1.0);
        assert!(rect.volume_by(VolumeMetric::Spherical) > 1.0);
    }

    #[test]
    fn test_display() {
        let rect = Rect::new([0, 1], [2, 3]);
        assert_eq!(rect.to_string(), "Rect(0..2, 1..3)");
    }

    #[test]
    fn test_full_space_overlaps_everything() {
        let space = Rect::<i32, 2>::full_space();
        assert!(space.overlaps(&Rect::new([i32::MIN, 0], [0, i32::MAX])));
        assert!(space.contains(&Rect::new([-5, -5], [5, 5])));
    }
}
