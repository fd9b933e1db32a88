//! Numeric traits for coordinates and the area/distance values derived from them.
//!
//! Coordinates may be integral or floating point. Every volume, enlargement
//! and distance computation is carried out in the coordinate's associated
//! [`AreaNum`] type, which is always a float so that products of large
//! integral extents cannot overflow.

use std::fmt::Debug;
use std::ops::{Add, Mul, Sub};

/// Floating point type used for volumes, area increases and distances.
pub trait AreaNum:
    Copy
    + Debug
    + PartialOrd
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + 'static
{
    const ZERO: Self;
    const ONE: Self;

    fn sqrt(self) -> Self;

    fn powi(self, exp: i32) -> Self;

    fn is_nan(self) -> bool;

    fn from_f64(value: f64) -> Self;

    fn to_f64(self) -> f64;
}

macro_rules! impl_area_num {
    ($($t:ty),*) => {
        $(
            impl AreaNum for $t {
                const ZERO: Self = 0.0;
                const ONE: Self = 1.0;

                #[inline]
                fn sqrt(self) -> Self {
                    <$t>::sqrt(self)
                }

                #[inline]
                fn powi(self, exp: i32) -> Self {
                    <$t>::powi(self, exp)
                }

                #[inline]
                fn is_nan(self) -> bool {
                    <$t>::is_nan(self)
                }

                #[inline]
                fn from_f64(value: f64) -> Self {
                    value as $t
                }

                #[inline]
                fn to_f64(self) -> f64 {
                    self as f64
                }
            }
        )*
    };
}

impl_area_num!(f32, f64);

/// A coordinate value stored in a [`Rect`](crate::Rect).
///
/// # Example
///
/// ```rust
/// use nitrite_rtree::Coordinate;
///
/// assert_eq!(3i32.to_area(), 3.0f64);
/// assert_eq!(1.5f32.to_area(), 1.5f32);
/// ```
pub trait Coordinate: Copy + Debug + PartialOrd + 'static {
    /// Type used for volumes and distances computed from this coordinate.
    type Area: AreaNum;

    /// Smallest representable coordinate, used as the lower bound of the
    /// full coordinate space.
    const MIN_VALUE: Self;

    /// Largest representable coordinate.
    const MAX_VALUE: Self;

    fn to_area(self) -> Self::Area;
}

macro_rules! impl_coordinate {
    ($($t:ty => $area:ty),*) => {
        $(
            impl Coordinate for $t {
                type Area = $area;

                const MIN_VALUE: Self = <$t>::MIN;
                const MAX_VALUE: Self = <$t>::MAX;

                #[inline]
                fn to_area(self) -> $area {
                    self as $area
                }
            }
        )*
    };
}

impl_coordinate!(f32 => f32, f64 => f64, i32 => f64, i64 => f64);
