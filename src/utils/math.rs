use num_traits::{Float, FromPrimitive};

use crate::data::structures::*;

/// Safety margin applied to the largest absolute coordinate
const EXTENT_MARGIN: f64 = 1.1;

/// Sign of a value as -1, 0 or 1
///
/// Unlike `Float::signum`, zero maps to zero.
#[inline]
pub fn sign<T: Float>(x: T) -> i8 {
    if x > T::zero() {
        1
    } else if x < T::zero() {
        -1
    } else {
        0
    }
}

/// Half-dimension of a square centred at the origin enclosing all points
///
/// ### Params
///
/// * `points` - The points to enclose
///
/// ### Returns
///
/// 1.1 times the largest absolute coordinate. Falls back to `1` if all
/// points sit at the origin (or there are none).
pub fn enclosing_extent<T>(points: &[Point<T>]) -> T
where
    T: Float + FromPrimitive,
{
    let d = points
        .iter()
        .fold(T::zero(), |acc, p| acc.max(p.x.abs()).max(p.y.abs()));

    if d > T::zero() {
        d * T::from_f64(EXTENT_MARGIN).unwrap()
    } else {
        T::one()
    }
}

/// Mean of a non-empty point set
pub fn mean_point<T>(points: &[Point<T>]) -> Point<T>
where
    T: Float + FromPrimitive,
{
    let sum = points.iter().fold(Point::zero(), |acc, p| acc + *p);
    sum / T::from_usize(points.len()).unwrap()
}

/// Subtract the mean from every point
pub fn centre_points<T>(points: &mut [Point<T>])
where
    T: Float + FromPrimitive,
{
    if points.is_empty() {
        return;
    }
    let mean = mean_point(points);
    points.iter_mut().for_each(|p| *p -= mean);
}

///////////
// Tests //
///////////
