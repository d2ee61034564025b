use num_traits::Float;
use std::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign};

/////////////////////
// Data structures //
/////////////////////

///////////
// Point //
///////////

/// A point (or vector) in 2D
///
/// Used both for the input data and for the embedding, the per-point
/// momentum buffer and the adaptive gains.
///
/// ### Fields
///
/// * `x` - X coordinate
/// * `y` - Y coordinate
///
/// ### Notes
///
/// `PartialEq` is exact floating point equality without any tolerance. It
/// is only meant to detect literal duplicates (for example in the quadtree).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point<T> {
    pub x: T,
    pub y: T,
}

impl<T> Point<T>
where
    T: Float,
{
    /// Generate a new point
    ///
    /// ### Params
    ///
    /// * `x` - X coordinate
    /// * `y` - Y coordinate
    ///
    /// ### Returns
    ///
    /// Initialised self
    #[inline]
    pub fn new(x: T, y: T) -> Self {
        Self { x, y }
    }

    /// The origin
    #[inline]
    pub fn zero() -> Self {
        Self::new(T::zero(), T::zero())
    }

    /// Overwrite both coordinates
    #[inline]
    pub fn set(&mut self, x: T, y: T) {
        self.x = x;
        self.y = y;
    }

    /// Squared Euclidean distance to another point
    ///
    /// ### Params
    ///
    /// * `other` - The other point
    ///
    /// ### Returns
    ///
    /// The squared distance (never negative; zero iff the points coincide)
    #[inline]
    pub fn distance_to_point(&self, other: &Self) -> T {
        self.distance_to_position(other.x, other.y)
    }

    /// Squared Euclidean distance to the position `(x, y)`
    #[inline]
    pub fn distance_to_position(&self, x: T, y: T) -> T {
        let dx = x - self.x;
        let dy = y - self.y;
        dx * dx + dy * dy
    }

    /// Are both coordinates finite
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl<T: Float> From<(T, T)> for Point<T> {
    fn from((x, y): (T, T)) -> Self {
        Self::new(x, y)
    }
}

impl<T: Float> Add for Point<T> {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl<T: Float> Sub for Point<T> {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl<T: Float> Mul<T> for Point<T> {
    type Output = Self;

    #[inline]
    fn mul(self, s: T) -> Self {
        Self::new(self.x * s, self.y * s)
    }
}

impl<T: Float> Div<T> for Point<T> {
    type Output = Self;

    /// Division by zero is the caller's problem.
    #[inline]
    fn div(self, s: T) -> Self {
        Self::new(self.x / s, self.y / s)
    }
}

impl<T: Float> Neg for Point<T> {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }
}

impl<T: Float> AddAssign for Point<T> {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        self.x = self.x + rhs.x;
        self.y = self.y + rhs.y;
    }
}

impl<T: Float> SubAssign for Point<T> {
    #[inline]
    fn sub_assign(&mut self, rhs: Self) {
        self.x = self.x - rhs.x;
        self.y = self.y - rhs.y;
    }
}

impl<T: Float> MulAssign<T> for Point<T> {
    #[inline]
    fn mul_assign(&mut self, s: T) {
        self.x = self.x * s;
        self.y = self.y * s;
    }
}

impl<T: Float> DivAssign<T> for Point<T> {
    #[inline]
    fn div_assign(&mut self, s: T) {
        self.x = self.x / s;
        self.y = self.y / s;
    }
}

/////////////////////
// kNN/ affinities //
/////////////////////

/// One entry of a nearest neighbour row
///
/// ### Fields
///
/// * `index` - Index of the neighbouring point
/// * `distance` - Squared Euclidean distance to it
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NeighbourEntry<T> {
    pub index: usize,
    pub distance: T,
}

/// Conditional probability p_{j|i} for one neighbour j of a point i
///
/// ### Fields
///
/// * `j` - Index of the neighbour
/// * `value` - p_{j|i}
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConditionalProbability<T> {
    pub j: usize,
    pub value: T,
}

///////////
// Tests //
///////////
