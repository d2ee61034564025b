use num_traits::{Float, FromPrimitive};

use crate::data::structures::*;
use crate::utils::quadtree::*;

////////////////
// Structures //
////////////////

/// Repulsive forces of one pass over the solution
///
/// ### Fields
///
/// * `forces` - Per-point repulsive gradient term, already divided by `z`
/// * `z` - Global normaliser Σ_{i≠j} 1 / (1 + d_ij²)
#[derive(Clone, Debug)]
pub struct RepulsiveForces<T> {
    pub forces: Vec<Point<T>>,
    pub z: T,
}

/// How the repulsive forces are computed
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RepulsionMethod<T> {
    /// Exact all-pairs summation, O(N²)
    Quadratic,
    /// Quadtree summarisation with the given angle, ~O(N log N)
    BarnesHut { theta: T },
}

impl<T> RepulsionMethod<T>
where
    T: Float + FromPrimitive,
{
    /// Choose the method for a given point count
    ///
    /// ### Params
    ///
    /// * `n` - Number of points
    /// * `barnes_hut_cutoff` - Barnes-Hut is used for `n > barnes_hut_cutoff`
    /// * `theta` - Barnes-Hut angle
    ///
    /// ### Returns
    ///
    /// The method to use
    pub fn select(n: usize, barnes_hut_cutoff: usize, theta: T) -> Self {
        if n > barnes_hut_cutoff {
            RepulsionMethod::BarnesHut { theta }
        } else {
            RepulsionMethod::Quadratic
        }
    }

    /// Short name for progress output
    pub fn name(&self) -> &'static str {
        match self {
            RepulsionMethod::Quadratic => "quadratic",
            RepulsionMethod::BarnesHut { .. } => "Barnes-Hut",
        }
    }

    /// Compute the repulsive forces against the current solution
    pub fn repulsive_forces(&self, solution: &[Point<T>]) -> RepulsiveForces<T> {
        match *self {
            RepulsionMethod::Quadratic => quadratic_repulsion(solution),
            RepulsionMethod::BarnesHut { theta } => barnes_hut_repulsion(solution, theta),
        }
    }
}

/// Divide all forces by `z`
///
/// A zero normaliser only happens if all points coincide; the forces are
/// then zero as well and stay that way.
fn normalise<T: Float>(forces: &mut [Point<T>], z: T) {
    if z > T::zero() {
        forces.iter_mut().for_each(|f| *f /= z);
    }
}

/// Exact repulsive forces
///
/// For every ordered pair (i, j) with a non-zero distance d (squared),
/// accumulates `Z += 1 / (1 + d)` and `F_i -= (y_i - y_j) / (1 + d)²`, then
/// divides everything by `Z`.
///
/// ### Params
///
/// * `solution` - Current embedding
///
/// ### Returns
///
/// The normalised `RepulsiveForces`
pub fn quadratic_repulsion<T>(solution: &[Point<T>]) -> RepulsiveForces<T>
where
    T: Float + FromPrimitive,
{
    let mut z = T::zero();
    let mut forces = vec![Point::zero(); solution.len()];

    for (i, yi) in solution.iter().enumerate() {
        for yj in solution {
            let d = yi.distance_to_point(yj);
            if d > T::zero() {
                let q = T::one() / (T::one() + d);
                z = z + q;
                forces[i] -= (*yi - *yj) * (q * q);
            }
        }
    }

    normalise(&mut forces, z);
    RepulsiveForces { forces, z }
}

/// Barnes-Hut repulsive forces
///
/// Builds a fresh quadtree over the solution, traverses it once per point
/// and normalises by the summed `Z` of all traversals, the same convention
/// as `quadratic_repulsion()`.
///
/// ### Params
///
/// * `solution` - Current embedding
/// * `theta` - Barnes-Hut angle; `0` gives the exact result
///
/// ### Returns
///
/// The normalised `RepulsiveForces`
pub fn barnes_hut_repulsion<T>(solution: &[Point<T>], theta: T) -> RepulsiveForces<T>
where
    T: Float + FromPrimitive,
{
    let tree = Quadtree::from_points(solution);

    let mut z = T::zero();
    let mut forces: Vec<Point<T>> = solution
        .iter()
        .map(|p| {
            let (force, partial_z) = tree.compute_repulsive_force(p, theta);
            z = z + partial_z;
            force
        })
        .collect();

    normalise(&mut forces, z);
    RepulsiveForces { forces, z }
}

///////////
// Tests //
///////////
