use num_traits::Float;
use std::cmp::Ordering;

use crate::data::structures::*;

/// Exhaustive nearest neighbours over a 2D point set
///
/// Every point is compared against every other point and the `u` closest
/// ones (by squared Euclidean distance) are kept. O(N² log N), which is fine
/// as this only runs once per optimisation run.
///
/// ### Fields
///
/// * `neighbours` - For each point, up to `u` entries sorted ascending by
///   distance. The point itself never shows up in its own row.
///
/// ### Notes
///
/// Placeholder for a vantage-point tree.
#[derive(Clone, Debug)]
pub struct NearestNeighbours<T> {
    neighbours: Vec<Vec<NeighbourEntry<T>>>,
}

impl<T> NearestNeighbours<T>
where
    T: Float,
{
    /// Compute the nearest neighbours
    ///
    /// ### Params
    ///
    /// * `points` - The input points
    /// * `u` - Number of neighbours to keep per point. If `u >= N`, all
    ///   other points are returned.
    ///
    /// ### Returns
    ///
    /// Initialised self
    pub fn new(points: &[Point<T>], u: usize) -> Self {
        let neighbours = points
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let mut row: Vec<NeighbourEntry<T>> = points
                    .iter()
                    .enumerate()
                    .filter(|(j, _)| *j != i)
                    .map(|(j, other)| NeighbourEntry {
                        index: j,
                        distance: p.distance_to_point(other),
                    })
                    .collect();

                // stable sort keeps ties in index order
                row.sort_by(|a, b| {
                    a.distance
                        .partial_cmp(&b.distance)
                        .unwrap_or(Ordering::Equal)
                });
                row.truncate(u);
                row
            })
            .collect();

        Self { neighbours }
    }

    /// The neighbour rows
    pub fn neighbours(&self) -> &[Vec<NeighbourEntry<T>>] {
        &self.neighbours
    }

    /// Consume self and return the neighbour rows
    pub fn into_neighbours(self) -> Vec<Vec<NeighbourEntry<T>>> {
        self.neighbours
    }

    /// Split the rows into separate index and distance matrices
    ///
    /// ### Returns
    ///
    /// Tuple of `(knn_indices, knn_dist)`
    pub fn to_indices_and_distances(&self) -> (Vec<Vec<usize>>, Vec<Vec<T>>) {
        self.neighbours
            .iter()
            .map(|row| {
                row.iter()
                    .map(|e| (e.index, e.distance))
                    .unzip::<usize, T, Vec<usize>, Vec<T>>()
            })
            .unzip()
    }
}

///////////
// Tests //
///////////
