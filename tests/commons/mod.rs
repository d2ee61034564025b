#![allow(dead_code)]

use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::StandardNormal;
use tsne_rs::prelude::*;

/// Create isotropic Gaussian clusters in 2D
///
/// Returns the points and the cluster label of each point.
pub fn create_gaussian_clusters(
    centres: &[(f64, f64)],
    n_per_cluster: usize,
    sd: f64,
    seed: u64,
) -> (Vec<Point<f64>>, Vec<usize>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut points = Vec::with_capacity(centres.len() * n_per_cluster);
    let mut labels = Vec::with_capacity(centres.len() * n_per_cluster);

    for (cluster_id, &(cx, cy)) in centres.iter().enumerate() {
        for _ in 0..n_per_cluster {
            let x = cx + rng.sample::<f64, _>(StandardNormal) * sd;
            let y = cy + rng.sample::<f64, _>(StandardNormal) * sd;
            points.push(Point::new(x, y));
            labels.push(cluster_id);
        }
    }

    (points, labels)
}

/// Uniformly scattered points in [-range, range)²
pub fn create_uniform_points(n: usize, range: f64, seed: u64) -> Vec<Point<f64>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| Point::new(rng.random_range(-range..range), rng.random_range(-range..range)))
        .collect()
}

/// Average Euclidean distance of intra- and inter-cluster pairs
pub fn intra_inter_distances(embd: &[Point<f64>], labels: &[usize]) -> (f64, f64) {
    let mut intra = (0.0, 0usize);
    let mut inter = (0.0, 0usize);

    for i in 0..embd.len() {
        for j in (i + 1)..embd.len() {
            let d = embd[i].distance_to_point(&embd[j]).sqrt();
            if labels[i] == labels[j] {
                intra = (intra.0 + d, intra.1 + 1);
            } else {
                inter = (inter.0 + d, inter.1 + 1);
            }
        }
    }

    (intra.0 / intra.1 as f64, inter.0 / inter.1 as f64)
}
