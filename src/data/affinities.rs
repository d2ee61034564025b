use num_traits::{Float, FromPrimitive};

use crate::data::structures::*;

/////////////
// Globals //
/////////////

/// Default tolerance on |H - H_target| for the binary search
pub const CALIBRATION_TOL: f64 = 1e-4;
/// Hard cap on binary search iterations
pub const CALIBRATION_MAX_ITER: usize = 50;
/// Probabilities at or below this do not contribute to the entropy
const ENTROPY_CUTOFF: f64 = 1e-7;

////////////////
// Structures //
////////////////

/// Result of the perplexity calibration for a single point
///
/// ### Fields
///
/// * `probabilities` - p_{j|i} per neighbour, in the order of the input row
/// * `beta` - Final precision (1 / (2 * sigma²))
/// * `entropy` - Achieved Shannon entropy (natural log)
/// * `n_iter` - Number of evaluated betas
/// * `converged` - `false` if the iteration cap was hit before reaching the
///   tolerance. The probabilities are still usable (best effort).
#[derive(Clone, Debug)]
pub struct PointCalibration<T> {
    pub probabilities: Vec<ConditionalProbability<T>>,
    pub beta: T,
    pub entropy: T,
    pub n_iter: usize,
    pub converged: bool,
}

/////////////////
// Calibration //
/////////////////

/// Evaluate the normalised Gaussian kernel for a given beta
///
/// ### Params
///
/// * `dists` - The neighbour row (squared distances)
/// * `beta` - The precision to evaluate
/// * `probs` - Output buffer, same length as `dists`
///
/// ### Returns
///
/// The Shannon entropy (natural log) of the resulting distribution
fn gaussian_entropy<T>(dists: &[NeighbourEntry<T>], beta: T, probs: &mut [T]) -> T
where
    T: Float + FromPrimitive,
{
    let cutoff = T::from_f64(ENTROPY_CUTOFF).unwrap();

    let mut sum_p = T::zero();
    for (p, d) in probs.iter_mut().zip(dists) {
        *p = (-d.distance * beta).exp();
        sum_p = sum_p + *p;
    }

    let mut entropy = T::zero();
    for p in probs.iter_mut() {
        *p = if sum_p == T::zero() {
            T::zero()
        } else {
            *p / sum_p
        };
        if *p > cutoff {
            entropy = entropy - *p * p.ln();
        }
    }

    entropy
}

/// Calibrate p_{j|i} for one point via binary search over beta
///
/// Searches the precision beta of a Gaussian kernel `exp(-d * beta)` so that
/// the entropy of the normalised neighbour distribution matches
/// `target_entropy`. Too high an entropy means the distribution is too flat
/// and beta increases; too low means it decreases. While no bound on the
/// respective side is known, beta is doubled/halved, afterwards bisected.
///
/// ### Params
///
/// * `dists` - The sorted neighbour row of the point (squared distances)
/// * `target_entropy` - Target entropy, i.e., `ln(perplexity)`
/// * `tol` - Convergence tolerance on |H - H_target| (typically 1e-4)
/// * `max_iter` - Maximum number of evaluations (typically 50)
///
/// ### Returns
///
/// The `PointCalibration` of this point
pub fn p_j_given_i<T>(
    dists: &[NeighbourEntry<T>],
    target_entropy: T,
    tol: T,
    max_iter: usize,
) -> PointCalibration<T>
where
    T: Float + FromPrimitive,
{
    let two = T::one() + T::one();

    let mut beta = T::one();
    let mut min_beta = T::neg_infinity();
    let mut max_beta = T::infinity();
    let mut probs = vec![T::zero(); dists.len()];
    let mut entropy;
    let mut n_iter = 0;
    let mut converged;

    loop {
        entropy = gaussian_entropy(dists, beta, &mut probs);
        n_iter += 1;

        let entropy_diff = entropy - target_entropy;
        converged = entropy_diff.abs() < tol;
        if converged || n_iter >= max_iter {
            break;
        }

        if entropy_diff > T::zero() {
            min_beta = beta;
            if max_beta.is_infinite() {
                beta = beta * two;
            } else {
                beta = (beta + max_beta) / two;
            }
        } else {
            max_beta = beta;
            if min_beta.is_infinite() {
                beta = beta / two;
            } else {
                beta = (beta + min_beta) / two;
            }
        }
    }

    let probabilities = dists
        .iter()
        .zip(probs)
        .map(|(d, value)| ConditionalProbability {
            j: d.index,
            value,
        })
        .collect();

    PointCalibration {
        probabilities,
        beta,
        entropy,
        n_iter,
        converged,
    }
}

/// Calibrate the conditional probabilities of all points
///
/// ### Params
///
/// * `neighbours` - Sorted neighbour rows for every point
/// * `perplexity` - Target perplexity
/// * `tol` - Convergence tolerance on the entropy
/// * `max_iter` - Maximum number of binary search steps per point
///
/// ### Returns
///
/// One `PointCalibration` per point
pub fn calibrate_affinities<T>(
    neighbours: &[Vec<NeighbourEntry<T>>],
    perplexity: T,
    tol: T,
    max_iter: usize,
) -> Vec<PointCalibration<T>>
where
    T: Float + FromPrimitive,
{
    let target_entropy = perplexity.ln();

    neighbours
        .iter()
        .map(|row| p_j_given_i(row, target_entropy, tol, max_iter))
        .collect()
}

///////////
// Tests //
///////////
