pub mod data;
pub mod prelude;
pub mod training;
pub mod utils;

use num_traits::{Float, FromPrimitive, ToPrimitive};
use rand::Rng;
use std::time::Instant;

use crate::data::structures::*;
use crate::training::tsne_optimiser::*;
use crate::training::TsneParams;

//////////
// tSNE //
//////////

/// Run t-SNE on a 2D point set
///
/// Sets up the optimiser, runs `params.max_iter` steps and returns the
/// final (centred) embedding. Use `Tsne` directly to drive the optimisation
/// step by step, e.g., to render intermediate states.
///
/// ### Params
///
/// * `points` - The input points
/// * `params` - The t-SNE parameters
/// * `rng` - Random source for the initial solution
/// * `verbose` - Controls verbosity of the function.
///
/// ### Returns
///
/// The embedding, one point per input point
///
/// ### Panics
///
/// If `points` is empty or the parameters are out of range.
pub fn tsne<T, R>(points: &[Point<T>], params: TsneParams<T>, rng: R, verbose: bool) -> Vec<Point<T>>
where
    T: Float + FromPrimitive + ToPrimitive,
    R: Rng,
{
    let mut optimiser = Tsne::new(params, rng, verbose);
    let n_iter = optimiser.params().max_iter;

    optimiser.init_data(points);

    if verbose {
        println!(
            "Optimising embedding via {} repulsion for {} iterations...",
            optimiser.repulsion_method().name(),
            n_iter
        );
    }

    let start_optim = Instant::now();
    optimiser.run(n_iter);

    if verbose {
        println!("Optimisation done in {:.2?}.", start_optim.elapsed());
        println!("t-SNE complete!");
    }

    optimiser.into_solution()
}
