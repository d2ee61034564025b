use num_traits::{Float, FromPrimitive, ToPrimitive};
use rand::Rng;
use rand_distr::StandardNormal;
use std::time::Instant;
use thousands::*;

use crate::data::affinities::*;
use crate::data::nearest_neighbours::*;
use crate::data::structures::*;
use crate::training::repulsion::*;
use crate::training::TsneParams;
use crate::utils::math::*;

/////////////
// Globals //
/////////////

const TSNE_EARLY_EXAG_ITER: usize = 100;
const TSNE_MOMENTUM_SWITCH_ITER: usize = 250;
const TSNE_INITIAL_MOMENTUM: f64 = 0.5;
const TSNE_FINAL_MOMENTUM: f64 = 0.8;
const TSNE_GAIN_INCREMENT: f64 = 0.2;
const TSNE_GAIN_DECAY: f64 = 0.8;
const TSNE_MIN_GAIN: f64 = 0.01;
const TSNE_INIT_SD: f64 = 1e-4;
const TSNE_REPORT_EVERY: usize = 50;

////////////////
// Structures //
////////////////

/// State of a running optimisation
///
/// ### Fields
///
/// * `solution` - Current embedding, re-centred after every step
/// * `previous_step` - Last applied per-point update (momentum)
/// * `gain` - Per-coordinate adaptive learning rate multiplier
/// * `current_iter` - Number of steps taken so far
/// * `pj_given_i` - Calibrated conditional probabilities; fixed after
///   initialisation
/// * `last_z` - Normaliser Z of the most recent step
#[derive(Clone, Debug)]
pub struct TsneState<T> {
    pub solution: Vec<Point<T>>,
    pub previous_step: Vec<Point<T>>,
    pub gain: Vec<Point<T>>,
    pub current_iter: usize,
    pub pj_given_i: Vec<Vec<ConditionalProbability<T>>>,
    pub last_z: T,
}

/// The t-SNE optimiser
///
/// Construct with `new()`, feed the data via `init_data()` and then advance
/// with `take_step()` for as long as the caller wants.
///
/// ### Fields
///
/// * `params` - The t-SNE parameters
/// * `rng` - Random source for the initial solution
/// * `verbose` - Print progress
/// * `state` - `None` until `init_data()` was called
pub struct Tsne<T, R> {
    params: TsneParams<T>,
    rng: R,
    verbose: bool,
    state: Option<TsneState<T>>,
}

/////////////
// Helpers //
/////////////

/// Attractive forces from the calibrated conditional probabilities
///
/// For every pair (i, j, p_{j|i}) adds `p / (2N) * q_ijZ * (y_i - y_j)` to
/// point i and its negation to point j, which symmetrises the conditional
/// probabilities on the fly.
///
/// ### Params
///
/// * `pj_given_i` - Sparse conditional probabilities per point
/// * `solution` - Current embedding
///
/// ### Returns
///
/// Per-point attractive gradient term
pub fn attractive_forces<T>(
    pj_given_i: &[Vec<ConditionalProbability<T>>],
    solution: &[Point<T>],
) -> Vec<Point<T>>
where
    T: Float + FromPrimitive,
{
    let n = solution.len();
    let two_n = T::from_usize(2 * n).unwrap();
    let mut forces = vec![Point::zero(); n];

    for (i, row) in pj_given_i.iter().enumerate() {
        for &ConditionalProbability { j, value } in row {
            let q = T::one() / (T::one() + solution[i].distance_to_point(&solution[j]));
            let f_ij = (solution[i] - solution[j]) * (value * q / two_n);
            forces[i] += f_ij;
            forces[j] -= f_ij;
        }
    }

    forces
}

/// Adaptive gain for one coordinate
///
/// Shrinks the gain if the gradient has the same sign as the previous step,
/// grows it otherwise; never below the floor.
#[inline(always)]
fn update_gain<T>(gain: T, grad: T, previous_step: T) -> T
where
    T: Float + FromPrimitive,
{
    let new_gain = if sign(grad) == sign(previous_step) {
        gain * T::from_f64(TSNE_GAIN_DECAY).unwrap()
    } else {
        gain + T::from_f64(TSNE_GAIN_INCREMENT).unwrap()
    };
    new_gain.max(T::from_f64(TSNE_MIN_GAIN).unwrap())
}

/// Exaggeration and momentum for a given iteration
///
/// ### Params
///
/// * `iter` - Number of steps already taken
/// * `early_exag_factor` - Exaggeration used during the early phase
///
/// ### Returns
///
/// Tuple of (exaggeration, momentum)
#[inline]
fn step_schedule<T>(iter: usize, early_exag_factor: T) -> (T, T)
where
    T: Float + FromPrimitive,
{
    let exaggeration = if iter < TSNE_EARLY_EXAG_ITER {
        early_exag_factor
    } else {
        T::one()
    };
    let alpha = if iter < TSNE_MOMENTUM_SWITCH_ITER {
        T::from_f64(TSNE_INITIAL_MOMENTUM).unwrap()
    } else {
        T::from_f64(TSNE_FINAL_MOMENTUM).unwrap()
    };
    (exaggeration, alpha)
}

/// Draw N points from N(0, sd²) per coordinate
fn random_solution<T, R>(n: usize, sd: f64, rng: &mut R) -> Vec<Point<T>>
where
    T: Float + FromPrimitive,
    R: Rng,
{
    (0..n)
        .map(|_| {
            let x = rng.sample::<f64, _>(StandardNormal) * sd;
            let y = rng.sample::<f64, _>(StandardNormal) * sd;
            Point::new(T::from_f64(x).unwrap(), T::from_f64(y).unwrap())
        })
        .collect()
}

///////////////
// Optimiser //
///////////////

impl<T, R> Tsne<T, R>
where
    T: Float + FromPrimitive + ToPrimitive,
    R: Rng,
{
    /// Generate a new, uninitialised optimiser
    ///
    /// ### Params
    ///
    /// * `params` - The t-SNE parameters
    /// * `rng` - Random source; a seeded one makes runs reproducible
    /// * `verbose` - Controls verbosity
    ///
    /// ### Returns
    ///
    /// Initialised self
    ///
    /// ### Panics
    ///
    /// If the parameters are out of range.
    pub fn new(params: TsneParams<T>, rng: R, verbose: bool) -> Self {
        params.validate();

        Self {
            params,
            rng,
            verbose,
            state: None,
        }
    }

    /// The parameters
    pub fn params(&self) -> &TsneParams<T> {
        &self.params
    }

    /// Has `init_data()` been called
    pub fn is_initialised(&self) -> bool {
        self.state.is_some()
    }

    /// The optimiser state, if initialised
    pub fn state(&self) -> Option<&TsneState<T>> {
        self.state.as_ref()
    }

    fn running(&self) -> &TsneState<T> {
        self.state
            .as_ref()
            .unwrap_or_else(|| panic!("Tsne::init_data() must be called first"))
    }

    fn running_mut(&mut self) -> &mut TsneState<T> {
        self.state
            .as_mut()
            .unwrap_or_else(|| panic!("Tsne::init_data() must be called first"))
    }

    /// Current embedding
    ///
    /// ### Panics
    ///
    /// Before `init_data()`.
    pub fn solution(&self) -> &[Point<T>] {
        &self.running().solution
    }

    /// Number of steps taken
    ///
    /// ### Panics
    ///
    /// Before `init_data()`.
    pub fn current_iter(&self) -> usize {
        self.running().current_iter
    }

    /// Normaliser Z of the last step (zero before the first step)
    ///
    /// ### Panics
    ///
    /// Before `init_data()`.
    pub fn last_z(&self) -> T {
        self.running().last_z
    }

    /// Which repulsion method the current data uses
    pub fn repulsion_method(&self) -> RepulsionMethod<T> {
        RepulsionMethod::select(
            self.running().solution.len(),
            self.params.barnes_hut_cutoff,
            self.params.theta,
        )
    }

    /// Set up the optimisation for a data set
    ///
    /// Runs the nearest neighbour search once, calibrates p_{j|i} for every
    /// point and draws a near-degenerate random start. Calling it again
    /// restarts from scratch.
    ///
    /// ### Params
    ///
    /// * `points` - The input points
    ///
    /// ### Panics
    ///
    /// If `points` is empty.
    pub fn init_data(&mut self, points: &[Point<T>]) {
        assert!(!points.is_empty(), "init_data() needs at least one point");

        let n = points.len();
        let k = self.params.n_neighbours();

        if self.verbose {
            println!(
                "Running exhaustive nearest neighbour search (k = {}) for {} points...",
                k,
                n.separate_with_underscores()
            );
        }

        let start_knn = Instant::now();
        let nn = NearestNeighbours::new(points, k);

        if self.verbose {
            println!("kNN search done in: {:.2?}.", start_knn.elapsed());
            println!("Calibrating conditional probabilities...");
        }

        let start_cal = Instant::now();
        let calibrations = calibrate_affinities(
            &nn.into_neighbours(),
            self.params.perplexity,
            T::from_f64(CALIBRATION_TOL).unwrap(),
            CALIBRATION_MAX_ITER,
        );

        if self.verbose {
            let not_converged = calibrations.iter().filter(|c| !c.converged).count();
            println!(
                "Calibration done in: {:.2?} ({} of {} points hit the iteration cap).",
                start_cal.elapsed(),
                not_converged,
                n
            );
        }

        let pj_given_i = calibrations
            .into_iter()
            .map(|c| c.probabilities)
            .collect();

        self.state = Some(TsneState {
            solution: random_solution(n, TSNE_INIT_SD, &mut self.rng),
            previous_step: vec![Point::zero(); n],
            gain: vec![Point::new(T::one(), T::one()); n],
            current_iter: 0,
            pj_given_i,
            last_z: T::zero(),
        });
    }

    /// Gradient of the cost against the current solution
    ///
    /// `4 * (exaggeration * F_attr + F_rep)`
    ///
    /// ### Params
    ///
    /// * `exaggeration` - Multiplier on the attractive term
    ///
    /// ### Returns
    ///
    /// Tuple of (per-point gradient, Z)
    pub fn calculate_gradient(&self, exaggeration: T) -> (Vec<Point<T>>, T) {
        let state = self.running();
        let four = T::from_f64(4.0).unwrap();

        let f_attr = attractive_forces(&state.pj_given_i, &state.solution);
        let f_rep = self.repulsion_method().repulsive_forces(&state.solution);

        let gradient = f_attr
            .into_iter()
            .zip(f_rep.forces)
            .map(|(a, r)| (a * exaggeration + r) * four)
            .collect();

        (gradient, f_rep.z)
    }

    /// Advance the solution by one iteration
    ///
    /// Early exaggeration applies for the first 100 iterations, momentum is
    /// 0.5 before iteration 250 and 0.8 afterwards. Each coordinate gets its
    /// own adaptive gain. The solution is re-centred at the end.
    ///
    /// ### Panics
    ///
    /// Before `init_data()`.
    pub fn take_step(&mut self) {
        let iter = self.running().current_iter;
        let (exaggeration, alpha) = step_schedule(iter, self.params.early_exag_factor);
        let lr = self.params.lr;
        let verbose = self.verbose;

        let (gradient, z) = self.calculate_gradient(exaggeration);

        let state = self.running_mut();
        for (i, grad) in gradient.into_iter().enumerate() {
            let prev = state.previous_step[i];
            let gain = Point::new(
                update_gain(state.gain[i].x, grad.x, prev.x),
                update_gain(state.gain[i].y, grad.y, prev.y),
            );

            let step = Point::new(
                -lr * gain.x * grad.x + alpha * prev.x,
                -lr * gain.y * grad.y + alpha * prev.y,
            );

            state.gain[i] = gain;
            state.solution[i] += step;
            state.previous_step[i] = step;
        }

        centre_points(&mut state.solution);
        state.current_iter += 1;
        state.last_z = z;

        if verbose && state.current_iter % TSNE_REPORT_EVERY == 0 {
            println!(
                "Completed iteration {} | Z = {}",
                state.current_iter,
                z.to_f32().unwrap().separate_with_underscores()
            );
        }
    }

    /// Take `n_steps` steps
    pub fn run(&mut self, n_steps: usize) {
        for _ in 0..n_steps {
            self.take_step();
        }
    }

    /// Consume the optimiser and return the final embedding
    ///
    /// ### Panics
    ///
    /// Before `init_data()`.
    pub fn into_solution(self) -> Vec<Point<T>> {
        match self.state {
            Some(state) => state.solution,
            None => panic!("Tsne::init_data() must be called first"),
        }
    }
}

///////////
// Tests //
///////////
