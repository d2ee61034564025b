pub mod repulsion;
pub mod tsne_optimiser;

use num_traits::{Float, FromPrimitive};

////////////
// Params //
////////////

/// t-SNE parameters
///
/// ### Fields
///
/// * `perplexity` - Target perplexity, i.e., effective number of neighbours
///   per point (typically 5 - 50).
/// * `early_exag_factor` - Multiplier on the attractive forces during the
///   first iterations to encourage early cluster formation (>= 1).
/// * `lr` - Learning rate.
/// * `max_iter` - Number of iterations `tsne()` runs. The optimiser itself
///   does not stop on its own.
/// * `neighbourhood_multiplier` - `floor(neighbourhood_multiplier *
///   perplexity)` nearest neighbours feed the calibration.
/// * `theta` - Barnes-Hut angle (0 = exact, larger = coarser).
/// * `barnes_hut_cutoff` - Above this many points, Barnes-Hut replaces the
///   exact quadratic repulsion.
#[derive(Clone, Debug)]
pub struct TsneParams<T> {
    pub perplexity: T,
    pub early_exag_factor: T,
    pub lr: T,
    pub max_iter: usize,
    pub neighbourhood_multiplier: T,
    pub theta: T,
    pub barnes_hut_cutoff: usize,
}

impl<T> TsneParams<T>
where
    T: Float + FromPrimitive,
{
    /// Generate a new instance
    ///
    /// ### Params
    ///
    /// * `perplexity` - Target perplexity
    /// * `early_exag_factor` - Early exaggeration factor
    /// * `lr` - Learning rate
    /// * `max_iter` - Number of iterations for `tsne()`
    /// * `neighbourhood_multiplier` - Multiplier for the neighbour count
    /// * `theta` - Barnes-Hut angle
    /// * `barnes_hut_cutoff` - Size above which Barnes-Hut is used
    ///
    /// ### Returns
    ///
    /// Initialised self
    pub fn new(
        perplexity: T,
        early_exag_factor: T,
        lr: T,
        max_iter: usize,
        neighbourhood_multiplier: T,
        theta: T,
        barnes_hut_cutoff: usize,
    ) -> Self {
        Self {
            perplexity,
            early_exag_factor,
            lr,
            max_iter,
            neighbourhood_multiplier,
            theta,
            barnes_hut_cutoff,
        }
    }

    /// Number of nearest neighbours used for the calibration
    pub fn n_neighbours(&self) -> usize {
        (self.neighbourhood_multiplier * self.perplexity)
            .floor()
            .to_usize()
            .unwrap_or(0)
    }

    /// Target entropy `ln(perplexity)`
    pub fn target_entropy(&self) -> T {
        self.perplexity.ln()
    }

    /// Check the parameter ranges
    ///
    /// ### Panics
    ///
    /// If any parameter is out of range.
    pub fn validate(&self) {
        assert!(
            self.perplexity > T::zero(),
            "perplexity must be positive"
        );
        assert!(
            self.early_exag_factor >= T::one(),
            "early_exag_factor must be >= 1"
        );
        assert!(self.lr > T::zero(), "lr must be positive");
        assert!(
            self.neighbourhood_multiplier > T::zero(),
            "neighbourhood_multiplier must be positive"
        );
        assert!(self.theta >= T::zero(), "theta must be non-negative");
        assert!(self.n_neighbours() >= 1, "need at least one neighbour");
    }
}

impl<T> Default for TsneParams<T>
where
    T: Float + FromPrimitive,
{
    /// Returns sensible defaults for t-SNE
    ///
    /// ### Returns
    ///
    /// * `perplexity = 10.0`
    /// * `early_exag_factor = 4.0`
    /// * `lr = 10.0`
    /// * `max_iter = 1000`
    /// * `neighbourhood_multiplier = 3.0`
    /// * `theta = 0.5`
    /// * `barnes_hut_cutoff = 2000`
    fn default() -> Self {
        Self {
            perplexity: T::from_f64(10.0).unwrap(),
            early_exag_factor: T::from_f64(4.0).unwrap(),
            lr: T::from_f64(10.0).unwrap(),
            max_iter: 1000,
            neighbourhood_multiplier: T::from_f64(3.0).unwrap(),
            theta: T::from_f64(0.5).unwrap(),
            barnes_hut_cutoff: 2000,
        }
    }
}
