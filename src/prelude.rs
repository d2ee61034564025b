pub use crate::data::affinities::{calibrate_affinities, p_j_given_i, PointCalibration};
pub use crate::data::nearest_neighbours::NearestNeighbours;
pub use crate::data::structures::{ConditionalProbability, NeighbourEntry, Point};
pub use crate::training::repulsion::{RepulsionMethod, RepulsiveForces};
pub use crate::training::tsne_optimiser::{Tsne, TsneState};
pub use crate::training::TsneParams;
pub use crate::tsne;
