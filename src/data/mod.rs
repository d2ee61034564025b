pub mod affinities;
pub mod nearest_neighbours;
pub mod structures;
