pub mod math;
pub mod quadtree;
