use num_traits::{Float, FromPrimitive};

use crate::data::structures::*;
use crate::utils::math::enclosing_extent;

//////////////
// QuadNode //
//////////////

/// What a quadtree node currently holds
///
/// ### Variants
///
/// * `Empty` - Unsplit node without points
/// * `Leaf` - Unsplit node holding exactly one point
/// * `Branch` - Subdivided node. The four children live contiguously in the
///   arena starting at `first_child` (top-left, top-right, bottom-left,
///   bottom-right). `residual` is a point that stayed at this node because
///   it was an exact duplicate of the point whose insertion triggered the
///   split.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum NodeKind<T> {
    Empty,
    Leaf(Point<T>),
    Branch {
        first_child: usize,
        residual: Option<Point<T>>,
    },
}

/// A node in the flattened quadtree
///
/// ### Fields
///
/// * `centre` - Centre of the square region covered by the node
/// * `half_dimension` - Half the side length of that region
/// * `count` - Number of points in this node and all descendants
/// * `point_sum` - Coordinate sum of those points; `point_sum / count` is the
///   centre of mass
/// * `kind` - Current node state
#[derive(Clone, Debug)]
pub struct QuadNode<T> {
    pub centre: Point<T>,
    pub half_dimension: T,
    pub count: usize,
    pub point_sum: Point<T>,
    pub kind: NodeKind<T>,
}

impl<T: Float + FromPrimitive> QuadNode<T> {
    fn new(centre: Point<T>, half_dimension: T) -> Self {
        Self {
            centre,
            half_dimension,
            count: 0,
            point_sum: Point::zero(),
            kind: NodeKind::Empty,
        }
    }

    /// Half-open region test
    ///
    /// Left and top boundaries are inside, right and bottom boundaries are
    /// outside, so a point on a shared edge belongs to exactly one child.
    #[inline]
    pub fn encloses_point(&self, p: &Point<T>) -> bool {
        p.x >= self.centre.x - self.half_dimension
            && p.x < self.centre.x + self.half_dimension
            && p.y >= self.centre.y - self.half_dimension
            && p.y < self.centre.y + self.half_dimension
    }

    /// Centre of mass of the points below this node
    ///
    /// ### Returns
    ///
    /// `None` for empty nodes
    #[inline]
    pub fn centroid(&self) -> Option<Point<T>> {
        if self.count == 0 {
            return None;
        }
        Some(self.point_sum / T::from_usize(self.count).unwrap())
    }

    /// Indices of the four children, if subdivided
    #[inline]
    pub fn children(&self) -> Option<[usize; 4]> {
        match self.kind {
            NodeKind::Branch { first_child, .. } => Some([
                first_child,
                first_child + 1,
                first_child + 2,
                first_child + 3,
            ]),
            _ => None,
        }
    }

    #[inline]
    fn record(&mut self, p: Point<T>) {
        self.count += 1;
        self.point_sum += p;
    }
}

//////////////
// Quadtree //
//////////////

/// Region-subdivided quadtree over 2D points
///
/// Continuous flat arena to store the nodes; the root sits at index 0.
/// Nodes subdivide lazily on the second insertion.
#[derive(Clone, Debug)]
pub struct Quadtree<T> {
    pub nodes: Vec<QuadNode<T>>,
}

impl<T> Quadtree<T>
where
    T: Float + FromPrimitive,
{
    /// Root index
    pub const ROOT: usize = 0;

    /// Generate an empty tree covering a square region
    ///
    /// ### Params
    ///
    /// * `centre` - Centre of the root region
    /// * `half_dimension` - Half the side length of the root region
    ///
    /// ### Returns
    ///
    /// Initialised self
    pub fn new(centre: Point<T>, half_dimension: T) -> Self {
        Self {
            nodes: vec![QuadNode::new(centre, half_dimension)],
        }
    }

    /// Build a tree holding all `points`
    ///
    /// The root is a square centred at the origin whose half-dimension is
    /// 1.1 times the largest absolute coordinate, so every point is strictly
    /// inside.
    pub fn from_points(points: &[Point<T>]) -> Self {
        let mut tree = Self::new(Point::zero(), enclosing_extent(points));
        for p in points {
            tree.insert(*p);
        }
        tree
    }

    /// The root node
    #[inline]
    pub fn root(&self) -> &QuadNode<T> {
        &self.nodes[Self::ROOT]
    }

    /// Insert a point
    ///
    /// ### Params
    ///
    /// * `p` - The point to insert
    ///
    /// ### Returns
    ///
    /// `false` if the point is outside the root region. With a root built
    /// by `from_points` this does not happen.
    pub fn insert(&mut self, p: Point<T>) -> bool {
        self.insert_at(Self::ROOT, p)
    }

    fn insert_at(&mut self, idx: usize, p: Point<T>) -> bool {
        if !self.nodes[idx].encloses_point(&p) {
            return false;
        }

        match self.nodes[idx].kind {
            NodeKind::Empty => {
                let node = &mut self.nodes[idx];
                node.kind = NodeKind::Leaf(p);
                node.record(p);
                return true;
            }
            // coincident points can never be separated by splitting; keep
            // the held one here and send the new one down
            NodeKind::Leaf(held) => self.subdivide(idx, held == p),
            NodeKind::Branch { .. } => {}
        }

        let Some(children) = self.nodes[idx].children() else {
            return false;
        };
        for child in children {
            if self.insert_at(child, p) {
                self.nodes[idx].record(p);
                return true;
            }
        }

        false
    }

    /// Split a node into four children
    ///
    /// No-op if the node is already subdivided. A held point is moved into
    /// the child enclosing it unless `keep_point` is set, in which case it
    /// stays at this node as the branch's residual.
    ///
    /// ### Params
    ///
    /// * `idx` - Node to split
    /// * `keep_point` - Keep an already held point at this node
    pub fn subdivide(&mut self, idx: usize, keep_point: bool) {
        let held = match self.nodes[idx].kind {
            NodeKind::Branch { .. } => return,
            NodeKind::Leaf(p) => Some(p),
            NodeKind::Empty => None,
        };

        let two = T::one() + T::one();
        let half = self.nodes[idx].half_dimension / two;
        let Point { x, y } = self.nodes[idx].centre;
        let first_child = self.nodes.len();

        self.nodes.extend([
            QuadNode::new(Point::new(x - half, y - half), half),
            QuadNode::new(Point::new(x + half, y - half), half),
            QuadNode::new(Point::new(x - half, y + half), half),
            QuadNode::new(Point::new(x + half, y + half), half),
        ]);

        let mut residual = if keep_point { held } else { None };

        // the count of this node already includes the moved point
        if let (false, Some(p)) = (keep_point, held) {
            let moved = (first_child..first_child + 4).any(|c| self.insert_at(c, p));
            if !moved {
                residual = Some(p);
            }
        }

        self.nodes[idx].kind = NodeKind::Branch {
            first_child,
            residual,
        };
    }

    /// Compute the repulsive force on a point using the Barnes-Hut
    /// approximation
    ///
    /// ### Params
    ///
    /// * `p` - Position of the query point
    /// * `theta` - Barnes-Hut angle; `0` forces a full (exact) traversal
    ///
    /// ### Returns
    ///
    /// A tuple `(force, sum_q)` where:
    /// * `force` - Unnormalised repulsive force `-Σ q_ijZ² (y_i - y_j)`
    /// * `sum_q` - Sum of unnormalised affinities `Σ q_ijZ`
    pub fn compute_repulsive_force(&self, p: &Point<T>, theta: T) -> (Point<T>, T) {
        let mut force = Point::zero();
        let mut sum_q = T::zero();
        self.recurse(Self::ROOT, p, theta, &mut force, &mut sum_q);
        (force, sum_q)
    }

    fn recurse(&self, idx: usize, p: &Point<T>, theta: T, force: &mut Point<T>, sum_q: &mut T) {
        let node = &self.nodes[idx];

        match node.kind {
            NodeKind::Empty => {}
            NodeKind::Leaf(other) => interact(p, &other, force, sum_q),
            NodeKind::Branch {
                first_child,
                residual,
            } => {
                let Some(centre) = node.centroid() else {
                    return;
                };
                let d = p.distance_to_point(&centre);
                let two = T::one() + T::one();

                // summarised as a single unit interaction, not scaled by count
                if two * node.half_dimension < theta * d.sqrt() {
                    interact(p, &centre, force, sum_q);
                    return;
                }

                if let Some(other) = residual {
                    interact(p, &other, force, sum_q);
                }
                for child in first_child..first_child + 4 {
                    self.recurse(child, p, theta, force, sum_q);
                }
            }
        }
    }
}

/// Pairwise Student-t repulsion between `p` and `other`
///
/// Zero-distance pairs (the point itself or exact duplicates) are skipped.
#[inline]
fn interact<T: Float>(p: &Point<T>, other: &Point<T>, force: &mut Point<T>, sum_q: &mut T) {
    let d = p.distance_to_point(other);
    if d > T::zero() {
        let q = T::one() / (T::one() + d);
        *force -= (*p - *other) * (q * q);
        *sum_q = *sum_q + q;
    }
}

///////////
// Tests //
///////////

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn pts(raw: &[(f64, f64)]) -> Vec<Point<f64>> {
        raw.iter().map(|&p| Point::from(p)).collect()
    }

    /// Walks the tree and asserts count and point_sum of every node.
    /// Returns (count, sum) of the subtree.
    fn check_invariants(tree: &Quadtree<f64>, idx: usize) -> (usize, Point<f64>) {
        let node = &tree.nodes[idx];
        let (count, sum) = match node.kind {
            NodeKind::Empty => (0, Point::zero()),
            NodeKind::Leaf(p) => (1, p),
            NodeKind::Branch {
                first_child,
                residual,
            } => {
                let mut count = 0;
                let mut sum = Point::zero();
                if let Some(r) = residual {
                    count += 1;
                    sum += r;
                }
                for c in first_child..first_child + 4 {
                    let (cc, cs) = check_invariants(tree, c);
                    count += cc;
                    sum += cs;
                }
                (count, sum)
            }
        };

        assert_eq!(node.count, count, "count mismatch at node {}", idx);
        assert_relative_eq!(node.point_sum.x, sum.x, epsilon = 1e-9);
        assert_relative_eq!(node.point_sum.y, sum.y, epsilon = 1e-9);
        if count == 0 {
            assert!(node.centroid().is_none());
        }
        (count, sum)
    }

    #[test]
    fn test_encloses_point_half_open() {
        let tree = Quadtree::new(Point::new(0.0, 0.0), 1.0);
        let root = tree.root();

        assert!(root.encloses_point(&Point::new(0.0, 0.0)));
        assert!(root.encloses_point(&Point::new(-1.0, -1.0)));
        assert!(!root.encloses_point(&Point::new(1.0, 0.0)));
        assert!(!root.encloses_point(&Point::new(0.0, 1.0)));
        assert!(!root.encloses_point(&Point::new(-1.5, 0.0)));
    }

    #[test]
    fn test_single_point_is_leaf() {
        let mut tree = Quadtree::new(Point::new(0.0, 0.0), 2.0);
        assert!(tree.insert(Point::new(1.0, -1.0)));

        let root = tree.root();
        assert_eq!(root.count, 1);
        assert_eq!(root.kind, NodeKind::Leaf(Point::new(1.0, -1.0)));
        assert_eq!(tree.nodes.len(), 1);
    }

    #[test]
    fn test_outside_point_rejected() {
        let mut tree = Quadtree::new(Point::new(0.0, 0.0), 1.0);
        assert!(!tree.insert(Point::new(5.0, 0.0)));
        assert_eq!(tree.root().count, 0);
        assert_eq!(tree.root().kind, NodeKind::Empty);
    }

    #[test]
    fn test_second_point_splits() {
        let mut tree = Quadtree::new(Point::new(0.0, 0.0), 2.0);
        tree.insert(Point::new(-1.0, -1.0));
        tree.insert(Point::new(1.0, 1.0));

        let root = tree.root();
        assert_eq!(root.count, 2);
        let children = root.children().unwrap();
        // top-left holds the first point, bottom-right the second
        assert_eq!(
            tree.nodes[children[0]].kind,
            NodeKind::Leaf(Point::new(-1.0, -1.0))
        );
        assert_eq!(
            tree.nodes[children[3]].kind,
            NodeKind::Leaf(Point::new(1.0, 1.0))
        );
        assert_eq!(tree.nodes[children[1]].kind, NodeKind::Empty);
        assert_relative_eq!(tree.nodes[children[0]].half_dimension, 1.0);
        assert_relative_eq!(tree.nodes[children[0]].centre.x, -1.0);
    }

    #[test]
    fn test_subdivide_is_idempotent() {
        let mut tree = Quadtree::new(Point::new(0.0, 0.0), 2.0);
        tree.subdivide(Quadtree::<f64>::ROOT, false);
        let n_nodes = tree.nodes.len();
        tree.subdivide(Quadtree::<f64>::ROOT, false);

        assert_eq!(tree.nodes.len(), n_nodes);
        assert_eq!(n_nodes, 5);
    }

    #[test]
    fn test_duplicates_stay_as_residual() {
        let mut tree = Quadtree::new(Point::new(0.0, 0.0), 2.0);
        for _ in 0..4 {
            assert!(tree.insert(Point::new(0.5, 0.5)));
        }

        let root = tree.root();
        assert_eq!(root.count, 4);
        match root.kind {
            NodeKind::Branch { residual, .. } => assert_eq!(residual, Some(Point::new(0.5, 0.5))),
            _ => panic!("root should be a branch"),
        }
        let centroid = root.centroid().unwrap();
        assert_relative_eq!(centroid.x, 0.5);
        assert_relative_eq!(centroid.y, 0.5);
        check_invariants(&tree, Quadtree::<f64>::ROOT);
    }

    #[test]
    fn test_count_and_sum_invariants() {
        let raw: Vec<(f64, f64)> = (0..200)
            .map(|i| {
                let t = i as f64 * 0.37;
                (t.sin() * 3.0, (t * 1.3).cos() * 2.0)
            })
            .chain([(0.0, 0.0), (0.0, 0.0), (1.0, 1.0)])
            .collect();
        let points = pts(&raw);
        let tree = Quadtree::from_points(&points);

        let (count, sum) = check_invariants(&tree, Quadtree::<f64>::ROOT);
        assert_eq!(count, points.len());
        let expected = points.iter().fold(Point::zero(), |acc, p| acc + *p);
        assert_relative_eq!(sum.x, expected.x, epsilon = 1e-9);
        assert_relative_eq!(sum.y, expected.y, epsilon = 1e-9);
    }

    #[test]
    fn test_no_self_interaction_single_point() {
        let points = pts(&[(0.5, 0.5)]);
        let tree = Quadtree::from_points(&points);
        let (f, sum_q) = tree.compute_repulsive_force(&points[0], 0.5);

        assert_relative_eq!(f.x, 0.0);
        assert_relative_eq!(f.y, 0.0);
        assert_relative_eq!(sum_q, 0.0);
    }

    #[test]
    fn test_force_symmetry_two_points() {
        let points = pts(&[(0.0, 0.0), (2.0, 0.0)]);
        let tree = Quadtree::from_points(&points);

        let (f0, z0) = tree.compute_repulsive_force(&points[0], 0.5);
        let (f1, z1) = tree.compute_repulsive_force(&points[1], 0.5);

        // gradient terms; descent moves against them, i.e. apart
        assert_relative_eq!(f0.x, -f1.x, epsilon = 1e-12);
        assert!(f0.x > 0.0, "Point 0 should be pushed left");
        assert!(f1.x < 0.0, "Point 1 should be pushed right");
        assert_relative_eq!(f0.y, 0.0);
        // q = 1 / (1 + 4)
        assert_relative_eq!(z0, 0.2, epsilon = 1e-12);
        assert_relative_eq!(z1, 0.2, epsilon = 1e-12);
        assert_relative_eq!(f0.x, 2.0 * 0.04, epsilon = 1e-12);
    }

    #[test]
    fn test_theta_zero_is_exact() {
        let mut points = Vec::new();
        for i in 0..8 {
            for j in 0..8 {
                points.push(Point::new(i as f64 * 0.7 - 2.0, j as f64 * 0.45 - 1.5));
            }
        }
        let tree = Quadtree::from_points(&points);

        for (i, p) in points.iter().enumerate() {
            let mut exact = Point::zero();
            let mut exact_z = 0.0;
            for (j, other) in points.iter().enumerate() {
                if i != j {
                    interact(p, other, &mut exact, &mut exact_z);
                }
            }
            let (f, z) = tree.compute_repulsive_force(p, 0.0);
            assert_relative_eq!(f.x, exact.x, epsilon = 1e-10);
            assert_relative_eq!(f.y, exact.y, epsilon = 1e-10);
            assert_relative_eq!(z, exact_z, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_residual_duplicates_contribute() {
        // two coincident points plus a query point elsewhere
        let points = pts(&[(1.0, 1.0), (1.0, 1.0), (-1.0, -1.0)]);
        let tree = Quadtree::from_points(&points);
        let (f, z) = tree.compute_repulsive_force(&points[2], 0.0);

        // distance² = 8, q = 1/9, twice
        assert_relative_eq!(z, 2.0 / 9.0, epsilon = 1e-12);
        assert_relative_eq!(f.x, 2.0 * 2.0 / 81.0, epsilon = 1e-12);
        assert_relative_eq!(f.y, 2.0 * 2.0 / 81.0, epsilon = 1e-12);
    }

    #[test]
    fn test_summary_far_away() {
        // tight cluster far from the query point is summarised in one go
        let mut points = pts(&[(8.0, 8.0), (8.1, 8.0), (8.0, 8.1), (8.1, 8.1)]);
        points.push(Point::new(-9.0, -9.0));
        let tree = Quadtree::from_points(&points);

        let (_, z) = tree.compute_repulsive_force(&points[4], 1.0);
        let (_, z_exact) = tree.compute_repulsive_force(&points[4], 0.0);

        assert!(z > 0.0);
        // summary counts the cluster as one unit interaction
        assert!(z < z_exact);
    }

    #[test]
    fn test_no_nan_or_inf_forces() {
        let configs: Vec<Vec<(f64, f64)>> = vec![
            vec![(0.0, 0.0), (0.0, 0.0), (0.0, 0.0)],
            vec![(0.0, 0.0), (1e-10, 0.0)],
            vec![(0.0, 0.0), (1e-8, 1e-8), (100.0, 100.0)],
            vec![(1e6, 1e6), (1e6 + 1.0, 1e6)],
        ];

        for (cfg_idx, raw) in configs.iter().enumerate() {
            let points = pts(raw);
            let tree = Quadtree::from_points(&points);
            assert_eq!(tree.root().count, points.len(), "config {}", cfg_idx);

            for p in &points {
                let (f, sum_q) = tree.compute_repulsive_force(p, 0.5);
                assert!(f.is_finite(), "Config {}: force not finite", cfg_idx);
                assert!(sum_q.is_finite() && sum_q >= 0.0);
            }
        }
    }
}
