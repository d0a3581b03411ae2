//! Nearest neighbour search against a fixed set of reference points.
//!
//! Pathway mapping only needs a coarse nearest reference point to bracket
//! the foot point refinement. Callers with their own particle geometry
//! (periodic boundaries, cell lists) plug in through [`NeighbourhoodSearch`],
//! [`KdTreeSearch`] is the default.

use kiddo::{KdTree, SquaredEuclidean};

use crate::point::Vec3;

/// Nearest reference point found for a query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NeighbourMatch {
    /// Index into the reference point set.
    pub index: usize,
    /// Squared Euclidean distance to the query.
    pub distance_sq: f64,
}

/// Nearest neighbour lookup over a reference point set.
pub trait NeighbourhoodSearch {
    /// Return the nearest reference point to `query` or `None` if there is
    /// none within `cutoff`.
    fn nearest(&self, query: &Vec3, cutoff: f64) -> Option<NeighbourMatch>;
}

/// Read-only k-d tree over reference points.
#[derive(Debug, Clone)]
pub struct KdTreeSearch {
    tree: KdTree<f64, 3>,
    len: usize,
}

impl KdTreeSearch {
    /// Index the given points, match indices refer to their position in `points`.
    pub fn new(points: &[Vec3]) -> Self {
        let entries: Vec<[f64; 3]> = points.iter().map(|p| [p.x, p.y, p.z]).collect();
        let tree: KdTree<f64, 3> = (&entries).into();
        KdTreeSearch {
            tree,
            len: entries.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl NeighbourhoodSearch for KdTreeSearch {
    fn nearest(&self, query: &Vec3, cutoff: f64) -> Option<NeighbourMatch> {
        if self.is_empty() {
            return None;
        }

        let result = self.tree.nearest_one::<SquaredEuclidean>(&[query.x, query.y, query.z]);
        if result.distance > cutoff * cutoff {
            return None;
        }
        Some(NeighbourMatch {
            index: result.item as usize,
            distance_sq: result.distance,
        })
    }
}

/// Brute force search, adequate for a handful of reference points.
#[derive(Debug, Clone, Copy)]
pub struct LinearSearch<'a> {
    points: &'a [Vec3],
}

impl<'a> LinearSearch<'a> {
    pub fn new(points: &'a [Vec3]) -> Self {
        LinearSearch { points }
    }
}

impl NeighbourhoodSearch for LinearSearch<'_> {
    fn nearest(&self, query: &Vec3, cutoff: f64) -> Option<NeighbourMatch> {
        self.points
            .iter()
            .enumerate()
            .map(|(index, p)| NeighbourMatch {
                index,
                distance_sq: (p - query).norm_squared(),
            })
            .filter(|m| m.distance_sq <= cutoff * cutoff)
            .min_by(|a, b| a.distance_sq.total_cmp(&b.distance_sq))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference_points() -> Vec<Vec3> {
        (0..20)
            .map(|i| {
                let t = i as f64 * 0.3;
                Vec3::new(t.cos(), t.sin(), 0.25 * t)
            })
            .collect()
    }

    #[test]
    fn kd_tree_agrees_with_linear_search() {
        let points = reference_points();
        let kd = KdTreeSearch::new(&points);
        let linear = LinearSearch::new(&points);
        assert_eq!(kd.len(), 20);

        for i in 0..50 {
            let t = i as f64 * 0.13;
            let query = Vec3::new(1.1 * t.cos(), 0.9 * t.sin(), 0.25 * t + 0.05);
            let a = kd.nearest(&query, 10.0).unwrap();
            let b = linear.nearest(&query, 10.0).unwrap();
            assert_eq!(a.index, b.index);
            assert!((a.distance_sq - b.distance_sq).abs() < 1e-12);
        }
    }

    #[test]
    fn cutoff_excludes_distant_points() {
        let points = reference_points();
        let kd = KdTreeSearch::new(&points);
        let linear = LinearSearch::new(&points);
        let far = Vec3::new(0.0, 0.0, 100.0);
        assert!(kd.nearest(&far, 1.0).is_none());
        assert!(linear.nearest(&far, 1.0).is_none());

        let near = points[7] + Vec3::new(0.0, 0.0, 0.01);
        assert_eq!(kd.nearest(&near, 0.05).map(|m| m.index), Some(7));
        assert_eq!(linear.nearest(&near, 0.05).map(|m| m.index), Some(7));
    }

    #[test]
    fn empty_index_finds_nothing() {
        let kd = KdTreeSearch::new(&[]);
        assert!(kd.is_empty());
        assert!(kd.nearest(&Vec3::zeros(), f64::INFINITY).is_none());
    }
}
