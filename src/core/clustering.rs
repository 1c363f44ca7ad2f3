//! Lloyd's k-means over small 2-D point sets (event chunks).
//!
//! Initial centres are `k` distinct input points drawn with a seeded RNG, so
//! a given seed always produces the same clustering. Convergence is exact:
//! iteration stops when no centre moves at all.

use crate::core::activity::ActivityPoint;
use crate::error::{AnalysisError, ClusterError, Result};
use crate::source::Event;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub type Point = [f64; 2];

/// Default iteration cap; exact-equality convergence can oscillate.
pub const DEFAULT_MAX_ITERATIONS: usize = 300;

/// Default seed for centre selection.
pub const DEFAULT_SEED: u64 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KMeansConfig {
    /// Number of clusters
    pub k: usize,
    /// Seed for initial centre selection
    pub seed: u64,
    /// Upper bound on refinement rounds
    pub max_iterations: usize,
}

impl KMeansConfig {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            seed: DEFAULT_SEED,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }
}

/// Result of a k-means run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clustering {
    /// Final centre of each cluster
    pub centers: Vec<Point>,
    /// Cluster index of each input point, in input order
    pub labels: Vec<usize>,
    /// Assignment rounds performed
    pub iterations: usize,
    /// False when the iteration cap was hit before centres settled
    pub converged: bool,
}

impl Clustering {
    /// Indices of the points assigned to `cluster`.
    pub fn members(&self, cluster: usize) -> Vec<usize> {
        self.labels
            .iter()
            .enumerate()
            .filter(|(_, &label)| label == cluster)
            .map(|(i, _)| i)
            .collect()
    }

    /// Number of points in each cluster.
    pub fn sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.centers.len()];
        for &label in &self.labels {
            sizes[label] += 1;
        }
        sizes
    }
}

/// Partition `points` into `config.k` clusters.
///
/// A centre whose cluster ends up empty keeps its previous position.
pub fn find_clusters(points: &[Point], config: &KMeansConfig) -> Result<Clustering> {
    let n = points.len();
    let k = config.k;
    if k == 0 {
        return Err(AnalysisError::Argument(
            "cluster count must be at least 1".to_string(),
        ));
    }
    if n < k {
        return Err(ClusterError::InsufficientPoints { n, k }.into());
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut centers: Vec<Point> = rand::seq::index::sample(&mut rng, n, k)
        .into_iter()
        .map(|i| points[i])
        .collect();

    let mut labels = vec![0; n];
    let mut iterations = 0;

    loop {
        assign_labels(points, &centers, &mut labels);
        iterations += 1;

        let new_centers = recompute_centers(points, &labels, &centers);
        if new_centers == centers {
            debug!(k, n, iterations, "k-means converged");
            return Ok(Clustering {
                centers,
                labels,
                iterations,
                converged: true,
            });
        }
        centers = new_centers;

        if iterations >= config.max_iterations {
            warn!(k, n, iterations, "k-means stopped at iteration cap");
            assign_labels(points, &centers, &mut labels);
            return Ok(Clustering {
                centers,
                labels,
                iterations,
                converged: false,
            });
        }
    }
}

/// Nearest centre for every point; ties go to the lowest centre index.
fn assign_labels(points: &[Point], centers: &[Point], labels: &mut [usize]) {
    for (point, label) in points.iter().zip(labels.iter_mut()) {
        let mut best = 0;
        let mut best_distance = f64::INFINITY;
        for (i, center) in centers.iter().enumerate() {
            let distance = squared_distance(point, center);
            if distance < best_distance {
                best = i;
                best_distance = distance;
            }
        }
        *label = best;
    }
}

fn recompute_centers(points: &[Point], labels: &[usize], previous: &[Point]) -> Vec<Point> {
    let mut sums = vec![[0.0f64; 2]; previous.len()];
    let mut counts = vec![0usize; previous.len()];

    for (point, &label) in points.iter().zip(labels) {
        sums[label][0] += point[0];
        sums[label][1] += point[1];
        counts[label] += 1;
    }

    sums.iter()
        .zip(&counts)
        .zip(previous)
        .map(|((sum, &count), &old)| {
            if count == 0 {
                old
            } else {
                [sum[0] / count as f64, sum[1] / count as f64]
            }
        })
        .collect()
}

fn squared_distance(a: &Point, b: &Point) -> f64 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    dx * dx + dy * dy
}

/// Project events onto their pixel coordinates.
pub fn project_xy(events: &[Event]) -> Vec<Point> {
    events.iter().map(|e| [e.x as f64, e.y as f64]).collect()
}

/// Project activity points onto `(polarity, elapsed)`.
pub fn project_activity(points: &[ActivityPoint]) -> Vec<Point> {
    points.iter().map(ActivityPoint::as_point).collect()
}
