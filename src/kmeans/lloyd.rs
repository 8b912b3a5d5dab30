//! Lloyd's iteration: alternating assignment and center recomputation.

use super::{distance, distance_squared, quantize_center};
use crate::{ClusterConfig, ClusterOutput, PaletteError, Trace, TraceStep};

use log::{debug, warn};

#[cfg(feature = "threads")]
use rayon::prelude::*;

/// One cluster: a center and the indices of the pixels currently assigned to it.
#[derive(Debug, Clone)]
struct Cluster {
    center: [f32; 3],
    members: Vec<u32>,
}

/// The state of one refinement run.
///
/// Membership is recomputed from scratch every iteration; `labels` carries
/// the per-pixel assignment out of the (possibly parallel) assignment pass,
/// and `members` is rebuilt from it before the update step.
pub(crate) struct Refiner<'a> {
    points: &'a [[f32; 3]],
    clusters: Vec<Cluster>,
    labels: Vec<u32>,
}

/// Index of the nearest center, ties broken by the lowest cluster index.
#[inline]
#[allow(clippy::cast_possible_truncation)]
fn nearest(clusters: &[Cluster], point: [f32; 3]) -> u32 {
    let mut best = 0;
    let mut best_distance = f32::INFINITY;
    for (i, cluster) in clusters.iter().enumerate() {
        let distance = distance_squared(point, cluster.center);
        if distance < best_distance {
            best = i;
            best_distance = distance;
        }
    }
    best as u32
}

impl<'a> Refiner<'a> {
    /// Callers uphold `1 <= centers.len() <= points.len()`.
    pub(crate) fn new(points: &'a [[f32; 3]], centers: Vec<[f32; 3]>) -> Self {
        debug_assert!(!centers.is_empty() && centers.len() <= points.len());

        let clusters = centers
            .into_iter()
            .map(|center| Cluster { center, members: Vec::new() })
            .collect();

        Self {
            points,
            clusters,
            labels: vec![0; points.len()],
        }
    }

    /// Assigns every pixel to its nearest center.
    pub(crate) fn assign(&mut self) {
        {
            let Self { points, clusters, labels } = self;
            for (label, &point) in labels.iter_mut().zip(points.iter()) {
                *label = nearest(clusters, point);
            }
        }
        self.rebuild_members();
    }

    /// Parallel assignment pass. Workers only read the centers and write
    /// disjoint label slots, so the result is identical to [`Self::assign`].
    #[cfg(feature = "threads")]
    pub(crate) fn assign_par(&mut self) {
        {
            let Self { points, clusters, labels } = self;
            let clusters: &[Cluster] = clusters;
            labels
                .par_iter_mut()
                .zip(points.par_iter())
                .for_each(|(label, &point)| *label = nearest(clusters, point));
        }
        self.rebuild_members();
    }

    /// Rebuilds each cluster's member list from the label array.
    fn rebuild_members(&mut self) {
        let Self { clusters, labels, .. } = self;
        for cluster in clusters.iter_mut() {
            cluster.members.clear();
        }
        #[allow(clippy::cast_possible_truncation)]
        for (i, &label) in labels.iter().enumerate() {
            clusters[label as usize].members.push(i as u32);
        }
    }

    /// Moves every center to the mean of its members and returns the largest
    /// movement. A cluster with no members keeps its previous center so the
    /// cluster count stays fixed.
    #[allow(clippy::cast_possible_truncation)]
    fn update_centers(&mut self) -> f32 {
        let mut max_drift = 0.0f32;

        for cluster in &mut self.clusters {
            if cluster.members.is_empty() {
                continue;
            }

            // channel sums are exact in f64: each addend is an integral
            // value in [0, 255] and there are at most u32::MAX of them
            let mut sums = [0.0f64; 3];
            for &i in &cluster.members {
                let point = self.points[i as usize];
                for (sum, channel) in sums.iter_mut().zip(point) {
                    *sum += f64::from(channel);
                }
            }

            let count = cluster.members.len() as f64;
            let center = sums.map(|sum| (sum / count) as f32);

            max_drift = max_drift.max(distance(cluster.center, center));
            cluster.center = center;
        }

        max_drift
    }

    /// Descending population, stable on ties.
    fn sort_clusters(&mut self) {
        self.clusters.sort_by(|a, b| b.members.len().cmp(&a.members.len()));
    }

    /// Runs assignment/update rounds until the largest center movement drops
    /// below the similarity threshold, then emits the first
    /// [`palette_size`](ClusterConfig::palette_size) clusters by descending
    /// population.
    pub(crate) fn run(
        mut self,
        config: &ClusterConfig,
        assign: fn(&mut Self),
    ) -> Result<ClusterOutput, PaletteError> {
        let mut trace = config.verbose.then(|| Trace {
            seeds: self.clusters.iter().map(|cluster| cluster.center).collect(),
            steps: Vec::new(),
        });

        let mut max_drift = f32::INFINITY;

        for iteration in 1..=config.max_iterations {
            assign(&mut self);
            max_drift = self.update_centers();
            debug!("iteration {iteration}: max center drift {max_drift}");

            if let Some(trace) = &mut trace {
                self.sort_clusters();
                trace.steps.push(TraceStep {
                    centers: self.clusters.iter().map(|cluster| cluster.center).collect(),
                    max_drift,
                });
            }

            if max_drift < config.similarity {
                self.sort_clusters();
                return Ok(self.into_output(config, trace));
            }
        }

        warn!(
            "no convergence after {} iterations (threshold {}, last max drift {max_drift})",
            config.max_iterations, config.similarity
        );
        Err(PaletteError::ConvergenceTimeout {
            iterations: config.max_iterations,
            max_drift,
        })
    }

    /// The first `palette_size` clusters as rounded colors and populations.
    #[allow(clippy::cast_possible_truncation)]
    fn into_output(self, config: &ClusterConfig, trace: Option<Trace>) -> ClusterOutput {
        let take = usize::from(config.palette_size());

        let palette = self
            .clusters
            .iter()
            .take(take)
            .map(|cluster| quantize_center(cluster.center))
            .collect();
        let counts = self
            .clusters
            .iter()
            .take(take)
            .map(|cluster| cluster.members.len() as u32)
            .collect();

        ClusterOutput { palette, counts, trace }
    }
}
