//! K-means++ seeding: the initial centers for the refinement loop.

use super::{components, distance_squared};
use crate::{PaletteError, PixelSlice};

use rand::{
    distributions::{Distribution, Uniform, WeightedIndex},
    Rng,
};

/// Picks `k` initial cluster centers from `pixels` with K-means++ weighted
/// sampling.
///
/// The first center is a uniformly random pixel. Each further center is a
/// pixel drawn with probability proportional to its squared distance from the
/// nearest already-chosen center, so far-away colors are favored. Every
/// returned center is the exact color of some input pixel.
///
/// # Errors
/// Returns [`EmptyInput`](PaletteError::EmptyInput) for an empty pixel source
/// and [`InvalidConfiguration`](PaletteError::InvalidConfiguration) when `k`
/// is zero or exceeds the pixel count.
pub fn initial_centers(
    pixels: PixelSlice<'_>,
    k: u16,
    rng: &mut impl Rng,
) -> Result<Vec<[f32; 3]>, PaletteError> {
    if pixels.is_empty() {
        return Err(PaletteError::EmptyInput);
    }
    if k == 0 {
        return Err(PaletteError::invalid_configuration(
            "cluster count must be at least 1",
        ));
    }
    if usize::from(k) > pixels.len() {
        return Err(PaletteError::invalid_configuration(format!(
            "cluster count {} exceeds pixel count {}",
            k,
            pixels.len()
        )));
    }

    let points: Vec<[f32; 3]> = pixels.iter().copied().map(components).collect();
    Ok(pick_centers(&points, usize::from(k), rng))
}

/// The seeding procedure on prepared points. Callers uphold
/// `1 <= k <= points.len()`.
pub(crate) fn pick_centers(
    points: &[[f32; 3]],
    k: usize,
    rng: &mut impl Rng,
) -> Vec<[f32; 3]> {
    debug_assert!(k >= 1 && k <= points.len());

    let uniform = Uniform::new(0, points.len());

    let mut centers = Vec::with_capacity(k);
    centers.push(points[uniform.sample(rng)]);

    // each pixel's squared distance to its nearest chosen center, min-merged
    // as centers are added
    let mut weights: Vec<f64> = points
        .iter()
        .map(|&point| f64::from(distance_squared(point, centers[0])))
        .collect();

    while centers.len() < k {
        let chosen = match WeightedIndex::new(&weights) {
            Ok(weighted) => weighted.sample(rng),
            // The weights are finite and non-negative, so the only reachable
            // failure is the all-zero case: every pixel coincides with a
            // chosen center. Fall back to a uniform draw to keep making
            // progress.
            Err(_) => uniform.sample(rng),
        };

        let center = points[chosen];
        for (weight, &point) in weights.iter_mut().zip(points) {
            *weight = weight.min(f64::from(distance_squared(point, center)));
        }
        centers.push(center);
    }

    centers
}
