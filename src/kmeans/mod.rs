//! Palette extraction by K-means clustering over RGB space.
//!
//! A run has two steps, composed by [`cluster`]:
//! 1. [`initial_centers`] picks seed centers with K-means++ weighted sampling:
//!    the first center is a uniformly random pixel, and every further center
//!    is a pixel drawn with probability proportional to its squared distance
//!    from the nearest already-chosen center.
//! 2. Lloyd's iteration refines the centers: assign every pixel to its
//!    nearest center, recompute each center as the mean of its assigned
//!    pixels, and stop once the largest center movement falls below the
//!    configured similarity threshold.
//!
//! The final clusters are ordered by descending population, so the first
//! palette entry is the most prominent color of the input.
//!
//! The random source is explicit: [`cluster`] derives one from a `u64` seed
//! while [`cluster_with_rng`] accepts any [`rand::Rng`], so runs are
//! reproducible.
//!
//! # Examples
//! ```
//! use palettize::{kmeans, ClusterConfig, PixelSlice};
//! use palette::Srgb;
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let pixels = vec![Srgb::new(255u8, 0, 0), Srgb::new(250, 5, 5), Srgb::new(0, 0, 255)];
//! let pixels = PixelSlice::try_from(pixels.as_slice())?;
//! let config = ClusterConfig::new(2, 2, 0.01)?;
//!
//! let output = kmeans::cluster(pixels, &config, 0)?;
//! assert_eq!(output.palette.len(), 2);
//! # Ok(())
//! # }
//! ```

mod lloyd;
mod seed;

pub use seed::initial_centers;

use crate::{ClusterConfig, ClusterOutput, PaletteError, PixelSlice};

use lloyd::Refiner;
use palette::Srgb;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoroshiro128PlusPlus;

/// The three channels of a pixel as `f32`, the representation centers are
/// computed in.
#[inline]
pub(crate) fn components(color: Srgb<u8>) -> [f32; 3] {
    [
        f32::from(color.red),
        f32::from(color.green),
        f32::from(color.blue),
    ]
}

/// Squared Euclidean distance between two points in RGB space.
///
/// Sufficient for nearest-center comparisons and seed weights, where the
/// square root would not change the ordering.
#[inline]
pub(crate) fn distance_squared(a: [f32; 3], b: [f32; 3]) -> f32 {
    let dr = a[0] - b[0];
    let dg = a[1] - b[1];
    let db = a[2] - b[2];
    dr * dr + dg * dg + db * db
}

/// Euclidean distance between two points in RGB space.
///
/// Drift is measured rooted, since the similarity threshold it is compared
/// against is in RGB channel units.
#[inline]
pub(crate) fn distance(a: [f32; 3], b: [f32; 3]) -> f32 {
    distance_squared(a, b).sqrt()
}

/// A center rounded to the nearest integer per channel and clamped to `[0, 255]`.
#[inline]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub(crate) fn quantize_center(center: [f32; 3]) -> Srgb<u8> {
    let [r, g, b] = center.map(|c| c.round().clamp(0.0, 255.0) as u8);
    Srgb::new(r, g, b)
}

/// Checks the pixel source against the configuration and converts it to the
/// `f32` points the algorithm runs on.
fn prepared_points(
    pixels: PixelSlice<'_>,
    config: &ClusterConfig,
) -> Result<Vec<[f32; 3]>, PaletteError> {
    if pixels.is_empty() {
        return Err(PaletteError::EmptyInput);
    }
    if usize::from(config.clusters) > pixels.len() {
        return Err(PaletteError::invalid_configuration(format!(
            "cluster count {} exceeds pixel count {}",
            config.clusters,
            pixels.len()
        )));
    }
    Ok(pixels.iter().copied().map(components).collect())
}

/// Checks caller-supplied initial centers against the configuration.
fn checked_centers(
    centers: Vec<[f32; 3]>,
    config: &ClusterConfig,
) -> Result<Vec<[f32; 3]>, PaletteError> {
    if centers.len() == usize::from(config.clusters) {
        Ok(centers)
    } else {
        Err(PaletteError::invalid_configuration(format!(
            "{} initial centers supplied for {} clusters",
            centers.len(),
            config.clusters
        )))
    }
}

/// Extracts a palette from `pixels`, deriving the random source from `seed`.
///
/// Runs with the same pixels, configuration, and seed produce identical
/// output.
///
/// # Errors
/// Returns [`EmptyInput`](PaletteError::EmptyInput) for an empty pixel
/// source, [`InvalidConfiguration`](PaletteError::InvalidConfiguration) if
/// the configured cluster count exceeds the pixel count, and
/// [`ConvergenceTimeout`](PaletteError::ConvergenceTimeout) if the iteration
/// cap is reached first.
pub fn cluster(
    pixels: PixelSlice<'_>,
    config: &ClusterConfig,
    seed: u64,
) -> Result<ClusterOutput, PaletteError> {
    cluster_with_rng(pixels, config, &mut Xoroshiro128PlusPlus::seed_from_u64(seed))
}

/// Extracts a palette from `pixels` using a caller-supplied random source.
///
/// # Errors
/// See [`cluster`].
pub fn cluster_with_rng(
    pixels: PixelSlice<'_>,
    config: &ClusterConfig,
    rng: &mut impl Rng,
) -> Result<ClusterOutput, PaletteError> {
    let points = prepared_points(pixels, config)?;
    let seeds = seed::pick_centers(&points, usize::from(config.clusters), rng);
    Refiner::new(&points, seeds).run(config, Refiner::assign)
}

/// Refines caller-supplied initial centers instead of seeding new ones.
///
/// This is the second half of [`cluster`]; it is exposed so a run can be
/// resumed from, or compared against, a known set of centers.
///
/// # Errors
/// See [`cluster`]; additionally fails with
/// [`InvalidConfiguration`](PaletteError::InvalidConfiguration) if the number
/// of supplied centers differs from the configured cluster count.
pub fn refine(
    pixels: PixelSlice<'_>,
    config: &ClusterConfig,
    centers: Vec<[f32; 3]>,
) -> Result<ClusterOutput, PaletteError> {
    let points = prepared_points(pixels, config)?;
    let centers = checked_centers(centers, config)?;
    Refiner::new(&points, centers).run(config, Refiner::assign)
}

/// Parallel version of [`cluster`].
///
/// Only the per-pixel assignment pass is parallelized; it has no cross-pixel
/// data dependency, so the output is identical to the serial version for the
/// same seed.
///
/// # Errors
/// See [`cluster`].
#[cfg(feature = "threads")]
pub fn cluster_par(
    pixels: PixelSlice<'_>,
    config: &ClusterConfig,
    seed: u64,
) -> Result<ClusterOutput, PaletteError> {
    cluster_par_with_rng(pixels, config, &mut Xoroshiro128PlusPlus::seed_from_u64(seed))
}

/// Parallel version of [`cluster_with_rng`].
///
/// # Errors
/// See [`cluster`].
#[cfg(feature = "threads")]
pub fn cluster_par_with_rng(
    pixels: PixelSlice<'_>,
    config: &ClusterConfig,
    rng: &mut impl Rng,
) -> Result<ClusterOutput, PaletteError> {
    let points = prepared_points(pixels, config)?;
    let seeds = seed::pick_centers(&points, usize::from(config.clusters), rng);
    Refiner::new(&points, seeds).run(config, Refiner::assign_par)
}

/// Parallel version of [`refine`].
///
/// # Errors
/// See [`refine`].
#[cfg(feature = "threads")]
pub fn refine_par(
    pixels: PixelSlice<'_>,
    config: &ClusterConfig,
    centers: Vec<[f32; 3]>,
) -> Result<ClusterOutput, PaletteError> {
    let points = prepared_points(pixels, config)?;
    let centers = checked_centers(centers, config)?;
    Refiner::new(&points, centers).run(config, Refiner::assign_par)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::tests::*;

    /// 60 pure red pixels followed by 40 pure blue ones.
    fn red_blue_pixels() -> Vec<Srgb<u8>> {
        let mut pixels = vec![Srgb::new(255u8, 0, 0); 60];
        pixels.extend(std::iter::repeat(Srgb::new(0u8, 0, 255)).take(40));
        pixels
    }

    #[test]
    fn empty_input() {
        let config = ClusterConfig::new(2, 2, 0.01).unwrap();
        let pixels = PixelSlice::new_unchecked(&[]);

        assert_eq!(cluster(pixels, &config, 0), Err(PaletteError::EmptyInput));

        #[cfg(feature = "threads")]
        assert_eq!(cluster_par(pixels, &config, 0), Err(PaletteError::EmptyInput));
    }

    #[test]
    fn more_clusters_than_pixels() {
        let pixels = test_data_1024();
        let pixels = PixelSlice::try_from(&pixels[..16]).unwrap();
        let config = ClusterConfig::new(17, 4, 0.01).unwrap();

        assert!(matches!(
            cluster(pixels, &config, 0),
            Err(PaletteError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn two_tone_input_splits_by_population() {
        let pixels = red_blue_pixels();
        let pixels = PixelSlice::try_from(pixels.as_slice()).unwrap();
        let config = ClusterConfig::new(2, 2, 0.01).unwrap();

        let output = cluster(pixels, &config, 0).unwrap();

        assert_eq!(output.palette, vec![Srgb::new(255, 0, 0), Srgb::new(0, 0, 255)]);
        assert_eq!(output.counts, vec![60, 40]);
    }

    #[test]
    fn single_cluster_converges_to_the_mean() {
        let pixels = [
            Srgb::new(10u8, 20, 30),
            Srgb::new(20u8, 40, 60),
            Srgb::new(30u8, 60, 90),
            Srgb::new(40u8, 80, 120),
        ];
        let pixels = PixelSlice::try_from(pixels.as_slice()).unwrap();
        let config = ClusterConfig::new(1, 1, 0.01).unwrap();

        let output = cluster(pixels, &config, 7).unwrap();

        assert_eq!(output.palette, vec![Srgb::new(25, 50, 75)]);
        assert_eq!(output.counts, vec![4]);
    }

    #[test]
    fn one_cluster_per_pixel_converges_immediately() {
        let data = [
            Srgb::new(0u8, 0, 0),
            Srgb::new(60u8, 0, 0),
            Srgb::new(0u8, 120, 0),
            Srgb::new(0u8, 0, 180),
            Srgb::new(240u8, 240, 240),
        ];
        let pixels = PixelSlice::try_from(data.as_slice()).unwrap();
        let config = ClusterConfig::new(5, 5, 0.01).unwrap().verbose(true);

        let output = cluster(pixels, &config, 3).unwrap();

        assert_eq!(output.counts, vec![1; 5]);
        let mut palette = output.palette.clone();
        palette.sort_by_key(|srgb| srgb.into_components());
        let mut expected = data.to_vec();
        expected.sort_by_key(|srgb| srgb.into_components());
        assert_eq!(palette, expected);

        let trace = output.trace.unwrap();
        assert_eq!(trace.steps.len(), 1);
        assert_eq!(trace.steps[0].max_drift, 0.0);
    }

    #[test]
    fn seeded_runs_are_deterministic() {
        let pixels = test_data_1024();
        let pixels = PixelSlice::try_from(pixels.as_slice()).unwrap();
        let config = ClusterConfig::new(8, 8, 0.25).unwrap();

        let first = cluster(pixels, &config, 42).unwrap();
        let second = cluster(pixels, &config, 42).unwrap();
        assert_eq!(first, second);

        #[cfg(feature = "threads")]
        {
            let par = cluster_par(pixels, &config, 42).unwrap();
            assert_eq!(first, par);
        }
    }

    #[test]
    fn counts_partition_the_input() {
        let pixels = test_data_1024();
        let pixels = PixelSlice::try_from(pixels.as_slice()).unwrap();
        let config = ClusterConfig::new(16, 16, 0.25).unwrap();

        let output = cluster(pixels, &config, 9).unwrap();

        assert_eq!(output.palette.len(), 16);
        assert_eq!(output.counts.iter().sum::<u32>(), pixels.num_pixels());
        for pair in output.counts.windows(2) {
            assert!(pair[0] >= pair[1], "counts not descending: {:?}", output.counts);
        }
    }

    #[test]
    fn palette_is_truncated_to_color_count() {
        let pixels = test_data_1024();
        let pixels = PixelSlice::try_from(pixels.as_slice()).unwrap();
        let config = ClusterConfig::new(16, 4, 0.25).unwrap();

        let output = cluster(pixels, &config, 11).unwrap();
        assert_eq!(output.palette.len(), 4);
        assert_eq!(output.counts.len(), 4);
    }

    #[test]
    fn converged_centers_are_a_fixed_point() {
        let pixels = red_blue_pixels();
        let pixels = PixelSlice::try_from(pixels.as_slice()).unwrap();
        let config = ClusterConfig::new(2, 2, 0.01).unwrap().verbose(true);

        let output = cluster(pixels, &config, 5).unwrap();
        let converged = output.trace.unwrap().steps.last().unwrap().centers.clone();

        let rerun = refine(pixels, &config, converged).unwrap();
        let trace = rerun.trace.unwrap();
        assert_eq!(trace.steps.len(), 1, "re-running a converged state iterated again");
        assert_eq!(trace.steps[0].max_drift, 0.0);
        assert_eq!(rerun.palette, output.palette);
    }

    #[test]
    fn timeout_is_surfaced() {
        let pixels = [
            Srgb::new(0u8, 0, 0),
            Srgb::new(40u8, 40, 40),
            Srgb::new(200u8, 200, 200),
            Srgb::new(255u8, 255, 255),
        ];
        let pixels = PixelSlice::try_from(pixels.as_slice()).unwrap();
        let config = ClusterConfig::new(2, 2, 1e-6)
            .unwrap()
            .max_iterations(std::num::NonZeroU32::new(1).unwrap());

        // any seed pair leaves at least one center a mean away from its seed
        let result = cluster(pixels, &config, 0);
        assert!(matches!(
            result,
            Err(PaletteError::ConvergenceTimeout { iterations: 1, .. })
        ));
    }

    #[test]
    fn verbose_trace_has_run_shape() {
        let pixels = test_data_1024();
        let pixels = PixelSlice::try_from(pixels.as_slice()).unwrap();
        let config = ClusterConfig::new(8, 8, 0.25).unwrap().verbose(true);

        let output = cluster(pixels, &config, 1).unwrap();
        let trace = output.trace.unwrap();

        assert_eq!(trace.seeds.len(), 8);
        assert!(!trace.steps.is_empty());
        for step in &trace.steps {
            assert_eq!(step.centers.len(), 8);
        }
        let last = trace.steps.last().unwrap();
        assert!(last.max_drift < 0.25);

        let quiet = cluster(pixels, &config.clone().verbose(false), 1).unwrap();
        assert!(quiet.trace.is_none());
    }
}
