//! The high-level palette extraction builder.

use crate::{kmeans, ClusterConfig, ClusterOutput, PaletteError, PixelSlice};

use palette::Srgb;
use std::num::NonZeroU32;

#[cfg(feature = "image")]
use crate::TooManyPixels;
#[cfg(feature = "image")]
use image::{imageops, imageops::FilterType, RgbImage};
#[cfg(feature = "image")]
use palette::cast::ComponentsAs;

/// The default output palette size.
pub const DEFAULT_PALETTE_SIZE: u16 = 8;

/// The default similarity (convergence) threshold, in RGB channel units.
///
/// Refinement below one channel unit of drift cannot change the rounded
/// output colors by much, so this is where the pipeline stops by default.
pub const DEFAULT_SIMILARITY: f32 = 1.0;

/// The default bound on the pixel area handed to the clustering core.
///
/// Images above this area are downscaled before clustering; palette quality
/// is insensitive to resolution well below this bound.
#[cfg(feature = "image")]
pub const DEFAULT_RESIZE_AREA: u32 = 112 * 112;

/// Where the pipeline's pixels come from.
enum Source<'a> {
    /// A prepared pixel slice, used as-is.
    Pixels(PixelSlice<'a>),
    /// A decoded image, downscaled to the configured area bound before
    /// clustering.
    #[cfg(feature = "image")]
    Image(&'a RgbImage),
}

/// A builder struct to extract a color palette from an image or pixel slice.
///
/// Every option has a default, and terminals report all validation failures
/// as [`PaletteError`]s; nothing is silently clamped except the output color
/// count, which cannot exceed the cluster count.
///
/// # Examples
/// ```no_run
/// # use palettize::PalettePipeline;
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let img = image::open("some image")?.into_rgb8();
///
/// let palette = PalettePipeline::try_from(&img)?
///     .colors(5) // the number of palette entries to emit
///     .seed(42) // make the run reproducible
///     .palette()?;
/// # Ok(())
/// # }
/// ```
pub struct PalettePipeline<'a> {
    /// The pixel source.
    source: Source<'a>,
    /// Output palette size.
    colors: u16,
    /// Number of clusters to form; defaults to `colors`.
    clusters: Option<u16>,
    /// Drift convergence threshold.
    similarity: f32,
    /// Refinement iteration cap override.
    max_iterations: Option<NonZeroU32>,
    /// Seed for the random source.
    seed: u64,
    /// Whether to record a per-iteration trace.
    verbose: bool,
    /// Downscale bound for image sources, in pixels; `0` disables resizing.
    #[cfg(feature = "image")]
    resize_area: u32,
}

impl<'a> PalettePipeline<'a> {
    /// Creates a pipeline from a prepared pixel slice with default options.
    #[must_use]
    pub fn new(pixels: PixelSlice<'a>) -> Self {
        Self::with_source(Source::Pixels(pixels))
    }

    /// Default options around the given source.
    fn with_source(source: Source<'a>) -> Self {
        Self {
            source,
            colors: DEFAULT_PALETTE_SIZE,
            clusters: None,
            similarity: DEFAULT_SIMILARITY,
            max_iterations: None,
            seed: 0,
            verbose: false,
            #[cfg(feature = "image")]
            resize_area: DEFAULT_RESIZE_AREA,
        }
    }

    /// Sets the number of palette entries to emit.
    ///
    /// The default is [`DEFAULT_PALETTE_SIZE`].
    #[must_use]
    pub const fn colors(mut self, colors: u16) -> Self {
        self.colors = colors;
        self
    }

    /// Sets the number of clusters to form.
    ///
    /// More clusters than output colors lets minor color populations absorb
    /// pixels that would otherwise skew the prominent centers. The default is
    /// the configured number of colors.
    #[must_use]
    pub const fn clusters(mut self, clusters: u16) -> Self {
        self.clusters = Some(clusters);
        self
    }

    /// Sets the convergence threshold: refinement stops once no cluster
    /// center moved further than this distance, in RGB channel units.
    ///
    /// The default is [`DEFAULT_SIMILARITY`].
    #[must_use]
    pub const fn similarity(mut self, similarity: f32) -> Self {
        self.similarity = similarity;
        self
    }

    /// Sets the refinement iteration cap.
    ///
    /// The default is [`DEFAULT_MAX_ITERATIONS`](crate::DEFAULT_MAX_ITERATIONS).
    #[must_use]
    pub const fn max_iterations(mut self, max_iterations: NonZeroU32) -> Self {
        self.max_iterations = Some(max_iterations);
        self
    }

    /// Sets the seed value for the random number generator.
    ///
    /// The default seed is `0`.
    #[must_use]
    pub const fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets whether a per-iteration [`Trace`](crate::Trace) is recorded in
    /// the [`ClusterOutput`].
    ///
    /// The default is `false`.
    #[must_use]
    pub const fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Sets the downscale bound for image sources, in pixels.
    ///
    /// An image whose area exceeds the bound is resized (preserving aspect
    /// ratio) before its pixels reach the clustering core. `0` disables
    /// resizing. The default is [`DEFAULT_RESIZE_AREA`]; pixel-slice sources
    /// are never resized.
    #[must_use]
    #[cfg(feature = "image")]
    pub const fn resize_area(mut self, resize_area: u32) -> Self {
        self.resize_area = resize_area;
        self
    }

    /// Validates the option set as a whole.
    fn config(&self) -> Result<ClusterConfig, PaletteError> {
        let clusters = self.clusters.unwrap_or(self.colors);
        let mut config =
            ClusterConfig::new(clusters, self.colors, self.similarity)?.verbose(self.verbose);
        if let Some(max_iterations) = self.max_iterations {
            config = config.max_iterations(max_iterations);
        }
        Ok(config)
    }

    /// Runs the pipeline and returns the palette with populations and, when
    /// verbose, the iteration trace.
    ///
    /// # Errors
    /// Returns [`InvalidConfiguration`](PaletteError::InvalidConfiguration)
    /// for out-of-range options, [`EmptyInput`](PaletteError::EmptyInput) for
    /// a pixel-less source, and
    /// [`ConvergenceTimeout`](PaletteError::ConvergenceTimeout) if the
    /// iteration cap is reached.
    pub fn output(self) -> Result<ClusterOutput, PaletteError> {
        let config = self.config()?;
        #[cfg(feature = "image")]
        let resize_area = self.resize_area;
        let Self { source, seed, .. } = self;

        match source {
            Source::Pixels(pixels) => kmeans::cluster(pixels, &config, seed),
            #[cfg(feature = "image")]
            Source::Image(image) => match downscaled(image, resize_area) {
                Some(resized) => kmeans::cluster(image_pixels(&resized), &config, seed),
                None => kmeans::cluster(image_pixels(image), &config, seed),
            },
        }
    }

    /// Runs the pipeline and returns just the palette colors.
    ///
    /// # Errors
    /// See [`output`](Self::output).
    pub fn palette(self) -> Result<Vec<Srgb<u8>>, PaletteError> {
        self.output().map(|output| output.palette)
    }

    /// Runs the pipeline and returns the palette as `#rrggbb` hex strings.
    ///
    /// # Errors
    /// See [`output`](Self::output).
    pub fn palette_hex(self) -> Result<Vec<String>, PaletteError> {
        self.output().map(|output| output.palette_hex())
    }
}

#[cfg(feature = "threads")]
impl<'a> PalettePipeline<'a> {
    /// Parallel version of [`output`](Self::output).
    ///
    /// Produces the same result as the serial version for the same options.
    ///
    /// # Errors
    /// See [`output`](Self::output).
    pub fn output_par(self) -> Result<ClusterOutput, PaletteError> {
        let config = self.config()?;
        #[cfg(feature = "image")]
        let resize_area = self.resize_area;
        let Self { source, seed, .. } = self;

        match source {
            Source::Pixels(pixels) => kmeans::cluster_par(pixels, &config, seed),
            #[cfg(feature = "image")]
            Source::Image(image) => match downscaled(image, resize_area) {
                Some(resized) => kmeans::cluster_par(image_pixels(&resized), &config, seed),
                None => kmeans::cluster_par(image_pixels(image), &config, seed),
            },
        }
    }

    /// Parallel version of [`palette`](Self::palette).
    ///
    /// # Errors
    /// See [`output`](Self::output).
    pub fn palette_par(self) -> Result<Vec<Srgb<u8>>, PaletteError> {
        self.output_par().map(|output| output.palette)
    }
}

#[cfg(feature = "image")]
impl<'a> TryFrom<&'a RgbImage> for PalettePipeline<'a> {
    type Error = TooManyPixels;

    fn try_from(image: &'a RgbImage) -> Result<Self, Self::Error> {
        // only the length check; pixels are borrowed again at run time,
        // after any downscale
        PixelSlice::try_from(image)?;
        Ok(Self::with_source(Source::Image(image)))
    }
}

/// The image's pixel buffer as a pixel slice.
///
/// Callers uphold the pixel count bound; pipeline sources are validated on
/// construction and downscaled images are smaller than their originals.
#[cfg(feature = "image")]
fn image_pixels(image: &RgbImage) -> PixelSlice<'_> {
    let pixels = image.pixels().len();
    let buf = &image.as_raw()[..(pixels * 3)];
    PixelSlice::new_unchecked(buf.components_as())
}

/// Downscales `image` to approximately `resize_area` pixels, or returns
/// `None` when it is already within the bound (or resizing is disabled).
#[cfg(feature = "image")]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn downscaled(image: &RgbImage, resize_area: u32) -> Option<RgbImage> {
    let (width, height) = image.dimensions();
    let area = u64::from(width) * u64::from(height);

    if resize_area == 0 || area <= u64::from(resize_area) {
        return None;
    }

    let scale = (f64::from(resize_area) / area as f64).sqrt();
    let width = ((f64::from(width) * scale).ceil() as u32).max(1);
    let height = ((f64::from(height) * scale).ceil() as u32).max(1);

    Some(imageops::resize(image, width, height, FilterType::Nearest))
}
