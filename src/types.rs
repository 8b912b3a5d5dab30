//! Contains various types needed across the crate.

use crate::MAX_PIXELS;
use palette::Srgb;
use std::ops::Deref;
use thiserror::Error;

#[cfg(feature = "image")]
use {image::RgbImage, palette::cast::ComponentsAs};

/// An error type for when the number of input pixels is above
/// the maximum supported value.
///
/// The inner value is the maximum supported pixel count.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("pixel count above the maximum of {0}")]
pub struct TooManyPixels(pub u32);

/// A simple new type wrapper around `&'a [Srgb<u8>]` with the invariant that
/// the length of the inner slice must not be greater than [`MAX_PIXELS`],
/// so that cluster populations and member indices fit in a `u32`.
///
/// The slice must remain unchanged for the duration of one clustering run,
/// which the borrow guarantees.
///
/// # Examples
/// Use `try_into` or [`PixelSlice::from_truncated`] to create [`PixelSlice`]s.
///
/// From a raw pixel slice:
/// ```
/// # use palettize::{PixelSlice, TooManyPixels};
/// # use palette::Srgb;
/// # fn main() -> Result<(), TooManyPixels> {
/// let srgb = vec![Srgb::new(0, 0, 0)];
/// let pixels: PixelSlice = srgb.as_slice().try_into()?;
/// # Ok(())
/// # }
/// ```
///
/// From an image (needs the `image` feature to be enabled):
/// ```no_run
/// # use palettize::PixelSlice;
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let img = image::open("some image")?.into_rgb8();
/// let pixels = PixelSlice::try_from(&img)?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct PixelSlice<'a>(&'a [Srgb<u8>]);

impl<'a> PixelSlice<'a> {
    /// Creates a [`PixelSlice`] without ensuring that its length
    /// is less than or equal to [`MAX_PIXELS`].
    #[allow(unused)]
    pub(crate) const fn new_unchecked(pixels: &'a [Srgb<u8>]) -> Self {
        Self(pixels)
    }

    /// Creates a new [`PixelSlice`] by truncating the input slice to a max length of [`MAX_PIXELS`].
    pub fn from_truncated(pixels: &'a [Srgb<u8>]) -> Self {
        Self(&pixels[..pixels.len().min(MAX_PIXELS as usize)])
    }

    /// Returns the number of pixels as a `u32`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn num_pixels(&self) -> u32 {
        self.0.len() as u32
    }
}

impl<'a> AsRef<[Srgb<u8>]> for PixelSlice<'a> {
    fn as_ref(&self) -> &[Srgb<u8>] {
        self
    }
}

impl<'a> Deref for PixelSlice<'a> {
    type Target = [Srgb<u8>];

    fn deref(&self) -> &Self::Target {
        self.0
    }
}

impl<'a> From<PixelSlice<'a>> for &'a [Srgb<u8>] {
    fn from(val: PixelSlice<'a>) -> Self {
        val.0
    }
}

impl<'a> TryFrom<&'a [Srgb<u8>]> for PixelSlice<'a> {
    type Error = TooManyPixels;

    fn try_from(slice: &'a [Srgb<u8>]) -> Result<Self, Self::Error> {
        if slice.len() <= MAX_PIXELS as usize {
            Ok(Self(slice))
        } else {
            Err(TooManyPixels(MAX_PIXELS))
        }
    }
}

#[cfg(feature = "image")]
impl<'a> TryFrom<&'a RgbImage> for PixelSlice<'a> {
    type Error = TooManyPixels;

    fn try_from(image: &'a RgbImage) -> Result<Self, Self::Error> {
        let pixels = image.pixels().len();
        if pixels <= MAX_PIXELS as usize {
            let buf = &image.as_raw()[..(pixels * 3)];
            Ok(Self(buf.components_as()))
        } else {
            Err(TooManyPixels(MAX_PIXELS))
        }
    }
}

/// One per-iteration snapshot of the refinement loop.
///
/// Only produced when verbose tracing is requested; the clustering algorithm
/// itself never reads a snapshot back.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceStep {
    /// The cluster centers at the end of the iteration,
    /// ordered by descending cluster population.
    pub centers: Vec<[f32; 3]>,
    /// The largest center movement measured in the iteration,
    /// in RGB channel units.
    pub max_drift: f32,
}

/// The full history of one clustering run, from seeding to convergence.
#[derive(Debug, Clone, PartialEq)]
pub struct Trace {
    /// The initial centers chosen by the seeding step.
    ///
    /// Each is the exact color of some input pixel, so all channel values are integral.
    pub seeds: Vec<[f32; 3]>,
    /// One [`TraceStep`] per refinement iteration, in iteration order.
    pub steps: Vec<TraceStep>,
}

/// The output struct returned by the clustering functions.
///
/// It contains the color `palette` extracted from the input, alongside
/// `counts` which has the number of pixels assigned to each palette color.
/// The entries of both are ordered by descending cluster population.
///
/// `trace` is `Some` only if verbose tracing was requested.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterOutput {
    /// The computed color palette that is representative of the input pixels.
    ///
    /// The colors in the palette are not guaranteed to be unique.
    pub palette: Vec<Srgb<u8>>,
    /// The number of pixels that were assigned to each color in `palette`.
    ///
    /// Each count is not guaranteed to be non-zero.
    pub counts: Vec<u32>,
    /// The per-iteration history of the run, if verbose tracing was requested.
    pub trace: Option<Trace>,
}

impl ClusterOutput {
    /// Formats each palette color as a lowercase `#rrggbb` hex string.
    #[must_use]
    pub fn palette_hex(&self) -> Vec<String> {
        self.palette
            .iter()
            .map(|color| format!("#{:02x}{:02x}{:02x}", color.red, color.green, color.blue))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixel_slice_from_slice() {
        let pixels = vec![Srgb::new(1u8, 2, 3); 10];
        let slice = PixelSlice::try_from(pixels.as_slice()).unwrap();
        assert_eq!(slice.num_pixels(), 10);
        assert_eq!(slice[0], Srgb::new(1, 2, 3));

        let truncated = PixelSlice::from_truncated(pixels.as_slice());
        assert_eq!(truncated, slice);
    }

    #[test]
    fn palette_hex_formatting() {
        let output = ClusterOutput {
            palette: vec![Srgb::new(255, 0, 0), Srgb::new(0, 0, 255), Srgb::new(18, 52, 86)],
            counts: vec![3, 2, 1],
            trace: None,
        };

        assert_eq!(output.palette_hex(), vec!["#ff0000", "#0000ff", "#123456"]);
    }
}
