//! A library for extracting small, representative color palettes from images.
//!
//! `palettize` clusters an image's pixels in RGB space using K-means++
//! seeding followed by Lloyd's refinement, and reports the cluster centers
//! ordered by cluster population, so the first palette entry is the most
//! prominent color of the input.
//!
//! # Features
//! To reduce dependencies and compile times, `palettize` has several `cargo`
//! features that can be turned off or on:
//! - `pipelines`: exposes the builder struct that serves as the high-level API (more details below).
//! - `threads`: exposes parallel versions of the clustering functions via [`rayon`].
//! - `image`: enables integration with the [`image`] crate.
//!
//! # High-Level API
//! To get started with the high-level API, see [`PalettePipeline`].
//! It has examples in its documentation, but here is an additional example:
//! ```no_run
//! # use palettize::PalettePipeline;
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let img = image::open("some image")?.into_rgb8();
//!
//! let hex = PalettePipeline::try_from(&img)?
//!     .colors(5) // set the number of colors in the palette
//!     .clusters(16) // cluster more finely than the palette size
//!     .seed(42) // make the run reproducible
//!     .palette_hex()?;
//! # Ok(())
//! # }
//! ```
//!
//! For the low-level API, see the [`kmeans`] module.
//!
//! Note that some of the options and functions above require certain features to be enabled.

#![deny(unsafe_code)]
#![warn(
    clippy::pedantic,
    clippy::cargo,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::todo,
    clippy::unimplemented,
    clippy::unwrap_used,
    clippy::unwrap_in_result,
    clippy::expect_used,
    clippy::unneeded_field_pattern,
    clippy::rest_pat_in_fully_bound_structs,
    clippy::unnecessary_self_imports,
    clippy::str_to_string,
    clippy::string_to_string,
    clippy::string_slice,
    missing_docs,
    clippy::missing_docs_in_private_items,
    rustdoc::all,
    clippy::float_cmp_const,
    clippy::lossy_float_literal
)]
#![allow(
    clippy::doc_markdown,
    clippy::module_name_repetitions,
    clippy::many_single_char_names,
    clippy::missing_panics_doc,
    clippy::unreadable_literal,
    clippy::wildcard_imports
)]

mod config;
mod error;
mod types;

#[cfg(feature = "pipelines")]
mod api;

pub mod kmeans;

pub use config::*;
pub use error::*;
pub use types::*;

#[cfg(feature = "pipelines")]
pub use api::*;

/// The maximum supported input size in number of pixels is `u32::MAX`.
pub const MAX_PIXELS: u32 = u32::MAX;

/// Shared data helpers for the per-module test suites.
#[cfg(test)]
pub(crate) mod tests {
    use palette::Srgb;
    use rand::{Rng, SeedableRng};
    use rand_xoshiro::Xoroshiro128PlusPlus;

    /// 1024 pseudo-random pixels, identical across runs.
    pub fn test_data_1024() -> Vec<Srgb<u8>> {
        let mut rng = Xoroshiro128PlusPlus::seed_from_u64(42);
        (0..1024)
            .map(|_| Srgb::new(rng.gen(), rng.gen(), rng.gen()))
            .collect()
    }
}
