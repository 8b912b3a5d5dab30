#![deny(unsafe_code)]
#![warn(
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::todo,
    clippy::unimplemented,
    clippy::unneeded_field_pattern,
    clippy::rest_pat_in_fully_bound_structs,
    clippy::unnecessary_self_imports,
    clippy::str_to_string,
    clippy::string_to_string,
    clippy::string_slice
)]

use std::{error::Error, path::PathBuf};

use clap::Parser;
use palettize::PalettePipeline;

#[derive(Parser)]
#[command(about = "Print the dominant colors of an image as hex strings")]
struct Options {
    /// Path of the image to extract a palette from.
    input: PathBuf,

    /// Number of palette entries to print.
    #[arg(short, long, default_value_t = 5)]
    colors: u16,

    /// Number of clusters to form; defaults to the number of colors.
    #[arg(long)]
    clusters: Option<u16>,

    /// Convergence threshold in RGB channel units.
    #[arg(long, default_value_t = 1.0)]
    similarity: f32,

    /// Seed for the random number generator.
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Print per-iteration convergence progress to stderr.
    #[arg(long)]
    verbose: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    let options = Options::parse();

    let img = image::open(&options.input)?.into_rgb8();

    let mut pipeline = PalettePipeline::try_from(&img)?
        .colors(options.colors)
        .similarity(options.similarity)
        .seed(options.seed)
        .verbose(options.verbose);
    if let Some(clusters) = options.clusters {
        pipeline = pipeline.clusters(clusters);
    }

    let output = pipeline.output()?;

    if let Some(trace) = &output.trace {
        eprintln!("seeded {} centers", trace.seeds.len());
        for (i, step) in trace.steps.iter().enumerate() {
            eprintln!("iteration {}: max drift {}", i + 1, step.max_drift);
        }
    }

    for (hex, count) in output.palette_hex().iter().zip(&output.counts) {
        println!("{hex} ({count} pixels)");
    }

    Ok(())
}
