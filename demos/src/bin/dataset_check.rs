//! Dataset Check
//!
//! Discovers a benchmark, resolves every ground-truth mask and reports how the
//! masks normalize, without running a model. Useful to see which images an
//! evaluation would drop before spending time on inference.
//!
//! ## Usage
//!
//! ```bash
//! # Check a dataset with profile detection
//! cargo run --bin dataset_check -- --input "/data/RoadAnomaly/images/*.jpg"
//!
//! # Force a profile and inspect more samples
//! cargo run --bin dataset_check -- --input "/data/lf/images/*.png" \
//!     --dataset LostAndFound --num-samples 20
//! ```

use std::collections::BTreeMap;

use anomaly_eval::{
    dataset::load_raw_mask, AnomalyDataset, LabelNormalizer, IGNORE, IN_DISTRIBUTION,
    OUT_OF_DISTRIBUTION,
};
use anomaly_eval_demos::{
    create_device, get_backend_name, init_tracing, EvalRunConfig, SelectedBackend, AUTO_PROFILE,
};
use anyhow::{Context, Result};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Glob pattern of the input images
    #[arg(short, long)]
    input: String,

    /// Dataset profile, or "auto" to detect it from the input pattern
    #[arg(long, default_value = AUTO_PROFILE)]
    dataset: String,

    /// Target height
    #[arg(long, default_value = "512")]
    height: usize,

    /// Target width
    #[arg(long, default_value = "1024")]
    width: usize,

    /// Number of samples whose images are decoded and inspected
    #[arg(long, default_value = "5")]
    num_samples: usize,
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let config = EvalRunConfig {
        input: args.input,
        dataset: args.dataset,
        height: args.height,
        width: args.width,
        ..EvalRunConfig::default()
    };
    let evaluation = config.evaluation_config()?;
    let normalizer = LabelNormalizer::for_profile(&evaluation.profile);

    let device = create_device();
    println!("Using backend: {}", get_backend_name());
    println!("Profile: {}", evaluation.profile.as_str());

    let dataset = AnomalyDataset::discover(&config.input, evaluation.target_size)
        .with_context(|| format!("Failed to discover dataset: {}", config.input))?;
    println!("Found {} image/mask pairs", dataset.len());

    println!("\n=== Inspecting Samples ===");
    for index in 0..args.num_samples.min(dataset.len()) {
        let sample = dataset.load::<SelectedBackend>(index, &device)?;
        let min = sample.image.clone().min().into_scalar();
        let max = sample.image.clone().max().into_scalar();
        println!("Sample {index}: {}", sample.path.display());
        println!("  Image shape: {:?}, range [{min:.4}, {max:.4}]", sample.image.dims());
        println!("  Raw labels: {:?}", histogram(sample.mask.labels()));
    }

    println!("\n=== Normalizing Masks ===");
    let mut accepted = 0;
    let mut totals: BTreeMap<&str, usize> = BTreeMap::new();
    for (_, mask_path) in dataset.items() {
        let raw = load_raw_mask(mask_path, evaluation.target_size)?;
        let mask = normalizer.normalize(&raw);
        if mask.has_ood() {
            accepted += 1;
        } else {
            println!("  dropped (no anomaly pixels): {}", mask_path.display());
        }

        for &label in mask.labels() {
            let class = match label {
                IN_DISTRIBUTION => "in-distribution",
                OUT_OF_DISTRIBUTION => "out-of-distribution",
                IGNORE => "ignored",
                _ => "unresolved",
            };
            *totals.entry(class).or_default() += 1;
        }
    }

    println!("Images accepted: {accepted}/{}", dataset.len());
    for (class, count) in &totals {
        println!("  {class}: {count} pixels");
    }

    println!("Dataset check completed successfully!");
    Ok(())
}

/// Distinct label values with their pixel counts.
fn histogram(labels: &[u8]) -> BTreeMap<u8, usize> {
    let mut counts = BTreeMap::new();
    for &label in labels {
        *counts.entry(label).or_default() += 1;
    }
    counts
}
