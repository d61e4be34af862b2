//! Anomaly Evaluation
//!
//! Runs a registered predictor over a benchmark, scores every pixel with the
//! selected method and reports AUPRC and FPR at 95% TPR.
//!
//! ## Usage
//!
//! ```bash
//! # Evaluate with the default MSP scoring
//! cargo run --bin eval_anomaly -- --input "/data/RoadAnomaly/images/*.jpg"
//!
//! # Max entropy with trained weights
//! cargo run --bin eval_anomaly -- --input "/data/fs_static/images/*.jpg" \
//!     --method MaxEntropy --weights head.mpk
//!
//! # Temperature scaled MSP, writing a JSON summary
//! cargo run --bin eval_anomaly -- --input "~/data/LostAndFound/images/*.png" \
//!     --temperature 1.5 --summary summary.json
//! ```

use anomaly_eval::{AnomalyDataset, AnomalyEvaluator, ModelRegistry, ResultsLog};
use anomaly_eval_demos::{
    create_device, get_backend_name, init_tracing, EvalRunConfig, EvaluationSummary,
    SelectedBackend,
};
use anyhow::{Context, Result};
use clap::Parser;
use std::{path::PathBuf, time::Instant};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Glob pattern of the input images
    #[arg(short, long)]
    input: Option<String>,

    /// Scoring method (MSP, MaxLogit, MaxEntropy, Void)
    #[arg(short, long)]
    method: Option<String>,

    /// Softmax temperature; non-zero values override the method
    #[arg(short, long)]
    temperature: Option<f64>,

    /// Target height
    #[arg(long)]
    height: Option<usize>,

    /// Target width
    #[arg(long)]
    width: Option<usize>,

    /// Dataset profile, or "auto" to detect it from the input pattern
    #[arg(long)]
    dataset: Option<String>,

    /// Registered predictor identifier
    #[arg(long)]
    model: Option<String>,

    /// Weights file for the predictor
    #[arg(long)]
    weights: Option<PathBuf>,

    /// Number of in-distribution classes
    #[arg(long)]
    num_classes: Option<usize>,

    /// The predictor has an extra void channel
    #[arg(long)]
    void_channel: bool,

    /// Results log receiving one line per run
    #[arg(long)]
    results: Option<PathBuf>,

    /// Write a JSON summary to this path
    #[arg(long)]
    summary: Option<PathBuf>,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    // Load configuration
    let mut config = EvalRunConfig::load(args.config.as_deref())?;

    // Apply command line overrides
    if let Some(input) = args.input {
        config.input = input;
    }
    if let Some(method) = args.method {
        config.method = method;
    }
    if let Some(temperature) = args.temperature {
        config.temperature = temperature;
    }
    if let Some(height) = args.height {
        config.height = height;
    }
    if let Some(width) = args.width {
        config.width = width;
    }
    if let Some(dataset) = args.dataset {
        config.dataset = dataset;
    }
    if let Some(model) = args.model {
        config.model = model;
    }
    if args.weights.is_some() {
        config.weights = args.weights;
    }
    if let Some(num_classes) = args.num_classes {
        config.num_classes = num_classes;
    }
    config.void_channel |= args.void_channel;
    if let Some(results) = args.results {
        config.results = results;
    }
    if args.summary.is_some() {
        config.summary = args.summary;
    }

    // Validate inputs
    if config.input.is_empty() {
        anyhow::bail!("No input pattern given, use --input or the config file");
    }
    let evaluation = config
        .evaluation_config()
        .context("Invalid evaluation configuration")?;

    let device = create_device();
    tracing::info!(backend = get_backend_name(), "using backend");

    let registry = ModelRegistry::<SelectedBackend>::with_builtin();
    let predictor = registry
        .build(&config.model, &config.predictor_spec(), &device)
        .with_context(|| format!("Failed to build predictor: {}", config.model))?;

    let dataset = AnomalyDataset::discover(&config.input, evaluation.target_size)
        .with_context(|| format!("Failed to discover dataset: {}", config.input))?;

    let mut evaluator = AnomalyEvaluator::new(&evaluation, &predictor)?;
    let start = Instant::now();
    for (index, (image_path, _)) in dataset.items().iter().enumerate() {
        let sample = dataset
            .load::<SelectedBackend>(index, &device)
            .with_context(|| format!("Failed to load sample: {}", image_path.display()))?;
        evaluator
            .process(sample.image, &sample.mask)
            .with_context(|| format!("Failed to evaluate: {}", image_path.display()))?;
    }
    let (record, counts) = evaluator.finish()?;
    tracing::info!(elapsed = ?start.elapsed(), "evaluation complete");

    println!("AUPRC score: {:?}", record.auprc());
    println!("FPR@TPR95: {:?}", record.fpr_at_95_tpr());

    ResultsLog::new(&config.results)
        .append(&record)
        .with_context(|| format!("Failed to append results: {}", config.results.display()))?;

    if let Some(summary_path) = &config.summary {
        EvaluationSummary::new(&evaluation, &config.model, &record, counts).write(summary_path)?;
    }

    Ok(())
}
