//! DiabRisk Trainer CLI
//!
//! Deterministic offline trainer producing diabetes risk model bundles.

use anyhow::{Context, Result};
use clap::Parser;
use diabrisk_trainer::{train_bundle_from_csv, ForestConfig, TrainingParams};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "diabrisk-train")]
#[command(author = "DiabRisk Contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Deterministic random-forest trainer for diabetes risk bundles", long_about = None)]
struct Args {
    /// Input CSV dataset (header row required, `diabetes` is the label)
    #[arg(short, long)]
    input: PathBuf,

    /// Output bundle path
    #[arg(short, long, default_value = "models/diabetes_bundle.json")]
    output: PathBuf,

    /// Number of trees
    #[arg(long, default_value = "100")]
    trees: usize,

    /// Maximum tree depth
    #[arg(long, default_value = "10")]
    max_depth: usize,

    /// Minimum samples required to split a node
    #[arg(long, default_value = "5")]
    min_samples_split: usize,

    /// Minimum samples per leaf
    #[arg(long, default_value = "2")]
    min_samples_leaf: usize,

    /// Held-out fraction for evaluation
    #[arg(long, default_value = "0.2")]
    test_size: f64,

    /// Random seed for split, bootstrap and feature sampling
    #[arg(long, default_value = "42")]
    seed: i64,

    /// Weight classes inversely to their frequency
    #[arg(long)]
    balanced_class_weight: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Setup logging
    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    info!("DiabRisk Random-Forest Trainer v{}", env!("CARGO_PKG_VERSION"));
    info!("═══════════════════════════════════════════");

    let params = TrainingParams {
        forest: ForestConfig {
            num_trees: args.trees,
            max_depth: args.max_depth,
            min_samples_split: args.min_samples_split,
            min_samples_leaf: args.min_samples_leaf,
            balanced_class_weight: args.balanced_class_weight,
            seed: args.seed,
        },
        test_size: args.test_size,
    };

    info!("Training configuration:");
    info!("  Trees: {}", params.forest.num_trees);
    info!("  Max depth: {}", params.forest.max_depth);
    info!("  Min samples split: {}", params.forest.min_samples_split);
    info!("  Min samples per leaf: {}", params.forest.min_samples_leaf);
    info!("  Balanced class weight: {}", params.forest.balanced_class_weight);
    info!("  Test size: {}", params.test_size);
    info!("  Seed: {}", params.forest.seed);

    info!("Loading dataset from: {}", args.input.display());
    let (bundle, report) =
        train_bundle_from_csv(&args.input, &params).context("Training failed")?;

    info!("═══════════════════════════════════════════");
    info!(
        "Samples: {} ({} negative, {} positive)",
        report.samples, report.class_counts[0], report.class_counts[1]
    );
    info!("Training medians (zeros excluded):");
    for (name, median) in &report.training_medians {
        info!("  {}: {}", name, median);
    }
    info!("Held-out evaluation:");
    info!("  Accuracy: {:.4}", report.metrics.accuracy);
    match report.metrics.roc_auc {
        Some(auc) => info!("  ROC AUC: {:.4}", auc),
        None => info!("  ROC AUC: n/a (single class in test split)"),
    }
    info!("Feature importances:");
    let mut importances: Vec<_> = report.feature_importances.iter().collect();
    importances.sort_by(|a, b| b.1.total_cmp(a.1));
    for (name, importance) in importances {
        info!("  {}: {:.4}", name, importance);
    }

    info!("Saving bundle to: {}", args.output.display());
    bundle
        .save(&args.output)
        .context("Failed to write model bundle")?;

    info!("═══════════════════════════════════════════");
    info!("✓ Training completed successfully");
    info!("  Bundle: {}", args.output.display());
    info!("  Classifier hash: {}", bundle.metadata().classifier_hash);

    Ok(())
}
