//! DiabRisk prediction CLI
//!
//! Loads a model bundle and scores one or more JSON records, printing one
//! JSON response per record.

use anyhow::{bail, Context, Result};
use clap::Parser;
use diabrisk_core::predictor::ErrorResponse;
use diabrisk_core::{CategoryPolicy, DiabetesPredictor, PredictorConfig, RawRecord};
use std::io::Read;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "diabrisk-predict")]
#[command(author = "DiabRisk Contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Score health records against a diabetes risk model bundle", long_about = None)]
struct Args {
    /// Predictor configuration (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bundle path, overriding the configuration
    #[arg(short, long)]
    bundle: Option<PathBuf>,

    /// A single record as inline JSON
    #[arg(short, long, conflicts_with = "input")]
    record: Option<String>,

    /// File holding one JSON record or an array of records (stdin if absent)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Map unknown categories to their fallback instead of rejecting them
    #[arg(long)]
    lenient: bool,

    /// Include health advice with each prediction
    #[arg(long)]
    advice: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    let mut config = match &args.config {
        Some(path) => PredictorConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => PredictorConfig::default(),
    };
    config
        .apply_env_overrides()
        .context("Invalid environment override")?;
    if let Some(bundle) = args.bundle {
        config.bundle_path = bundle;
    }
    if args.lenient {
        config.category_policy = CategoryPolicy::Lenient;
    }

    info!("DiabRisk predictor v{}", env!("CARGO_PKG_VERSION"));
    let predictor = DiabetesPredictor::new(config);
    predictor.load().context("Failed to load model bundle")?;

    let raw = match (&args.record, &args.input) {
        (Some(inline), _) => inline.clone(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        (None, None) => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read records from stdin")?;
            buf
        }
    };

    let records = parse_records(&raw)?;
    info!("Scoring {} record(s)", records.len());

    for record in &records {
        let line = if args.advice {
            match predictor.assess(record) {
                Ok(assessment) => serde_json::to_string(&assessment)?,
                Err(e) => serde_json::to_string(&ErrorResponse::from(e))?,
            }
        } else {
            serde_json::to_string(&predictor.predict_diabetes(record))?
        };
        println!("{line}");
    }

    Ok(())
}

fn parse_records(raw: &str) -> Result<Vec<RawRecord>> {
    let value: serde_json::Value =
        serde_json::from_str(raw).context("Input is not valid JSON")?;

    match value {
        serde_json::Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(i, item)| {
                serde_json::from_value(item).with_context(|| format!("Record {i} is not an object"))
            })
            .collect(),
        serde_json::Value::Object(_) => {
            Ok(vec![serde_json::from_value(value).context("Record is not an object")?])
        }
        _ => bail!("Expected a JSON object or an array of objects"),
    }
}
