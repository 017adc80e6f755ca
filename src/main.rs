use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use readmit_io::{DatasetReader, ScoringRequest, TrainingSet, write_json};
use readmit_model::{ScoringService, encode_records, train_artifact};
use readmit_rf::{
    CancellationToken, ClassMetrics, ClassWeight, CrossValidation, CrossValidationResult,
    MaxFeatures, RandomForestConfig,
};

#[derive(Parser)]
#[command(name = "readmit")]
#[command(about = "Thirty-day hospital readmission risk scoring")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// RNG seed for reproducibility
    #[arg(long, default_value_t = 1, global = true)]
    seed: u64,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Number of threads for parallel computation (defaults to all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,
}

/// Random Forest hyperparameters shared by training and evaluation.
#[derive(Args, Debug, Clone)]
struct ForestArgs {
    /// Number of trees in the forest
    #[arg(long, default_value_t = 100)]
    n_trees: usize,

    /// Maximum tree depth (0 = unlimited)
    #[arg(long, default_value_t = 15)]
    max_depth: usize,

    /// Minimum number of samples in each leaf
    #[arg(long, default_value_t = 3)]
    min_samples_leaf: usize,

    /// Features considered per split: "sqrt", "log2", "all", a fraction, or a count
    #[arg(long, default_value = "sqrt")]
    max_features: String,

    /// Class weighting: "balanced" or "none"
    #[arg(long, default_value = "balanced")]
    class_weight: String,
}

#[derive(Subcommand)]
enum Command {
    /// Train a model on the hospital encounter CSV and save the artifact
    Train {
        /// Path to the encounter CSV file
        #[arg(long)]
        data: PathBuf,

        /// Destination of the model artifact
        #[arg(long, default_value = "model/model.bin")]
        model: PathBuf,

        #[command(flatten)]
        forest: ForestArgs,
    },

    /// Estimate model quality with stratified k-fold cross-validation
    Evaluate {
        /// Path to the encounter CSV file
        #[arg(long)]
        data: PathBuf,

        /// Number of cross-validation folds
        #[arg(long, default_value_t = 5)]
        cv_folds: usize,

        /// Decision threshold applied to the positive-class probability
        #[arg(long, default_value_t = readmit_model::DECISION_THRESHOLD)]
        threshold: f64,

        /// Optional path for the full JSON evaluation report
        #[arg(long)]
        report: Option<PathBuf>,

        #[command(flatten)]
        forest: ForestArgs,
    },

    /// Score one patient encounter against a saved model
    Score {
        /// Path to the model artifact
        #[arg(long, default_value = "model/model.bin")]
        model: PathBuf,

        /// Path to the JSON scoring request
        #[arg(long)]
        request: PathBuf,
    },
}

// --- JSON stdout output structs ---

#[derive(Serialize)]
struct TrainOutput {
    model: String,
    n_samples: usize,
    n_positive: usize,
    n_dimensions: usize,
    n_trees: usize,
    class_weights: [f64; 2],
}

#[derive(Serialize)]
struct EvaluateOutput<'a> {
    n_samples: usize,
    n_positive: usize,
    n_dimensions: usize,
    cv_mean_accuracy: f64,
    cv_std_accuracy: f64,
    cv_mean_auc: f64,
    confusion_matrix: &'a [[usize; 2]; 2],
    class_metrics: Vec<ClassMetrics>,
}

#[derive(Serialize)]
struct ScoreOutput {
    readmitted_probability: f64,
    readmitted: bool,
}

fn parse_max_features(s: &str) -> Result<MaxFeatures> {
    match s {
        "sqrt" => Ok(MaxFeatures::Sqrt),
        "log2" => Ok(MaxFeatures::Log2),
        "all" => Ok(MaxFeatures::All),
        other if other.contains('.') => {
            let fraction: f64 = other
                .parse()
                .with_context(|| format!("invalid max_features fraction: {other}"))?;
            if !(fraction > 0.0 && fraction <= 1.0) {
                anyhow::bail!("max_features fraction must be in (0, 1], got {fraction}");
            }
            Ok(MaxFeatures::Fraction(fraction))
        }
        other => other.parse().map(MaxFeatures::Fixed).with_context(|| {
            format!("unknown max_features: {other} (expected sqrt, log2, all, a fraction, or a count)")
        }),
    }
}

fn parse_class_weight(s: &str) -> Result<ClassWeight> {
    match s {
        "balanced" => Ok(ClassWeight::Balanced),
        "none" => Ok(ClassWeight::None),
        other => anyhow::bail!("unknown class weight: {other} (expected balanced or none)"),
    }
}

fn build_config(args: &ForestArgs, seed: u64) -> Result<RandomForestConfig> {
    let max_depth = (args.max_depth > 0).then_some(args.max_depth);
    Ok(RandomForestConfig::new(args.n_trees)?
        .with_max_depth(max_depth)
        .with_min_samples_leaf(args.min_samples_leaf)
        .with_max_features(parse_max_features(&args.max_features)?)
        .with_class_weight(parse_class_weight(&args.class_weight)?)
        .with_seed(seed))
}

fn read_dataset(path: &Path) -> Result<TrainingSet> {
    DatasetReader::new(path)
        .read()
        .context("failed to read encounter CSV")
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure thread pool")?;
        info!(threads, "thread pool configured");
    }

    match cli.command {
        Command::Train {
            data,
            model,
            forest,
        } => {
            let config = build_config(&forest, cli.seed)?;
            let set = read_dataset(&data)?;

            let artifact = train_artifact(
                &set.records,
                &set.labels,
                &config,
                &CancellationToken::new(),
            )
            .context("model training failed")?;

            artifact
                .save(&model)
                .with_context(|| format!("failed to save model to {}", model.display()))?;
            info!(path = %model.display(), "model saved");

            let metadata = artifact.metadata();
            let output = TrainOutput {
                model: model.display().to_string(),
                n_samples: metadata.n_samples,
                n_positive: metadata.n_positive,
                n_dimensions: artifact.schema().len(),
                n_trees: artifact.forest().n_trees(),
                class_weights: metadata.class_weights,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Evaluate {
            data,
            cv_folds,
            threshold,
            report,
            forest,
        } => {
            let config = build_config(&forest, cli.seed)?;
            let set = read_dataset(&data)?;

            let encoded = encode_records(&set.records).context("feature encoding failed")?;
            let cv = CrossValidation::new(cv_folds)?
                .with_seed(cli.seed)
                .with_threshold(threshold);
            let result: CrossValidationResult = cv
                .evaluate(&config, &encoded.vectors, &set.labels, &encoded.kinds)
                .context("cross-validation failed")?;
            info!(
                mean_accuracy = result.mean_accuracy,
                std_accuracy = result.std_accuracy,
                mean_auc = result.mean_auc,
                "cross-validation complete"
            );

            if let Some(path) = report {
                write_json(&path, &result).context("failed to write evaluation report")?;
            }

            let output = EvaluateOutput {
                n_samples: result.n_samples,
                n_positive: set.n_positive(),
                n_dimensions: result.n_features,
                cv_mean_accuracy: result.mean_accuracy,
                cv_std_accuracy: result.std_accuracy,
                cv_mean_auc: result.mean_auc,
                confusion_matrix: result.confusion_matrix.as_rows(),
                class_metrics: result.confusion_matrix.class_metrics(),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Score { model, request } => {
            let service = ScoringService::from_path(&model)
                .with_context(|| format!("failed to load model from {}", model.display()))?;

            let json = std::fs::read_to_string(&request)
                .with_context(|| format!("failed to read request {}", request.display()))?;
            let record = ScoringRequest::from_json(&json)?
                .into_record()
                .context("invalid scoring request")?;

            let score = service.score(&record).context("scoring failed")?;
            info!(
                probability = score.probability,
                decision = score.decision,
                "request scored"
            );

            let output = ScoreOutput {
                readmitted_probability: score.probability,
                readmitted: score.decision,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
