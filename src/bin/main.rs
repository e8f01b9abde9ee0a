//! FTRL Command Line Interface
//!
//! A command-line interface for training, evaluating, and using FTRL-Proximal
//! models on binary indicator datasets.

use clap::{Args, Parser, Subcommand, ValueEnum};
use env_logger::Env;
use ftrl::api::{EvaluationMetrics, FtrlProximal};
use ftrl::persistence;
use ftrl::utils::{stats, validation};
use ftrl::{BinaryDataset, Dataset, FtrlParams, ModelType, Result, Shuffle};
use log::{error, info, warn};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;

#[derive(Parser)]
#[command(name = "ftrl")]
#[command(about = "A Rust implementation of FTRL-Proximal")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = "FTRL Contributors")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a new model
    Train(TrainArgs),
    /// Make predictions using a trained model
    Predict(PredictArgs),
    /// Evaluate a model on test data
    Evaluate(EvaluateArgs),
    /// Display model information
    Info(InfoArgs),
}

#[derive(Args)]
struct TrainArgs {
    /// Training data file
    #[arg(long)]
    data: PathBuf,

    /// Output model file
    #[arg(short, long)]
    output: PathBuf,

    /// Learning-rate scale
    #[arg(long, default_value = "1.0")]
    alpha: f32,

    /// Learning-rate smoothing constant
    #[arg(long, default_value = "1.0")]
    beta: f32,

    /// L1 regularization strength
    #[arg(long, default_value = "0.0")]
    l1: f32,

    /// L2 regularization strength
    #[arg(long, default_value = "0.0")]
    l2: f32,

    /// Task type
    #[arg(long, default_value = "classification")]
    model_type: CliModelType,

    /// Number of passes over the data
    #[arg(short, long, default_value = "1")]
    passes: usize,

    /// Shuffle rows before each pass using this seed
    #[arg(long)]
    seed: Option<u64>,

    /// Keep the intercept fixed at zero
    #[arg(long)]
    no_intercept: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum CliModelType {
    /// Logistic output, log loss
    #[value(name = "classification")]
    Classification,
    /// Linear output, squared error
    #[value(name = "regression")]
    Regression,
}

impl From<CliModelType> for ModelType {
    fn from(cli_type: CliModelType) -> Self {
        match cli_type {
            CliModelType::Classification => ModelType::Classification,
            CliModelType::Regression => ModelType::Regression,
        }
    }
}

#[derive(Args)]
struct PredictArgs {
    /// Trained model file
    #[arg(short, long)]
    model: PathBuf,

    /// Input data file
    #[arg(long)]
    data: PathBuf,

    /// Output predictions file (optional, prints to stdout if not specified)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct EvaluateArgs {
    /// Trained model file
    #[arg(short, long)]
    model: PathBuf,

    /// Test data file
    #[arg(long)]
    data: PathBuf,
}

#[derive(Args)]
struct InfoArgs {
    /// Model file
    model: PathBuf,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,
}

/// JSON view of a stored model
#[derive(Serialize)]
struct ModelSummary {
    header: persistence::ModelHeader,
    saved_at: Option<String>,
    nonzero_weights: usize,
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else {
        "warn"
    };

    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    let result = match cli.command {
        Commands::Train(args) => train_command(args),
        Commands::Predict(args) => predict_command(args),
        Commands::Evaluate(args) => evaluate_command(args),
        Commands::Info(args) => info_command(args),
    };

    if let Err(e) = result {
        error!("Error: {e}");
        process::exit(1);
    }
}

fn train_command(args: TrainArgs) -> Result<()> {
    info!("Training FTRL model...");
    info!("Data file: {:?}", args.data);
    info!(
        "Parameters: alpha={}, beta={}, l1={}, l2={}, passes={}",
        args.alpha, args.beta, args.l1, args.l2, args.passes
    );

    let params = FtrlParams::new(
        args.alpha,
        args.beta,
        args.l1,
        args.l2,
        args.model_type.into(),
    )?;

    let dataset = BinaryDataset::from_file(&args.data)?;
    let matrix_stats = stats::matrix_stats(dataset.matrix());
    info!(
        "Loaded {} examples with {} features ({} active entries, {:.2} per row)",
        matrix_stats.num_rows, matrix_stats.num_columns, matrix_stats.nnz, matrix_stats.mean_nnz
    );

    if params.model_type() == ModelType::Classification {
        let (positive, negative, _) = validation::check_label_balance(dataset.labels());
        info!("Label balance: {positive} positive, {negative} negative");
        if positive == 0 || negative == 0 {
            warn!("Training data contains a single class");
        }
    }

    let shuffle = match args.seed {
        Some(seed) => Shuffle::Seeded(seed),
        None => Shuffle::None,
    };
    let mut model = FtrlProximal::new(params)
        .with_fit_intercept(!args.no_intercept)
        .with_shuffle(shuffle);

    let report = model.fit_report(dataset.matrix(), dataset.labels(), args.passes)?;
    for (pass, loss) in report.pass_losses.iter().enumerate() {
        info!("Pass {}: mean loss {:.6}", pass + 1, loss);
    }
    info!("Training completed successfully");

    model.save(&args.output)?;
    info!("Model saved to: {:?}", args.output);

    let metrics = model.evaluate(&dataset)?;
    print_metrics(&metrics);

    Ok(())
}

/// Load a dataset, warning when it uses more columns than the model knows
fn load_for_model(model: &FtrlProximal, path: &Path) -> Result<BinaryDataset> {
    let dataset = BinaryDataset::from_file(path)?;
    let num_features = model.state().map_or(0, |s| s.num_features());
    if dataset.dim() > num_features {
        warn!(
            "Data has {} feature columns but the model was trained with {}",
            dataset.dim(),
            num_features
        );
    }
    Ok(dataset)
}

fn predict_command(args: PredictArgs) -> Result<()> {
    info!("Loading model from: {:?}", args.model);
    let model = FtrlProximal::load(&args.model)?;

    info!("Loading prediction data from: {:?}", args.data);
    let dataset = load_for_model(&model, &args.data)?;
    let predictions = model.predict(dataset.matrix())?;

    if let Some(output_path) = args.output {
        let file = File::create(&output_path)?;
        let mut writer = BufWriter::new(file);
        for p in &predictions {
            writeln!(writer, "{p:.6}")?;
        }
        writer.flush()?;
        info!("Predictions saved to: {output_path:?}");
    } else {
        for p in &predictions {
            println!("{p:.6}");
        }
    }

    Ok(())
}

fn evaluate_command(args: EvaluateArgs) -> Result<()> {
    info!("Loading model from: {:?}", args.model);
    let (header, model) = FtrlProximal::load_with_header(&args.model)?;

    info!("Loading test data from: {:?}", args.data);
    let dataset = load_for_model(&model, &args.data)?;
    let metrics = model.evaluate(&dataset)?;

    println!("=== Model Evaluation ===");
    header.print_summary();
    println!();
    print_metrics(&metrics);

    Ok(())
}

fn print_metrics(metrics: &EvaluationMetrics) {
    println!("Results on {} examples:", metrics.num_examples);
    match metrics.model_type {
        ModelType::Classification => println!("  Log Loss: {:.6}", metrics.mean_loss),
        ModelType::Regression => println!("  MSE:      {:.6}", metrics.mean_loss),
    }
    if let Some(accuracy) = metrics.accuracy {
        println!("  Accuracy: {:.2}%", accuracy * 100.0);
    }
    if let Some(auc) = metrics.auc {
        println!("  AUC:      {auc:.4}");
    }
    if let Some(rmse) = metrics.rmse {
        println!("  RMSE:     {rmse:.6}");
    }
}

fn info_command(args: InfoArgs) -> Result<()> {
    info!("Loading model from: {:?}", args.model);
    let (header, model) = FtrlProximal::load_with_header(&args.model)?;
    let (intercept, weights) = model.weights()?;
    let nonzero_weights = weights.iter().filter(|&&w| w != 0.0).count();

    if args.json {
        let summary = ModelSummary {
            header,
            saved_at: header.saved_at().map(|ts| ts.to_rfc3339()),
            nonzero_weights,
        };
        let json = serde_json::to_string_pretty(&summary)
            .map_err(|e| ftrl::FtrlError::InvalidParameter(e.to_string()))?;
        println!("{json}");
        return Ok(());
    }

    header.print_summary();

    println!("\nWeights:");
    println!("  Intercept: {intercept:.6}");
    println!("  Non-zero: {} of {}", nonzero_weights, weights.len());

    let mut ranked: Vec<(usize, f32)> = weights
        .iter()
        .copied()
        .enumerate()
        .filter(|&(_, w)| w != 0.0)
        .collect();
    ranked.sort_by(|a, b| b.1.abs().total_cmp(&a.1.abs()));

    let n_show = ranked.len().min(10);
    for &(i, w) in &ranked[..n_show] {
        println!("  w[{i}]: {w:.6}");
    }
    if ranked.len() > n_show {
        println!("  ... ({} more)", ranked.len() - n_show);
    }

    Ok(())
}
