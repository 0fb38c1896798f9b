//! CUB-200-2011 Bird Classifier CLI
//!
//! Entry point for the bird classification pipeline: building the label
//! table, training the model, and running local inference. All paths
//! default to the layout the pipeline has always used, so each subcommand
//! runs without flags.

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::info;

use cub_classifier::backend::{backend_name, default_device, DefaultBackend, TrainingBackend};
use cub_classifier::dataset::loader::BirdDataset;
use cub_classifier::dataset::metadata::build_labels_csv;
use cub_classifier::inference::predictor::Predictor;
use cub_classifier::model::config::TrainingConfig;
use cub_classifier::training::{
    run_training, DEFAULT_BATCH_SIZE, DEFAULT_EPOCHS, DEFAULT_LEARNING_RATE,
};
use cub_classifier::utils::logging::{init_logging, LogConfig};

/// CUB-200-2011 Bird Species Classification
///
/// Builds the label table from the CUB metadata files, trains a
/// MobileNet-style CNN with Burn, and classifies bird images against the
/// exported model bundle.
#[derive(Parser, Debug)]
#[command(name = "cub_classifier")]
#[command(version)]
#[command(about = "Bird species classification with Burn", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, default_value = "false")]
    verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Join the CUB metadata files into labels.csv
    BuildDataset {
        /// Dataset root containing images.txt, image_class_labels.txt, classes.txt
        #[arg(short, long, default_value = "data/CUB_200_2011")]
        data_dir: PathBuf,

        /// Output CSV path
        #[arg(short, long, default_value = "model/labels.csv")]
        output: PathBuf,
    },

    /// Train the classifier
    Train {
        /// Path to the joined label table
        #[arg(long, default_value = "model/labels.csv")]
        labels_csv: PathBuf,

        /// Directory containing the dataset images
        #[arg(long, default_value = "data/CUB_200_2011/images")]
        images_dir: PathBuf,

        /// Number of training epochs
        #[arg(short, long, default_value_t = DEFAULT_EPOCHS)]
        epochs: usize,

        /// Batch size for training
        #[arg(short, long, default_value_t = DEFAULT_BATCH_SIZE)]
        batch_size: usize,

        /// Learning rate
        #[arg(short, long, default_value_t = DEFAULT_LEARNING_RATE)]
        learning_rate: f64,

        /// Fraction of samples held out for validation
        #[arg(long, default_value = "0.2")]
        validation_fraction: f64,

        /// Random seed for reproducibility
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Directory for the final model, bundle, and charts
        #[arg(short, long, default_value = "model")]
        output_dir: String,

        /// Directory for per-epoch checkpoints
        #[arg(long, default_value = "model/checkpoints")]
        checkpoint_dir: String,
    },

    /// Run inference on a single image or directory
    Infer {
        /// Path to input image or directory
        #[arg(short, long)]
        input: PathBuf,

        /// Path to the exported model bundle
        #[arg(short, long, default_value = "model/export")]
        bundle: PathBuf,
    },

    /// Show dataset statistics
    Stats {
        /// Path to the joined label table
        #[arg(long, default_value = "model/labels.csv")]
        labels_csv: PathBuf,

        /// Directory containing the dataset images
        #[arg(long, default_value = "data/CUB_200_2011/images")]
        images_dir: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_config = if cli.verbose {
        LogConfig::verbose()
    } else {
        LogConfig::default()
    };
    let _ = init_logging(&log_config);

    match cli.command {
        Commands::BuildDataset { data_dir, output } => {
            cmd_build_dataset(&data_dir, &output)?;
        }

        Commands::Train {
            labels_csv,
            images_dir,
            epochs,
            batch_size,
            learning_rate,
            validation_fraction,
            seed,
            output_dir,
            checkpoint_dir,
        } => {
            let config = TrainingConfig {
                epochs,
                batch_size,
                learning_rate,
                validation_fraction,
                seed,
                output_dir,
                checkpoint_dir,
                ..Default::default()
            };

            println!("{}", "Training Configuration:".cyan().bold());
            println!("  Labels:  {:?}", labels_csv);
            println!("  Images:  {:?}", images_dir);
            println!("  Backend: {}", backend_name());
            println!();

            run_training::<TrainingBackend>(&labels_csv, &images_dir, &config)?;
        }

        Commands::Infer { input, bundle } => {
            cmd_infer(&input, &bundle)?;
        }

        Commands::Stats {
            labels_csv,
            images_dir,
        } => {
            let dataset = BirdDataset::from_labels_csv(&labels_csv, &images_dir)?;
            dataset.get_stats().print();
        }
    }

    Ok(())
}

fn cmd_build_dataset(data_dir: &Path, output: &Path) -> Result<()> {
    info!("Building label table from {:?}", data_dir);

    println!("{}", "Building Dataset...".cyan().bold());
    println!("  Source: {:?}", data_dir);
    println!("  Output: {:?}", output);

    let rows = build_labels_csv(data_dir, output)?;

    println!();
    println!(
        "{} {} rows written to {:?}",
        "Done:".green().bold(),
        rows,
        output
    );

    Ok(())
}

fn cmd_infer(input: &Path, bundle: &Path) -> Result<()> {
    info!("Running inference");
    info!("  Input:  {:?}", input);
    info!("  Bundle: {:?}", bundle);

    println!("{}", "Inference Configuration:".cyan().bold());
    println!("  Input:   {:?}", input);
    println!("  Bundle:  {:?}", bundle);
    println!("  Backend: {}", backend_name());
    println!();

    println!("{}", "Loading model...".cyan());
    let predictor = Predictor::<DefaultBackend>::from_bundle(bundle, default_device())?;

    // Single file or up to 10 images from a directory
    let files: Vec<PathBuf> = if input.is_dir() {
        let mut files: Vec<PathBuf> = std::fs::read_dir(input)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.extension()
                    .and_then(|e| e.to_str())
                    .map(|e| ["jpg", "jpeg", "png"].contains(&e.to_lowercase().as_str()))
                    .unwrap_or(false)
            })
            .collect();
        files.sort();
        files.truncate(10);
        files
    } else {
        vec![input.to_path_buf()]
    };

    if files.is_empty() {
        println!("{} No images found in {:?}", "Error:".red(), input);
        return Ok(());
    }

    println!("{}", "Running inference...".cyan());
    println!();

    for file in &files {
        let result = predictor.predict_file(file)?;
        println!(
            "{}",
            file.file_name().unwrap_or_default().to_string_lossy().bold()
        );
        println!("{}", result.display());
    }

    Ok(())
}
