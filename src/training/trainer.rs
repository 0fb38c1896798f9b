//! Supervised Training Loop
//!
//! Implements training with Burn's API directly: a custom epoch loop with
//! Adam and cross-entropy rather than the high-level LearnerBuilder. Each
//! epoch is checkpointed, and two policies watch the validation loss:
//! learning-rate reduction on plateau and early stopping with best-weight
//! restore.

use std::path::{Path, PathBuf};

use anyhow::Result;
use burn::{
    data::dataloader::batcher::Batcher,
    data::dataset::Dataset,
    module::{AutodiffModule, Module},
    nn::loss::CrossEntropyLossConfig,
    optim::{AdamConfig, GradientsParams, Optimizer},
    record::CompactRecorder,
    tensor::{
        backend::{AutodiffBackend, Backend},
        ElementConversion, Int, Tensor,
    },
};
use colored::Colorize;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::dataset::burn_dataset::{BirdBatch, BirdBatcher, BirdImageDataset};
use crate::dataset::loader::BirdDataset;
use crate::dataset::split::{SplitConfig, TrainValSplit};
use crate::model::bundle;
use crate::model::cnn::{BirdNet, BirdNetConfig};
use crate::model::config::TrainingConfig;
use crate::utils::charts::{generate_line_chart, DataPoint, DataSeries};
use crate::IMAGE_SIZE;

/// Per-epoch metric history
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrainingHistory {
    pub train_loss: Vec<f64>,
    pub train_accuracy: Vec<f64>,
    pub val_loss: Vec<f64>,
    pub val_accuracy: Vec<f64>,
}

impl TrainingHistory {
    /// Number of completed epochs
    pub fn epochs(&self) -> usize {
        self.val_loss.len()
    }
}

/// Training state for checkpointing and the validation-loss policies
#[derive(Debug, Clone)]
pub struct TrainingState {
    /// Current epoch (0-indexed)
    pub epoch: usize,
    /// Best validation loss seen so far
    pub best_val_loss: f64,
    /// Epoch that produced the best validation loss
    pub best_epoch: usize,
    /// Epochs since the validation loss last improved
    pub epochs_without_improvement: usize,
    /// Current learning rate
    pub current_lr: f64,
    /// Metric history
    pub history: TrainingHistory,
    /// Epochs since the last learning-rate reduction or improvement
    lr_wait: usize,
}

impl TrainingState {
    /// Create a new training state with an initial learning rate
    pub fn new(initial_lr: f64) -> Self {
        Self {
            epoch: 0,
            best_val_loss: f64::INFINITY,
            best_epoch: 0,
            epochs_without_improvement: 0,
            current_lr: initial_lr,
            history: TrainingHistory::default(),
            lr_wait: 0,
        }
    }

    /// Record one epoch of metrics
    pub fn record_epoch(&mut self, train_loss: f64, train_acc: f64, val_loss: f64, val_acc: f64) {
        self.history.train_loss.push(train_loss);
        self.history.train_accuracy.push(train_acc);
        self.history.val_loss.push(val_loss);
        self.history.val_accuracy.push(val_acc);
    }

    /// Feed the epoch's validation loss into the plateau policies.
    ///
    /// Returns true when the loss improved. On a plateau the learning rate
    /// is multiplied by `lr_factor` once every `lr_patience` stale epochs.
    pub fn observe_val_loss(&mut self, val_loss: f64, lr_patience: usize, lr_factor: f64) -> bool {
        if val_loss < self.best_val_loss {
            self.best_val_loss = val_loss;
            self.best_epoch = self.epoch;
            self.epochs_without_improvement = 0;
            self.lr_wait = 0;
            return true;
        }

        self.epochs_without_improvement += 1;
        self.lr_wait += 1;

        if self.lr_wait >= lr_patience {
            let old_lr = self.current_lr;
            self.current_lr *= lr_factor;
            self.lr_wait = 0;
            info!(
                "Validation loss plateaued, reducing learning rate: {:.6} -> {:.6}",
                old_lr, self.current_lr
            );
        }

        false
    }

    /// Check whether early stopping should trigger
    pub fn should_early_stop(&self, patience: usize) -> bool {
        self.epochs_without_improvement >= patience
    }

    /// Advance to the next epoch
    pub fn next_epoch(&mut self) {
        self.epoch += 1;
    }
}

/// Checkpoint path for a given epoch, named after the original artifacts
fn checkpoint_path(dir: &Path, epoch: usize) -> PathBuf {
    dir.join(format!("bird_classifier_epoch_{:02}", epoch + 1))
}

/// Count correct predictions in a batch
fn count_correct<B: Backend>(output: Tensor<B, 2>, targets: Tensor<B, 1, Int>) -> usize {
    let batch_size = targets.dims()[0];
    let predictions = output.argmax(1);
    let targets = targets.reshape([batch_size, 1]);
    let correct: i64 = predictions.equal(targets).int().sum().into_scalar().elem();
    correct as usize
}

/// Evaluate the model on a dataset, returning (loss, accuracy).
///
/// Runs on the inner (non-autodiff) backend.
fn evaluate<B: AutodiffBackend>(
    model: &BirdNet<B>,
    dataset: &BirdImageDataset,
    batcher: &BirdBatcher,
    batch_size: usize,
) -> Result<(f64, f64)> {
    let device = <B::InnerBackend as Backend>::Device::default();
    let model = model.valid();

    let len = dataset.len();
    let mut total_loss = 0.0;
    let mut num_batches = 0usize;
    let mut correct = 0usize;
    let mut total = 0usize;

    for start in (0..len).step_by(batch_size) {
        let end = (start + batch_size).min(len);
        let items = (start..end)
            .map(|i| dataset.try_item(i))
            .collect::<crate::Result<Vec<_>>>()?;

        let batch: BirdBatch<B::InnerBackend> = batcher.batch(items, &device);
        let output = model.forward(batch.images);

        let loss = CrossEntropyLossConfig::new()
            .init(&device)
            .forward(output.clone(), batch.targets.clone());
        total_loss += loss.into_scalar().elem::<f64>();
        num_batches += 1;

        correct += count_correct(output, batch.targets);
        total += end - start;
    }

    let avg_loss = total_loss / num_batches.max(1) as f64;
    let accuracy = correct as f64 / total.max(1) as f64;

    Ok((avg_loss, accuracy))
}

/// Render the accuracy and loss curves as SVG charts
fn write_training_charts(history: &TrainingHistory, output_dir: &Path) -> std::io::Result<()> {
    let epochs = |values: &[f64]| -> Vec<DataPoint> {
        values
            .iter()
            .enumerate()
            .map(|(i, &y)| DataPoint {
                x: (i + 1) as f64,
                y,
            })
            .collect()
    };

    let accuracy_series = vec![
        DataSeries {
            name: "Train Acc".to_string(),
            points: epochs(
                &history
                    .train_accuracy
                    .iter()
                    .map(|a| a * 100.0)
                    .collect::<Vec<_>>(),
            ),
            color: "#3498db".to_string(),
        },
        DataSeries {
            name: "Val Acc".to_string(),
            points: epochs(
                &history
                    .val_accuracy
                    .iter()
                    .map(|a| a * 100.0)
                    .collect::<Vec<_>>(),
            ),
            color: "#2ecc71".to_string(),
        },
    ];
    generate_line_chart(
        "Accuracy",
        "Epoch",
        "Accuracy",
        &accuracy_series,
        true,
        &output_dir.join("training_accuracy.svg"),
    )?;

    let loss_series = vec![
        DataSeries {
            name: "Train Loss".to_string(),
            points: epochs(&history.train_loss),
            color: "#3498db".to_string(),
        },
        DataSeries {
            name: "Val Loss".to_string(),
            points: epochs(&history.val_loss),
            color: "#e74c3c".to_string(),
        },
    ];
    generate_line_chart(
        "Loss",
        "Epoch",
        "Loss",
        &loss_series,
        false,
        &output_dir.join("training_loss.svg"),
    )
}

/// Run a full training job: load the CSV-backed dataset, split it, train
/// the model, and write the checkpoints, final model, portable bundle, and
/// metric charts.
pub fn run_training<B: AutodiffBackend>(
    labels_csv: &Path,
    images_dir: &Path,
    config: &TrainingConfig,
) -> Result<TrainingHistory> {
    config.validate()?;

    println!("{}", "Initializing Training...".green().bold());

    let device = B::Device::default();
    let checkpoint_dir = Path::new(&config.checkpoint_dir);
    let output_dir = Path::new(&config.output_dir);
    std::fs::create_dir_all(checkpoint_dir)?;
    std::fs::create_dir_all(output_dir)?;

    // Load the dataset and derive the species vocabulary from the CSV
    println!("{}", "Loading Dataset...".cyan());
    let dataset = BirdDataset::from_labels_csv(labels_csv, images_dir)?;
    let stats = dataset.get_stats();
    let vocab = dataset.vocab.clone();
    let num_classes = vocab.len();

    println!("  Samples: {}", stats.total_samples);
    println!("  Species: {}", stats.num_species);

    let split = TrainValSplit::from_dataset(
        &dataset,
        &SplitConfig {
            validation_fraction: config.validation_fraction,
            seed: config.seed,
        },
    )?;

    if split.train.len() < config.batch_size {
        anyhow::bail!(
            "not enough training samples ({}) for batch size {}",
            split.train.len(),
            config.batch_size
        );
    }

    println!();
    println!("{}", "Dataset Splits:".cyan().bold());
    println!("  Training samples:   {}", split.train.len());
    println!("  Validation samples: {}", split.validation.len());

    let train_dataset = BirdImageDataset::new(split.train, IMAGE_SIZE);
    let val_dataset = BirdImageDataset::new(split.validation, IMAGE_SIZE);
    let batcher = BirdBatcher::new(IMAGE_SIZE);

    // Model and optimizer
    println!();
    println!("{}", "Creating Model...".cyan());
    let model_config = BirdNetConfig::new().with_num_classes(num_classes);
    let mut model = BirdNet::<B>::new(&model_config, &device);
    let mut optimizer = AdamConfig::new().init();
    let mut state = TrainingState::new(config.learning_rate);

    println!();
    println!("{}", "Training Configuration:".cyan().bold());
    println!("  Epochs:        {}", config.epochs);
    println!("  Batch size:    {}", config.batch_size);
    println!("  Learning rate: {}", config.learning_rate);
    println!("  Species:       {}", num_classes);
    println!();

    info!(
        "Starting training: {} epochs, {} train / {} val samples",
        config.epochs,
        train_dataset.len(),
        val_dataset.len()
    );

    let mut epoch_rng = ChaCha8Rng::seed_from_u64(config.seed);

    for epoch in 0..config.epochs {
        println!(
            "{}",
            format!("Epoch {}/{}", epoch + 1, config.epochs).yellow().bold()
        );

        let mut epoch_loss = 0.0f64;
        let mut correct = 0usize;
        let mut seen = 0usize;

        let mut indices: Vec<usize> = (0..train_dataset.len()).collect();
        indices.shuffle(&mut epoch_rng);
        let num_batches = indices.len().div_ceil(config.batch_size);

        for batch_idx in 0..num_batches {
            let start = batch_idx * config.batch_size;
            let end = (start + config.batch_size).min(indices.len());

            // Any decode failure aborts the whole run
            let items = indices[start..end]
                .iter()
                .map(|&i| train_dataset.try_item(i))
                .collect::<crate::Result<Vec<_>>>()?;

            let batch: BirdBatch<B> = batcher.batch(items, &device);

            let output = model.forward(batch.images.clone());
            let loss = CrossEntropyLossConfig::new()
                .init(&device)
                .forward(output.clone(), batch.targets.clone());

            let loss_value: f64 = loss.clone().into_scalar().elem();
            epoch_loss += loss_value;
            correct += count_correct(output, batch.targets.clone());
            seen += batch.targets.dims()[0];

            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optimizer.step(state.current_lr, model, grads);

            if (batch_idx + 1) % 50 == 0 || batch_idx == num_batches - 1 {
                println!(
                    "  Batch {:>4}/{}: loss = {:.4}, acc = {:.2}%",
                    batch_idx + 1,
                    num_batches,
                    loss_value,
                    100.0 * correct as f64 / seen as f64
                );
            }
        }

        let train_loss = epoch_loss / num_batches.max(1) as f64;
        let train_acc = correct as f64 / seen.max(1) as f64;

        let (val_loss, val_acc) = evaluate(&model, &val_dataset, &batcher, config.batch_size)?;
        state.record_epoch(train_loss, train_acc, val_loss, val_acc);

        // Checkpoint every epoch
        let ckpt = checkpoint_path(checkpoint_dir, epoch);
        model
            .clone()
            .save_file(&ckpt, &CompactRecorder::new())
            .map_err(|e| anyhow::anyhow!("failed to save checkpoint: {:?}", e))?;

        let improved = state.observe_val_loss(val_loss, config.lr_reduce_patience, config.lr_reduce_factor);

        println!(
            "  {} Loss: {:.4} | Train Acc: {:.2}% | Val Loss: {:.4} | Val Acc: {:.2}%{}",
            "→".cyan(),
            train_loss,
            train_acc * 100.0,
            val_loss,
            val_acc * 100.0,
            if improved {
                " (best)".green().to_string()
            } else {
                String::new()
            }
        );
        println!();

        info!(
            "Epoch {}/{}: train_loss = {:.4}, val_loss = {:.4}, val_acc = {:.2}%, lr = {:.6}",
            epoch + 1,
            config.epochs,
            train_loss,
            val_loss,
            val_acc * 100.0,
            state.current_lr
        );

        if state.should_early_stop(config.early_stopping_patience) {
            warn!(
                "Early stopping after {} epochs without validation-loss improvement",
                config.early_stopping_patience
            );
            println!(
                "{}",
                format!(
                    "Early stopping triggered (no improvement for {} epochs)",
                    config.early_stopping_patience
                )
                .yellow()
            );
            break;
        }

        state.next_epoch();
    }

    // Restore the best epoch's weights before the final save
    let best_ckpt = checkpoint_path(checkpoint_dir, state.best_epoch);
    info!(
        "Restoring best weights from epoch {} (val_loss = {:.4})",
        state.best_epoch + 1,
        state.best_val_loss
    );
    model = model
        .load_file(&best_ckpt, &CompactRecorder::new(), &device)
        .map_err(|e| anyhow::anyhow!("failed to restore best checkpoint: {:?}", e))?;

    // Final model, portable bundle, run configuration, charts
    println!("{}", "Saving Model...".cyan());
    let final_path = output_dir.join("bird_classifier_final");
    model
        .clone()
        .save_file(&final_path, &CompactRecorder::new())
        .map_err(|e| anyhow::anyhow!("failed to save final model: {:?}", e))?;

    let export_dir = output_dir.join("export");
    bundle::save_bundle(&model.valid(), &model_config, &vocab, &export_dir)?;

    config.save(&output_dir.join("training_config.json"))?;
    write_training_charts(&state.history, output_dir)?;

    println!("  Final model: {:?}", final_path);
    println!("  Bundle:      {:?}", export_dir);
    println!();
    println!("{}", "Training Complete!".green().bold());
    println!(
        "  Best validation loss {:.4} at epoch {}",
        state.best_val_loss,
        state.best_epoch + 1
    );

    Ok(state.history)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_tracks_best_epoch() {
        let mut state = TrainingState::new(0.001);

        assert!(state.observe_val_loss(1.0, 2, 0.5));
        state.next_epoch();
        assert!(state.observe_val_loss(0.8, 2, 0.5));
        state.next_epoch();
        assert!(!state.observe_val_loss(0.9, 2, 0.5));

        assert_eq!(state.best_epoch, 1);
        assert_eq!(state.epochs_without_improvement, 1);
        assert!((state.best_val_loss - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_lr_reduces_on_plateau() {
        let mut state = TrainingState::new(0.001);
        state.observe_val_loss(1.0, 2, 0.5);

        // Two stale epochs trigger one reduction
        state.observe_val_loss(1.1, 2, 0.5);
        assert!((state.current_lr - 0.001).abs() < 1e-12);
        state.observe_val_loss(1.2, 2, 0.5);
        assert!((state.current_lr - 0.0005).abs() < 1e-12);

        // The wait counter resets after a reduction
        state.observe_val_loss(1.3, 2, 0.5);
        assert!((state.current_lr - 0.0005).abs() < 1e-12);
        state.observe_val_loss(1.4, 2, 0.5);
        assert!((state.current_lr - 0.00025).abs() < 1e-12);
    }

    #[test]
    fn test_improvement_resets_counters() {
        let mut state = TrainingState::new(0.001);
        state.observe_val_loss(1.0, 2, 0.5);
        state.observe_val_loss(1.1, 2, 0.5);
        assert_eq!(state.epochs_without_improvement, 1);

        state.observe_val_loss(0.5, 2, 0.5);
        assert_eq!(state.epochs_without_improvement, 0);
        assert!(!state.should_early_stop(1));
    }

    #[test]
    fn test_early_stop_threshold() {
        let mut state = TrainingState::new(0.001);
        state.observe_val_loss(1.0, 10, 0.5);
        for _ in 0..4 {
            state.observe_val_loss(2.0, 10, 0.5);
        }
        assert!(state.should_early_stop(4));
        assert!(!state.should_early_stop(5));
    }

    #[test]
    fn test_history_records_epochs() {
        let mut state = TrainingState::new(0.001);
        state.record_epoch(0.9, 0.4, 1.0, 0.35);
        state.record_epoch(0.7, 0.5, 0.8, 0.45);

        assert_eq!(state.history.epochs(), 2);
        assert_eq!(state.history.train_loss, vec![0.9, 0.7]);
        assert_eq!(state.history.val_accuracy, vec![0.35, 0.45]);
    }

    #[test]
    fn test_checkpoint_naming() {
        let path = checkpoint_path(Path::new("model/checkpoints"), 0);
        assert!(path.ends_with("bird_classifier_epoch_01"));

        let path = checkpoint_path(Path::new("model/checkpoints"), 11);
        assert!(path.ends_with("bird_classifier_epoch_12"));
    }
}
