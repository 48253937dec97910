use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::{Path, PathBuf};
use tch::{nn, nn::OptimizerConfig, Device};

use classifier_core::{safetensors_util, EncoderConfig, PretrainedDir, SequenceClassifier};

use crate::checkpoint;
use crate::config::TrainingConfig;
use crate::data;
use crate::dataset::{ClassificationDataset, TextTokenizer};
use crate::early_stopping::{EarlyStopping, Verdict};
use crate::error::{Result, TrainerError};
use crate::labels::{self, LabelVocabulary};
use crate::metrics::{self, EvalMetrics};
use crate::scheduler::LinearWarmup;
use crate::split::stratified_split;
use crate::RunContext;

const WARMUP_FRACTION: f64 = 0.1;
const LOG_EVERY: usize = 10;
const PROGRESS_TEMPLATE: &str = "  {bar:30.green/black} {pos}/{len} [{elapsed}<{eta}] {msg}";

/// Per-batch bar for one training epoch. Hidden when stderr is not a terminal.
fn epoch_progress(num_batches: usize) -> ProgressBar {
    let bar = ProgressBar::new(num_batches as u64);
    bar.set_style(
        ProgressStyle::with_template(PROGRESS_TEMPLATE).unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    EarlyStop,
    EpochsExhausted,
}

#[derive(Debug, Clone, Copy)]
pub struct EpochMetrics {
    pub epoch: usize,
    pub train_loss: f64,
    pub validation: EvalMetrics,
}

/// What a finished run produced. The checkpoint on disk is the real output;
/// this is for callers that want to inspect the run.
#[derive(Debug, Clone)]
pub struct TrainingSummary {
    pub history: Vec<EpochMetrics>,
    pub best_f1: Option<f64>,
    pub best_epoch: Option<usize>,
    pub stop_reason: StopReason,
    /// `None` when validation F1 never rose above 0.
    pub checkpoint: Option<PathBuf>,
    /// Configuration after label-count reconciliation.
    pub config: TrainingConfig,
    pub vocabulary: LabelVocabulary,
}

/// Fine-tunes the model in `config.model_name` on the records at `data_path`.
///
/// Phases: load records, resolve labels, reconcile the config, stratified split,
/// tokenize, then the epoch loop with best-F1 checkpointing and early stopping.
pub fn train(data_path: &Path, config: &TrainingConfig, ctx: &RunContext) -> Result<TrainingSummary> {
    config.validate()?;

    let model_dir = PretrainedDir::open(&config.model_name)?;
    let tokenizer_path = model_dir.tokenizer_path();
    let probe = TextTokenizer::from_file(&tokenizer_path, config.max_length)?;
    info!("Loaded tokenizer from {}", tokenizer_path.display());

    let encoder_config = match model_dir.encoder_config()? {
        Some(encoder_config) => encoder_config,
        None => {
            warn!(
                "No config.json in {}; using BERT-base defaults",
                model_dir.root().display()
            );
            // Vocab size must match the tokenizer.
            EncoderConfig {
                vocab_size: probe.vocab_size() as i64,
                ..Default::default()
            }
        }
    };

    let max_length = config.max_length.min(encoder_config.max_position_embeddings as usize);
    let tokenizer = if max_length < config.max_length {
        warn!(
            "max_length {} exceeds the model's {} positions; truncating to {}",
            config.max_length, encoder_config.max_position_embeddings, max_length
        );
        TextTokenizer::from_file(&tokenizer_path, max_length)?
    } else {
        probe
    };

    // Loading
    let records = data::load_records(data_path, config.data_format)?;
    info!("Loaded {} samples", records.len());
    if records.is_empty() {
        return Err(TrainerError::EmptyDataset(data_path.to_path_buf()));
    }

    let dataset = labels::normalize(records)?;
    let detected = dataset.vocabulary.num_classes();
    let reconciled = config.reconcile(detected);
    if let Some(adjustment) = reconciled.adjustment {
        match adjustment.configured {
            Some(configured) => {
                warn!("Config num_labels={} but found {} unique labels", configured, detected);
                warn!("Overriding num_labels to {}", detected);
            }
            None => info!("num_labels not configured; using {} detected labels", detected),
        }
    }
    let config = reconciled.config;
    dataset.vocabulary.check_class_range()?;

    // Splitting
    let split = stratified_split(&dataset.labels, config.val_split, config.seed)?;
    let (train_texts, train_labels) = dataset.select(&split.train);
    let (val_texts, val_labels) = dataset.select(&split.validation);
    info!(
        "Split {} samples into {} train / {} validation",
        dataset.len(),
        train_labels.len(),
        val_labels.len()
    );

    let train_set = ClassificationDataset::new(&train_texts, &train_labels, &tokenizer, ctx.device)?;
    let val_set = ClassificationDataset::new(&val_texts, &val_labels, &tokenizer, ctx.device)?;
    debug!(
        "Encoded lengths: train {} / validation {} tokens",
        train_set.seq_len(),
        val_set.seq_len()
    );

    let steps_per_epoch = train_set.num_batches(config.batch_size);
    let encoder_config = encoder_config.with_num_labels(config.num_labels() as i64);
    let mut trainer = Trainer::new(
        config,
        encoder_config,
        model_dir.weights_path().as_deref(),
        steps_per_epoch,
        ctx.device,
    )?;

    trainer.fit(&train_set, &val_set, dataset.vocabulary)
}

/// Owns the model, its variables, the optimizer and the learning-rate schedule.
pub struct Trainer {
    config: TrainingConfig,
    model: SequenceClassifier,
    optimizer: nn::Optimizer,
    schedule: LinearWarmup,
    vs: nn::VarStore,
}

impl Trainer {
    /// Builds the classifier and loads `weights` when given; without weights every
    /// variable keeps its random initialisation.
    pub fn new(
        config: TrainingConfig,
        encoder_config: EncoderConfig,
        weights: Option<&Path>,
        steps_per_epoch: usize,
        device: Device,
    ) -> Result<Self> {
        tch::manual_seed(config.seed as i64);

        let mut vs = nn::VarStore::new(device);
        let model = SequenceClassifier::new(&vs.root(), &encoder_config);

        match weights {
            Some(path) => {
                let report = safetensors_util::load_safetensors(&mut vs, path)?;
                info!(
                    "Loaded {} pretrained tensors from {}",
                    report.loaded.len(),
                    path.display()
                );
                if !report.missing.is_empty() {
                    info!("Newly initialised: {}", report.missing.join(", "));
                }
            }
            None => warn!("No pretrained weights found; using random weights"),
        }

        let optimizer = nn::AdamW {
            wd: config.weight_decay,
            ..Default::default()
        }
        .build(&vs, config.learning_rate)?;

        let total_steps = steps_per_epoch * config.epochs;
        let schedule = LinearWarmup::with_warmup_fraction(config.learning_rate, WARMUP_FRACTION, total_steps);

        Ok(Self {
            config,
            model,
            optimizer,
            schedule,
            vs,
        })
    }

    pub fn fit(
        &mut self,
        train_set: &ClassificationDataset,
        val_set: &ClassificationDataset,
        vocabulary: LabelVocabulary,
    ) -> Result<TrainingSummary> {
        let epochs = self.config.epochs;
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let mut monitor = EarlyStopping::new(self.config.patience);
        let mut history = Vec::with_capacity(epochs);
        let mut saved = None;
        let mut stop_reason = StopReason::EpochsExhausted;

        info!("Starting training with configuration: {:?}", self.config);

        for epoch in 0..epochs {
            info!("Epoch {}/{}", epoch + 1, epochs);

            let train_loss = self.train_epoch(train_set, &mut rng)?;
            let validation = self.evaluate(val_set)?;

            info!("Train Loss: {:.4}", train_loss);
            info!(
                "Val Loss: {:.4}, Accuracy: {:.4}, F1: {:.4}",
                validation.loss, validation.accuracy, validation.f1
            );
            history.push(EpochMetrics {
                epoch,
                train_loss,
                validation,
            });

            match monitor.observe(epoch, validation.f1) {
                Verdict::Improved { .. } => {
                    let path = checkpoint::save_best(&self.vs, &self.config, &vocabulary, validation.f1, epoch)?;
                    info!("Saved best model with F1: {:.4} to {}", validation.f1, path.display());
                    saved = Some(path);
                }
                Verdict::NoImprovement { stale_epochs } => {
                    debug!("No F1 improvement for {} epoch(s)", stale_epochs);
                }
            }

            if monitor.should_stop() {
                info!("Early stopping triggered after {} epochs", epoch + 1);
                stop_reason = StopReason::EarlyStop;
                break;
            }
        }

        info!("Training completed!");

        Ok(TrainingSummary {
            history,
            best_f1: monitor.best_f1(),
            best_epoch: monitor.best_epoch(),
            stop_reason,
            checkpoint: saved,
            config: self.config.clone(),
            vocabulary,
        })
    }

    /// One pass over the shuffled training set; returns the mean batch loss.
    fn train_epoch(&mut self, train_set: &ClassificationDataset, rng: &mut StdRng) -> Result<f64> {
        let num_batches = train_set.num_batches(self.config.batch_size);
        let mut total_loss = 0.0;
        let progress = epoch_progress(num_batches);

        for (batch_idx, batch) in train_set.batches(self.config.batch_size, Some(rng)).enumerate() {
            self.optimizer.set_lr(self.schedule.current_lr());

            let logits = self.model.forward(&batch.input_ids, &batch.attention_mask, true);
            let loss = logits.cross_entropy_for_logits(&batch.labels);

            self.optimizer
                .backward_step_clip_norm(&loss, self.config.max_grad_norm);
            self.schedule.advance();

            let loss_val = loss.f_double_value(&[])?;
            total_loss += loss_val;
            progress.set_message(format!("loss: {:.4}", loss_val));
            progress.inc(1);

            if batch_idx % LOG_EVERY == 0 {
                debug!(
                    "Batch {}/{} | Loss: {:.4} | LR: {:.2e}",
                    batch_idx + 1,
                    num_batches,
                    loss_val,
                    self.schedule.current_lr()
                );
            }
        }

        let mean_loss = total_loss / num_batches.max(1) as f64;
        progress.finish_with_message(format!("loss: {:.4}", mean_loss));
        Ok(mean_loss)
    }

    /// Mean loss, accuracy and weighted F1 over `val_set`, without gradients.
    pub fn evaluate(&self, val_set: &ClassificationDataset) -> Result<EvalMetrics> {
        tch::no_grad(|| -> Result<EvalMetrics> {
            let mut total_loss = 0.0;
            let mut num_batches = 0usize;
            let mut targets = Vec::with_capacity(val_set.len());
            let mut predictions = Vec::with_capacity(val_set.len());

            for batch in val_set.batches(self.config.batch_size, None) {
                let logits = self.model.forward(&batch.input_ids, &batch.attention_mask, false);
                let loss = logits.cross_entropy_for_logits(&batch.labels);
                total_loss += loss.f_double_value(&[])?;
                num_batches += 1;

                let preds = logits.argmax(-1, false).to_device(Device::Cpu);
                predictions.extend(Vec::<i64>::try_from(&preds)?);
                targets.extend(Vec::<i64>::try_from(&batch.labels.to_device(Device::Cpu))?);
            }

            Ok(EvalMetrics {
                loss: total_loss / num_batches.max(1) as f64,
                accuracy: metrics::accuracy(&targets, &predictions),
                f1: metrics::weighted_f1(&targets, &predictions),
            })
        })
    }
}
