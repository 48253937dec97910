pub mod checkpoint;
pub mod config;
pub mod data;
pub mod dataset;
pub mod early_stopping;
pub mod error;
pub mod labels;
pub mod metrics;
pub mod scheduler;
pub mod split;
pub mod train;

pub use checkpoint::{read_metadata as read_checkpoint_metadata, CheckpointMetadata};
pub use config::{DataFormat, TrainingConfig};
pub use error::{Result, TrainerError};
pub use train::{train, StopReason, Trainer, TrainingSummary};

use log::info;
use tch::Device;

/// Per-invocation state shared by every training phase.
#[derive(Debug, Clone, Copy)]
pub struct RunContext {
    pub device: Device,
}

impl RunContext {
    pub fn new(device: Device) -> Self {
        Self { device }
    }

    /// CUDA when available, CPU otherwise.
    pub fn detect() -> Self {
        let device = Device::cuda_if_available();
        info!("Using device: {:?}", device);
        Self { device }
    }
}
