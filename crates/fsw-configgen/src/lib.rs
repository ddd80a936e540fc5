//! # fsw-configgen
//!
//! Generates the YAML configs consumed by the benchmark's `main.py` and
//! `search_hyperparameter.py`, laid out where the sweep drivers look for them,
//! plus the miniImageNet CE pre-training config.

pub mod document;
pub mod generate;
pub mod presets;

pub use document::{
    AugSection, BatchSplit, DataSection, EpisodeConfig, ExperimentConfig, ModelSection,
    ParamValue, SearchRanges, SplitSection, TrainSchedule, TrainingConfig, TrainingData,
    TrainingModel,
};
pub use generate::{benchmark_config, ce_training_config, search_config, ConfigWriter};
