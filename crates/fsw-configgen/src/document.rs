//! Typed shape of the YAML documents read by the external benchmark code.
//!
//! Fields are declared in alphabetical order so the emitted YAML has sorted
//! keys.

use fsw_types::{validation_error, SweepResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A loosely typed list entry, e.g. in `CLASSIFIER_PARAMETERS`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "{v}"),
        }
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct ExperimentConfig {
    pub aug: AugSection,
    pub data: DataSection,
    pub gpu_id: u32,
    pub is_train: u8,
    pub model: ModelSection,
    pub output: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_hyperparameters: Option<SearchRanges>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct AugSection {
    pub mean: [f64; 3],
    pub std: [f64; 3],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_crop: Option<bool>,
}

impl Default for AugSection {
    /// miniImageNet normalisation statistics.
    fn default() -> Self {
        Self {
            mean: [0.4712, 0.4499, 0.4031],
            std: [0.2726, 0.2634, 0.2794],
            test_crop: Some(true),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct DataSection {
    pub img_size: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test: Option<SplitSection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid: Option<SplitSection>,
}

/// One evaluation split (`TEST` or `VALID`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct SplitSection {
    pub batch_size: u32,
    pub dataset_names: Vec<String>,
    pub dataset_roots: Vec<String>,
    pub episode_descr_config: EpisodeConfig,
}

/// Episode sampling parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct EpisodeConfig {
    pub max_num_query: u32,
    pub min_examples_in_class: u32,
    pub num_query: u32,
    pub num_support: u32,
    pub num_tasks_per_epoch: u32,
    pub num_ways: u32,
    /// 1 reproduces the original biased Meta-Dataset sampling, 0 is unbiased.
    pub sequential_sampling: u8,
    pub use_bilevel_hierarchy: bool,
    pub use_dag_hierarchy: bool,
}

impl EpisodeConfig {
    /// `MIN_EXAMPLES_IN_CLASS` is always support + query, and must fit in a `u32`.
    pub fn new(
        num_ways: u32,
        num_support: u32,
        num_query: u32,
        max_num_query: u32,
    ) -> SweepResult<Self> {
        let min_examples_in_class = num_support.checked_add(num_query).ok_or_else(|| {
            validation_error!(
                "{} support + {} query examples per class is out of range",
                num_support,
                num_query
            )
        })?;

        Ok(Self {
            max_num_query,
            min_examples_in_class,
            num_query,
            num_support,
            num_tasks_per_epoch: 0,
            num_ways,
            sequential_sampling: 0,
            use_bilevel_hierarchy: false,
            use_dag_hierarchy: false,
        })
    }

    pub fn with_tasks_per_epoch(mut self, n: u32) -> Self {
        self.num_tasks_per_epoch = n;
        self
    }

    pub fn with_sequential_sampling(mut self, sequential: bool) -> Self {
        self.sequential_sampling = u8::from(sequential);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct ModelSection {
    pub backbone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backbone_hyperparameters: Option<Vec<ParamValue>>,
    pub classifier: String,
    pub classifier_parameters: Vec<ParamValue>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pretrained: Option<String>,
    #[serde(rename = "TYPE")]
    pub model_type: String,
}

/// Grid explored by `search_hyperparameter.py`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct SearchRanges {
    pub epoch_range: Vec<u32>,
    pub lr_backbone_range: Vec<f64>,
    pub lr_head_range: Vec<f64>,
}

impl Default for SearchRanges {
    fn default() -> Self {
        Self {
            epoch_range: vec![5, 10, 20, 30],
            lr_backbone_range: vec![0.0001, 0.001, 0.01, 0.1],
            lr_head_range: vec![0.0001, 0.001, 0.01, 0.1],
        }
    }
}

/// Supervised pre-training config read by the training entry point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct TrainingConfig {
    pub aug: AugSection,
    pub data: TrainingData,
    pub gpu_id: u32,
    pub model: TrainingModel,
    pub output: String,
    pub train: TrainSchedule,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct TrainingData {
    pub img_size: u32,
    pub num_workers: u32,
    pub train: BatchSplit,
    pub valid: SplitSection,
}

/// Non-episodic training split.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct BatchSplit {
    pub batch_size: u32,
    pub dataset_names: Vec<String>,
    pub dataset_roots: Vec<String>,
    pub is_episodic: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct TrainingModel {
    pub backbone: String,
    pub classifier: String,
    pub name: String,
    #[serde(rename = "TYPE")]
    pub model_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct TrainSchedule {
    pub base_lr: f64,
    pub epochs: u32,
}

impl SearchRanges {
    /// Number of grid points the search program will evaluate.
    pub fn grid_size(&self) -> usize {
        self.epoch_range.len() * self.lr_backbone_range.len() * self.lr_head_range.len()
    }
}
