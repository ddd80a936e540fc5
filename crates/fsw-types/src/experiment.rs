use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::SweepError;

/// Few-shot adaptation method evaluated by the benchmark sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Method {
    Ncc,
    Lr,
    MatchingNet,
    Finetune,
}

impl Method {
    /// Sweep order used by the benchmark driver.
    pub const ALL: [Method; 4] = [Method::Ncc, Method::Lr, Method::MatchingNet, Method::Finetune];

    /// Directory segment used under `configs/` and `results/`.
    pub fn dir_name(&self) -> &'static str {
        match self {
            Method::Ncc => "NCC",
            Method::Lr => "LR",
            Method::MatchingNet => "matchingnet",
            Method::Finetune => "finetune",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.dir_name())
    }
}

impl FromStr for Method {
    type Err = SweepError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Method::ALL
            .iter()
            .copied()
            .find(|m| m.dir_name() == s)
            .ok_or_else(|| crate::validation_error!("unknown method: {}", s))
    }
}

/// Evaluation datasets covered by the benchmark sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dataset {
    Omniglot,
    QuickDraw,
    Cub,
    VggFlower,
    Aircraft,
    TrafficSigns,
    Mscoco,
    Dtd,
    Fungi,
}

impl Dataset {
    /// Sweep order used by the benchmark driver and the config generators.
    pub const ALL: [Dataset; 9] = [
        Dataset::Omniglot,
        Dataset::QuickDraw,
        Dataset::Cub,
        Dataset::VggFlower,
        Dataset::Aircraft,
        Dataset::TrafficSigns,
        Dataset::Mscoco,
        Dataset::Dtd,
        Dataset::Fungi,
    ];

    /// File stem used for config and result files.
    pub fn name(&self) -> &'static str {
        match self {
            Dataset::Omniglot => "omniglot",
            Dataset::QuickDraw => "quickdraw",
            Dataset::Cub => "cub",
            Dataset::VggFlower => "vgg_flower",
            Dataset::Aircraft => "aircraft",
            Dataset::TrafficSigns => "traffic_signs",
            Dataset::Mscoco => "mscoco",
            Dataset::Dtd => "dtd",
            Dataset::Fungi => "fungi",
        }
    }

    /// Dataset root used when no override is configured.
    pub fn default_root(&self) -> &'static str {
        match self {
            Dataset::Omniglot => "/home/datasets/omniglot/",
            Dataset::QuickDraw => "/home/datasets/quickdraw/converted/",
            Dataset::Cub => "/home/datasets/CUB_200_2011/",
            Dataset::VggFlower => "/home/datasets/vgg_flower/",
            Dataset::Aircraft => "/home/datasets/fgvc-aircraft-2013b/converted/",
            Dataset::TrafficSigns => "/home/datasets/GTSRB/Final_Training/Images/",
            Dataset::Mscoco => "/home/datasets/mscoco/imgs_g/",
            Dataset::Dtd => "/home/datasets/dtd/",
            Dataset::Fungi => "/home/datasets/fungi/",
        }
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Dataset {
    type Err = SweepError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Dataset::ALL
            .iter()
            .copied()
            .find(|d| d.name() == s)
            .ok_or_else(|| crate::validation_error!("unknown dataset: {}", s))
    }
}

/// Pretrained backbones the config generators know how to describe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Backbone {
    Clip,
    Dino,
    DinoV2,
}

impl Backbone {
    pub const ALL: [Backbone; 3] = [Backbone::Clip, Backbone::Dino, Backbone::DinoV2];

    /// Model name as typed on the command line and used in paths.
    pub fn model_name(&self) -> &'static str {
        match self {
            Backbone::Clip => "clip",
            Backbone::Dino => "dino",
            Backbone::DinoV2 => "dinov2",
        }
    }
}

impl fmt::Display for Backbone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.model_name())
    }
}

impl FromStr for Backbone {
    type Err = SweepError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Backbone::ALL
            .iter()
            .copied()
            .find(|b| b.model_name() == s)
            .ok_or_else(|| crate::config_error!("model not found: {}", s))
    }
}

/// Identity of one benchmark evaluation: (model, method, dataset, shot).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExperimentId {
    pub model: String,
    pub method: Method,
    pub dataset: Dataset,
    pub shot: u32,
}

impl ExperimentId {
    pub fn new(model: &str, method: Method, dataset: Dataset, shot: u32) -> Self {
        Self {
            model: model.to_string(),
            method,
            dataset,
            shot,
        }
    }
}

impl fmt::Display for ExperimentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-shot/{}/{}/{}",
            self.shot, self.model, self.method, self.dataset
        )
    }
}

/// Tag passed to the hyperparameter search program: `<dataset>_<model>`.
pub fn search_tag(dataset_stem: &str, model: &str) -> String {
    format!("{}_{}", dataset_stem, model)
}
