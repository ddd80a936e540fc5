//! Runtime settings: external program names, queue command and dataset roots.
//!
//! Layering is defaults, then an optional YAML file, then environment
//! variables. Command-line flags are applied last by the binary.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::errors::{SweepError, SweepResult};
use crate::experiment::Dataset;

/// Overrides the Python interpreter.
pub const ENV_PYTHON: &str = "FEWSHOT_PYTHON";
/// Overrides the queue submission program.
pub const ENV_QUEUE: &str = "FEWSHOT_QUEUE";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepSettings {
    /// Interpreter used to run the external programs.
    pub python: String,
    /// Hyperparameter search entry point.
    pub search_program: String,
    /// Benchmark evaluation entry point.
    pub eval_program: String,
    /// Task spooler receiving benchmark jobs.
    pub queue_program: String,
    /// Per-dataset root overrides, keyed by dataset name.
    pub dataset_roots: BTreeMap<String, String>,
    /// Weights file referenced by DINO configs. Jobs run in the workspace
    /// root, so a relative path is resolved against `--root`.
    pub dino_pretrained: String,
    /// miniImageNet root written into the supervised pre-training config.
    pub mini_imagenet_root: String,
    /// `OUTPUT` entry written into generated configs.
    pub output_dir: String,
    pub gpu_id: u32,
}

impl Default for SweepSettings {
    fn default() -> Self {
        Self {
            python: "python".to_string(),
            search_program: "search_hyperparameter.py".to_string(),
            eval_program: "main.py".to_string(),
            queue_program: "tsp".to_string(),
            dataset_roots: BTreeMap::new(),
            dino_pretrained: "models/DINO/dino_vitbase16_pretrain.pth".to_string(),
            mini_imagenet_root: "PATH-TO-miniIMAGENET".to_string(),
            output_dir: "../new_metadataset_result".to_string(),
            gpu_id: 0,
        }
    }
}

impl SweepSettings {
    /// Defaults, overlaid with `path` when given, then with the process
    /// environment.
    pub fn load(path: Option<&Path>) -> SweepResult<Self> {
        Self::load_with(path, |key| std::env::var(key).ok())
    }

    /// Like [`SweepSettings::load`], reading the environment through `lookup`.
    pub fn load_with<F>(path: Option<&Path>, lookup: F) -> SweepResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        settings.apply_env(lookup);
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> SweepResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> SweepResult<Self> {
        let settings: SweepSettings = serde_yaml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Apply environment overrides through `lookup` (usually `std::env::var`).
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(python) = lookup(ENV_PYTHON).filter(|v| !v.is_empty()) {
            self.python = python;
        }
        if let Some(queue) = lookup(ENV_QUEUE).filter(|v| !v.is_empty()) {
            self.queue_program = queue;
        }
    }

    pub fn validate(&self) -> SweepResult<()> {
        for (field, value) in [
            ("python", &self.python),
            ("search_program", &self.search_program),
            ("eval_program", &self.eval_program),
            ("queue_program", &self.queue_program),
        ] {
            if value.trim().is_empty() {
                return Err(SweepError::Config(format!("{} must not be empty", field)));
            }
        }
        for name in self.dataset_roots.keys() {
            name.parse::<Dataset>()?;
        }
        Ok(())
    }

    /// Root for `dataset`, falling back to the built-in default.
    pub fn dataset_root(&self, dataset: Dataset) -> String {
        self.dataset_roots
            .get(dataset.name())
            .cloned()
            .unwrap_or_else(|| dataset.default_root().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = SweepSettings::default();
        assert_eq!(settings.python, "python");
        assert_eq!(settings.queue_program, "tsp");
        assert_eq!(settings.dataset_root(Dataset::Dtd), "/home/datasets/dtd/");
        // Resolved from the workspace root the jobs run in.
        assert!(Path::new(&settings.dino_pretrained).is_relative());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let settings = SweepSettings::from_yaml(
            "python: python3\ndataset_roots:\n  dtd: /data/dtd/\n",
        )
        .unwrap();

        assert_eq!(settings.python, "python3");
        assert_eq!(settings.eval_program, "main.py");
        assert_eq!(settings.dataset_root(Dataset::Dtd), "/data/dtd/");
        assert_eq!(settings.dataset_root(Dataset::Cub), "/home/datasets/CUB_200_2011/");
    }

    #[test]
    fn test_unknown_dataset_root_rejected() {
        let result = SweepSettings::from_yaml("dataset_roots:\n  imagenet: /data/in/\n");
        assert!(matches!(result, Err(SweepError::Validation(_))));
    }

    #[test]
    fn test_empty_program_rejected() {
        let result = SweepSettings::from_yaml("queue_program: ''\n");
        assert!(matches!(result, Err(SweepError::Config(_))));
    }

    #[test]
    fn test_env_overrides() {
        let mut settings = SweepSettings::default();
        settings.apply_env(|key| match key {
            ENV_PYTHON => Some("/opt/venv/bin/python".to_string()),
            ENV_QUEUE => Some(String::new()),
            _ => None,
        });

        assert_eq!(settings.python, "/opt/venv/bin/python");
        assert_eq!(settings.queue_program, "tsp");
    }

    #[test]
    fn test_load_with_injected_environment() {
        let settings = SweepSettings::load_with(None, |key| match key {
            ENV_QUEUE => Some("ts".to_string()),
            _ => None,
        })
        .unwrap();

        assert_eq!(settings.queue_program, "ts");
        assert_eq!(settings.python, "python");
    }
}
