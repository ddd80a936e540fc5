//! Writers for the benchmark and search config trees.

use fsw_types::{
    Backbone, Dataset, ExperimentId, Layout, LayoutError, Method, SweepResult, SweepSettings,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::document::{
    AugSection, BatchSplit, DataSection, EpisodeConfig, ExperimentConfig, SearchRanges,
    SplitSection, TrainSchedule, TrainingConfig, TrainingData, TrainingModel,
};
use crate::presets::{apply_method, model_section};

const IMG_SIZE: u32 = 224;

/// Benchmark evaluation config for one experiment, `DATA.TEST` split.
pub fn benchmark_config(
    backbone: Backbone,
    method: Method,
    dataset: Dataset,
    shot: u32,
    settings: &SweepSettings,
) -> SweepResult<ExperimentConfig> {
    let mut model = model_section(backbone, settings);
    apply_method(&mut model, method, backbone);

    let episode = EpisodeConfig::new(5, shot, 7, 1)?
        .with_tasks_per_epoch(2000)
        .with_sequential_sampling(false);

    Ok(ExperimentConfig {
        aug: AugSection::default(),
        data: DataSection {
            img_size: IMG_SIZE,
            test: Some(SplitSection {
                batch_size: 1,
                dataset_names: vec![dataset.name().to_string()],
                dataset_roots: vec![settings.dataset_root(dataset)],
                episode_descr_config: episode,
            }),
            valid: None,
        },
        gpu_id: settings.gpu_id,
        is_train: 0,
        model,
        output: settings.output_dir.clone(),
        search_hyperparameters: None,
    })
}

/// Hyperparameter search config for one dataset, `DATA.VALID` split.
pub fn search_config(
    backbone: Backbone,
    dataset: Dataset,
    settings: &SweepSettings,
) -> SweepResult<ExperimentConfig> {
    let model = model_section(backbone, settings);

    let episode = EpisodeConfig::new(5, 5, 15, 15)?
        .with_tasks_per_epoch(50)
        .with_sequential_sampling(true);

    Ok(ExperimentConfig {
        aug: AugSection::default(),
        data: DataSection {
            img_size: IMG_SIZE,
            test: None,
            valid: Some(SplitSection {
                batch_size: 10,
                dataset_names: vec![dataset.name().to_string()],
                dataset_roots: vec![settings.dataset_root(dataset)],
                episode_descr_config: episode,
            }),
        },
        gpu_id: settings.gpu_id,
        is_train: 0,
        model,
        output: settings.output_dir.clone(),
        search_hyperparameters: Some(SearchRanges::default()),
    })
}

/// Supervised (cross-entropy) pre-training of a ResNet-12 on miniImageNet.
pub fn ce_training_config(settings: &SweepSettings) -> SweepResult<TrainingConfig> {
    const BATCH_SIZE: u32 = 256;

    let episode = EpisodeConfig::new(5, 5, 15, 15)?.with_tasks_per_epoch(600);
    let names = vec!["miniImageNet".to_string()];
    let roots = vec![settings.mini_imagenet_root.clone()];

    Ok(TrainingConfig {
        aug: AugSection {
            test_crop: None,
            ..AugSection::default()
        },
        data: TrainingData {
            img_size: 84,
            num_workers: 8,
            train: BatchSplit {
                batch_size: BATCH_SIZE,
                dataset_names: names.clone(),
                dataset_roots: roots.clone(),
                is_episodic: false,
            },
            valid: SplitSection {
                batch_size: 8,
                dataset_names: names,
                dataset_roots: roots,
                episode_descr_config: episode,
            },
        },
        gpu_id: settings.gpu_id,
        model: TrainingModel {
            backbone: "resnet12".to_string(),
            classifier: "proto_head".to_string(),
            name: "miniImageNet_Res12_CE".to_string(),
            model_type: "CE".to_string(),
        },
        output: settings.output_dir.clone(),
        // Learning rate scales linearly from 0.1 at batch size 128.
        train: TrainSchedule {
            base_lr: 0.1 * f64::from(BATCH_SIZE) / 128.0,
            epochs: 60,
        },
    })
}

fn write_yaml<T: Serialize>(path: &Path, config: &T) -> SweepResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| LayoutError::CreateDirFailed {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let yaml = serde_yaml::to_string(config)?;
    std::fs::write(path, yaml).map_err(|source| LayoutError::WriteFailed {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("Wrote {}", path.display());
    Ok(())
}

/// Writes `configs/...` trees under a layout root.
pub struct ConfigWriter<'a> {
    layout: &'a Layout,
    settings: &'a SweepSettings,
}

impl<'a> ConfigWriter<'a> {
    pub fn new(layout: &'a Layout, settings: &'a SweepSettings) -> Self {
        Self { layout, settings }
    }

    /// One config per (method, dataset); existing files are overwritten.
    pub fn write_benchmark(&self, model: &str, shot: u32) -> SweepResult<Vec<PathBuf>> {
        let backbone: Backbone = model.parse()?;
        if shot == 0 {
            return Err(fsw_types::validation_error!("shot count must be at least 1"));
        }

        let mut written = Vec::with_capacity(Method::ALL.len() * Dataset::ALL.len());
        for method in Method::ALL {
            for dataset in Dataset::ALL {
                let id = ExperimentId::new(model, method, dataset, shot);
                let path = self.layout.benchmark_config(&id);
                write_yaml(&path, &benchmark_config(backbone, method, dataset, shot, self.settings)?)?;
                written.push(path);
            }
        }

        info!("Wrote {} benchmark configs for {} ({}-shot)", written.len(), model, shot);
        Ok(written)
    }

    /// One finetune search config per dataset.
    pub fn write_search(&self, model: &str) -> SweepResult<Vec<PathBuf>> {
        let backbone: Backbone = model.parse()?;

        let mut written = Vec::with_capacity(Dataset::ALL.len());
        for dataset in Dataset::ALL {
            let path = self.layout.search_config(model, dataset.name());
            write_yaml(&path, &search_config(backbone, dataset, self.settings)?)?;
            written.push(path);
        }

        info!(
            "Wrote {} search configs for {} ({} grid points each)",
            written.len(),
            model,
            SearchRanges::default().grid_size()
        );
        Ok(written)
    }

    /// The miniImageNet CE pre-training config.
    pub fn write_ce(&self) -> SweepResult<PathBuf> {
        let path = self.layout.ce_config();
        write_yaml(&path, &ce_training_config(self.settings)?)?;
        info!("Wrote CE training config to {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::ParamValue;
    use fsw_types::SweepError;

    #[test]
    fn test_benchmark_document_shape() {
        let settings = SweepSettings::default();
        let config =
            benchmark_config(Backbone::Clip, Method::Ncc, Dataset::Dtd, 10, &settings).unwrap();

        let test = config.data.test.as_ref().unwrap();
        assert_eq!(test.dataset_names, vec!["dtd".to_string()]);
        assert_eq!(test.dataset_roots, vec!["/home/datasets/dtd/".to_string()]);
        assert_eq!(test.episode_descr_config.num_support, 10);
        assert_eq!(test.episode_descr_config.min_examples_in_class, 17);
        assert_eq!(test.episode_descr_config.num_tasks_per_epoch, 2000);
        assert_eq!(test.episode_descr_config.sequential_sampling, 0);
        assert!(config.data.valid.is_none());
        assert!(config.search_hyperparameters.is_none());
    }

    #[test]
    fn test_search_document_shape() {
        let settings = SweepSettings::default();
        let config = search_config(Backbone::DinoV2, Dataset::Omniglot, &settings).unwrap();

        let valid = config.data.valid.as_ref().unwrap();
        assert_eq!(valid.batch_size, 10);
        assert_eq!(valid.episode_descr_config.min_examples_in_class, 20);
        assert_eq!(valid.episode_descr_config.sequential_sampling, 1);
        assert_eq!(config.model.backbone, "DINO_v2");
        assert_eq!(config.model.classifier_parameters[3], ParamValue::Float(0.02));
        assert_eq!(config.search_hyperparameters, Some(SearchRanges::default()));
    }

    #[test]
    fn test_yaml_keys_are_upper_case() {
        let settings = SweepSettings::default();
        let yaml = serde_yaml::to_string(&benchmark_config(
            Backbone::Dino,
            Method::Finetune,
            Dataset::Cub,
            5,
            &settings,
        )
        .unwrap())
        .unwrap();

        for key in ["IS_TRAIN: 0", "GPU_ID: 0", "EPISODE_DESCR_CONFIG:", "TEST_CROP: true", "PRETRAINED:"] {
            assert!(yaml.contains(key), "missing {key} in\n{yaml}");
        }
        let back: ExperimentConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back.model.classifier_parameters[3], ParamValue::Float(0.001));
    }

    #[test]
    fn test_write_benchmark_tree() {
        let dir = tempfile::tempdir().unwrap();
        let layout = Layout::new(dir.path());
        let settings = SweepSettings::default();

        let written = ConfigWriter::new(&layout, &settings).write_benchmark("clip", 10).unwrap();
        assert_eq!(written.len(), 36);

        let ncc_dtd = layout.benchmark_config(&ExperimentId::new("clip", Method::Ncc, Dataset::Dtd, 10));
        assert!(written.contains(&ncc_dtd));
        assert!(ncc_dtd.is_file());
    }

    #[test]
    fn test_write_search_tree() {
        let dir = tempfile::tempdir().unwrap();
        let layout = Layout::new(dir.path());
        let settings = SweepSettings::default();

        let written = ConfigWriter::new(&layout, &settings).write_search("dino").unwrap();
        assert_eq!(written.len(), 9);
        assert!(layout.search_config("dino", "traffic_signs").is_file());
    }

    #[test]
    fn test_unknown_model_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let layout = Layout::new(dir.path());
        let settings = SweepSettings::default();
        let writer = ConfigWriter::new(&layout, &settings);

        assert!(matches!(writer.write_benchmark("resnet12", 5), Err(SweepError::Config(_))));
        assert!(matches!(writer.write_search("resnet12"), Err(SweepError::Config(_))));
        assert!(!dir.path().join("configs").exists());
    }

    #[test]
    fn test_zero_shot_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let layout = Layout::new(dir.path());
        let settings = SweepSettings::default();

        let result = ConfigWriter::new(&layout, &settings).write_benchmark("clip", 0);
        assert!(matches!(result, Err(SweepError::Validation(_))));
    }

    #[test]
    fn test_oversized_shot_rejected_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        let layout = Layout::new(dir.path());
        let settings = SweepSettings::default();

        let result = ConfigWriter::new(&layout, &settings).write_benchmark("clip", u32::MAX);
        assert!(matches!(result, Err(SweepError::Validation(_))));
        assert!(!dir.path().join("configs").exists());
    }

    #[test]
    fn test_ce_training_document() {
        let settings = SweepSettings::default();
        let config = ce_training_config(&settings).unwrap();

        assert_eq!(config.data.img_size, 84);
        assert!(!config.data.train.is_episodic);
        assert_eq!(config.data.train.batch_size, 256);
        assert_eq!(config.data.valid.episode_descr_config.num_tasks_per_epoch, 600);
        assert_eq!(config.data.valid.episode_descr_config.min_examples_in_class, 20);
        assert!((config.train.base_lr - 0.2).abs() < 1e-12);
        assert_eq!(config.train.epochs, 60);

        let yaml = serde_yaml::to_string(&config).unwrap();
        assert!(yaml.contains("TYPE: CE"));
        assert!(yaml.contains("IS_EPISODIC: false"));
        assert!(!yaml.contains("TEST_CROP"));
        assert!(!yaml.contains("IS_TRAIN"));
    }

    #[test]
    fn test_write_ce_config() {
        let dir = tempfile::tempdir().unwrap();
        let layout = Layout::new(dir.path());
        let mut settings = SweepSettings::default();
        settings.mini_imagenet_root = "/data/mini/".to_string();

        let path = ConfigWriter::new(&layout, &settings).write_ce().unwrap();
        assert_eq!(path, layout.ce_config());

        let back: TrainingConfig =
            serde_yaml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(back.data.train.dataset_roots, vec!["/data/mini/".to_string()]);
        assert_eq!(back.model.backbone, "resnet12");
    }
}
