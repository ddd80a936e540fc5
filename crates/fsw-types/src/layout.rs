//! Directory layout shared by the sweep drivers and the config generators.
//!
//! Every path is a pure function of the experiment identity and the
//! workspace root; nothing here touches the filesystem.

use std::path::{Path, PathBuf};

use crate::experiment::{ExperimentId, Method};

/// Method directory searched by the hyperparameter sweep.
pub const SEARCH_METHOD: &str = "finetune";

/// Root-relative layout of configs and results
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub root: PathBuf,
}

impl Layout {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// `configs/search/exps/<model>_wr/finetune/`
    pub fn search_config_dir(&self, model: &str) -> PathBuf {
        self.root
            .join("configs")
            .join("search")
            .join("exps")
            .join(format!("{}_wr", model))
            .join(SEARCH_METHOD)
    }

    /// `configs/search/exps/<model>_wr/finetune/<dataset>.yaml`
    pub fn search_config(&self, model: &str, dataset: &str) -> PathBuf {
        self.search_config_dir(model).join(format!("{}.yaml", dataset))
    }

    /// `configs/benchmark/<shot>-shot/<model>/<method>/`
    pub fn benchmark_config_dir(&self, model: &str, shot: u32, method: Method) -> PathBuf {
        self.root
            .join("configs")
            .join("benchmark")
            .join(format!("{}-shot", shot))
            .join(model)
            .join(method.dir_name())
    }

    /// `configs/benchmark/<shot>-shot/<model>/<method>/<dataset>.yaml`
    pub fn benchmark_config(&self, id: &ExperimentId) -> PathBuf {
        self.benchmark_config_dir(&id.model, id.shot, id.method)
            .join(format!("{}.yaml", id.dataset.name()))
    }

    /// `results/benchmark/<shot>-shot/<model>/<method>/`
    pub fn benchmark_result_dir(&self, model: &str, shot: u32, method: Method) -> PathBuf {
        self.root
            .join("results")
            .join("benchmark")
            .join(format!("{}-shot", shot))
            .join(model)
            .join(method.dir_name())
    }

    /// `results/benchmark/<shot>-shot/<model>/<method>/<dataset>.pt`
    pub fn benchmark_result(&self, id: &ExperimentId) -> PathBuf {
        self.benchmark_result_dir(&id.model, id.shot, id.method)
            .join(format!("{}.pt", id.dataset.name()))
    }

    /// `configs/CE/miniImageNet_res12.yaml`
    pub fn ce_config(&self) -> PathBuf {
        self.root.join("configs").join("CE").join("miniImageNet_res12.yaml")
    }

    /// `path` as seen by a program started in the root. Paths outside the
    /// root are returned unchanged.
    pub fn root_relative<'p>(&self, path: &'p Path) -> &'p Path {
        path.strip_prefix(&self.root).unwrap_or(path)
    }
}

impl Default for Layout {
    fn default() -> Self {
        Self::new(".")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::experiment::Dataset;

    #[test]
    fn test_search_paths() {
        let layout = Layout::new("/work");
        assert_eq!(
            layout.search_config_dir("clip"),
            PathBuf::from("/work/configs/search/exps/clip_wr/finetune")
        );
        assert_eq!(
            layout.search_config("clip", "cub"),
            PathBuf::from("/work/configs/search/exps/clip_wr/finetune/cub.yaml")
        );
    }

    #[test]
    fn test_benchmark_paths() {
        let layout = Layout::new("/work");
        let id = ExperimentId::new("dinov2", Method::MatchingNet, Dataset::VggFlower, 5);

        assert_eq!(
            layout.benchmark_config(&id),
            PathBuf::from("/work/configs/benchmark/5-shot/dinov2/matchingnet/vgg_flower.yaml")
        );
        assert_eq!(
            layout.benchmark_result(&id),
            PathBuf::from("/work/results/benchmark/5-shot/dinov2/matchingnet/vgg_flower.pt")
        );
        assert_eq!(
            layout.benchmark_result(&id).parent(),
            Some(layout.benchmark_result_dir("dinov2", 5, Method::MatchingNet).as_path())
        );
    }

    #[test]
    fn test_root_relative_paths() {
        let id = ExperimentId::new("clip", Method::Ncc, Dataset::Dtd, 10);

        let relative = Layout::new("work");
        assert_eq!(
            relative.root_relative(&relative.benchmark_config(&id)),
            Path::new("configs/benchmark/10-shot/clip/NCC/dtd.yaml")
        );

        let current = Layout::default();
        assert_eq!(
            current.root_relative(&current.benchmark_result(&id)),
            Path::new("results/benchmark/10-shot/clip/NCC/dtd.pt")
        );

        let absolute = Layout::new("/work");
        assert_eq!(
            absolute.root_relative(Path::new("/elsewhere/a.yaml")),
            Path::new("/elsewhere/a.yaml")
        );
        assert_eq!(
            absolute.ce_config(),
            PathBuf::from("/work/configs/CE/miniImageNet_res12.yaml")
        );
    }
}
