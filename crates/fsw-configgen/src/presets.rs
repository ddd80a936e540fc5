//! Backbone and method presets used by the generators.

use fsw_types::{Backbone, Method, SweepSettings};

use crate::document::{ModelSection, ParamValue};

/// Classifier parameter layout:
/// `[finetune_batch, query_batch, epochs, backbone_lr, head_lr, use_alpha, use_beta, mode]`.
fn finetune_parameters(epochs: i64, backbone_lr: f64, head_lr: f64, mode: &str) -> Vec<ParamValue> {
    vec![
        100i64.into(),
        100i64.into(),
        epochs.into(),
        backbone_lr.into(),
        head_lr.into(),
        false.into(),
        false.into(),
        mode.into(),
    ]
}

/// Backbone learning rate used by the finetune baseline.
pub fn finetune_backbone_lr(backbone: Backbone) -> f64 {
    match backbone {
        Backbone::Clip | Backbone::DinoV2 => 0.0001,
        Backbone::Dino => 0.001,
    }
}

/// Model section with the backbone fields filled in. The classifier is the
/// finetune head at the starting point used by the hyperparameter search.
pub fn model_section(backbone: Backbone, settings: &SweepSettings) -> ModelSection {
    let (name, hyper, pretrained): (&str, Option<Vec<ParamValue>>, Option<String>) = match backbone {
        Backbone::Clip => ("clip", None, None),
        Backbone::Dino => (
            "DINO_ViT",
            Some(vec!["base".into(), 16i64.into()]),
            Some(settings.dino_pretrained.clone()),
        ),
        Backbone::DinoV2 => ("DINO_v2", Some(vec!["dinov2_vitb14_reg".into()]), None),
    };

    ModelSection {
        backbone: name.to_string(),
        backbone_hyperparameters: hyper,
        classifier: "finetune".to_string(),
        classifier_parameters: finetune_parameters(10, 0.02, 0.1, "fc"),
        name: "evaluation".to_string(),
        pretrained,
        model_type: "fewshot_finetune".to_string(),
    }
}

/// Apply the classifier block for `method` on top of a backbone section.
pub fn apply_method(model: &mut ModelSection, method: Method, backbone: Backbone) {
    match method {
        Method::Ncc => {
            model.model_type = "fewshot_finetune".to_string();
            model.classifier = "finetune".to_string();
            model.classifier_parameters = finetune_parameters(0, 0.0, 0.0, "NCC");
        }
        Method::Finetune => {
            model.model_type = "fewshot_finetune".to_string();
            model.classifier = "finetune".to_string();
            model.classifier_parameters =
                finetune_parameters(30, finetune_backbone_lr(backbone), 0.1, "fc");
        }
        Method::Lr => {
            model.model_type = "Episodic_Model".to_string();
            model.classifier = "LR".to_string();
            model.classifier_parameters = Vec::new();
        }
        Method::MatchingNet => {
            model.model_type = "Episodic_Model".to_string();
            model.classifier = "MatchingNet".to_string();
            model.classifier_parameters = Vec::new();
        }
    }
}
