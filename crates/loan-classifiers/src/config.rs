use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Central configuration for one model: method, preprocessing and resampling.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ModelConfig {
    pub model_type: ModelType,
    #[serde(default)]
    pub preprocessing: Preprocessing,
    #[serde(default)]
    pub resampling: Resampling,
}

/// Supported model types and their hyper-parameters.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum ModelType {
    LogisticRegression {
        /// L2 penalty.
        alpha: f64,
        max_iterations: u64,
    },
    RandomForest {
        n_trees: usize,
        max_depth: Option<usize>,
        /// Features tried per tree; `None` uses the square root of the feature count.
        mtry: Option<usize>,
        min_weight_leaf: f32,
    },
    GradientBoosting {
        learning_rate: f32,
        max_depth: u32,
        num_boost_round: u32,
        min_leaf_size: usize,
        training_optimization_level: u8,
    },
    Svm {
        eps: f64,
        /// Penalty weights for the (bad, good) classes.
        c: (f64, f64),
        kernel: String,
        gaussian_kernel_eps: f64,
        polynomial_kernel_constant: f64,
        polynomial_kernel_degree: f64,
        /// Fit on at most this many (stratified) training rows.
        max_samples: Option<usize>,
    },
    #[cfg(feature = "nnet")]
    NeuralNetwork {
        hidden_units: usize,
        learning_rate: f64,
        weight_decay: f64,
        epochs: usize,
        batch_size: usize,
    },
}

impl Default for ModelType {
    fn default() -> Self {
        ModelType::LogisticRegression {
            alpha: 1.0,
            max_iterations: 100,
        }
    }
}

impl ModelType {
    /// Short name used on the command line and in file names.
    pub fn short_name(&self) -> &'static str {
        match self {
            ModelType::LogisticRegression { .. } => "logistic",
            ModelType::RandomForest { .. } => "rf",
            ModelType::GradientBoosting { .. } => "gbm",
            ModelType::Svm { .. } => "svm",
            #[cfg(feature = "nnet")]
            ModelType::NeuralNetwork { .. } => "nnet",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ModelType::LogisticRegression { .. } => "Logistic Regression",
            ModelType::RandomForest { .. } => "Random Forest",
            ModelType::GradientBoosting { .. } => "Gradient Boosting",
            ModelType::Svm { .. } => "Support Vector Machine",
            #[cfg(feature = "nnet")]
            ModelType::NeuralNetwork { .. } => "Neural Network",
        }
    }

    /// Whether the method expects standardized inputs by default.
    pub fn prefers_scaled_input(&self) -> bool {
        !matches!(
            self,
            ModelType::RandomForest { .. } | ModelType::GradientBoosting { .. }
        )
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for ModelType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "logistic" | "glm" => Ok(ModelType::LogisticRegression {
                alpha: 1.0,
                max_iterations: 100,
            }),
            "rf" | "random_forest" => Ok(ModelType::RandomForest {
                n_trees: 100,
                max_depth: Some(12),
                mtry: None,
                min_weight_leaf: 5.0,
            }),
            "gbm" | "gbdt" => Ok(ModelType::GradientBoosting {
                learning_rate: 0.1,
                max_depth: 3,
                num_boost_round: 100,
                min_leaf_size: 10,
                training_optimization_level: 2,
            }),
            "svm" => Ok(ModelType::Svm {
                eps: 0.1,
                c: (1.0, 1.0),
                kernel: "gauss".to_string(),
                gaussian_kernel_eps: 10.0,
                polynomial_kernel_constant: 1.0,
                polynomial_kernel_degree: 3.0,
                max_samples: Some(2000),
            }),
            #[cfg(feature = "nnet")]
            "nnet" | "neural_network" => Ok(ModelType::NeuralNetwork {
                hidden_units: 8,
                learning_rate: 0.01,
                weight_decay: 1e-4,
                epochs: 100,
                batch_size: 128,
            }),
            _ => Err(format!(
                "Unknown model type: {}. Valid options are logistic, rf, gbm, svm and nnet (nnet needs the `nnet` feature)",
                s
            )),
        }
    }
}

/// Input transformations fitted on the training matrix only.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct Preprocessing {
    /// Standardize every design matrix column to zero mean and unit variance.
    pub center_scale: bool,
}

/// How the training table is resampled to estimate performance before the final fit.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum Resampling {
    #[default]
    None,
    CrossValidation { folds: usize },
}

impl ModelConfig {
    pub fn new(model_type: ModelType) -> Self {
        let preprocessing = Preprocessing {
            center_scale: model_type.prefers_scaled_input(),
        };
        Self {
            model_type,
            preprocessing,
            resampling: Resampling::None,
        }
    }

    pub fn with_resampling(mut self, resampling: Resampling) -> Self {
        self.resampling = resampling;
        self
    }

    /// One configuration per method, in report order.
    pub fn all_methods() -> Vec<ModelConfig> {
        let mut names = vec!["logistic", "rf", "gbm", "svm"];
        if cfg!(feature = "nnet") {
            names.push("nnet");
        }
        names
            .into_iter()
            .filter_map(|name| ModelType::from_str(name).ok())
            .map(|model_type| {
                let cv = matches!(model_type, ModelType::LogisticRegression { .. });
                let config = ModelConfig::new(model_type);
                if cv {
                    config.with_resampling(Resampling::CrossValidation { folds: 5 })
                } else {
                    config
                }
            })
            .collect()
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        ModelConfig::new(ModelType::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_type_from_short_names() {
        for name in ["logistic", "rf", "gbm", "svm"] {
            let model_type = ModelType::from_str(name).unwrap();
            assert_eq!(model_type.short_name(), name);
        }
        assert!(ModelType::from_str("knn").is_err());
    }

    #[test]
    fn test_trees_are_not_scaled() {
        let rf = ModelConfig::new(ModelType::from_str("rf").unwrap());
        assert!(!rf.preprocessing.center_scale);
        let svm = ModelConfig::new(ModelType::from_str("svm").unwrap());
        assert!(svm.preprocessing.center_scale);
    }

    #[test]
    fn test_model_config_json_uses_method_tag() {
        let config = ModelConfig::new(ModelType::from_str("gbm").unwrap())
            .with_resampling(Resampling::CrossValidation { folds: 3 });
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"method\":\"gradient_boosting\""));
        assert!(json.contains("\"strategy\":\"cross_validation\""));
        let back: ModelConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
