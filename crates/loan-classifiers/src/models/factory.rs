use crate::config::{ModelConfig, ModelType};
use crate::models::classifier_trait::ClassifierModel;

/// Build an unfitted, boxed classifier from a `ModelConfig`.
///
/// `seed` drives every stochastic part of the fit (bootstrap rows, feature
/// subsets, subsampling, weight initialisation).
pub fn build_model(params: &ModelConfig, seed: u64) -> Box<dyn ClassifierModel> {
    match params.model_type {
        ModelType::LogisticRegression { .. } => {
            Box::new(crate::models::logistic::LogisticClassifier::new(params.clone()))
        }
        ModelType::RandomForest { .. } => Box::new(
            crate::models::random_forest::RandomForestClassifier::new(params.clone(), seed),
        ),
        ModelType::GradientBoosting { .. } => {
            Box::new(crate::models::gbdt::GBDTClassifier::new(params.clone()))
        }
        ModelType::Svm { .. } => {
            Box::new(crate::models::svm::SVMClassifier::new(params.clone(), seed))
        }
        #[cfg(feature = "nnet")]
        ModelType::NeuralNetwork { .. } => Box::new(
            crate::models::neural_net::NeuralNetClassifier::new(params.clone(), seed),
        ),
    }
}
