use anyhow::{anyhow, Result};
use gbdt::config::Config;
use gbdt::decision_tree::{Data, DataVec};
use gbdt::gradient_boost::GBDT;
use ndarray::{Array1, Array2};

use crate::config::{ModelConfig, ModelType};
use crate::models::classifier_trait::{not_fitted, ClassifierModel};

/// Gradient Boosting Decision Tree (GBDT) classifier with log-likelihood loss.
pub struct GBDTClassifier {
    model: Option<GBDT>,
    params: ModelConfig,
}

impl GBDTClassifier {
    pub fn new(params: ModelConfig) -> Self {
        GBDTClassifier {
            model: None,
            params,
        }
    }
}

fn to_data(x: &Array2<f64>, labels: Option<&Array1<bool>>) -> DataVec {
    x.rows()
        .into_iter()
        .enumerate()
        .map(|(i, row)| {
            let features: Vec<f32> = row.iter().map(|&v| v as f32).collect();
            // LogLikelyhood expects labels in {-1, 1}
            let label = match labels {
                Some(y) if y[i] => 1.0,
                Some(_) => -1.0,
                None => 0.0,
            };
            Data::new_training_data(features, 1.0, label, None)
        })
        .collect()
}

impl ClassifierModel for GBDTClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<bool>) -> Result<()> {
        let ModelType::GradientBoosting {
            learning_rate,
            max_depth,
            num_boost_round,
            min_leaf_size,
            training_optimization_level,
        } = &self.params.model_type
        else {
            return Err(anyhow!(
                "Expected gradient boosting params, got {:?}",
                self.params.model_type
            ));
        };
        if x.nrows() == 0 {
            return Err(anyhow!("Gradient boosting needs at least one training row"));
        }

        let mut config = Config::new();
        config.set_feature_size(x.ncols());
        config.set_shrinkage(*learning_rate);
        config.set_max_depth(*max_depth);
        config.set_iterations(*num_boost_round as usize);
        config.set_min_leaf_size(*min_leaf_size);
        config.set_debug(false);
        config.set_training_optimization_level(*training_optimization_level);
        config.set_loss("LogLikelyhood");

        let mut gbdt = GBDT::new(&config);
        let mut train_x = to_data(x, Some(y));
        gbdt.fit(&mut train_x);

        self.model = Some(gbdt);
        Ok(())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let model = self.model.as_ref().ok_or_else(|| not_fitted(self.name()))?;
        let test_x = to_data(x, None);
        // For LogLikelyhood `predict` already applies the logistic link.
        let predictions = model.predict(&test_x);
        Ok(predictions.into_iter().map(f64::from).collect())
    }

    fn name(&self) -> &str {
        "gbm"
    }
}
