use anyhow::{anyhow, Result};
use linfa::prelude::*;
use linfa_logistic::{FittedLogisticRegression, LogisticRegression};
use ndarray::{Array1, Array2};

use crate::config::{ModelConfig, ModelType};
use crate::models::classifier_trait::{not_fitted, ClassifierModel};

/// Binomial logistic regression.
pub struct LogisticClassifier {
    model: Option<FittedLogisticRegression<f64, bool>>,
    params: ModelConfig,
}

impl LogisticClassifier {
    pub fn new(params: ModelConfig) -> Self {
        LogisticClassifier {
            model: None,
            params,
        }
    }

    /// Fitted coefficients followed by the intercept.
    pub fn coefficients(&self) -> Option<(Array1<f64>, f64)> {
        self.model
            .as_ref()
            .map(|m| (m.params().to_owned(), m.intercept()))
    }
}

impl ClassifierModel for LogisticClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<bool>) -> Result<()> {
        let ModelType::LogisticRegression {
            alpha,
            max_iterations,
        } = &self.params.model_type
        else {
            return Err(anyhow!(
                "Expected logistic regression params, got {:?}",
                self.params.model_type
            ));
        };

        let dataset = Dataset::new(x.to_owned(), y.to_owned());
        let model = LogisticRegression::default()
            .alpha(*alpha)
            .max_iterations(*max_iterations)
            .fit(&dataset)
            .map_err(|e| anyhow!("Logistic regression failed to fit: {}", e))?;

        self.model = Some(model);
        Ok(())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let model = self.model.as_ref().ok_or_else(|| not_fitted(self.name()))?;
        // The probability refers to the larger label, which is `true` (bad).
        Ok(model.predict_probabilities(x))
    }

    fn name(&self) -> &str {
        "logistic"
    }
}
