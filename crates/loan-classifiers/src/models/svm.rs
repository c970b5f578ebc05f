use anyhow::{anyhow, Result};
use linfa::dataset::Pr;
use linfa::prelude::*;
use linfa_svm::{Svm, SvmParams};
use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::config::{ModelConfig, ModelType};
use crate::models::classifier_trait::{not_fitted, ClassifierModel};

/// Support vector machine with Platt-scaled probabilities.
pub struct SVMClassifier {
    model: Option<Svm<f64, Pr>>,
    params: ModelConfig,
    seed: u64,
}

impl SVMClassifier {
    pub fn new(params: ModelConfig, seed: u64) -> Self {
        SVMClassifier {
            model: None,
            params,
            seed,
        }
    }
}

/// Pick at most `max_samples` rows, keeping the class ratio. Row order is preserved.
fn stratified_subsample(y: &Array1<bool>, max_samples: usize, seed: u64) -> Vec<usize> {
    if y.len() <= max_samples {
        return (0..y.len()).collect();
    }
    let mut rng = StdRng::seed_from_u64(seed);
    let fraction = max_samples as f64 / y.len() as f64;
    let mut keep = Vec::with_capacity(max_samples);
    for class in [false, true] {
        let mut rows: Vec<usize> = (0..y.len()).filter(|&i| y[i] == class).collect();
        rows.shuffle(&mut rng);
        let n = ((rows.len() as f64 * fraction).round() as usize).max(1).min(rows.len());
        keep.extend_from_slice(&rows[..n]);
    }
    keep.sort_unstable();
    keep
}

impl ClassifierModel for SVMClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<bool>) -> Result<()> {
        let ModelType::Svm {
            eps,
            c,
            kernel,
            gaussian_kernel_eps,
            polynomial_kernel_constant,
            polynomial_kernel_degree,
            max_samples,
        } = &self.params.model_type
        else {
            return Err(anyhow!("Expected SVM params, got {:?}", self.params.model_type));
        };

        let rows = match max_samples {
            Some(limit) => stratified_subsample(y, *limit, self.seed),
            None => (0..y.len()).collect(),
        };
        if rows.len() < y.len() {
            log::info!("SVM: fitting on {} of {} training rows", rows.len(), y.len());
        }
        let dataset = Dataset::new(x.select(Axis(0), &rows), y.select(Axis(0), &rows));

        let (c_pos, c_neg) = *c;
        let params: SvmParams<f64, Pr> = Svm::<f64, Pr>::params().eps(*eps).pos_neg_weights(c_pos, c_neg);
        let params = match kernel.as_str() {
            "linear" => params.linear_kernel(),
            "gauss" => params.gaussian_kernel(*gaussian_kernel_eps),
            "poly" => params.polynomial_kernel(*polynomial_kernel_constant, *polynomial_kernel_degree),
            other => {
                return Err(anyhow!(
                    "Unsupported kernel type: {}. Valid options are: linear, gauss, poly",
                    other
                ))
            }
        };

        let model = params
            .fit(&dataset)
            .map_err(|e| anyhow!("SVM failed to fit: {}", e))?;
        log::debug!("SVM: {} support vectors", model.nsupport());

        self.model = Some(model);
        Ok(())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let model = self.model.as_ref().ok_or_else(|| not_fitted(self.name()))?;
        let predictions: Array1<Pr> = model.predict(x);
        Ok(predictions.mapv(|p| *p as f64))
    }

    fn name(&self) -> &str {
        "svm"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array;
    use std::str::FromStr;

    #[test]
    fn test_subsample_keeps_class_ratio() {
        let y: Array1<bool> = (0..100).map(|i| i % 4 == 0).collect();
        let rows = stratified_subsample(&y, 40, 3);
        assert_eq!(rows.len(), 40);
        assert_eq!(rows.iter().filter(|&&r| y[r]).count(), 10);
        assert!(rows.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_svm_probabilities_in_unit_interval() {
        let x = Array::from_shape_fn((40, 2), |(i, j)| {
            let shift = if i >= 20 { 2.0 } else { -2.0 };
            shift + ((i * (j + 1)) % 5) as f64 * 0.1
        });
        let y: Array1<bool> = (0..40).map(|i| i >= 20).collect();

        let mut model = SVMClassifier::new(ModelConfig::new(ModelType::from_str("svm").unwrap()), 1);
        model.fit(&x, &y).unwrap();
        let proba = model.predict_proba(&x).unwrap();
        assert!(proba.iter().all(|p| (0.0..=1.0).contains(p)));
    }
}
