use anyhow::Result;
use ndarray::{Array1, Array2};

/// The capability every wrapped learner exposes to the pipeline.
///
/// `y[i]` is true when row `i` is a bad loan, and every probability is the
/// probability of "bad". Implementations delegate fitting to a library
/// learner and only translate inputs and outputs.
pub trait ClassifierModel {
    /// Fit the model on a design matrix and its outcome.
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<bool>) -> Result<()>;

    /// Probability of the positive ("bad") class per row.
    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    /// Hard labels at a probability threshold.
    fn predict(&self, x: &Array2<f64>, threshold: f64) -> Result<Array1<bool>> {
        Ok(self.predict_proba(x)?.mapv(|p| p >= threshold))
    }

    /// Human readable name for the model.
    fn name(&self) -> &str {
        "classifier"
    }
}

pub(crate) fn not_fitted(name: &str) -> anyhow::Error {
    anyhow::anyhow!("{} has not been fitted", name)
}
