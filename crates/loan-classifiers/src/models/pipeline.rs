use anyhow::{anyhow, Context, Result};
use ndarray::{Array1, Array2};

use crate::config::ModelConfig;
use crate::data_handling::LoanTable;
use crate::models::classifier_trait::ClassifierModel;
use crate::models::factory::build_model;
use crate::preprocessing::{fit_scaler, transform_all, DesignMatrix, FeatureEncoding, Scaler};

/// A fitted model together with the transformations learned on its training data.
pub struct FittedPipeline {
    pub config: ModelConfig,
    pub encoding: FeatureEncoding,
    pub scaler: Option<Scaler>,
    model: Box<dyn ClassifierModel>,
}

impl FittedPipeline {
    /// Encode a training table, fit the optional scaler and then the model.
    pub fn fit(config: &ModelConfig, train: &LoanTable, seed: u64) -> Result<FittedPipeline> {
        let encoding = FeatureEncoding::fit(train).context("Failed to encode training table")?;
        let design = encoding.transform(train)?;
        Self::fit_design(config, encoding, &design, seed)
    }

    /// Fit on an already encoded design matrix.
    pub fn fit_design(
        config: &ModelConfig,
        encoding: FeatureEncoding,
        train: &DesignMatrix,
        seed: u64,
    ) -> Result<FittedPipeline> {
        let bad = train.bad_count();
        if bad == 0 || bad == train.nrows() {
            return Err(anyhow!(
                "Cannot fit {} on {} rows containing a single outcome class",
                config.model_type,
                train.nrows()
            ));
        }

        let scaler = if config.preprocessing.center_scale {
            Some(fit_scaler(&train.x)?)
        } else {
            None
        };
        let x = match &scaler {
            Some(sc) => transform_all(&train.x, sc),
            None => train.x.clone(),
        };

        let mut model = build_model(config, seed);
        model
            .fit(&x, &train.y)
            .with_context(|| format!("Failed to fit {}", config.model_type))?;

        Ok(FittedPipeline {
            config: config.clone(),
            encoding,
            scaler,
            model,
        })
    }

    pub fn name(&self) -> &str {
        self.model.name()
    }

    /// Probability of "bad" for each row of an encoded (unscaled) matrix.
    pub fn predict_proba_matrix(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        match &self.scaler {
            Some(sc) => self.model.predict_proba(&transform_all(x, sc)),
            None => self.model.predict_proba(x),
        }
    }

    /// Probability of "bad" for each row of a feature table.
    pub fn predict_proba(&self, table: &LoanTable) -> Result<Array1<f64>> {
        let design = self.encoding.transform(table)?;
        self.predict_proba_matrix(&design.x)
    }

    /// Bad (true) / good (false) labels at `threshold`.
    pub fn predict(&self, table: &LoanTable, threshold: f64) -> Result<Array1<bool>> {
        Ok(self.predict_proba(table)?.mapv(|p| p >= threshold))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_handling::{Column, Status};

    fn table(n: usize) -> LoanTable {
        LoanTable::from_columns(vec![
            (
                "int_rate".to_string(),
                Column::Numeric((0..n).map(|i| Some(5.0 + (i % 10) as f64 * 2.0)).collect()),
            ),
            (
                "status".to_string(),
                Column::Label((0..n).map(|i| if i % 10 >= 7 { Status::Bad } else { Status::Good }).collect()),
            ),
        ])
        .unwrap()
    }

    #[test]
    fn test_pipeline_scales_and_predicts() {
        let config = ModelConfig::default();
        let pipeline = FittedPipeline::fit(&config, &table(50), 1).unwrap();
        assert!(pipeline.scaler.is_some());

        let labels = pipeline.predict(&table(10), 0.5).unwrap();
        assert_eq!(labels.len(), 10);
        assert!(labels[9]);
        assert!(!labels[0]);
    }

    #[test]
    fn test_single_class_is_rejected() {
        let only_good = LoanTable::from_columns(vec![
            ("int_rate".to_string(), Column::Numeric(vec![Some(1.0), Some(2.0)])),
            ("status".to_string(), Column::Label(vec![Status::Good, Status::Good])),
        ])
        .unwrap();
        assert!(FittedPipeline::fit(&ModelConfig::default(), &only_good, 0).is_err());
    }
}
