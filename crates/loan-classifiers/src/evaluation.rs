//! Held-out evaluation, cross-validation and permutation importance.
use anyhow::{anyhow, Result};
use ndarray::{Array1, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::config::ModelConfig;
use crate::data_handling::LoanTable;
use crate::models::pipeline::FittedPipeline;
use crate::preprocessing::{DesignMatrix, FeatureEncoding};
use crate::stats::{roc_curve, ConfusionMatrix, RocCurve, RocPoint};

/// Probability cut-offs used when reporting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Probability of "bad" at or above which a loan is classified bad.
    pub classification: f64,
    /// Threshold highlighted on ROC curves.
    pub roc_annotation: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Thresholds {
            classification: 0.5,
            roc_annotation: 0.25,
        }
    }
}

/// Test-set performance of one fitted pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct Evaluation {
    pub model: String,
    pub confusion: ConfusionMatrix,
    pub roc: RocCurve,
    /// ROC operating point nearest to the annotation threshold.
    pub annotated_point: Option<RocPoint>,
    pub thresholds: Thresholds,
    pub probabilities: Vec<f64>,
    pub actual: Vec<bool>,
}

/// Score a fitted pipeline on a held-out table.
pub fn evaluate(pipeline: &FittedPipeline, test: &LoanTable, thresholds: Thresholds) -> Result<Evaluation> {
    let design = pipeline.encoding.transform(test)?;
    evaluate_design(pipeline, &design, thresholds)
}

pub fn evaluate_design(
    pipeline: &FittedPipeline,
    test: &DesignMatrix,
    thresholds: Thresholds,
) -> Result<Evaluation> {
    let probabilities = pipeline.predict_proba_matrix(&test.x)?.to_vec();
    let actual = test.y.to_vec();

    let confusion = ConfusionMatrix::from_probabilities(&probabilities, &actual, thresholds.classification);
    let roc = roc_curve(&actual, &probabilities);
    let annotated_point = roc.point_at(thresholds.roc_annotation).copied();

    log::info!(
        "{}: accuracy {:.3}, kappa {:.3}, AUC {:.3} on {} test loans",
        pipeline.config.model_type,
        confusion.accuracy(),
        confusion.kappa(),
        roc.auc,
        actual.len()
    );

    Ok(Evaluation {
        model: pipeline.config.model_type.to_string(),
        confusion,
        roc,
        annotated_point,
        thresholds,
        probabilities,
        actual,
    })
}

/// Assign row indices to `n_splits` folds, keeping each fold's class mix
/// close to the whole. Within a class rows are shuffled with a seeded RNG and
/// dealt to folds round robin.
pub fn stratified_folds(y: &Array1<bool>, n_splits: usize, seed: u64) -> Vec<Vec<usize>> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut folds: Vec<Vec<usize>> = vec![Vec::new(); n_splits];
    for class in [false, true] {
        let mut indices: Vec<usize> = (0..y.len()).filter(|&i| y[i] == class).collect();
        indices.shuffle(&mut rng);
        for (i, idx) in indices.into_iter().enumerate() {
            folds[i % n_splits].push(idx);
        }
    }
    for fold in folds.iter_mut() {
        fold.sort_unstable();
    }
    folds
}

/// Per-fold AUC of a cross-validated configuration.
#[derive(Debug, Clone, Serialize)]
pub struct CrossValidationSummary {
    pub fold_auc: Vec<f64>,
    pub mean_auc: f64,
    pub std_auc: f64,
}

/// Stratified k-fold cross-validation on the training design matrix.
///
/// Every fold fits a fresh pipeline (scaler included) on the other folds.
pub fn cross_validate(
    config: &ModelConfig,
    encoding: &FeatureEncoding,
    train: &DesignMatrix,
    folds: usize,
    seed: u64,
) -> Result<CrossValidationSummary> {
    if folds < 2 {
        return Err(anyhow!("Cross-validation needs at least 2 folds, got {}", folds));
    }
    if train.nrows() < folds {
        return Err(anyhow!(
            "Cannot split {} rows into {} folds",
            train.nrows(),
            folds
        ));
    }

    let bad = train.bad_count();
    let minority = bad.min(train.nrows() - bad);
    if minority < 2 {
        return Err(anyhow!(
            "Cross-validation needs at least 2 loans of each outcome, got {} bad of {}",
            bad,
            train.nrows()
        ));
    }
    // Every held-out fold must contain both outcomes for its AUC to exist.
    let folds = if minority < folds {
        log::warn!(
            "{}: only {} loans in the minority outcome, using {} folds instead of {}",
            config.model_type,
            minority,
            minority,
            folds
        );
        minority
    } else {
        folds
    };

    let assignments = stratified_folds(&train.y, folds, seed);
    let mut fold_auc = Vec::with_capacity(folds);
    for (k, held_out) in assignments.iter().enumerate() {
        let fit_rows: Vec<usize> = assignments
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != k)
            .flat_map(|(_, f)| f.iter().copied())
            .collect();
        let fit_part = train.select(&fit_rows);
        let held_part = train.select(held_out);

        let pipeline = FittedPipeline::fit_design(
            config,
            encoding.clone(),
            &fit_part,
            seed.wrapping_add(k as u64),
        )?;
        let proba = pipeline.predict_proba_matrix(&held_part.x)?;
        let auc = roc_curve(&held_part.y.to_vec(), &proba.to_vec()).auc;
        log::debug!("{} fold {}: AUC {:.4}", config.model_type, k + 1, auc);
        fold_auc.push(auc);
    }

    let defined: Vec<f64> = fold_auc.iter().copied().filter(|auc| auc.is_finite()).collect();
    if defined.len() < fold_auc.len() {
        log::warn!(
            "{}: {} of {} folds have an undefined AUC and are left out of the mean",
            config.model_type,
            fold_auc.len() - defined.len(),
            fold_auc.len()
        );
    }
    let mean_auc = defined.iter().mean();
    let std_auc = defined.iter().std_dev();
    log::info!(
        "{}: {}-fold CV AUC {:.3} +/- {:.3}",
        config.model_type,
        folds,
        mean_auc,
        std_auc
    );

    Ok(CrossValidationSummary {
        fold_auc,
        mean_auc,
        std_auc,
    })
}

/// Drop in AUC when one source feature is permuted.
#[derive(Debug, Clone, Serialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance_mean: f64,
    pub importance_std: f64,
}

/// Model-agnostic variable importance: for each source feature, shuffle all
/// of its design matrix columns together and measure the mean loss of AUC
/// over `n_repeats` shuffles. Sorted from most to least important.
pub fn permutation_importance(
    pipeline: &FittedPipeline,
    data: &DesignMatrix,
    n_repeats: usize,
    seed: u64,
) -> Result<Vec<FeatureImportance>> {
    let actual = data.y.to_vec();
    let baseline = roc_curve(&actual, &pipeline.predict_proba_matrix(&data.x)?.to_vec()).auc;
    if baseline.is_nan() {
        return Err(anyhow!("Permutation importance needs both outcome classes"));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut importances = Vec::new();
    for (feature, columns) in pipeline.encoding.column_groups() {
        let mut drops = Vec::with_capacity(n_repeats);
        for _ in 0..n_repeats.max(1) {
            let mut order: Vec<usize> = (0..data.nrows()).collect();
            order.shuffle(&mut rng);
            let shuffled = data.x.select(Axis(0), &order);

            let mut x_permuted = data.x.clone();
            for col in columns.clone() {
                x_permuted.column_mut(col).assign(&shuffled.column(col));
            }
            let proba = pipeline.predict_proba_matrix(&x_permuted)?;
            drops.push(baseline - roc_curve(&actual, &proba.to_vec()).auc);
        }
        let importance_mean = drops.iter().mean();
        let importance_std = if drops.len() > 1 { drops.iter().std_dev() } else { 0.0 };
        importances.push(FeatureImportance {
            feature,
            importance_mean,
            importance_std,
        });
    }

    importances.sort_by(|a, b| b.importance_mean.total_cmp(&a.importance_mean));
    Ok(importances)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelType;
    use crate::data_handling::{Column, Status};
    use std::str::FromStr;

    fn table(n: usize) -> LoanTable {
        LoanTable::from_columns(vec![
            (
                "int_rate".to_string(),
                Column::Numeric((0..n).map(|i| Some(6.0 + (i % 10) as f64 * 1.5)).collect()),
            ),
            (
                "noise".to_string(),
                Column::Numeric((0..n).map(|i| Some(((i * 7) % 13) as f64)).collect()),
            ),
            (
                "status".to_string(),
                Column::Label(
                    (0..n)
                        .map(|i| if i % 10 >= 6 { Status::Bad } else { Status::Good })
                        .collect(),
                ),
            ),
        ])
        .unwrap()
    }

    #[test]
    fn test_stratified_folds_partition_rows() {
        let y: Array1<bool> = (0..23).map(|i| i % 4 == 0).collect();
        let folds = stratified_folds(&y, 5, 2);
        let mut all: Vec<usize> = folds.concat();
        all.sort_unstable();
        assert_eq!(all, (0..23).collect::<Vec<_>>());
        for fold in &folds {
            let bad = fold.iter().filter(|&&i| y[i]).count();
            assert!((1..=2).contains(&bad));
        }
    }

    #[test]
    fn test_evaluate_and_importance() {
        let config = ModelConfig::default();
        let pipeline = FittedPipeline::fit(&config, &table(80), 4).unwrap();
        let evaluation = evaluate(&pipeline, &table(40), Thresholds::default()).unwrap();
        assert_eq!(evaluation.confusion.total(), 40);
        assert!(evaluation.roc.auc > 0.9);
        assert!(evaluation.annotated_point.is_some());

        let design = pipeline.encoding.transform(&table(40)).unwrap();
        let importance = permutation_importance(&pipeline, &design, 3, 1).unwrap();
        assert_eq!(importance.len(), 2);
        assert_eq!(importance[0].feature, "int_rate");
        assert!(importance[0].importance_mean > importance[1].importance_mean);
    }

    #[test]
    fn test_cross_validate_reports_each_fold() {
        let config = ModelConfig::new(ModelType::from_str("logistic").unwrap());
        let train = table(100);
        let encoding = FeatureEncoding::fit(&train).unwrap();
        let design = encoding.transform(&train).unwrap();
        let summary = cross_validate(&config, &encoding, &design, 4, 9).unwrap();
        assert_eq!(summary.fold_auc.len(), 4);
        assert!(summary.mean_auc > 0.8);
        assert!(cross_validate(&config, &encoding, &design, 1, 9).is_err());
    }

    #[test]
    fn test_cross_validate_caps_folds_at_minority_count() {
        let n = 100;
        let bad: Vec<bool> = (0..n).map(|i| i > 0 && i % 33 == 0).collect();
        let train = LoanTable::from_columns(vec![
            (
                "int_rate".to_string(),
                Column::Numeric(
                    (0..n)
                        .map(|i| Some(if bad[i] { 20.0 } else { 6.0 + (i % 10) as f64 * 0.5 }))
                        .collect(),
                ),
            ),
            (
                "status".to_string(),
                Column::Label(bad.iter().map(|&b| if b { Status::Bad } else { Status::Good }).collect()),
            ),
        ])
        .unwrap();
        let config = ModelConfig::new(ModelType::from_str("logistic").unwrap());
        let encoding = FeatureEncoding::fit(&train).unwrap();
        let design = encoding.transform(&train).unwrap();

        let summary = cross_validate(&config, &encoding, &design, 5, u64::MAX).unwrap();
        assert_eq!(summary.fold_auc.len(), 3);
        assert!(summary.fold_auc.iter().all(|auc| auc.is_finite()));
        assert!(summary.mean_auc.is_finite());

        let one_bad = design.select(&(0..60).collect::<Vec<_>>());
        assert_eq!(one_bad.bad_count(), 1);
        assert!(cross_validate(&config, &encoding, &one_bad, 5, 1).is_err());
    }
}
