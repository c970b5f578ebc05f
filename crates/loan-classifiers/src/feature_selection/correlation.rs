//! Correlation diagnostics for numeric features.
//!
//! These are reporting aids: they show why the fixed collinear exclusion
//! exists and how strongly each numeric feature separates the outcome. They
//! never change the feature lists.
use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::Serialize;
use statrs::distribution::{ContinuousCDF, FisherSnedecor};

use crate::data_handling::{Column, LoanTable};
use crate::error::TableError;

/// Two features whose absolute Pearson correlation meets the threshold.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CollinearPair {
    pub first: String,
    pub second: String,
    pub r: f64,
}

/// Univariate association between one numeric feature and the outcome.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FeatureAssociation {
    pub feature: String,
    pub r: f64,
    pub f_statistic: f64,
    pub p_value: f64,
}

/// Pearson's r between two equally long vectors. Constant input gives 0.
pub fn pearson_r(x: ArrayView1<f64>, y: ArrayView1<f64>) -> f64 {
    let n = x.len() as f64;
    if n < 2.0 {
        return 0.0;
    }
    let x_mean = x.sum() / n;
    let y_mean = y.sum() / n;
    let x_centered = x.mapv(|v| v - x_mean);
    let y_centered = y.mapv(|v| v - y_mean);

    let r = x_centered.dot(&y_centered)
        / (x_centered.dot(&x_centered).sqrt() * y_centered.dot(&y_centered).sqrt());
    if r.is_finite() {
        r
    } else {
        0.0
    }
}

/// Numeric and flag features of `table` as a dense matrix, skipping the rest.
///
/// Rows with a missing value in any used column are left out.
pub fn numeric_matrix(
    table: &LoanTable,
    features: &[String],
) -> Result<(Vec<String>, Array2<f64>), TableError> {
    let mut names = Vec::new();
    let mut columns: Vec<Vec<Option<f64>>> = Vec::new();
    for feature in features {
        match table.column(feature)? {
            Column::Numeric(v) => columns.push(v.clone()),
            Column::Flag(v) => columns.push(v.iter().map(|b| b.map(|b| b as u8 as f64)).collect()),
            _ => continue,
        }
        names.push(feature.clone());
    }

    let complete: Vec<usize> = (0..table.nrows())
        .filter(|&row| columns.iter().all(|c| c[row].is_some()))
        .collect();

    let mut matrix = Array2::zeros((complete.len(), names.len()));
    for (j, column) in columns.iter().enumerate() {
        for (i, &row) in complete.iter().enumerate() {
            matrix[[i, j]] = column[row].unwrap_or_default();
        }
    }
    Ok((names, matrix))
}

/// Every pair of numeric features with `|r| >= threshold`, strongest first.
pub fn collinear_pairs(
    table: &LoanTable,
    features: &[String],
    threshold: f64,
) -> Result<Vec<CollinearPair>, TableError> {
    let (names, matrix) = numeric_matrix(table, features)?;
    let mut pairs = Vec::new();
    for i in 0..names.len() {
        for j in (i + 1)..names.len() {
            let r = pearson_r(matrix.column(i), matrix.column(j));
            if r.abs() >= threshold {
                pairs.push(CollinearPair {
                    first: names[i].clone(),
                    second: names[j].clone(),
                    r,
                });
            }
        }
    }
    pairs.sort_by(|a, b| b.r.abs().total_cmp(&a.r.abs()));
    Ok(pairs)
}

/// F-test of each column of `x` against a 0/1 target, from Pearson's r.
pub fn f_regression(x: &Array2<f64>, y: &Array1<f64>) -> (Array1<f64>, Array1<f64>, Array1<f64>) {
    let r: Array1<f64> = x
        .axis_iter(Axis(1))
        .map(|col| pearson_r(col, y.view()))
        .collect();
    let dof = y.len() as f64 - 2.0;

    let mut f_statistic = r.mapv(|r| r.powi(2) / (1.0 - r.powi(2)) * dof);
    let mut p_values = Array1::from_elem(r.len(), 1.0);

    if let Ok(dist) = FisherSnedecor::new(1.0, dof) {
        for (p, &f) in p_values.iter_mut().zip(f_statistic.iter()) {
            *p = 1.0 - dist.cdf(f);
        }
    }

    for (f, p) in f_statistic.iter_mut().zip(p_values.iter_mut()) {
        if f.is_infinite() {
            *f = f64::MAX;
            *p = 0.0;
        } else if f.is_nan() {
            *f = 0.0;
            *p = 1.0;
        }
    }

    (r, f_statistic, p_values)
}

/// Association of every numeric feature with `status == bad`, strongest first.
pub fn outcome_associations(
    table: &LoanTable,
    features: &[String],
) -> Result<Vec<FeatureAssociation>, TableError> {
    let mut with_status = features.to_vec();
    with_status.push(crate::data_handling::fields::STATUS.to_string());
    let complete = table.project(&with_status)?.drop_incomplete_rows();

    let (names, matrix) = numeric_matrix(&complete, features)?;
    let y: Array1<f64> = complete
        .status()?
        .iter()
        .map(|s| if s.is_bad() { 1.0 } else { 0.0 })
        .collect();

    let (r, f_statistic, p_values) = f_regression(&matrix, &y);
    let mut associations: Vec<FeatureAssociation> = names
        .into_iter()
        .enumerate()
        .map(|(i, feature)| FeatureAssociation {
            feature,
            r: r[i],
            f_statistic: f_statistic[i],
            p_value: p_values[i],
        })
        .collect();
    associations.sort_by(|a, b| b.f_statistic.total_cmp(&a.f_statistic));
    Ok(associations)
}
