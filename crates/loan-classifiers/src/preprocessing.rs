//! Turning feature tables into model inputs.
//!
//! `FeatureEncoding` is learned once from a training table and then applied
//! unchanged to any other table of the same grade, so train and test rows
//! always land in the same columns. `Scaler` is the optional per-column
//! standardization fitted on the encoded training matrix.
use std::collections::BTreeSet;
use std::ops::Range;

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::data_handling::{fields, Column, LoanTable};
use crate::error::TableError;

/// How one source feature maps onto design matrix columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EncodedFeature {
    Numeric { name: String },
    Flag { name: String },
    /// One 0/1 column per non-reference level. The reference level is the
    /// alphabetically first level seen in training.
    OneHot {
        name: String,
        reference: String,
        levels: Vec<String>,
    },
}

impl EncodedFeature {
    pub fn name(&self) -> &str {
        match self {
            EncodedFeature::Numeric { name }
            | EncodedFeature::Flag { name }
            | EncodedFeature::OneHot { name, .. } => name,
        }
    }

    pub fn width(&self) -> usize {
        match self {
            EncodedFeature::OneHot { levels, .. } => levels.len(),
            _ => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureEncoding {
    features: Vec<EncodedFeature>,
}

/// Encoded features and the outcome. `y[i]` is true when row `i` is bad.
#[derive(Debug, Clone)]
pub struct DesignMatrix {
    pub x: Array2<f64>,
    pub y: Array1<bool>,
    pub column_names: Vec<String>,
}

impl DesignMatrix {
    pub fn nrows(&self) -> usize {
        self.x.nrows()
    }

    pub fn bad_count(&self) -> usize {
        self.y.iter().filter(|&&b| b).count()
    }

    /// Gather rows by index into a new matrix.
    pub fn select(&self, indices: &[usize]) -> DesignMatrix {
        DesignMatrix {
            x: self.x.select(Axis(0), indices),
            y: indices.iter().map(|&i| self.y[i]).collect(),
            column_names: self.column_names.clone(),
        }
    }
}

impl FeatureEncoding {
    /// Learn the encoding of every non-status column in `table`.
    pub fn fit(table: &LoanTable) -> Result<FeatureEncoding, TableError> {
        let mut features = Vec::new();
        for name in table.column_names() {
            if name == fields::STATUS {
                continue;
            }
            let encoded = match table.column(name)? {
                Column::Numeric(_) => EncodedFeature::Numeric { name: name.clone() },
                Column::Flag(_) => EncodedFeature::Flag { name: name.clone() },
                Column::Categorical { values, .. } => {
                    // Levels come from the rows actually present; a table
                    // selected out of a larger one still carries its parent's set.
                    let mut levels: Vec<String> = values
                        .iter()
                        .flatten()
                        .cloned()
                        .collect::<BTreeSet<_>>()
                        .into_iter()
                        .collect();
                    if levels.is_empty() {
                        return Err(TableError::Empty);
                    }
                    let reference = levels.remove(0);
                    EncodedFeature::OneHot {
                        name: name.clone(),
                        reference,
                        levels,
                    }
                }
                other => {
                    return Err(TableError::ColumnType {
                        column: name.clone(),
                        expected: if other.kind() == "text" {
                            "categorical"
                        } else {
                            "numeric, flag or categorical"
                        },
                    })
                }
            };
            features.push(encoded);
        }
        Ok(FeatureEncoding { features })
    }

    pub fn features(&self) -> &[EncodedFeature] {
        &self.features
    }

    pub fn width(&self) -> usize {
        self.features.iter().map(EncodedFeature::width).sum()
    }

    /// Design matrix column names, e.g. `int_rate` or `purpose=car`.
    pub fn column_names(&self) -> Vec<String> {
        let mut names = Vec::with_capacity(self.width());
        for feature in &self.features {
            match feature {
                EncodedFeature::OneHot { name, levels, .. } => {
                    names.extend(levels.iter().map(|level| format!("{}={}", name, level)))
                }
                other => names.push(other.name().to_string()),
            }
        }
        names
    }

    /// The design matrix columns each source feature occupies.
    pub fn column_groups(&self) -> Vec<(String, Range<usize>)> {
        let mut start = 0;
        self.features
            .iter()
            .map(|feature| {
                let range = start..start + feature.width();
                start = range.end;
                (feature.name().to_string(), range)
            })
            .collect()
    }

    /// Encode `table`. Levels not seen in training encode as all zeros.
    pub fn transform(&self, table: &LoanTable) -> Result<DesignMatrix, TableError> {
        let n_rows = table.nrows();
        let mut x = Array2::<f64>::zeros((n_rows, self.width()));

        for (feature, (_, range)) in self.features.iter().zip(self.column_groups()) {
            match feature {
                EncodedFeature::Numeric { name } => {
                    let values = table.numeric(name)?;
                    for (row, value) in values.iter().enumerate() {
                        x[[row, range.start]] = value.ok_or_else(|| missing(name))?;
                    }
                }
                EncodedFeature::Flag { name } => {
                    let values = table.flag(name)?;
                    for (row, value) in values.iter().enumerate() {
                        let flag = value.ok_or_else(|| missing(name))?;
                        x[[row, range.start]] = if flag { 1.0 } else { 0.0 };
                    }
                }
                EncodedFeature::OneHot { name, levels, .. } => {
                    let values = table.text(name)?;
                    for (row, value) in values.iter().enumerate() {
                        let value = value.as_deref().ok_or_else(|| missing(name))?;
                        if let Some(offset) = levels.iter().position(|l| l == value) {
                            x[[row, range.start + offset]] = 1.0;
                        }
                    }
                }
            }
        }

        let y = table.status()?.iter().map(|s| s.is_bad()).collect();
        Ok(DesignMatrix {
            x,
            y,
            column_names: self.column_names(),
        })
    }
}

fn missing(name: &str) -> TableError {
    TableError::ColumnType {
        column: name.to_string(),
        expected: "fully observed",
    }
}

/// Simple standard scaler (per-column mean/std).
#[derive(Clone, Debug, PartialEq)]
pub struct Scaler {
    pub mean: Array1<f64>,
    pub std: Array1<f64>,
}

impl Scaler {
    /// Columns with a stddev below this are only centred.
    const MIN_STD: f64 = 1e-6;
}

/// Fit a `Scaler` on a matrix whose rows are samples and columns features.
pub fn fit_scaler(x: &Array2<f64>) -> Result<Scaler, TableError> {
    if x.nrows() == 0 {
        return Err(TableError::Empty);
    }
    let mean = x.mean_axis(Axis(0)).ok_or(TableError::Empty)?;
    let std = x.std_axis(Axis(0), 0.0).mapv(|s| if s < Scaler::MIN_STD { 1.0 } else { s });
    Ok(Scaler { mean, std })
}

/// Standardize all rows with a fitted `Scaler`.
pub fn transform_all(x: &Array2<f64>, sc: &Scaler) -> Array2<f64> {
    (x - &sc.mean) / &sc.std
}

/// Fit a scaler and return it with the transformed matrix.
pub fn fit_transform(x: &Array2<f64>) -> Result<(Scaler, Array2<f64>), TableError> {
    let sc = fit_scaler(x)?;
    let transformed = transform_all(x, &sc);
    Ok((sc, transformed))
}
