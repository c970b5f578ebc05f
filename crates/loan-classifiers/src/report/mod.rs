//! Text and HTML reporting of the per-grade analysis.
//!
//! The analysis driver collects one [`GradeReport`] per grade; [`text`]
//! prints caret-style summaries of them and [`html`] renders the same data
//! into a standalone HTML page with embedded plotly figures.
pub mod html;
pub mod plots;
pub mod text;

use serde::{Deserialize, Serialize};

use crate::config::ModelConfig;
use crate::data_handling::{Column, LoanTable};
use crate::error::TableError;
use crate::evaluation::{CrossValidationSummary, Evaluation, FeatureImportance};
use crate::feature_selection::{CollinearPair, FeatureAssociation};

pub use html::{render_analysis_report, Report, ReportSection};

/// Toggles for the optional diagnostic plots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportOptions {
    /// Histogram of every numeric feature split by status, per grade.
    pub distribution_plots: bool,
    /// Permutation importance bar chart per model.
    pub importance_plots: bool,
}

/// Values of one numeric feature split by outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureDistribution {
    pub feature: String,
    pub good: Vec<f64>,
    pub bad: Vec<f64>,
}

/// Split every numeric feature of `table` by status. Non-numeric features
/// are skipped and missing values ignored.
pub fn feature_distributions(
    table: &LoanTable,
    features: &[String],
) -> Result<Vec<FeatureDistribution>, TableError> {
    let status = table.status()?;
    let mut distributions = Vec::new();
    for feature in features {
        let Column::Numeric(values) = table.column(feature)? else {
            continue;
        };
        let mut good = Vec::new();
        let mut bad = Vec::new();
        for (value, s) in values.iter().zip(status) {
            match (value, s.is_bad()) {
                (Some(v), true) => bad.push(*v),
                (Some(v), false) => good.push(*v),
                (None, _) => {}
            }
        }
        distributions.push(FeatureDistribution {
            feature: feature.clone(),
            good,
            bad,
        });
    }
    Ok(distributions)
}

/// Everything reported about one model on one grade.
#[derive(Debug, Clone, Serialize)]
pub struct ModelReport {
    pub model_config: ModelConfig,
    pub evaluation: Evaluation,
    pub cross_validation: Option<CrossValidationSummary>,
    pub importance: Option<Vec<FeatureImportance>>,
}

/// Everything reported about one grade.
#[derive(Debug, Clone, Serialize)]
pub struct GradeReport {
    pub grade: String,
    pub features: Vec<String>,
    pub train_rows: usize,
    pub train_bad: usize,
    pub test_rows: usize,
    pub test_bad: usize,
    pub collinear_pairs: Vec<CollinearPair>,
    pub associations: Vec<FeatureAssociation>,
    #[serde(skip)]
    pub distributions: Vec<FeatureDistribution>,
    pub models: Vec<ModelReport>,
}

impl GradeReport {
    /// The model with the highest test AUC, if any has a defined AUC.
    pub fn best_model(&self) -> Option<&ModelReport> {
        self.models
            .iter()
            .filter(|m| m.evaluation.roc.auc.is_finite())
            .max_by(|a, b| a.evaluation.roc.auc.total_cmp(&b.evaluation.roc.auc))
    }
}
