//! Per-grade feature lists and the fixed collinearity exclusion.
use serde::{Deserialize, Serialize};

use crate::data_handling::{fields, LoanTable};
use crate::error::TableError;

/// Feature list for one loan grade.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GradeFeatures {
    pub grade: String,
    pub features: Vec<String>,
}

/// A manual decision to drop one of two near-identical features.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CollinearExclusion {
    pub keep: String,
    pub drop: String,
}

impl Default for CollinearExclusion {
    fn default() -> Self {
        CollinearExclusion {
            keep: fields::FICO_RANGE_LOW.to_string(),
            drop: fields::FICO_RANGE_HIGH.to_string(),
        }
    }
}

/// Feature configuration keyed by grade.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FeatureSelectionConfig {
    pub grades: Vec<GradeFeatures>,
    pub collinear_exclusion: Option<CollinearExclusion>,
}

impl Default for FeatureSelectionConfig {
    fn default() -> Self {
        let grade_a = vec![
            fields::TERM,
            fields::INT_RATE,
            fields::ANNUAL_INC,
            fields::DTI,
            fields::FICO_RANGE_LOW,
            fields::FICO_RANGE_HIGH,
            fields::INQ_LAST_6MTHS,
            fields::REVOL_UTIL,
            fields::HOME_OWNERSHIP,
            fields::DESC_EMPTY,
        ];
        let mut grade_b = grade_a.clone();
        grade_b.extend([fields::EMP_LENGTH, fields::PURPOSE, fields::DELINQ_2YRS]);
        let mut grade_c = grade_b.clone();
        grade_c.extend([fields::VERIFICATION_STATUS, fields::CREDIT_HISTORY_MONTHS]);
        let mut grade_d = grade_c.clone();
        grade_d.push(fields::LOAN_AMNT);

        let grades = [("A", grade_a), ("B", grade_b), ("C", grade_c), ("D", grade_d)]
            .into_iter()
            .map(|(grade, features)| GradeFeatures {
                grade: grade.to_string(),
                features: features.into_iter().map(String::from).collect(),
            })
            .collect();

        FeatureSelectionConfig {
            grades,
            collinear_exclusion: Some(CollinearExclusion::default()),
        }
    }
}

impl FeatureSelectionConfig {
    pub fn grade_names(&self) -> Vec<String> {
        self.grades.iter().map(|g| g.grade.clone()).collect()
    }

    /// The configured list for `grade` before the collinear exclusion.
    pub fn configured_features(&self, grade: &str) -> Option<&[String]> {
        self.grades
            .iter()
            .find(|g| g.grade == grade)
            .map(|g| g.features.as_slice())
    }

    /// The modelling feature list for `grade` with the collinear exclusion applied.
    pub fn features_for(&self, grade: &str) -> Option<Vec<String>> {
        let entry = self.grades.iter().find(|g| g.grade == grade)?;
        Some(match &self.collinear_exclusion {
            Some(exclusion) => remove_collinear_feature(&entry.features, &exclusion.drop),
            None => entry.features.clone(),
        })
    }
}

/// Remove `feature_to_drop` from the list, keeping the order of the rest.
pub fn remove_collinear_feature(feature_list: &[String], feature_to_drop: &str) -> Vec<String> {
    feature_list
        .iter()
        .filter(|f| f.as_str() != feature_to_drop)
        .cloned()
        .collect()
}

/// Rows of one grade, projected onto `features` plus `status`, with every
/// row that has a missing projected value removed.
pub fn select_feature_subset(
    table: &LoanTable,
    grade: &str,
    features: &[String],
) -> Result<LoanTable, TableError> {
    for feature in features {
        if !table.has_column(feature) {
            return Err(TableError::UnknownFeature(feature.clone()));
        }
    }

    let grades = table.text(fields::GRADE)?;
    let mask: Vec<bool> = grades.iter().map(|g| g.as_deref() == Some(grade)).collect();
    let in_grade = mask.iter().filter(|&&m| m).count();
    if in_grade == 0 {
        return Err(TableError::UnknownGrade(grade.to_string()));
    }

    let mut projection: Vec<String> = features
        .iter()
        .filter(|f| f.as_str() != fields::STATUS)
        .cloned()
        .collect();
    projection.push(fields::STATUS.to_string());

    let subset = table
        .filter(&mask)
        .project(&projection)?
        .drop_incomplete_rows()
        .refresh_levels();

    let incomplete = in_grade - subset.nrows();
    if incomplete > 0 {
        log::warn!(
            "Grade {}: dropped {} of {} loans with a missing selected feature",
            grade,
            incomplete,
            in_grade
        );
    }
    log::debug!(
        "Grade {}: {} loans, {} features",
        grade,
        subset.nrows(),
        features.len()
    );

    Ok(subset)
}
