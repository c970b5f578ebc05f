//! The per-grade analysis: clean once, then for every grade select, split,
//! fit every configured model and evaluate it on the held-out loans.
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use loan_classifiers::cleaning::{clean_loans, CleaningReport};
use loan_classifiers::config::Resampling;
use loan_classifiers::data_handling::{fields, stratified_split, LoanTable};
use loan_classifiers::error::TableError;
use loan_classifiers::evaluation::{cross_validate, evaluate_design, permutation_importance};
use loan_classifiers::feature_selection::{
    collinear_pairs, outcome_associations, select_feature_subset,
};
use loan_classifiers::io::{read_loan_csv, LoanReaderConfig};
use loan_classifiers::models::pipeline::FittedPipeline;
use loan_classifiers::preprocessing::FeatureEncoding;
use loan_classifiers::report::{
    feature_distributions, render_analysis_report, GradeReport, ModelReport,
};

use crate::analysis::input::AnalysisConfig;
use crate::util::ensure_parent_dir;

/// Results of one analysis run.
#[derive(Debug)]
pub struct AnalysisOutcome {
    pub cleaning: CleaningReport,
    pub grades: Vec<GradeReport>,
}

/// Read the configured data file and analyse it.
pub fn run_analysis(config: &AnalysisConfig) -> Result<AnalysisOutcome> {
    let reader_config = LoanReaderConfig::for_cleaning(&config.cleaning);
    let loans = read_loan_csv(&config.data_file, &reader_config)?;
    analyze_table(&loans.table, config)
}

/// Clean a raw loan table and analyse every configured grade.
///
/// One generator is seeded from `config.seed`; every split, resampling and
/// model fit draws its own seed from it in a fixed order.
pub fn analyze_table(raw: &LoanTable, config: &AnalysisConfig) -> Result<AnalysisOutcome> {
    let (table, cleaning) =
        clean_loans(raw, &config.cleaning).context("Failed to clean loan records")?;
    if table.nrows() == 0 {
        return Err(anyhow!("No loans left after cleaning"));
    }
    table.log_input_data_summary();

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut grades = Vec::with_capacity(config.grades.len());
    for grade in &config.grades {
        let report = analyze_grade(&table, grade, config, &mut rng)
            .with_context(|| format!("Analysis of grade {} failed", grade))?;
        grades.push(report);
    }

    Ok(AnalysisOutcome { cleaning, grades })
}

fn analyze_grade(
    table: &LoanTable,
    grade: &str,
    config: &AnalysisConfig,
    rng: &mut StdRng,
) -> Result<GradeReport> {
    let features = config
        .features
        .features_for(grade)
        .ok_or_else(|| anyhow!("No feature list configured for grade '{}'", grade))?;
    let subset = select_feature_subset(table, grade, &features)?;
    let (train, test) = stratified_split(&subset, config.train_fraction, fields::STATUS, rng.gen())?;

    let (train_good, train_bad) = train.status_counts().ok_or(TableError::Empty)?;
    let (test_good, test_bad) = test.status_counts().ok_or(TableError::Empty)?;
    if train_good == 0 || train_bad == 0 {
        return Err(TableError::SingleClass(format!("the grade {} training set", grade)).into());
    }
    log::info!(
        "Grade {}: {} training loans ({} bad), {} test loans ({} bad)",
        grade,
        train.nrows(),
        train_bad,
        test.nrows(),
        test_bad
    );

    // Diagnostics run on the configured list so an excluded feature still shows up.
    let diagnostic_features: Vec<String> = config
        .features
        .configured_features(grade)
        .map(|f| f.iter().filter(|name| table.has_column(name)).cloned().collect())
        .unwrap_or_else(|| features.clone());
    let diagnostic_table = select_feature_subset(table, grade, &diagnostic_features)?;
    let collinear = collinear_pairs(
        &diagnostic_table,
        &diagnostic_features,
        config.collinearity_threshold,
    )?;
    for pair in &collinear {
        log::warn!(
            "Grade {}: {} and {} are collinear (r = {:.3})",
            grade,
            pair.first,
            pair.second,
            pair.r
        );
    }
    let associations = outcome_associations(&train, &features)?;
    let distributions = if config.report.distribution_plots {
        feature_distributions(&train, &features)?
    } else {
        Vec::new()
    };

    let encoding = FeatureEncoding::fit(&train)?;
    let train_design = encoding.transform(&train)?;
    let test_design = encoding.transform(&test)?;
    let test_has_both_classes = test_good > 0 && test_bad > 0;

    let mut models = Vec::with_capacity(config.models.len());
    for model_config in &config.models {
        let cross_validation = match model_config.resampling {
            Resampling::CrossValidation { folds } => {
                match cross_validate(model_config, &encoding, &train_design, folds, rng.gen()) {
                    Ok(summary) => Some(summary),
                    Err(e) => {
                        log::warn!(
                            "Grade {}: skipping cross-validation of {}: {:#}",
                            grade,
                            model_config.model_type,
                            e
                        );
                        None
                    }
                }
            }
            Resampling::None => None,
        };

        let pipeline =
            FittedPipeline::fit_design(model_config, encoding.clone(), &train_design, rng.gen())?;
        let evaluation = evaluate_design(&pipeline, &test_design, config.thresholds)?;

        let importance_seed: u64 = rng.gen();
        let importance = if config.importance_repeats > 0 && test_has_both_classes {
            Some(permutation_importance(
                &pipeline,
                &test_design,
                config.importance_repeats,
                importance_seed,
            )?)
        } else {
            None
        };

        models.push(ModelReport {
            model_config: model_config.clone(),
            evaluation,
            cross_validation,
            importance,
        });
    }

    Ok(GradeReport {
        grade: grade.to_string(),
        features,
        train_rows: train.nrows(),
        train_bad,
        test_rows: test.nrows(),
        test_bad,
        collinear_pairs: collinear,
        associations,
        distributions,
        models,
    })
}

/// Render the HTML report of a finished run and write it to `path`.
pub fn write_analysis_report(
    outcome: &AnalysisOutcome,
    config: &AnalysisConfig,
    path: &Path,
) -> Result<()> {
    let config_json = serde_json::to_string_pretty(config)?;
    let report = render_analysis_report(
        &outcome.grades,
        &config.report,
        &config_json,
        env!("CARGO_PKG_VERSION"),
    );
    ensure_parent_dir(path)
        .with_context(|| format!("Failed to create directory for {}", path.display()))?;
    report.save_to_file(path)
}
