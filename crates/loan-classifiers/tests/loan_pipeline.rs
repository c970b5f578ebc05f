//! End-to-end checks of reading, cleaning, grade selection, splitting and
//! model evaluation on synthetic loan exports.

mod common;

use std::str::FromStr;

use loan_classifiers::cleaning::{clean_loans, CleaningConfig};
use loan_classifiers::config::{ModelConfig, ModelType};
use loan_classifiers::data_handling::{fields, stratified_split, Column, LoanTable, Status};
use loan_classifiers::evaluation::{evaluate, Thresholds};
use loan_classifiers::feature_selection::{select_feature_subset, FeatureSelectionConfig};
use loan_classifiers::io::{parse_loan_csv, LoanReaderConfig};
use loan_classifiers::models::pipeline::FittedPipeline;
use loan_classifiers::preprocessing::transform_all;
use loan_classifiers::report::{
    feature_distributions, render_analysis_report, GradeReport, ModelReport, ReportOptions,
};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn cleaned(records: &[common::Record]) -> LoanTable {
    let csv = parse_loan_csv(&common::to_export_csv(records), &LoanReaderConfig::default()).unwrap();
    assert_eq!(csv.preamble_lines, 1);
    assert_eq!(csv.skipped_rows, 1);
    let (table, _) = clean_loans(&csv.table, &CleaningConfig::default()).unwrap();
    table
}

#[test]
fn cleaning_leaves_no_empty_required_field() {
    init_logger();
    let mut records = common::loan_records(200, 3);
    for (i, record) in records.iter_mut().enumerate() {
        match i % 10 {
            0 => {
                record.insert("emp_length".to_string(), String::new());
            }
            1 => {
                record.insert("last_pymnt_d".to_string(), "NA".to_string());
            }
            2 => {
                record.insert("purpose".to_string(), " ".to_string());
            }
            _ => {}
        }
    }

    let config = CleaningConfig::default();
    let table = cleaned(&records);
    assert_eq!(table.nrows(), 140);
    for field in config.required_dates.iter().chain(&config.required_categorical) {
        let column = table.column(field).unwrap();
        assert!(
            (0..table.nrows()).all(|row| !column.is_missing(row)),
            "{} has a missing value",
            field
        );
    }
}

#[test]
fn maturity_cutoff_is_inclusive() {
    let mut records = common::loan_records(4, 5);
    records[0].insert("issue_d".to_string(), "Feb-2011".to_string());
    records[1].insert("issue_d".to_string(), "Mar-2011".to_string());
    records[2].insert("issue_d".to_string(), "Jan-2011".to_string());
    records[3].insert("issue_d".to_string(), "Dec-2012".to_string());

    let table = cleaned(&records);
    let issued: Vec<String> = table
        .date(fields::ISSUE_D)
        .unwrap()
        .iter()
        .map(|d| d.unwrap().format("%Y-%m").to_string())
        .collect();
    assert_eq!(issued, vec!["2011-02", "2011-01"]);
}

#[test]
fn malformed_rate_drops_row_and_status_is_collapsed() {
    let mut records = common::loan_records(6, 8);
    records[0].insert("int_rate".to_string(), "N/A%".to_string());
    records[1].insert("loan_status".to_string(), "Current".to_string());
    records[2].insert("loan_status".to_string(), "Default".to_string());
    records[3].insert("loan_status".to_string(), "Late (31-120 days)".to_string());
    records[4].insert("loan_status".to_string(), "Fully Paid".to_string());
    records[5].insert("loan_status".to_string(), String::new());

    let table = cleaned(&records);
    assert_eq!(
        table.status().unwrap(),
        &[Status::Good, Status::Bad, Status::Bad, Status::Good]
    );
}

#[test]
fn grade_c_selection_has_no_missing_values() {
    init_logger();
    let mut records = common::loan_records(400, 11);
    for (i, record) in records.iter_mut().enumerate() {
        if i % 7 == 0 {
            record.insert("revol_util".to_string(), String::new());
        }
        if i % 9 == 0 {
            record.insert("dti".to_string(), "NA".to_string());
        }
    }
    let table = cleaned(&records);

    let features = FeatureSelectionConfig::default().features_for("C").unwrap();
    assert!(!features.iter().any(|f| f == fields::FICO_RANGE_HIGH));
    let subset = select_feature_subset(&table, "C", &features).unwrap();

    assert!(subset.nrows() > 50);
    assert!(subset.nrows() < 100);
    assert_eq!(subset.ncols(), features.len() + 1);
    for name in subset.column_names() {
        let column = subset.column(name).unwrap();
        assert!((0..subset.nrows()).all(|row| !column.is_missing(row)));
    }
    let (_, levels) = subset.categorical(fields::VERIFICATION_STATUS).unwrap();
    assert_eq!(levels, &["Not Verified".to_string(), "Verified".to_string()]);
}

#[test]
fn stratified_split_partitions_and_preserves_bad_share() {
    let n = 1000;
    let table = LoanTable::from_columns(vec![
        (
            "id".to_string(),
            Column::Numeric((0..n).map(|i| Some(i as f64)).collect()),
        ),
        (
            "status".to_string(),
            Column::Label(
                (0..n)
                    .map(|i| if i % 4 == 0 { Status::Bad } else { Status::Good })
                    .collect(),
            ),
        ),
    ])
    .unwrap();

    let (train, test) = stratified_split(&table, 0.75, fields::STATUS, 42).unwrap();
    assert_eq!(train.nrows() + test.nrows(), n);

    let (_, train_bad) = train.status_counts().unwrap();
    let share = train_bad as f64 / train.nrows() as f64;
    assert!((share - 0.25).abs() < 0.005, "train bad share {}", share);

    let mut ids: Vec<f64> = train
        .numeric("id")
        .unwrap()
        .iter()
        .chain(test.numeric("id").unwrap())
        .map(|v| v.unwrap())
        .collect();
    ids.sort_by(f64::total_cmp);
    assert_eq!(ids, (0..n).map(|i| i as f64).collect::<Vec<_>>());

    let (again, _) = stratified_split(&table, 0.75, fields::STATUS, 42).unwrap();
    assert_eq!(again, train);
}

#[test]
fn purpose_level_held_out_of_training_encodes_as_zero() {
    let mut records = common::loan_records(400, 31);
    records[1].insert("purpose".to_string(), "wedding".to_string());
    let table = cleaned(&records);

    let features = FeatureSelectionConfig::default().features_for("B").unwrap();
    let subset = select_feature_subset(&table, "B", &features).unwrap();
    let (_, levels) = subset.categorical(fields::PURPOSE).unwrap();
    assert!(levels.iter().any(|l| l == "wedding"));

    let has_wedding = |t: &LoanTable| {
        t.text(fields::PURPOSE)
            .unwrap()
            .iter()
            .any(|p| p.as_deref() == Some("wedding"))
    };
    let (train, test) = (0..64)
        .map(|seed| stratified_split(&subset, 0.75, fields::STATUS, seed).unwrap())
        .find(|(_, test)| has_wedding(test))
        .expect("some seed puts the wedding loan in the test set");
    assert!(!has_wedding(&train));

    let config = ModelConfig::new(ModelType::from_str("logistic").unwrap());
    let pipeline = FittedPipeline::fit(&config, &train, 3).unwrap();
    let names = pipeline.encoding.column_names();
    assert!(names.iter().any(|n| n.starts_with("purpose=")));
    assert!(!names.iter().any(|n| n == "purpose=wedding"));

    let design = pipeline.encoding.transform(&test).unwrap();
    let row = test
        .text(fields::PURPOSE)
        .unwrap()
        .iter()
        .position(|p| p.as_deref() == Some("wedding"))
        .unwrap();
    for (j, name) in names.iter().enumerate() {
        if name.starts_with("purpose=") {
            assert_eq!(design.x[[row, j]], 0.0, "{}", name);
        }
    }

    let scaler = pipeline.scaler.as_ref().expect("logistic regression is centred and scaled");
    let scaled = transform_all(&design.x, scaler);
    assert!(scaled.iter().all(|v| v.is_finite() && v.abs() < 50.0));

    let proba = pipeline.predict_proba(&test).unwrap();
    assert!(proba.iter().all(|p| (0.0..=1.0).contains(p)));
}

#[test]
fn logistic_and_forest_beat_chance_on_grade_b() {
    init_logger();
    let table = cleaned(&common::loan_records(1200, 21));
    let features = FeatureSelectionConfig::default().features_for("B").unwrap();
    let subset = select_feature_subset(&table, "B", &features).unwrap();
    let (train, test) = stratified_split(&subset, 0.75, fields::STATUS, 7).unwrap();

    let mut models = Vec::new();
    for name in ["logistic", "rf"] {
        let config = ModelConfig::new(ModelType::from_str(name).unwrap());
        let pipeline = FittedPipeline::fit(&config, &train, 1).unwrap();
        let evaluation = evaluate(&pipeline, &test, Thresholds::default()).unwrap();
        assert_eq!(evaluation.confusion.total(), test.nrows());
        assert!(evaluation.roc.auc > 0.6, "{} AUC {}", name, evaluation.roc.auc);
        models.push(ModelReport {
            model_config: config,
            evaluation,
            cross_validation: None,
            importance: None,
        });
    }

    let (train_good, train_bad) = train.status_counts().unwrap();
    let (test_good, test_bad) = test.status_counts().unwrap();
    let grade = GradeReport {
        grade: "B".to_string(),
        features: features.clone(),
        train_rows: train_good + train_bad,
        train_bad,
        test_rows: test_good + test_bad,
        test_bad,
        collinear_pairs: Vec::new(),
        associations: Vec::new(),
        distributions: feature_distributions(&subset, &features).unwrap(),
        models,
    };
    let options = ReportOptions {
        distribution_plots: true,
        importance_plots: false,
    };
    let page = render_analysis_report(&[grade], &options, "{}", "0.1.0")
        .render()
        .into_string();
    assert!(page.contains("Grade B"));
    assert!(page.contains("Random Forest"));
    assert!(page.contains("int_rate by status"));
}
