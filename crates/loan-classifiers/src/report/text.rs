//! Plain-text summaries printed to stdout.
use std::fmt::Write;

use crate::report::{GradeReport, ModelReport};
use crate::stats::ConfusionMatrix;

fn fmt_value(value: f64) -> String {
    if value.is_nan() {
        "NA".to_string()
    } else {
        format!("{:.4}", value)
    }
}

/// Confusion matrix laid out as predictions by reference.
pub fn format_confusion_matrix(cm: &ConfusionMatrix) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "          Reference");
    let _ = writeln!(out, "Prediction {:>8} {:>8}", "good", "bad");
    let _ = writeln!(out, "      good {:>8} {:>8}", cm.true_negative, cm.false_negative);
    let _ = writeln!(out, "      bad  {:>8} {:>8}", cm.false_positive, cm.true_positive);
    out
}

/// Named statistics right-aligned on the colon.
pub fn format_metrics(cm: &ConfusionMatrix) -> String {
    let mut out = String::new();
    for (name, value) in cm.metrics() {
        let _ = writeln!(out, "{:>24} : {}", name, fmt_value(value));
    }
    let _ = writeln!(out, "{:>24} : bad", "'Positive' Class");
    out
}

pub fn format_model_report(grade: &str, model: &ModelReport) -> String {
    let evaluation = &model.evaluation;
    let mut out = String::new();
    let _ = writeln!(out, "===== Grade {}: {} =====", grade, evaluation.model);
    if let Some(cv) = &model.cross_validation {
        let folds: Vec<String> = cv.fold_auc.iter().map(|auc| fmt_value(*auc)).collect();
        let _ = writeln!(
            out,
            "{}-fold CV AUC: {} +/- {} [{}]",
            cv.fold_auc.len(),
            fmt_value(cv.mean_auc),
            fmt_value(cv.std_auc),
            folds.join(", ")
        );
    }
    let _ = writeln!(
        out,
        "Confusion Matrix and Statistics (threshold {})\n",
        evaluation.thresholds.classification
    );
    out.push_str(&format_confusion_matrix(&evaluation.confusion));
    out.push('\n');
    out.push_str(&format_metrics(&evaluation.confusion));
    let _ = writeln!(out, "{:>24} : {}", "AUC", fmt_value(evaluation.roc.auc));
    if let Some(point) = evaluation.annotated_point {
        let _ = writeln!(
            out,
            "{:>24} : sensitivity {}, specificity {}",
            format!("At p >= {}", evaluation.thresholds.roc_annotation),
            fmt_value(point.true_positive_rate),
            fmt_value(1.0 - point.false_positive_rate)
        );
    }
    if let Some(importance) = &model.importance {
        let _ = writeln!(out, "\nVariable importance (mean AUC loss when permuted):");
        for item in importance {
            let _ = writeln!(
                out,
                "{:>24}   {:>8} ({})",
                item.feature,
                fmt_value(item.importance_mean),
                fmt_value(item.importance_std)
            );
        }
    }
    out
}

pub fn format_grade_report(grade: &GradeReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "##### Grade {} #####", grade.grade);
    let _ = writeln!(
        out,
        "Train: {} loans ({} bad), test: {} loans ({} bad)",
        grade.train_rows, grade.train_bad, grade.test_rows, grade.test_bad
    );
    let _ = writeln!(out, "Features: {}", grade.features.join(", "));
    for pair in &grade.collinear_pairs {
        let _ = writeln!(
            out,
            "Warn: {} and {} are highly correlated (r = {:.3})",
            pair.first, pair.second, pair.r
        );
    }
    for model in &grade.models {
        out.push('\n');
        out.push_str(&format_model_report(&grade.grade, model));
    }
    out
}

/// AUC of every model on every grade, one row per grade.
pub fn format_auc_summary(grades: &[GradeReport]) -> String {
    let mut models: Vec<String> = Vec::new();
    for grade in grades {
        for model in &grade.models {
            if !models.contains(&model.evaluation.model) {
                models.push(model.evaluation.model.clone());
            }
        }
    }

    let mut out = String::new();
    let _ = write!(out, "{:<6}", "Grade");
    for name in &models {
        let _ = write!(out, " {:>24}", name);
    }
    out.push('\n');
    for grade in grades {
        let _ = write!(out, "{:<6}", grade.grade);
        for name in &models {
            let auc = grade
                .models
                .iter()
                .find(|m| &m.evaluation.model == name)
                .map(|m| fmt_value(m.evaluation.roc.auc))
                .unwrap_or_else(|| "-".to_string());
            let _ = write!(out, " {:>24}", auc);
        }
        out.push('\n');
    }
    out
}

pub fn print_grade_report(grade: &GradeReport) {
    println!("{}", format_grade_report(grade));
}

pub fn print_auc_summary(grades: &[GradeReport]) {
    println!("----- Test AUC by grade -----");
    print!("{}", format_auc_summary(grades));
    println!("-----------------------------");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confusion_matrix_text() {
        let cm = ConfusionMatrix {
            true_positive: 5,
            false_positive: 3,
            true_negative: 40,
            false_negative: 7,
        };
        let text = format_confusion_matrix(&cm);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[2].trim_start().starts_with("good"));
        assert!(lines[2].ends_with("40        7"));
        assert!(lines[3].ends_with("3        5"));
    }

    #[test]
    fn test_metrics_text_marks_positive_class() {
        let cm = ConfusionMatrix::from_labels(&[true, false], &[true, true]);
        let text = format_metrics(&cm);
        assert!(text.contains("Accuracy : 0.5000"));
        assert!(text.contains("Specificity : NA"));
        assert!(text.contains("'Positive' Class : bad"));
    }
}
