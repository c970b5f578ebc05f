//! Standalone HTML reports built with maud, with plotly figures inlined.
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Context, Result};
use maud::{html, Markup, PreEscaped, DOCTYPE};
use plotly::Plot;

use crate::evaluation::{CrossValidationSummary, Evaluation, FeatureImportance};
use crate::report::plots::{
    plot_feature_distribution, plot_importance, plot_probability_histogram, plot_roc_comparison,
    plot_roc_curve,
};
use crate::report::{GradeReport, ModelReport, ReportOptions};
use crate::stats::ConfusionMatrix;

const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.12.1.min.js";

static PLOT_COUNTER: AtomicUsize = AtomicUsize::new(0);

const STYLE: &str = "
body { font-family: Arial, Helvetica, sans-serif; margin: 0 auto; max-width: 1100px; padding: 20px; color: #222; }
header { display: flex; align-items: center; gap: 16px; border-bottom: 2px solid #ddd; margin-bottom: 20px; }
header img { height: 48px; }
section { margin-bottom: 32px; }
h2 { border-bottom: 1px solid #eee; padding-bottom: 4px; }
table { border-collapse: collapse; margin: 8px 0 16px 0; }
th, td { border: 1px solid #ccc; padding: 4px 10px; text-align: right; }
th { background-color: #f0f0f0; }
td.label { text-align: left; }
.code-container { background-color: #f5f5f5; padding: 10px; border-radius: 5px; overflow-x: auto; font-family: monospace; white-space: pre-wrap; }
footer { color: #888; font-size: 0.85em; border-top: 1px solid #ddd; padding-top: 8px; }
";

/// One titled block of the report.
pub struct ReportSection {
    title: String,
    content: Vec<Markup>,
}

impl ReportSection {
    pub fn new(title: &str) -> Self {
        ReportSection {
            title: title.to_string(),
            content: Vec::new(),
        }
    }

    pub fn add_content(&mut self, content: Markup) {
        self.content.push(content);
    }

    /// Embed a plotly figure. The plotly.js bundle is loaded once in the page head.
    pub fn add_plot(&mut self, plot: Plot) {
        let id = format!("plot-{}", PLOT_COUNTER.fetch_add(1, Ordering::Relaxed));
        self.content
            .push(PreEscaped(plot.to_inline_html(Some(id.as_str()))));
    }

    fn render(&self) -> Markup {
        html! {
            section {
                h2 { (self.title) }
                @for block in &self.content {
                    div { (block) }
                }
            }
        }
    }
}

/// A single-page HTML report.
pub struct Report {
    software_name: String,
    version: String,
    logo: Option<String>,
    title: String,
    sections: Vec<ReportSection>,
}

impl Report {
    pub fn new(software_name: &str, version: &str, logo: Option<&str>, title: &str) -> Self {
        Report {
            software_name: software_name.to_string(),
            version: version.to_string(),
            logo: logo.map(str::to_string),
            title: title.to_string(),
            sections: Vec::new(),
        }
    }

    pub fn add_section(&mut self, section: ReportSection) {
        self.sections.push(section);
    }

    pub fn render(&self) -> Markup {
        let generated = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        html! {
            (DOCTYPE)
            html lang="en" {
                head {
                    meta charset="utf-8";
                    title { (self.title) }
                    script src=(PLOTLY_CDN) {}
                    style { (PreEscaped(STYLE)) }
                }
                body {
                    header {
                        @if let Some(logo) = &self.logo {
                            img src=(logo) alt=(self.software_name);
                        }
                        h1 { (self.title) }
                    }
                    @for section in &self.sections {
                        (section.render())
                    }
                    footer {
                        (self.software_name) " v" (self.version) ", generated " (generated)
                    }
                }
            }
        }
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, self.render().into_string())
            .with_context(|| format!("Failed to write report: {}", path.display()))?;
        log::info!("Report written to {}", path.display());
        Ok(())
    }
}

fn fmt_value(value: f64) -> String {
    if value.is_nan() {
        "NA".to_string()
    } else {
        format!("{:.4}", value)
    }
}

/// Confusion matrix with predictions as rows and observations as columns.
pub fn confusion_table(cm: &ConfusionMatrix) -> Markup {
    html! {
        table {
            tr { th {} th colspan="2" { "Reference" } }
            tr { th { "Prediction" } th { "good" } th { "bad" } }
            tr {
                td.label { "good" }
                td { (cm.true_negative) }
                td { (cm.false_negative) }
            }
            tr {
                td.label { "bad" }
                td { (cm.false_positive) }
                td { (cm.true_positive) }
            }
        }
    }
}

pub fn metrics_table(cm: &ConfusionMatrix) -> Markup {
    html! {
        table {
            tr { th { "Statistic" } th { "Value" } }
            @for (name, value) in cm.metrics() {
                tr {
                    td.label { (name) }
                    td { (fmt_value(value)) }
                }
            }
        }
    }
}

fn cross_validation_table(cv: &CrossValidationSummary) -> Markup {
    html! {
        table {
            tr {
                @for k in 0..cv.fold_auc.len() { th { "Fold " (k + 1) } }
                th { "Mean" }
                th { "SD" }
            }
            tr {
                @for auc in &cv.fold_auc { td { (fmt_value(*auc)) } }
                td { (fmt_value(cv.mean_auc)) }
                td { (fmt_value(cv.std_auc)) }
            }
        }
    }
}

fn importance_table(importance: &[FeatureImportance]) -> Markup {
    html! {
        table {
            tr { th { "Feature" } th { "Mean AUC loss" } th { "SD" } }
            @for item in importance {
                tr {
                    td.label { (item.feature) }
                    td { (fmt_value(item.importance_mean)) }
                    td { (fmt_value(item.importance_std)) }
                }
            }
        }
    }
}

fn operating_point(evaluation: &Evaluation) -> Markup {
    html! {
        @if let Some(point) = evaluation.annotated_point {
            p {
                "At a probability threshold of " (evaluation.thresholds.roc_annotation)
                ": sensitivity " (fmt_value(point.true_positive_rate))
                ", specificity " (fmt_value(1.0 - point.false_positive_rate)) "."
            }
        }
    }
}

fn overview_section(grades: &[GradeReport]) -> ReportSection {
    let mut section = ReportSection::new("Overview");
    section.add_content(html! {
        p {
            "Each grade was split into stratified training and test sets. Every model was fitted on the \
             training set and evaluated on the held-out test set with \"bad\" as the positive class."
        }
        table {
            tr {
                th { "Grade" }
                th { "Features" }
                th { "Train (bad)" }
                th { "Test (bad)" }
                th { "Best model" }
                th { "Test AUC" }
            }
            @for grade in grades {
                tr {
                    td.label { (grade.grade) }
                    td { (grade.features.len()) }
                    td { (grade.train_rows) " (" (grade.train_bad) ")" }
                    td { (grade.test_rows) " (" (grade.test_bad) ")" }
                    @match grade.best_model() {
                        Some(best) => {
                            td.label { (best.evaluation.model) }
                            td { (fmt_value(best.evaluation.roc.auc)) }
                        }
                        None => {
                            td.label { "-" }
                            td { "NA" }
                        }
                    }
                }
            }
        }
    });
    section
}

fn model_content(section: &mut ReportSection, grade: &str, model: &ModelReport, options: &ReportOptions) {
    let evaluation = &model.evaluation;
    section.add_content(html! {
        h3 { (evaluation.model) }
        @if let Some(cv) = &model.cross_validation {
            h4 { "Cross-validated AUC on the training set" }
            (cross_validation_table(cv))
        }
        h4 { "Test set, threshold " (evaluation.thresholds.classification) }
        (confusion_table(&evaluation.confusion))
        (metrics_table(&evaluation.confusion))
        (operating_point(evaluation))
    });
    section.add_plot(plot_roc_curve(
        evaluation,
        &format!("Grade {}: {} ROC", grade, evaluation.model),
    ));
    section.add_plot(plot_probability_histogram(
        evaluation,
        &format!("Grade {}: {} predicted probabilities", grade, evaluation.model),
    ));

    if let Some(importance) = &model.importance {
        section.add_content(html! {
            h4 { "Variable importance" }
            (importance_table(importance))
        });
        if options.importance_plots {
            section.add_plot(plot_importance(
                importance,
                &format!("Grade {}: {} variable importance", grade, evaluation.model),
            ));
        }
    }
}

fn grade_section(grade: &GradeReport, options: &ReportOptions) -> ReportSection {
    let mut section = ReportSection::new(&format!("Grade {}", grade.grade));
    section.add_content(html! {
        p {
            (grade.train_rows) " training loans (" (grade.train_bad) " bad), "
            (grade.test_rows) " test loans (" (grade.test_bad) " bad)."
        }
        p { "Features: " (grade.features.join(", ")) }
        @if !grade.collinear_pairs.is_empty() {
            h4 { "Highly correlated numeric features" }
            table {
                tr { th { "Feature" } th { "Feature" } th { "r" } }
                @for pair in &grade.collinear_pairs {
                    tr {
                        td.label { (pair.first) }
                        td.label { (pair.second) }
                        td { (fmt_value(pair.r)) }
                    }
                }
            }
        }
        @if !grade.associations.is_empty() {
            h4 { "Univariate association with a bad outcome" }
            table {
                tr { th { "Feature" } th { "r" } th { "F" } th { "p-value" } }
                @for assoc in &grade.associations {
                    tr {
                        td.label { (assoc.feature) }
                        td { (fmt_value(assoc.r)) }
                        td { (fmt_value(assoc.f_statistic)) }
                        td { (format!("{:.3e}", assoc.p_value)) }
                    }
                }
            }
        }
    });

    if options.distribution_plots {
        for distribution in &grade.distributions {
            section.add_plot(plot_feature_distribution(distribution, &grade.grade));
        }
    }

    if grade.models.len() > 1 {
        let evaluations: Vec<&Evaluation> = grade.models.iter().map(|m| &m.evaluation).collect();
        section.add_plot(plot_roc_comparison(
            &evaluations,
            &format!("Grade {}: ROC comparison", grade.grade),
        ));
    }

    for model in &grade.models {
        model_content(&mut section, &grade.grade, model, options);
    }
    section
}

/// Assemble the full analysis report: an overview, one section per grade
/// and the configuration that produced it.
pub fn render_analysis_report(
    grades: &[GradeReport],
    options: &ReportOptions,
    config_json: &str,
    version: &str,
) -> Report {
    let mut report = Report::new("loanrisk", version, None, "Loan Default Risk Report");
    report.add_section(overview_section(grades));
    for grade in grades {
        report.add_section(grade_section(grade, options));
    }

    let mut config_section = ReportSection::new("Configuration");
    config_section.add_content(html! {
        div class="code-container" {
            pre { code { (config_json) } }
        }
    });
    report.add_section(config_section);
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confusion_table_layout() {
        let cm = ConfusionMatrix {
            true_positive: 11,
            false_positive: 22,
            true_negative: 33,
            false_negative: 44,
        };
        let markup = confusion_table(&cm).into_string();
        let good_row = markup.find("33").unwrap();
        assert!(good_row < markup.find("44").unwrap());
        assert!(markup.find("22").unwrap() < markup.find("11").unwrap());
    }

    #[test]
    fn test_report_renders_sections_and_plots() {
        let mut report = Report::new("loanrisk", "0.1.0", None, "Test Report");
        let mut section = ReportSection::new("Numbers");
        section.add_content(html! { p { "hello <world>" } });
        section.add_plot(Plot::new());
        report.add_section(section);

        let page = report.render().into_string();
        assert!(page.starts_with("<!DOCTYPE html>"));
        assert!(page.contains(PLOTLY_CDN));
        assert!(page.contains("<h2>Numbers</h2>"));
        assert!(page.contains("hello &lt;world&gt;"));
        assert!(page.contains("plot-"));
    }

    #[test]
    fn test_save_to_file() {
        let dir = std::env::temp_dir().join(format!("loanrisk-report-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("report.html");
        Report::new("loanrisk", "0.1.0", None, "Empty").save_to_file(&path).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("Empty"));
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
