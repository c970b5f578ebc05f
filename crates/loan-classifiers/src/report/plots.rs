use plotly::common::{DashType, Line, Marker, Mode};
use plotly::layout::{Axis, BarMode, Layout};
use plotly::{Bar, Histogram, Plot, Scatter};

use crate::evaluation::{Evaluation, FeatureImportance};
use crate::report::FeatureDistribution;

fn diagonal() -> Box<Scatter<f64, f64>> {
    Scatter::new(vec![0.0, 1.0], vec![0.0, 1.0])
        .mode(Mode::Lines)
        .name("Chance")
        .line(Line::new().color("grey").dash(DashType::Dash))
}

/// ROC curve of one model with the annotation threshold marked.
pub fn plot_roc_curve(evaluation: &Evaluation, title: &str) -> Plot {
    let mut plot = Plot::new();
    plot.add_trace(
        Scatter::new(
            evaluation.roc.false_positive_rates(),
            evaluation.roc.true_positive_rates(),
        )
        .mode(Mode::Lines)
        .name(&format!("AUC = {:.3}", evaluation.roc.auc)),
    );
    plot.add_trace(diagonal());

    if let Some(point) = evaluation.annotated_point {
        let label = format!(
            "p >= {} (sens {:.2}, spec {:.2})",
            evaluation.thresholds.roc_annotation,
            point.true_positive_rate,
            1.0 - point.false_positive_rate
        );
        plot.add_trace(
            Scatter::new(vec![point.false_positive_rate], vec![point.true_positive_rate])
                .mode(Mode::Markers)
                .marker(Marker::new().size(12).color("red"))
                .name(&label),
        );
    }

    plot.set_layout(
        Layout::new()
            .title(title)
            .x_axis(Axis::new().title("False positive rate (1 - specificity)"))
            .y_axis(Axis::new().title("True positive rate (sensitivity)")),
    );
    plot
}

/// All models of one grade on a single ROC chart.
pub fn plot_roc_comparison(evaluations: &[&Evaluation], title: &str) -> Plot {
    let mut plot = Plot::new();
    for evaluation in evaluations {
        plot.add_trace(
            Scatter::new(
                evaluation.roc.false_positive_rates(),
                evaluation.roc.true_positive_rates(),
            )
            .mode(Mode::Lines)
            .name(&format!("{} (AUC {:.3})", evaluation.model, evaluation.roc.auc)),
        );
    }
    plot.add_trace(diagonal());
    plot.set_layout(
        Layout::new()
            .title(title)
            .x_axis(Axis::new().title("False positive rate"))
            .y_axis(Axis::new().title("True positive rate")),
    );
    plot
}

/// Histogram of predicted probabilities split by the observed outcome.
pub fn plot_probability_histogram(evaluation: &Evaluation, title: &str) -> Plot {
    let (bad, good): (Vec<(f64, bool)>, Vec<(f64, bool)>) = evaluation
        .probabilities
        .iter()
        .copied()
        .zip(evaluation.actual.iter().copied())
        .partition(|(_, is_bad)| *is_bad);

    let mut plot = Plot::new();
    plot.add_trace(
        Histogram::new(good.into_iter().map(|(p, _)| p).collect())
            .name("good")
            .opacity(0.6),
    );
    plot.add_trace(
        Histogram::new(bad.into_iter().map(|(p, _)| p).collect())
            .name("bad")
            .opacity(0.6),
    );
    plot.set_layout(
        Layout::new()
            .title(title)
            .bar_mode(BarMode::Overlay)
            .x_axis(Axis::new().title("Predicted probability of bad"))
            .y_axis(Axis::new().title("Loans")),
    );
    plot
}

/// Overlaid histograms of one numeric feature for good and bad loans.
pub fn plot_feature_distribution(distribution: &FeatureDistribution, grade: &str) -> Plot {
    let mut plot = Plot::new();
    plot.add_trace(
        Histogram::new(distribution.good.clone())
            .name("good")
            .opacity(0.6),
    );
    plot.add_trace(Histogram::new(distribution.bad.clone()).name("bad").opacity(0.6));
    plot.set_layout(
        Layout::new()
            .title(format!("Grade {}: {} by status", grade, distribution.feature).as_str())
            .bar_mode(BarMode::Overlay)
            .x_axis(Axis::new().title(distribution.feature.as_str()))
            .y_axis(Axis::new().title("Loans")),
    );
    plot
}

/// Bar chart of permutation importance, most important first.
pub fn plot_importance(importance: &[FeatureImportance], title: &str) -> Plot {
    let features: Vec<String> = importance.iter().map(|i| i.feature.clone()).collect();
    let values: Vec<f64> = importance.iter().map(|i| i.importance_mean).collect();

    let mut plot = Plot::new();
    plot.add_trace(Bar::new(features, values).name("AUC loss"));
    plot.set_layout(
        Layout::new()
            .title(title)
            .x_axis(Axis::new().title("Feature"))
            .y_axis(Axis::new().title("Mean AUC loss when permuted")),
    );
    plot
}
