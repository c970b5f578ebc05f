//! Classification metrics with "bad" as the positive class.
use serde::Serialize;
use statrs::distribution::{Beta, Binomial, ContinuousCDF, DiscreteCDF};

/// Counts of a binary confusion matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ConfusionMatrix {
    pub true_positive: usize,
    pub false_positive: usize,
    pub true_negative: usize,
    pub false_negative: usize,
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        f64::NAN
    } else {
        num as f64 / den as f64
    }
}

impl ConfusionMatrix {
    /// Tabulate predicted against actual labels (`true` = bad).
    ///
    /// # Arguments
    ///
    /// * `predicted` - Predicted labels.
    /// * `actual` - Observed labels, same length as `predicted`.
    pub fn from_labels(predicted: &[bool], actual: &[bool]) -> ConfusionMatrix {
        assert_eq!(
            predicted.len(),
            actual.len(),
            "Predicted and actual labels must have the same length"
        );
        let mut cm = ConfusionMatrix::default();
        for (&p, &a) in predicted.iter().zip(actual) {
            match (p, a) {
                (true, true) => cm.true_positive += 1,
                (true, false) => cm.false_positive += 1,
                (false, false) => cm.true_negative += 1,
                (false, true) => cm.false_negative += 1,
            }
        }
        cm
    }

    /// Tabulate after classifying `probability >= threshold` as bad.
    pub fn from_probabilities(probability: &[f64], actual: &[bool], threshold: f64) -> ConfusionMatrix {
        let predicted: Vec<bool> = probability.iter().map(|&p| p >= threshold).collect();
        ConfusionMatrix::from_labels(&predicted, actual)
    }

    pub fn total(&self) -> usize {
        self.true_positive + self.false_positive + self.true_negative + self.false_negative
    }

    fn correct(&self) -> usize {
        self.true_positive + self.true_negative
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.correct(), self.total())
    }

    /// True positive rate (recall).
    pub fn sensitivity(&self) -> f64 {
        ratio(self.true_positive, self.true_positive + self.false_negative)
    }

    /// True negative rate.
    pub fn specificity(&self) -> f64 {
        ratio(self.true_negative, self.true_negative + self.false_positive)
    }

    /// Positive predictive value.
    pub fn precision(&self) -> f64 {
        ratio(self.true_positive, self.true_positive + self.false_positive)
    }

    pub fn negative_predictive_value(&self) -> f64 {
        ratio(self.true_negative, self.true_negative + self.false_negative)
    }

    /// Share of actual positives.
    pub fn prevalence(&self) -> f64 {
        ratio(self.true_positive + self.false_negative, self.total())
    }

    pub fn balanced_accuracy(&self) -> f64 {
        (self.sensitivity() + self.specificity()) / 2.0
    }

    /// Cohen's kappa: agreement beyond what the marginals give by chance.
    pub fn kappa(&self) -> f64 {
        let n = self.total() as f64;
        if n == 0.0 {
            return f64::NAN;
        }
        let observed = self.accuracy();
        let predicted_pos = (self.true_positive + self.false_positive) as f64 / n;
        let actual_pos = (self.true_positive + self.false_negative) as f64 / n;
        let expected = predicted_pos * actual_pos + (1.0 - predicted_pos) * (1.0 - actual_pos);
        if (1.0 - expected).abs() < f64::EPSILON {
            return f64::NAN;
        }
        (observed - expected) / (1.0 - expected)
    }

    /// Accuracy of always predicting the majority class.
    pub fn no_information_rate(&self) -> f64 {
        let prevalence = self.prevalence();
        prevalence.max(1.0 - prevalence)
    }

    /// Exact (Clopper-Pearson) 95% confidence interval for the accuracy.
    pub fn accuracy_ci(&self) -> (f64, f64) {
        let n = self.total();
        let x = self.correct();
        if n == 0 {
            return (f64::NAN, f64::NAN);
        }
        let lower = if x == 0 {
            0.0
        } else {
            Beta::new(x as f64, (n - x) as f64 + 1.0)
                .map(|b| b.inverse_cdf(0.025))
                .unwrap_or(f64::NAN)
        };
        let upper = if x == n {
            1.0
        } else {
            Beta::new(x as f64 + 1.0, (n - x) as f64)
                .map(|b| b.inverse_cdf(0.975))
                .unwrap_or(f64::NAN)
        };
        (lower, upper)
    }

    /// One-sided binomial p-value that accuracy exceeds the no-information rate.
    pub fn accuracy_p_value(&self) -> f64 {
        let n = self.total();
        let x = self.correct();
        if n == 0 {
            return f64::NAN;
        }
        if x == 0 {
            return 1.0;
        }
        match Binomial::new(self.no_information_rate(), n as u64) {
            Ok(dist) => 1.0 - dist.cdf(x as u64 - 1),
            Err(_) => f64::NAN,
        }
    }

    /// Summary statistics in a fixed order for text and HTML reports.
    pub fn metrics(&self) -> Vec<(&'static str, f64)> {
        let (ci_low, ci_high) = self.accuracy_ci();
        vec![
            ("Accuracy", self.accuracy()),
            ("95% CI lower", ci_low),
            ("95% CI upper", ci_high),
            ("No Information Rate", self.no_information_rate()),
            ("P-Value [Acc > NIR]", self.accuracy_p_value()),
            ("Kappa", self.kappa()),
            ("Sensitivity", self.sensitivity()),
            ("Specificity", self.specificity()),
            ("Pos Pred Value", self.precision()),
            ("Neg Pred Value", self.negative_predictive_value()),
            ("Prevalence", self.prevalence()),
            ("Balanced Accuracy", self.balanced_accuracy()),
        ]
    }
}

/// One operating point of a ROC curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RocPoint {
    /// Rows with probability >= threshold are classified bad.
    pub threshold: f64,
    pub false_positive_rate: f64,
    pub true_positive_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RocCurve {
    pub points: Vec<RocPoint>,
    pub auc: f64,
}

impl RocCurve {
    /// The operating point whose threshold is closest to `threshold`.
    pub fn point_at(&self, threshold: f64) -> Option<&RocPoint> {
        self.points
            .iter()
            .filter(|p| p.threshold.is_finite())
            .min_by(|a, b| {
                (a.threshold - threshold)
                    .abs()
                    .total_cmp(&(b.threshold - threshold).abs())
            })
    }

    pub fn false_positive_rates(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.false_positive_rate).collect()
    }

    pub fn true_positive_rates(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.true_positive_rate).collect()
    }
}

/// Compute the ROC curve of `probability` against the `actual` labels.
///
/// One point is emitted per distinct probability, from the strictest
/// threshold (nothing classified bad) to the loosest (everything bad). The
/// area under the curve is integrated with the trapezoid rule, so tied
/// probabilities contribute a diagonal segment. With no positives or no
/// negatives the rates are undefined and `auc` is NaN.
///
/// # Arguments
///
/// * `actual` - Observed labels, `true` for bad.
/// * `probability` - Predicted probability of bad, same length as `actual`.
pub fn roc_curve(actual: &[bool], probability: &[f64]) -> RocCurve {
    assert_eq!(
        actual.len(),
        probability.len(),
        "Labels and probabilities must have the same length"
    );
    let positives = actual.iter().filter(|&&a| a).count();
    let negatives = actual.len() - positives;

    let mut order: Vec<usize> = (0..actual.len()).collect();
    order.sort_by(|&a, &b| probability[b].total_cmp(&probability[a]));

    let mut points = vec![RocPoint {
        threshold: f64::INFINITY,
        false_positive_rate: 0.0,
        true_positive_rate: 0.0,
    }];
    let (mut tp, mut fp) = (0usize, 0usize);
    let mut i = 0;
    while i < order.len() {
        let threshold = probability[order[i]];
        while i < order.len() && probability[order[i]] == threshold {
            if actual[order[i]] {
                tp += 1;
            } else {
                fp += 1;
            }
            i += 1;
        }
        points.push(RocPoint {
            threshold,
            false_positive_rate: ratio(fp, negatives),
            true_positive_rate: ratio(tp, positives),
        });
    }

    let auc = if positives == 0 || negatives == 0 {
        f64::NAN
    } else {
        points
            .windows(2)
            .map(|w| {
                (w[1].false_positive_rate - w[0].false_positive_rate)
                    * (w[1].true_positive_rate + w[0].true_positive_rate)
                    / 2.0
            })
            .sum()
    };

    RocCurve { points, auc }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_confusion_matrix_metrics() {
        let actual = [true, true, true, false, false, false, false, false];
        let predicted = [true, true, false, true, false, false, false, false];
        let cm = ConfusionMatrix::from_labels(&predicted, &actual);
        assert_eq!(
            cm,
            ConfusionMatrix {
                true_positive: 2,
                false_positive: 1,
                true_negative: 4,
                false_negative: 1
            }
        );
        assert!(approx(cm.accuracy(), 0.75));
        assert!(approx(cm.sensitivity(), 2.0 / 3.0));
        assert!(approx(cm.specificity(), 0.8));
        assert!(approx(cm.precision(), 2.0 / 3.0));
        assert!(approx(cm.negative_predictive_value(), 0.8));
        assert!(approx(cm.prevalence(), 0.375));
        // p_o = 0.75, p_e = 0.375 * 0.375 + 0.625 * 0.625 = 0.53125
        assert!(approx(cm.kappa(), (0.75 - 0.53125) / (1.0 - 0.53125)));

        let (lo, hi) = cm.accuracy_ci();
        assert!(lo < 0.75 && 0.75 < hi);
        assert!(cm.accuracy_p_value() > 0.0 && cm.accuracy_p_value() < 1.0);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let cm = ConfusionMatrix::from_probabilities(&[0.5, 0.49], &[true, false], 0.5);
        assert_eq!(cm.true_positive, 1);
        assert_eq!(cm.true_negative, 1);
    }

    #[test]
    fn test_roc_auc() {
        let actual = [false, false, true, true];
        assert!(approx(roc_curve(&actual, &[0.1, 0.2, 0.8, 0.9]).auc, 1.0));
        assert!(approx(roc_curve(&actual, &[0.9, 0.8, 0.2, 0.1]).auc, 0.0));
        assert!(approx(roc_curve(&actual, &[0.5, 0.5, 0.5, 0.5]).auc, 0.5));
        assert!(approx(roc_curve(&actual, &[0.1, 0.4, 0.35, 0.8]).auc, 0.75));
        assert!(roc_curve(&[true, true], &[0.2, 0.3]).auc.is_nan());
    }

    #[test]
    fn test_point_at_nearest_threshold() {
        let curve = roc_curve(&[false, true, false, true], &[0.1, 0.3, 0.6, 0.9]);
        let point = curve.point_at(0.25).unwrap();
        assert_eq!(point.threshold, 0.3);
        assert!(approx(point.true_positive_rate, 1.0));
        assert!(approx(point.false_positive_rate, 0.5));
    }
}
