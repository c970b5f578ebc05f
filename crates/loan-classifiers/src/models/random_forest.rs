use anyhow::{anyhow, Result};
use linfa::prelude::*;
use linfa_trees::DecisionTree;
use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::{Rng, SeedableRng};

use crate::config::{ModelConfig, ModelType};
use crate::models::classifier_trait::{not_fitted, ClassifierModel};

/// One bagged tree and the design matrix columns it was grown on.
struct ForestMember {
    tree: DecisionTree<f64, usize>,
    features: Vec<usize>,
}

/// Bagged decision trees with a random feature subset per tree.
///
/// The probability of "bad" is the share of trees that vote bad.
pub struct RandomForestClassifier {
    members: Vec<ForestMember>,
    params: ModelConfig,
    seed: u64,
    oob_error: Option<f64>,
}

impl RandomForestClassifier {
    pub fn new(params: ModelConfig, seed: u64) -> Self {
        RandomForestClassifier {
            members: Vec::new(),
            params,
            seed,
            oob_error: None,
        }
    }

    /// Out-of-bag misclassification rate of the last fit.
    pub fn oob_error(&self) -> Option<f64> {
        self.oob_error
    }
}

impl ClassifierModel for RandomForestClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<bool>) -> Result<()> {
        let ModelType::RandomForest {
            n_trees,
            max_depth,
            mtry,
            min_weight_leaf,
        } = &self.params.model_type
        else {
            return Err(anyhow!(
                "Expected random forest params, got {:?}",
                self.params.model_type
            ));
        };

        let (n_rows, n_features) = x.dim();
        if n_rows == 0 || n_features == 0 {
            return Err(anyhow!("Random forest needs a non-empty design matrix"));
        }
        let mtry = mtry
            .unwrap_or_else(|| (n_features as f64).sqrt().floor() as usize)
            .clamp(1, n_features);
        let labels: Array1<usize> = y.mapv(usize::from);

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut members = Vec::with_capacity(*n_trees);
        let mut oob_votes = vec![(0usize, 0usize); n_rows];

        for _ in 0..*n_trees {
            let rows: Vec<usize> = (0..n_rows).map(|_| rng.gen_range(0..n_rows)).collect();
            let mut features = sample(&mut rng, n_features, mtry).into_vec();
            features.sort_unstable();

            let records = x.select(Axis(0), &rows).select(Axis(1), &features);
            let targets = labels.select(Axis(0), &rows);
            let dataset = Dataset::new(records, targets);

            let tree = DecisionTree::<f64, usize>::params()
                .max_depth(*max_depth)
                .min_weight_leaf(*min_weight_leaf)
                .fit(&dataset)
                .map_err(|e| anyhow!("Decision tree failed to fit: {}", e))?;

            let mut in_bag = vec![false; n_rows];
            for &r in &rows {
                in_bag[r] = true;
            }
            let oob_rows: Vec<usize> = (0..n_rows).filter(|&r| !in_bag[r]).collect();
            if !oob_rows.is_empty() {
                let oob_x = x.select(Axis(0), &oob_rows).select(Axis(1), &features);
                let votes: Array1<usize> = tree.predict(&oob_x);
                for (&row, &vote) in oob_rows.iter().zip(votes.iter()) {
                    oob_votes[row].0 += 1;
                    oob_votes[row].1 += vote;
                }
            }

            members.push(ForestMember { tree, features });
        }

        let scored: Vec<(usize, bool)> = oob_votes
            .iter()
            .enumerate()
            .filter(|(_, (n, _))| *n > 0)
            .map(|(row, (n, bad))| (row, (*bad as f64 / *n as f64 >= 0.5) == y[row]))
            .collect();
        self.oob_error = if scored.is_empty() {
            None
        } else {
            let wrong = scored.iter().filter(|(_, correct)| !correct).count();
            Some(wrong as f64 / scored.len() as f64)
        };
        if let Some(err) = self.oob_error {
            log::debug!("Random forest OOB error: {:.4}", err);
        }

        self.members = members;
        Ok(())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.members.is_empty() {
            return Err(not_fitted(self.name()));
        }
        let mut bad_votes = Array1::<f64>::zeros(x.nrows());
        for member in &self.members {
            let votes: Array1<usize> = member.tree.predict(&x.select(Axis(1), &member.features));
            bad_votes += &votes.mapv(|v| v as f64);
        }
        Ok(bad_votes / self.members.len() as f64)
    }

    fn name(&self) -> &str {
        "rf"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array;
    use std::str::FromStr;

    fn forest(seed: u64) -> RandomForestClassifier {
        let params = ModelConfig::new(ModelType::RandomForest {
            n_trees: 15,
            max_depth: Some(4),
            mtry: Some(2),
            min_weight_leaf: 1.0,
        });
        RandomForestClassifier::new(params, seed)
    }

    #[test]
    fn test_forest_is_deterministic_for_a_seed() {
        let x = Array::from_shape_fn((60, 3), |(i, j)| ((i * (j + 3)) % 17) as f64 + (i / 30) as f64 * 10.0);
        let y: Array1<bool> = (0..60).map(|i| i >= 30).collect();

        let mut a = forest(11);
        let mut b = forest(11);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        let pa = a.predict_proba(&x).unwrap();
        assert_eq!(pa, b.predict_proba(&x).unwrap());
        assert!(pa.iter().all(|p| (0.0..=1.0).contains(p)));
        assert!(a.oob_error().is_some());
    }

    #[test]
    fn test_wrong_params_error() {
        let mut model =
            RandomForestClassifier::new(ModelConfig::new(ModelType::from_str("gbm").unwrap()), 0);
        assert!(model.fit(&Array2::zeros((4, 2)), &Array1::from_elem(4, false)).is_err());
    }
}
