use anyhow::{anyhow, Result};
use candle_core::{DType, Device, Tensor, Var};
use candle_nn::{AdamW, Linear, Module, Optimizer, ParamsAdamW, VarBuilder, VarMap};
use ndarray::{Array1, Array2};
use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::config::{ModelConfig, ModelType};
use crate::models::classifier_trait::{not_fitted, ClassifierModel};

/// Single hidden layer network: linear -> relu -> linear -> logit.
struct Network {
    hidden: Linear,
    output: Linear,
    _varmap: VarMap,
}

impl Network {
    fn forward(&self, x: &Tensor) -> candle_core::Result<Tensor> {
        let h = self.hidden.forward(x)?.relu()?;
        self.output.forward(&h)?.squeeze(1)
    }
}

/// Feed-forward network trained with AdamW on the logistic loss.
pub struct NeuralNetClassifier {
    network: Option<Network>,
    params: ModelConfig,
    seed: u64,
    device: Device,
}

impl NeuralNetClassifier {
    pub fn new(params: ModelConfig, seed: u64) -> Self {
        NeuralNetClassifier {
            network: None,
            params,
            seed,
            device: Device::Cpu,
        }
    }

    fn to_tensor(&self, x: &Array2<f64>) -> candle_core::Result<Tensor> {
        let values: Vec<f32> = x.iter().map(|&v| v as f32).collect();
        Tensor::from_vec(values, x.dim(), &self.device)
    }
}

/// Seeded uniform(-1/sqrt(fan_in), 1/sqrt(fan_in)) initial weights for one layer.
fn init_layer(
    rng: &mut StdRng,
    fan_in: usize,
    fan_out: usize,
    device: &Device,
) -> candle_core::Result<(Tensor, Tensor)> {
    let bound = 1.0 / (fan_in.max(1) as f32).sqrt();
    let dist = Uniform::new_inclusive(-bound, bound);
    let weight: Vec<f32> = (0..fan_in * fan_out).map(|_| dist.sample(rng)).collect();
    let bias: Vec<f32> = (0..fan_out).map(|_| dist.sample(rng)).collect();
    Ok((
        Tensor::from_vec(weight, (fan_out, fan_in), device)?,
        Tensor::from_vec(bias, fan_out, device)?,
    ))
}

/// Mean of softplus(z) - z * y, the numerically stable logistic loss.
fn logit_loss(logits: &Tensor, targets: &Tensor) -> candle_core::Result<Tensor> {
    let softplus_neg_abs = logits.abs()?.neg()?.exp()?.affine(1.0, 1.0)?.log()?;
    let loss = ((logits.relu()? - logits.mul(targets)?)? + softplus_neg_abs)?;
    loss.mean_all()
}

impl ClassifierModel for NeuralNetClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<bool>) -> Result<()> {
        let ModelType::NeuralNetwork {
            hidden_units,
            learning_rate,
            weight_decay,
            epochs,
            batch_size,
        } = &self.params.model_type
        else {
            return Err(anyhow!(
                "Expected neural network params, got {:?}",
                self.params.model_type
            ));
        };
        let (n_rows, n_features) = x.dim();
        if n_rows == 0 {
            return Err(anyhow!("Neural network needs at least one training row"));
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let varmap = VarMap::new();
        {
            let mut ws = varmap
                .data()
                .lock()
                .map_err(|_| anyhow!("Neural network parameter store is poisoned"))?;
            let (w, b) = init_layer(&mut rng, n_features, *hidden_units, &self.device)?;
            ws.insert("hidden.weight".to_string(), Var::from_tensor(&w)?);
            ws.insert("hidden.bias".to_string(), Var::from_tensor(&b)?);
            let (w, b) = init_layer(&mut rng, *hidden_units, 1, &self.device)?;
            ws.insert("output.weight".to_string(), Var::from_tensor(&w)?);
            ws.insert("output.bias".to_string(), Var::from_tensor(&b)?);
        }
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &self.device);
        let network = Network {
            hidden: candle_nn::linear(n_features, *hidden_units, vb.pp("hidden"))?,
            output: candle_nn::linear(*hidden_units, 1, vb.pp("output"))?,
            _varmap: varmap.clone(),
        };

        let x_t = self.to_tensor(x)?;
        let y_values: Vec<f32> = y.iter().map(|&bad| if bad { 1.0 } else { 0.0 }).collect();
        let y_t = Tensor::from_vec(y_values, n_rows, &self.device)?;

        let params = ParamsAdamW {
            lr: *learning_rate,
            weight_decay: *weight_decay,
            ..Default::default()
        };
        let mut opt = AdamW::new(varmap.all_vars(), params)?;

        let mut order: Vec<u32> = (0..n_rows as u32).collect();
        let batch_size = (*batch_size).max(1);
        for epoch in 0..*epochs {
            order.shuffle(&mut rng);
            let mut total_loss = 0.0f32;
            let mut n_batches = 0;
            for batch in order.chunks(batch_size) {
                let ids = Tensor::from_vec(batch.to_vec(), batch.len(), &self.device)?;
                let xb = x_t.index_select(&ids, 0)?;
                let yb = y_t.index_select(&ids, 0)?;
                let loss = logit_loss(&network.forward(&xb)?, &yb)?;
                opt.backward_step(&loss)?;
                total_loss += loss.to_scalar::<f32>()?;
                n_batches += 1;
            }
            if epoch % 10 == 0 || epoch + 1 == *epochs {
                log::debug!(
                    "nnet epoch {}: mean loss {:.4}",
                    epoch,
                    total_loss / n_batches.max(1) as f32
                );
            }
        }

        self.network = Some(network);
        Ok(())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let network = self.network.as_ref().ok_or_else(|| not_fitted(self.name()))?;
        if x.nrows() == 0 {
            return Ok(Array1::zeros(0));
        }
        let logits = network.forward(&self.to_tensor(x)?)?;
        let proba = candle_nn::ops::sigmoid(&logits)?.to_vec1::<f32>()?;
        Ok(proba.into_iter().map(f64::from).collect())
    }

    fn name(&self) -> &str {
        "nnet"
    }
}
