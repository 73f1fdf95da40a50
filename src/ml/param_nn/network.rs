use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis, Zip};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Dropout probability applied after each hidden linear layer while training.
pub const DROPOUT: f64 = 0.1;

/// Fully connected layer `z = x W^T + b`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseLayer {
    /// Shape `[outputs, inputs]`.
    pub weights: Array2<f64>,
    pub bias: Array1<f64>,
}

impl DenseLayer {
    /// Uniform `(-1/sqrt(inputs), 1/sqrt(inputs))` initialisation.
    fn init<R: Rng>(inputs: usize, outputs: usize, rng: &mut R) -> Self {
        let bound = 1.0 / (inputs as f64).sqrt();
        let mut draw = || rng.random_range(-bound..bound);
        let weights = Array2::from_shape_simple_fn((outputs, inputs), &mut draw);
        let bias = Array1::from_shape_simple_fn(outputs, &mut draw);
        Self { weights, bias }
    }

    fn forward(&self, x: ArrayView2<'_, f64>) -> Array2<f64> {
        let mut z = x.dot(&self.weights.t());
        z += &self.bias;
        z
    }

    pub fn inputs(&self) -> usize {
        self.weights.ncols()
    }

    pub fn outputs(&self) -> usize {
        self.weights.nrows()
    }
}

/// Gradient of the loss for one [`DenseLayer`].
#[derive(Debug, Clone)]
pub struct LayerGradient {
    pub weights: Array2<f64>,
    pub bias: Array1<f64>,
}

/// Activations kept from a training forward pass for backpropagation.
#[derive(Debug)]
pub struct ForwardPass {
    /// Input of every layer; `inputs[0]` is the batch itself.
    inputs: Vec<Array2<f64>>,
    /// Hidden pre-activations after dropout.
    dropped: Vec<Array2<f64>>,
    /// Dropout scale per hidden unit: 0 or `1 / (1 - p)`.
    masks: Vec<Array2<f64>>,
    output: Array1<f64>,
}

impl ForwardPass {
    /// Sigmoid outputs, one per event.
    pub fn output(&self) -> ArrayView1<'_, f64> {
        self.output.view()
    }
}

/// Feed-forward network with one probability output per event.
///
/// `Linear(n, n/2) -> Dropout -> ELU -> Linear(n/2, n/2) -> Dropout -> ELU ->
/// Linear(n/2, 1) -> Sigmoid`, with the hidden width at least one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamNetwork {
    layers: Vec<DenseLayer>,
    dropout: f64,
}

impl ParamNetwork {
    pub fn new<R: Rng>(n_inputs: usize, rng: &mut R) -> Self {
        let hidden = (n_inputs / 2).max(1);
        Self {
            layers: vec![
                DenseLayer::init(n_inputs, hidden, rng),
                DenseLayer::init(hidden, hidden, rng),
                DenseLayer::init(hidden, 1, rng),
            ],
            dropout: DROPOUT,
        }
    }

    pub fn n_inputs(&self) -> usize {
        self.layers.first().map_or(0, DenseLayer::inputs)
    }

    pub fn layers(&self) -> &[DenseLayer] {
        &self.layers
    }

    pub(crate) fn layers_mut(&mut self) -> &mut [DenseLayer] {
        &mut self.layers
    }

    /// Check that consecutive layer shapes chain and end in one output.
    pub fn validate(&self) -> Result<(), String> {
        if self.layers.is_empty() {
            return Err("network has no layers".to_string());
        }
        for (idx, layer) in self.layers.iter().enumerate() {
            if layer.bias.len() != layer.outputs() {
                return Err(format!("layer {idx} bias length mismatch"));
            }
            if let Some(next) = self.layers.get(idx + 1)
                && next.inputs() != layer.outputs()
            {
                return Err(format!("layer {} input width mismatch", idx + 1));
            }
        }
        if self.layers.last().map(DenseLayer::outputs) != Some(1) {
            return Err("network must end in a single output".to_string());
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err("dropout must lie in [0, 1)".to_string());
        }
        Ok(())
    }

    /// Inference pass without dropout.
    pub fn predict(&self, x: ArrayView2<'_, f64>) -> Array1<f64> {
        let last = self.layers.len() - 1;
        let mut a = x.to_owned();
        for (idx, layer) in self.layers.iter().enumerate() {
            let z = layer.forward(a.view());
            a = if idx == last { z.mapv(sigmoid) } else { z.mapv(elu) };
        }
        a.column(0).to_owned()
    }

    /// Training pass with dropout masks drawn from `rng`.
    pub fn forward_train<R: Rng>(&self, x: ArrayView2<'_, f64>, rng: &mut R) -> ForwardPass {
        let last = self.layers.len() - 1;
        let keep_scale = 1.0 / (1.0 - self.dropout);
        let mut inputs = vec![x.to_owned()];
        let mut dropped = Vec::with_capacity(last);
        let mut masks = Vec::with_capacity(last);
        let mut output = Array1::zeros(x.nrows());
        for (idx, layer) in self.layers.iter().enumerate() {
            let z = layer.forward(inputs[idx].view());
            if idx == last {
                output = z.column(0).mapv(sigmoid);
                break;
            }
            let mask = z.mapv(|_| {
                if rng.random::<f64>() < self.dropout {
                    0.0
                } else {
                    keep_scale
                }
            });
            let d = &z * &mask;
            inputs.push(d.mapv(elu));
            dropped.push(d);
            masks.push(mask);
        }
        ForwardPass {
            inputs,
            dropped,
            masks,
            output,
        }
    }

    /// Backpropagate `d_output` (loss gradient per sigmoid output) through a
    /// recorded forward pass. Gradients come back in layer order.
    pub fn backward(&self, pass: &ForwardPass, d_output: ArrayView1<'_, f64>) -> Vec<LayerGradient> {
        let last = self.layers.len() - 1;
        let mut grads = Vec::with_capacity(self.layers.len());

        let d_sigmoid = Zip::from(&d_output)
            .and(&pass.output)
            .map_collect(|&d, &p| d * p * (1.0 - p));
        let mut dz = d_sigmoid.insert_axis(Axis(1));

        for idx in (0..=last).rev() {
            let layer = &self.layers[idx];
            grads.push(LayerGradient {
                weights: dz.t().dot(&pass.inputs[idx]),
                bias: dz.sum_axis(Axis(0)),
            });
            if idx == 0 {
                break;
            }
            let da = dz.dot(&layer.weights);
            let hidden = idx - 1;
            let dd = Zip::from(&da)
                .and(&pass.dropped[hidden])
                .map_collect(|&g, &d| g * elu_derivative(d));
            dz = dd * &pass.masks[hidden];
        }
        grads.reverse();
        grads
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

fn elu(x: f64) -> f64 {
    if x > 0.0 { x } else { x.exp_m1() }
}

fn elu_derivative(x: f64) -> f64 {
    if x > 0.0 { 1.0 } else { x.exp() }
}
