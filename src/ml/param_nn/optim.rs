//! Adam optimizer and exponential learning-rate decay.

use ndarray::{Array, Dimension, Zip};

use super::network::{LayerGradient, ParamNetwork};

/// Adam with PyTorch defaults (beta1 0.9, beta2 0.999, eps 1e-8, no weight
/// decay). The learning rate is passed on every step so a scheduler can own it.
#[derive(Debug, Clone)]
pub struct Adam {
    beta1: f64,
    beta2: f64,
    epsilon: f64,
    t: i32,
    moments: Vec<LayerMoments>,
}

#[derive(Debug, Clone)]
struct LayerMoments {
    m_weights: ndarray::Array2<f64>,
    v_weights: ndarray::Array2<f64>,
    m_bias: ndarray::Array1<f64>,
    v_bias: ndarray::Array1<f64>,
}

impl Adam {
    pub fn new(network: &ParamNetwork) -> Self {
        let moments = network
            .layers()
            .iter()
            .map(|layer| LayerMoments {
                m_weights: Array::zeros(layer.weights.raw_dim()),
                v_weights: Array::zeros(layer.weights.raw_dim()),
                m_bias: Array::zeros(layer.bias.raw_dim()),
                v_bias: Array::zeros(layer.bias.raw_dim()),
            })
            .collect();
        Self {
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
            t: 0,
            moments,
        }
    }

    /// Number of steps taken.
    pub fn step_count(&self) -> i32 {
        self.t
    }

    pub fn step(&mut self, network: &mut ParamNetwork, grads: &[LayerGradient], lr: f64) {
        self.t += 1;
        let hp = StepParams {
            lr,
            beta1: self.beta1,
            beta2: self.beta2,
            epsilon: self.epsilon,
            bias_correction1: 1.0 - self.beta1.powi(self.t),
            bias_correction2: 1.0 - self.beta2.powi(self.t),
        };
        for ((layer, grad), moments) in network
            .layers_mut()
            .iter_mut()
            .zip(grads)
            .zip(&mut self.moments)
        {
            update(
                &mut layer.weights,
                &grad.weights,
                &mut moments.m_weights,
                &mut moments.v_weights,
                &hp,
            );
            update(
                &mut layer.bias,
                &grad.bias,
                &mut moments.m_bias,
                &mut moments.v_bias,
                &hp,
            );
        }
    }
}

struct StepParams {
    lr: f64,
    beta1: f64,
    beta2: f64,
    epsilon: f64,
    bias_correction1: f64,
    bias_correction2: f64,
}

fn update<D: Dimension>(
    param: &mut Array<f64, D>,
    grad: &Array<f64, D>,
    m: &mut Array<f64, D>,
    v: &mut Array<f64, D>,
    hp: &StepParams,
) {
    let step_size = hp.lr / hp.bias_correction1;
    let bc2_sqrt = hp.bias_correction2.sqrt();
    Zip::from(param)
        .and(grad)
        .and(m)
        .and(v)
        .for_each(|p, &g, m, v| {
            *m = hp.beta1 * *m + (1.0 - hp.beta1) * g;
            *v = hp.beta2 * *v + (1.0 - hp.beta2) * g * g;
            let denom = v.sqrt() / bc2_sqrt + hp.epsilon;
            *p -= step_size * *m / denom;
        });
}

/// Multiplies the learning rate by `gamma` on every step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExponentialLr {
    lr: f64,
    gamma: f64,
}

impl ExponentialLr {
    pub fn new(lr: f64, gamma: f64) -> Self {
        Self { lr, gamma }
    }

    pub fn learning_rate(&self) -> f64 {
        self.lr
    }

    pub fn step(&mut self) {
        self.lr *= self.gamma;
    }
}
