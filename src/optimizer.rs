use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::config::OptimizerKind;

pub trait Optimizer {
    /// Called once per minibatch, before any layer is updated.
    fn begin_step(&mut self) {}
    fn update_weights(&mut self, layer: usize, weights: &mut Array2<f32>, gradients: &Array2<f32>, learning_rate: f32);
    fn update_biases(&mut self, layer: usize, biases: &mut Array1<f32>, gradients: &Array1<f32>, learning_rate: f32);
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub enum OptimizerWrapper {
    SGD(SGD),
    Adam(Adam),
}

impl OptimizerWrapper {
    pub fn from_kind(kind: OptimizerKind) -> Self {
        match kind {
            OptimizerKind::Sgd => OptimizerWrapper::SGD(SGD::new()),
            OptimizerKind::Adam => OptimizerWrapper::Adam(Adam::default()),
        }
    }
}

impl Optimizer for OptimizerWrapper {
    fn begin_step(&mut self) {
        match self {
            OptimizerWrapper::SGD(optimizer) => optimizer.begin_step(),
            OptimizerWrapper::Adam(optimizer) => optimizer.begin_step(),
        }
    }

    fn update_weights(&mut self, layer: usize, weights: &mut Array2<f32>, gradients: &Array2<f32>, learning_rate: f32) {
        match self {
            OptimizerWrapper::SGD(optimizer) => optimizer.update_weights(layer, weights, gradients, learning_rate),
            OptimizerWrapper::Adam(optimizer) => optimizer.update_weights(layer, weights, gradients, learning_rate),
        }
    }

    fn update_biases(&mut self, layer: usize, biases: &mut Array1<f32>, gradients: &Array1<f32>, learning_rate: f32) {
        match self {
            OptimizerWrapper::SGD(optimizer) => optimizer.update_biases(layer, biases, gradients, learning_rate),
            OptimizerWrapper::Adam(optimizer) => optimizer.update_biases(layer, biases, gradients, learning_rate),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct SGD;

impl SGD {
    pub fn new() -> SGD {
        SGD
    }
}

impl Optimizer for SGD {
    fn update_weights(&mut self, _layer: usize, weights: &mut Array2<f32>, gradients: &Array2<f32>, learning_rate: f32) {
        weights.zip_mut_with(gradients, |w, &g| *w -= learning_rate * g);
    }

    fn update_biases(&mut self, _layer: usize, biases: &mut Array1<f32>, gradients: &Array1<f32>, learning_rate: f32) {
        biases.zip_mut_with(gradients, |b, &g| *b -= learning_rate * g);
    }
}

/// Adam with per-layer first and second moments, created on first use.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Adam {
    pub beta1: f32,
    pub beta2: f32,
    pub epsilon: f32,
    m_weights: Vec<Option<Array2<f32>>>,
    v_weights: Vec<Option<Array2<f32>>>,
    m_biases: Vec<Option<Array1<f32>>>,
    v_biases: Vec<Option<Array1<f32>>>,
    pub t: i32,
}

impl Adam {
    pub fn new(beta1: f32, beta2: f32, epsilon: f32) -> Self {
        Adam {
            beta1,
            beta2,
            epsilon,
            m_weights: Vec::new(),
            v_weights: Vec::new(),
            m_biases: Vec::new(),
            v_biases: Vec::new(),
            t: 0,
        }
    }

    fn slot<D: Clone>(slots: &mut Vec<Option<D>>, layer: usize, zeros: impl FnOnce() -> D) -> &mut D {
        if slots.len() <= layer {
            slots.resize(layer + 1, None);
        }
        slots[layer].get_or_insert_with(zeros)
    }

    fn bias_correction(&self) -> (f32, f32) {
        let t = self.t.max(1);
        (1.0 - self.beta1.powi(t), 1.0 - self.beta2.powi(t))
    }
}

impl Default for Adam {
    fn default() -> Self {
        Self::new(0.9, 0.999, 1e-8)
    }
}

impl Optimizer for Adam {
    fn begin_step(&mut self) {
        self.t += 1;
    }

    fn update_weights(&mut self, layer: usize, weights: &mut Array2<f32>, gradients: &Array2<f32>, learning_rate: f32) {
        let (beta1, beta2, eps) = (self.beta1, self.beta2, self.epsilon);
        let (c1, c2) = self.bias_correction();
        let dim = weights.dim();

        let m = Self::slot(&mut self.m_weights, layer, || Array2::zeros(dim));
        m.zip_mut_with(gradients, |m, &g| *m = beta1 * *m + (1.0 - beta1) * g);
        let v = Self::slot(&mut self.v_weights, layer, || Array2::zeros(dim));
        v.zip_mut_with(gradients, |v, &g| *v = beta2 * *v + (1.0 - beta2) * g * g);

        ndarray::Zip::from(weights)
            .and(&*m)
            .and(&*v)
            .for_each(|w, &m, &v| *w -= learning_rate * (m / c1) / ((v / c2).sqrt() + eps));
    }

    fn update_biases(&mut self, layer: usize, biases: &mut Array1<f32>, gradients: &Array1<f32>, learning_rate: f32) {
        let (beta1, beta2, eps) = (self.beta1, self.beta2, self.epsilon);
        let (c1, c2) = self.bias_correction();
        let dim = biases.dim();

        let m = Self::slot(&mut self.m_biases, layer, || Array1::zeros(dim));
        m.zip_mut_with(gradients, |m, &g| *m = beta1 * *m + (1.0 - beta1) * g);
        let v = Self::slot(&mut self.v_biases, layer, || Array1::zeros(dim));
        v.zip_mut_with(gradients, |v, &g| *v = beta2 * *v + (1.0 - beta2) * g * g);

        ndarray::Zip::from(biases)
            .and(&*m)
            .and(&*v)
            .for_each(|b, &m, &v| *b -= learning_rate * (m / c1) / ((v / c2).sqrt() + eps));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_sgd_step() {
        let mut sgd = SGD::new();
        let mut weights = array![[1.0, 2.0]];
        sgd.update_weights(0, &mut weights, &array![[1.0, -1.0]], 0.5);
        assert_eq!(weights, array![[0.5, 2.5]]);
    }

    #[test]
    fn test_adam_first_step_moves_by_learning_rate() {
        let mut adam = Adam::default();
        adam.begin_step();
        let mut biases = array![0.0, 0.0];
        adam.update_biases(0, &mut biases, &array![2.0, -3.0], 0.01);
        assert!((biases[0] + 0.01).abs() < 1e-4);
        assert!((biases[1] - 0.01).abs() < 1e-4);
    }

    #[test]
    fn test_adam_keeps_state_per_layer() {
        let mut adam = Adam::default();
        adam.begin_step();
        let mut first = Array2::zeros((2, 3));
        let mut second = Array2::zeros((3, 1));
        adam.update_weights(0, &mut first, &Array2::ones((2, 3)), 0.1);
        adam.update_weights(1, &mut second, &Array2::ones((3, 1)), 0.1);
        assert!(first.iter().all(|&w| w < 0.0));
        assert!(second.iter().all(|&w| w < 0.0));
    }
}
