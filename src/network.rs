use std::fs;
use std::path::Path;

use bincode::{deserialize, serialize};
use ndarray::{Array1, Array2, ArrayView2, Axis};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::approximator::Approximator;
use crate::config::NetworkConfig;
use crate::error::{GridError, Result};
use crate::optimizer::{Optimizer, OptimizerWrapper};

/// A fully connected layer: weights, biases and an activation function.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Layer {
    pub weights: Array2<f32>,
    pub biases: Array1<f32>,
    pub activation: Activation,
    #[serde(skip)]
    pre_activation_output: Option<Array2<f32>>,
    #[serde(skip)]
    inputs: Option<Array2<f32>>,
}

impl Layer {
    /// Create a layer with Xavier-uniform weights and zero biases.
    pub fn new<R: Rng + ?Sized>(input_size: usize, output_size: usize, activation: Activation, rng: &mut R) -> Self {
        let bound = (6.0 / (input_size + output_size) as f32).sqrt();
        let weights = Array2::random_using((input_size, output_size), Uniform::new(-bound, bound), rng);
        let biases = Array1::zeros(output_size);
        Layer {
            weights,
            biases,
            activation,
            pre_activation_output: None,
            inputs: None,
        }
    }

    pub fn input_size(&self) -> usize {
        self.weights.nrows()
    }

    pub fn output_size(&self) -> usize {
        self.weights.ncols()
    }

    /// Forward pass for a batch, caching what backpropagation needs.
    fn forward_minibatch(&mut self, inputs: ArrayView2<f32>) -> Array2<f32> {
        self.inputs = Some(inputs.to_owned());
        let mut outputs = inputs.dot(&self.weights) + &self.biases.view().insert_axis(Axis(0));
        self.pre_activation_output = Some(outputs.clone());
        self.activation.apply_minibatch(&mut outputs);
        outputs
    }

    /// Returns the error scaled by the activation derivative plus the
    /// weight and bias gradients.
    fn backward_minibatch(&self, output_errors: ArrayView2<f32>) -> Result<(Array2<f32>, Array2<f32>, Array1<f32>)> {
        let (pre_activation_output, inputs) = match (&self.pre_activation_output, &self.inputs) {
            (Some(pre), Some(inputs)) => (pre, inputs),
            _ => {
                return Err(GridError::Approximator(
                    "backward pass requested before a forward pass".to_string(),
                ))
            }
        };
        let activation_deriv = self.activation.derivative_minibatch(pre_activation_output.view());
        let adjusted_error = &output_errors * &activation_deriv;
        let weight_gradients = inputs.t().dot(&adjusted_error);
        let bias_gradients = adjusted_error.sum_axis(Axis(0));
        Ok((adjusted_error, weight_gradients, bias_gradients))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Activation {
    Relu,
    Linear,
}

impl Activation {
    fn apply_minibatch(&self, inputs: &mut Array2<f32>) {
        match self {
            Activation::Relu => inputs.mapv_inplace(|v| v.max(0.0)),
            Activation::Linear => {}
        }
    }

    fn derivative_minibatch(&self, inputs: ArrayView2<f32>) -> Array2<f32> {
        match self {
            Activation::Relu => inputs.mapv(|v| if v > 0.0 { 1.0 } else { 0.0 }),
            Activation::Linear => Array2::ones(inputs.dim()),
        }
    }
}

/// Multi-layer perceptron mapping observation features to action values.
///
/// Hidden layers use ReLU, the output layer is linear. Training minimizes
/// the mean squared error against the supplied targets.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct NeuralNetwork {
    pub layers: Vec<Layer>,
    pub optimizer: OptimizerWrapper,
    pub learning_rate: f32,
}

impl NeuralNetwork {
    pub fn new<R: Rng + ?Sized>(
        layer_sizes: &[usize],
        optimizer: OptimizerWrapper,
        learning_rate: f32,
        rng: &mut R,
    ) -> Result<Self> {
        if layer_sizes.len() < 2 {
            return Err(GridError::invalid_parameter(
                "layer_sizes",
                "network needs at least an input and an output layer",
            ));
        }
        let last = layer_sizes.len() - 2;
        let layers = layer_sizes
            .windows(2)
            .enumerate()
            .map(|(i, window)| {
                let activation = if i == last { Activation::Linear } else { Activation::Relu };
                Layer::new(window[0], window[1], activation, &mut *rng)
            })
            .collect();
        Ok(NeuralNetwork {
            layers,
            optimizer,
            learning_rate,
        })
    }

    /// Build a Q-network for `inputs` features and `actions` outputs.
    pub fn from_config<R: Rng + ?Sized>(config: &NetworkConfig, inputs: usize, actions: usize, rng: &mut R) -> Result<Self> {
        let mut sizes = Vec::with_capacity(config.hidden_layers.len() + 2);
        sizes.push(inputs);
        sizes.extend_from_slice(&config.hidden_layers);
        sizes.push(actions);
        Self::new(
            &sizes,
            OptimizerWrapper::from_kind(config.optimizer),
            config.learning_rate,
            rng,
        )
    }

    pub fn input_size(&self) -> usize {
        self.layers.first().map(Layer::input_size).unwrap_or(0)
    }

    pub fn output_size(&self) -> usize {
        self.layers.last().map(Layer::output_size).unwrap_or(0)
    }

    fn check_inputs(&self, inputs: &ArrayView2<f32>) -> Result<()> {
        if inputs.ncols() != self.input_size() {
            return Err(GridError::dimension_mismatch(
                format!("{} input features", self.input_size()),
                format!("{}", inputs.ncols()),
            ));
        }
        Ok(())
    }

    fn forward_minibatch(&mut self, inputs: ArrayView2<f32>) -> Array2<f32> {
        let mut current_output = inputs.to_owned();
        for layer in &mut self.layers {
            current_output = layer.forward_minibatch(current_output.view());
        }
        current_output
    }

    /// Gradients for every layer, first layer first.
    fn backward_minibatch(&mut self, output_errors: ArrayView2<f32>) -> Result<Vec<(Array2<f32>, Array1<f32>)>> {
        let mut gradients = Vec::with_capacity(self.layers.len());
        let mut current_error = output_errors.to_owned();

        for (i, layer) in self.layers.iter().enumerate().rev() {
            let (adjusted_error, weight_gradients, bias_gradients) = layer.backward_minibatch(current_error.view())?;
            gradients.push((weight_gradients, bias_gradients));
            if i != 0 {
                current_error = adjusted_error.dot(&layer.weights.t());
            }
        }

        gradients.reverse();
        Ok(gradients)
    }

    /// One gradient step on a batch; returns the pre-update MSE.
    pub fn train_minibatch(&mut self, inputs: ArrayView2<f32>, targets: ArrayView2<f32>) -> Result<f32> {
        let outputs = self.forward_minibatch(inputs);
        if outputs.dim() != targets.dim() {
            return Err(GridError::dimension_mismatch(
                format!("{:?}", outputs.dim()),
                format!("{:?}", targets.dim()),
            ));
        }
        let errors = &outputs - &targets;
        let loss = errors.mapv(|e| e * e).mean().unwrap_or(0.0);

        // d(MSE)/d(output), averaged over the batch
        let scale = 2.0 / (errors.len().max(1) as f32);
        let gradients = self.backward_minibatch((errors * scale).view())?;

        self.optimizer.begin_step();
        let learning_rate = self.learning_rate;
        for (i, (layer, (weight_gradients, bias_gradients))) in self.layers.iter_mut().zip(gradients).enumerate() {
            self.optimizer.update_weights(i, &mut layer.weights, &weight_gradients, learning_rate);
            self.optimizer.update_biases(i, &mut layer.biases, &bias_gradients, learning_rate);
        }
        Ok(loss)
    }
}

/// Layer parameters without caches or optimizer state.
pub type NetworkWeights = Vec<(Array2<f32>, Array1<f32>)>;

impl Approximator for NeuralNetwork {
    type Weights = NetworkWeights;

    fn predict(&mut self, inputs: ArrayView2<f32>) -> Result<Array2<f32>> {
        self.check_inputs(&inputs)?;
        Ok(self.forward_minibatch(inputs))
    }

    fn fit(&mut self, inputs: ArrayView2<f32>, targets: ArrayView2<f32>) -> Result<f32> {
        self.check_inputs(&inputs)?;
        let loss = self.train_minibatch(inputs, targets)?;
        if !loss.is_finite() {
            return Err(GridError::Approximator(format!("loss diverged to {}", loss)));
        }
        Ok(loss)
    }

    fn weights(&self) -> NetworkWeights {
        self.layers
            .iter()
            .map(|layer| (layer.weights.clone(), layer.biases.clone()))
            .collect()
    }

    fn set_weights(&mut self, weights: NetworkWeights) -> Result<()> {
        if weights.len() != self.layers.len() {
            return Err(GridError::dimension_mismatch(
                format!("{} layers", self.layers.len()),
                format!("{} layers", weights.len()),
            ));
        }
        for (layer, (w, b)) in self.layers.iter().zip(&weights) {
            if layer.weights.dim() != w.dim() || layer.biases.dim() != b.dim() {
                return Err(GridError::dimension_mismatch(
                    format!("{:?}", layer.weights.dim()),
                    format!("{:?}", w.dim()),
                ));
            }
        }
        for (layer, (w, b)) in self.layers.iter_mut().zip(weights) {
            layer.weights = w;
            layer.biases = b;
        }
        Ok(())
    }

    /// Serialize layers and optimizer state with bincode.
    fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, serialize(self)?)?;
        Ok(())
    }

    fn load(path: &Path) -> Result<Self> {
        let data = fs::read(path)?;
        Ok(deserialize(&data)?)
    }
}
