//! # Q-value approximator contract
//!
//! The agent never looks inside the model that maps observations to
//! action values. Anything that can predict a batch, fit a batch and hand
//! its parameters over for target-network syncing can be plugged in.
//! [`crate::network::NeuralNetwork`] is the implementation shipped with the
//! crate.

use std::path::Path;

use ndarray::{Array2, ArrayView2};

use crate::error::Result;

pub trait Approximator {
    /// Parameter snapshot used to copy the online model into the target model.
    type Weights: Clone;

    /// Action values for a batch of normalized inputs, one row per input.
    fn predict(&mut self, inputs: ArrayView2<f32>) -> Result<Array2<f32>>;

    /// Regress the batch towards `targets` and return the training loss.
    fn fit(&mut self, inputs: ArrayView2<f32>, targets: ArrayView2<f32>) -> Result<f32>;

    fn weights(&self) -> Self::Weights;

    fn set_weights(&mut self, weights: Self::Weights) -> Result<()>;

    fn save(&self, path: &Path) -> Result<()>;

    fn load(path: &Path) -> Result<Self>
    where
        Self: Sized;
}
