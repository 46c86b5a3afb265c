use std::fs;
use std::path::Path;

use ndarray::{Array2, ArrayView2};

use crate::approximator::Approximator;
use crate::error::{GridError, Result};

/// Returns the same action values for every input and records each fit.
///
/// Its "weights" are the action values themselves, so a target sync is
/// visible as the target model starting to predict the online values.
#[derive(Clone, Debug)]
pub struct MockApproximator {
    pub q: Vec<f32>,
    pub input_width: usize,
    pub fits: Vec<(Array2<f32>, Array2<f32>)>,
    pub fail_fit: bool,
}

impl MockApproximator {
    pub fn new(q: Vec<f32>, input_width: usize) -> Self {
        MockApproximator {
            q,
            input_width,
            fits: Vec::new(),
            fail_fit: false,
        }
    }
}

impl Approximator for MockApproximator {
    type Weights = Vec<f32>;

    fn predict(&mut self, inputs: ArrayView2<f32>) -> Result<Array2<f32>> {
        if inputs.ncols() != self.input_width {
            return Err(GridError::dimension_mismatch(
                self.input_width.to_string(),
                inputs.ncols().to_string(),
            ));
        }
        let mut output = Array2::zeros((inputs.nrows(), self.q.len()));
        for mut row in output.rows_mut() {
            row.assign(&ndarray::aview1(&self.q));
        }
        Ok(output)
    }

    fn fit(&mut self, inputs: ArrayView2<f32>, targets: ArrayView2<f32>) -> Result<f32> {
        if self.fail_fit {
            return Err(GridError::Approximator("scripted failure".to_string()));
        }
        self.fits.push((inputs.to_owned(), targets.to_owned()));
        Ok(0.5)
    }

    fn weights(&self) -> Vec<f32> {
        self.q.clone()
    }

    fn set_weights(&mut self, weights: Vec<f32>) -> Result<()> {
        self.q = weights;
        Ok(())
    }

    fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string(&(&self.q, self.input_width))?)?;
        Ok(())
    }

    fn load(path: &Path) -> Result<Self> {
        let (q, input_width): (Vec<f32>, usize) = serde_json::from_str(&fs::read_to_string(path)?)?;
        Ok(MockApproximator::new(q, input_width))
    }
}
