use ndarray::{Array1, Array2, Array3};
use serde::{Deserialize, Serialize};

use crate::env::entity::GridEntity;
use crate::error::{GridError, Result};

pub type Color = [u8; 3];

pub const AGENT_COLOR: Color = [255, 175, 0];
pub const GOAL_COLOR: Color = [0, 255, 0];
pub const HAZARD_COLOR: Color = [0, 0, 255];

/// Largest channel value of an image observation.
pub const PIXEL_MAX: f32 = 255.0;

/// State of the world as seen by the agent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Observation {
    /// `(size, size, 3)` image indexed `[x, y, channel]`
    Image(Array3<u8>),
    /// agent minus goal, then agent minus hazard
    Relative([i32; 4]),
}

impl Observation {
    /// Number of approximator input features this observation flattens to.
    pub fn feature_len(&self) -> usize {
        match self {
            Observation::Image(image) => image.len(),
            Observation::Relative(offsets) => offsets.len(),
        }
    }

    /// Flatten into approximator input, scaling pixels into `[0, 1]`.
    pub fn features(&self) -> Array1<f32> {
        match self {
            Observation::Image(image) => image.iter().map(|&p| p as f32 / PIXEL_MAX).collect(),
            Observation::Relative(offsets) => offsets.iter().map(|&v| v as f32).collect(),
        }
    }
}

/// Stack the normalized features of several observations, one row each.
pub fn stack_features<'a, I>(observations: I) -> Result<Array2<f32>>
where
    I: IntoIterator<Item = &'a Observation>,
{
    let rows: Vec<Array1<f32>> = observations.into_iter().map(Observation::features).collect();
    let width = rows.first().map(|row| row.len()).unwrap_or(0);

    let mut batch = Array2::zeros((rows.len(), width));
    for (i, row) in rows.iter().enumerate() {
        if row.len() != width {
            return Err(GridError::dimension_mismatch(
                format!("{} features", width),
                format!("{} features in row {}", row.len(), i),
            ));
        }
        batch.row_mut(i).assign(row);
    }
    Ok(batch)
}

/// Draw goal, hazard and agent (in that order) onto a black grid.
pub fn render_grid(size: usize, agent: &GridEntity, goal: &GridEntity, hazard: &GridEntity) -> Array3<u8> {
    let mut image = Array3::zeros((size, size, 3));
    for (entity, color) in [(goal, GOAL_COLOR), (hazard, HAZARD_COLOR), (agent, AGENT_COLOR)] {
        for (channel, &value) in color.iter().enumerate() {
            image[[entity.x(), entity.y(), channel]] = value;
        }
    }
    image
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_drawn_last() {
        let agent = GridEntity::at(1, 1, 3).unwrap();
        let goal = GridEntity::at(1, 1, 3).unwrap();
        let hazard = GridEntity::at(0, 2, 3).unwrap();
        let image = render_grid(3, &agent, &goal, &hazard);
        assert_eq!(image[[1, 1, 0]], 255);
        assert_eq!(image[[1, 1, 1]], 175);
        assert_eq!(image[[0, 2, 2]], 255);
        assert_eq!(image.iter().filter(|&&v| v != 0).count(), 3);
    }

    #[test]
    fn test_image_features_are_scaled() {
        let mut image = Array3::zeros((2, 2, 3));
        image[[0, 1, 1]] = 255;
        let features = Observation::Image(image).features();
        assert_eq!(features.len(), 12);
        assert_eq!(features.iter().cloned().fold(0.0f32, f32::max), 1.0);
        assert_eq!(features[4], 1.0);
    }

    #[test]
    fn test_stack_rejects_mixed_widths() {
        let a = Observation::Relative([1, 2, 3, 4]);
        let b = Observation::Image(Array3::zeros((2, 2, 3)));
        assert!(stack_features([&a, &b]).is_err());

        let batch = stack_features([&a, &a]).unwrap();
        assert_eq!(batch.dim(), (2, 4));
        assert_eq!(batch[[1, 3]], 4.0);
    }
}
