use std::fmt;

/// Result type for gridworld-dqn operations
pub type Result<T> = std::result::Result<T, GridError>;

/// Main error type for the crate
#[derive(Debug, Clone, PartialEq)]
pub enum GridError {
    /// Action index outside the action space
    InvalidAction {
        action: usize,
        max_actions: usize,
    },

    /// More transitions requested than the replay buffer holds
    InsufficientData {
        requested: usize,
        available: usize,
    },

    /// Invalid parameter value
    InvalidParameter {
        name: String,
        reason: String,
    },

    /// Scripted entity placement out of bounds or overlapping
    InvalidPlacement(String),

    /// Invalid dimensions for operations
    DimensionMismatch {
        expected: String,
        actual: String,
    },

    /// Failure raised by the function approximator
    Approximator(String),

    /// IO errors (file operations)
    IoError(String),

    /// Serialization/deserialization errors
    SerializationError(String),
}

impl fmt::Display for GridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GridError::InvalidAction { action, max_actions } => {
                write!(f, "Invalid action {}: must be less than {}", action, max_actions)
            }
            GridError::InsufficientData { requested, available } => {
                write!(
                    f,
                    "Insufficient data: requested {} transitions, buffer holds {}",
                    requested, available
                )
            }
            GridError::InvalidParameter { name, reason } => {
                write!(f, "Invalid parameter '{}': {}", name, reason)
            }
            GridError::InvalidPlacement(msg) => write!(f, "Invalid placement: {}", msg),
            GridError::DimensionMismatch { expected, actual } => {
                write!(f, "Dimension mismatch: expected {}, got {}", expected, actual)
            }
            GridError::Approximator(msg) => write!(f, "Approximator error: {}", msg),
            GridError::IoError(msg) => write!(f, "IO error: {}", msg),
            GridError::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl std::error::Error for GridError {}

impl From<std::io::Error> for GridError {
    fn from(err: std::io::Error) -> Self {
        GridError::IoError(err.to_string())
    }
}

impl From<bincode::Error> for GridError {
    fn from(err: bincode::Error) -> Self {
        GridError::SerializationError(err.to_string())
    }
}

impl From<serde_json::Error> for GridError {
    fn from(err: serde_json::Error) -> Self {
        GridError::SerializationError(err.to_string())
    }
}

// Helper functions for common error patterns
impl GridError {
    pub fn dimension_mismatch<S: Into<String>>(expected: S, actual: S) -> Self {
        GridError::DimensionMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn invalid_parameter<S: Into<String>>(name: S, reason: S) -> Self {
        GridError::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
