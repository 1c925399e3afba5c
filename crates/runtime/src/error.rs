use ml::PolicyError;
use physics::PhysicsError;
use thiserror::Error;

/// Everything that can stop the control loop.
///
/// There is no local recovery for any of these: the loop transitions to its
/// terminal state and the caller decides what to do.
#[derive(Error, Debug)]
pub enum ControlError {
    #[error("shape error: {what} has {actual} entries, expected {expected}")]
    Shape {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("inference error: {0}")]
    Inference(String),
    #[error("substrate error: {0}")]
    Substrate(#[from] PhysicsError),
    #[error("replay exhausted: frame {index} requested, {len} recorded")]
    ReplayExhausted { index: usize, len: usize },
    #[error("invalid permutation table: {0}")]
    InvalidPermutation(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl ControlError {
    /// Short name of the failure class, for operator-facing reports.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Shape { .. } => "ShapeError",
            Self::Inference(_) => "InferenceError",
            Self::Substrate(_) => "SubstrateError",
            Self::ReplayExhausted { .. } => "ReplayExhausted",
            Self::InvalidPermutation(_) => "InvalidPermutation",
            Self::Config(_) => "ConfigError",
            Self::Io(_) => "IoError",
            Self::Serde(_) => "SerializationError",
        }
    }

    pub(crate) fn check_len(
        what: &'static str,
        expected: usize,
        actual: usize,
    ) -> Result<(), Self> {
        if expected == actual {
            Ok(())
        } else {
            Err(Self::Shape {
                what,
                expected,
                actual,
            })
        }
    }
}

impl From<PolicyError> for ControlError {
    fn from(err: PolicyError) -> Self {
        match err {
            PolicyError::Shape {
                what,
                expected,
                actual,
            } => Self::Shape {
                what,
                expected,
                actual,
            },
            other => Self::Inference(other.to_string()),
        }
    }
}

/// A fatal [`ControlError`] together with the tick it happened on.
#[derive(Error, Debug)]
#[error("{kind} at tick {tick}: {error}", kind = .error.kind())]
pub struct LoopFailure {
    pub tick: u64,
    #[source]
    pub error: ControlError,
}
