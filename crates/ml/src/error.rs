use thiserror::Error;

#[derive(Error, Debug)]
pub enum PolicyError {
    #[error("{what} has {actual} entries, expected {expected}")]
    Shape {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("inference failed: {0}")]
    Inference(String),
    #[error("invalid policy artifact: {0}")]
    InvalidArtifact(String),
    #[error("failed to read policy artifact: {0}")]
    Load(#[from] std::io::Error),
    #[error("failed to parse policy artifact: {0}")]
    Parse(#[from] serde_json::Error),
}
