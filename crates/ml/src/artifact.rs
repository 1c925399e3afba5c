use crate::error::PolicyError;

/// A scoring function with fixed input and output dimensionality.
///
/// Implementations may keep internal state (recurrent networks, call
/// counters), hence `&mut self`.
pub trait PolicyArtifact {
    fn input_dim(&self) -> usize;
    fn output_dim(&self) -> usize;
    fn score(&mut self, input: &[f32]) -> Result<Vec<f32>, PolicyError>;
}

impl<P: PolicyArtifact + ?Sized> PolicyArtifact for Box<P> {
    fn input_dim(&self) -> usize {
        (**self).input_dim()
    }

    fn output_dim(&self) -> usize {
        (**self).output_dim()
    }

    fn score(&mut self, input: &[f32]) -> Result<Vec<f32>, PolicyError> {
        (**self).score(input)
    }
}

/// Returns the same action whatever it observes.
#[derive(Clone, Debug)]
pub struct ConstantPolicy {
    input_dim: usize,
    action: Vec<f32>,
}

impl ConstantPolicy {
    #[must_use]
    pub fn new(input_dim: usize, action: Vec<f32>) -> Self {
        Self { input_dim, action }
    }

    /// Always answers with `output_dim` zeros.
    #[must_use]
    pub fn zeros(input_dim: usize, output_dim: usize) -> Self {
        Self::new(input_dim, vec![0.0; output_dim])
    }
}

impl PolicyArtifact for ConstantPolicy {
    fn input_dim(&self) -> usize {
        self.input_dim
    }

    fn output_dim(&self) -> usize {
        self.action.len()
    }

    fn score(&mut self, _input: &[f32]) -> Result<Vec<f32>, PolicyError> {
        Ok(self.action.clone())
    }
}

/// Scorer backed by a closure; handy for scripted behaviour in tests.
pub struct FnPolicy<F> {
    input_dim: usize,
    output_dim: usize,
    f: F,
}

impl<F> FnPolicy<F>
where
    F: FnMut(&[f32]) -> Result<Vec<f32>, PolicyError>,
{
    pub fn new(input_dim: usize, output_dim: usize, f: F) -> Self {
        Self {
            input_dim,
            output_dim,
            f,
        }
    }
}

impl<F> PolicyArtifact for FnPolicy<F>
where
    F: FnMut(&[f32]) -> Result<Vec<f32>, PolicyError>,
{
    fn input_dim(&self) -> usize {
        self.input_dim
    }

    fn output_dim(&self) -> usize {
        self.output_dim
    }

    fn score(&mut self, input: &[f32]) -> Result<Vec<f32>, PolicyError> {
        (self.f)(input)
    }
}
