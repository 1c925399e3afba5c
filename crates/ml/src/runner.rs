use crate::artifact::PolicyArtifact;
use crate::error::PolicyError;
use tracing::trace;

/// Owns a policy artifact and guards every call to it.
///
/// The runner checks shapes on both sides of the scorer and refuses
/// non-finite actions. It never clips: observation and action clipping belong
/// to the caller so that every call site wraps inference the same way.
pub struct PolicyRunner {
    artifact: Box<dyn PolicyArtifact>,
    calls: u64,
}

impl PolicyRunner {
    #[must_use]
    pub fn new(artifact: Box<dyn PolicyArtifact>) -> Self {
        Self { artifact, calls: 0 }
    }

    #[must_use]
    pub fn input_dim(&self) -> usize {
        self.artifact.input_dim()
    }

    #[must_use]
    pub fn output_dim(&self) -> usize {
        self.artifact.output_dim()
    }

    /// Number of successful inferences so far.
    #[must_use]
    pub fn calls(&self) -> u64 {
        self.calls
    }

    /// Score one observation.
    ///
    /// # Errors
    ///
    /// `Shape` when the observation or the returned action has the wrong
    /// length; `Inference` when the scorer fails or returns non-finite values.
    pub fn infer(&mut self, observation: &[f32]) -> Result<Vec<f32>, PolicyError> {
        if observation.len() != self.input_dim() {
            return Err(PolicyError::Shape {
                what: "observation",
                expected: self.input_dim(),
                actual: observation.len(),
            });
        }

        let action = self.artifact.score(observation).map_err(|err| match err {
            PolicyError::Inference(_) => err,
            other => PolicyError::Inference(other.to_string()),
        })?;

        if action.len() != self.output_dim() {
            return Err(PolicyError::Shape {
                what: "action",
                expected: self.output_dim(),
                actual: action.len(),
            });
        }
        if let Some(index) = action.iter().position(|a| !a.is_finite()) {
            return Err(PolicyError::Inference(format!(
                "non-finite action component {index}: {}",
                action[index]
            )));
        }

        self.calls += 1;
        trace!(call = self.calls, "policy inference");
        Ok(action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ConstantPolicy, FnPolicy};

    #[test]
    fn zero_policy_returns_zeros() {
        let mut runner = PolicyRunner::new(Box::new(ConstantPolicy::zeros(4, 3)));
        assert_eq!(runner.infer(&[1.0; 4]).unwrap(), vec![0.0; 3]);
        assert_eq!(runner.calls(), 1);
    }

    #[test]
    fn wrong_observation_length_is_a_shape_error() {
        let mut runner = PolicyRunner::new(Box::new(ConstantPolicy::zeros(4, 3)));
        let err = runner.infer(&[1.0; 5]).unwrap_err();
        assert!(matches!(err, PolicyError::Shape { expected: 4, actual: 5, .. }));
        assert_eq!(runner.calls(), 0);
    }

    #[test]
    fn wrong_action_length_is_a_shape_error() {
        let scorer = FnPolicy::new(2, 3, |_: &[f32]| Ok(vec![0.0; 2]));
        let mut runner = PolicyRunner::new(Box::new(scorer));
        let err = runner.infer(&[0.0, 0.0]).unwrap_err();
        assert!(matches!(err, PolicyError::Shape { what: "action", .. }));
    }

    #[test]
    fn nan_action_is_an_inference_error() {
        let scorer = FnPolicy::new(1, 2, |_: &[f32]| Ok(vec![0.0, f32::NAN]));
        let mut runner = PolicyRunner::new(Box::new(scorer));
        assert!(matches!(
            runner.infer(&[0.0]),
            Err(PolicyError::Inference(_))
        ));
    }

    #[test]
    fn scorer_failure_becomes_inference_error() {
        let scorer = FnPolicy::new(1, 1, |_: &[f32]| {
            Err(PolicyError::InvalidArtifact("session closed".into()))
        });
        let mut runner = PolicyRunner::new(Box::new(scorer));
        let err = runner.infer(&[0.0]).unwrap_err();
        assert!(matches!(err, PolicyError::Inference(msg) if msg.contains("session closed")));
    }

    #[test]
    fn runner_does_not_clip() {
        let mut runner = PolicyRunner::new(Box::new(ConstantPolicy::new(1, vec![42.0])));
        assert_eq!(runner.infer(&[100.0]).unwrap(), vec![42.0]);
    }
}
