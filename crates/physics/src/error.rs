use thiserror::Error;

/// Failures reported by a substrate.
///
/// None of these are retried by the caller: a substrate that failed to step
/// or to report state leaves the robot in an unknown condition.
#[derive(Error, Debug)]
pub enum PhysicsError {
    #[error("{what} has {actual} entries, expected {expected}")]
    Shape {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("simulation diverged: non-finite {0}")]
    NonFinite(&'static str),
    #[error("unknown geometry '{0}'")]
    UnknownGeom(String),
    #[error("hardware error: {0}")]
    Hardware(String),
}

impl PhysicsError {
    /// Shape check shared by every substrate entry point.
    pub fn check_len(what: &'static str, expected: usize, actual: usize) -> Result<(), Self> {
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
