#![deny(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions, clippy::cast_precision_loss)]
//! # Policy Inference
//!
//! The learned locomotion policy, seen from the control loop: a scoring
//! function from an observation vector to an action vector.
//!
//! -   [`PolicyArtifact`] is the opaque contract every scorer satisfies.
//! -   [`MlpPolicy`] is a dense feed-forward network loaded from a JSON
//!     artifact (or Glorot-initialised for smoke runs).
//! -   [`ConstantPolicy`] and [`FnPolicy`] are deterministic scorers for tests
//!     and dry runs.
//! -   [`PolicyRunner`] wraps an artifact and enforces its input/output
//!     dimensionality and the finiteness of its output. It performs no
//!     clipping; that stays with the caller.

pub mod artifact;
pub mod error;
pub mod nn;
pub mod runner;

pub use artifact::{ConstantPolicy, FnPolicy, PolicyArtifact};
pub use error::PolicyError;
pub use nn::{Activation, Dense, MlpPolicy};
pub use runner::PolicyRunner;
