//! Pre-recorded observations or actions consulted instead of live ones.

use crate::error::ControlError;
use crate::recorder::read_frames;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplayKind {
    /// Replaces the built observation; the policy still runs.
    Observations,
    /// Replaces the policy output.
    Actions,
}

#[derive(Clone, Debug)]
pub struct ReplaySource {
    kind: ReplayKind,
    frames: Vec<Vec<f32>>,
}

impl ReplaySource {
    #[must_use]
    pub fn new(kind: ReplayKind, frames: Vec<Vec<f32>>) -> Self {
        Self { kind, frames }
    }

    /// Load a JSON array of arrays.
    ///
    /// # Errors
    ///
    /// I/O and parse failures.
    pub fn from_json_file(kind: ReplayKind, path: impl AsRef<Path>) -> Result<Self, ControlError> {
        let path = path.as_ref();
        let frames: Vec<Vec<f32>> = serde_json::from_str(&std::fs::read_to_string(path)?)?;
        info!(path = %path.display(), frames = frames.len(), ?kind, "loaded replay");
        Ok(Self::new(kind, frames))
    }

    /// Take the observations or actions out of a frame recording.
    ///
    /// # Errors
    ///
    /// I/O and parse failures.
    pub fn from_recording(kind: ReplayKind, path: impl AsRef<Path>) -> Result<Self, ControlError> {
        let frames = read_frames(path)?
            .into_iter()
            .map(|frame| match kind {
                ReplayKind::Observations => frame.observation,
                ReplayKind::Actions => frame.action,
            })
            .collect();
        Ok(Self::new(kind, frames))
    }

    #[must_use]
    pub fn kind(&self) -> ReplayKind {
        self.kind
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// # Errors
    ///
    /// `ReplayExhausted` past the last recorded frame.
    pub fn get(&self, index: usize) -> Result<&[f32], ControlError> {
        self.frames
            .get(index)
            .map(Vec::as_slice)
            .ok_or(ControlError::ReplayExhausted {
                index,
                len: self.frames.len(),
            })
    }
}
