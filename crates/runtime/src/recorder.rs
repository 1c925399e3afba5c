//! Append-only sinks for what the loop observed and commanded.

use crate::error::ControlError;
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// One inference step.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Fast tick the inference ran on (1-based).
    pub tick: u64,
    /// Inference index (0-based), the index replay sources are consulted with.
    pub inference: usize,
    pub observation: Vec<f32>,
    /// Policy order, clipped.
    pub action: Vec<f32>,
    /// Physical order.
    pub target: Vec<f32>,
    /// Physical order, measured when the observation was built.
    pub joint_positions: Vec<f32>,
}

pub trait Recorder {
    /// # Errors
    ///
    /// Sink-specific write failures.
    fn record(&mut self, frame: &Frame) -> Result<(), ControlError>;

    /// # Errors
    ///
    /// Sink-specific write failures.
    fn flush(&mut self) -> Result<(), ControlError> {
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct NullRecorder;

impl Recorder for NullRecorder {
    fn record(&mut self, _frame: &Frame) -> Result<(), ControlError> {
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryRecorder {
    frames: Vec<Frame>,
    flushes: usize,
}

impl MemoryRecorder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// How many times the loop flushed this sink.
    #[must_use]
    pub fn flushes(&self) -> usize {
        self.flushes
    }

    #[must_use]
    pub fn into_frames(self) -> Vec<Frame> {
        self.frames
    }
}

impl Recorder for MemoryRecorder {
    fn record(&mut self, frame: &Frame) -> Result<(), ControlError> {
        self.frames.push(frame.clone());
        Ok(())
    }

    fn flush(&mut self) -> Result<(), ControlError> {
        self.flushes += 1;
        Ok(())
    }
}

/// One JSON object per line.
pub struct JsonLinesRecorder {
    path: PathBuf,
    writer: BufWriter<File>,
    written: usize,
}

impl JsonLinesRecorder {
    /// # Errors
    ///
    /// When the file cannot be created.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self, ControlError> {
        let path = path.into();
        let writer = BufWriter::new(File::create(&path)?);
        info!(path = %path.display(), "recording frames");
        Ok(Self {
            path,
            writer,
            written: 0,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Recorder for JsonLinesRecorder {
    fn record(&mut self, frame: &Frame) -> Result<(), ControlError> {
        serde_json::to_writer(&mut self.writer, frame)?;
        self.writer.write_all(b"\n")?;
        self.written += 1;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), ControlError> {
        self.writer.flush()?;
        debug!(frames = self.written, path = %self.path.display(), "recording flushed");
        Ok(())
    }
}

/// `<dir>/<prefix>_<YYYYmmdd_HHMMSS>.jsonl`
#[must_use]
pub fn timestamped_path(dir: impl AsRef<Path>, prefix: &str) -> PathBuf {
    let stamp = Local::now().format("%Y%m%d_%H%M%S");
    dir.as_ref().join(format!("{prefix}_{stamp}.jsonl"))
}

/// Read back a file written by [`JsonLinesRecorder`]. Blank lines are skipped.
///
/// # Errors
///
/// I/O and parse failures.
pub fn read_frames(path: impl AsRef<Path>) -> Result<Vec<Frame>, ControlError> {
    let reader = BufReader::new(File::open(path)?);
    let mut frames = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        frames.push(serde_json::from_str(&line)?);
    }
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(inference: usize) -> Frame {
        Frame {
            tick: inference as u64 + 1,
            inference,
            observation: vec![0.5; 3],
            action: vec![-1.0, 1.0],
            target: vec![0.25, 0.75],
            joint_positions: vec![0.0, 0.1],
        }
    }

    #[test]
    fn test_memory_recorder_keeps_frames() {
        let mut rec = MemoryRecorder::new();
        rec.record(&frame(0)).unwrap();
        rec.record(&frame(1)).unwrap();
        rec.flush().unwrap();
        assert_eq!(rec.frames().len(), 2);
        assert_eq!(rec.frames()[1].inference, 1);
        assert_eq!(rec.flushes(), 1);
    }

    #[test]
    fn test_json_lines_round_trip() {
        let path = std::env::temp_dir().join(format!("frames_{}.jsonl", std::process::id()));
        let mut rec = JsonLinesRecorder::create(&path).unwrap();
        for i in 0..3 {
            rec.record(&frame(i)).unwrap();
        }
        rec.flush().unwrap();
        drop(rec);

        let frames = read_frames(&path).unwrap();
        assert_eq!(frames, vec![frame(0), frame(1), frame(2)]);
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_timestamped_path() {
        let path = timestamped_path("/tmp", "bdx");
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("bdx_"));
        assert!(name.ends_with(".jsonl"));
        assert_eq!(name.len(), "bdx_".len() + 15 + ".jsonl".len());
    }
}
