#![deny(clippy::all, clippy::pedantic)]
#![allow(
    clippy::module_name_repetitions,
    clippy::cast_precision_loss,
    clippy::missing_panics_doc
)]
//! # Control Runtime
//!
//! The core of the biped evaluation stack: a fixed-rate loop that steps a
//! [`physics::Substrate`], turns its state into policy observations, runs the
//! policy every few ticks and feeds the resulting target pose back through
//! PD control or position servos.
//!
//! ## Key Components
//!
//! -   **Configuration:** [`RobotVariant`] carries everything robot-specific
//!     (joint orders, neutral pose, gains, observation layout, timing). The
//!     `bdx` and `open_duck_mini_v2` presets are built in; other robots load
//!     from JSON.
//! -   **Joint orders:** [`JointMap`] converts between the physical order of
//!     the simulator or servo bus and the order the policy was trained with.
//! -   **Observation pipeline:** [`ObservationBuilder`] and the
//!     [`LatencySimulator`] that delays the IMU-derived blocks.
//! -   **Actuation:** [`PdController`] and [`compute_torque`].
//! -   **Scheduling:** [`ControlLoop`] with its [`Clock`]s and the [`pace`]
//!     rule, fed by a [`SharedCommand`] and optionally by a [`ReplaySource`],
//!     writing [`Frame`]s to a [`Recorder`].
//! -   **Identification:** [`SineProbe`] sweeps one joint to compare a
//!     substrate's response with its command.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ml::{ConstantPolicy, PolicyRunner};
//! use physics::BipedSim;
//! use runtime::{ControlLoop, RobotVariant};
//!
//! let variant = RobotVariant::open_duck_mini_v2();
//! let sim = BipedSim::new(variant.sim_config()?)?;
//! let policy = PolicyRunner::new(Box::new(ConstantPolicy::zeros(
//!     variant.observation_dim(),
//!     variant.dof(),
//! )));
//! let summary = ControlLoop::new(&variant, sim, policy)?
//!     .with_max_ticks(500)
//!     .run()?;
//! ```

pub mod clock;
pub mod command;
pub mod control_loop;
pub mod error;
pub mod identification;
pub mod joint_map;
pub mod latency;
pub mod observation;
pub mod pd;
pub mod recorder;
pub mod replay;
pub mod variant;

pub use clock::{pace, Clock, StepClock, WallClock};
pub use command::{Command, SharedCommand};
pub use control_loop::{ControlLoop, Pacing, Phase, RunSummary, StopReason};
pub use error::{ControlError, LoopFailure};
pub use identification::{ProbeSample, SineProbe};
pub use joint_map::JointMap;
pub use latency::{LatencyPhase, LatencySimulator};
pub use observation::ObservationBuilder;
pub use pd::{compute_torque, PdController, PdGains};
pub use recorder::{
    read_frames, timestamped_path, Frame, JsonLinesRecorder, MemoryRecorder, NullRecorder,
    Recorder,
};
pub use replay::{ReplayKind, ReplaySource};
pub use variant::{
    Actuation, ClipRange, LegSpec, ObsBlock, ObservationLayout, OrientationMode, RobotVariant,
    PRESETS,
};
