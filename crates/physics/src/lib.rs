#![deny(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions, clippy::cast_precision_loss)]
//! # Biped Physics Substrate
//!
//! The substrate layer of the biped evaluation stack: everything the control
//! loop steps, reads from, and commands.
//!
//! ## Key Components
//!
//! -   **Contract:** [`Substrate`] is the boundary the control loop talks to.
//!     It advances time, reports a [`RobotState`], accepts an
//!     [`ActuatorCommand`] and answers contact queries between named
//!     geometries.
//! -   **Simulation:** [`BipedSim`] in the [`simulation`] module is a small
//!     deterministic articulated model (per-joint rotor dynamics, integrated
//!     base orientation, planar leg kinematics for foot contact). It stands in
//!     for a full physics engine in batch runs and tests.
//! -   **Hardware:** [`HardwareSubstrate`] in the [`hardware`] module drives a
//!     servo bus and an IMU behind the same contract.
//! -   **Orientation math:** the [`transform`] module holds the quaternion
//!     helpers the observation pipeline needs (yaw stripping, projected
//!     gravity, MuJoCo component order).
//!
//! ## Usage
//!
//! ```rust,ignore
//! use physics::{ActuatorCommand, BipedSim, SimConfig, Substrate};
//!
//! let mut sim = BipedSim::new(SimConfig::uniform(16))?;
//! sim.set_actuator_target(&ActuatorCommand::Torque(vec![0.0; 16]))?;
//! sim.step(0.01, 1)?;
//! let state = sim.state()?;
//! ```

pub mod error;
pub mod hardware;
pub mod simulation;
pub mod substrate;
pub mod transform;
pub mod types;

pub use error::PhysicsError;
pub use glam::{Quat, Vec3};
pub use hardware::{FootSwitches, HardwareSubstrate, Imu, ImuSample, MotorBus};
pub use simulation::{BipedSim, JointParams, LegGeometry, SimConfig};
pub use substrate::Substrate;
pub use types::{ActuatorCommand, RobotState};
