//! # Control loop
//!
//! Fixed-rate scheduler tying a [`Substrate`] to a policy. Each fast tick
//! applies the current target pose (through PD torques or position servos),
//! advances the substrate, and every `decimation`-th tick past warmup runs
//! one inference that produces the next target pose.
//!
//! The loop is single-threaded. The only things shared with other threads
//! are the [`SharedCommand`] it reads at the top of every tick and the abort
//! flag it polls once per tick.

use crate::clock::{pace, Clock, StepClock, WallClock};
use crate::command::{Command, SharedCommand};
use crate::error::{ControlError, LoopFailure};
use crate::latency::LatencySimulator;
use crate::observation::ObservationBuilder;
use crate::pd::PdController;
use crate::recorder::{Frame, Recorder};
use crate::replay::{ReplayKind, ReplaySource};
use crate::variant::{Actuation, ObsBlock, RobotVariant};
use ml::PolicyRunner;
use physics::{ActuatorCommand, Substrate};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

const PROGRESS_EVERY: u64 = 500;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Substrate runs, policy output withheld.
    Warmup,
    Active,
    Terminal,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pacing {
    /// Sleep out the rest of every tick period against the wall clock.
    RealTime,
    /// Run as fast as the substrate allows.
    Batch,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    Interrupted,
    TickLimit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks: u64,
    pub inferences: usize,
    pub reason: StopReason,
    /// Real-time ticks that took longer than their period.
    pub overruns: u64,
}

pub struct ControlLoop<'a, S: Substrate> {
    variant: &'a RobotVariant,
    substrate: S,
    policy: PolicyRunner,
    observations: ObservationBuilder<'a>,
    pd: PdController,
    latency: Option<LatencySimulator>,
    clock: Box<dyn Clock + 'a>,
    pacing: Pacing,
    recorder: Option<&'a mut dyn Recorder>,
    replay: Option<ReplaySource>,
    command: SharedCommand,
    abort: Option<Arc<AtomicBool>>,
    max_ticks: Option<u64>,
    warmup: Duration,
    period: Duration,
    phase: Phase,
    /// Clock reading when the loop started; warmup is measured from here.
    origin: Option<Duration>,
    counter: u64,
    inferences: usize,
    overruns: u64,
    /// Policy order.
    prev_action: Vec<f32>,
    /// Physical order.
    neutral: Vec<f32>,
    /// Physical order.
    target: Vec<f32>,
    actuation: ActuatorCommand,
}

impl<'a, S: Substrate> ControlLoop<'a, S> {
    /// Loop in batch pacing, starting in the neutral pose with the variant's
    /// initial command.
    ///
    /// # Errors
    ///
    /// Invalid variant, or a substrate/policy whose dimensions do not match
    /// it.
    pub fn new(
        variant: &'a RobotVariant,
        substrate: S,
        policy: PolicyRunner,
    ) -> Result<Self, ControlError> {
        variant.validate()?;
        let dof = variant.dof();
        ControlError::check_len("substrate joints", dof, substrate.dof())?;

        let observations = ObservationBuilder::new(variant)?;
        ControlError::check_len("policy input", observations.dim(), policy.input_dim())?;
        ControlError::check_len("policy output", dof, policy.output_dim())?;

        let pd = PdController::new(variant.gains(), variant.torque_limit)?;
        Ok(Self {
            variant,
            substrate,
            policy,
            observations,
            pd,
            latency: variant.imu_latency().map(LatencySimulator::new),
            clock: Box::new(StepClock::new()),
            pacing: Pacing::Batch,
            recorder: None,
            replay: None,
            command: SharedCommand::new(Command::from(variant.initial_command)),
            abort: None,
            max_ticks: None,
            warmup: variant.warmup(),
            period: variant.tick_period(),
            phase: Phase::Warmup,
            origin: None,
            counter: 0,
            inferences: 0,
            overruns: 0,
            prev_action: vec![0.0; dof],
            neutral: variant.neutral_pose.clone(),
            target: variant.neutral_pose.clone(),
            actuation: ActuatorCommand::Position(variant.neutral_pose.clone()),
        })
    }

    /// Also installs the matching default clock; call [`Self::with_clock`]
    /// afterwards to override it.
    #[must_use]
    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self.clock = match pacing {
            Pacing::RealTime => Box::new(WallClock::new()),
            Pacing::Batch => Box::new(StepClock::new()),
        };
        self.origin = None;
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: impl Clock + 'a) -> Self {
        self.clock = Box::new(clock);
        self.origin = None;
        self
    }

    #[must_use]
    pub fn with_recorder(mut self, recorder: &'a mut dyn Recorder) -> Self {
        self.recorder = Some(recorder);
        self
    }

    #[must_use]
    pub fn with_replay(mut self, replay: ReplaySource) -> Self {
        self.replay = Some(replay);
        self
    }

    #[must_use]
    pub fn with_command(mut self, command: SharedCommand) -> Self {
        self.command = command;
        self
    }

    #[must_use]
    pub fn with_abort(mut self, abort: Arc<AtomicBool>) -> Self {
        self.abort = Some(abort);
        self
    }

    #[must_use]
    pub fn with_max_ticks(mut self, max_ticks: u64) -> Self {
        self.max_ticks = Some(max_ticks);
        self
    }

    #[must_use]
    pub fn with_warmup(mut self, warmup: Duration) -> Self {
        self.warmup = warmup;
        self
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Completed fast ticks.
    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.counter
    }

    #[must_use]
    pub fn inferences(&self) -> usize {
        self.inferences
    }

    /// Last clipped action, policy order.
    #[must_use]
    pub fn prev_action(&self) -> &[f32] {
        &self.prev_action
    }

    /// Current target pose, physical order.
    #[must_use]
    pub fn target(&self) -> &[f32] {
        &self.target
    }

    /// What was sent to the actuators on the last tick.
    #[must_use]
    pub fn actuation(&self) -> &ActuatorCommand {
        &self.actuation
    }

    #[must_use]
    pub fn command(&self) -> SharedCommand {
        self.command.clone()
    }

    #[must_use]
    pub fn substrate(&self) -> &S {
        &self.substrate
    }

    pub fn substrate_mut(&mut self) -> &mut S {
        &mut self.substrate
    }

    #[must_use]
    pub fn into_substrate(self) -> S {
        self.substrate
    }

    /// Run until interrupted, the tick limit, or the first error.
    ///
    /// Recorded frames are flushed on every exit path.
    ///
    /// # Errors
    ///
    /// The first fatal [`ControlError`] together with the tick it happened
    /// on.
    pub fn run(&mut self) -> Result<RunSummary, LoopFailure> {
        if self.phase == Phase::Terminal {
            return Err(LoopFailure {
                tick: self.counter,
                error: ControlError::Config("control loop already terminated".into()),
            });
        }
        info!(
            variant = %self.variant.name,
            dof = self.variant.dof(),
            decimation = self.variant.decimation,
            period_ms = self.period.as_secs_f64() * 1e3,
            warmup_secs = self.warmup.as_secs_f64(),
            pacing = ?self.pacing,
            "control loop starting"
        );

        if self.origin.is_none() {
            self.origin = Some(self.clock.now());
        }
        let outcome = loop {
            if self.aborted() {
                break Ok(StopReason::Interrupted);
            }
            if self.max_ticks.is_some_and(|max| self.counter >= max) {
                break Ok(StopReason::TickLimit);
            }
            let tick = self.counter + 1;
            if let Err(error) = self.tick() {
                break Err(LoopFailure { tick, error });
            }
            if self.counter % PROGRESS_EVERY == 0 {
                debug!(
                    tick = self.counter,
                    inferences = self.inferences,
                    phase = ?self.phase,
                    "control loop progress"
                );
            }
        };

        self.phase = Phase::Terminal;
        let flushed = self.flush_recorder();
        match outcome {
            Ok(reason) => {
                flushed.map_err(|error| LoopFailure {
                    tick: self.counter,
                    error,
                })?;
                info!(
                    ticks = self.counter,
                    inferences = self.inferences,
                    overruns = self.overruns,
                    ?reason,
                    "control loop stopped"
                );
                Ok(RunSummary {
                    ticks: self.counter,
                    inferences: self.inferences,
                    reason,
                    overruns: self.overruns,
                })
            }
            Err(failure) => {
                if let Err(err) = flushed {
                    warn!(%err, "could not flush recorder after failure");
                }
                error!(
                    tick = failure.tick,
                    kind = failure.error.kind(),
                    error = %failure.error,
                    "control loop failed"
                );
                Err(failure)
            }
        }
    }

    /// One fast tick.
    ///
    /// # Errors
    ///
    /// Any substrate, shape, inference or replay failure.
    pub fn tick(&mut self) -> Result<(), ControlError> {
        let started = self.clock.now();
        let origin = *self.origin.get_or_insert(started);
        let command = self.command.load();

        self.actuation = match self.variant.actuation {
            Actuation::Torque => {
                let state = self.substrate.state()?;
                ActuatorCommand::Torque(self.pd.torque(
                    &self.target,
                    &state.joint_positions,
                    &state.joint_velocities,
                )?)
            }
            Actuation::Position => ActuatorCommand::Position(self.target.clone()),
        };
        self.substrate.set_actuator_target(&self.actuation)?;
        self.substrate
            .step(self.variant.timestep, self.variant.substeps)?;
        self.counter += 1;
        self.clock.tick(self.period);

        if self.phase == Phase::Warmup && self.clock.now().saturating_sub(origin) >= self.warmup {
            self.phase = Phase::Active;
            info!(tick = self.counter, "warmup complete, policy active");
        }
        if self.phase == Phase::Active && self.counter % self.variant.decimation == 0 {
            self.infer(command)?;
        }

        if self.pacing == Pacing::RealTime {
            let elapsed = self.clock.now().saturating_sub(started);
            if let Some(rest) = pace(self.period, elapsed) {
                self.clock.sleep(rest);
            } else {
                self.overruns += 1;
                debug!(
                    tick = self.counter,
                    elapsed_ms = elapsed.as_secs_f64() * 1e3,
                    "tick overran its period"
                );
            }
        }
        Ok(())
    }

    fn infer(&mut self, command: Command) -> Result<(), ControlError> {
        let index = self.inferences;
        let mut state = self.substrate.state()?;
        if self.variant.observation.blocks.contains(&ObsBlock::FootContacts) {
            state.foot_contacts = self
                .variant
                .feet
                .iter()
                .map(|foot| self.substrate.query_contact(foot, &self.variant.floor))
                .collect::<Result<_, _>>()?;
        }

        let replay = self.replay.as_ref().map(|r| (r.kind(), r));
        let mut observation = match replay {
            Some((ReplayKind::Observations, source)) => source.get(index)?.to_vec(),
            _ => self.observations.build(
                &state,
                &self.prev_action,
                command,
                self.latency.as_mut(),
                self.clock.now(),
            )?,
        };
        if let Some(clip) = self.variant.observation.clip {
            clip.clamp_all(&mut observation);
        }

        let mut action = match replay {
            Some((ReplayKind::Actions, source)) => {
                let action = source.get(index)?.to_vec();
                if action.iter().any(|a| !a.is_finite()) {
                    return Err(ControlError::Inference(format!(
                        "replayed action {index} contains non-finite values"
                    )));
                }
                action
            }
            _ => self.policy.infer(&observation)?,
        };
        ControlError::check_len("action", self.variant.dof(), action.len())?;
        self.variant.action_clip.clamp_all(&mut action);

        let physical = self.observations.joint_map().to_physical_order(&action)?;
        let scale = self.variant.action_scale;
        self.target = self
            .neutral
            .iter()
            .zip(&physical)
            .map(|(n, a)| n + a * scale)
            .collect();
        self.prev_action = action;
        self.inferences += 1;

        if let Some(recorder) = self.recorder.as_deref_mut() {
            recorder.record(&Frame {
                tick: self.counter,
                inference: index,
                observation,
                action: self.prev_action.clone(),
                target: self.target.clone(),
                joint_positions: state.joint_positions,
            })?;
        }
        Ok(())
    }

    fn aborted(&self) -> bool {
        self.abort
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    fn flush_recorder(&mut self) -> Result<(), ControlError> {
        match self.recorder.as_deref_mut() {
            Some(recorder) => recorder.flush(),
            None => Ok(()),
        }
    }
}
