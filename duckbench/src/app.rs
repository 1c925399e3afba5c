//! Command line and wiring: variant, substrate, policy, recorder, replay and
//! operator input assembled into a [`ControlLoop`].

use crate::keyboard;
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use ml::{Activation, ConstantPolicy, MlpPolicy, PolicyArtifact, PolicyRunner};
use physics::BipedSim;
use runtime::{
    timestamped_path, Command, ControlLoop, JsonLinesRecorder, NullRecorder, Pacing, Recorder,
    ReplayKind, ReplaySource, RobotVariant, SharedCommand, SineProbe, StepClock, WallClock,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "duckbench", version, about)]
pub struct Cli {
    /// Built-in robot preset (`bdx`, `open_duck_mini_v2`).
    #[arg(long, default_value = "open_duck_mini_v2")]
    pub variant: String,

    /// Load the robot description from a JSON file instead of a preset.
    #[arg(long)]
    pub variant_file: Option<PathBuf>,

    #[command(flatten)]
    pub policy: PolicyChoice,

    /// Replace live observations with a recorded sequence.
    #[arg(long, conflicts_with = "replay_actions")]
    pub replay_obs: Option<PathBuf>,

    /// Replace policy actions with a recorded sequence.
    #[arg(long)]
    pub replay_actions: Option<PathBuf>,

    /// Record inference frames as JSON lines. A directory gets a timestamped
    /// file name.
    #[arg(long)]
    pub record: Option<PathBuf>,

    /// Pace ticks against the wall clock.
    #[arg(long)]
    pub realtime: bool,

    #[arg(long)]
    pub max_ticks: Option<u64>,

    /// Warmup in seconds, overriding the variant.
    #[arg(long)]
    pub warmup: Option<f32>,

    /// Read the velocity command from stdin.
    #[arg(short = 'k', long)]
    pub keyboard: bool,

    /// Initial command: forward, lateral, yaw.
    #[arg(long, num_args = 3, allow_negative_numbers = true, value_names = ["VX", "VY", "WZ"])]
    pub command: Option<Vec<f32>>,

    #[command(subcommand)]
    pub mode: Option<Mode>,
}

#[derive(Args, Debug)]
#[group(multiple = false)]
pub struct PolicyChoice {
    /// Dense network exported as JSON.
    #[arg(long)]
    pub policy: Option<PathBuf>,

    /// Always output zeros (holds the neutral pose).
    #[arg(long)]
    pub zero_policy: bool,

    /// Randomly initialised network with the given seed, for smoke runs.
    #[arg(long, value_name = "SEED")]
    pub random_policy: Option<u64>,
}

#[derive(Subcommand, Debug)]
pub enum Mode {
    /// Sweep one joint with a sine and record command against response.
    Identify {
        /// Physical joint name.
        #[arg(long)]
        dof: String,
        /// rad/s
        #[arg(long, default_value_t = 10.0)]
        move_freq: f32,
        #[arg(long, default_value_t = 0.5)]
        move_amp: f32,
        #[arg(long, default_value_t = 30.0)]
        ctrl_freq: f32,
        #[arg(long, default_value_t = 100.0)]
        sampling_freq: f32,
        /// Seconds.
        #[arg(long, default_value_t = 5.0)]
        duration: f32,
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

/// # Errors
///
/// Configuration problems, I/O failures and the control loop's
/// [`runtime::LoopFailure`].
pub fn run(cli: Cli) -> Result<()> {
    let variant = match &cli.variant_file {
        Some(path) => RobotVariant::from_json_file(path)?,
        None => RobotVariant::preset(&cli.variant)?,
    };

    if let Some(Mode::Identify {
        dof,
        move_freq,
        move_amp,
        ctrl_freq,
        sampling_freq,
        duration,
        out,
    }) = &cli.mode
    {
        let mut probe = SineProbe::for_joint(&variant, dof)?;
        probe.frequency = *move_freq;
        probe.amplitude = *move_amp;
        probe.control_hz = *ctrl_freq;
        probe.sampling_hz = *sampling_freq;
        probe.duration = seconds_arg("--duration", *duration)?;
        let out = out.clone().unwrap_or_else(|| PathBuf::from(format!("{dof}.json")));
        return identify(&variant, &probe, &out, cli.realtime);
    }

    let sim = BipedSim::new(variant.sim_config()?)?;
    let policy = PolicyRunner::new(load_policy(&cli.policy, &variant)?);

    let mut recorder: Box<dyn Recorder> = match &cli.record {
        Some(path) if path.is_dir() => {
            Box::new(JsonLinesRecorder::create(timestamped_path(path, &variant.name))?)
        }
        Some(path) => Box::new(JsonLinesRecorder::create(path)?),
        None => Box::new(NullRecorder),
    };

    let abort = Arc::new(AtomicBool::new(false));
    let flag = abort.clone();
    ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))
        .context("installing Ctrl-C handler")?;

    let pacing = if cli.realtime {
        Pacing::RealTime
    } else {
        Pacing::Batch
    };
    let mut control = ControlLoop::new(&variant, sim, policy)?
        .with_pacing(pacing)
        .with_abort(abort)
        .with_recorder(recorder.as_mut());

    if let Some(replay) = load_replay(&cli)? {
        control = control.with_replay(replay);
    }
    if let Some(max) = cli.max_ticks {
        control = control.with_max_ticks(max);
    }
    if let Some(secs) = cli.warmup {
        control = control.with_warmup(seconds_arg("--warmup", secs)?);
    }
    if let Some(values) = &cli.command {
        control = control.with_command(SharedCommand::new(Command::new(
            values[0], values[1], values[2],
        )));
    }
    if cli.keyboard {
        let _keyboard = keyboard::spawn(control.command()).context("starting keyboard thread")?;
    }
    if !cli.realtime && cli.max_ticks.is_none() {
        warn!("batch run without --max-ticks: stop it with Ctrl-C");
    }

    let summary = control.run()?;
    info!(
        ticks = summary.ticks,
        inferences = summary.inferences,
        overruns = summary.overruns,
        reason = ?summary.reason,
        "run complete"
    );
    Ok(())
}

fn load_policy(choice: &PolicyChoice, variant: &RobotVariant) -> Result<Box<dyn PolicyArtifact>> {
    let (inputs, outputs) = (variant.observation_dim(), variant.dof());
    if let Some(path) = &choice.policy {
        let policy = MlpPolicy::from_file(path)
            .with_context(|| format!("loading policy {}", path.display()))?;
        return Ok(Box::new(policy));
    }
    if let Some(seed) = choice.random_policy {
        info!(seed, "using a randomly initialised policy");
        return Ok(Box::new(MlpPolicy::random(
            &[inputs, 128, 128, outputs],
            Activation::Elu,
            seed,
        )?));
    }
    if !choice.zero_policy {
        info!("no policy given, holding the neutral pose");
    }
    Ok(Box::new(ConstantPolicy::zeros(inputs, outputs)))
}

fn load_replay(cli: &Cli) -> Result<Option<ReplaySource>> {
    let (kind, path) = match (&cli.replay_obs, &cli.replay_actions) {
        (Some(path), _) => (ReplayKind::Observations, path),
        (None, Some(path)) => (ReplayKind::Actions, path),
        (None, None) => return Ok(None),
    };
    let replay = if path.extension().is_some_and(|ext| ext == "jsonl") {
        ReplaySource::from_recording(kind, path)?
    } else {
        ReplaySource::from_json_file(kind, path)?
    };
    Ok(Some(replay))
}

fn identify(variant: &RobotVariant, probe: &SineProbe, out: &Path, realtime: bool) -> Result<()> {
    let mut sim = BipedSim::new(variant.sim_config()?)?;
    let samples = if realtime {
        probe.run(&mut sim, &mut WallClock::new())?
    } else {
        probe.run(&mut sim, &mut StepClock::new())?
    };
    let file = std::fs::File::create(out).with_context(|| format!("creating {}", out.display()))?;
    serde_json::to_writer_pretty(std::io::BufWriter::new(file), &samples)?;
    info!(path = %out.display(), samples = samples.len(), "identification data saved");
    Ok(())
}

/// Non-negative, finite seconds from the command line.
fn seconds_arg(flag: &str, secs: f32) -> Result<Duration> {
    Duration::try_from_secs_f32(secs)
        .with_context(|| format!("{flag} {secs} is not a usable number of seconds"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_command_line() {
        let cli = Cli::try_parse_from([
            "duckbench",
            "--variant",
            "bdx",
            "--zero-policy",
            "--max-ticks",
            "100",
            "--command",
            "0.3",
            "-0.2",
            "0",
            "-k",
        ])
        .unwrap();
        assert_eq!(cli.variant, "bdx");
        assert!(cli.policy.zero_policy);
        assert_eq!(cli.max_ticks, Some(100));
        assert_eq!(cli.command, Some(vec![0.3, -0.2, 0.0]));
        assert!(cli.keyboard);
    }

    #[test]
    fn test_seconds_arg_rejects_unusable_values() {
        assert_eq!(seconds_arg("--warmup", 1.5).unwrap(), Duration::from_millis(1500));
        assert_eq!(seconds_arg("--warmup", 0.0).unwrap(), Duration::ZERO);
        for secs in [-1.0, f32::NAN, f32::INFINITY] {
            let err = seconds_arg("--warmup", secs).unwrap_err();
            assert!(err.to_string().contains("--warmup"), "{err}");
        }
    }

    #[test]
    fn test_policy_flags_are_exclusive() {
        assert!(Cli::try_parse_from(["duckbench", "--zero-policy", "--random-policy", "3"]).is_err());
    }

    #[test]
    fn test_replay_flags_are_exclusive() {
        assert!(Cli::try_parse_from([
            "duckbench",
            "--replay-obs",
            "a.json",
            "--replay-actions",
            "b.json"
        ])
        .is_err());
    }

    #[test]
    fn test_identify_subcommand() {
        let cli = Cli::try_parse_from(["duckbench", "identify", "--dof", "left_knee"]).unwrap();
        assert!(matches!(cli.mode, Some(Mode::Identify { ref dof, .. }) if dof == "left_knee"));
    }

    #[test]
    fn test_default_policy_matches_variant() {
        let variant = RobotVariant::bdx();
        let choice = PolicyChoice {
            policy: None,
            zero_policy: false,
            random_policy: None,
        };
        let policy = load_policy(&choice, &variant).unwrap();
        assert_eq!(policy.input_dim(), variant.observation_dim());
        assert_eq!(policy.output_dim(), 15);
    }
}
