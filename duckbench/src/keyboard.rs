//! Operator command from the terminal.
//!
//! Each line typed on stdin sets the command from the keys it contains
//! (`z`/`s` forward/back, `q`/`d` left/right, `a`/`e` turn left/right); an
//! empty line stops the robot.

use runtime::{Command, SharedCommand};
use std::io::BufRead;
use std::thread::JoinHandle;
use tracing::{debug, info};

/// Command for the keys held in `keys`. Later keys override earlier ones on
/// the same axis.
pub fn command_for_keys(keys: &str) -> Command {
    let mut command = Command::ZERO;
    for key in keys.chars() {
        match key.to_ascii_lowercase() {
            'z' => command.forward = 0.3,
            's' => command.forward = -0.2,
            'q' => command.lateral = 0.2,
            'd' => command.lateral = -0.2,
            'a' => command.yaw = 0.2,
            'e' => command.yaw = -0.2,
            _ => {}
        }
    }
    command
}

/// Read stdin on a background thread until it closes.
pub fn spawn(command: SharedCommand) -> std::io::Result<JoinHandle<()>> {
    info!("keyboard control: z/s forward/back, q/d left/right, a/e turn, empty line stops");
    std::thread::Builder::new()
        .name("keyboard".into())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                let next = command_for_keys(line.trim());
                debug!(?next, "operator command");
                command.store(next);
            }
        })
}
