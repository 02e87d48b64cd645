// Command-staleness watchdog
//
// Without it, an operator link that dies mid-drive would leave the motors
// running at their last commanded speed indefinitely.

use std::time::{Duration, Instant};

use tracing::warn;

use crate::motor::{MotorDriver, MotorError};

pub struct Watchdog {
    last_command: Instant,
    timeout: Duration,
}

impl Watchdog {
    /// Starts armed with a fresh timestamp so the first check after boot
    /// cannot trip before any command had a chance to arrive.
    pub fn new(timeout: Duration) -> Self {
        Self {
            last_command: Instant::now(),
            timeout,
        }
    }

    /// Reset the staleness clock. Called for every successfully dispatched
    /// command, which is also what re-arms a halted actuator.
    pub fn feed(&mut self) {
        self.last_command = Instant::now();
    }

    pub fn stale(&self) -> bool {
        self.last_command.elapsed() > self.timeout
    }

    /// Force-stop the motors if commands have gone stale while they are
    /// enabled. Returns whether it tripped.
    pub fn check(&self, driver: &mut MotorDriver) -> Result<bool, MotorError> {
        if self.stale() && driver.state().motors_enabled {
            warn!(
                "No command for {:.1?} (timeout {:.1?}), forcing motor stop",
                self.last_command.elapsed(),
                self.timeout
            );
            driver.disable()?;
            return Ok(true);
        }
        Ok(false)
    }
}
