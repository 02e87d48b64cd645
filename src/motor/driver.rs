// High-level motor driver for the two-channel drive base
//
// Maps signed speed pairs onto H-bridge pin outputs and tracks the
// actuator state the watchdog and status reporter read.

use tokio::time::sleep;
use tracing::{debug, info};

use super::hbridge::{Channel, ChannelOutput, HBridge, MotorError};
use crate::config::{CALIBRATION_DRIVE, CALIBRATION_PAUSE, CALIBRATION_SPEED};

/// Current signed speed per channel plus the enabled flag.
///
/// `motors_enabled` doubles as the armed/halted flag: cleared by both the
/// watchdog and an emergency stop, re-asserted by any applied movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ActuatorState {
    pub left_speed: i16,
    pub right_speed: i16,
    pub motors_enabled: bool,
}

pub struct MotorDriver {
    bridge: Box<dyn HBridge>,
    state: ActuatorState,
}

impl MotorDriver {
    pub fn new(bridge: Box<dyn HBridge>) -> Self {
        Self {
            bridge,
            state: ActuatorState::default(),
        }
    }

    /// Apply a signed speed pair. Each value is clamped to the duty ceiling
    /// before it reaches the bridge. Applying a movement re-enables a halted
    /// actuator.
    pub fn set_speeds(&mut self, left: i32, right: i32) -> Result<(), MotorError> {
        let left_out = ChannelOutput::from_speed(left);
        let right_out = ChannelOutput::from_speed(right);

        self.bridge.apply(Channel::Left, left_out)?;
        self.bridge.apply(Channel::Right, right_out)?;

        self.state.left_speed = left_out.signed_speed();
        self.state.right_speed = right_out.signed_speed();
        self.state.motors_enabled = true;

        debug!(
            "Applied speeds: left={}, right={}",
            self.state.left_speed, self.state.right_speed
        );
        Ok(())
    }

    /// Zero both channels and de-assert the direction lines. Does not touch
    /// the enabled flag, and is idempotent.
    pub fn stop(&mut self) -> Result<(), MotorError> {
        self.bridge.apply(Channel::Left, ChannelOutput::idle())?;
        self.bridge.apply(Channel::Right, ChannelOutput::idle())?;
        self.state.left_speed = 0;
        self.state.right_speed = 0;
        debug!("Motors stopped");
        Ok(())
    }

    /// Forced stop: zero both channels and clear the enabled flag. Used by
    /// the watchdog and the emergency stop path.
    pub fn disable(&mut self) -> Result<(), MotorError> {
        self.stop()?;
        self.state.motors_enabled = false;
        Ok(())
    }

    /// Blocking self-test: drive each channel alone at mid speed, then both
    /// together. Holds the whole process for its duration.
    pub async fn calibrate(&mut self) -> Result<(), MotorError> {
        info!("Starting motor calibration");
        let steps: [(i32, i32, &str); 3] = [
            (CALIBRATION_SPEED, 0, "left"),
            (0, CALIBRATION_SPEED, "right"),
            (CALIBRATION_SPEED, CALIBRATION_SPEED, "both"),
        ];
        for (left, right, label) in steps {
            info!("Calibrating {} channel(s)", label);
            self.set_speeds(left, right)?;
            sleep(CALIBRATION_DRIVE).await;
            self.stop()?;
            sleep(CALIBRATION_PAUSE).await;
        }
        info!("Motor calibration complete");
        Ok(())
    }

    pub fn state(&self) -> ActuatorState {
        self.state
    }
}
