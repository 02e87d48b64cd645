// H-bridge pin model for the two drive channels
//
// Each channel owns two direction lines (IN1/IN2 on the bridge) and a PWM
// duty on its enable line. Positive speed asserts forward, negative asserts
// reverse, zero de-asserts both. The real GPIO/PWM wiring lives behind the
// `HBridge` trait.

use std::sync::{Arc, Mutex};

use tracing::trace;

use crate::config::MAX_SPEED;

/// The two independently driven outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Left,
    Right,
}

/// Pin-level output for one channel: direction lines plus PWM duty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelOutput {
    pub forward: bool,
    pub reverse: bool,
    pub duty: u8,
}

impl ChannelOutput {
    /// Both direction lines de-asserted, zero duty.
    pub fn idle() -> Self {
        Self::default()
    }

    /// Map a signed speed to pin levels, clamping to the duty ceiling first.
    pub fn from_speed(speed: i32) -> Self {
        let clamped = speed.clamp(-MAX_SPEED, MAX_SPEED);
        match clamped {
            0 => Self::idle(),
            s if s > 0 => Self {
                forward: true,
                reverse: false,
                duty: s as u8,
            },
            s => Self {
                forward: false,
                reverse: true,
                duty: s.unsigned_abs() as u8,
            },
        }
    }

    /// Recover the signed speed this output encodes.
    pub fn signed_speed(&self) -> i16 {
        if self.reverse {
            -(self.duty as i16)
        } else {
            self.duty as i16
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MotorError {
    #[error("drive peripheral fault on {channel:?} channel: {reason}")]
    Peripheral { channel: Channel, reason: String },
}

/// Seam to the GPIO/PWM peripheral driving the bridge.
pub trait HBridge: Send {
    fn apply(&mut self, channel: Channel, output: ChannelOutput) -> Result<(), MotorError>;
}

/// Simulated bridge: records the last output per channel and logs it.
///
/// Probes cloned from the bridge stay valid after the bridge is handed to the
/// driver, which is how tests observe pin state.
#[derive(Debug, Default)]
pub struct SimBridge {
    outputs: Arc<Mutex<[ChannelOutput; 2]>>,
}

/// Read-only view into a [`SimBridge`]'s recorded pin state.
#[derive(Debug, Clone)]
pub struct SimBridgeProbe {
    outputs: Arc<Mutex<[ChannelOutput; 2]>>,
}

impl SimBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn probe(&self) -> SimBridgeProbe {
        SimBridgeProbe {
            outputs: Arc::clone(&self.outputs),
        }
    }
}

impl SimBridgeProbe {
    pub fn output(&self, channel: Channel) -> ChannelOutput {
        let outputs = self.outputs.lock().unwrap();
        match channel {
            Channel::Left => outputs[0],
            Channel::Right => outputs[1],
        }
    }
}

impl HBridge for SimBridge {
    fn apply(&mut self, channel: Channel, output: ChannelOutput) -> Result<(), MotorError> {
        trace!(
            "sim bridge {:?}: fwd={} rev={} duty={}",
            channel, output.forward, output.reverse, output.duty
        );
        let mut outputs = self.outputs.lock().unwrap();
        match channel {
            Channel::Left => outputs[0] = output,
            Channel::Right => outputs[1] = output,
        }
        Ok(())
    }
}
