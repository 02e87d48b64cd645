// Motor control module for the two-channel drive base
//
// Provides:
// - H-bridge pin model (direction lines + PWM duty per channel)
// - High-level motor driver API with clamping and calibration

pub mod driver;
pub mod hbridge;

pub use driver::{ActuatorState, MotorDriver};
pub use hbridge::{Channel, ChannelOutput, HBridge, MotorError, SimBridge, SimBridgeProbe};
