// Ports, timeouts, protocol constants
use std::time::Duration;

// TCP port for line-delimited JSON commands
pub const COMMAND_PORT: u16 = 8080;

// TCP port for the multipart JPEG stream
pub const STREAM_PORT: u16 = 81;

// Command timeout for watchdog
pub const CMD_TIMEOUT: Duration = Duration::from_secs(5);

// Watchdog check cadence when the loop is otherwise idle
pub const TICK_INTERVAL: Duration = Duration::from_millis(100);

// Request path token that upgrades a stream connection
pub const STREAM_PATH: &str = "/stream";

// Multipart boundary token for the JPEG stream
pub const STREAM_BOUNDARY: &str = "camroverframe";

// Inter-frame pacing, ~30 fps
pub const FRAME_INTERVAL: Duration = Duration::from_millis(33);

// PWM duty ceiling per drive channel
pub const MAX_SPEED: i32 = 255;

// Calibration self-test: per-step drive speed and timings
pub const CALIBRATION_SPEED: i32 = 150;
pub const CALIBRATION_DRIVE: Duration = Duration::from_millis(300);
pub const CALIBRATION_PAUSE: Duration = Duration::from_millis(200);

// Poll interval while waiting for the network link at startup
pub const LINK_POLL_INTERVAL: Duration = Duration::from_secs(1);

// Simulated camera defaults (also used when V4L2 is compiled in but unselected)
pub const SIM_FRAME_WIDTH: u32 = 320;
pub const SIM_FRAME_HEIGHT: u32 = 240;
pub const SIM_JPEG_QUALITY: u8 = 80;
