// Control core: command dispatch plus the outer service loop
//
// One current-thread task services everything in fixed priority order:
// command connection, then stream connection, then the watchdog tick. An
// accepted connection is served to completion before anything else runs, so
// a live stream starves command reads and the watchdog, and a held command
// connection starves new viewers. That is the intended scheduling model, not
// an accident.

use std::net::IpAddr;
use std::time::Duration;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::time::{interval, sleep};
use tracing::{error, info, warn};

use crate::camera::CameraSource;
use crate::config::{CMD_TIMEOUT, LINK_POLL_INTERVAL, TICK_INTERVAL};
use crate::link::{self, NetworkLink};
use crate::messages::{self, ControlAction, MotorCommand};
use crate::motor::{MotorDriver, MotorError};
use crate::server;
use crate::status::StatusReporter;
use crate::watchdog::Watchdog;

pub struct Runtime {
    driver: MotorDriver,
    watchdog: Watchdog,
    link: Box<dyn NetworkLink>,
    reporter: StatusReporter,
}

impl Runtime {
    pub fn new(driver: MotorDriver, link: Box<dyn NetworkLink>) -> Self {
        Self {
            driver,
            watchdog: Watchdog::new(CMD_TIMEOUT),
            link,
            reporter: StatusReporter::new(),
        }
    }

    pub fn actuator_state(&self) -> crate::motor::ActuatorState {
        self.driver.state()
    }

    /// Handle one trimmed, non-empty command line. Parse failures are logged
    /// and discarded with no state change and no watchdog reset; only reply
    /// transport errors propagate, ending the connection.
    pub async fn handle_line<W>(&mut self, line: &str, reply: &mut W) -> std::io::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        match messages::parse_command(line) {
            Ok(action) => {
                info!("Received command: {:?}", action);
                self.dispatch(action, reply).await
            }
            Err(e) => {
                warn!("Discarding command line: {}", e);
                Ok(())
            }
        }
    }

    async fn dispatch<W>(&mut self, action: ControlAction, reply: &mut W) -> std::io::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        let applied: Result<(), MotorError> = match action {
            ControlAction::EmergencyStop => {
                warn!("Emergency stop: disabling motors");
                self.driver.disable()
            }
            ControlAction::Calibrate => self.driver.calibrate().await,
            ControlAction::Move(cmd) => self.apply_move(cmd).await,
            ControlAction::GetStatus => {
                let snapshot = self.reporter.snapshot(self.link.as_ref(), self.driver.state());
                let json = serde_json::to_string(&snapshot).map_err(std::io::Error::other)?;
                info!("Status: {}", json);
                reply.write_all(json.as_bytes()).await?;
                reply.write_all(b"\n").await?;
                Ok(())
            }
        };

        match applied {
            Ok(()) => self.watchdog.feed(),
            Err(e) => error!("Command not applied: {}", e),
        }
        Ok(())
    }

    /// Apply a movement. A positive duration holds the speeds (blocking the
    /// whole loop) and then force-stops; zero means run until told otherwise.
    async fn apply_move(&mut self, cmd: MotorCommand) -> Result<(), MotorError> {
        self.driver.set_speeds(cmd.left_motor, cmd.right_motor)?;
        if cmd.duration > 0.0 {
            match Duration::try_from_secs_f64(cmd.duration) {
                Ok(hold) => {
                    sleep(hold).await;
                    self.driver.stop()?;
                }
                Err(_) => {
                    warn!("Hold duration {}s not representable, stopping now", cmd.duration);
                    self.driver.stop()?;
                }
            }
        }
        Ok(())
    }

    /// Idle-tick watchdog evaluation.
    pub fn check_watchdog(&mut self) -> Result<bool, MotorError> {
        self.watchdog.check(&mut self.driver)
    }
}

/// Bring the link up, bind both servers, and run the service loop forever.
/// Only startup failures return; nothing inside the loop is fatal.
pub async fn run(
    bind: IpAddr,
    command_port: u16,
    stream_port: u16,
    driver: MotorDriver,
    mut camera: Box<dyn CameraSource>,
    link: Box<dyn NetworkLink>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    link::wait_for_link(link.as_ref(), LINK_POLL_INTERVAL).await;

    let command_listener = TcpListener::bind((bind, command_port)).await?;
    let stream_listener = TcpListener::bind((bind, stream_port)).await?;
    info!("Command server on {}", command_listener.local_addr()?);
    info!("Stream server on {}", stream_listener.local_addr()?);

    let mut runtime = Runtime::new(driver, link);
    let mut tick = interval(TICK_INTERVAL);

    info!(
        "Runtime started: {}s watchdog timeout",
        CMD_TIMEOUT.as_secs()
    );

    loop {
        tokio::select! {
            biased;

            conn = command_listener.accept() => {
                match conn {
                    Ok((stream, peer)) => {
                        info!("Command client connected: {}", peer);
                        if let Err(e) = server::command::serve_connection(stream, &mut runtime).await {
                            warn!("Command connection ended: {}", e);
                        }
                        info!("Command client disconnected");
                    }
                    Err(e) => warn!("Command accept failed: {}", e),
                }
            }

            conn = stream_listener.accept() => {
                match conn {
                    Ok((stream, peer)) => {
                        info!("Stream client connected: {}", peer);
                        if let Err(e) = server::stream::serve_connection(stream, camera.as_mut()).await {
                            info!("Stream ended: {}", e);
                        }
                        info!("Stream client disconnected");
                    }
                    Err(e) => warn!("Stream accept failed: {}", e),
                }
            }

            _ = tick.tick() => {
                if let Err(e) = runtime.check_watchdog() {
                    error!("Watchdog stop failed: {}", e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::HostLink;
    use crate::motor::SimBridge;

    fn sim_runtime() -> Runtime {
        let driver = MotorDriver::new(Box::new(SimBridge::new()));
        let link = Box::new(HostLink::new("192.168.1.100".parse().unwrap()));
        Runtime::new(driver, link)
    }

    #[tokio::test]
    async fn move_with_zero_duration_runs_until_told_otherwise() {
        let mut runtime = sim_runtime();
        runtime
            .handle_line(
                r#"{"action":"move","left_motor":200,"right_motor":-100,"duration":0}"#,
                &mut Vec::new(),
            )
            .await
            .unwrap();

        let state = runtime.actuator_state();
        assert_eq!(state.left_speed, 200);
        assert_eq!(state.right_speed, -100);
        assert!(state.motors_enabled);
    }

    #[tokio::test]
    async fn timed_move_force_stops_after_the_hold() {
        tokio::time::pause();
        let mut runtime = sim_runtime();
        runtime
            .handle_line(
                r#"{"action":"move_forward","left_motor":150,"right_motor":150,"duration":0.5}"#,
                &mut Vec::new(),
            )
            .await
            .unwrap();

        let state = runtime.actuator_state();
        assert_eq!(state.left_speed, 0);
        assert_eq!(state.right_speed, 0);
        assert!(state.motors_enabled);
    }

    #[tokio::test]
    async fn emergency_stop_disables_and_later_move_reenables() {
        let mut runtime = sim_runtime();
        runtime
            .handle_line(
                r#"{"action":"move","left_motor":100,"right_motor":100,"duration":0}"#,
                &mut Vec::new(),
            )
            .await
            .unwrap();

        runtime
            .handle_line(r#"{"action":"emergency_stop"}"#, &mut Vec::new())
            .await
            .unwrap();
        let halted = runtime.actuator_state();
        assert!(!halted.motors_enabled);
        assert_eq!(halted.left_speed, 0);
        assert_eq!(halted.right_speed, 0);

        // Chosen policy: any later movement dispatch re-enables implicitly.
        runtime
            .handle_line(
                r#"{"action":"move","left_motor":100,"right_motor":100,"duration":0}"#,
                &mut Vec::new(),
            )
            .await
            .unwrap();
        assert!(runtime.actuator_state().motors_enabled);
    }

    #[tokio::test]
    async fn malformed_lines_change_nothing_and_do_not_feed_the_watchdog() {
        let mut runtime = sim_runtime();
        runtime.watchdog = Watchdog::new(Duration::ZERO);
        std::thread::sleep(Duration::from_millis(2));
        assert!(runtime.watchdog.stale());

        runtime
            .handle_line("not json", &mut Vec::new())
            .await
            .unwrap();
        runtime
            .handle_line(r#"{"left_motor":1}"#, &mut Vec::new())
            .await
            .unwrap();

        assert!(runtime.watchdog.stale());
        assert_eq!(runtime.actuator_state(), Default::default());

        // A valid dispatch re-arms.
        runtime
            .handle_line(
                r#"{"action":"move","left_motor":10,"right_motor":10,"duration":0}"#,
                &mut Vec::new(),
            )
            .await
            .unwrap();
        assert!(!runtime.watchdog.stale());
    }

    #[tokio::test]
    async fn get_status_feeds_the_watchdog_and_replies() {
        let mut runtime = sim_runtime();
        runtime.watchdog = Watchdog::new(Duration::ZERO);
        std::thread::sleep(Duration::from_millis(2));
        assert!(runtime.watchdog.stale());

        let mut reply = Vec::new();
        runtime
            .handle_line(r#"{"action":"get_status"}"#, &mut reply)
            .await
            .unwrap();

        assert!(!runtime.watchdog.stale());
        let line = String::from_utf8(reply).unwrap();
        let value: serde_json::Value = serde_json::from_str(line.trim_end()).unwrap();
        assert_eq!(value["status"], "ok");
        assert_eq!(value["link_connected"], true);
        assert_eq!(value["ip_address"], "192.168.1.100");
        assert_eq!(value["motors_enabled"], false);
    }

    #[tokio::test]
    async fn stale_commands_trip_the_watchdog_on_the_next_check() {
        let mut runtime = sim_runtime();
        runtime.watchdog = Watchdog::new(Duration::from_millis(1));
        runtime
            .handle_line(
                r#"{"action":"move","left_motor":120,"right_motor":120,"duration":0}"#,
                &mut Vec::new(),
            )
            .await
            .unwrap();
        assert!(runtime.actuator_state().motors_enabled);

        std::thread::sleep(Duration::from_millis(5));
        assert!(runtime.check_watchdog().unwrap());

        let state = runtime.actuator_state();
        assert!(!state.motors_enabled);
        assert_eq!(state.left_speed, 0);
        assert_eq!(state.right_speed, 0);

        // Second check is a no-op once halted.
        assert!(!runtime.check_watchdog().unwrap());
    }

    #[tokio::test]
    async fn calibrate_is_dispatched_and_ends_stopped() {
        tokio::time::pause();
        let mut runtime = sim_runtime();
        runtime
            .handle_line(r#"{"action":"calibrate"}"#, &mut Vec::new())
            .await
            .unwrap();

        let state = runtime.actuator_state();
        assert_eq!(state.left_speed, 0);
        assert_eq!(state.right_speed, 0);
    }
}
