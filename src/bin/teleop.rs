// Keyboard teleop: WASD drive, SPACE stop, E emergency stop, C calibrate,
// T status, R/F speed, Q quit

use std::time::Duration;

use clap::Parser;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use serde_json::json;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tracing::{info, warn};

const SPEEDS: [i32; 3] = [80, 150, 220];
const MOVE_DURATION: f64 = 0.4; // seconds per keypress burst
const TURN_DURATION: f64 = 0.25;

/// Keyboard operator client for the rover command channel
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Rover command endpoint
    #[arg(default_value = "192.168.1.100:8080")]
    addr: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt().with_env_filter("info").init();
    let args = Args::parse();

    info!("Connecting to {}", args.addr);
    let stream = TcpStream::connect(&args.addr).await?;
    let (read_half, mut write_half) = stream.into_split();
    let mut replies = BufReader::new(read_half).lines();

    info!("Controls: WASD=drive, SPACE=stop, E=e-stop, C=calibrate, T=status, R/F=speed, Q=quit");
    info!("Speed: LOW");

    enable_raw_mode()?;
    let result = run_teleop(&mut write_half, &mut replies).await;
    disable_raw_mode()?;

    result
}

async fn run_teleop(
    write: &mut OwnedWriteHalf,
    replies: &mut Lines<BufReader<OwnedReadHalf>>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut speed_idx: usize = 0;

    loop {
        // Poll for key with 20ms timeout
        if !event::poll(Duration::from_millis(20))? {
            continue;
        }
        let Event::Key(KeyEvent { code, kind, .. }) = event::read()? else {
            continue;
        };
        if kind != KeyEventKind::Press && kind != KeyEventKind::Repeat {
            continue;
        }

        let speed = SPEEDS[speed_idx];
        match code {
            KeyCode::Char('w') => {
                send_move(write, "move_forward", speed, speed, MOVE_DURATION).await?
            }
            KeyCode::Char('s') => {
                send_move(write, "move_backward", -speed, -speed, MOVE_DURATION).await?
            }
            KeyCode::Char('a') => {
                send_move(write, "turn_left", -speed, speed, TURN_DURATION).await?
            }
            KeyCode::Char('d') => {
                send_move(write, "turn_right", speed, -speed, TURN_DURATION).await?
            }
            KeyCode::Char(' ') => send_move(write, "stop", 0, 0, 0.0).await?,

            KeyCode::Char('e') => {
                warn!("Emergency stop");
                send(write, json!({"action": "emergency_stop"})).await?;
            }
            KeyCode::Char('c') => {
                info!("Requesting calibration (robot blocks while it runs)");
                send(write, json!({"action": "calibrate"})).await?;
            }
            KeyCode::Char('t') => {
                send(write, json!({"action": "get_status"})).await?;
                match replies.next_line().await? {
                    Some(line) => info!("Robot status: {}", line),
                    None => {
                        warn!("Connection closed by robot");
                        break;
                    }
                }
            }

            KeyCode::Char('r') => {
                speed_idx = (speed_idx + 1).min(SPEEDS.len() - 1);
                print_speed(speed_idx);
            }
            KeyCode::Char('f') => {
                speed_idx = speed_idx.saturating_sub(1);
                print_speed(speed_idx);
            }

            KeyCode::Char('q') | KeyCode::Esc => break,

            _ => {}
        }
    }

    Ok(())
}

async fn send_move(
    write: &mut OwnedWriteHalf,
    action: &str,
    left: i32,
    right: i32,
    duration: f64,
) -> std::io::Result<()> {
    send(
        write,
        json!({
            "action": action,
            "left_motor": left,
            "right_motor": right,
            "duration": duration,
        }),
    )
    .await
}

async fn send(write: &mut OwnedWriteHalf, value: serde_json::Value) -> std::io::Result<()> {
    write.write_all(value.to_string().as_bytes()).await?;
    write.write_all(b"\n").await
}

fn print_speed(idx: usize) {
    let label = ["LOW", "MED", "HIGH"][idx];
    info!("Speed: {}", label);
}
