use std::net::IpAddr;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use camrover_runtime::camera::{CameraError, CameraSource, SimCamera};
use camrover_runtime::config::{
    COMMAND_PORT, SIM_FRAME_HEIGHT, SIM_FRAME_WIDTH, SIM_JPEG_QUALITY, STREAM_PORT,
};
use camrover_runtime::link::HostLink;
use camrover_runtime::motor::{MotorDriver, SimBridge};

/// Network-commanded camera rover control runtime
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Address to bind both servers on
    #[arg(long, default_value = "0.0.0.0")]
    bind: IpAddr,

    /// Command channel port
    #[arg(long, default_value_t = COMMAND_PORT)]
    command_port: u16,

    /// Camera stream port
    #[arg(long, default_value_t = STREAM_PORT)]
    stream_port: u16,

    /// V4L2 device to stream from (needs the `v4l` build feature);
    /// a simulated camera is used when absent
    #[arg(long)]
    video_device: Option<String>,

    /// Stream frame width
    #[arg(long, default_value_t = SIM_FRAME_WIDTH)]
    frame_width: u32,

    /// Stream frame height
    #[arg(long, default_value_t = SIM_FRAME_HEIGHT)]
    frame_height: u32,

    /// JPEG quality for the simulated camera
    #[arg(long, default_value_t = SIM_JPEG_QUALITY)]
    jpeg_quality: u8,
}

fn build_camera(args: &Args) -> Result<Box<dyn CameraSource>, CameraError> {
    match &args.video_device {
        #[cfg(feature = "v4l")]
        Some(device) => Ok(Box::new(camrover_runtime::camera::V4lCamera::open(
            device,
            args.frame_width,
            args.frame_height,
        )?)),
        #[cfg(not(feature = "v4l"))]
        Some(_) => Err(CameraError::Acquisition(
            "built without v4l support".to_string(),
        )),
        None => Ok(Box::new(SimCamera::new(
            args.frame_width,
            args.frame_height,
            args.jpeg_quality,
        ))),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Setup logging (set RUST_LOG=info or debug)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init();

    let args = Args::parse();

    let camera = match build_camera(&args) {
        Ok(camera) => camera,
        Err(e) => {
            eprintln!("Camera init error: {}", e);
            std::process::exit(1);
        }
    };
    let driver = MotorDriver::new(Box::new(SimBridge::new()));
    let link = Box::new(HostLink::new(args.bind));

    if let Err(e) = camrover_runtime::runtime::run(
        args.bind,
        args.command_port,
        args.stream_port,
        driver,
        camera,
        link,
    )
    .await
    {
        eprintln!("Runtime error: {}", e);
        std::process::exit(1);
    }
}
