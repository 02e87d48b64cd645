// Camera peripheral seam
//
// Format and resolution are fixed when a backend is constructed; after that
// the stream loop only ever grabs one frame at a time and drops it as soon
// as the bytes are on the wire.

use image::codecs::jpeg::JpegEncoder;
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum CameraError {
    #[error("frame acquisition failed: {0}")]
    Acquisition(String),

    #[error("camera device error: {0}")]
    Device(#[from] std::io::Error),

    #[error("jpeg encoding failed: {0}")]
    Encode(#[from] image::ImageError),
}

/// One JPEG-encoded frame. Dropping it releases the buffer.
pub struct Frame {
    data: Vec<u8>,
}

impl Frame {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

pub trait CameraSource: Send {
    fn grab(&mut self) -> Result<Frame, CameraError>;
}

/// Synthetic camera: renders a moving test pattern and JPEG-encodes it.
/// Stands in for the sensor on development hosts and in tests.
pub struct SimCamera {
    width: u32,
    height: u32,
    quality: u8,
    tick: u32,
}

impl SimCamera {
    pub fn new(width: u32, height: u32, quality: u8) -> Self {
        info!(
            "Simulated camera: {}x{} jpeg, quality {}",
            width, height, quality
        );
        Self {
            width,
            height,
            quality,
            tick: 0,
        }
    }
}

impl CameraSource for SimCamera {
    fn grab(&mut self) -> Result<Frame, CameraError> {
        self.tick = self.tick.wrapping_add(1);

        // Diagonal gradient with a vertical bar sweeping left to right, so a
        // viewer can tell the stream is live.
        let bar = (self.tick * 4) % self.width;
        let mut rgb = Vec::with_capacity((self.width * self.height * 3) as usize);
        for y in 0..self.height {
            for x in 0..self.width {
                if x.abs_diff(bar) < 8 {
                    rgb.extend_from_slice(&[255, 255, 255]);
                } else {
                    rgb.extend_from_slice(&[
                        (x * 255 / self.width) as u8,
                        (y * 255 / self.height) as u8,
                        64,
                    ]);
                }
            }
        }

        let mut jpeg = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(&mut jpeg, self.quality);
        encoder.encode(
            &rgb,
            self.width,
            self.height,
            image::ExtendedColorType::Rgb8,
        )?;
        Ok(Frame::new(jpeg))
    }
}

/// V4L2 camera in MJPG mode: the device hands back JPEG frames directly.
#[cfg(feature = "v4l")]
pub struct V4lCamera {
    device: rscam::Camera,
}

#[cfg(feature = "v4l")]
impl V4lCamera {
    pub fn open(path: &str, width: u32, height: u32) -> Result<Self, CameraError> {
        let mut device = rscam::new(path)?;
        device
            .start(&rscam::Config {
                interval: (1, 30),
                resolution: (width, height),
                format: b"MJPG",
                ..Default::default()
            })
            .map_err(|e| CameraError::Acquisition(format!("{:?}", e)))?;
        info!("V4L2 camera on {}: {}x{} MJPG", path, width, height);
        Ok(Self { device })
    }
}

#[cfg(feature = "v4l")]
impl CameraSource for V4lCamera {
    fn grab(&mut self) -> Result<Frame, CameraError> {
        let frame = self.device.capture()?;
        Ok(Frame::new(frame.to_vec()))
    }
}
